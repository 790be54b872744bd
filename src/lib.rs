//! The library code for the `stackpress` static site generator. A build is a
//! single pass in one direction:
//!
//! 1. Loading the site configuration ([`crate::config`])
//! 2. Extracting articles from markdown sources ([`crate::article`], which
//!    converts bodies via [`crate::markdown`])
//! 3. Rendering pages by filling placeholder tokens in HTML templates
//!    ([`crate::template`], [`crate::render`])
//! 4. Writing every page and copying static assets ([`crate::build`])
//!
//! Articles are grouped into "tech stacks": each configured stack owns a
//! folder under the posts directory (named by its slug), and every article in
//! that folder belongs to the stack. The site gets one page per article, an
//! index of all articles ordered by date, one article list per stack, and an
//! overview of all stacks.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod article;
pub mod build;
pub mod config;
pub mod markdown;
pub mod render;
pub mod template;
