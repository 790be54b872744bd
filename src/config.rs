//! Defines the [`SiteConfig`] and [`Layout`] types. [`SiteConfig`] is parsed
//! from the project's JSON configuration file and is passed by reference into
//! every stage of the build; [`Layout`] describes where the build reads its
//! inputs and writes its outputs.

use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

/// The `tech_stack` value for articles whose folder doesn't match any
/// configured [`TechStack::slug`].
pub const UNCATEGORIZED: &str = "uncategorized";

/// Site-wide metadata made available to every template.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct SiteMeta {
    pub title: String,
    pub author: String,
    pub url: String,
    pub avatar: String,
}

/// A configured category grouping for articles.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct TechStack {
    /// Used as the source folder name and as the output file name for the
    /// stack's post list.
    pub slug: String,

    /// The display name. Articles are grouped by this value.
    pub category: String,

    /// A CSS color value, inserted verbatim into inline styles.
    pub color: String,

    #[serde(default)]
    pub technologies: Vec<String>,
}

/// The parsed site configuration file.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct SiteConfig {
    pub site: SiteMeta,

    #[serde(rename = "techStacks")]
    pub tech_stacks: Vec<TechStack>,
}

impl SiteConfig {
    /// Reads and parses the JSON configuration file at `path`.
    pub fn from_file(path: &Path) -> Result<SiteConfig> {
        let annotate = |err: Error| {
            let annotation = format!("loading config `{}`", path.display());
            Error::Annotated(annotation, Box::new(err))
        };
        let file = File::open(path).map_err(|e| annotate(Error::Io(e)))?;
        serde_json::from_reader(file).map_err(|e| annotate(Error::DeserializeJson(e)))
    }

    /// Parses a configuration from a JSON string.
    pub fn from_json(input: &str) -> Result<SiteConfig> {
        Ok(serde_json::from_str(input)?)
    }

    /// Returns the first [`TechStack`] whose slug is `slug`.
    pub fn find_stack(&self, slug: &str) -> Option<&TechStack> {
        self.tech_stacks.iter().find(|stack| stack.slug == slug)
    }

    /// Maps a source folder name onto a tech-stack category, falling back to
    /// [`UNCATEGORIZED`].
    pub fn category_for_folder(&self, folder: &str) -> &str {
        match self.find_stack(folder) {
            Some(stack) => &stack.category,
            None => UNCATEGORIZED,
        }
    }
}

/// The directory layout of a project. Every path is derived from a single
/// root directory; see [`Layout::from_root`].
#[derive(Clone, Debug)]
pub struct Layout {
    pub config_file: PathBuf,
    pub templates_directory: PathBuf,
    pub posts_directory: PathBuf,

    /// Optional. Copied into [`Layout::assets_output_directory`] when present.
    pub assets_directory: PathBuf,

    /// Article pages are written here as `{filename}.html`.
    pub articles_output_directory: PathBuf,
    pub assets_output_directory: PathBuf,
    pub posts_index_file: PathBuf,
    pub tech_stack_overview_file: PathBuf,

    /// Per-stack post lists are written here as `{slug}.html`.
    pub tech_stacks_output_directory: PathBuf,
}

impl Layout {
    pub fn from_root(root: &Path) -> Layout {
        let articles_output_directory = root.join("docs");
        Layout {
            config_file: root.join("config").join("site.json"),
            templates_directory: root.join("templates"),
            posts_directory: root.join("posts"),
            assets_directory: root.join("assets"),
            assets_output_directory: articles_output_directory.join("assets"),
            articles_output_directory,
            posts_index_file: root.join("posts.html"),
            tech_stack_overview_file: root.join("tech-stack.html"),
            tech_stacks_output_directory: root.join("tech-stacks"),
        }
    }

    pub fn with_config_file(mut self, config_file: PathBuf) -> Layout {
        self.config_file = config_file;
        self
    }
}

/// The result of a fallible configuration operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading the [`SiteConfig`].
#[derive(Debug)]
pub enum Error {
    /// Returned when the config file can't be read.
    Io(std::io::Error),

    /// Returned when the config file isn't valid JSON or is missing required
    /// keys.
    DeserializeJson(serde_json::Error),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::DeserializeJson(err) => err.fmt(f),
            Error::Annotated(annotation, err) => write!(f, "{}: {}", annotation, err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::DeserializeJson(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    /// Converts a [`serde_json::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_json`] deserialization functions.
    fn from(err: serde_json::Error) -> Error {
        Error::DeserializeJson(err)
    }
}
