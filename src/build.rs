//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: extracting articles
//! ([`crate::article`]), rendering and writing every page
//! ([`crate::render`]), and copying the static assets directory into the
//! output.

use crate::article::{Article, Error as ArticleError, Extractor};
use crate::config::{Layout, SiteConfig};
use crate::render;
use crate::template::{Error as TemplateError, TemplateStore};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const MARKDOWN_EXTENSION: &str = "md";

/// Per-tech-stack article counts for a finished build.
#[derive(Debug, PartialEq)]
pub struct BuildSummary {
    pub total: usize,

    /// Configured stacks first (in configuration order, including empty
    /// ones), then any other tech stacks in the order they were first seen.
    pub counts: Vec<(String, usize)>,
}

impl fmt::Display for BuildSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Build complete: {} articles", self.total)?;
        writeln!(f, "Articles per tech stack:")?;
        for (tech_stack, count) in &self.counts {
            writeln!(f, "  {}: {}", tech_stack, count)?;
        }
        Ok(())
    }
}

/// Builds the site described by `layout` and `config`. Articles without a
/// frontmatter date are dated `today`. Pages are written in this order:
/// article pages, the post index, the per-stack post lists, and the tech
/// stack overview. Nothing is rolled back if a step fails.
pub fn build_site(
    layout: &Layout,
    config: &SiteConfig,
    today: &str,
) -> Result<BuildSummary> {
    let templates = TemplateStore::new(&layout.templates_directory);
    let extractor = Extractor::new(config, &layout.posts_directory, today);

    let article_template = templates.load("article")?;
    fs::create_dir_all(&layout.articles_output_directory)?;

    let mut articles: Vec<Article> = Vec::new();
    let mut sources: HashMap<String, PathBuf> = HashMap::new();
    for path in markdown_files(&layout.posts_directory)? {
        let relative_path = path.strip_prefix(&layout.posts_directory).unwrap_or(&path);
        println!("Processing {}", relative_path.display());

        let article = extractor.extract(&path)?;
        if let Some(first) = sources.insert(article.filename.clone(), path.clone()) {
            return Err(Error::DuplicateArticle {
                filename: article.filename,
                first,
                second: path,
            });
        }

        write_page(
            &layout
                .articles_output_directory
                .join(format!("{}.html", article.filename)),
            &render::article_page(&article_template, config, &article),
        )?;
        articles.push(article);
    }

    let posts_template = templates.load("posts")?;
    write_page(
        &layout.posts_index_file,
        &render::posts_index(&posts_template, config, &articles),
    )?;

    let tech_stack_posts_template = templates.load("tech-stack-posts")?;
    fs::create_dir_all(&layout.tech_stacks_output_directory)?;
    for stack in &config.tech_stacks {
        let html = render::tech_stack_posts(
            &tech_stack_posts_template,
            config,
            &stack.slug,
            &articles,
        );
        match html {
            Some(html) => write_page(
                &layout
                    .tech_stacks_output_directory
                    .join(format!("{}.html", stack.slug)),
                &html,
            )?,
            None => warn!("no tech stack with slug `{}`", stack.slug),
        }
    }

    let tech_stack_template = templates.load("tech-stack")?;
    write_page(
        &layout.tech_stack_overview_file,
        &render::tech_stack_overview(&tech_stack_template, config, &articles),
    )?;

    if layout.assets_directory.is_dir() {
        rmdir(&layout.assets_output_directory)?;
        copy_dir(&layout.assets_directory, &layout.assets_output_directory)?;
    } else {
        debug!(
            "no assets directory at `{}`; skipping copy",
            layout.assets_directory.display()
        );
    }

    Ok(summarize(config, &articles))
}

/// Tallies `articles` per tech stack. See [`BuildSummary::counts`] for the
/// ordering.
pub fn summarize(config: &SiteConfig, articles: &[Article]) -> BuildSummary {
    let counts = render::count_by_tech_stack(articles);
    let mut ordered: Vec<(String, usize)> = Vec::new();
    let tech_stacks = config
        .tech_stacks
        .iter()
        .map(|stack| stack.category.as_str())
        .chain(articles.iter().map(|article| article.tech_stack.as_str()));
    for tech_stack in tech_stacks {
        if !ordered.iter().any(|(seen, _)| seen == tech_stack) {
            let count = counts.get(tech_stack).copied().unwrap_or(0);
            ordered.push((tech_stack.to_owned(), count));
        }
    }
    BuildSummary {
        total: articles.len(),
        counts: ordered,
    }
}

// Recursively lists the markdown files under `dir`, sorted by file name at
// each level so that builds are deterministic.
fn markdown_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        warn!("posts directory `{}` doesn't exist", dir.display());
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for result in WalkDir::new(dir).sort_by(|a, b| a.file_name().cmp(b.file_name())) {
        let entry = result?;
        let is_markdown = entry
            .path()
            .extension()
            .map_or(false, |ext| ext == MARKDOWN_EXTENSION);
        if entry.file_type().is_file() && is_markdown {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn write_page(path: &Path, html: &str) -> Result<()> {
    info!("writing `{}`", path.display());
    fs::write(path, html).map_err(|err| Error::Write {
        path: path.to_owned(),
        err,
    })
}

fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    for result in WalkDir::new(src).sort_by(|a, b| a.file_name().cmp(b.file_name())) {
        let entry = result?;
        let relative_path = match entry.path().strip_prefix(src) {
            Ok(relative_path) => relative_path,
            Err(_) => continue,
        };
        let target = dst.join(relative_path);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target).map_err(|err| Error::Copy {
                from: entry.path().to_owned(),
                to: target.clone(),
                err,
            })?;
        }
    }
    Ok(())
}

fn rmdir(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(x) => {
            debug!("removed `{}`", dir.display());
            Ok(x)
        }
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during article
/// extraction, template loading, writing pages, cleaning or copying the
/// assets directory, and other I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors extracting an article.
    Article(ArticleError),

    /// Returned when a template can't be loaded.
    Template(TemplateError),

    /// Returned when two source files share a file stem and would be written
    /// to the same output page.
    DuplicateArticle {
        filename: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Returned for I/O problems while writing a page.
    Write { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while cleaning the assets output directory.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned for I/O problems while copying a static asset.
    Copy {
        from: PathBuf,
        to: PathBuf,
        err: std::io::Error,
    },

    /// Returned for errors walking a directory tree.
    WalkDir(walkdir::Error),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Article(err) => err.fmt(f),
            Error::Template(err) => err.fmt(f),
            Error::DuplicateArticle {
                filename,
                first,
                second,
            } => write!(
                f,
                "'{}' and '{}' would both be written to '{}.html'",
                first.display(),
                second.display(),
                filename
            ),
            Error::Write { path, err } => {
                write!(f, "Writing page '{}': {}", path.display(), err)
            }
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::Copy { from, to, err } => write!(
                f,
                "Copying '{}' to '{}': {}",
                from.display(),
                to.display(),
                err
            ),
            Error::WalkDir(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Article(err) => Some(err),
            Error::Template(err) => Some(err),
            Error::DuplicateArticle { .. } => None,
            Error::Write { path: _, err } => Some(err),
            Error::Clean { path: _, err } => Some(err),
            Error::Copy { err, .. } => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<ArticleError> for Error {
    /// Converts [`ArticleError`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: ArticleError) -> Error {
        Error::Article(err)
    }
}

impl From<TemplateError> for Error {
    /// Converts [`TemplateError`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: TemplateError) -> Error {
        Error::Template(err)
    }
}

impl From<walkdir::Error> for Error {
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{SiteMeta, TechStack, UNCATEGORIZED};

    fn article(tech_stack: &str) -> Article {
        Article {
            title: String::from("t"),
            date: String::from("2024-01-01"),
            tags: Vec::new(),
            category: tech_stack.to_owned(),
            tech_stack: tech_stack.to_owned(),
            description: String::from("t"),
            content: String::new(),
            toc: String::new(),
            filename: String::from("t"),
            relative_path: PathBuf::from("t.md"),
        }
    }

    #[test]
    fn test_summarize() {
        let stack = |slug: &str, category: &str| TechStack {
            slug: slug.to_owned(),
            category: category.to_owned(),
            color: String::from("red"),
            technologies: Vec::new(),
        };
        let config = SiteConfig {
            site: SiteMeta {
                title: String::new(),
                author: String::new(),
                url: String::new(),
                avatar: String::new(),
            },
            tech_stacks: vec![stack("web", "Frontend"), stack("go", "Backend")],
        };
        let articles = vec![
            article("Backend"),
            article(UNCATEGORIZED),
            article("Backend"),
        ];
        let summary = summarize(&config, &articles);
        assert_eq!(3, summary.total);
        assert_eq!(
            vec![
                (String::from("Frontend"), 0),
                (String::from("Backend"), 2),
                (String::from(UNCATEGORIZED), 1),
            ],
            summary.counts
        );
        assert_eq!(
            summary.total,
            summary.counts.iter().map(|(_, count)| count).sum::<usize>()
        );
        assert_eq!(
            "Build complete: 3 articles\n\
             Articles per tech stack:\n  \
             Frontend: 0\n  \
             Backend: 2\n  \
             uncategorized: 1\n",
            summary.to_string()
        );
    }
}
