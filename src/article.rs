//! Defines the [`Article`], [`Extractor`], and [`Error`] types. The
//! [`Extractor`] turns one markdown source file into an [`Article`]: it
//! reads the optional metadata block, converts the body to HTML, and
//! resolves the article's tech stack from the folder it lives in.
//!
//! Metadata comes in two shapes:
//!
//! 1. YAML between `---` fences at the very top of the file
//! 2. A leading block of `Key: value` lines ending at the first blank line
//!
//! Keys are case-insensitive. Metadata problems never fail an extraction:
//! an unclosed fence means the file has no metadata, and YAML that doesn't
//! parse is read line-by-line instead.

use crate::config::{SiteConfig, UNCATEGORIZED};
use crate::markdown;
use log::warn;
use serde_yaml::Value;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// A parsed article. Articles are created once per build and never modified.
#[derive(Clone, Debug, PartialEq)]
pub struct Article {
    pub title: String,

    /// A `YYYY-MM-DD` string. Articles are ordered by comparing these strings,
    /// not by parsing them as dates.
    pub date: String,
    pub tags: Vec<String>,

    /// The display category. Comes from the frontmatter when present,
    /// otherwise it matches `tech_stack`.
    pub category: String,

    /// The grouping key, always derived from the article's top-level folder
    /// under the posts directory. Frontmatter can't override it.
    pub tech_stack: String,

    /// Used for the page's `<meta name="description">`; defaults to the title.
    pub description: String,

    /// The rendered body.
    pub content: String,
    pub toc: String,

    /// The source file's stem. Output pages are named `{filename}.html`, so
    /// this must be unique across all folders.
    pub filename: String,
    pub relative_path: PathBuf,
}

/// Extracts [`Article`]s from markdown source files.
pub struct Extractor<'a> {
    config: &'a SiteConfig,

    /// The root of the posts tree. The first path segment below it selects
    /// the tech stack.
    posts_directory: &'a Path,

    /// The date assigned to articles without a `date` in their frontmatter.
    today: &'a str,
}

impl<'a> Extractor<'a> {
    pub fn new(
        config: &'a SiteConfig,
        posts_directory: &'a Path,
        today: &'a str,
    ) -> Extractor<'a> {
        Extractor {
            config,
            posts_directory,
            today,
        }
    }

    /// Reads the file at `path` and extracts an [`Article`] from it. `path`
    /// should be inside the extractor's posts directory.
    pub fn extract(&self, path: &Path) -> Result<Article> {
        let relative_path =
            path.strip_prefix(self.posts_directory).unwrap_or(path);
        let result = fs::read_to_string(path)
            .map_err(Error::from)
            .and_then(|input| self.from_str(relative_path, &input));
        match result {
            Ok(article) => Ok(article),
            Err(e) => Err(Error::Annotated(
                format!("parsing article `{}`", relative_path.display()),
                Box::new(e),
            )),
        }
    }

    /// Extracts an [`Article`] from the contents of a source file whose path
    /// relative to the posts directory is `relative_path`.
    pub fn from_str(
        &self,
        relative_path: &Path,
        input: &str,
    ) -> Result<Article> {
        let filename = relative_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| Error::InvalidFileName(relative_path.to_owned()))?
            .to_owned();

        let (metadata, body) = split_metadata(input);
        let frontmatter = match metadata {
            Metadata::Absent => Frontmatter::default(),
            Metadata::Lines(block) => Frontmatter::from_lines(block),
            Metadata::Yaml(block) => match Frontmatter::from_yaml(block) {
                Ok(frontmatter) => frontmatter,
                Err(err) => {
                    warn!(
                        "`{}`: frontmatter isn't valid YAML ({}); \
                         reading it as `key: value` lines",
                        relative_path.display(),
                        err
                    );
                    Frontmatter::from_lines(block)
                }
            },
        };

        let tech_stack = self.tech_stack_for(relative_path).to_owned();
        let html = markdown::to_html(body);
        let title = frontmatter.title.unwrap_or_else(|| filename.clone());

        Ok(Article {
            description: frontmatter
                .description
                .unwrap_or_else(|| title.clone()),
            title,
            date: frontmatter.date.unwrap_or_else(|| self.today.to_owned()),
            tags: frontmatter.tags,
            category: frontmatter
                .category
                .unwrap_or_else(|| tech_stack.clone()),
            tech_stack,
            content: html.content,
            toc: html.toc,
            filename,
            relative_path: relative_path.to_owned(),
        })
    }

    /// Resolves the tech-stack category for a path relative to the posts
    /// directory. Files directly in the posts directory are uncategorized.
    pub fn tech_stack_for(&self, relative_path: &Path) -> &'a str {
        let mut components = relative_path.components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(folder)), Some(_)) => {
                match folder.to_str() {
                    Some(folder) => self.config.category_for_folder(folder),
                    None => UNCATEGORIZED,
                }
            }
            _ => UNCATEGORIZED,
        }
    }
}

#[derive(Debug, PartialEq)]
enum Metadata<'a> {
    Absent,
    Yaml(&'a str),
    Lines(&'a str),
}

// Splits `input` into its metadata block and its body. A first line of `---`
// opens a YAML block which ends at the next `---` line; without that closing
// line the `---` is just a horizontal rule. Otherwise any leading
// `Key: value` lines (plus indented continuation lines) are metadata, up to
// the first blank line.
fn split_metadata(input: &str) -> (Metadata, &str) {
    const FENCE: &str = "---";

    let first_line_end = input.find('\n').unwrap_or_else(|| input.len());
    if input[..first_line_end].trim_end() == FENCE {
        let yaml_start = (first_line_end + 1).min(input.len());
        let mut offset = yaml_start;
        for line in input[yaml_start..].split_inclusive('\n') {
            if line.trim_end() == FENCE {
                let body_start = offset + line.len();
                return (
                    Metadata::Yaml(&input[yaml_start..offset]),
                    &input[body_start..],
                );
            }
            offset += line.len();
        }
        return (Metadata::Absent, input);
    }

    let mut block_end = 0;
    let mut body_start = 0;
    for line in input.split_inclusive('\n') {
        let continuation = block_end > 0
            && (line.starts_with("    ") || line.starts_with('\t'))
            && !line.trim().is_empty();
        if continuation || key_value(line).is_some() {
            block_end += line.len();
            body_start = block_end;
            continue;
        }
        if block_end > 0 && line.trim().is_empty() {
            body_start += line.len();
        }
        break;
    }

    if block_end == 0 {
        (Metadata::Absent, input)
    } else {
        (Metadata::Lines(&input[..block_end]), &input[body_start..])
    }
}

// Matches `Key: value` lines. Keys are ASCII letters, digits, `_` and `-`,
// indented by at most three spaces.
fn key_value(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim_start_matches(' ');
    if line.len() - trimmed.len() > 3 {
        return None;
    }
    let colon = trimmed.find(':')?;
    let key = &trimmed[..colon];
    let valid = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if valid {
        Some((key, trimmed[colon + 1..].trim()))
    } else {
        None
    }
}

#[derive(Default, Debug, PartialEq)]
struct Frontmatter {
    title: Option<String>,
    date: Option<String>,
    tags: Vec<String>,
    category: Option<String>,
    description: Option<String>,
}

impl Frontmatter {
    // Builds a frontmatter from lower-cased keys and their values. Every
    // value of `tags` may itself hold several comma-separated tags.
    fn from_fields(fields: Vec<(String, Vec<String>)>) -> Frontmatter {
        let mut frontmatter = Frontmatter::default();
        for (key, values) in fields {
            let first = values.first().cloned();
            match key.as_str() {
                "title" => frontmatter.title = first,
                "date" => frontmatter.date = first,
                "category" => frontmatter.category = first,
                "description" => frontmatter.description = first,
                "tags" => {
                    frontmatter.tags = values
                        .iter()
                        .flat_map(|value| split_tags(value))
                        .collect()
                }
                _ => {}
            }
        }
        frontmatter
    }

    fn from_lines(block: &str) -> Frontmatter {
        let mut fields: Vec<(String, Vec<String>)> = Vec::new();
        for line in block.lines() {
            match key_value(line) {
                Some((key, value)) => {
                    let mut values = Vec::new();
                    if !value.is_empty() {
                        values.push(unquote(value).to_owned());
                    }
                    fields.push((key.to_lowercase(), values));
                }
                None => {
                    if let Some((_, values)) = fields.last_mut() {
                        let value = line.trim();
                        if !value.is_empty() {
                            values.push(unquote(value).to_owned());
                        }
                    }
                }
            }
        }
        Frontmatter::from_fields(fields)
    }

    fn from_yaml(block: &str) -> std::result::Result<Frontmatter, String> {
        if block.trim().is_empty() {
            return Ok(Frontmatter::default());
        }
        let mapping = match serde_yaml::from_str(block) {
            Ok(Value::Mapping(mapping)) => mapping,
            Ok(Value::Null) => return Ok(Frontmatter::default()),
            Ok(_) => return Err(String::from("expected a mapping")),
            Err(err) => return Err(err.to_string()),
        };

        let fields: Vec<(String, Vec<String>)> = mapping
            .iter()
            .filter_map(|(key, value)| {
                let key = scalar(key)?.to_lowercase();
                let values: Vec<String> = match value {
                    Value::Sequence(items) => {
                        items.iter().filter_map(scalar).collect()
                    }
                    other => scalar(other).into_iter().collect(),
                };
                Some((key, values))
            })
            .collect();
        Ok(Frontmatter::from_fields(fields))
    }
}

// Renders YAML scalars of any type as strings.
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn unquote(value: &str) -> &str {
    for quote in &['"', '\''] {
        if value.len() >= 2
            && value.starts_with(*quote)
            && value.ends_with(*quote)
        {
            return &value[1..value.len() - 1];
        }
    }
    value
}

// Splits `go, rust` (or `[go, rust]`, as written in unparsable YAML) into
// individual tags.
fn split_tags(value: &str) -> Vec<String> {
    let value = value.trim();
    let value = if value.starts_with('[') && value.ends_with(']') {
        &value[1..value.len() - 1]
    } else {
        value
    };
    value
        .split(',')
        .map(|tag| unquote(tag.trim()))
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect()
}

/// Represents the result of an [`Article`]-extraction operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error extracting an [`Article`].
#[derive(Debug)]
pub enum Error {
    /// Returned when a source file name isn't valid UTF-8.
    InvalidFileName(PathBuf),

    /// Returned for I/O errors reading the source file.
    Io(std::io::Error),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidFileName(path) => {
                write!(f, "invalid file name: {:?}", path)
            }
            Error::Io(err) => err.fmt(f),
            Error::Annotated(annotation, err) => {
                write!(f, "{}: {}", annotation, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidFileName(_) => None,
            Error::Io(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{SiteMeta, TechStack};

    const TODAY: &str = "2024-03-01";

    fn config() -> SiteConfig {
        SiteConfig {
            site: SiteMeta {
                title: "Notes".to_owned(),
                author: "Ada".to_owned(),
                url: "https://example.com".to_owned(),
                avatar: "avatar.png".to_owned(),
            },
            tech_stacks: vec![TechStack {
                slug: "go".to_owned(),
                category: "Backend".to_owned(),
                color: "#00ADD8".to_owned(),
                technologies: vec!["Go".to_owned()],
            }],
        }
    }

    fn extract(relative_path: &str, input: &str) -> Result<Article> {
        let config = config();
        let extractor = Extractor::new(&config, Path::new("posts"), TODAY);
        extractor.from_str(Path::new(relative_path), input)
    }

    #[test]
    fn test_defaults() -> Result<()> {
        let article = extract("go/intro.md", "---\ntitle: Hello\n---\n# Hi\n")?;
        assert_eq!("Hello", article.title);
        assert_eq!(TODAY, article.date);
        assert!(article.tags.is_empty());
        assert_eq!("Backend", article.category);
        assert_eq!("Backend", article.tech_stack);
        assert_eq!("Hello", article.description);
        assert_eq!("intro", article.filename);
        assert_eq!(Path::new("go/intro.md"), article.relative_path);
        assert!(article.content.contains("<h1 id=\"hi\">Hi</h1>"));
        assert!(article.toc.contains("href=\"#hi\""));
        Ok(())
    }

    #[test]
    fn test_no_frontmatter() -> Result<()> {
        let article = extract("misc/notes.md", "plain body\n")?;
        assert_eq!("notes", article.title);
        assert_eq!(UNCATEGORIZED, article.tech_stack);
        assert_eq!(UNCATEGORIZED, article.category);
        assert_eq!("<p>plain body</p>\n", article.content);
        assert_eq!("", article.toc);
        Ok(())
    }

    #[test]
    fn test_declared_category_keeps_folder_tech_stack() -> Result<()> {
        let input = "---\ntitle: Channels\ndate: 2023-01-02\n\
                     category: Concurrency\ntags: [go, channels]\n\
                     description: All about channels\n---\nbody\n";
        let article = extract("go/deep/channels.md", input)?;
        assert_eq!("Concurrency", article.category);
        assert_eq!("Backend", article.tech_stack);
        assert_eq!("2023-01-02", article.date);
        assert_eq!(vec!["go", "channels"], article.tags);
        assert_eq!("All about channels", article.description);
        Ok(())
    }

    #[test]
    fn test_comma_separated_tags_and_capitalized_keys() -> Result<()> {
        let input = "---\nTitle: Hello\nTAGS: rust, cli , \n---\n";
        let article = extract("go/hello.md", input)?;
        assert_eq!("Hello", article.title);
        assert_eq!(vec!["rust", "cli"], article.tags);
        Ok(())
    }

    #[test]
    fn test_unfenced_metadata() -> Result<()> {
        let input = "Title: Hello\nDate: 2023-05-05\nTags: go\n    \
                     generics\n\nBody\n";
        let article = extract("go/intro.md", input)?;
        assert_eq!("Hello", article.title);
        assert_eq!("2023-05-05", article.date);
        assert_eq!(vec!["go", "generics"], article.tags);
        assert_eq!("<p>Body</p>\n", article.content);
        Ok(())
    }

    #[test]
    fn test_unclosed_fence_is_a_horizontal_rule() -> Result<()> {
        let input = "---\nJust a paragraph after a rule.\n";
        let article = extract("go/rule.md", input)?;
        assert_eq!("rule", article.title);
        assert_eq!(TODAY, article.date);
        assert!(article.content.starts_with("<hr />"));
        assert!(article.content.contains("Just a paragraph after a rule."));
        Ok(())
    }

    #[test]
    fn test_invalid_yaml_falls_back_to_lines() -> Result<()> {
        let input = "---\ntitle: Go: the good parts\ndate: 2022-07-01\n\
                     tags: [go, 'tips']\n---\nbody\n";
        let article = extract("go/good.md", input)?;
        assert_eq!("Go: the good parts", article.title);
        assert_eq!("2022-07-01", article.date);
        assert_eq!(vec!["go", "tips"], article.tags);
        assert_eq!("<p>body</p>\n", article.content);
        Ok(())
    }

    #[test]
    fn test_non_string_tags() -> Result<()> {
        let input = "---\ntitle: x\ntags: [go, 1.18, true]\n---\n";
        let article = extract("go/x.md", input)?;
        assert_eq!(vec!["go", "1.18", "true"], article.tags);
        Ok(())
    }

    #[test]
    fn test_unusable_yaml_uses_defaults() -> Result<()> {
        let article = extract("go/list.md", "---\n- a\n- b\n---\nbody\n")?;
        assert_eq!("list", article.title);
        assert_eq!(TODAY, article.date);
        assert!(article.tags.is_empty());
        assert_eq!("Backend", article.category);
        Ok(())
    }

    #[test]
    fn test_root_level_file_is_uncategorized() {
        let config = config();
        let extractor = Extractor::new(&config, Path::new("posts"), TODAY);
        assert_eq!(UNCATEGORIZED, extractor.tech_stack_for(Path::new("go.md")));
        assert_eq!("Backend", extractor.tech_stack_for(Path::new("go/a/b.md")));
    }

    #[test]
    fn test_split_metadata_ignores_inline_dashes() {
        let (metadata, body) =
            split_metadata("---\ntitle: a---b\n---\nrest\n---\n");
        assert_eq!(Metadata::Yaml("title: a---b\n"), metadata);
        assert_eq!("rest\n---\n", body);
    }

    #[test]
    fn test_split_metadata_without_key_value_lines() {
        let input = "# Heading\n\ntitle: not metadata\n";
        assert_eq!((Metadata::Absent, input), split_metadata(input));
        let input = "\ntitle: not metadata\n";
        assert_eq!((Metadata::Absent, input), split_metadata(input));
    }
}
