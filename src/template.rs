//! Defines the [`TemplateStore`], [`Template`], and [`Substitutions`] types.
//! Templates are plain HTML files containing `{{TOKEN}}` placeholders, where a
//! token is made of upper-case ASCII letters, digits, and underscores.
//! [`Template::render`] replaces every token in a single pass and reports
//! tokens which had no value as well as values which had no token.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Loads named templates from a directory. A template named `article` is
/// read from `{directory}/article.html`.
pub struct TemplateStore {
    directory: PathBuf,
}

impl TemplateStore {
    pub fn new(directory: &Path) -> TemplateStore {
        TemplateStore {
            directory: directory.to_owned(),
        }
    }

    /// Reads the template called `name`. Templates are never cached since
    /// they're only read once per build.
    pub fn load(&self, name: &str) -> Result<Template> {
        let path = self.directory.join(format!("{}.html", name));
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Template {
                name: name.to_owned(),
                text,
            }),
            Err(err) => Err(Error::Open { path, err }),
        }
    }
}

/// The raw text of a template.
#[derive(Clone, Debug)]
pub struct Template {
    pub name: String,
    pub text: String,
}

/// Maps token names (without braces) onto their rendered values.
#[derive(Default, Debug)]
pub struct Substitutions(BTreeMap<&'static str, String>);

impl Substitutions {
    pub fn new() -> Substitutions {
        Substitutions::default()
    }

    /// Sets the value for `token`, replacing any previous value.
    pub fn set<S: Into<String>>(
        &mut self,
        token: &'static str,
        value: S,
    ) -> &mut Self {
        self.0.insert(token, value.into());
        self
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.0.get(token).map(String::as_str)
    }
}

/// The output of [`Template::render`].
#[derive(Debug)]
pub struct Rendered {
    pub html: String,

    /// Tokens found in the template that had no value. They are left in
    /// `html` verbatim.
    pub unresolved: Vec<String>,

    /// Values whose token never appeared in the template.
    pub unused: Vec<&'static str>,
}

impl Template {
    pub fn from_str(name: &str, text: &str) -> Template {
        Template {
            name: name.to_owned(),
            text: text.to_owned(),
        }
    }

    /// Replaces each `{{TOKEN}}` with its value from `substitutions`. Values
    /// are inserted as-is and never scanned for tokens themselves.
    pub fn render(&self, substitutions: &Substitutions) -> Rendered {
        let mut html = String::with_capacity(self.text.len());
        let mut unresolved = Vec::new();
        let mut used = Vec::new();

        let mut rest: &str = &self.text;
        while let Some(start) = rest.find(OPEN) {
            html.push_str(&rest[..start]);
            let after_open = &rest[start + OPEN.len()..];
            match token_at(after_open) {
                Some(token) => {
                    match substitutions.get(token) {
                        Some(value) => {
                            html.push_str(value);
                            used.push(token);
                        }
                        None => {
                            let end = start + OPEN.len() + token.len() + CLOSE.len();
                            html.push_str(&rest[start..end]);
                            if !unresolved.iter().any(|t| t == token) {
                                unresolved.push(token.to_owned());
                            }
                        }
                    }
                    rest = &after_open[token.len() + CLOSE.len()..];
                }
                None => {
                    html.push_str(OPEN);
                    rest = after_open;
                }
            }
        }
        html.push_str(rest);

        let unused = substitutions
            .0
            .keys()
            .copied()
            .filter(|token| !used.contains(token))
            .collect();

        Rendered {
            html,
            unresolved,
            unused,
        }
    }
}

// Returns the token name if `s` starts with `NAME}}`.
fn token_at(s: &str) -> Option<&str> {
    let end = s.find(CLOSE)?;
    let token = &s[..end];
    let valid = !token.is_empty()
        && token
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_');
    if valid {
        Some(token)
    } else {
        None
    }
}

/// The result of a fallible template operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading a [`Template`].
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O problems while opening template files.
    Open { path: PathBuf, err: std::io::Error },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Open { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Open { path: _, err } => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_render_replaces_every_occurrence() {
        let template = Template::from_str(
            "t",
            "<title>{{TITLE}}</title><h1>{{TITLE}}</h1>",
        );
        let mut subs = Substitutions::new();
        subs.set("TITLE", "Hello");
        let rendered = template.render(&subs);
        assert_eq!("<title>Hello</title><h1>Hello</h1>", rendered.html);
        assert!(rendered.unresolved.is_empty());
        assert!(rendered.unused.is_empty());
    }

    #[test]
    fn test_render_reports_unresolved_and_unused() {
        let template = Template::from_str("t", "{{TITLE}} {{AUTHOR}} {{AUTHOR}}");
        let mut subs = Substitutions::new();
        subs.set("TITLE", "Hello").set("KEYWORDS", "a, b");
        let rendered = template.render(&subs);
        assert_eq!("Hello {{AUTHOR}} {{AUTHOR}}", rendered.html);
        assert_eq!(vec!["AUTHOR".to_owned()], rendered.unresolved);
        assert_eq!(vec!["KEYWORDS"], rendered.unused);
    }

    #[test]
    fn test_values_are_not_rescanned() {
        let template = Template::from_str("t", "{{CONTENT}}|{{TITLE}}");
        let mut subs = Substitutions::new();
        subs.set("CONTENT", "literal {{TITLE}}").set("TITLE", "x");
        assert_eq!("literal {{TITLE}}|x", template.render(&subs).html);
    }

    #[test]
    fn test_non_tokens_are_copied_verbatim() {
        let text = "{{ lower }} {{}} {{open {x}} }} {{";
        let template = Template::from_str("t", text);
        let rendered = template.render(&Substitutions::new());
        assert_eq!(text, rendered.html);
        assert!(rendered.unresolved.is_empty());
    }

    #[test]
    fn test_load_missing_template() {
        let store = TemplateStore::new(Path::new("./does-not-exist"));
        match store.load("article") {
            Err(Error::Open { path, .. }) => {
                assert_eq!(Path::new("./does-not-exist/article.html"), path)
            }
            Ok(_) => panic!("wanted error"),
        }
    }
}
