//! Converts markdown into an HTML fragment plus a table of contents. Headings
//! are given `id` attributes (slugified from their text) so the table of
//! contents can link to them, and code blocks are wrapped in the markup that
//! client-side highlighters expect.

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag};
use std::collections::HashSet;

/// The output of [`to_html`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Html {
    pub content: String,

    /// A nested list of links to the document's headings, or the empty string
    /// when there are no headings.
    pub toc: String,
}

/// A heading collected while converting; see [`toc_html`].
#[derive(Clone, Debug, PartialEq)]
pub struct Heading {
    pub level: u32,
    pub id: String,
    pub text: String,
}

/// Escapes `&`, `<`, `>`, and `"` for use in HTML text and attributes.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    // writing to a `String` never fails
    let _ = pulldown_cmark::escape::escape_html(&mut escaped, text);
    escaped
}

/// Converts `markdown` to HTML.
pub fn to_html(markdown: &str) -> Html {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let events: Vec<Event> = Parser::new_ext(markdown, options).collect();
    let headings = collect_headings(&events);

    let mut converter = EventConverter {
        headings: headings.iter(),
    };
    let mut content = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(
        &mut content,
        events.into_iter().map(|ev| converter.convert(ev)),
    );

    Html {
        content,
        toc: toc_html(&headings),
    }
}

// Walks the events once to find each heading's text and assign it a unique
// id. The ids are consumed in the same order by `EventConverter`.
fn collect_headings(events: &[Event]) -> Vec<Heading> {
    let mut headings = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut current: Option<(u32, String)> = None;

    for ev in events {
        match ev {
            Event::Start(Tag::Heading(level)) => {
                current = Some((*level, String::new()))
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, buf)) = current.as_mut() {
                    buf.push_str(text);
                }
            }
            Event::End(Tag::Heading(_)) => {
                if let Some((level, text)) = current.take() {
                    let id = unique_id(&text, &mut seen);
                    headings.push(Heading { level, id, text });
                }
            }
            _ => {}
        }
    }
    headings
}

fn unique_id(text: &str, seen: &mut HashSet<String>) -> String {
    let mut base = slug::slugify(text);
    if base.is_empty() {
        base = String::from("section");
    }
    let mut id = base.clone();
    let mut n = 1;
    while seen.contains(&id) {
        id = format!("{}-{}", base, n);
        n += 1;
    }
    seen.insert(id.clone());
    id
}

struct EventConverter<'h> {
    headings: std::slice::Iter<'h, Heading>,
}

impl<'h> EventConverter<'h> {
    fn convert<'a>(&mut self, ev: Event<'a>) -> Event<'a> {
        match ev {
            Event::Start(Tag::Heading(level)) => match self.headings.next() {
                Some(heading) => html_event(format!(
                    "<h{} id=\"{}\">",
                    level,
                    escape_html(&heading.id)
                )),
                None => Event::Start(Tag::Heading(level)),
            },
            Event::End(Tag::Heading(level)) => {
                html_event(format!("</h{}>\n", level))
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                let class = match &kind {
                    CodeBlockKind::Fenced(info) => {
                        // only the first word of the info string names the
                        // language (e.g., "rust ignore")
                        match info.split_whitespace().next() {
                            Some(lang) => format!(
                                " class=\"language-{}\"",
                                escape_html(lang)
                            ),
                            None => String::new(),
                        }
                    }
                    CodeBlockKind::Indented => String::new(),
                };
                html_event(format!(
                    "<div class=\"codehilite\"><pre><code{}>",
                    class
                ))
            }
            Event::End(Tag::CodeBlock(_)) => {
                html_event(String::from("</code></pre></div>\n"))
            }
            _ => ev,
        }
    }
}

fn html_event<'a>(html: String) -> Event<'a> {
    Event::Html(CowStr::from(html))
}

/// Renders `headings` as nested lists mirroring the heading levels.
pub fn toc_html(headings: &[Heading]) -> String {
    if headings.is_empty() {
        return String::new();
    }

    let mut out = String::from("<div class=\"toc\">\n");
    // levels of the currently open lists
    let mut open: Vec<u32> = Vec::new();
    for heading in headings {
        match open.last() {
            None => {
                out.push_str("<ul>\n");
                open.push(heading.level);
            }
            Some(&last) if heading.level > last => {
                out.push_str("\n<ul>\n");
                open.push(heading.level);
            }
            Some(_) => {
                out.push_str("</li>\n");
                close_lists(&mut out, &mut open, heading.level);
            }
        }
        out.push_str(&format!(
            "<li><a href=\"#{}\">{}</a>",
            escape_html(&heading.id),
            escape_html(&heading.text)
        ));
    }
    out.push_str("</li>\n");
    while open.pop().is_some() {
        out.push_str("</ul>\n");
        if !open.is_empty() {
            out.push_str("</li>\n");
        }
    }
    out.push_str("</div>\n");
    out
}

// Closes open lists deeper than `level`. If `level` is still deeper than the
// list it lands in (e.g. h1, h3, h2), a new list is opened inside the parent
// item so the heading stays nested under it.
fn close_lists(out: &mut String, open: &mut Vec<u32>, level: u32) {
    while open.len() > 1 && open.last().map_or(false, |&l| level < l) {
        open.pop();
        out.push_str("</ul>\n");
        if open.last().map_or(false, |&parent| level > parent) {
            out.push_str("<ul>\n");
            open.push(level);
            return;
        }
        out.push_str("</li>\n");
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_heading_ids() {
        let html =
            to_html("# Getting Started\n\ntext\n\n## Getting Started\n");
        assert!(html
            .content
            .contains("<h1 id=\"getting-started\">Getting Started</h1>"));
        assert!(html
            .content
            .contains("<h2 id=\"getting-started-1\">Getting Started</h2>"));
    }

    #[test]
    fn test_toc_nesting() {
        let html = to_html("# A\n\n## B\n\n## C\n\n# D\n");
        let wanted = "<div class=\"toc\">\n<ul>\n\
            <li><a href=\"#a\">A</a>\n<ul>\n\
            <li><a href=\"#b\">B</a></li>\n\
            <li><a href=\"#c\">C</a></li>\n\
            </ul>\n</li>\n\
            <li><a href=\"#d\">D</a></li>\n\
            </ul>\n</div>\n";
        assert_eq!(wanted, html.toc);
    }

    #[test]
    fn test_toc_skipped_level_stays_nested() {
        let html = to_html("# A\n\n### B\n\n## C\n\n# D\n");
        let wanted = "<div class=\"toc\">\n<ul>\n\
            <li><a href=\"#a\">A</a>\n<ul>\n\
            <li><a href=\"#b\">B</a></li>\n\
            </ul>\n<ul>\n\
            <li><a href=\"#c\">C</a></li>\n\
            </ul>\n</li>\n\
            <li><a href=\"#d\">D</a></li>\n\
            </ul>\n</div>\n";
        assert_eq!(wanted, html.toc);
    }

    #[test]
    fn test_no_headings_means_empty_toc() {
        let html = to_html("just a paragraph\n");
        assert_eq!("", html.toc);
        assert_eq!("<p>just a paragraph</p>\n", html.content);
    }

    #[test]
    fn test_fenced_code_block() {
        let html = to_html("```rust ignore\nlet x = 1 < 2;\n```\n");
        assert_eq!(
            "<div class=\"codehilite\"><pre><code class=\"language-rust\">\
             let x = 1 &lt; 2;\n</code></pre></div>\n",
            html.content
        );
    }

    #[test]
    fn test_tables() {
        let html = to_html("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.content.contains("<table>"));
        assert!(html.content.contains("<td>1</td>"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!("a &amp; &lt;b&gt; &quot;c&quot;", escape_html("a & <b> \"c\""));
    }
}
