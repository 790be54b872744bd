//! The page renderers. Each takes a [`Template`] and the data for a page and
//! returns the finished HTML. Every page receives the site metadata tokens
//! (`SITE_TITLE`, `AUTHOR`, `URL`, `IMAGE`) in addition to its own.
//!
//! Plain-text values are HTML-escaped before substitution; HTML fragments
//! (article bodies, tables of contents, generated lists) and stack colors are
//! inserted as-is.

use crate::article::Article;
use crate::config::{SiteConfig, TechStack};
use crate::markdown::escape_html;
use crate::template::{Substitutions, Template};
use log::{debug, warn};
use std::collections::HashMap;
use std::fmt::Write;

/// Renders an article's page.
pub fn article_page(
    template: &Template,
    config: &SiteConfig,
    article: &Article,
) -> String {
    let mut subs = site_substitutions(config);
    let keywords: Vec<&str> = article
        .tags
        .iter()
        .map(String::as_str)
        .chain(std::iter::once(article.category.as_str()))
        .collect();
    subs.set("TITLE", escape_html(&article.title))
        .set("DATE", escape_html(&article.date))
        .set("CATEGORY", escape_html(&article.category))
        .set("CONTENT", article.content.as_str())
        .set("TOC", article.toc.as_str())
        .set("DESCRIPTION", escape_html(&article.description))
        .set("KEYWORDS", escape_html(&keywords.join(", ")))
        .set("TAGS", tag_spans(&article.tags));
    fill(template, &subs)
}

/// Renders the index of all articles, newest first. Output pages live at the
/// site root, so entries link into `docs/`.
pub fn posts_index(
    template: &Template,
    config: &SiteConfig,
    articles: &[Article],
) -> String {
    let mut list = String::new();
    for article in sorted_by_date(articles.iter()) {
        push_post_item(&mut list, article, "docs/");
    }

    let mut subs = site_substitutions(config);
    subs.set("POSTS_LIST", list)
        .set("TITLE", "Articles")
        .set("DESCRIPTION", "Technical articles and study notes")
        .set("KEYWORDS", "articles, programming, development, tech notes");
    fill(template, &subs)
}

/// Renders the overview of every configured tech stack, in configuration
/// order, with the number of articles in each.
pub fn tech_stack_overview(
    template: &Template,
    config: &SiteConfig,
    articles: &[Article],
) -> String {
    let counts = count_by_tech_stack(articles);

    let mut blocks = String::new();
    for stack in &config.tech_stacks {
        let count = counts.get(stack.category.as_str()).copied().unwrap_or(0);
        let mut chips = String::new();
        for tech in &stack.technologies {
            let _ = write!(
                chips,
                "<span class=\"tech-item\" \
                 style=\"background-color: {color}20; color: {color}\">{}</span>",
                escape_html(tech),
                color = stack.color,
            );
        }
        let _ = write!(
            blocks,
            r#"
<div class="tech-category" style="border-left-color: {color}">
    <div class="tech-header">
        <h3>{category}</h3>
        <div class="tech-stats">
            <span class="article-count">{count} {noun}</span>
            <a href="tech-stacks/{slug}.html" class="view-articles">View articles &rarr;</a>
        </div>
    </div>
    <div class="tech-items">{chips}</div>
</div>
"#,
            color = stack.color,
            category = escape_html(&stack.category),
            count = count,
            noun = if count == 1 { "article" } else { "articles" },
            slug = escape_html(&stack.slug),
            chips = chips,
        );
    }

    let mut subs = site_substitutions(config);
    subs.set("TECH_STACKS", blocks)
        .set("TITLE", "Tech Stack")
        .set("DESCRIPTION", "Skills and toolchain")
        .set("KEYWORDS", "tech stack, programming skills, developer tools");
    fill(template, &subs)
}

/// Renders the list of articles for the stack whose slug is `slug`. Returns
/// `None` if no stack has that slug. Output pages live one directory below
/// the site root, so entries link into `../docs/`.
pub fn tech_stack_posts(
    template: &Template,
    config: &SiteConfig,
    slug: &str,
    articles: &[Article],
) -> Option<String> {
    let stack = config.find_stack(slug)?;
    let category = escape_html(&stack.category);

    let mut list = String::new();
    let matching = articles.iter().filter(|a| a.tech_stack == stack.category);
    for article in sorted_by_date(matching) {
        push_post_item(&mut list, article, "../docs/");
    }

    let no_posts_message = if list.is_empty() {
        format!(
            "\n<div class=\"no-posts\">\n    \
             <p>No {} articles yet</p>\n    \
             <p>More coming soon...</p>\n</div>\n",
            category
        )
    } else {
        String::new()
    };

    let keywords: Vec<&str> = std::iter::once(stack.category.as_str())
        .chain(stack.technologies.iter().map(String::as_str))
        .collect();

    let mut subs = site_substitutions(config);
    subs.set("POSTS_LIST", list)
        .set("NO_POSTS_MESSAGE", no_posts_message)
        .set("TECH_STACK_NAME", category.as_str())
        .set("TECH_STACK_DESCRIPTION", escape_html(&stack_description(stack)))
        .set("DESCRIPTION", format!("{} articles and study notes", category))
        .set("KEYWORDS", escape_html(&keywords.join(", ")));
    Some(fill(template, &subs))
}

/// Describes a stack by naming up to its first three technologies.
pub fn stack_description(stack: &TechStack) -> String {
    if stack.technologies.is_empty() {
        format!("Articles and hands-on notes about {}", stack.category)
    } else {
        let named: Vec<&str> = stack
            .technologies
            .iter()
            .take(3)
            .map(String::as_str)
            .collect();
        format!(
            "A closer look at the {} stack, covering {} and more",
            stack.category,
            named.join(", ")
        )
    }
}

/// Counts articles per `tech_stack`.
pub fn count_by_tech_stack(articles: &[Article]) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for article in articles {
        *counts.entry(article.tech_stack.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Orders articles by their date string, newest first. The sort is stable so
/// articles with equal dates keep their relative order.
pub fn sorted_by_date<'a>(
    articles: impl Iterator<Item = &'a Article>,
) -> Vec<&'a Article> {
    let mut sorted: Vec<&Article> = articles.collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted
}

fn site_substitutions(config: &SiteConfig) -> Substitutions {
    let mut subs = Substitutions::new();
    subs.set("SITE_TITLE", escape_html(&config.site.title))
        .set("AUTHOR", escape_html(&config.site.author))
        .set("URL", escape_html(&config.site.url))
        .set("IMAGE", escape_html(&config.site.avatar));
    subs
}

fn tag_spans(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| format!("<span class=\"tag\">{}</span>", escape_html(tag)))
        .collect()
}

fn push_post_item(out: &mut String, article: &Article, docs_prefix: &str) {
    let _ = write!(
        out,
        r#"
<article class="post-item">
    <h3><a href="{prefix}{filename}.html">{title}</a></h3>
    <div class="post-meta">
        <span class="date">{date}</span>
        <span class="category">{category}</span>
    </div>
    <div class="tags">{tags}</div>
</article>
"#,
        prefix = docs_prefix,
        filename = escape_html(&article.filename),
        title = escape_html(&article.title),
        date = escape_html(&article.date),
        category = escape_html(&article.category),
        tags = tag_spans(&article.tags),
    );
}

// Renders `template`, logging any tokens left without a value.
fn fill(template: &Template, subs: &Substitutions) -> String {
    let rendered = template.render(subs);
    for token in &rendered.unresolved {
        warn!(
            "template `{}`: no value for `{{{{{}}}}}`",
            template.name, token
        );
    }
    if !rendered.unused.is_empty() {
        debug!(
            "template `{}` doesn't use {:?}",
            template.name, rendered.unused
        );
    }
    rendered.html
}
