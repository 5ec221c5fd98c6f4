//! Markdown rendering service
//!
//! This module provides Markdown to HTML conversion with syntax highlighting
//! for code blocks, plus the table of contents shown beside an article.
//! It uses pulldown-cmark for Markdown parsing and syntect for syntax
//! highlighting.
//!
//! On top of plain CommonMark + GFM rendering the renderer:
//! - gives every heading a GitHub-style `id`
//! - puts a horizontal rule before each top-level `h2` that does not already
//!   follow one (and is not the first block)
//! - opens external links in a new tab with `rel="nofollow noreferrer"`
//!
//! # Example
//!
//! ```
//! use inkstone::services::markdown::MarkdownRenderer;
//!
//! let renderer = MarkdownRenderer::new();
//! let rendered = renderer.render("Intro\n\n## Setup\n\nThis is **bold** text.");
//! assert!(rendered.html.contains("<h2 id=\"setup\">"));
//! assert_eq!(rendered.toc[0].id, "setup");
//! ```

use pulldown_cmark::{
    html, CodeBlockKind, CowStr, Event, HeadingLevel, LinkType, Options, Parser, Tag, TagEnd,
};
use serde::Serialize;
use std::sync::Arc;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

use super::slug::HeadingSlugger;

const DEFAULT_THEME: &str = "base16-ocean.dark";

/// One table-of-contents entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    /// Anchor id, identical to the `id` attribute in the rendered HTML
    pub id: String,
    /// Plain heading text
    pub text: String,
    /// Heading level (2 for `h2`, …)
    pub level: u8,
}

impl TocEntry {
    fn section(id: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            text: text.to_string(),
            level: 2,
        }
    }
}

/// Rendered HTML together with the headings it contains
#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderedMarkdown {
    pub html: String,
    pub toc: Vec<TocEntry>,
}

/// Entries appended after the content headings of an article page, for
/// the sections rendered below the body.
pub fn trailing_toc_entries(has_tags: bool, commentable: bool, has_related: bool) -> Vec<TocEntry> {
    let mut entries = Vec::new();
    if has_tags {
        entries.push(TocEntry::section("tag-list", "标签"));
    }
    if commentable {
        entries.push(TocEntry::section("giscus-comments", "评论"));
    }
    if has_related {
        entries.push(TocEntry::section("related-articles", "相关文章"));
    }
    entries
}

/// A thread-safe Markdown renderer with syntax highlighting support.
///
/// Supports headings, lists, links, images, blockquotes, fenced and
/// indented code, tables, strikethrough, task lists and footnotes. Raw HTML
/// is passed through untouched.
#[derive(Clone)]
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme_set: Arc<ThemeSet>,
    theme_name: String,
    toc_levels: Vec<u8>,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    /// Creates a new MarkdownRenderer with default syntax definitions and themes.
    ///
    /// Uses the "base16-ocean.dark" theme and collects `h2`–`h4` into the
    /// table of contents.
    pub fn new() -> Self {
        Self::with_theme(DEFAULT_THEME)
    }

    /// Creates a new MarkdownRenderer with a specific theme.
    ///
    /// Falls back to "base16-ocean.dark" if the theme is not found.
    pub fn with_theme(theme_name: &str) -> Self {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let theme_set = ThemeSet::load_defaults();

        let validated_theme = if theme_set.themes.contains_key(theme_name) {
            theme_name.to_string()
        } else {
            DEFAULT_THEME.to_string()
        };

        Self {
            syntax_set,
            theme_set: Arc::new(theme_set),
            theme_name: validated_theme,
            toc_levels: vec![2, 3, 4],
        }
    }

    /// Replace the heading levels collected into the table of contents
    pub fn with_toc_levels(mut self, levels: &[u8]) -> Self {
        self.toc_levels = levels.to_vec();
        self
    }

    /// Renders Markdown text to HTML and extracts its table of contents.
    pub fn render(&self, markdown: &str) -> RenderedMarkdown {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_FOOTNOTES);

        let parser = Parser::new_ext(markdown, options);

        let events = self.process_events(parser);
        let (events, toc) = self.decorate(events);

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        RenderedMarkdown {
            html: html_output,
            toc,
        }
    }

    /// Processes parser events, applying syntax highlighting to code blocks.
    fn process_events<'a>(&self, parser: Parser<'a>) -> Vec<Event<'a>> {
        let mut events = Vec::new();
        let mut in_code_block = false;
        let mut code_lang: Option<String> = None;
        let mut code_content = String::new();

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    in_code_block = true;
                    code_content.clear();
                    code_lang = match kind {
                        CodeBlockKind::Fenced(lang) => {
                            // Info strings may carry extra words after the language
                            lang.split_whitespace().next().map(str::to_string)
                        }
                        CodeBlockKind::Indented => None,
                    };
                }
                Event::End(TagEnd::CodeBlock) => {
                    in_code_block = false;

                    let highlighted = match code_lang.take() {
                        Some(lang) => self.highlight_code(&code_content, &lang),
                        None => plain_code_block(&code_content),
                    };

                    events.push(Event::Html(highlighted.into()));
                }
                Event::Text(text) if in_code_block => {
                    code_content.push_str(&text);
                }
                _ => {
                    events.push(event);
                }
            }
        }

        events
    }

    /// Assigns heading ids, inserts section rules, rewrites external links
    /// and collects the table of contents.
    fn decorate<'a>(&self, events: Vec<Event<'a>>) -> (Vec<Event<'a>>, Vec<TocEntry>) {
        let mut heading_texts = collect_heading_texts(&events).into_iter();
        let mut slugger = HeadingSlugger::new();
        let mut toc = Vec::new();
        let mut out = Vec::with_capacity(events.len());

        let mut depth = 0usize;
        // None until the first top-level block; Some(true) if it was a rule
        let mut previous_was_rule: Option<bool> = None;
        let mut external_links: Vec<bool> = Vec::new();

        for event in events {
            match event {
                Event::Start(Tag::Heading {
                    level,
                    classes,
                    attrs,
                    ..
                }) => {
                    let text = heading_texts.next().unwrap_or_default();
                    let id = slugger.slug(&text);
                    let level_num = heading_level(level);

                    if depth == 0 {
                        if level == HeadingLevel::H2 && previous_was_rule == Some(false) {
                            out.push(Event::Rule);
                        }
                        previous_was_rule = Some(false);
                    }
                    if self.toc_levels.contains(&level_num) {
                        toc.push(TocEntry {
                            id: id.clone(),
                            text,
                            level: level_num,
                        });
                    }

                    depth += 1;
                    out.push(Event::Start(Tag::Heading {
                        level,
                        id: Some(CowStr::from(id)),
                        classes,
                        attrs,
                    }));
                }
                Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }) => {
                    if depth == 0 {
                        previous_was_rule = Some(false);
                    }
                    depth += 1;
                    if is_external(&dest_url) {
                        external_links.push(true);
                        out.push(Event::InlineHtml(
                            external_anchor(link_type, &dest_url, &title).into(),
                        ));
                    } else {
                        external_links.push(false);
                        out.push(Event::Start(Tag::Link {
                            link_type,
                            dest_url,
                            title,
                            id,
                        }));
                    }
                }
                Event::End(TagEnd::Link) => {
                    depth = depth.saturating_sub(1);
                    if external_links.pop() == Some(true) {
                        out.push(Event::InlineHtml("</a>".into()));
                    } else {
                        out.push(Event::End(TagEnd::Link));
                    }
                }
                Event::Start(tag) => {
                    if depth == 0 {
                        previous_was_rule = Some(false);
                    }
                    depth += 1;
                    out.push(Event::Start(tag));
                }
                Event::End(end) => {
                    depth = depth.saturating_sub(1);
                    out.push(Event::End(end));
                }
                Event::Rule => {
                    if depth == 0 {
                        previous_was_rule = Some(true);
                    }
                    out.push(Event::Rule);
                }
                other => {
                    if depth == 0 {
                        previous_was_rule = Some(false);
                    }
                    out.push(other);
                }
            }
        }

        (out, toc)
    }

    /// Applies syntax highlighting to a code block.
    ///
    /// Falls back to a plain code block with a `language-*` class when the
    /// language is not recognized.
    fn highlight_code(&self, code: &str, lang: &str) -> String {
        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang));

        match syntax {
            Some(syntax) => {
                let theme = &self.theme_set.themes[&self.theme_name];
                match highlighted_html_for_string(code, &self.syntax_set, syntax, theme) {
                    Ok(html) => html,
                    Err(e) => {
                        tracing::debug!("Highlighting failed for {}: {}", lang, e);
                        plain_code_block(code)
                    }
                }
            }
            None => plain_code_block_with_lang(code, lang),
        }
    }
}

/// Plain text of every heading, in document order
fn collect_heading_texts(events: &[Event<'_>]) -> Vec<String> {
    let mut texts = Vec::new();
    let mut current: Option<String> = None;

    for event in events {
        match event {
            Event::Start(Tag::Heading { .. }) => current = Some(String::new()),
            Event::End(TagEnd::Heading(_)) => {
                if let Some(text) = current.take() {
                    texts.push(text);
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(buffer) = current.as_mut() {
                    buffer.push_str(text);
                }
            }
            _ => {}
        }
    }

    texts
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Links not pointing inside the site (`/…`) or the page (`#…`)
fn is_external(url: &str) -> bool {
    !(url.starts_with('/') || url.starts_with('#'))
}

fn external_anchor(link_type: LinkType, dest_url: &str, title: &str) -> String {
    let href = match link_type {
        LinkType::Email => format!("mailto:{}", dest_url),
        _ => dest_url.to_string(),
    };

    let mut anchor = format!("<a href=\"{}\"", html_escape(&href));
    if !title.is_empty() {
        anchor.push_str(&format!(" title=\"{}\"", html_escape(title)));
    }
    anchor.push_str(" rel=\"nofollow noreferrer\" target=\"_blank\">");
    anchor
}

/// Renders a plain code block without syntax highlighting.
fn plain_code_block(code: &str) -> String {
    format!("<pre><code>{}</code></pre>", html_escape(code))
}

/// Renders a plain code block with a language class.
fn plain_code_block_with_lang(code: &str, lang: &str) -> String {
    format!(
        "<pre><code class=\"language-{}\">{}</code></pre>",
        html_escape(lang),
        html_escape(code)
    )
}

/// Escapes HTML special characters in a string.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
