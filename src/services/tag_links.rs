//! Tag-link substitution
//!
//! Rewrites plain-text occurrences of known tag names in markdown into
//! `[name](/tag/slug)` links. Regions that must not be touched are masked
//! with placeholders first, in this order:
//!
//! 1. fenced code blocks (```` ``` ... ``` ````)
//! 2. raw HTML code: `<pre><code>...</code></pre>`, then `<code>...</code>`
//! 3. inline code spans
//! 4. existing markdown links
//!
//! Placeholders are expanded in the inverse order afterwards, so a region
//! masked inside another region comes back intact.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::models::Tag;

/// Protected region classes, in masking order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Region {
    CodeBlock,
    HtmlCode,
    InlineCode,
    Link,
}

impl Region {
    const ALL: [Region; 4] = [
        Region::CodeBlock,
        Region::HtmlCode,
        Region::InlineCode,
        Region::Link,
    ];

    fn label(self) -> &'static str {
        match self {
            Region::CodeBlock => "CODE_BLOCK",
            Region::HtmlCode => "HTML_CODE_BLOCK",
            Region::InlineCode => "INLINE_CODE",
            Region::Link => "LINK_PLACEHOLDER",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    fn placeholder(self, index: usize) -> String {
        format!("__{}_{}__", self.label(), index)
    }
}

struct MaskRule {
    region: Region,
    pattern: Regex,
}

fn rule(region: Region, pattern: &str) -> MaskRule {
    MaskRule {
        region,
        pattern: Regex::new(pattern).expect("mask pattern is valid"),
    }
}

static MASK_RULES: Lazy<Vec<MaskRule>> = Lazy::new(|| {
    vec![
        rule(Region::CodeBlock, r"(?s)```.*?```"),
        rule(Region::HtmlCode, r"(?is)<pre><code.*?</code></pre>"),
        rule(Region::HtmlCode, r"(?is)<code.*?</code>"),
        rule(Region::InlineCode, r"`[^`]+`"),
        rule(Region::Link, r"\[([^\]]+)\]\([^)]+\)"),
    ]
});

static RESTORE_PATTERNS: Lazy<Vec<(Region, Regex)>> = Lazy::new(|| {
    Region::ALL
        .iter()
        .map(|region| {
            let pattern = format!(r"__{}_(\d+)__", region.label());
            (
                *region,
                Regex::new(&pattern).expect("placeholder pattern is valid"),
            )
        })
        .collect()
});

/// Text with protected regions swapped out for placeholders
struct Masked {
    text: String,
    stores: [Vec<String>; 4],
}

impl Masked {
    fn new(text: &str) -> Self {
        let mut masked = Self {
            text: text.to_string(),
            stores: Default::default(),
        };
        for rule in MASK_RULES.iter() {
            masked.mask(rule);
        }
        masked
    }

    fn mask(&mut self, rule: &MaskRule) {
        let store = &mut self.stores[rule.region.index()];
        let replaced = rule.pattern.replace_all(&self.text, |caps: &Captures| {
            store.push(caps[0].to_string());
            rule.region.placeholder(store.len() - 1)
        });
        self.text = replaced.into_owned();
    }

    /// Store `content` as a protected region and return its placeholder
    fn protect(&mut self, region: Region, content: String) -> String {
        let store = &mut self.stores[region.index()];
        store.push(content);
        region.placeholder(store.len() - 1)
    }

    fn restore(self) -> String {
        let Masked { mut text, stores } = self;

        for (region, pattern) in RESTORE_PATTERNS.iter().rev() {
            let store = &stores[region.index()];
            if store.is_empty() {
                continue;
            }
            text = pattern
                .replace_all(&text, |caps: &Captures| {
                    caps[1]
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| store.get(i))
                        .cloned()
                        .unwrap_or_else(|| caps[0].to_string())
                })
                .into_owned();
        }

        text
    }
}

/// A character that prevents a tag name from matching when adjacent to it
fn is_boundary_blocker(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '/'
}

/// Replace every standalone occurrence of `tag.name` with a protected link
fn link_occurrences(masked: &mut Masked, pattern: &Regex, tag: &Tag) {
    let text = std::mem::take(&mut masked.text);
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut pos = 0;

    while let Some(m) = pattern.find_at(&text, pos) {
        let before = text[..m.start()].chars().next_back();
        let after = text[m.end()..].chars().next();

        if before.is_some_and(is_boundary_blocker) || after.is_some_and(is_boundary_blocker) {
            // Retry one character further, so overlapping occurrences are still found
            pos = m.start() + text[m.start()..].chars().next().map_or(1, char::len_utf8);
            continue;
        }

        out.push_str(&text[copied..m.start()]);
        let link = format!("[{}]({})", tag.name, tag.href());
        out.push_str(&masked.protect(Region::Link, link));
        copied = m.end();
        pos = m.end();
    }

    out.push_str(&text[copied..]);
    masked.text = out;
}

/// Rewrite plain-text tag names in `markdown` into links to their tag pages.
///
/// Longer names are linked first and every new link is protected at once,
/// so "React Native" is never split by a shorter "React" tag. Tags with an
/// empty name or slug are ignored. Running the function on its own output
/// changes nothing.
pub fn inject_tag_links(markdown: &str, tags: &[Tag]) -> String {
    if markdown.is_empty() || tags.is_empty() {
        return markdown.to_string();
    }

    let mut sorted: Vec<&Tag> = tags
        .iter()
        .filter(|t| !t.name.is_empty() && !t.slug.is_empty())
        .collect();
    if sorted.is_empty() {
        return markdown.to_string();
    }
    sorted.sort_by(|a, b| b.name.chars().count().cmp(&a.name.chars().count()));

    let mut masked = Masked::new(markdown);

    for tag in sorted {
        match Regex::new(&regex::escape(&tag.name)) {
            Ok(pattern) => link_occurrences(&mut masked, &pattern, tag),
            Err(e) => tracing::warn!("Skipping tag '{}' in link substitution: {}", tag.name, e),
        }
    }

    masked.restore()
}
