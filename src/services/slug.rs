//! Slug helpers.
//!
//! Two flavours live here:
//! - [`pinyin_slug`] turns a title such as “基线对齐” into `ji-xian-dui-qi`
//!   for article and tag URLs;
//! - [`HeadingSlugger`] assigns GitHub-style anchor ids to headings within a
//!   single document, so table-of-contents links match the rendered HTML.

use std::collections::HashMap;

use pinyin::ToPinyin;
use thiserror::Error;

/// Errors that can occur while generating a slug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
}

/// Derive a URL slug from human-readable text.
///
/// Each Chinese character becomes its toneless pinyin syllable; runs of
/// other characters are kept as one segment. Segments are joined with `-`,
/// lower-cased, and every character outside `[a-z0-9-]` becomes `-`.
/// Repeated dashes collapse and leading/trailing dashes are dropped.
pub fn pinyin_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let joined = pinyin_segments(input).join("-").to_lowercase();

    let mut slug = String::with_capacity(joined.len());
    for ch in joined.chars() {
        let ch = if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            ch
        } else {
            '-'
        };
        if ch == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(ch);
    }

    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(slug)
}

fn pinyin_segments(input: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut run = String::new();

    for ch in input.chars() {
        match ch.to_pinyin() {
            Some(py) => {
                if !run.is_empty() {
                    segments.push(std::mem::take(&mut run));
                }
                segments.push(py.plain().to_string());
            }
            None => run.push(ch),
        }
    }

    if !run.is_empty() {
        segments.push(run);
    }
    segments
}

/// GitHub-compatible heading anchor generator.
///
/// Ids are lower-cased, stripped of punctuation and symbols, and spaces
/// become `-`. A repeated id gets `-1`, `-2`, … appended in document order.
#[derive(Default, Debug)]
pub struct HeadingSlugger {
    occurrences: HashMap<String, usize>,
}

impl HeadingSlugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unique anchor id for `heading` within this document
    pub fn slug(&mut self, heading: &str) -> String {
        let original = heading_slug(heading);
        let mut slug = original.clone();

        while self.occurrences.contains_key(&slug) {
            let count = self.occurrences.entry(original.clone()).or_insert(0);
            *count += 1;
            slug = format!("{}-{}", original, count);
        }

        self.occurrences.insert(slug.clone(), 0);
        slug
    }
}

fn heading_slug(heading: &str) -> String {
    heading
        .to_lowercase()
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('-'),
            '-' | '_' => Some(c),
            c if c.is_alphanumeric() => Some(c),
            _ => None,
        })
        .collect()
}
