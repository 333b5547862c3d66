/*!
 * Aggregation of font and glyph requirements across subtitle documents.
 *
 * A `RequirementSet` holds the font names and distinct characters needed to
 * render a batch of subtitles. Names are compared case-insensitively and keep
 * the casing they were first seen with.
 */

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::subtitle_processor::ParsedSubtitle;

/// Font names and glyphs required by a batch of subtitle documents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequirementSet {
    /// Lowercased name -> first-seen spelling
    names: BTreeMap<String, String>,

    /// Distinct characters used by dialogue text
    glyphs: BTreeSet<char>,
}

impl RequirementSet {
    /// Create an empty requirement set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a font name, returning false if an equivalent name is already present
    pub fn insert_name(&mut self, name: &str) -> bool {
        let key = name.to_lowercase();
        if self.names.contains_key(&key) {
            return false;
        }
        self.names.insert(key, name.to_string());
        true
    }

    /// Add every character of `text`
    pub fn insert_glyphs(&mut self, text: &str) {
        self.glyphs.extend(text.chars());
    }

    /// Case-insensitive name membership
    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains_key(&name.to_lowercase())
    }

    /// Font names in their display casing, ordered by lowercased name
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.values().map(String::as_str)
    }

    /// Distinct glyphs in code point order
    pub fn glyphs(&self) -> &BTreeSet<char> {
        &self.glyphs
    }

    /// All glyphs concatenated, in code point order
    pub fn glyph_string(&self) -> String {
        self.glyphs.iter().collect()
    }

    pub fn name_count(&self) -> usize {
        self.names.len()
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.glyphs.is_empty()
    }

    /// Render the export format: one name per line, a blank line, then all glyphs
    pub fn to_export_string(&self) -> String {
        let mut out = self.names().collect::<Vec<_>>().join("\n");
        out.push_str("\n\n");
        out.push_str(&self.glyph_string());
        out
    }

    /// Parse text produced by [`RequirementSet::to_export_string`]
    ///
    /// Text without a blank-line separator is read as a bare glyph list, which
    /// is how hand-written character files look.
    pub fn parse_export(text: &str) -> Self {
        let text = text.replace("\r\n", "\n");
        let mut set = Self::new();

        match text.split_once("\n\n") {
            Some((names, glyphs)) => {
                for name in names.lines().map(str::trim).filter(|n| !n.is_empty()) {
                    set.insert_name(name);
                }
                set.insert_glyphs(glyphs);
            }
            None => set.insert_glyphs(text.strip_suffix('\n').unwrap_or(&text)),
        }

        set
    }
}

/// Running union of the requirements of every document added to a session
#[derive(Debug, Default)]
pub struct RequirementAggregator {
    current: RequirementSet,
}

impl RequirementAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one document's output into the running set
    pub fn add<S: AsRef<str>>(&mut self, names: &[S], glyph_text: &str) {
        for name in names {
            self.current.insert_name(name.as_ref());
        }
        self.current.insert_glyphs(glyph_text);
    }

    /// Merge a parsed document
    pub fn add_parsed(&mut self, parsed: &ParsedSubtitle) {
        self.add(&parsed.font_names, &parsed.glyph_text);
    }

    /// Copy of the current requirements
    pub fn snapshot(&self) -> RequirementSet {
        self.current.clone()
    }

    /// Clear both sets
    pub fn reset(&mut self) {
        self.current = RequirementSet::new();
    }
}
