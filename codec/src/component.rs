// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Generic `BEGIN`/`END` component tree and the side-map of properties the
//! typed model does not understand.

use std::collections::BTreeMap;

use crate::error::CodecError;
use crate::line::ContentLine;
use crate::syntax::parse_lines;

/// A component with its properties and children, values still raw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawComponent {
    /// Component name as written, e.g. `VEVENT`.
    pub name: String,
    /// Properties in source order.
    pub properties: Vec<ContentLine>,
    /// Nested components in source order.
    pub components: Vec<RawComponent>,
}

impl RawComponent {
    /// Creates an empty component.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            components: Vec::new(),
        }
    }

    /// Case-insensitive name comparison.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// First property with the given name.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&ContentLine> {
        self.properties.iter().find(|p| p.is(name))
    }

    /// Writes the component and its children.
    pub fn write_to(&self, out: &mut String) {
        ContentLine::new("BEGIN", self.name.clone()).write_to(out);
        for prop in &self.properties {
            prop.write_to(out);
        }
        for child in &self.components {
            child.write_to(out);
        }
        ContentLine::new("END", self.name.clone()).write_to(out);
    }
}

/// Parses every top-level component in `src`.
///
/// # Errors
///
/// Returns an error on malformed lines, properties outside any component,
/// mismatched `END` lines, or components left open at end of input.
pub fn parse_components(src: &str) -> Result<Vec<RawComponent>, CodecError> {
    let mut roots = Vec::new();
    let mut stack: Vec<RawComponent> = Vec::new();

    for (_, line) in parse_lines(src)? {
        if line.is("BEGIN") {
            stack.push(RawComponent::new(line.value.trim()));
        } else if line.is("END") {
            let found = line.value.trim();
            let Some(done) = stack.pop() else {
                return Err(CodecError::OrphanProperty(line.name));
            };
            if !done.name.eq_ignore_ascii_case(found) {
                return Err(CodecError::MismatchedEnd {
                    expected: done.name,
                    found: found.to_string(),
                });
            }
            match stack.last_mut() {
                Some(parent) => parent.components.push(done),
                None => roots.push(done),
            }
        } else {
            match stack.last_mut() {
                Some(current) => current.properties.push(line),
                None => return Err(CodecError::OrphanProperty(line.name)),
            }
        }
    }

    match stack.pop() {
        Some(open) => Err(CodecError::Unterminated(open.name)),
        None => Ok(roots),
    }
}

/// Properties preserved verbatim, keyed by upper-cased name.
///
/// Keys serialize in sorted order; lines under one key keep their original
/// order, so output is stable across parse/format cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unrecognized(BTreeMap<String, Vec<ContentLine>>);

impl Unrecognized {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a line under its name.
    pub fn push(&mut self, line: ContentLine) {
        self.0.entry(line.key()).or_default().push(line);
    }

    /// Lines stored under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[ContentLine]> {
        self.0.get(&name.to_ascii_uppercase()).map(Vec::as_slice)
    }

    /// Whether any line is stored under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_uppercase())
    }

    /// Removes and returns the lines stored under `name`.
    pub fn remove(&mut self, name: &str) -> Option<Vec<ContentLine>> {
        self.0.remove(&name.to_ascii_uppercase())
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct property names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Property names in output order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// All lines in output order.
    pub fn lines(&self) -> impl Iterator<Item = &ContentLine> {
        self.0.values().flatten()
    }

    /// Copies every key present in `other` but absent here.
    ///
    /// Returns whether anything was added.
    pub fn merge_missing_from(&mut self, other: &Self) -> bool {
        let mut changed = false;
        for (key, lines) in &other.0 {
            if !self.0.contains_key(key) {
                self.0.insert(key.clone(), lines.clone());
                changed = true;
            }
        }
        changed
    }

    /// Whether `other` holds a key this map lacks.
    #[must_use]
    pub fn lacks_any_of(&self, other: &Self) -> bool {
        other.0.keys().any(|k| !self.0.contains_key(k))
    }

    /// Writes every line in output order.
    pub fn write_to(&self, out: &mut String) {
        for line in self.lines() {
            line.write_to(out);
        }
    }
}
