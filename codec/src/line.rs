// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Content lines shared by iCalendar (RFC 5545) and vCard (RFC 6350).
//!
//! ```text
//! contentline = [group "."] name *(";" param) ":" value CRLF
//! ```
//!
//! Parsing lives in the lexer and grammar modules; formatting folds at 75
//! octets with CRLF + SPACE, never splitting a UTF-8 sequence.

use std::fmt::Write as _;

use crate::error::CodecError;
use crate::syntax::parse_lines_from;

/// Maximum octets per physical line, excluding the CRLF.
pub const FOLD_WIDTH: usize = 75;

/// A property parameter such as `TZID=Europe/Berlin` or `TYPE=work,voice`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Parameter name, case preserved.
    pub name: String,
    /// Comma separated values.
    pub values: Vec<String>,
    /// Whether the values were written in double quotes.
    pub quoted: bool,
}

impl Param {
    /// Creates a single-valued parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: vec![value.into()],
            quoted: false,
        }
    }

    /// The first value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    /// Case-insensitive name comparison.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Looks up a parameter by name.
#[must_use]
pub fn find_param<'a>(params: &'a [Param], name: &str) -> Option<&'a Param> {
    params.iter().find(|p| p.is(name))
}

/// One logical (unfolded) content line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLine {
    /// vCard property group, e.g. `item1` in `item1.EMAIL`.
    pub group: Option<String>,
    /// Property name, case preserved.
    pub name: String,
    /// Parameters in source order.
    pub params: Vec<Param>,
    /// Raw value, still escaped.
    pub value: String,
}

impl ContentLine {
    /// Creates a line without group or parameters.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            group: None,
            name: name.into(),
            params: Vec::new(),
            value: value.into(),
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Adds parameters.
    #[must_use]
    pub fn with_params(mut self, params: impl IntoIterator<Item = Param>) -> Self {
        self.params.extend(params);
        self
    }

    /// Case-insensitive name comparison.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    /// Upper-cased property name, used as the side-map key.
    #[must_use]
    pub fn key(&self) -> String {
        self.name.to_ascii_uppercase()
    }

    /// Looks up a parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Param> {
        find_param(&self.params, name)
    }

    /// Parses one logical line, reporting errors against `line_no`.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not exactly one well-formed line.
    pub fn parse(src: &str, line_no: usize) -> Result<Self, CodecError> {
        let mut lines = parse_lines_from(src, line_no)?.into_iter();
        match (lines.next(), lines.next()) {
            (Some((_, line)), None) => Ok(line),
            (None, _) => Err(CodecError::MalformedLine {
                line: line_no,
                reason: "empty line".to_string(),
            }),
            (Some(_), Some((extra, _))) => Err(CodecError::MalformedLine {
                line: extra,
                reason: "more than one content line".to_string(),
            }),
        }
    }

    /// Writes the line folded, terminated with CRLF.
    pub fn write_to(&self, out: &mut String) {
        let mut logical = String::new();
        if let Some(group) = &self.group {
            logical.push_str(group);
            logical.push('.');
        }
        logical.push_str(&self.name);
        for param in &self.params {
            logical.push(';');
            logical.push_str(&param.name);
            logical.push('=');
            for (i, value) in param.values.iter().enumerate() {
                if i > 0 {
                    logical.push(',');
                }
                if param.quoted || needs_quotes(value) {
                    let _ = write!(logical, "\"{value}\"");
                } else {
                    logical.push_str(value);
                }
            }
        }
        logical.push(':');
        logical.push_str(&self.value);
        fold_into(&logical, out);
    }
}

fn needs_quotes(value: &str) -> bool {
    value.contains([':', ';', ','])
}

/// Folds one logical line to [`FOLD_WIDTH`] octets and appends it with CRLF.
pub fn fold_into(logical: &str, out: &mut String) {
    let mut width = 0;
    for ch in logical.chars() {
        let len = ch.len_utf8();
        if width + len > FOLD_WIDTH {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(ch);
        width += len;
    }
    out.push_str("\r\n");
}
