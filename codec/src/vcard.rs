// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! vCard records (RFC 6350, with the 3.0 forms CardDAV servers still send).
//!
//! Output order: `VERSION PRODID UID FN N NICKNAME ORG TITLE EMAIL* TEL* ADR*
//! BDAY NOTE CATEGORIES REV`, then unrecognized properties. Grouped lines
//! (`item1.EMAIL`) are always kept verbatim.

use jiff::Timestamp;

use crate::component::{RawComponent, Unrecognized, parse_components};
use crate::error::CodecError;
use crate::ical::PRODUCT_ID;
use crate::line::{ContentLine, Param, find_param};
use crate::value::{Text, escape_text, join_text, parse_timestamp, split_text, unescape_text};

/// A value with its parameters, e.g. `EMAIL;TYPE=work:a@b.c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedValue {
    /// Raw value.
    pub value: String,
    /// Parameters, kept verbatim.
    pub params: Vec<Param>,
}

impl TypedValue {
    /// Creates a value without parameters.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            params: Vec::new(),
        }
    }

    /// Adds a `TYPE` parameter.
    #[must_use]
    pub fn with_type(mut self, kind: impl Into<String>) -> Self {
        self.params.push(Param::new("TYPE", kind));
        self
    }

    /// Values of every `TYPE` parameter.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.params
            .iter()
            .filter(|p| p.is("TYPE"))
            .flat_map(|p| p.values.iter().map(String::as_str))
    }
}

/// A structured value split on `;` (`N`, `ADR`, `ORG`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Structured {
    /// Unescaped components in order.
    pub parts: Vec<String>,
    /// Parameters, kept verbatim.
    pub params: Vec<Param>,
}

impl Structured {
    /// Creates a structured value from its components.
    #[must_use]
    pub fn new<S: Into<String>>(parts: impl IntoIterator<Item = S>) -> Self {
        Self {
            parts: parts.into_iter().map(Into::into).collect(),
            params: Vec::new(),
        }
    }

    /// Component at `idx`, empty when absent.
    #[must_use]
    pub fn part(&self, idx: usize) -> &str {
        self.parts.get(idx).map_or("", String::as_str)
    }
}

/// One vCard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VCard {
    /// `VERSION`.
    pub version: Option<String>,
    /// `PRODID`.
    pub prod_id: Option<String>,
    /// `UID`.
    pub uid: String,
    /// `FN`.
    pub formatted_name: Option<Text>,
    /// `N`: family, given, additional, prefixes, suffixes.
    pub name: Option<Structured>,
    /// `NICKNAME` list.
    pub nicknames: Vec<String>,
    /// `ORG`: organization then units.
    pub organization: Option<Structured>,
    /// `TITLE`.
    pub title: Option<Text>,
    /// `EMAIL` lines.
    pub emails: Vec<TypedValue>,
    /// `TEL` lines.
    pub phones: Vec<TypedValue>,
    /// `ADR` lines.
    pub addresses: Vec<Structured>,
    /// `BDAY`, raw.
    pub birthday: Option<TypedValue>,
    /// `NOTE`.
    pub note: Option<Text>,
    /// `CATEGORIES`.
    pub categories: Vec<String>,
    /// `REV`, raw.
    pub rev: Option<String>,
    /// Properties kept verbatim.
    pub unrecognized: Unrecognized,
}

impl VCard {
    /// Creates a vCard 3.0 with a UID and display name.
    #[must_use]
    pub fn new(uid: impl Into<String>, formatted_name: impl Into<String>) -> Self {
        Self {
            version: Some("3.0".to_string()),
            prod_id: Some(PRODUCT_ID.to_string()),
            uid: uid.into(),
            formatted_name: Some(Text::new(formatted_name)),
            name: None,
            nicknames: Vec::new(),
            organization: None,
            title: None,
            emails: Vec::new(),
            phones: Vec::new(),
            addresses: Vec::new(),
            birthday: None,
            note: None,
            categories: Vec::new(),
            rev: None,
            unrecognized: Unrecognized::new(),
        }
    }

    /// Parses the first VCARD in `src`.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no VCARD or it has no UID.
    pub fn parse(src: &str) -> Result<Self, CodecError> {
        let raw = parse_components(src)?
            .into_iter()
            .find(|c| c.is("VCARD"))
            .ok_or(CodecError::MissingComponent("VCARD"))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawComponent) -> Result<Self, CodecError> {
        let mut card = Self::new(String::new(), String::new());
        card.version = None;
        card.prod_id = None;
        card.formatted_name = None;

        let mut uid = None;
        for line in raw.properties {
            if line.group.is_some() || !card.accept(&line, &mut uid) {
                card.unrecognized.push(line);
            }
        }
        card.uid = uid.ok_or(CodecError::MissingUid("VCARD"))?;
        Ok(card)
    }

    fn accept(&mut self, line: &ContentLine, uid: &mut Option<String>) -> bool {
        let plain = || line.params.is_empty().then(|| line.value.clone());
        match line.key().as_str() {
            "VERSION" => set_once(&mut self.version, plain()),
            "PRODID" => set_once(&mut self.prod_id, plain()),
            "UID" => set_once(uid, plain()),
            "FN" => set_once(&mut self.formatted_name, Some(text(line))),
            "N" => set_once(&mut self.name, structured(line)),
            "NICKNAME" => set_list(&mut self.nicknames, line),
            "ORG" => set_once(&mut self.organization, structured(line)),
            "TITLE" => set_once(&mut self.title, Some(text(line))),
            "EMAIL" => push(&mut self.emails, typed(line)),
            "TEL" => push(&mut self.phones, typed(line)),
            "ADR" => match structured(line) {
                Some(adr) => push(&mut self.addresses, adr),
                None => false,
            },
            "BDAY" => set_once(&mut self.birthday, Some(typed(line))),
            "NOTE" => set_once(&mut self.note, Some(text(line))),
            "CATEGORIES" => set_list(&mut self.categories, line),
            "REV" => set_once(&mut self.rev, plain()),
            _ => false,
        }
    }

    /// Serializes in canonical order.
    #[must_use]
    pub fn to_wire(&self) -> String {
        let mut out = String::new();
        ContentLine::new("BEGIN", "VCARD").write_to(&mut out);
        if let Some(version) = &self.version {
            ContentLine::new("VERSION", version.clone()).write_to(&mut out);
        }
        if let Some(prod_id) = &self.prod_id {
            ContentLine::new("PRODID", prod_id.clone()).write_to(&mut out);
        }
        ContentLine::new("UID", self.uid.clone()).write_to(&mut out);
        write_text(&mut out, "FN", self.formatted_name.as_ref());
        if let Some(name) = &self.name {
            structured_line("N", name).write_to(&mut out);
        }
        if !self.nicknames.is_empty() {
            ContentLine::new("NICKNAME", join_text(&self.nicknames, ',')).write_to(&mut out);
        }
        if let Some(org) = &self.organization {
            structured_line("ORG", org).write_to(&mut out);
        }
        write_text(&mut out, "TITLE", self.title.as_ref());
        for email in &self.emails {
            typed_line("EMAIL", email).write_to(&mut out);
        }
        for phone in &self.phones {
            typed_line("TEL", phone).write_to(&mut out);
        }
        for adr in &self.addresses {
            structured_line("ADR", adr).write_to(&mut out);
        }
        if let Some(bday) = &self.birthday {
            typed_line("BDAY", bday).write_to(&mut out);
        }
        write_text(&mut out, "NOTE", self.note.as_ref());
        if !self.categories.is_empty() {
            ContentLine::new("CATEGORIES", join_text(&self.categories, ',')).write_to(&mut out);
        }
        if let Some(rev) = &self.rev {
            ContentLine::new("REV", rev.clone()).write_to(&mut out);
        }
        self.unrecognized.write_to(&mut out);
        ContentLine::new("END", "VCARD").write_to(&mut out);
        out
    }

    /// `REV` as an instant.
    #[must_use]
    pub fn last_modified(&self) -> Option<Timestamp> {
        parse_timestamp(self.rev.as_deref()?)
    }

    /// Display name: `FN`, else given and family name.
    #[must_use]
    pub fn display_name(&self) -> Option<String> {
        if let Some(fn_) = &self.formatted_name {
            return Some(fn_.value.clone());
        }
        let name = self.name.as_ref()?;
        let joined = [name.part(1), name.part(0)]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        (!joined.is_empty()).then_some(joined)
    }

    /// Preferred email: the one typed `pref`, else the first.
    #[must_use]
    pub fn preferred_email(&self) -> Option<&str> {
        self.emails
            .iter()
            .find(|e| {
                e.types().any(|t| t.eq_ignore_ascii_case("pref"))
                    || find_param(&e.params, "PREF").is_some()
            })
            .or_else(|| self.emails.first())
            .map(|e| e.value.as_str())
    }
}

fn set_once<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
    match (slot.is_none(), value) {
        (true, Some(value)) => {
            *slot = Some(value);
            true
        }
        _ => false,
    }
}

fn push<T>(list: &mut Vec<T>, value: T) -> bool {
    list.push(value);
    true
}

fn set_list(list: &mut Vec<String>, line: &ContentLine) -> bool {
    if !list.is_empty() || !line.params.is_empty() {
        return false;
    }
    let parts = split_text(&line.value, ',');
    if join_text(&parts, ',') != line.value {
        return false;
    }
    *list = parts;
    true
}

fn text(line: &ContentLine) -> Text {
    Text {
        value: unescape_text(&line.value),
        params: line.params.clone(),
    }
}

fn typed(line: &ContentLine) -> TypedValue {
    TypedValue {
        value: line.value.clone(),
        params: line.params.clone(),
    }
}

/// Splits a structured value; rejected when writing it back would differ.
fn structured(line: &ContentLine) -> Option<Structured> {
    let value = Structured {
        parts: split_text(&line.value, ';'),
        params: line.params.clone(),
    };
    (join_text(&value.parts, ';') == line.value).then_some(value)
}

fn structured_line(name: &str, value: &Structured) -> ContentLine {
    ContentLine::new(name, join_text(&value.parts, ';')).with_params(value.params.clone())
}

fn typed_line(name: &str, value: &TypedValue) -> ContentLine {
    ContentLine::new(name, value.value.clone()).with_params(value.params.clone())
}

fn write_text(out: &mut String, name: &str, text: Option<&Text>) {
    if let Some(text) = text {
        ContentLine::new(name, escape_text(&text.value))
            .with_params(text.params.clone())
            .write_to(out);
    }
}
