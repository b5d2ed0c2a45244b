// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! iCalendar objects holding VEVENT and VTODO entries (RFC 5545).
//!
//! Entries are written in a fixed property order:
//!
//! ```text
//! UID DTSTAMP CREATED LAST-MODIFIED SEQUENCE RECURRENCE-ID DTSTART
//! DTEND|DUE|DURATION COMPLETED RRULE EXDATE* RDATE* SUMMARY DESCRIPTION
//! LOCATION CATEGORIES STATUS CLASS
//! event: TRANSP ORGANIZER ATTENDEE*
//! task:  PERCENT-COMPLETE PRIORITY RELATED-TO*
//! unrecognized properties, then nested components (VALARM, ...)
//! ```
//!
//! A recognized property is only taken into the typed model when writing it
//! back reproduces the original line; otherwise it stays in the side-map.

use std::fmt::Display;
use std::str::FromStr;

use jiff::Timestamp;

use crate::component::{RawComponent, Unrecognized, parse_components};
use crate::error::CodecError;
use crate::line::{ContentLine, Param};
use crate::value::{DateTimeValue, Text, escape_text, join_text, split_text, unescape_text};

/// Product identifier written into calendars created locally.
pub const PRODUCT_ID: &str = "-//yzx9//davsync//EN";

/// Status of an event or task.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::EnumString,
    strum::AsRefStr,
    strum::Display,
)]
#[strum(serialize_all = "SCREAMING-KEBAB-CASE")]
pub enum Status {
    /// Event is tentative.
    Tentative,
    /// Event is confirmed.
    Confirmed,
    /// Event or task is cancelled.
    Cancelled,
    /// Task needs action.
    NeedsAction,
    /// Task is completed.
    Completed,
    /// Task is in progress.
    InProcess,
}

/// Access classification.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::EnumString,
    strum::AsRefStr,
    strum::Display,
)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Classification {
    /// Visible to everyone.
    Public,
    /// Visible to the owner only.
    Private,
    /// Details hidden.
    Confidential,
}

/// Whether an event blocks time.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    strum::EnumString,
    strum::AsRefStr,
    strum::Display,
)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Transparency {
    /// Busy.
    Opaque,
    /// Free.
    Transparent,
}

/// End of an entry: an instant (`DTEND` for events, `DUE` for tasks) or a
/// `DURATION`. The two forms exclude each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum End {
    /// `DTEND` or `DUE`.
    At(DateTimeValue),
    /// Raw `DURATION` value, e.g. `PT1H`.
    Duration(String),
}

/// A list of dates from one `EXDATE` or `RDATE` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateList(pub Vec<DateTimeValue>);

/// Organizer or attendee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    /// Calendar address, usually `mailto:`.
    pub address: String,
    /// Parameters such as `CN`, `ROLE` and `PARTSTAT`, kept verbatim.
    pub params: Vec<Param>,
}

impl Participant {
    /// Creates a participant without parameters.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            params: Vec::new(),
        }
    }
}

/// A `RELATED-TO` link to another entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// UID of the related entry.
    pub uid: String,
    /// Parameters, `RELTYPE` among them.
    pub params: Vec<Param>,
}

impl Relation {
    /// Creates a parent link.
    #[must_use]
    pub fn parent(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            params: Vec::new(),
        }
    }

    /// Whether this relation points at the parent (`RELTYPE` absent or `PARENT`).
    #[must_use]
    pub fn is_parent(&self) -> bool {
        crate::line::find_param(&self.params, "RELTYPE")
            .and_then(Param::value)
            .is_none_or(|v| v.eq_ignore_ascii_case("PARENT"))
    }
}

/// Event specific fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFields {
    /// `TRANSP`.
    pub transparency: Option<Transparency>,
    /// `ORGANIZER`.
    pub organizer: Option<Participant>,
    /// `ATTENDEE` lines in order.
    pub attendees: Vec<Participant>,
}

/// Task specific fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFields {
    /// `PERCENT-COMPLETE`, 0 to 100.
    pub percent_complete: Option<u8>,
    /// `PRIORITY`, 0 (undefined) to 9.
    pub priority: Option<u8>,
    /// `RELATED-TO` lines in order.
    pub related_to: Vec<Relation>,
}

/// Fields that only exist on one entry kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryDetails {
    /// VEVENT.
    Event(EventFields),
    /// VTODO.
    Task(TaskFields),
}

/// One VEVENT or VTODO.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// `UID`, shared by the master and its overrides.
    pub uid: String,
    /// `DTSTAMP`.
    pub dtstamp: Option<DateTimeValue>,
    /// `CREATED`.
    pub created: Option<DateTimeValue>,
    /// `LAST-MODIFIED`.
    pub last_modified: Option<DateTimeValue>,
    /// `SEQUENCE` revision counter.
    pub sequence: Option<u32>,
    /// `RECURRENCE-ID`; set on overrides, absent on the master.
    pub recurrence_id: Option<DateTimeValue>,
    /// `DTSTART`.
    pub start: Option<DateTimeValue>,
    /// `DTEND` or `DURATION` for events, `DUE` or `DURATION` for tasks.
    pub end: Option<End>,
    /// `COMPLETED`.
    pub completed: Option<DateTimeValue>,
    /// Raw `RRULE` value.
    pub rrule: Option<String>,
    /// `EXDATE` lines in order.
    pub exdates: Vec<DateList>,
    /// `RDATE` lines in order.
    pub rdates: Vec<DateList>,
    /// `SUMMARY`.
    pub summary: Option<Text>,
    /// `DESCRIPTION`.
    pub description: Option<Text>,
    /// `LOCATION`.
    pub location: Option<Text>,
    /// `CATEGORIES`, unescaped.
    pub categories: Vec<String>,
    /// `STATUS`.
    pub status: Option<Status>,
    /// `CLASS`.
    pub class: Option<Classification>,
    /// Event or task specific fields.
    pub details: EntryDetails,
    /// Properties kept verbatim.
    pub unrecognized: Unrecognized,
    /// Nested components (VALARM, ...) kept verbatim.
    pub subcomponents: Vec<RawComponent>,
}

impl Entry {
    /// Creates an empty event.
    #[must_use]
    pub fn event(uid: impl Into<String>) -> Self {
        Self::empty(uid.into(), EntryDetails::Event(EventFields::default()))
    }

    /// Creates an empty task.
    #[must_use]
    pub fn task(uid: impl Into<String>) -> Self {
        Self::empty(uid.into(), EntryDetails::Task(TaskFields::default()))
    }

    fn empty(uid: String, details: EntryDetails) -> Self {
        Self {
            uid,
            dtstamp: None,
            created: None,
            last_modified: None,
            sequence: None,
            recurrence_id: None,
            start: None,
            end: None,
            completed: None,
            rrule: None,
            exdates: Vec::new(),
            rdates: Vec::new(),
            summary: None,
            description: None,
            location: None,
            categories: Vec::new(),
            status: None,
            class: None,
            details,
            unrecognized: Unrecognized::new(),
            subcomponents: Vec::new(),
        }
    }

    /// Whether this is a VTODO.
    #[must_use]
    pub const fn is_task(&self) -> bool {
        matches!(self.details, EntryDetails::Task(_))
    }

    /// Component name on the wire.
    #[must_use]
    pub const fn component_name(&self) -> &'static str {
        if self.is_task() { "VTODO" } else { "VEVENT" }
    }

    const fn end_name(&self) -> &'static str {
        if self.is_task() { "DUE" } else { "DTEND" }
    }

    /// Task fields, if this is a task.
    #[must_use]
    pub const fn task_fields(&self) -> Option<&TaskFields> {
        match &self.details {
            EntryDetails::Task(task) => Some(task),
            EntryDetails::Event(_) => None,
        }
    }

    /// Event fields, if this is an event.
    #[must_use]
    pub const fn event_fields(&self) -> Option<&EventFields> {
        match &self.details {
            EntryDetails::Event(event) => Some(event),
            EntryDetails::Task(_) => None,
        }
    }

    /// UID of the parent task, if linked.
    #[must_use]
    pub fn parent_uid(&self) -> Option<&str> {
        self.task_fields()?
            .related_to
            .iter()
            .find(|r| r.is_parent())
            .map(|r| r.uid.as_str())
    }

    /// Whether the entry lasts whole days.
    #[must_use]
    pub fn is_all_day(&self) -> bool {
        self.start.as_ref().is_some_and(DateTimeValue::is_date)
    }

    /// `LAST-MODIFIED` as an instant.
    #[must_use]
    pub fn last_modified_at(&self) -> Option<Timestamp> {
        self.last_modified.as_ref()?.to_timestamp()
    }

    fn from_raw(raw: RawComponent) -> Result<Self, CodecError> {
        let mut entry = if raw.is("VTODO") {
            Self::task(String::new())
        } else {
            Self::event(String::new())
        };

        let end_name = entry.end_name();
        if raw.property(end_name).is_some() && raw.property("DURATION").is_some() {
            return Err(CodecError::Conflicting {
                first: end_name,
                second: "DURATION",
            });
        }

        let mut uid = None;
        for line in raw.properties {
            if line.group.is_some() || !entry.accept(&line, &mut uid) {
                entry.unrecognized.push(line);
            }
        }
        entry.uid = uid.ok_or(CodecError::MissingUid(entry.component_name()))?;
        entry.subcomponents = raw.components;
        Ok(entry)
    }

    /// Takes `line` into the typed model; `false` leaves it unrecognized.
    fn accept(&mut self, line: &ContentLine, uid: &mut Option<String>) -> bool {
        let key = line.key();
        match key.as_str() {
            "UID" => set_once(uid, plain(line)),
            "DTSTAMP" => set_once(&mut self.dtstamp, datetime(line)),
            "CREATED" => set_once(&mut self.created, datetime(line)),
            "LAST-MODIFIED" => set_once(&mut self.last_modified, datetime(line)),
            "SEQUENCE" => set_once(&mut self.sequence, number(line)),
            "RECURRENCE-ID" => set_once(&mut self.recurrence_id, datetime(line)),
            "DTSTART" => set_once(&mut self.start, datetime(line)),
            "DURATION" => set_once(&mut self.end, plain(line).map(End::Duration)),
            k if k == self.end_name() => set_once(&mut self.end, datetime(line).map(End::At)),
            "COMPLETED" => set_once(&mut self.completed, datetime(line)),
            "RRULE" => set_once(&mut self.rrule, plain(line)),
            "EXDATE" => push_some(&mut self.exdates, date_list(line)),
            "RDATE" => push_some(&mut self.rdates, date_list(line)),
            "SUMMARY" => set_once(&mut self.summary, Some(text(line))),
            "DESCRIPTION" => set_once(&mut self.description, Some(text(line))),
            "LOCATION" => set_once(&mut self.location, Some(text(line))),
            "CATEGORIES" => {
                if !self.categories.is_empty() || !line.params.is_empty() {
                    return false;
                }
                self.categories = split_text(&line.value, ',');
                true
            }
            "STATUS" => set_once(&mut self.status, keyword(line)),
            "CLASS" => set_once(&mut self.class, keyword(line)),
            _ => match &mut self.details {
                EntryDetails::Event(event) => event.accept(&key, line),
                EntryDetails::Task(task) => task.accept(&key, line),
            },
        }
    }

    fn write_to(&self, out: &mut String) {
        let name = self.component_name();
        ContentLine::new("BEGIN", name).write_to(out);
        ContentLine::new("UID", self.uid.clone()).write_to(out);
        write_datetime(out, "DTSTAMP", self.dtstamp.as_ref());
        write_datetime(out, "CREATED", self.created.as_ref());
        write_datetime(out, "LAST-MODIFIED", self.last_modified.as_ref());
        if let Some(seq) = self.sequence {
            ContentLine::new("SEQUENCE", seq.to_string()).write_to(out);
        }
        write_datetime(out, "RECURRENCE-ID", self.recurrence_id.as_ref());
        write_datetime(out, "DTSTART", self.start.as_ref());
        match &self.end {
            Some(End::At(at)) => write_datetime(out, self.end_name(), Some(at)),
            Some(End::Duration(d)) => ContentLine::new("DURATION", d.clone()).write_to(out),
            None => {}
        }
        write_datetime(out, "COMPLETED", self.completed.as_ref());
        if let Some(rrule) = &self.rrule {
            ContentLine::new("RRULE", rrule.clone()).write_to(out);
        }
        for list in &self.exdates {
            write_date_list(out, "EXDATE", list);
        }
        for list in &self.rdates {
            write_date_list(out, "RDATE", list);
        }
        write_text(out, "SUMMARY", self.summary.as_ref());
        write_text(out, "DESCRIPTION", self.description.as_ref());
        write_text(out, "LOCATION", self.location.as_ref());
        if !self.categories.is_empty() {
            ContentLine::new("CATEGORIES", join_text(&self.categories, ',')).write_to(out);
        }
        if let Some(status) = self.status {
            ContentLine::new("STATUS", status.as_ref()).write_to(out);
        }
        if let Some(class) = self.class {
            ContentLine::new("CLASS", class.as_ref()).write_to(out);
        }
        match &self.details {
            EntryDetails::Event(event) => event.write_to(out),
            EntryDetails::Task(task) => task.write_to(out),
        }
        self.unrecognized.write_to(out);
        for sub in &self.subcomponents {
            sub.write_to(out);
        }
        ContentLine::new("END", name).write_to(out);
    }
}

impl EventFields {
    fn accept(&mut self, key: &str, line: &ContentLine) -> bool {
        match key {
            "TRANSP" => set_once(&mut self.transparency, keyword(line)),
            "ORGANIZER" => set_once(&mut self.organizer, Some(participant(line))),
            "ATTENDEE" => {
                self.attendees.push(participant(line));
                true
            }
            _ => false,
        }
    }

    fn write_to(&self, out: &mut String) {
        if let Some(transp) = self.transparency {
            ContentLine::new("TRANSP", transp.as_ref()).write_to(out);
        }
        if let Some(organizer) = &self.organizer {
            write_participant(out, "ORGANIZER", organizer);
        }
        for attendee in &self.attendees {
            write_participant(out, "ATTENDEE", attendee);
        }
    }
}

impl TaskFields {
    fn accept(&mut self, key: &str, line: &ContentLine) -> bool {
        match key {
            "PERCENT-COMPLETE" => set_once(
                &mut self.percent_complete,
                number(line).filter(|p: &u8| *p <= 100),
            ),
            "PRIORITY" => set_once(&mut self.priority, number(line).filter(|p: &u8| *p <= 9)),
            "RELATED-TO" => {
                self.related_to.push(Relation {
                    uid: unescape_text(&line.value),
                    params: line.params.clone(),
                });
                true
            }
            _ => false,
        }
    }

    fn write_to(&self, out: &mut String) {
        if let Some(percent) = self.percent_complete {
            ContentLine::new("PERCENT-COMPLETE", percent.to_string()).write_to(out);
        }
        if let Some(priority) = self.priority {
            ContentLine::new("PRIORITY", priority.to_string()).write_to(out);
        }
        for rel in &self.related_to {
            ContentLine::new("RELATED-TO", escape_text(&rel.uid))
                .with_params(rel.params.clone())
                .write_to(out);
        }
    }
}

/// A VCALENDAR holding one resource's entries.
///
/// A resource normally carries one entry, or a recurring master together with
/// its `RECURRENCE-ID` overrides, all sharing one UID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarObject {
    /// `PRODID`.
    pub prod_id: Option<String>,
    /// `VERSION`.
    pub version: Option<String>,
    /// `CALSCALE`.
    pub calscale: Option<String>,
    /// `METHOD`.
    pub method: Option<String>,
    /// Calendar level properties kept verbatim.
    pub unrecognized: Unrecognized,
    /// VTIMEZONE blocks, kept verbatim.
    pub timezones: Vec<RawComponent>,
    /// VEVENT and VTODO entries.
    pub entries: Vec<Entry>,
    /// Other components (VJOURNAL, VFREEBUSY, ...), kept verbatim.
    pub other_components: Vec<RawComponent>,
}

impl CalendarObject {
    /// Wraps a single entry in a new calendar.
    #[must_use]
    pub fn new(entry: Entry) -> Self {
        Self {
            prod_id: Some(PRODUCT_ID.to_string()),
            version: Some("2.0".to_string()),
            calscale: None,
            method: None,
            unrecognized: Unrecognized::new(),
            timezones: Vec::new(),
            entries: vec![entry],
            other_components: Vec::new(),
        }
    }

    /// Parses an iCalendar stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a VCALENDAR with at least one
    /// VEVENT or VTODO, if an entry has no UID, or if an entry carries both an
    /// end instant and a duration.
    pub fn parse(src: &str) -> Result<Self, CodecError> {
        let root = parse_components(src)?
            .into_iter()
            .find(|c| c.is("VCALENDAR"))
            .ok_or(CodecError::MissingComponent("VCALENDAR"))?;

        let mut cal = Self {
            prod_id: None,
            version: None,
            calscale: None,
            method: None,
            unrecognized: Unrecognized::new(),
            timezones: Vec::new(),
            entries: Vec::new(),
            other_components: Vec::new(),
        };

        for line in root.properties {
            let slot = match line.key().as_str() {
                "PRODID" => &mut cal.prod_id,
                "VERSION" => &mut cal.version,
                "CALSCALE" => &mut cal.calscale,
                "METHOD" => &mut cal.method,
                _ => {
                    cal.unrecognized.push(line);
                    continue;
                }
            };
            if line.group.is_some() || !set_once(slot, plain(&line)) {
                cal.unrecognized.push(line);
            }
        }

        for child in root.components {
            if child.is("VEVENT") || child.is("VTODO") {
                cal.entries.push(Entry::from_raw(child)?);
            } else if child.is("VTIMEZONE") {
                cal.timezones.push(child);
            } else {
                cal.other_components.push(child);
            }
        }

        if cal.entries.is_empty() {
            return Err(CodecError::MissingComponent("VEVENT or VTODO"));
        }
        tracing::trace!(entries = cal.entries.len(), "parsed calendar object");
        Ok(cal)
    }

    /// Serializes in canonical order.
    #[must_use]
    pub fn to_wire(&self) -> String {
        let mut out = String::new();
        ContentLine::new("BEGIN", "VCALENDAR").write_to(&mut out);
        for (name, value) in [
            ("PRODID", &self.prod_id),
            ("VERSION", &self.version),
            ("CALSCALE", &self.calscale),
            ("METHOD", &self.method),
        ] {
            if let Some(value) = value {
                ContentLine::new(name, value.clone()).write_to(&mut out);
            }
        }
        self.unrecognized.write_to(&mut out);
        for tz in &self.timezones {
            tz.write_to(&mut out);
        }
        for entry in &self.entries {
            entry.write_to(&mut out);
        }
        for other in &self.other_components {
            other.write_to(&mut out);
        }
        ContentLine::new("END", "VCALENDAR").write_to(&mut out);
        out
    }

    /// The master entry: the first one without `RECURRENCE-ID`, or the first.
    #[must_use]
    pub fn master(&self) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|e| e.recurrence_id.is_none())
            .or_else(|| self.entries.first())
    }

    /// Mutable access to the master entry.
    pub fn master_mut(&mut self) -> Option<&mut Entry> {
        let idx = self
            .entries
            .iter()
            .position(|e| e.recurrence_id.is_none())
            .unwrap_or(0);
        self.entries.get_mut(idx)
    }

    /// UID shared by the entries.
    #[must_use]
    pub fn uid(&self) -> Option<&str> {
        self.master().map(|e| e.uid.as_str())
    }

    /// Latest `LAST-MODIFIED` across entries.
    #[must_use]
    pub fn last_modified(&self) -> Option<Timestamp> {
        self.entries.iter().filter_map(Entry::last_modified_at).max()
    }

    /// Copies unrecognized properties `other` has and this object lacks,
    /// matching entries by UID and `RECURRENCE-ID`.
    pub fn merge_unknown_from(&mut self, other: &Self) -> bool {
        let mut changed = self.unrecognized.merge_missing_from(&other.unrecognized);
        for entry in &mut self.entries {
            if let Some(theirs) = other
                .entries
                .iter()
                .find(|o| o.uid == entry.uid && o.recurrence_id == entry.recurrence_id)
            {
                changed |= entry.unrecognized.merge_missing_from(&theirs.unrecognized);
            }
        }
        changed
    }

    /// Whether `other` carries unrecognized properties this object lacks.
    #[must_use]
    pub fn lacks_unknown_of(&self, other: &Self) -> bool {
        self.unrecognized.lacks_any_of(&other.unrecognized)
            || self.entries.iter().any(|entry| {
                other
                    .entries
                    .iter()
                    .find(|o| o.uid == entry.uid && o.recurrence_id == entry.recurrence_id)
                    .is_some_and(|o| entry.unrecognized.lacks_any_of(&o.unrecognized))
            })
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

fn push_some<T>(list: &mut Vec<T>, value: Option<T>) -> bool {
    let Some(value) = value else {
        return false;
    };
    list.push(value);
    true
}

fn plain(line: &ContentLine) -> Option<String> {
    line.params.is_empty().then(|| line.value.clone())
}

fn text(line: &ContentLine) -> Text {
    Text {
        value: unescape_text(&line.value),
        params: line.params.clone(),
    }
}

fn number<T: lexical::FromLexical + Display>(line: &ContentLine) -> Option<T> {
    let n: T = lexical::parse(&line.value).ok()?;
    (line.params.is_empty() && n.to_string() == line.value).then_some(n)
}

fn keyword<T: FromStr + AsRef<str>>(line: &ContentLine) -> Option<T> {
    let k: T = line.value.parse().ok()?;
    (line.params.is_empty() && k.as_ref() == line.value).then_some(k)
}

fn datetime(line: &ContentLine) -> Option<DateTimeValue> {
    let value = DateTimeValue::parse(&line.value, &line.params).ok()?;
    (value.params() == line.params && value.to_value_string() == line.value).then_some(value)
}

fn date_list(line: &ContentLine) -> Option<DateList> {
    let values = line
        .value
        .split(',')
        .map(|part| DateTimeValue::parse(part, &line.params).ok())
        .collect::<Option<Vec<_>>>()?;
    let list = DateList(values);
    (date_list_line("X", &list).is_some_and(|l| l.params == line.params && l.value == line.value))
        .then_some(list)
}

fn date_list_line(name: &str, list: &DateList) -> Option<ContentLine> {
    let first = list.0.first()?;
    let value = list
        .0
        .iter()
        .map(DateTimeValue::to_value_string)
        .collect::<Vec<_>>()
        .join(",");
    Some(ContentLine::new(name, value).with_params(first.params()))
}

fn participant(line: &ContentLine) -> Participant {
    Participant {
        address: line.value.clone(),
        params: line.params.clone(),
    }
}

fn write_datetime(out: &mut String, name: &str, value: Option<&DateTimeValue>) {
    if let Some(value) = value {
        ContentLine::new(name, value.to_value_string())
            .with_params(value.params())
            .write_to(out);
    }
}

fn write_date_list(out: &mut String, name: &str, list: &DateList) {
    if let Some(line) = date_list_line(name, list) {
        line.write_to(out);
    }
}

fn write_text(out: &mut String, name: &str, text: Option<&Text>) {
    if let Some(text) = text {
        ContentLine::new(name, escape_text(&text.value))
            .with_params(text.params.clone())
            .write_to(out);
    }
}

fn write_participant(out: &mut String, name: &str, p: &Participant) {
    ContentLine::new(name, p.address.clone())
        .with_params(p.params.clone())
        .write_to(out);
}
