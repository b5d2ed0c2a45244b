// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use jiff::Timestamp;
use jiff::civil::Time;
use jiff::tz::TimeZone;

use crate::error::CodecError;
use crate::ical::CalendarObject;
use crate::value::DateTimeValue;
use crate::vcard::VCard;

/// Kind of a synchronized item.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum ItemKind {
    /// VEVENT.
    Event,
    /// VTODO.
    Task,
    /// vCard.
    Contact,
}

/// A parsed item body: a calendar resource or a contact card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Document {
    /// iCalendar resource.
    Calendar(CalendarObject),
    /// vCard.
    Contact(VCard),
}

impl Document {
    /// Parses a body, detecting the format from its first component.
    ///
    /// # Errors
    ///
    /// Returns the codec error of the detected format.
    pub fn parse(src: &str) -> Result<Self, CodecError> {
        let head = src
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or_default();
        if head.eq_ignore_ascii_case("BEGIN:VCARD") {
            VCard::parse(src).map(Self::Contact)
        } else {
            CalendarObject::parse(src).map(Self::Calendar)
        }
    }

    /// Serializes in canonical order.
    #[must_use]
    pub fn to_wire(&self) -> String {
        match self {
            Self::Calendar(cal) => cal.to_wire(),
            Self::Contact(card) => card.to_wire(),
        }
    }

    /// Protocol-level identity.
    #[must_use]
    pub fn uid(&self) -> &str {
        match self {
            Self::Calendar(cal) => cal.uid().unwrap_or_default(),
            Self::Contact(card) => &card.uid,
        }
    }

    /// Item kind, from the master entry for calendars.
    #[must_use]
    pub fn kind(&self) -> ItemKind {
        match self {
            Self::Calendar(cal) if cal.master().is_some_and(|e| e.is_task()) => ItemKind::Task,
            Self::Calendar(_) => ItemKind::Event,
            Self::Contact(_) => ItemKind::Contact,
        }
    }

    /// `LAST-MODIFIED` for calendars, `REV` for contacts.
    #[must_use]
    pub fn last_modified(&self) -> Option<Timestamp> {
        match self {
            Self::Calendar(cal) => cal.last_modified(),
            Self::Contact(card) => card.last_modified(),
        }
    }

    /// UID of the parent task, from `RELATED-TO` with `RELTYPE` absent or `PARENT`.
    #[must_use]
    pub fn parent_uid(&self) -> Option<&str> {
        match self {
            Self::Calendar(cal) => cal.master()?.parent_uid(),
            Self::Contact(_) => None,
        }
    }

    /// `Content-Type` used when uploading.
    #[must_use]
    pub const fn content_type(&self) -> &'static str {
        match self {
            Self::Calendar(_) => "text/calendar; charset=utf-8",
            Self::Contact(_) => "text/vcard; charset=utf-8",
        }
    }

    /// File extension of new resources.
    #[must_use]
    pub const fn file_extension(&self) -> &'static str {
        match self {
            Self::Calendar(_) => "ics",
            Self::Contact(_) => "vcf",
        }
    }

    /// Copies unrecognized properties from `other` that this document lacks.
    ///
    /// Returns whether anything changed. Documents of different formats are
    /// left alone.
    pub fn merge_unknown_from(&mut self, other: &Self) -> bool {
        match (self, other) {
            (Self::Calendar(mine), Self::Calendar(theirs)) => mine.merge_unknown_from(theirs),
            (Self::Contact(mine), Self::Contact(theirs)) => {
                mine.unrecognized.merge_missing_from(&theirs.unrecognized)
            }
            _ => false,
        }
    }

    /// Whether `other` carries unrecognized properties this document lacks.
    #[must_use]
    pub fn lacks_unknown_of(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Calendar(mine), Self::Calendar(theirs)) => mine.lacks_unknown_of(theirs),
            (Self::Contact(mine), Self::Contact(theirs)) => {
                mine.unrecognized.lacks_any_of(&theirs.unrecognized)
            }
            _ => false,
        }
    }

    /// Stamps a local modification at `now`: `LAST-MODIFIED`, `DTSTAMP` and
    /// `SEQUENCE` for calendars, `REV` for contacts.
    pub fn touch(&mut self, now: Timestamp) {
        let stamp = utc_value(now);
        match self {
            Self::Calendar(cal) => {
                if let Some(entry) = cal.master_mut() {
                    entry.last_modified = Some(stamp.clone());
                    entry.dtstamp = Some(stamp);
                    entry.sequence = Some(entry.sequence.map_or(0, |s| s + 1));
                }
            }
            Self::Contact(card) => card.rev = Some(stamp.to_value_string()),
        }
    }
}

fn utc_value(ts: Timestamp) -> DateTimeValue {
    let dt = ts.to_zoned(TimeZone::UTC).datetime();
    // whole seconds only on the wire
    let time = Time::new(dt.hour(), dt.minute(), dt.second(), 0).unwrap_or(dt.time());
    DateTimeValue::Utc(dt.date().to_datetime(time))
}

impl From<CalendarObject> for Document {
    fn from(value: CalendarObject) -> Self {
        Self::Calendar(value)
    }
}

impl From<VCard> for Document {
    fn from(value: VCard) -> Self {
        Self::Contact(value)
    }
}
