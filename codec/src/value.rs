// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Value types shared by the calendar and contact codecs.

use std::fmt;

use chumsky::prelude::*;
use jiff::Timestamp;
use jiff::civil::{Date, DateTime, Time};
use jiff::tz::TimeZone;

use crate::error::CodecError;
use crate::line::{Param, find_param};

type Extra<'src> = extra::Err<Rich<'src, char>>;

/// Unescapes a TEXT value (`\\`, `\;`, `\,`, `\n`, `\N`).
#[must_use]
pub fn unescape_text(raw: &str) -> String {
    text_chars(None)
        .then_ignore(end())
        .parse(raw)
        .into_output()
        .unwrap_or_default()
}

/// Escapes a TEXT value for the wire.
#[must_use]
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}

/// Splits a raw value on an unescaped separator and unescapes each part.
#[must_use]
pub fn split_text(raw: &str, sep: char) -> Vec<String> {
    text_chars(Some(sep))
        .separated_by(just(sep))
        .collect::<Vec<_>>()
        .then_ignore(end())
        .parse(raw)
        .into_output()
        .unwrap_or_default()
}

/// Unescaped characters up to the next unescaped `sep`.
///
/// A trailing lone backslash is kept as is.
fn text_chars<'src>(
    sep: Option<char>,
) -> impl Parser<'src, &'src str, String, Extra<'src>> + Clone {
    let escaped = just('\\')
        .ignore_then(choice((one_of("nN").to('\n'), any())))
        .or(just('\\'));
    let plain = any().filter(move |c: &char| *c != '\\' && Some(*c) != sep);

    choice((escaped, plain)).repeated().collect::<String>()
}

/// Joins parts with a separator, escaping each part.
#[must_use]
pub fn join_text<S: AsRef<str>>(parts: &[S], sep: char) -> String {
    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            out.push(sep);
        }
        out.push_str(&escape_text(part.as_ref()));
    }
    out
}

/// A text value with the parameters it was written with (`LANGUAGE`, `ALTREP`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Text {
    /// Unescaped value.
    pub value: String,
    /// Parameters, kept verbatim.
    pub params: Vec<Param>,
}

impl Text {
    /// Creates a text value without parameters.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            params: Vec::new(),
        }
    }

    /// Returns the unescaped value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl From<&str> for Text {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Text {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

/// DATE or DATE-TIME value in one of its RFC 5545 forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateTimeValue {
    /// All-day value, `VALUE=DATE`.
    Date(Date),
    /// Local time without zone.
    Floating(DateTime),
    /// UTC time, written with a trailing `Z`.
    Utc(DateTime),
    /// Local time in a named zone, written with `TZID`.
    Zoned {
        /// Wall-clock time.
        datetime: DateTime,
        /// Zone identifier as written in `TZID`.
        tzid: String,
    },
}

impl DateTimeValue {
    /// Parses a value together with its `VALUE` and `TZID` parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not in basic ISO 8601 form.
    pub fn parse(value: &str, params: &[Param]) -> Result<Self, CodecError> {
        let invalid = || CodecError::InvalidValue {
            kind: "date-time",
            value: value.to_string(),
        };
        let is_date = find_param(params, "VALUE")
            .and_then(Param::value)
            .is_some_and(|v| v.eq_ignore_ascii_case("DATE"));

        let parsed = date_or_date_time()
            .parse(value.trim())
            .into_result()
            .map_err(|_| invalid())?;
        Ok(match parsed {
            Parsed::Date(date) => Self::Date(date),
            Parsed::DateTime { .. } if is_date => return Err(invalid()),
            Parsed::DateTime { datetime, utc: true } => Self::Utc(datetime),
            Parsed::DateTime { datetime, utc: false } => {
                match find_param(params, "TZID").and_then(Param::value) {
                    Some(tzid) => Self::Zoned {
                        datetime,
                        tzid: tzid.to_string(),
                    },
                    None => Self::Floating(datetime),
                }
            }
        })
    }

    /// Parameters this value must be written with.
    #[must_use]
    pub fn params(&self) -> Vec<Param> {
        match self {
            Self::Date(_) => vec![Param::new("VALUE", "DATE")],
            Self::Zoned { tzid, .. } => vec![Param::new("TZID", tzid.clone())],
            Self::Floating(_) | Self::Utc(_) => Vec::new(),
        }
    }

    /// Wire representation of the value, without parameters.
    #[must_use]
    pub fn to_value_string(&self) -> String {
        match self {
            Self::Date(date) => format_date(*date),
            Self::Floating(dt) | Self::Zoned { datetime: dt, .. } => format_datetime(*dt),
            Self::Utc(dt) => format!("{}Z", format_datetime(*dt)),
        }
    }

    /// Whether this is an all-day value.
    #[must_use]
    pub const fn is_date(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    /// Zone identifier, if the value carries one.
    #[must_use]
    pub fn tzid(&self) -> Option<&str> {
        match self {
            Self::Zoned { tzid, .. } => Some(tzid),
            _ => None,
        }
    }

    /// Absolute instant, when it can be determined.
    ///
    /// Dates and floating times are interpreted in UTC.
    #[must_use]
    pub fn to_timestamp(&self) -> Option<Timestamp> {
        let (datetime, tz) = match self {
            Self::Date(date) => (date.to_datetime(Time::midnight()), TimeZone::UTC),
            Self::Floating(dt) | Self::Utc(dt) => (*dt, TimeZone::UTC),
            Self::Zoned { datetime, tzid } => (*datetime, TimeZone::get(tzid).ok()?),
        };
        datetime.to_zoned(tz).ok().map(|z| z.timestamp())
    }
}

impl fmt::Display for DateTimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_value_string())
    }
}

/// Parses a timestamp in basic (`20250101T120000Z`) or extended RFC 3339 form.
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<Timestamp> {
    DateTimeValue::parse(value, &[])
        .ok()
        .and_then(|v| v.to_timestamp())
        .or_else(|| value.trim().parse::<Timestamp>().ok())
}

enum Parsed {
    Date(Date),
    DateTime { datetime: DateTime, utc: bool },
}

/// ```txt
/// date      = date-fullyear date-month date-mday
/// date-time = date "T" time-hour time-minute time-second ["Z"]
/// ```
fn date_or_date_time<'src>() -> impl Parser<'src, &'src str, Parsed, Extra<'src>> {
    let date = number::<i16>(4)
        .then(number::<i8>(2))
        .then(number::<i8>(2))
        .try_map(|((year, month), day), span| {
            Date::new(year, month, day).map_err(|e| Rich::custom(span, e))
        });

    // leap seconds are clamped to 59
    let time = number::<i8>(2)
        .then(number::<i8>(2))
        .then(number::<i8>(2))
        .try_map(|((hour, minute), second), span| {
            Time::new(hour, minute, second.min(59), 0).map_err(|e| Rich::custom(span, e))
        });

    date.then(
        one_of("Tt")
            .ignore_then(time)
            .then(one_of("Zz").or_not())
            .or_not(),
    )
    .then_ignore(end())
    .map(|(date, time)| match time {
        Some((time, utc)) => Parsed::DateTime {
            datetime: DateTime::from_parts(date, time),
            utc: utc.is_some(),
        },
        None => Parsed::Date(date),
    })
}

/// Exactly `width` ASCII digits.
fn number<'src, N: lexical::FromLexical>(
    width: usize,
) -> impl Parser<'src, &'src str, N, Extra<'src>> + Clone {
    any()
        .filter(char::is_ascii_digit)
        .repeated()
        .exactly(width)
        .to_slice()
        .try_map(|digits: &str, span| {
            lexical::parse::<N, _>(digits).map_err(|e| Rich::custom(span, e))
        })
}

fn format_date(date: Date) -> String {
    format!("{:04}{:02}{:02}", date.year(), date.month(), date.day())
}

fn format_datetime(dt: DateTime) -> String {
    format!(
        "{}T{:02}{:02}{:02}",
        format_date(dt.date()),
        dt.hour(),
        dt.minute(),
        dt.second()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_escape_round_trips() {
        let raw = "a\\;b\\,c\\nd\\\\e";
        let text = unescape_text(raw);
        assert_eq!(text, "a;b,c\nd\\e");
        assert_eq!(escape_text(&text), raw);
    }

    #[test]
    fn split_text_honours_escapes() {
        assert_eq!(split_text("Doe;John\\;Jr;;", ';'), vec!["Doe", "John;Jr", "", ""]);
        assert_eq!(split_text("work,home", ','), vec!["work", "home"]);
        assert_eq!(split_text("", ','), vec![""]);
        assert_eq!(unescape_text("trailing\\"), "trailing\\");
    }

    #[test]
    fn datetime_forms_parse_and_format() {
        let utc = DateTimeValue::parse("20250110T140000Z", &[]).unwrap();
        assert!(matches!(utc, DateTimeValue::Utc(_)));
        assert_eq!(utc.to_value_string(), "20250110T140000Z");

        let date = DateTimeValue::parse("20250110", &[Param::new("VALUE", "DATE")]).unwrap();
        assert!(date.is_date());
        assert_eq!(date.params(), vec![Param::new("VALUE", "DATE")]);

        let zoned =
            DateTimeValue::parse("20250110T090000", &[Param::new("TZID", "Europe/Berlin")])
                .unwrap();
        assert_eq!(zoned.tzid(), Some("Europe/Berlin"));
        assert_eq!(zoned.to_value_string(), "20250110T090000");
    }

    #[test]
    fn datetime_rejects_garbage() {
        assert!(DateTimeValue::parse("tomorrow", &[]).is_err());
        assert!(DateTimeValue::parse("20251301T000000Z", &[]).is_err());
        assert!(DateTimeValue::parse("20250230", &[]).is_err());
        assert!(DateTimeValue::parse("20250110T1400", &[]).is_err());
        assert!(DateTimeValue::parse("20250110T140000Zx", &[]).is_err());
        let date_only = [Param::new("VALUE", "DATE")];
        assert!(DateTimeValue::parse("20250110T140000Z", &date_only).is_err());
    }

    #[test]
    fn leap_second_is_clamped() {
        let value = DateTimeValue::parse("19970630T235960Z", &[]).unwrap();
        assert_eq!(value.to_value_string(), "19970630T235959Z");
    }

    #[test]
    fn timestamps_compare_across_forms() {
        let basic = parse_timestamp("20250101T120000Z").unwrap();
        let extended = parse_timestamp("2025-01-01T12:00:00Z").unwrap();
        assert_eq!(basic, extended);
        assert!(parse_timestamp("20250101T120001Z").unwrap() > basic);
    }
}
