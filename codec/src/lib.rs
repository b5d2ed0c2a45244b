// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Item codec for CalDAV and CardDAV payloads.
//!
//! Parses iCalendar (RFC 5545) VEVENT/VTODO resources and vCard (RFC 6350)
//! records into typed documents. Properties the model does not understand are
//! kept verbatim and written back unchanged, and serialization is
//! deterministic so an unchanged document reproduces the same bytes.
//!
//! ```
//! use davsync_codec::Document;
//!
//! let body = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:1@example.com\r\n\
//!             SUMMARY:Lunch\r\nX-CUSTOM:kept\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
//! let doc = Document::parse(body).unwrap();
//! assert_eq!(doc.uid(), "1@example.com");
//! assert_eq!(doc.to_wire(), body);
//! ```

#![warn(
    trivial_casts,
    trivial_numeric_casts,
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications,
    clippy::dbg_macro,
    clippy::pedantic
)]
#![allow(clippy::module_name_repetitions, clippy::must_use_candidate)]

mod component;
mod document;
mod error;
mod ical;
mod lexer;
mod line;
mod syntax;
mod value;
mod vcard;

pub use crate::component::{RawComponent, Unrecognized, parse_components};
pub use crate::document::{Document, ItemKind};
pub use crate::error::CodecError;
pub use crate::ical::{
    CalendarObject, Classification, DateList, End, Entry, EntryDetails, EventFields,
    PRODUCT_ID, Participant, Relation, Status, TaskFields, Transparency,
};
pub use crate::line::{ContentLine, FOLD_WIDTH, Param, find_param, fold_into};
pub use crate::syntax::parse_lines;
pub use crate::value::{
    DateTimeValue, Text, escape_text, join_text, parse_timestamp, split_text, unescape_text,
};
pub use crate::vcard::{Structured, TypedValue, VCard};
