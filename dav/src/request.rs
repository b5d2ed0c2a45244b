// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Request body builders for WebDAV, CalDAV and CardDAV operations.

use std::io::Cursor;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::error::DavError;
use crate::types::{CollectionKind, Href};
use crate::xml::ns;

type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// Properties that can be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prop {
    /// `D:displayname`.
    DisplayName,
    /// `D:resourcetype`.
    ResourceType,
    /// `D:getetag`.
    GetETag,
    /// `D:getcontenttype`.
    GetContentType,
    /// `D:sync-token`.
    SyncToken,
    /// `D:current-user-principal`.
    CurrentUserPrincipal,
    /// `D:current-user-privilege-set`.
    CurrentUserPrivilegeSet,
    /// `D:supported-report-set`.
    SupportedReportSet,
    /// `CS:getctag`.
    GetCTag,
    /// `C:calendar-home-set`.
    CalendarHomeSet,
    /// `C:supported-calendar-component-set`.
    SupportedCalendarComponentSet,
    /// `C:calendar-data`.
    CalendarData,
    /// `CR:addressbook-home-set`.
    AddressBookHomeSet,
    /// `CR:address-data`.
    AddressData,
}

impl Prop {
    const fn name(self) -> &'static str {
        match self {
            Self::DisplayName => "displayname",
            Self::ResourceType => "resourcetype",
            Self::GetETag => "getetag",
            Self::GetContentType => "getcontenttype",
            Self::SyncToken => "sync-token",
            Self::CurrentUserPrincipal => "current-user-principal",
            Self::CurrentUserPrivilegeSet => "current-user-privilege-set",
            Self::SupportedReportSet => "supported-report-set",
            Self::GetCTag => "getctag",
            Self::CalendarHomeSet => "calendar-home-set",
            Self::SupportedCalendarComponentSet => "supported-calendar-component-set",
            Self::CalendarData => "calendar-data",
            Self::AddressBookHomeSet => "addressbook-home-set",
            Self::AddressData => "address-data",
        }
    }

    const fn namespace(self) -> Namespace {
        match self {
            Self::DisplayName
            | Self::ResourceType
            | Self::GetETag
            | Self::GetContentType
            | Self::SyncToken
            | Self::CurrentUserPrincipal
            | Self::CurrentUserPrivilegeSet
            | Self::SupportedReportSet => Namespace::Dav,
            Self::GetCTag => Namespace::CalServer,
            Self::CalendarHomeSet | Self::SupportedCalendarComponentSet | Self::CalendarData => {
                Namespace::CalDav
            }
            Self::AddressBookHomeSet | Self::AddressData => Namespace::CardDav,
        }
    }

    fn qualified(self) -> String {
        format!("{}:{}", self.namespace().prefix(), self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Namespace {
    Dav,
    CalDav,
    CardDav,
    CalServer,
}

impl Namespace {
    const ALL: [Self; 4] = [Self::Dav, Self::CalDav, Self::CardDav, Self::CalServer];

    const fn prefix(self) -> &'static str {
        match self {
            Self::Dav => "D",
            Self::CalDav => "C",
            Self::CardDav => "CR",
            Self::CalServer => "CS",
        }
    }

    const fn uri(self) -> &'static str {
        match self {
            Self::Dav => ns::DAV,
            Self::CalDav => ns::CALDAV,
            Self::CardDav => ns::CARDDAV,
            Self::CalServer => ns::CALSERVER,
        }
    }
}

/// Declares `D:` plus every namespace used by `props`.
fn declare(start: &mut BytesStart<'_>, props: &[Prop]) {
    for namespace in Namespace::ALL {
        let used =
            namespace == Namespace::Dav || props.iter().any(|p| p.namespace() == namespace);
        if used {
            start.push_attribute((format!("xmlns:{}", namespace.prefix()).as_str(), namespace.uri()));
        }
    }
}

fn new_writer() -> XmlWriter {
    Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2)
}

fn write_prop_list(writer: &mut XmlWriter, props: &[Prop]) -> Result<(), DavError> {
    writer.write_event(Event::Start(BytesStart::new("D:prop")))?;
    for prop in props {
        writer.write_event(Event::Empty(BytesStart::new(prop.qualified())))?;
    }
    writer.write_event(Event::End(BytesEnd::new("D:prop")))?;
    Ok(())
}

fn write_text_element(writer: &mut XmlWriter, name: &str, text: &str) -> Result<(), DavError> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn finish(writer: XmlWriter) -> Result<String, DavError> {
    let bytes = writer.into_inner().into_inner();
    String::from_utf8(bytes).map_err(|e| DavError::Xml(format!("UTF-8 error: {e}")))
}

/// PROPFIND request builder.
#[derive(Debug, Clone, Default)]
pub struct PropFindRequest {
    props: Vec<Prop>,
}

impl PropFindRequest {
    /// Creates a new PROPFIND request.
    #[must_use]
    pub fn new() -> Self {
        Self { props: Vec::new() }
    }

    /// Creates a request for the given properties.
    #[must_use]
    pub fn with(props: &[Prop]) -> Self {
        Self {
            props: props.to_vec(),
        }
    }

    /// Adds a property to the request.
    pub fn add_property(&mut self, prop: Prop) -> &mut Self {
        self.props.push(prop);
        self
    }

    /// Requested properties.
    #[must_use]
    pub fn props(&self) -> &[Prop] {
        &self.props
    }

    /// Builds the XML body for the PROPFIND request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, DavError> {
        let mut writer = new_writer();

        let mut propfind = BytesStart::new("D:propfind");
        declare(&mut propfind, &self.props);
        writer.write_event(Event::Start(propfind))?;
        write_prop_list(&mut writer, &self.props)?;
        writer.write_event(Event::End(BytesEnd::new("D:propfind")))?;

        finish(writer)
    }
}

/// `sync-collection` REPORT builder (RFC 6578).
#[derive(Debug, Clone)]
pub struct SyncCollectionRequest {
    sync_token: Option<String>,
    props: Vec<Prop>,
}

impl SyncCollectionRequest {
    /// Creates a request starting from `sync_token`; `None` asks for the
    /// full member list.
    #[must_use]
    pub fn new(sync_token: Option<String>) -> Self {
        Self {
            sync_token,
            props: vec![Prop::GetETag],
        }
    }

    /// Builds the XML body.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, DavError> {
        let mut writer = new_writer();

        let mut root = BytesStart::new("D:sync-collection");
        declare(&mut root, &self.props);
        writer.write_event(Event::Start(root))?;

        match &self.sync_token {
            Some(token) => write_text_element(&mut writer, "D:sync-token", token)?,
            None => writer.write_event(Event::Empty(BytesStart::new("D:sync-token")))?,
        }
        write_text_element(&mut writer, "D:sync-level", "1")?;
        write_prop_list(&mut writer, &self.props)?;

        writer.write_event(Event::End(BytesEnd::new("D:sync-collection")))?;
        finish(writer)
    }
}

/// `calendar-multiget` / `addressbook-multiget` REPORT builder.
#[derive(Debug, Clone)]
pub struct MultiGetRequest {
    kind: CollectionKind,
    hrefs: Vec<Href>,
}

impl MultiGetRequest {
    /// Creates a multiget for a collection of `kind`.
    #[must_use]
    pub fn new(kind: CollectionKind) -> Self {
        Self {
            kind,
            hrefs: Vec::new(),
        }
    }

    /// Adds an href to the request.
    pub fn add_href(&mut self, href: Href) -> &mut Self {
        self.hrefs.push(href);
        self
    }

    /// Builds the XML body for the multiget request.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, DavError> {
        let (root_name, data) = if self.kind.is_address_book() {
            ("CR:addressbook-multiget", Prop::AddressData)
        } else {
            ("C:calendar-multiget", Prop::CalendarData)
        };
        let props = [Prop::GetETag, data];

        let mut writer = new_writer();
        let mut root = BytesStart::new(root_name);
        declare(&mut root, &props);
        writer.write_event(Event::Start(root))?;

        write_prop_list(&mut writer, &props)?;
        for href in &self.hrefs {
            write_text_element(&mut writer, "D:href", href.as_str())?;
        }

        writer.write_event(Event::End(BytesEnd::new(root_name)))?;
        finish(writer)
    }
}

/// PROPPATCH builder for collection metadata.
#[derive(Debug, Clone)]
pub struct PropPatchRequest {
    display_name: String,
}

impl PropPatchRequest {
    /// Sets `displayname`.
    #[must_use]
    pub fn display_name(name: impl Into<String>) -> Self {
        Self {
            display_name: name.into(),
        }
    }

    /// Builds the XML body.
    ///
    /// # Errors
    ///
    /// Returns an error if XML building fails.
    pub fn build(&self) -> Result<String, DavError> {
        let mut writer = new_writer();

        let mut root = BytesStart::new("D:propertyupdate");
        declare(&mut root, &[]);
        writer.write_event(Event::Start(root))?;
        writer.write_event(Event::Start(BytesStart::new("D:set")))?;
        writer.write_event(Event::Start(BytesStart::new("D:prop")))?;
        write_text_element(&mut writer, "D:displayname", &self.display_name)?;
        writer.write_event(Event::End(BytesEnd::new("D:prop")))?;
        writer.write_event(Event::End(BytesEnd::new("D:set")))?;
        writer.write_event(Event::End(BytesEnd::new("D:propertyupdate")))?;

        finish(writer)
    }
}
