// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! XML utilities for WebDAV/CalDAV/CardDAV processing.
//!
//! Responses are read into a small element tree keyed by local names; servers
//! disagree on prefixes, and every element this crate reads has a unique
//! local name across the namespaces involved.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::DavError;

/// XML namespaces used in requests.
pub mod ns {
    /// `WebDAV` namespace.
    pub const DAV: &str = "DAV:";

    /// `CalDAV` namespace.
    pub const CALDAV: &str = "urn:ietf:params:xml:ns:caldav";

    /// `CardDAV` namespace.
    pub const CARDDAV: &str = "urn:ietf:params:xml:ns:carddav";

    /// Calendar server extensions (`getctag`).
    pub const CALSERVER: &str = "http://calendarserver.org/ns/";
}

/// An element with its local name, attributes, text and children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Local name, without prefix.
    pub name: String,
    /// Attributes as `(local name, value)`.
    pub attrs: Vec<(String, String)>,
    /// Concatenated text and CDATA content.
    pub text: String,
    /// Child elements in document order.
    pub children: Vec<Element>,
}

impl Element {
    /// First child with the given local name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Every child with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Follows a path of local names.
    #[must_use]
    pub fn find(&self, path: &[&str]) -> Option<&Self> {
        path.iter().try_fold(self, |el, name| el.child(name))
    }

    /// Trimmed text content.
    #[must_use]
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    /// Attribute value by local name.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Text of the `href` children.
    pub fn hrefs(&self) -> impl Iterator<Item = &str> {
        self.children_named("href").map(Self::text)
    }
}

/// Parses a document into its root element.
///
/// # Errors
///
/// Returns an error if the XML is malformed or has no root element.
pub fn parse_document(xml: &str) -> Result<Element, DavError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().expand_empty_elements = true;

    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let mut el = Element {
                    name: local(e.local_name().as_ref())?,
                    ..Element::default()
                };
                for attr in e.attributes().flatten() {
                    let key = local(attr.key.local_name().as_ref())?;
                    let value = attr.unescape_value()?.into_owned();
                    el.attrs.push((key, value));
                }
                stack.push(el);
            }
            Event::End(_) => {
                let Some(done) = stack.pop() else {
                    return Err(DavError::Xml("unbalanced end tag".to_string()));
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(done),
                    None => {
                        root = Some(done);
                        break;
                    }
                }
            }
            Event::Text(t) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some(top) = stack.last_mut() {
                    let text = std::str::from_utf8(&c)
                        .map_err(|e| DavError::Xml(format!("UTF-8 error: {e}")))?;
                    top.text.push_str(text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    root.ok_or_else(|| DavError::Xml("document has no root element".to_string()))
}

fn local(bytes: &[u8]) -> Result<String, DavError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| DavError::Xml(format!("UTF-8 error: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_uses_local_names() {
        let root = parse_document(
            r#"<d:multistatus xmlns:d="DAV:"><d:response><d:href>/a</d:href><d:x attr="1"/></d:response></d:multistatus>"#,
        )
        .unwrap();
        assert_eq!(root.name, "multistatus");
        let resp = root.child("response").unwrap();
        assert_eq!(resp.hrefs().collect::<Vec<_>>(), vec!["/a"]);
        assert_eq!(resp.child("x").unwrap().attr("attr"), Some("1"));
    }

    #[test]
    fn cdata_and_entities_are_text() {
        let root =
            parse_document("<r><a><![CDATA[x<y]]></a><b>a &amp; b</b></r>").unwrap();
        assert_eq!(root.child("a").unwrap().text(), "x<y");
        assert_eq!(root.child("b").unwrap().text(), "a & b");
    }

    #[test]
    fn non_xml_is_rejected() {
        assert!(parse_document("<html><body>").is_err());
        assert!(parse_document("").is_err());
    }
}
