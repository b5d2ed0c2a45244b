// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Per-item decision when both sides changed since the last sync.

use davsync_codec::Document;
use davsync_dav::{ETag, Href};
use jiff::Timestamp;

use crate::model::{CollectionId, ConflictId, Item};

/// How conflicts are decided.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Strategy {
    /// Always keep the server version.
    #[default]
    ServerWins,
    /// Always keep the local version and push it.
    LocalWins,
    /// Keep the strictly later `LAST-MODIFIED`/`REV`; ties go to the server.
    MostRecentWins,
    /// Record the conflict and let the user decide later.
    AskUser,
}

/// Decision for one conflicting item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Keep the local copy; it stays dirty and is pushed.
    KeepLocal,
    /// Replace the local copy with the server's (or purge it if the server
    /// deleted the item).
    KeepRemote,
    /// Keep the local copy enriched with server-only unknown properties.
    Merged(Document),
    /// Suspend this item until the user resolves the recorded conflict.
    AskUser(ConflictId),
}

/// A one-off decision for a recorded conflict.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    serde::Deserialize,
    serde::Serialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Resolution {
    /// Keep the local snapshot.
    KeepLocal,
    /// Take the remote snapshot.
    KeepRemote,
}

/// A conflict waiting for the user, with both sides captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConflict {
    /// Identity used to resolve it.
    pub id: ConflictId,
    /// Collection of the item.
    pub collection: CollectionId,
    /// UID of the item.
    pub uid: String,
    /// Local content when the conflict was detected.
    pub local: Document,
    /// Whether the local side was a deletion.
    pub local_deleted: bool,
    /// Server content, `None` when the server deleted the item.
    pub remote: Option<Document>,
    /// Server href.
    pub remote_href: Option<Href>,
    /// Server etag.
    pub remote_etag: Option<ETag>,
    /// When the conflict was detected.
    pub detected_at: Timestamp,
}

/// Decides a conflict between a pending local item and the server.
///
/// `remote` is `None` when the server deleted the item. For
/// [`Strategy::AskUser`] the returned id is fresh; the caller records the
/// conflict under it.
#[must_use]
pub fn resolve(local: &Item, remote: Option<&Document>, strategy: Strategy) -> Outcome {
    match strategy {
        Strategy::ServerWins => Outcome::KeepRemote,
        Strategy::LocalWins => keep_local(local, remote),
        Strategy::MostRecentWins => {
            let remote_at = remote.and_then(Document::last_modified);
            match (local.content.last_modified(), remote_at) {
                (Some(l), Some(r)) if l > r => keep_local(local, remote),
                _ => Outcome::KeepRemote,
            }
        }
        Strategy::AskUser => Outcome::AskUser(ConflictId::new()),
    }
}

fn keep_local(local: &Item, remote: Option<&Document>) -> Outcome {
    match remote {
        Some(remote) if !local.deleted && local.content.lacks_unknown_of(remote) => {
            let mut merged = local.content.clone();
            merged.merge_unknown_from(remote);
            Outcome::Merged(merged)
        }
        _ => Outcome::KeepLocal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(uid: &str, modified: &str, extra: &str) -> Document {
        Document::parse(&format!(
            "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nBEGIN:VEVENT\r\nUID:{uid}\r\n\
             LAST-MODIFIED:{modified}\r\nSUMMARY:x\r\n{extra}END:VEVENT\r\nEND:VCALENDAR\r\n"
        ))
        .unwrap()
    }

    fn dirty(content: Document) -> Item {
        let mut item = Item::new_local(CollectionId::new(), content);
        item.href = Some(Href::from("/cal/x.ics"));
        item.etag = Some(ETag::from("\"1\""));
        item
    }

    #[test]
    fn server_wins_always_takes_remote() {
        let local = dirty(doc("x", "20250102T000000Z", ""));
        let remote = doc("x", "20250101T000000Z", "");
        assert_eq!(
            resolve(&local, Some(&remote), Strategy::ServerWins),
            Outcome::KeepRemote
        );
        assert_eq!(resolve(&local, None, Strategy::ServerWins), Outcome::KeepRemote);
    }

    #[test]
    fn most_recent_wins_needs_strictly_later_local() {
        let remote = doc("x", "20250101T000000Z", "");

        let later = dirty(doc("x", "20250102T000000Z", ""));
        assert_eq!(
            resolve(&later, Some(&remote), Strategy::MostRecentWins),
            Outcome::KeepLocal
        );

        let tie = dirty(doc("x", "20250101T000000Z", ""));
        assert_eq!(
            resolve(&tie, Some(&remote), Strategy::MostRecentWins),
            Outcome::KeepRemote
        );

        let earlier = dirty(doc("x", "20241231T000000Z", ""));
        assert_eq!(
            resolve(&earlier, Some(&remote), Strategy::MostRecentWins),
            Outcome::KeepRemote
        );
    }

    #[test]
    fn local_wins_merges_server_unknowns() {
        let local = dirty(doc("x", "20250101T000000Z", ""));
        let remote = doc("x", "20250101T000000Z", "X-SERVER-FLAG:on\r\n");

        let Outcome::Merged(merged) = resolve(&local, Some(&remote), Strategy::LocalWins) else {
            panic!("merge expected");
        };
        assert!(merged.to_wire().contains("X-SERVER-FLAG:on"));
        assert!(!merged.lacks_unknown_of(&remote));
    }

    #[test]
    fn local_wins_over_remote_delete_keeps_local() {
        let local = dirty(doc("x", "20250101T000000Z", ""));
        assert_eq!(resolve(&local, None, Strategy::LocalWins), Outcome::KeepLocal);
    }

    #[test]
    fn ask_user_defers() {
        let local = dirty(doc("x", "20250101T000000Z", ""));
        assert!(matches!(
            resolve(&local, None, Strategy::AskUser),
            Outcome::AskUser(_)
        ));
    }

    #[test]
    fn strategy_names_are_kebab_case() {
        assert_eq!(Strategy::MostRecentWins.to_string(), "most-recent-wins");
        assert_eq!("ask-user".parse::<Strategy>().unwrap(), Strategy::AskUser);
    }
}
