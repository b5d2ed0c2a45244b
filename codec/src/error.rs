// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

/// Errors raised while decoding iCalendar or vCard payloads.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// A content line could not be split into name, parameters and value.
    #[error("malformed content line {line}: {reason}")]
    MalformedLine {
        /// 1-based logical line number.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// `END` did not match the innermost open `BEGIN`.
    #[error("END:{found} does not close BEGIN:{expected}")]
    MismatchedEnd {
        /// Name of the component that is open.
        expected: String,
        /// Name found on the `END` line.
        found: String,
    },

    /// A component was still open when the input ended.
    #[error("component {0} is not terminated")]
    Unterminated(String),

    /// A property appeared outside of any component.
    #[error("property {0} appears outside of a component")]
    OrphanProperty(String),

    /// The payload holds no component this codec understands.
    #[error("no {0} component found")]
    MissingComponent(&'static str),

    /// The item carries no UID.
    #[error("{0} has no UID")]
    MissingUid(&'static str),

    /// Two mutually exclusive properties were both present.
    #[error("{first} and {second} are mutually exclusive")]
    Conflicting {
        /// First property name.
        first: &'static str,
        /// Second property name.
        second: &'static str,
    },

    /// A value could not be interpreted.
    #[error("invalid {kind} value: {value}")]
    InvalidValue {
        /// Kind of value that was expected.
        kind: &'static str,
        /// The offending value.
        value: String,
    },
}
