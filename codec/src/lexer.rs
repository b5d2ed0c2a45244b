// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Lexer for content lines shared by iCalendar and vCard.

use std::fmt::{self, Display};

use chumsky::span::SimpleSpan;
use logos::Logos;

/// Token emitted by the content-line lexer.
///
/// Folded continuations (line break followed by one space or tab) are
/// skipped, so a folded line lexes as if it had been written unfolded.
/// Bare `\n` line breaks are accepted alongside CRLF.
#[derive(PartialEq, Eq, Clone, Copy, Logos)]
#[logos(skip r"\r?\n[ \t]")]
pub enum Token<'a> {
    /// Double quote (").
    #[token("\"")]
    DQuote,

    /// Comma (,).
    #[token(",")]
    Comma,

    /// Colon (:).
    #[token(":")]
    Colon,

    /// Semicolon (;).
    #[token(";")]
    Semicolon,

    /// Equal sign (=).
    #[token("=")]
    Equal,

    /// Full stop (.), separates a vCard group from the property name.
    #[token(".")]
    Dot,

    /// Runs of printable ASCII punctuation and whitespace.
    #[regex(r#"[\t !#$%&'()*+/<>?@\[\\\]\^`\{|\}~]+"#)]
    Symbol(&'a str),

    /// End of a logical line.
    #[regex(r"\r?\n")]
    Newline,

    /// ASCII word characters: 0-9, A-Z, a-z, underscore, hyphen.
    #[regex("[0-9A-Za-z_-]+")]
    Word(&'a str),

    /// Runs of non-ASCII text.
    #[regex(r"[^\x00-\x7F]+")]
    UnicodeText(&'a str),

    /// Anything the lexer does not accept, such as control characters.
    Error,
}

impl<'a> Token<'a> {
    /// Source text of the token.
    pub fn lexeme(self) -> &'a str {
        match self {
            Self::DQuote => "\"",
            Self::Comma => ",",
            Self::Colon => ":",
            Self::Semicolon => ";",
            Self::Equal => "=",
            Self::Dot => ".",
            Self::Newline => "\n",
            Self::Symbol(s) | Self::Word(s) | Self::UnicodeText(s) => s,
            Self::Error => "",
        }
    }

    /// Whether the token may appear in a property value.
    pub fn in_value(self) -> bool {
        !matches!(self, Self::Newline | Self::Error)
    }

    /// Whether the token may appear in an unquoted parameter value.
    pub fn in_param_text(self) -> bool {
        matches!(
            self,
            Self::Dot | Self::Symbol(_) | Self::Word(_) | Self::UnicodeText(_)
        )
    }

    /// Whether the token may appear between the quotes of a parameter value.
    pub fn in_quoted(self) -> bool {
        !matches!(self, Self::DQuote | Self::Newline | Self::Error)
    }
}

impl Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DQuote => write!(f, "DQuote"),
            Self::Comma => write!(f, "Comma"),
            Self::Colon => write!(f, "Colon"),
            Self::Semicolon => write!(f, "Semicolon"),
            Self::Equal => write!(f, "Equal"),
            Self::Dot => write!(f, "Dot"),
            Self::Symbol(s) => write!(f, "Symbol({s})"),
            Self::Newline => write!(f, "Newline"),
            Self::Word(s) => write!(f, "Word({s})"),
            Self::UnicodeText(s) => write!(f, "UnicodeText({s})"),
            Self::Error => write!(f, "Error"),
        }
    }
}

impl fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// Tokenizes `src`, turning lexing failures into [`Token::Error`].
pub fn tokenize(src: &str) -> impl Iterator<Item = (Token<'_>, SimpleSpan)> + '_ {
    Token::lexer(src)
        .spanned()
        .map(|(tok, span)| (tok.unwrap_or(Token::Error), SimpleSpan::from(span)))
}
