// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Content-line grammar on top of the lexer.
//!
//! ```text
//! contentline = [group "."] name *(";" param) ":" value CRLF
//! param       = param-name "=" param-value *("," param-value)
//! param-value = paramtext / quoted-string
//! ```

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::CodecError;
use crate::lexer::{Token, tokenize};
use crate::line::{ContentLine, Param};

type Extra<'tokens, 'src> = extra::Err<Rich<'tokens, Token<'src>>>;

/// Parses every logical line of `src`, numbering them from 1.
///
/// # Errors
///
/// Returns [`CodecError::MalformedLine`] for the first line that does not
/// follow the content-line grammar.
pub fn parse_lines(src: &str) -> Result<Vec<(usize, ContentLine)>, CodecError> {
    parse_lines_from(src, 1)
}

/// Like [`parse_lines`], numbering from `first_line`.
pub(crate) fn parse_lines_from(
    src: &str,
    first_line: usize,
) -> Result<Vec<(usize, ContentLine)>, CodecError> {
    let breaks: Vec<usize> = src
        .bytes()
        .enumerate()
        .filter_map(|(i, b)| (b == b'\n').then_some(i))
        .collect();
    let line_at = |offset: usize| first_line + breaks.partition_point(|&b| b < offset);

    let eoi = SimpleSpan::from(src.len()..src.len());
    let stream = Stream::from_iter(tokenize(src)).map(eoi, |(t, s): (_, _)| (t, s));

    content_lines()
        .parse(stream)
        .into_result()
        .map(|lines| {
            lines
                .into_iter()
                .map(|(span, line)| (line_at(span.start), line))
                .collect()
        })
        .map_err(|errs| match errs.into_iter().next() {
            Some(err) => CodecError::MalformedLine {
                line: line_at(err.span().start),
                reason: err.reason().to_string(),
            },
            None => CodecError::MalformedLine {
                line: first_line,
                reason: "unparsable input".to_string(),
            },
        })
}

fn content_lines<'tokens, 'src: 'tokens, I>()
-> impl Parser<'tokens, I, Vec<(SimpleSpan, ContentLine)>, Extra<'tokens, 'src>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SimpleSpan>,
{
    let blank = just(Token::Newline).repeated();

    blank
        .clone()
        .ignore_then(
            content_line()
                .map_with(|line, e| (e.span(), line))
                .then_ignore(blank)
                .repeated()
                .collect::<Vec<_>>(),
        )
        .then_ignore(end())
}

fn content_line<'tokens, 'src: 'tokens, I>()
-> impl Parser<'tokens, I, ContentLine, Extra<'tokens, 'src>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SimpleSpan>,
{
    let group = word().then_ignore(just(Token::Dot));
    let params = just(Token::Semicolon)
        .ignore_then(parameter())
        .repeated()
        .collect::<Vec<_>>();
    let value = text(Token::in_value);

    group
        .or_not()
        .then(word())
        .then(params)
        .then_ignore(just(Token::Colon))
        .then(value)
        .then_ignore(just(Token::Newline).ignored().or(end()))
        .map(|(((group, name), params), value)| ContentLine {
            group,
            name,
            params,
            value,
        })
}

fn parameter<'tokens, 'src: 'tokens, I>()
-> impl Parser<'tokens, I, Param, Extra<'tokens, 'src>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SimpleSpan>,
{
    let quoted = just(Token::DQuote)
        .ignore_then(text(Token::in_quoted))
        .then_ignore(just(Token::DQuote))
        .map(|v| (v, true));
    let paramtext = text(Token::in_param_text).map(|v| (v, false));

    let values = choice((quoted, paramtext))
        .separated_by(just(Token::Comma))
        .at_least(1)
        .collect::<Vec<_>>();

    word()
        .then_ignore(just(Token::Equal))
        .then(values)
        .map(|(name, values)| Param {
            name,
            quoted: values.iter().any(|(_, quoted)| *quoted),
            values: values.into_iter().map(|(v, _)| v).collect(),
        })
}

/// A name, possibly split over several words by folding.
fn word<'tokens, 'src: 'tokens, I>() -> impl Parser<'tokens, I, String, Extra<'tokens, 'src>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SimpleSpan>,
{
    select! { Token::Word(s) => s }
        .repeated()
        .at_least(1)
        .collect::<Vec<_>>()
        .map(|parts| parts.concat())
}

/// Concatenated source text of the accepted tokens, possibly empty.
fn text<'tokens, 'src: 'tokens, I>(
    accept: fn(Token<'src>) -> bool,
) -> impl Parser<'tokens, I, String, Extra<'tokens, 'src>> + Clone
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SimpleSpan>,
{
    any()
        .filter(move |t: &Token<'src>| accept(*t))
        .map(Token::lexeme)
        .repeated()
        .collect::<Vec<_>>()
        .map(|parts| parts.concat())
}
