//! Media type extraction from `Content-Type` headers.
//!
//! Decoders are keyed by the bare media type (`type/subtype`). Parameters such
//! as `charset` are dropped and the result is lower-cased, so
//! `Application/JSON; charset=utf-8` resolves to `application/json`. Malformed
//! parameters are still rejected.

use http::HeaderMap;
use http::header::CONTENT_TYPE;

use crate::DecodeError;

/// Extract the media type from the `Content-Type` header.
///
/// Fails with [`DecodeError::Parse`] if the header is absent, not valid
/// ASCII, or malformed.
pub fn media_type_from_headers(headers: &HeaderMap) -> Result<String, DecodeError> {
    let value = match headers.get(CONTENT_TYPE) {
        Some(value) => value
            .to_str()
            .map_err(|_| DecodeError::Parse("mime: invalid content-type header".into()))?,
        None => "",
    };
    parse_media_type(value)
}

/// Parse a `Content-Type` value and return its lower-cased media type.
///
/// Parameters are checked for syntax (`token=token` or `token="quoted"`)
/// and then discarded.
pub fn parse_media_type(value: &str) -> Result<String, DecodeError> {
    let (essence, parameters) = match value.find(';') {
        Some(at) => value.split_at(at),
        None => (value, ""),
    };
    let essence = essence.trim();
    if essence.is_empty() {
        return Err(DecodeError::Parse("mime: no media type".into()));
    }

    let (kind, subtype) = essence
        .split_once('/')
        .ok_or_else(|| DecodeError::Parse("mime: expected slash after first token".into()))?;

    if !is_token(kind) {
        return Err(DecodeError::Parse(format!(
            "mime: invalid media type '{essence}'"
        )));
    }
    if !is_token(subtype) {
        return Err(DecodeError::Parse(format!(
            "mime: expected token after slash in '{essence}'"
        )));
    }

    check_parameters(parameters)?;
    Ok(essence.to_ascii_lowercase())
}

fn check_parameters(mut rest: &str) -> Result<(), DecodeError> {
    loop {
        rest = trim_ows(rest);
        if rest.is_empty() {
            return Ok(());
        }
        rest = trim_ows(rest.strip_prefix(';').ok_or_else(invalid_parameter)?);
        // Empty segments (`text/plain;` or `;;`) are tolerated.
        if rest.is_empty() || rest.starts_with(';') {
            continue;
        }

        let (name, after) = split_token(rest);
        if name.is_empty() {
            return Err(invalid_parameter());
        }
        rest = after.strip_prefix('=').ok_or_else(invalid_parameter)?;

        rest = match rest.strip_prefix('"') {
            Some(quoted) => skip_quoted_string(quoted)?,
            None => {
                let (value, after) = split_token(rest);
                if value.is_empty() {
                    return Err(invalid_parameter());
                }
                after
            }
        };
    }
}

/// Consume a quoted string body (opening quote already stripped).
fn skip_quoted_string(s: &str) -> Result<&str, DecodeError> {
    let mut chars = s.char_indices();
    while let Some((at, c)) = chars.next() {
        match c {
            '"' => return Ok(&s[at + 1..]),
            '\\' => {
                chars.next().ok_or_else(invalid_parameter)?;
            }
            _ => {}
        }
    }
    Err(invalid_parameter())
}

fn split_token(s: &str) -> (&str, &str) {
    let len = s.bytes().take_while(|b| is_token_char(*b)).count();
    s.split_at(len)
}

fn trim_ows(s: &str) -> &str {
    s.trim_start_matches([' ', '\t'])
}

fn invalid_parameter() -> DecodeError {
    DecodeError::Parse("mime: invalid media parameter".into())
}

fn is_token(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(is_token_char)
}

// RFC 7230 tchar
fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#'
                | b'$'
                | b'%'
                | b'&'
                | b'\''
                | b'*'
                | b'+'
                | b'-'
                | b'.'
                | b'^'
                | b'_'
                | b'`'
                | b'|'
                | b'~'
        )
}
