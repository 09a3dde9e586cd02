//! Text fields of a `multipart/form-data` body.
//!
//! Only what form binding needs: every part with a `name` and no
//! `filename` yields one `(name, value)` pair. File parts are skipped.

use crate::error::BindError;

pub(crate) fn text_fields(content_type: &str, body: &[u8]) -> Result<Vec<(String, String)>, BindError> {
    let boundary = param(content_type, "boundary")
        .ok_or_else(|| BindError::Multipart("missing boundary".to_owned()))?;
    let delimiter = format!("--{boundary}").into_bytes();

    let start = find(body, &delimiter)
        .ok_or_else(|| BindError::Multipart("no opening boundary".to_owned()))?;
    let mut rest = &body[start + delimiter.len()..];
    let mut fields = Vec::new();

    // After each delimiter: `--` closes the body, CRLF opens a part.
    while !rest.starts_with(b"--") {
        rest = rest
            .strip_prefix(b"\r\n")
            .ok_or_else(|| BindError::Multipart("malformed boundary line".to_owned()))?;
        let end = find(rest, &delimiter)
            .ok_or_else(|| BindError::Multipart("unterminated part".to_owned()))?;
        let part = &rest[..end];
        rest = &rest[end + delimiter.len()..];

        let part = part.strip_suffix(b"\r\n").unwrap_or(part);
        if let Some(field) = text_field(part)? {
            fields.push(field);
        }
    }

    Ok(fields)
}

fn text_field(part: &[u8]) -> Result<Option<(String, String)>, BindError> {
    let split = find(part, b"\r\n\r\n")
        .ok_or_else(|| BindError::Multipart("part without header block".to_owned()))?;
    let head = std::str::from_utf8(&part[..split])
        .map_err(|_| BindError::Multipart("part headers are not utf-8".to_owned()))?;
    let content = &part[split + 4..];

    let Some(disposition) = head.split("\r\n").find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.trim().eq_ignore_ascii_case("content-disposition").then_some(value)
    }) else {
        return Ok(None);
    };

    if param(disposition, "filename").is_some() {
        return Ok(None);
    }
    let Some(name) = param(disposition, "name") else {
        return Ok(None);
    };

    let value = String::from_utf8(content.to_vec())
        .map_err(|_| BindError::Multipart(format!("field {name:?} is not utf-8")))?;
    Ok(Some((name.to_owned(), value)))
}

/// Value of `key` among the `;`-separated parameters of a header value,
/// with surrounding quotes removed.
fn param<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    header.split(';').skip(1).find_map(|param| {
        let (k, v) = param.split_once('=')?;
        k.trim()
            .eq_ignore_ascii_case(key)
            .then(|| v.trim().trim_matches('"'))
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}
