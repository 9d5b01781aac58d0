use std::sync::OnceLock;

use regex::Regex;

use crate::http::request::{FilePart, HeaderMap};

fn disposition_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)Content-Disposition:\s*form-data;\s*name="([^"]*)";\s*filename="([^"]*)""#)
            .expect("disposition pattern is valid")
    })
}

/// Extracts uploaded files from a fully buffered `multipart/form-data` body.
///
/// The body is scanned for every `--<boundary>` occurrence; the slice
/// between each consecutive pair, minus the boundary's trailing CRLF, is
/// split at the first blank line into a header block and a payload. A part
/// is recorded only when its `Content-Disposition` carries both a non-empty
/// `name` and `filename`; anything malformed is silently skipped.
pub fn extract(headers: &HeaderMap, body: &[u8]) -> Vec<FilePart> {
    let Some(content_type) = headers.get("Content-Type") else {
        return Vec::new();
    };
    if !content_type.contains("multipart/form-data") {
        return Vec::new();
    }
    let Some(boundary) = content_type.split("boundary=").nth(1) else {
        return Vec::new();
    };
    // Parameters may follow the boundary value.
    let boundary = boundary.split(';').next().unwrap_or(boundary);
    let boundary = boundary.trim().trim_matches('"');
    if boundary.is_empty() {
        return Vec::new();
    }

    let marker = format!("--{}", boundary);
    let positions = find_all(body, marker.as_bytes());

    let mut files = Vec::new();
    for pair in positions.windows(2) {
        let mut part = &body[pair[0] + marker.len()..pair[1]];
        if part.starts_with(b"\r\n") {
            part = &part[2..];
        }

        let Some(split) = find(part, b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&part[..split]);
        let mut payload = &part[split + 4..];
        // The CRLF before the next boundary belongs to the framing, not the
        // payload.
        if payload.ends_with(b"\r\n") {
            payload = &payload[..payload.len() - 2];
        }

        let Some(caps) = disposition_re().captures(&head) else {
            continue;
        };
        let name = &caps[1];
        let filename = &caps[2];
        if name.is_empty() || filename.is_empty() {
            continue;
        }

        files.push(FilePart {
            name: name.to_string(),
            filename: filename.to_string(),
            body: payload.to_vec(),
        });
    }
    files
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn find_all(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return Vec::new();
    }
    let mut positions = Vec::new();
    let mut offset = 0;
    while let Some(found) = find(&haystack[offset..], needle) {
        positions.push(offset + found);
        offset += found + needle.len();
    }
    positions
}
