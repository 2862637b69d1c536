use std::fmt;

use fleetload_engine::{BulkFormat, ESCAPE, FIELD_DELIMITER, LINE_TERMINATOR, NULL_MARKER};

/// One payload line as the server reads it; `None` is the null marker.
pub type RawRow = Vec<Option<Vec<u8>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadError {
    /// 1-based line number inside the payload.
    pub line: usize,
    pub reason: String,
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.reason)
    }
}

impl std::error::Error for PayloadError {}

/// Split a bulk payload into lines and unescaped fields.
///
/// Follows the server-side grammar of `format`, not the engine's encoder,
/// so escapes the engine never emits (`\b`, octal, `\Z`, ...) are accepted
/// too. A missing final terminator is tolerated; `\.` ends a COPY stream.
pub fn parse_payload(format: BulkFormat, payload: &[u8]) -> Result<Vec<RawRow>, PayloadError> {
    let mut rows = Vec::new();
    if payload.is_empty() {
        return Ok(rows);
    }

    let body = payload.strip_suffix(&[LINE_TERMINATOR]).unwrap_or(payload);
    for (i, line) in body.split(|&b| b == LINE_TERMINATOR).enumerate() {
        if format == BulkFormat::PgCopyText && line == b"\\." {
            break;
        }
        let row = line
            .split(|&b| b == FIELD_DELIMITER)
            .map(|field| parse_field(format, field))
            .collect::<Result<RawRow, String>>()
            .map_err(|reason| PayloadError { line: i + 1, reason })?;
        rows.push(row);
    }
    Ok(rows)
}

fn parse_field(format: BulkFormat, field: &[u8]) -> Result<Option<Vec<u8>>, String> {
    if field == NULL_MARKER {
        return Ok(None);
    }

    let mut out = Vec::with_capacity(field.len());
    let mut bytes = field.iter().copied().peekable();
    while let Some(b) = bytes.next() {
        if b != ESCAPE {
            out.push(b);
            continue;
        }
        let Some(escaped) = bytes.next() else {
            return Err("field ends with a lone escape character".into());
        };
        let unescaped = match (format, escaped) {
            (_, b'n') => b'\n',
            (_, b't') => b'\t',
            (_, b'r') => b'\r',
            (_, b'b') => 0x08,
            (BulkFormat::PgCopyText, b'f') => 0x0c,
            (BulkFormat::PgCopyText, b'v') => 0x0b,
            (BulkFormat::PgCopyText, d @ b'0'..=b'7') => {
                let mut v = u32::from(d - b'0');
                for _ in 0..2 {
                    match bytes.next_if(|c| matches!(*c, b'0'..=b'7')) {
                        Some(c) => v = v * 8 + u32::from(c - b'0'),
                        None => break,
                    }
                }
                (v & 0xff) as u8
            }
            (BulkFormat::PgCopyText, b'x') => {
                let mut v = None;
                for _ in 0..2 {
                    match bytes.next_if(u8::is_ascii_hexdigit) {
                        Some(c) => v = Some(v.unwrap_or(0) * 16 + hex_value(c)),
                        None => break,
                    }
                }
                v.unwrap_or(b'x')
            }
            (BulkFormat::MySqlLoadData, b'0') => 0,
            (BulkFormat::MySqlLoadData, b'Z') => 0x1a,
            (_, other) => other,
        };
        out.push(unescaped);
    }

    if format == BulkFormat::PgCopyText && out.contains(&0) {
        return Err("invalid byte sequence: 0x00".into());
    }
    Ok(Some(out))
}

pub(crate) fn hex_value(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => 0,
    }
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
