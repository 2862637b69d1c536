use std::io::Write;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{FieldError, Value};

pub const FIELD_DELIMITER: u8 = b'\t';
pub const LINE_TERMINATOR: u8 = b'\n';
pub const ESCAPE: u8 = b'\\';
pub const NULL_MARKER: &[u8] = b"\\N";

const TIME_FORMAT: &str = "%H:%M:%S%.f";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Textual payload grammar understood by a database's bulk parser.
///
/// Both grammars share the delimiter, terminator and null marker above;
/// they differ in which bytes are legal and how non-text types are spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulkFormat {
    /// PostgreSQL `COPY ... FROM STDIN` in `text` format.
    #[serde(rename = "copy")]
    PgCopyText,
    /// MySQL `LOAD DATA LOCAL INFILE` with backslash escaping.
    #[serde(rename = "load-data")]
    MySqlLoadData,
}

impl BulkFormat {
    pub fn name(self) -> &'static str {
        match self {
            BulkFormat::PgCopyText => "copy",
            BulkFormat::MySqlLoadData => "load-data",
        }
    }

    /// Default flush threshold for this format.
    pub fn default_batch_size(self) -> u64 {
        match self {
            BulkFormat::PgCopyText => fleetload_runtime::DEFAULT_COPY_BATCH_SIZE,
            BulkFormat::MySqlLoadData => fleetload_runtime::DEFAULT_LOAD_DATA_BATCH_SIZE,
        }
    }

    /// Append one field to `out`, without any delimiter.
    ///
    /// On error `out` may hold a partial field; the caller truncates.
    pub fn encode_field(self, value: &Value, out: &mut Vec<u8>) -> Result<(), FieldError> {
        match value {
            Value::Null => out.extend_from_slice(NULL_MARKER),
            Value::Bool(b) => out.extend_from_slice(self.bool_literal(*b)),
            Value::Int(i) => write_display(out, i),
            Value::Float(f) => self.encode_float(*f, out)?,
            Value::Decimal(d) => {
                validate_decimal(d)?;
                out.extend_from_slice(d.as_bytes());
            }
            Value::Text(s) => self.escape_into(s.as_bytes(), out)?,
            Value::Bytes(b) => self.encode_bytes(b, out)?,
            Value::Date(d) => write_display(out, d.format("%Y-%m-%d")),
            Value::Time(t) => write_display(out, t.format(TIME_FORMAT)),
            Value::Timestamp(ts) => write_display(out, ts.format(TIMESTAMP_FORMAT)),
            Value::TimestampTz(ts) => self.encode_timestamptz(ts, out),
        }
        Ok(())
    }

    fn bool_literal(self, b: bool) -> &'static [u8] {
        match (self, b) {
            (BulkFormat::PgCopyText, true) => b"t",
            (BulkFormat::PgCopyText, false) => b"f",
            (BulkFormat::MySqlLoadData, true) => b"1",
            (BulkFormat::MySqlLoadData, false) => b"0",
        }
    }

    fn encode_float(self, f: f64, out: &mut Vec<u8>) -> Result<(), FieldError> {
        if f.is_finite() {
            write_display(out, f);
            return Ok(());
        }
        match self {
            BulkFormat::PgCopyText => {
                let literal: &[u8] = if f.is_nan() {
                    b"NaN"
                } else if f > 0.0 {
                    b"Infinity"
                } else {
                    b"-Infinity"
                };
                out.extend_from_slice(literal);
                Ok(())
            }
            BulkFormat::MySqlLoadData => Err(FieldError::new(format!(
                "{f} cannot be represented in a MySQL numeric column"
            ))),
        }
    }

    fn encode_bytes(self, bytes: &[u8], out: &mut Vec<u8>) -> Result<(), FieldError> {
        match self {
            // bytea hex input; the leading backslash is itself escaped by COPY text.
            BulkFormat::PgCopyText => {
                out.extend_from_slice(b"\\\\x");
                for b in bytes {
                    write_display(out, format_args!("{b:02x}"));
                }
                Ok(())
            }
            BulkFormat::MySqlLoadData => self.escape_into(bytes, out),
        }
    }

    fn encode_timestamptz(self, ts: &DateTime<Utc>, out: &mut Vec<u8>) {
        match self {
            BulkFormat::PgCopyText => {
                write_display(out, ts.format(TIMESTAMP_FORMAT));
                out.extend_from_slice(b"+00");
            }
            // DATETIME has no zone; values are stored as UTC wall time.
            BulkFormat::MySqlLoadData => {
                let naive: NaiveDateTime = ts.naive_utc();
                write_display(out, naive.format(TIMESTAMP_FORMAT));
            }
        }
    }

    /// Backslash-escape `raw` so the bulk parser reads back exactly `raw`.
    fn escape_into(self, raw: &[u8], out: &mut Vec<u8>) -> Result<(), FieldError> {
        out.reserve(raw.len());
        for &b in raw {
            match b {
                b'\\' => out.extend_from_slice(b"\\\\"),
                b'\t' => out.extend_from_slice(b"\\t"),
                b'\n' => out.extend_from_slice(b"\\n"),
                b'\r' => out.extend_from_slice(b"\\r"),
                0 => match self {
                    BulkFormat::MySqlLoadData => out.extend_from_slice(b"\\0"),
                    BulkFormat::PgCopyText => {
                        return Err(FieldError::new("text value contains a NUL byte"));
                    }
                },
                _ => out.push(b),
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for BulkFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "copy" | "pg" | "postgres" => Ok(BulkFormat::PgCopyText),
            "load-data" | "mysql" => Ok(BulkFormat::MySqlLoadData),
            other => Err(format!("unknown bulk format `{other}` (expected copy or load-data)")),
        }
    }
}

fn write_display(out: &mut Vec<u8>, v: impl std::fmt::Display) {
    // Writing into a Vec cannot fail.
    let _ = write!(out, "{v}");
}

fn validate_decimal(d: &str) -> Result<(), FieldError> {
    let digits = d.strip_prefix(['-', '+']).unwrap_or(d);
    let (int, frac) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };

    let all_digits = |s: &str| s.bytes().all(|c| c.is_ascii_digit());
    let valid = all_digits(int)
        && frac.is_none_or(|f| !f.is_empty() && all_digits(f))
        && !(int.is_empty() && frac.is_none());

    if valid {
        Ok(())
    } else {
        Err(FieldError::new(format!("`{d}` is not a decimal number")))
    }
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
