use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use fleetload_engine::{BulkFormat, Value};

use crate::payload::hex_value;

const TIME_FORMAT: &str = "%H:%M:%S%.f";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Declared type of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Bool,
    Int,
    Float,
    Decimal,
    Text,
    Bytes,
    Date,
    Time,
    Timestamp,
    TimestampTz,
}

impl ColumnType {
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Bool => "bool",
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::Decimal => "decimal",
            ColumnType::Text => "text",
            ColumnType::Bytes => "bytes",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
            ColumnType::Timestamp => "timestamp",
            ColumnType::TimestampTz => "timestamptz",
        }
    }

    /// Read one unescaped field the way the target server would.
    pub fn decode(self, format: BulkFormat, raw: &[u8]) -> Result<Value, String> {
        if self == ColumnType::Bytes && format == BulkFormat::MySqlLoadData {
            return Ok(Value::Bytes(raw.to_vec()));
        }

        let s = std::str::from_utf8(raw).map_err(|_| "invalid UTF-8".to_string())?;
        let invalid = |e: &dyn fmt::Display| format!("invalid {} `{s}`: {e}", self.name());

        match self {
            ColumnType::Bool => match (format, s) {
                (BulkFormat::PgCopyText, "t" | "true" | "y" | "yes" | "on" | "1") => {
                    Ok(Value::Bool(true))
                }
                (BulkFormat::PgCopyText, "f" | "false" | "n" | "no" | "off" | "0") => {
                    Ok(Value::Bool(false))
                }
                (BulkFormat::MySqlLoadData, "1") => Ok(Value::Bool(true)),
                (BulkFormat::MySqlLoadData, "0") => Ok(Value::Bool(false)),
                _ => Err(invalid(&"not a boolean literal")),
            },
            ColumnType::Int => s.parse().map(Value::Int).map_err(|e| invalid(&e)),
            ColumnType::Float => {
                let f: f64 = s.parse().map_err(|e| invalid(&e))?;
                if format == BulkFormat::MySqlLoadData && !f.is_finite() {
                    return Err(invalid(&"out of range"));
                }
                Ok(Value::Float(f))
            }
            ColumnType::Decimal => {
                if is_decimal(s) {
                    Ok(Value::Decimal(s.to_owned()))
                } else {
                    Err(invalid(&"not a decimal number"))
                }
            }
            ColumnType::Text => Ok(Value::Text(s.to_owned())),
            ColumnType::Bytes => decode_bytea(s).map(Value::Bytes).map_err(|e| invalid(&e)),
            ColumnType::Date => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(Value::Date)
                .map_err(|e| invalid(&e)),
            ColumnType::Time => NaiveTime::parse_from_str(s, TIME_FORMAT)
                .map(Value::Time)
                .map_err(|e| invalid(&e)),
            ColumnType::Timestamp => NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
                .map(Value::Timestamp)
                .map_err(|e| invalid(&e)),
            ColumnType::TimestampTz => match format {
                BulkFormat::PgCopyText => {
                    DateTime::parse_from_str(s, &format!("{TIMESTAMP_FORMAT}%#z"))
                        .map(|ts| Value::TimestampTz(ts.with_timezone(&Utc)))
                        .map_err(|e| invalid(&e))
                }
                // DATETIME columns carry no zone; values arrive in UTC.
                BulkFormat::MySqlLoadData => NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
                    .map(|ts| Value::TimestampTz(ts.and_utc()))
                    .map_err(|e| invalid(&e)),
            },
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => Ok(ColumnType::Bool),
            "int" | "integer" | "bigint" => Ok(ColumnType::Int),
            "float" | "double" => Ok(ColumnType::Float),
            "decimal" | "numeric" => Ok(ColumnType::Decimal),
            "text" | "varchar" => Ok(ColumnType::Text),
            "bytes" | "bytea" | "blob" => Ok(ColumnType::Bytes),
            "date" => Ok(ColumnType::Date),
            "time" => Ok(ColumnType::Time),
            "timestamp" | "datetime" => Ok(ColumnType::Timestamp),
            "timestamptz" => Ok(ColumnType::TimestampTz),
            other => Err(format!("unknown column type `{other}`")),
        }
    }
}

fn is_decimal(s: &str) -> bool {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    let (int, frac) = digits.split_once('.').unwrap_or((digits, "0"));
    !int.is_empty()
        && !frac.is_empty()
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit())
}

/// PostgreSQL `bytea` hex input: `\x` followed by pairs of hex digits.
fn decode_bytea(s: &str) -> Result<Vec<u8>, &'static str> {
    let hex = s.strip_prefix("\\x").ok_or("missing \\x prefix")?;
    if hex.len() % 2 != 0 {
        return Err("odd number of hex digits");
    }
    hex.as_bytes()
        .chunks(2)
        .map(|pair| {
            if pair.iter().all(u8::is_ascii_hexdigit) {
                Ok(hex_value(pair[0]) * 16 + hex_value(pair[1]))
            } else {
                Err("invalid hex digit")
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
