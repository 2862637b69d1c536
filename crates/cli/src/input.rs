use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use fleetload_engine::{FieldError, SchemaDescriptor, Value};
use fleetload_memdb::{ColumnType, TableDef};
use serde_json::{Map, Value as Json};

/// One JSONL input line.
pub type Record = Map<String, Json>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub ty: ColumnType,
}

/// Parse `id:int,name:text`. A column without a type is `text`.
pub fn parse_columns(spec: &str) -> Result<Vec<ColumnSpec>> {
    let columns = spec
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(|c| {
            let (name, ty) = c.split_once(':').unwrap_or((c, "text"));
            let ty = ty
                .trim()
                .parse::<ColumnType>()
                .map_err(|e| anyhow!("column `{name}`: {e}"))?;
            Ok(ColumnSpec {
                name: name.trim().to_string(),
                ty,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if columns.is_empty() {
        bail!("no columns given");
    }
    Ok(columns)
}

/// Schema reading each column from the same-named JSON key.
pub fn schema(table: &str, columns: &[ColumnSpec]) -> Result<SchemaDescriptor<Record>> {
    let builder = columns
        .iter()
        .fold(SchemaDescriptor::builder(table), |builder, col| {
            let key = col.name.clone();
            let ty = col.ty;
            builder.try_column(col.name.clone(), move |record: &Record| {
                json_to_value(ty, record.get(&key).unwrap_or(&Json::Null))
            })
        });
    Ok(builder.build()?)
}

pub fn table_def(table: &str, columns: &[ColumnSpec], primary_key: Option<&str>) -> TableDef {
    let def = columns
        .iter()
        .fold(TableDef::new(table), |def, col| def.column(col.name.clone(), col.ty));
    match primary_key {
        Some(pk) => def.primary_key(pk),
        None => def,
    }
}

/// Read every JSON object of a JSONL file; blank lines are skipped.
pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;

    let mut records = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str::<Record>(&line)
            .with_context(|| format!("{}:{}: not a JSON object", path.display(), i + 1))?;
        records.push(record);
    }
    Ok(records)
}

pub fn json_to_value(ty: ColumnType, json: &Json) -> Result<Value, FieldError> {
    if json.is_null() {
        return Ok(Value::Null);
    }
    let mismatch = || FieldError::new(format!("expected {ty}, got {json}"));
    let text = || json.as_str().ok_or_else(mismatch);

    let value = match ty {
        ColumnType::Bool => Value::Bool(json.as_bool().ok_or_else(mismatch)?),
        ColumnType::Int => Value::Int(json.as_i64().ok_or_else(mismatch)?),
        ColumnType::Float => match json {
            Json::Number(n) => Value::Float(n.as_f64().ok_or_else(mismatch)?),
            Json::String(s) => match s.as_str() {
                "NaN" => Value::Float(f64::NAN),
                "Infinity" => Value::Float(f64::INFINITY),
                "-Infinity" => Value::Float(f64::NEG_INFINITY),
                _ => return Err(mismatch()),
            },
            _ => return Err(mismatch()),
        },
        ColumnType::Decimal => match json {
            Json::Number(n) => Value::Decimal(n.to_string()),
            Json::String(s) => Value::Decimal(s.clone()),
            _ => return Err(mismatch()),
        },
        ColumnType::Text => match json {
            Json::String(s) => Value::Text(s.clone()),
            Json::Bool(_) | Json::Number(_) => Value::Text(json.to_string()),
            _ => return Err(mismatch()),
        },
        ColumnType::Bytes => match json {
            Json::String(s) => Value::Bytes(s.as_bytes().to_vec()),
            Json::Array(items) => Value::Bytes(
                items
                    .iter()
                    .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()))
                    .collect::<Option<Vec<u8>>>()
                    .ok_or_else(mismatch)?,
            ),
            _ => return Err(mismatch()),
        },
        ColumnType::Date => Value::Date(
            NaiveDate::parse_from_str(text()?, "%Y-%m-%d").map_err(|_| mismatch())?,
        ),
        ColumnType::Time => Value::Time(
            NaiveTime::parse_from_str(text()?, "%H:%M:%S%.f").map_err(|_| mismatch())?,
        ),
        ColumnType::Timestamp => {
            let s = text()?;
            Value::Timestamp(
                NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                    .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                    .map_err(|_| mismatch())?,
            )
        }
        ColumnType::TimestampTz => Value::TimestampTz(
            DateTime::parse_from_rfc3339(text()?)
                .map_err(|_| mismatch())?
                .with_timezone(&Utc),
        ),
    };
    Ok(value)
}

#[cfg(test)]
#[path = "input_tests.rs"]
mod tests;
