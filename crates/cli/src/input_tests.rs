use super::*;
use serde_json::json;
use std::io::Write;

#[test]
fn parses_column_specs() {
    let columns = parse_columns("id:int, name ,born:date").expect("valid columns");

    assert_eq!(
        columns,
        [
            ColumnSpec {
                name: "id".into(),
                ty: ColumnType::Int
            },
            ColumnSpec {
                name: "name".into(),
                ty: ColumnType::Text
            },
            ColumnSpec {
                name: "born".into(),
                ty: ColumnType::Date
            },
        ]
    );
    assert!(parse_columns("id:uuid").is_err());
    assert!(parse_columns(" , ").is_err());
}

#[test]
fn converts_json_per_column_type() {
    let cases = [
        (ColumnType::Int, json!(42), Value::Int(42)),
        (ColumnType::Bool, json!(true), Value::Bool(true)),
        (ColumnType::Float, json!("NaN"), Value::Float(f64::NAN)),
        (ColumnType::Decimal, json!("10.25"), Value::Decimal("10.25".into())),
        (ColumnType::Text, json!(7), Value::Text("7".into())),
        (ColumnType::Bytes, json!([0, 255]), Value::Bytes(vec![0, 255])),
        (ColumnType::Int, json!(null), Value::Null),
    ];

    for (ty, input, expected) in cases {
        let got = json_to_value(ty, &input).expect("convertible");
        match (&got, &expected) {
            (Value::Float(a), Value::Float(b)) if b.is_nan() => assert!(a.is_nan()),
            _ => assert_eq!(got, expected, "{ty} {input}"),
        }
    }

    let ts = json_to_value(ColumnType::TimestampTz, &json!("2024-01-02T03:04:05+02:00"))
        .expect("rfc3339");
    assert_eq!(
        ts,
        Value::TimestampTz("2024-01-02T01:04:05Z".parse().expect("utc"))
    );
}

#[test]
fn rejects_mismatched_json() {
    let cases = [
        (ColumnType::Int, json!("12")),
        (ColumnType::Int, json!(1.5)),
        (ColumnType::Bool, json!(1)),
        (ColumnType::Bytes, json!([256])),
        (ColumnType::Date, json!("02/01/2024")),
        (ColumnType::Text, json!({"nested": true})),
    ];

    for (ty, input) in cases {
        assert!(json_to_value(ty, &input).is_err(), "{ty} {input}");
    }
}

#[test]
fn reads_jsonl_and_extracts_by_key() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, r#"{{"id": 1, "name": "Ada"}}"#).unwrap();
    writeln!(file).unwrap();
    writeln!(file, r#"{{"id": 2}}"#).unwrap();

    let records = read_records(file.path()).expect("valid jsonl");
    let columns = parse_columns("id:int,name:text").unwrap();
    let schema = schema("people", &columns).expect("valid schema");

    assert_eq!(records.len(), 2);
    assert_eq!(schema.extract(&records[0], 1).unwrap(), Value::Text("Ada".into()));
    assert_eq!(schema.extract(&records[1], 1).unwrap(), Value::Null);
}

#[test]
fn reports_the_offending_line() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, r#"{{"id": 1}}"#).unwrap();
    writeln!(file, "[1, 2]").unwrap();

    let err = read_records(file.path()).unwrap_err();

    assert!(format!("{err:#}").contains(":2:"), "{err:#}");
}

#[test]
fn table_def_marks_primary_key() {
    let columns = parse_columns("id:int,name").unwrap();
    let def = table_def("people", &columns, Some("id"));

    assert_eq!(def.primary_key_index(), Some(0));
    assert!(!def.columns()[0].nullable);
    assert!(def.columns()[1].nullable);
}
