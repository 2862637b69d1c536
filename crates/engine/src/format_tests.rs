use super::*;
use chrono::{NaiveDate, NaiveTime, TimeZone};

fn encode(format: BulkFormat, value: Value) -> Result<String, FieldError> {
    let mut out = Vec::new();
    format.encode_field(&value, &mut out)?;
    Ok(String::from_utf8(out).expect("utf8 output"))
}

#[test]
fn text_escaping_is_shared_by_both_formats() {
    let cases: &[(&str, &str)] = &[
        ("plain", "plain"),
        ("", ""),
        ("tab\there", "tab\\there"),
        ("line\nbreak", "line\\nbreak"),
        ("cr\r", "cr\\r"),
        ("back\\slash", "back\\\\slash"),
        ("\\N", "\\\\N"),
        ("ñandú", "ñandú"),
    ];

    for format in [BulkFormat::PgCopyText, BulkFormat::MySqlLoadData] {
        for (input, expected) in cases {
            let got = encode(format, Value::from(*input)).expect("encode text");
            assert_eq!(got, *expected, "{format:?} escaping {input:?}");
        }
    }
}

#[test]
fn null_is_distinct_from_empty_text() {
    for format in [BulkFormat::PgCopyText, BulkFormat::MySqlLoadData] {
        assert_eq!(encode(format, Value::Null).unwrap(), "\\N");
        assert_eq!(encode(format, Value::from("")).unwrap(), "");
        assert_eq!(encode(format, Value::from(None::<i64>)).unwrap(), "\\N");
    }
}

#[test]
fn nul_bytes_depend_on_format() {
    assert_eq!(
        encode(BulkFormat::MySqlLoadData, Value::from("a\0b")).unwrap(),
        "a\\0b"
    );
    assert!(encode(BulkFormat::PgCopyText, Value::from("a\0b")).is_err());
}

#[test]
fn scalar_rendering_per_format() {
    let cases: Vec<(BulkFormat, Value, &str)> = vec![
        (BulkFormat::PgCopyText, Value::Bool(true), "t"),
        (BulkFormat::PgCopyText, Value::Bool(false), "f"),
        (BulkFormat::MySqlLoadData, Value::Bool(true), "1"),
        (BulkFormat::MySqlLoadData, Value::Bool(false), "0"),
        (BulkFormat::PgCopyText, Value::Int(-42), "-42"),
        (BulkFormat::MySqlLoadData, Value::Int(i64::MAX), "9223372036854775807"),
        (BulkFormat::PgCopyText, Value::Float(0.1), "0.1"),
        (BulkFormat::MySqlLoadData, Value::Float(-2.5), "-2.5"),
        (BulkFormat::PgCopyText, Value::Float(f64::NAN), "NaN"),
        (BulkFormat::PgCopyText, Value::Float(f64::INFINITY), "Infinity"),
        (BulkFormat::PgCopyText, Value::Float(f64::NEG_INFINITY), "-Infinity"),
        (BulkFormat::PgCopyText, Value::Decimal("-12.50".into()), "-12.50"),
        (BulkFormat::PgCopyText, Value::Bytes(vec![0xde, 0xad, 0x01]), "\\\\xdead01"),
        (BulkFormat::MySqlLoadData, Value::Bytes(vec![b'a', 0, b'\t']), "a\\0\\t"),
    ];

    for (format, value, expected) in cases {
        let got = encode(format, value.clone()).expect("encode");
        assert_eq!(got, expected, "{format:?} {value:?}");
    }
}

#[test]
fn temporal_values_use_canonical_text() {
    let date = NaiveDate::from_ymd_opt(2017, 3, 9).unwrap();
    let time = NaiveTime::from_hms_micro_opt(7, 5, 3, 250_000).unwrap();
    let ts = date.and_time(time);
    let tz = chrono::Utc.from_utc_datetime(&ts);

    for format in [BulkFormat::PgCopyText, BulkFormat::MySqlLoadData] {
        assert_eq!(encode(format, Value::Date(date)).unwrap(), "2017-03-09");
        assert_eq!(encode(format, Value::Time(time)).unwrap(), "07:05:03.250");
        assert_eq!(
            encode(format, Value::Timestamp(ts)).unwrap(),
            "2017-03-09 07:05:03.250"
        );
    }

    assert_eq!(
        encode(BulkFormat::PgCopyText, Value::TimestampTz(tz)).unwrap(),
        "2017-03-09 07:05:03.250+00"
    );
    assert_eq!(
        encode(BulkFormat::MySqlLoadData, Value::TimestampTz(tz)).unwrap(),
        "2017-03-09 07:05:03.250"
    );
}

#[test]
fn unrepresentable_values_fail() {
    let cases: Vec<(BulkFormat, Value)> = vec![
        (BulkFormat::MySqlLoadData, Value::Float(f64::NAN)),
        (BulkFormat::MySqlLoadData, Value::Float(f64::INFINITY)),
        (BulkFormat::PgCopyText, Value::Decimal("12,5".into())),
        (BulkFormat::PgCopyText, Value::Decimal("".into())),
        (BulkFormat::MySqlLoadData, Value::Decimal("1.".into())),
        (BulkFormat::MySqlLoadData, Value::Decimal("-".into())),
    ];

    for (format, value) in cases {
        assert!(
            encode(format, value.clone()).is_err(),
            "{format:?} should reject {value:?}"
        );
    }
}

#[test]
fn format_names_parse_back() {
    for format in [BulkFormat::PgCopyText, BulkFormat::MySqlLoadData] {
        assert_eq!(format.name().parse::<BulkFormat>(), Ok(format));
        let json = serde_json::to_string(&format).unwrap();
        assert_eq!(json, format!("\"{}\"", format.name()));
    }
    assert_eq!("MySQL".parse::<BulkFormat>(), Ok(BulkFormat::MySqlLoadData));
    assert!("csv".parse::<BulkFormat>().is_err());
}
