use super::*;

struct Row;

fn schema(table: &str, columns: &[&str]) -> SchemaDescriptor<Row> {
    columns
        .iter()
        .fold(SchemaDescriptor::builder(table), |b, c| {
            b.column(c.to_string(), |_: &Row| 0)
        })
        .build()
        .expect("valid schema")
}

#[test]
fn copy_header_quotes_only_when_needed() {
    let s = schema("public.employee", &["id", "Name", "company_id"]);
    assert_eq!(
        header_sql(BulkFormat::PgCopyText, &s),
        "COPY public.employee (id, \"Name\", company_id) FROM STDIN \
         WITH (FORMAT text, ENCODING 'UTF-8', DELIMITER E'\\t', NULL '\\N')"
    );
}

#[test]
fn load_data_header_always_backticks() {
    let s = schema("employee", &["id", "we`ird"]);
    assert_eq!(
        header_sql(BulkFormat::MySqlLoadData, &s),
        "LOAD DATA LOCAL INFILE '' INTO TABLE `employee` CHARACTER SET UTF8 \
         FIELDS TERMINATED BY '\\t' ENCLOSED BY '' ESCAPED BY '\\\\' \
         LINES TERMINATED BY '\\n' (`id`, `we``ird`)"
    );
}

#[test]
fn header_target_parses_what_header_sql_builds() {
    let cases: &[(&str, &[&str])] = &[
        ("employee", &["id", "name"]),
        ("hr.Employee", &["id", "first name", "a,b", "x)y", "q\"t"]),
        ("odd (name) CHARACTER SET x", &["id", "b (c)"]),
    ];

    for format in [BulkFormat::PgCopyText, BulkFormat::MySqlLoadData] {
        for (table, columns) in cases {
            let sql = header_sql(format, &schema(table, columns));
            let target = HeaderTarget::parse(format, &sql)
                .unwrap_or_else(|| panic!("{format:?} could not parse {sql}"));

            assert_eq!(target.table, *table, "{sql}");
            assert_eq!(target.columns, *columns, "{sql}");
        }
    }
}

#[test]
fn header_target_rejects_foreign_statements() {
    assert_eq!(
        HeaderTarget::parse(BulkFormat::PgCopyText, "INSERT INTO t VALUES (1)"),
        None
    );
    assert_eq!(
        HeaderTarget::parse(BulkFormat::MySqlLoadData, "COPY t (a) FROM STDIN"),
        None
    );
}
