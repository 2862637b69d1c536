use crate::{BulkFormat, SchemaDescriptor};

/// Statement preamble that introduces a bulk payload for `schema`'s table.
pub fn header_sql<T>(format: BulkFormat, schema: &SchemaDescriptor<T>) -> String {
    match format {
        BulkFormat::PgCopyText => {
            let columns: Vec<String> = schema.column_names().map(pg_ident).collect();
            format!(
                "COPY {} ({}) FROM STDIN WITH (FORMAT text, ENCODING 'UTF-8', DELIMITER E'\\t', NULL '\\N')",
                pg_table(schema.table()),
                columns.join(", ")
            )
        }
        BulkFormat::MySqlLoadData => {
            let columns: Vec<String> = schema.column_names().map(mysql_ident).collect();
            format!(
                "LOAD DATA LOCAL INFILE '' INTO TABLE {} CHARACTER SET UTF8 \
                 FIELDS TERMINATED BY '\\t' ENCLOSED BY '' ESCAPED BY '\\\\' \
                 LINES TERMINATED BY '\\n' ({})",
                mysql_table(schema.table()),
                columns.join(", ")
            )
        }
    }
}

fn is_plain_ident(name: &str) -> bool {
    let mut bytes = name.bytes();
    matches!(bytes.next(), Some(b'a'..=b'z' | b'_'))
        && bytes.all(|b| matches!(b, b'a'..=b'z' | b'0'..=b'9' | b'_'))
}

fn pg_ident(name: &str) -> String {
    if is_plain_ident(name) {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

/// `schema.table` is quoted per part.
fn pg_table(name: &str) -> String {
    name.split('.').map(pg_ident).collect::<Vec<_>>().join(".")
}

fn mysql_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

fn mysql_table(name: &str) -> String {
    name.split('.').map(mysql_ident).collect::<Vec<_>>().join(".")
}

/// Table and column list named by a header produced by [header_sql].
///
/// Used by targets that receive the header as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderTarget {
    pub table: String,
    pub columns: Vec<String>,
}

impl HeaderTarget {
    pub fn parse(format: BulkFormat, sql: &str) -> Option<Self> {
        let (table_part, rest) = match format {
            BulkFormat::PgCopyText => {
                let body = sql.strip_prefix("COPY ")?;
                let open = find_unquoted(body, " (")?;
                (&body[..open], &body[open + 1..])
            }
            BulkFormat::MySqlLoadData => {
                let body = sql
                    .strip_prefix("LOAD DATA LOCAL INFILE '' INTO TABLE ")?;
                let end = find_unquoted(body, " CHARACTER SET")?;
                let open = end + find_unquoted(&body[end..], " (")?;
                (&body[..end], &body[open + 1..])
            }
        };

        let close = closing_paren(rest)?;
        let columns = split_idents(&rest[1..close], ',')
            .into_iter()
            .map(|c| unquote(c.trim()))
            .collect();
        let table = split_idents(table_part, '.')
            .into_iter()
            .map(|p| unquote(p.trim()))
            .collect::<Vec<_>>()
            .join(".");

        Some(Self { table, columns })
    }
}

/// Byte offset of the first `pat` outside quoted identifiers.
fn find_unquoted(s: &str, pat: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (None, '"' | '`') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, _) if s[i..].starts_with(pat) => return Some(i),
            _ => {}
        }
    }
    None
}

/// Byte offset of the `)` matching the `(` that starts `s`.
fn closing_paren(s: &str) -> Option<usize> {
    find_unquoted(s, ")")
}

/// Split on `sep` outside of quoted identifiers.
fn split_idents(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match (quote, c) {
            (None, '"' | '`') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, c) if c == sep => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn unquote(ident: &str) -> String {
    for q in ['"', '`'] {
        if let Some(inner) = ident
            .strip_prefix(q)
            .and_then(|s| s.strip_suffix(q))
        {
            let doubled = format!("{q}{q}");
            return inner.replace(&doubled, &q.to_string());
        }
    }
    ident.to_string()
}

#[cfg(test)]
#[path = "sql_tests.rs"]
mod tests;
