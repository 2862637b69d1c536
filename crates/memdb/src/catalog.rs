use fleetload_engine::{BulkFormat, DriverError, DriverErrorKind, HeaderTarget, LoadAck, Value};
use hashbrown::{HashMap, HashSet};
use log::{debug, warn};

use crate::{ColumnType, parse_payload};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
}

/// `column` must match the primary key of table `references` (or be null).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: String,
    pub references: String,
}

/// Table declaration.
///
/// ```ignore
/// let employee = TableDef::new("employee")
///     .column("id", ColumnType::Int)
///     .column("manager_id", ColumnType::Int)
///     .primary_key("id")
///     .foreign_key("manager_id", "employee");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    name: String,
    columns: Vec<ColumnDef>,
    primary_key: Option<String>,
    foreign_keys: Vec<ForeignKey>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: None,
            foreign_keys: Vec::new(),
        }
    }

    /// Add a nullable column.
    pub fn column(mut self, name: impl Into<String>, ty: ColumnType) -> Self {
        self.columns.push(ColumnDef {
            name: name.into(),
            ty,
            nullable: true,
        });
        self
    }

    /// Add a `NOT NULL` column.
    pub fn required(mut self, name: impl Into<String>, ty: ColumnType) -> Self {
        self.columns.push(ColumnDef {
            name: name.into(),
            ty,
            nullable: false,
        });
        self
    }

    /// The key column becomes `NOT NULL`.
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        if let Some(def) = self.columns.iter_mut().find(|c| c.name == column) {
            def.nullable = false;
        }
        self.primary_key = Some(column);
        self
    }

    pub fn foreign_key(mut self, column: impl Into<String>, references: impl Into<String>) -> Self {
        self.foreign_keys.push(ForeignKey {
            column: column.into(),
            references: references.into(),
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn primary_key_index(&self) -> Option<usize> {
        self.primary_key.as_deref().and_then(|pk| self.column_index(pk))
    }

    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }
}

/// Hashable identity of a key column value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Key {
    Int(i64),
    Text(String),
    Bytes(Vec<u8>),
    Other(String),
}

impl Key {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Int(i) => Some(Key::Int(*i)),
            Value::Text(s) => Some(Key::Text(s.clone())),
            Value::Bytes(b) => Some(Key::Bytes(b.clone())),
            Value::Float(f) => Some(Key::Other(f.to_bits().to_string())),
            other => Some(Key::Other(format!("{other:?}"))),
        }
    }
}

/// Rows of one table plus the primary keys they hold.
#[derive(Debug, Default, Clone)]
pub(crate) struct Rows {
    rows: Vec<Vec<Value>>,
    keys: HashSet<Key>,
}

impl Rows {
    fn len(&self) -> usize {
        self.rows.len()
    }

    fn push(&mut self, row: Vec<Value>, key: Option<Key>) {
        if let Some(key) = key {
            self.keys.insert(key);
        }
        self.rows.push(row);
    }

    fn append(&mut self, other: Rows) {
        self.keys.extend(other.keys);
        self.rows.extend(other.rows);
    }
}

/// Transaction state of one connection.
#[derive(Debug)]
pub(crate) struct Session {
    pub(crate) autocommit: bool,
    staged: HashMap<String, Rows>,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self {
            autocommit: true,
            staged: HashMap::new(),
        }
    }

    pub(crate) fn has_staged(&self) -> bool {
        self.staged.values().any(|r| r.len() > 0)
    }

    pub(crate) fn discard(&mut self) {
        let rows: usize = self.staged.values().map(Rows::len).sum();
        if rows > 0 {
            debug!("discarding {rows} uncommitted rows");
        }
        self.staged.clear();
    }

    pub(crate) fn staged_count(&self, table: &str) -> usize {
        self.staged.get(table).map_or(0, Rows::len)
    }
}

struct Table {
    def: TableDef,
    data: Rows,
}

/// Committed state of a [crate::MemDatabase].
#[derive(Default)]
pub(crate) struct Catalog {
    tables: HashMap<String, Table>,
}

impl Catalog {
    pub(crate) fn create_table(&mut self, def: TableDef) -> Result<(), DriverError> {
        let ddl = |msg: String| DriverError::new(DriverErrorKind::Other, msg);

        if self.tables.contains_key(def.name()) {
            return Err(ddl(format!("table `{}` already exists", def.name())));
        }
        if def.columns.is_empty() {
            return Err(ddl(format!("table `{}` has no columns", def.name())));
        }
        if let Some(pk) = &def.primary_key {
            if def.column_index(pk).is_none() {
                return Err(ddl(format!("primary key column `{pk}` does not exist")));
            }
        }
        for fk in &def.foreign_keys {
            if def.column_index(&fk.column).is_none() {
                return Err(ddl(format!("foreign key column `{}` does not exist", fk.column)));
            }
            let has_key = if fk.references == def.name {
                def.primary_key.is_some()
            } else {
                self.tables
                    .get(&fk.references)
                    .is_some_and(|t| t.def.primary_key.is_some())
            };
            if !has_key {
                return Err(ddl(format!(
                    "referenced table `{}` does not exist or has no primary key",
                    fk.references
                )));
            }
        }

        debug!("created table `{}`", def.name());
        self.tables.insert(
            def.name.clone(),
            Table {
                def,
                data: Rows::default(),
            },
        );
        Ok(())
    }

    pub(crate) fn def(&self, table: &str) -> Option<&TableDef> {
        self.tables.get(table).map(|t| &t.def)
    }

    pub(crate) fn row_count(&self, table: &str) -> Option<usize> {
        self.tables.get(table).map(|t| t.data.len())
    }

    pub(crate) fn rows(&self, table: &str) -> Option<Vec<Vec<Value>>> {
        self.tables.get(table).map(|t| t.data.rows.clone())
    }

    /// Run one bulk statement inside `session`.
    ///
    /// The statement is all-or-nothing with respect to errors; rows it
    /// accepts are staged in the session and still need a commit.
    pub(crate) fn load(
        &self,
        session: &mut Session,
        format: BulkFormat,
        target: &HeaderTarget,
        payload: &[u8],
    ) -> Result<LoadAck, DriverError> {
        let codes = Codes::of(format);
        let table = self.tables.get(&target.table).ok_or_else(|| {
            DriverError::new(
                DriverErrorKind::Other,
                format!("table `{}` does not exist", target.table),
            )
            .with_code(codes.undefined_table)
        })?;
        let def = &table.def;

        let positions = target
            .columns
            .iter()
            .map(|name| {
                def.column_index(name).ok_or_else(|| {
                    DriverError::new(
                        DriverErrorKind::Other,
                        format!("column `{name}` of `{}` does not exist", def.name),
                    )
                    .with_code(codes.undefined_column)
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let raw_rows = parse_payload(format, payload).map_err(|e| {
            DriverError::new(DriverErrorKind::TypeMismatch, e.to_string()).with_code(codes.bad_value)
        })?;

        let pk = def.primary_key_index();
        let staged = session.staged.get(&def.name);
        let mut accepted = Rows::default();
        let mut skipped = 0;

        for (i, raw) in raw_rows.into_iter().enumerate() {
            let line = i + 1;
            if raw.len() != positions.len() {
                return Err(DriverError::new(
                    DriverErrorKind::TypeMismatch,
                    format!("line {line}: expected {} fields, got {}", positions.len(), raw.len()),
                )
                .with_code(codes.bad_value));
            }

            let mut row = vec![Value::Null; def.columns.len()];
            for (field, &pos) in raw.into_iter().zip(&positions) {
                if let Some(bytes) = field {
                    let col = &def.columns[pos];
                    row[pos] = col.ty.decode(format, &bytes).map_err(|reason| {
                        DriverError::new(
                            DriverErrorKind::TypeMismatch,
                            format!("line {line}, column `{}`: {reason}", col.name),
                        )
                        .with_code(codes.bad_value)
                    })?;
                }
            }

            if let Some(col) = def.columns.iter().zip(&row).find(|(c, v)| !c.nullable && v.is_null()) {
                return Err(DriverError::new(
                    DriverErrorKind::ConstraintViolation,
                    format!("line {line}: null value in column `{}`", col.0.name),
                )
                .with_code(codes.not_null));
            }

            if let Some(fk) = self.dangling_reference(def, &row, session, &accepted) {
                let message = format!(
                    "line {line}: `{}` references a missing row of `{}`",
                    fk.column, fk.references
                );
                match format {
                    BulkFormat::PgCopyText => {
                        return Err(DriverError::new(DriverErrorKind::MissingReference, message)
                            .with_code(codes.foreign_key));
                    }
                    // LOCAL loads downgrade row errors to warnings.
                    BulkFormat::MySqlLoadData => {
                        warn!("skipped {message}");
                        skipped += 1;
                        continue;
                    }
                }
            }

            let key = pk.and_then(|i| Key::of(&row[i]));
            if let Some(key) = &key {
                let taken = table.data.keys.contains(key)
                    || staged.is_some_and(|s| s.keys.contains(key))
                    || accepted.keys.contains(key);
                if taken {
                    return Err(DriverError::new(
                        DriverErrorKind::ConstraintViolation,
                        format!("line {line}: duplicate primary key {key:?} in `{}`", def.name),
                    )
                    .with_code(codes.unique));
                }
            }
            accepted.push(row, key);
        }

        let rows_affected = accepted.len() as u64;
        debug!(
            "loaded {rows_affected} rows into `{}` ({skipped} skipped)",
            def.name
        );
        session
            .staged
            .entry(def.name.clone())
            .or_default()
            .append(accepted);
        Ok(LoadAck {
            rows_affected,
            warnings: skipped,
        })
    }

    /// First foreign key of `row` whose referenced row is not visible.
    fn dangling_reference<'d>(
        &self,
        def: &'d TableDef,
        row: &[Value],
        session: &Session,
        accepted: &Rows,
    ) -> Option<&'d ForeignKey> {
        def.foreign_keys.iter().find(|fk| {
            let Some(key) = def.column_index(&fk.column).and_then(|i| Key::of(&row[i])) else {
                return false;
            };
            let committed = self
                .tables
                .get(&fk.references)
                .is_some_and(|t| t.data.keys.contains(&key));
            let staged = session
                .staged
                .get(&fk.references)
                .is_some_and(|r| r.keys.contains(&key));
            let same_statement = fk.references == def.name && accepted.keys.contains(&key);
            !(committed || staged || same_statement)
        })
    }

    /// Publish everything staged in `session`.
    ///
    /// A key committed by another connection in the meantime aborts the
    /// whole transaction.
    pub(crate) fn commit(&mut self, session: &mut Session) -> Result<(), DriverError> {
        let conflict = session.staged.iter().find_map(|(name, rows)| {
            let table = self.tables.get(name)?;
            rows.keys
                .iter()
                .find(|k| table.data.keys.contains(*k))
                .map(|key| format!("commit failed: duplicate primary key {key:?} in `{name}`"))
        });
        if let Some(message) = conflict {
            session.discard();
            return Err(DriverError::new(DriverErrorKind::ConstraintViolation, message));
        }

        for (name, rows) in session.staged.drain() {
            if let Some(table) = self.tables.get_mut(&name) {
                debug!("committing {} rows into `{name}`", rows.len());
                table.data.append(rows);
            }
        }
        Ok(())
    }
}

/// Native error codes a real server would report.
struct Codes {
    undefined_table: &'static str,
    undefined_column: &'static str,
    bad_value: &'static str,
    not_null: &'static str,
    foreign_key: &'static str,
    unique: &'static str,
}

impl Codes {
    fn of(format: BulkFormat) -> Self {
        match format {
            BulkFormat::PgCopyText => Codes {
                undefined_table: "42P01",
                undefined_column: "42703",
                bad_value: "22P02",
                not_null: "23502",
                foreign_key: "23503",
                unique: "23505",
            },
            BulkFormat::MySqlLoadData => Codes {
                undefined_table: "1146",
                undefined_column: "1054",
                bad_value: "1366",
                not_null: "1048",
                foreign_key: "1452",
                unique: "1062",
            },
        }
    }
}
