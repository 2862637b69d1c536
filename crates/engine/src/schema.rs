use std::fmt;

use crate::{BulkError, FieldError, Result, Value};

/// Pulls one column value out of a record.
pub type Extractor<T> = Box<dyn Fn(&T) -> Result<Value, FieldError> + Send + Sync>;

pub struct ColumnDescriptor<T> {
    name: String,
    extractor: Extractor<T>,
}

impl<T> ColumnDescriptor<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extract(&self, record: &T) -> Result<Value, FieldError> {
        (self.extractor)(record)
    }
}

/// Ordered column list for one record type, built once before any batch.
///
/// ```ignore
/// let schema = SchemaDescriptor::builder("employee")
///     .column("id", |e: &Employee| e.id)
///     .column("name", |e: &Employee| e.name.clone())
///     .build()?;
/// ```
pub struct SchemaDescriptor<T> {
    table: String,
    columns: Vec<ColumnDescriptor<T>>,
}

impl<T> SchemaDescriptor<T> {
    pub fn builder(table: impl Into<String>) -> SchemaBuilder<T> {
        SchemaBuilder {
            table: table.into(),
            columns: Vec::new(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnDescriptor<T>] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(ColumnDescriptor::name)
    }

    /// Extract the value of column `index` from `record`.
    pub fn extract(&self, record: &T, index: usize) -> Result<Value, FieldError> {
        let column = self.columns.get(index).ok_or_else(|| {
            FieldError::new(format!(
                "`{}` has {} columns, no column {index}",
                self.table,
                self.columns.len()
            ))
        })?;
        column.extract(record)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<T> fmt::Debug for SchemaDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaDescriptor")
            .field("table", &self.table)
            .field("columns", &self.column_names().collect::<Vec<_>>())
            .finish()
    }
}

pub struct SchemaBuilder<T> {
    table: String,
    columns: Vec<ColumnDescriptor<T>>,
}

impl<T> SchemaBuilder<T> {
    /// Column whose value can always be produced.
    pub fn column<F, V>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&T) -> V + Send + Sync + 'static,
        V: Into<Value>,
    {
        self.try_column(name, move |record| Ok(f(record).into()))
    }

    /// Column whose extraction may fail, e.g. a checked conversion.
    pub fn try_column<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&T) -> Result<Value, FieldError> + Send + Sync + 'static,
    {
        self.columns.push(ColumnDescriptor {
            name: name.into(),
            extractor: Box::new(f),
        });
        self
    }

    pub fn build(self) -> Result<SchemaDescriptor<T>> {
        if self.table.trim().is_empty() {
            return Err(BulkError::Schema("table name is empty".into()));
        }
        if self.columns.is_empty() {
            return Err(BulkError::Schema(format!(
                "table `{}` has no columns",
                self.table
            )));
        }

        for (i, col) in self.columns.iter().enumerate() {
            if col.name.trim().is_empty() {
                return Err(BulkError::Schema(format!(
                    "column {i} of `{}` has an empty name",
                    self.table
                )));
            }
            if self.columns[..i].iter().any(|c| c.name == col.name) {
                return Err(BulkError::Schema(format!(
                    "duplicate column `{}` in `{}`",
                    col.name, self.table
                )));
            }
        }

        Ok(SchemaDescriptor {
            table: self.table,
            columns: self.columns,
        })
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
