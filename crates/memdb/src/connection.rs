use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fleetload_engine::{
    BulkChannel, BulkChannelProvider, BulkFormat, Connection, DriverError, DriverErrorKind,
    HeaderTarget, LoadAck, Value,
};
use log::debug;

use crate::{
    TableDef,
    catalog::{Catalog, Session},
};

/// Poisoning is ignored: statements only mutate state after validating.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared in-memory database.
///
/// Clones share the same catalog. Each [MemConnection] has its own
/// transaction; readers on the database only see committed rows.
#[derive(Clone, Default)]
pub struct MemDatabase {
    catalog: Arc<Mutex<Catalog>>,
}

impl MemDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_table(&self, def: TableDef) -> Result<(), DriverError> {
        lock(&self.catalog).create_table(def)
    }

    pub fn table(&self, name: &str) -> Option<TableDef> {
        lock(&self.catalog).def(name).cloned()
    }

    /// Connection whose bulk channel speaks `format`.
    pub fn connect(&self, format: BulkFormat) -> MemConnection {
        MemConnection::new(self.clone(), format, true)
    }

    /// Connection refusing to open a bulk channel, like a MySQL session
    /// with `local_infile` disabled.
    pub fn connect_without_bulk_load(&self, format: BulkFormat) -> MemConnection {
        MemConnection::new(self.clone(), format, false)
    }

    /// Committed rows of `table`; `None` when it does not exist.
    pub fn row_count(&self, table: &str) -> Option<usize> {
        lock(&self.catalog).row_count(table)
    }

    pub fn rows(&self, table: &str) -> Option<Vec<Vec<Value>>> {
        lock(&self.catalog).rows(table)
    }
}

pub struct MemConnection {
    db: MemDatabase,
    session: Arc<Mutex<Session>>,
    format: BulkFormat,
    bulk_load: bool,
}

impl MemConnection {
    fn new(db: MemDatabase, format: BulkFormat, bulk_load: bool) -> Self {
        Self {
            db,
            session: Arc::new(Mutex::new(Session::new())),
            format,
            bulk_load,
        }
    }

    /// Rows of `table` visible to this connection, uncommitted ones included.
    pub fn row_count(&self, table: &str) -> Option<usize> {
        let session = lock(&self.session);
        let committed = self.db.row_count(table)?;
        Some(committed + session.staged_count(table))
    }

    pub fn in_transaction(&self) -> bool {
        lock(&self.session).has_staged()
    }
}

impl Connection for MemConnection {
    fn autocommit(&self) -> bool {
        lock(&self.session).autocommit
    }

    /// Switching autocommit on commits the open transaction.
    fn set_autocommit(&mut self, enabled: bool) -> Result<(), DriverError> {
        let mut session = lock(&self.session);
        if enabled && !session.autocommit && session.has_staged() {
            lock(&self.db.catalog).commit(&mut session)?;
        }
        session.autocommit = enabled;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        let mut session = lock(&self.session);
        lock(&self.db.catalog).commit(&mut session)
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        lock(&self.session).discard();
        Ok(())
    }
}

impl BulkChannelProvider for MemConnection {
    type Channel = MemChannel;

    fn bulk_format(&self) -> BulkFormat {
        self.format
    }

    fn open_bulk_channel(&mut self) -> Result<MemChannel, DriverError> {
        if !self.bulk_load {
            let code = match self.format {
                BulkFormat::PgCopyText => "0A000",
                BulkFormat::MySqlLoadData => "1148",
            };
            return Err(DriverError::new(
                DriverErrorKind::Unsupported,
                format!("{} is disabled on this connection", self.format.name()),
            )
            .with_code(code));
        }

        debug!("opened {} channel", self.format.name());
        Ok(MemChannel {
            db: self.db.clone(),
            session: Arc::clone(&self.session),
            format: self.format,
            closed: false,
        })
    }
}

/// Bulk endpoint bound to the session of the connection that opened it.
pub struct MemChannel {
    db: MemDatabase,
    session: Arc<Mutex<Session>>,
    format: BulkFormat,
    closed: bool,
}

impl BulkChannel for MemChannel {
    fn send(&mut self, header: &str, payload: &[u8]) -> Result<LoadAck, DriverError> {
        if self.closed {
            return Err(DriverError::new(DriverErrorKind::Other, "channel is closed"));
        }
        let target = HeaderTarget::parse(self.format, header).ok_or_else(|| {
            DriverError::new(
                DriverErrorKind::Other,
                format!("syntax error in bulk statement: {header}"),
            )
        })?;

        let mut session = lock(&self.session);
        let mut catalog = lock(&self.db.catalog);
        let ack = catalog.load(&mut session, self.format, &target, payload)?;
        if session.autocommit {
            catalog.commit(&mut session)?;
        }
        Ok(ack)
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
