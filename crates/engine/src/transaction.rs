use log::{debug, warn};

use crate::{BulkError, Connection, InsertConfig, Result, WriteProgress};

/// How the insert operation ended, as seen by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// Owns commit/rollback decisions on the connection for one insert operation.
pub trait TransactionPolicy {
    /// Latest acknowledged progress of the writer.
    fn observe(&mut self, progress: WriteProgress);

    /// Every batch counted in `progress` has been acknowledged and passed
    /// the writer's checks. Called while no batch is in flight.
    fn settle_batches(&mut self, progress: WriteProgress) -> Result<()> {
        self.observe(progress);
        Ok(())
    }

    fn batches_written(&self) -> usize;

    /// Settle the transaction. Called exactly once per insert operation.
    fn close(self: Box<Self>, outcome: Outcome) -> Result<()>;
}

/// Pick the policy selected by `config` and prepare the connection for it.
pub fn acquire<'c, C: Connection>(
    conn: &'c mut C,
    config: &InsertConfig,
) -> Result<Box<dyn TransactionPolicy + 'c>> {
    if config.long_transaction {
        Ok(Box::new(LongTransactionPolicy::begin(
            conn,
            config.commit_on_close,
        )?))
    } else {
        Ok(Box::new(AutocommitPolicy::begin(
            conn,
            config.error_on_missing_row,
        )?))
    }
}

/// Every batch is its own transaction.
///
/// A failure on batch k leaves batches before k durable and nothing of
/// batch k or later. Plain mode relies on the connection's autocommit and
/// the statement atomicity of the database. With `per_batch` set the policy
/// turns autocommit off and commits each batch only once the writer has
/// accepted its acknowledgement, so a batch rejected after the server ran
/// it (skipped rows under `error_on_missing_row`) is rolled back.
///
/// A connection in manual mode is switched to autocommit first, which
/// commits any transaction the caller left open on it. The previous mode
/// is restored on close.
pub struct AutocommitPolicy<'c, C: Connection> {
    conn: &'c mut C,
    previous: bool,
    per_batch: bool,
    batches: usize,
    committed: usize,
    settled: bool,
}

impl<'c, C: Connection> AutocommitPolicy<'c, C> {
    pub fn begin(conn: &'c mut C, per_batch: bool) -> Result<Self> {
        let previous = conn.autocommit();
        if !previous {
            conn.set_autocommit(true).map_err(BulkError::Transaction)?;
        }
        if per_batch {
            conn.set_autocommit(false).map_err(BulkError::Transaction)?;
        }
        Ok(Self {
            conn,
            previous,
            per_batch,
            batches: 0,
            committed: 0,
            settled: false,
        })
    }

    fn restore_autocommit(&mut self) -> Result<()> {
        if self.conn.autocommit() != self.previous {
            self.conn
                .set_autocommit(self.previous)
                .map_err(BulkError::Transaction)?;
        }
        Ok(())
    }
}

impl<C: Connection> TransactionPolicy for AutocommitPolicy<'_, C> {
    fn observe(&mut self, progress: WriteProgress) {
        self.batches = progress.batches;
    }

    fn settle_batches(&mut self, progress: WriteProgress) -> Result<()> {
        self.observe(progress);
        if !self.per_batch || self.batches == self.committed {
            return Ok(());
        }
        debug!("committing batch {}", self.batches);
        self.conn.commit().map_err(BulkError::Transaction)?;
        self.committed = self.batches;
        Ok(())
    }

    fn batches_written(&self) -> usize {
        self.batches
    }

    fn close(mut self: Box<Self>, outcome: Outcome) -> Result<()> {
        self.settled = true;
        debug!(
            "autocommit policy closing after {} batches ({outcome:?})",
            self.batches
        );
        if self.per_batch && outcome == Outcome::Failure {
            debug!("rolling back the batch after {}", self.committed);
            if let Err(e) = self.conn.rollback() {
                self.restore_autocommit()?;
                return Err(BulkError::Transaction(e));
            }
        }
        self.restore_autocommit()
    }
}

impl<C: Connection> Drop for AutocommitPolicy<'_, C> {
    fn drop(&mut self) {
        if self.settled || !self.per_batch {
            return;
        }
        warn!("per-batch transaction dropped without close; rolling back");
        if let Err(e) = self.conn.rollback() {
            warn!("rollback on drop failed: {e}");
        }
    }
}

/// The whole insert operation runs inside one explicit transaction.
///
/// Failure always rolls back. On success the transaction is committed when
/// `commit_on_close` is set, otherwise it stays open for the caller.
pub struct LongTransactionPolicy<'c, C: Connection> {
    conn: &'c mut C,
    previous: bool,
    commit_on_close: bool,
    batches: usize,
    settled: bool,
}

impl<'c, C: Connection> LongTransactionPolicy<'c, C> {
    pub fn begin(conn: &'c mut C, commit_on_close: bool) -> Result<Self> {
        let previous = conn.autocommit();
        if previous {
            conn.set_autocommit(false).map_err(BulkError::Transaction)?;
        }
        Ok(Self {
            conn,
            previous,
            commit_on_close,
            batches: 0,
            settled: false,
        })
    }

    fn restore_autocommit(&mut self) -> Result<()> {
        if self.previous {
            self.conn
                .set_autocommit(true)
                .map_err(BulkError::Transaction)?;
        }
        Ok(())
    }
}

impl<C: Connection> TransactionPolicy for LongTransactionPolicy<'_, C> {
    fn observe(&mut self, progress: WriteProgress) {
        self.batches = progress.batches;
    }

    fn batches_written(&self) -> usize {
        self.batches
    }

    fn close(mut self: Box<Self>, outcome: Outcome) -> Result<()> {
        self.settled = true;

        match outcome {
            Outcome::Failure => {
                debug!("rolling back {} written batches", self.batches);
                self.conn.rollback().map_err(BulkError::Transaction)?;
                self.restore_autocommit()
            }
            Outcome::Success if self.commit_on_close => {
                debug!("committing {} batches", self.batches);
                if let Err(e) = self.conn.commit() {
                    if let Err(rb) = self.conn.rollback() {
                        warn!("rollback after failed commit failed: {rb}");
                    }
                    self.restore_autocommit()?;
                    return Err(BulkError::Transaction(e));
                }
                self.restore_autocommit()
            }
            Outcome::Success => {
                debug!(
                    "leaving transaction with {} batches open for the caller",
                    self.batches
                );
                Ok(())
            }
        }
    }
}

impl<C: Connection> Drop for LongTransactionPolicy<'_, C> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        warn!("long transaction dropped without close; rolling back");
        if let Err(e) = self.conn.rollback() {
            warn!("rollback on drop failed: {e}");
        }
    }
}

#[cfg(test)]
#[path = "transaction_tests.rs"]
mod tests;
