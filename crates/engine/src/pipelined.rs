use std::thread::{self, Scope, ScopedJoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use log::{debug, error};

use crate::{Batch, BulkError, ContentWriter, Result, WriteProgress};

const WORKER_NAME: &str = "fleetload-writer";

/// Outcome of one background write: the inner writer's progress afterwards.
type Reply = Result<WriteProgress>;

/// The single batch currently owned by the worker.
#[derive(Debug, Clone, Copy)]
struct PendingWrite {
    seq: usize,
    records: usize,
}

/// Overlaps writing batch N with building batch N+1.
///
/// Wraps a [ContentWriter] running on one scoped worker thread. The handoff
/// is a single slot: a new batch is only submitted after the previous one
/// has been acknowledged, so writes never overlap or reorder. A failed
/// background write is kept in the reply slot and raised by the next
/// `write_content`, `wait_for_write` or `close`.
pub struct PipelinedContentWriter<'scope, W: ContentWriter + Send + 'scope> {
    batch_tx: Option<Sender<Batch>>,
    reply_rx: Receiver<Reply>,
    worker: Option<ScopedJoinHandle<'scope, W>>,
    pending: Option<PendingWrite>,
    progress: WriteProgress,
}

impl<'scope, W: ContentWriter + Send + 'scope> PipelinedContentWriter<'scope, W> {
    /// Move `inner` onto a worker thread bound to `scope`.
    pub fn spawn<'env>(scope: &'scope Scope<'scope, 'env>, inner: W) -> Result<Self> {
        // Rendezvous: the worker is always idle when a batch is offered.
        let (batch_tx, batch_rx) = channel::bounded::<Batch>(0);
        // One reply slot so the worker never waits on the producer.
        let (reply_tx, reply_rx) = channel::bounded::<Reply>(1);

        let progress = inner.progress();
        let worker = thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn_scoped(scope, move || worker_loop(inner, batch_rx, reply_tx))
            .map_err(|e| {
                error!("failed to spawn {WORKER_NAME}: {e}");
                BulkError::WorkerLost
            })?;

        Ok(Self {
            batch_tx: Some(batch_tx),
            reply_rx,
            worker: Some(worker),
            pending: None,
            progress,
        })
    }

    /// Sequence number of the batch being written, if any.
    pub fn in_flight(&self) -> Option<usize> {
        self.pending.map(|p| p.seq)
    }
}

fn worker_loop<W: ContentWriter>(
    mut writer: W,
    batch_rx: Receiver<Batch>,
    reply_tx: Sender<Reply>,
) -> W {
    // Ends when the producer drops its sender.
    for batch in batch_rx.iter() {
        let seq = batch.seq();
        let reply = writer.write_content(batch).map(|()| writer.progress());
        if reply_tx.send(reply).is_err() {
            debug!("producer gone before batch {seq} was acknowledged");
            break;
        }
    }
    writer
}

impl<'scope, W: ContentWriter + Send + 'scope> ContentWriter for PipelinedContentWriter<'scope, W> {
    fn write_content(&mut self, batch: Batch) -> Result<()> {
        // Backpressure: at most one batch in flight.
        self.wait_for_write()?;

        if batch.is_empty() {
            return Ok(());
        }

        let Some(batch_tx) = &self.batch_tx else {
            return Err(BulkError::WorkerLost);
        };

        let pending = PendingWrite {
            seq: batch.seq(),
            records: batch.records(),
        };
        batch_tx.send(batch).map_err(|_| BulkError::WorkerLost)?;
        self.pending = Some(pending);

        debug!(
            "batch {} ({} records) handed to {WORKER_NAME}",
            pending.seq, pending.records
        );
        Ok(())
    }

    fn wait_for_write(&mut self) -> Result<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };

        match self.reply_rx.recv() {
            Ok(Ok(progress)) => {
                self.progress = progress;
                debug!("batch {} acknowledged", pending.seq);
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            // Sender dropped without replying: the worker panicked.
            Err(_) => Err(BulkError::WorkerLost),
        }
    }

    fn progress(&self) -> WriteProgress {
        self.progress
    }

    fn close(&mut self) -> Result<()> {
        let waited = self.wait_for_write();

        // Stops the worker loop.
        self.batch_tx = None;

        let Some(worker) = self.worker.take() else {
            return waited;
        };

        let closed = match worker.join() {
            Ok(mut inner) => inner.close(),
            Err(_) => Err(BulkError::WorkerLost),
        };

        waited.and(closed)
    }
}

#[cfg(test)]
#[path = "pipelined_tests.rs"]
mod tests;
