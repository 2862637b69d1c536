//! Scripted connection and channel shared by the unit tests.

use std::{
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use crate::{
    BulkChannel, BulkChannelProvider, BulkFormat, Connection, DriverError, DriverErrorKind,
    LoadAck,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    SendStart(usize),
    SendEnd(usize),
    ChannelClosed,
    SetAutocommit(bool),
    Commit,
    Rollback,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Journal {
    inner: Arc<Mutex<JournalState>>,
}

#[derive(Debug, Default)]
struct JournalState {
    events: Vec<Event>,
    payloads: Vec<Vec<u8>>,
}

impl Journal {
    fn push(&self, event: Event) {
        self.inner.lock().unwrap().events.push(event);
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.inner.lock().unwrap().events.clone()
    }

    pub(crate) fn payloads(&self) -> Vec<Vec<u8>> {
        self.inner.lock().unwrap().payloads.clone()
    }

    pub(crate) fn count(&self, event: &Event) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }

    /// Every send finished before the next one started.
    pub(crate) fn assert_sends_serialized(&self) {
        let mut open: Option<usize> = None;
        for event in self.events() {
            match event {
                Event::SendStart(n) => {
                    assert_eq!(open, None, "send {n} started while {open:?} in flight");
                    open = Some(n);
                }
                Event::SendEnd(n) => {
                    assert_eq!(open, Some(n), "send {n} ended out of order");
                    open = None;
                }
                _ => {}
            }
        }
    }
}

pub(crate) struct FakeChannel {
    journal: Journal,
    sends: usize,
    pub(crate) fail_on: Option<usize>,
    pub(crate) skip_rows: u64,
    /// Limits `skip_rows` to one send; every send when unset.
    pub(crate) skip_on: Option<usize>,
    pub(crate) delay: Duration,
}

impl FakeChannel {
    pub(crate) fn new(journal: Journal) -> Self {
        Self {
            journal,
            sends: 0,
            fail_on: None,
            skip_rows: 0,
            skip_on: None,
            delay: Duration::ZERO,
        }
    }
}

impl BulkChannel for FakeChannel {
    fn send(&mut self, _header: &str, payload: &[u8]) -> Result<LoadAck, DriverError> {
        self.sends += 1;
        let n = self.sends;
        self.journal.push(Event::SendStart(n));
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }

        let result = if self.fail_on == Some(n) {
            Err(DriverError::new(
                DriverErrorKind::MissingReference,
                format!("fk violation in send {n}"),
            )
            .with_code("23503"))
        } else {
            self.journal
                .inner
                .lock()
                .unwrap()
                .payloads
                .push(payload.to_vec());
            let lines = payload.iter().filter(|b| **b == b'\n').count() as u64;
            let skipped = if self.skip_on.is_none_or(|s| s == n) {
                self.skip_rows
            } else {
                0
            };
            Ok(LoadAck {
                rows_affected: lines.saturating_sub(skipped),
                warnings: skipped,
            })
        };

        self.journal.push(Event::SendEnd(n));
        result
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.journal.push(Event::ChannelClosed);
        Ok(())
    }
}

pub(crate) struct FakeConnection {
    pub(crate) journal: Journal,
    pub(crate) autocommit: bool,
    pub(crate) bulk_capable: bool,
    pub(crate) fail_on: Option<usize>,
    /// Send on which the channel reports one skipped row.
    pub(crate) skip_on: Option<usize>,
    pub(crate) fail_commit: bool,
    pub(crate) delay: Duration,
}

impl FakeConnection {
    pub(crate) fn new() -> Self {
        Self {
            journal: Journal::default(),
            autocommit: true,
            bulk_capable: true,
            fail_on: None,
            skip_on: None,
            fail_commit: false,
            delay: Duration::ZERO,
        }
    }
}

impl Connection for FakeConnection {
    fn autocommit(&self) -> bool {
        self.autocommit
    }

    fn set_autocommit(&mut self, enabled: bool) -> Result<(), DriverError> {
        self.journal.push(Event::SetAutocommit(enabled));
        self.autocommit = enabled;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        if self.fail_commit {
            return Err(DriverError::new(DriverErrorKind::Other, "commit refused"));
        }
        self.journal.push(Event::Commit);
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        self.journal.push(Event::Rollback);
        Ok(())
    }
}

impl BulkChannelProvider for FakeConnection {
    type Channel = FakeChannel;

    fn bulk_format(&self) -> BulkFormat {
        BulkFormat::PgCopyText
    }

    fn open_bulk_channel(&mut self) -> Result<FakeChannel, DriverError> {
        if !self.bulk_capable {
            return Err(DriverError::new(
                DriverErrorKind::Unsupported,
                "not a bulk-capable connection",
            ));
        }
        let mut channel = FakeChannel::new(self.journal.clone());
        channel.fail_on = self.fail_on;
        if self.skip_on.is_some() {
            channel.skip_rows = 1;
            channel.skip_on = self.skip_on;
        }
        channel.delay = self.delay;
        Ok(channel)
    }
}

/// Build `n` single-record batches, numbered from 1.
pub(crate) fn batches(n: usize) -> Vec<crate::Batch> {
    use crate::{ContentBuilder, SchemaDescriptor};

    let schema = SchemaDescriptor::builder("t")
        .column("n", |v: &usize| *v as i64)
        .build()
        .map(Arc::new)
        .unwrap();
    let mut builder = ContentBuilder::new(schema, BulkFormat::PgCopyText);

    (1..=n)
        .map(|i| {
            builder.add(&i).unwrap();
            builder.take_content()
        })
        .collect()
}
