use super::*;
use crate::{
    ErrorKind,
    testing::{Event, FakeChannel, Journal, batches},
};

#[test]
fn writes_batches_in_order_and_tracks_progress() {
    let journal = Journal::default();
    let mut writer = ChannelContentWriter::new(FakeChannel::new(journal.clone()), "COPY t (n)");

    for batch in batches(3) {
        writer.write_content(batch).unwrap();
    }

    assert_eq!(journal.payloads(), [b"1\n".to_vec(), b"2\n".to_vec(), b"3\n".to_vec()]);
    let progress = writer.progress();
    assert_eq!(progress.batches, 3);
    assert_eq!(progress.records, 3);
    assert_eq!(progress.bytes, 6);
    assert_eq!(progress.rows_affected, 3);
}

#[test]
fn empty_batches_are_not_sent() {
    let journal = Journal::default();
    let mut writer = ChannelContentWriter::new(FakeChannel::new(journal.clone()), "COPY t (n)");

    writer.write_content(Batch::default()).unwrap();

    assert!(journal.events().is_empty());
    assert_eq!(writer.progress(), WriteProgress::default());
}

#[test]
fn driver_failure_names_batch_and_prior_progress() {
    let journal = Journal::default();
    let mut channel = FakeChannel::new(journal);
    channel.fail_on = Some(2);
    let mut writer = ChannelContentWriter::new(channel, "COPY t (n)");

    let mut batches = batches(3).into_iter();
    writer.write_content(batches.next().unwrap()).unwrap();
    let err = writer
        .write_content(batches.next().unwrap())
        .expect_err("second send fails");

    assert_eq!(err.kind(), ErrorKind::DatabaseWrite);
    assert_eq!(err.batches_written(), Some(1));
    let driver = err.driver_error().expect("driver detail");
    assert_eq!(driver.code.as_deref(), Some("23503"));
    assert!(err.to_string().contains("batch 2"), "{err}");
}

#[test]
fn skipped_rows_fail_only_when_strict() {
    for strict in [false, true] {
        let mut channel = FakeChannel::new(Journal::default());
        channel.skip_rows = 1;
        let mut writer = ChannelContentWriter::new(channel, "LOAD DATA").error_on_missing_row(strict);

        let result = writer.write_content(batches(1).remove(0));

        if strict {
            let err = result.expect_err("strict mode rejects skipped rows");
            assert_eq!(
                err.driver_error().map(|d| d.kind),
                Some(DriverErrorKind::MissingReference)
            );
            assert_eq!(writer.progress().batches, 0);
        } else {
            result.expect("lenient mode accepts skipped rows");
            assert_eq!(writer.progress().batches, 1);
            assert_eq!(writer.progress().rows_affected, 0);
        }
    }
}

#[test]
fn close_releases_channel_once() {
    let journal = Journal::default();
    let mut writer = ChannelContentWriter::new(FakeChannel::new(journal.clone()), "COPY t (n)");

    writer.close().unwrap();
    writer.close().unwrap();

    assert_eq!(journal.count(&Event::ChannelClosed), 1);
}
