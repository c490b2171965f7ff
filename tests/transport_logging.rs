//! Warnings emitted through the `log` facade.

use std::time::Duration;

use gt8004::test_utils::{RecordingSender, entry};
use gt8004::{FlushOutcome, TransportBuilder};
use logtest::Logger;

fn drain(logger: &mut Logger) -> Vec<(log::Level, String)> {
    let mut records = Vec::new();
    while let Some(record) = logger.pop() {
        records.push((record.level(), record.args().to_string()));
    }
    records
}

fn has_warning(records: &[(log::Level, String)], needle: &str) -> bool {
    records
        .iter()
        .any(|(level, msg)| *level == log::Level::Warn && msg.contains(needle))
}

fn builder() -> TransportBuilder {
    TransportBuilder::new()
        .with_ingest_url("http://x/ingest")
        .with_agent_id("a")
        .with_api_key("k")
        .with_warn_interval(Duration::from_secs(60))
}

fn failed_send_and_open_breaker_are_warned(logger: &mut Logger) {
    drain(logger);

    let sender = RecordingSender::failing();
    let transport = builder()
        .with_failure_threshold(1)
        .build_with_sender(sender.clone())
        .expect("transport");
    transport.add(entry("r1"));
    assert_eq!(transport.flush(), FlushOutcome::Requeued(1));

    let records = drain(logger);
    assert!(has_warning(&records, "failed to send 1 batches"), "{records:?}");
    assert!(has_warning(&records, "circuit breaker open"), "{records:?}");
    assert!(has_warning(&records, "status 503"), "{records:?}");
}

fn repeated_failures_are_rate_limited(logger: &mut Logger) {
    drain(logger);

    let sender = RecordingSender::failing();
    let transport = builder()
        .with_failure_threshold(100)
        .build_with_sender(sender.clone())
        .expect("transport");
    transport.add(entry("r1"));
    for _ in 0..3 {
        assert_eq!(transport.flush(), FlushOutcome::Requeued(1));
    }
    let records = drain(logger);
    let failures = records
        .iter()
        .filter(|(_, msg)| msg.contains("failed to send"))
        .count();
    assert_eq!(failures, 1, "{records:?}");

    transport.close();
    let records = drain(logger);
    assert!(has_warning(&records, "failed to send 3 batches before close"), "{records:?}");
    assert!(has_warning(&records, "closed with 1 unsent entries"), "{records:?}");
}

fn entries_after_close_are_warned(logger: &mut Logger) {
    drain(logger);

    let transport = builder()
        .build_with_sender(RecordingSender::succeeding())
        .expect("transport");
    transport.close();
    transport.add(entry("late"));

    let records = drain(logger);
    assert!(has_warning(&records, "dropped 1 entries"), "{records:?}");
    assert_eq!(transport.buffered_len(), 0);
}

// The global logger can be installed once per process, so every scenario
// shares a single capture.
#[test]
fn transport_warnings_are_logged() {
    let mut logger = Logger::start();
    failed_send_and_open_breaker_are_warned(&mut logger);
    repeated_failures_are_rate_limited(&mut logger);
    entries_after_close_are_warned(&mut logger);
}
