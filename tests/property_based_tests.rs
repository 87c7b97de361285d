//! Property-Based Tests for Log Integrity and Trace Closure
//!
//! Whatever the payload, every appended event must come back as exactly one
//! well-formed line, and every opened trace must be closed exactly once.

use proptest::prelude::*;
use serde_json::{Value, json};
use sonar::observability::EventLog;
use sonar::{EventData, EventType, StructuredEvent, TelemetrySink, read_events};
use sonar_testing::TraceLedger;

// Payload values, including newlines, quotes and non-ASCII text
fn payload_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("(.|\n|\"|\\\\){0,64}").unwrap()
}

fn event_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{1,12}_(executed|error)").unwrap()
}

#[derive(Debug, Clone, Copy)]
enum Ending {
    Succeed,
    Fail,
    Drop,
}

fn ending_strategy() -> impl Strategy<Value = Ending> {
    prop_oneof![Just(Ending::Succeed), Just(Ending::Fail), Just(Ending::Drop)]
}

proptest! {
    /// Property: one append is one line, and it reads back unchanged
    #[test]
    fn prop_appended_events_read_back_intact(
        entries in prop::collection::vec((event_name_strategy(), payload_strategy()), 1..20)
    ) {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::open(dir.path().join("agent_logs.json")).unwrap();

        let mut written = Vec::new();
        for (name, payload) in &entries {
            let mut data = EventData::new();
            data.insert("query".into(), Value::String(payload.clone()));
            let event = StructuredEvent::new(EventType::from_name(name), data);
            log.append(&event).unwrap();
            written.push(event);
        }

        let content = std::fs::read_to_string(log.path()).unwrap();
        prop_assert_eq!(content.lines().count(), entries.len());

        let read = read_events(log.path()).unwrap();
        prop_assert_eq!(read.skipped_lines, 0);
        prop_assert_eq!(read.events.len(), written.len());
        for (back, original) in read.events.iter().zip(&written) {
            prop_assert_eq!(&back.event_type, &original.event_type);
            prop_assert_eq!(&back.data, &original.data);
        }
    }

    /// Property: every opened trace is closed exactly once, however it ends
    #[test]
    fn prop_traces_close_exactly_once(
        endings in prop::collection::vec(ending_strategy(), 1..10),
        input in payload_strategy()
    ) {
        tokio_test::block_on(async {
            let dir = tempfile::tempdir().unwrap();
            let sink = TelemetrySink::builder(dir.path().join("agent_logs.json"))
                .build()
                .unwrap();

            for ending in &endings {
                let trace = sink
                    .open_trace("prop", json!({ "topic": input }), EventData::new())
                    .await
                    .unwrap();
                match ending {
                    Ending::Succeed => {
                        trace
                            .succeed(EventType::AgentCompleted, EventData::new(), "ok")
                            .await
                            .unwrap();
                    }
                    Ending::Fail => {
                        trace
                            .fail(EventType::AgentError, EventData::new(), "boom")
                            .await
                            .unwrap();
                    }
                    Ending::Drop => drop(trace),
                }
            }

            let ledger = TraceLedger::from_path(sink.log_path()).unwrap();
            assert_eq!(ledger.opened.len(), endings.len());
            assert!(ledger.is_balanced());
        });
    }
}
