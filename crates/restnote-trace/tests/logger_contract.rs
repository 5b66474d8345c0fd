//! Behaviour every renderer shares through the `Logger` trait.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use bytes::Bytes;
use pretty_assertions::assert_eq;
use restnote_trace::{
    EventKind, LogEvent, Logger, MemoryLogger, Payload, TextLogger, TracingLogger,
};
use serde_json::json;

fn every_payload() -> Vec<Payload> {
    let mut map = BTreeMap::new();
    map.insert("k".to_string(), "v".to_string());
    vec![
        Payload::Text("text".into()),
        Payload::Bytes(Bytes::from_static(&[0xff, b'a'])),
        Payload::Xml(restnote_xml::Document::parse("<x/>").unwrap()),
        Payload::Map(map),
        Payload::Value(json!({"n": 1, "list": [true, null]})),
        Payload::Rows(vec![vec!["a".into()], vec![]]),
    ]
}

#[test]
fn renderers_accept_every_kind_and_payload() {
    let loggers: Vec<Arc<dyn Logger>> = vec![
        Arc::new(TextLogger::new(Vec::new()).with_ansi(true)),
        Arc::new(TracingLogger::new()),
        Arc::new(MemoryLogger::new()),
    ];
    for logger in &loggers {
        for kind in EventKind::ALL {
            logger.emit(LogEvent::new(kind));
            for payload in every_payload() {
                logger.emit(
                    LogEvent::new(kind)
                        .with_description("d")
                        .with_payload(payload),
                );
            }
        }
        logger.close();
        logger.close();
    }
}

#[test]
fn suppression_is_shared_across_threads() {
    let logger = Arc::new(MemoryLogger::new());
    let guard = logger.mute_state().suppress();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || logger.emit(LogEvent::comment(format!("muted {i}"))))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    drop(guard);

    logger.emit(LogEvent::comment("visible"));
    assert_eq!(logger.descriptions(), vec!["visible"]);
}

#[test]
fn nested_suppression_restores_outer_state() {
    let logger = MemoryLogger::new();
    logger.emit(LogEvent::comment("1"));
    {
        let _outer = logger.mute_state().suppress();
        logger.emit(LogEvent::comment("hidden"));
        {
            let _inner = logger.mute_state().suppress();
            logger.emit(LogEvent::comment("hidden"));
        }
        logger.emit(LogEvent::comment("still hidden"));
    }
    logger.emit(LogEvent::comment("2"));
    assert_eq!(logger.descriptions(), vec!["1", "2"]);
}
