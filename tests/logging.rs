//! Log levels of the degraded paths.

use std::sync::Mutex;

use backdrop::capability;
use backdrop::prelude::*;
use log::{Level, LevelFilter, Log, Metadata, Record};

struct Recorder {
    records: Mutex<Vec<(Level, String)>>,
}

impl Log for Recorder {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if let Ok(mut records) = self.records.lock() {
            records.push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

static RECORDER: Recorder = Recorder {
    records: Mutex::new(Vec::new()),
};

#[test]
fn test_missing_gpu_is_reported_as_error() {
    log::set_logger(&RECORDER).unwrap();
    log::set_max_level(LevelFilter::Trace);

    let profile = capability::detect(&HostSnapshot::without_gpu());
    assert!(!profile.enabled());

    let records = RECORDER.records.lock().unwrap();
    assert!(records
        .iter()
        .any(|(level, msg)| *level == Level::Error && msg.contains("No GPU")));
    assert!(!records
        .iter()
        .any(|(level, msg)| *level == Level::Warn && msg.contains("No GPU")));
}
