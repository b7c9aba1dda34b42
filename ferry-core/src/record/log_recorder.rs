use super::{Record, RecordValue, Recorder};
use log::info;

/// Writes records to the `log` facade, one line per record.
///
/// Keys are sorted so that successive lines line up.
#[derive(Default)]
pub struct LogRecorder {
    prefix: String,
}

impl LogRecorder {
    /// Creates a recorder whose lines start with `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn fmt_value(v: &RecordValue) -> String {
        match v {
            RecordValue::Scalar(v) => format!("{:.4}", v),
            RecordValue::String(s) => s.clone(),
        }
    }
}

impl Recorder for LogRecorder {
    fn write(&mut self, record: Record) {
        let mut keys = record.keys().cloned().collect::<Vec<_>>();
        keys.sort();
        let line = keys
            .iter()
            .filter_map(|k| record.get(k).map(|v| format!("{}={}", k, Self::fmt_value(v))))
            .collect::<Vec<_>>()
            .join(", ");
        info!("{}{}", self.prefix, line);
    }
}
