use std::sync::Mutex;

use devrunner::logging::{LogSeverity, Logger};

/// Logger that keeps every message in memory and echoes it to `tracing`.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    entries: Mutex<Vec<(LogSeverity, String)>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(LogSeverity, String)> {
        self.entries.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries().into_iter().map(|(_, m)| m).collect()
    }

    pub fn messages_at(&self, severity: LogSeverity) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, m)| m)
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.count_containing(needle) > 0
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, m)| m.contains(needle))
            .count()
    }
}

impl Logger for RecordingLogger {
    fn log(&self, severity: LogSeverity, message: &str) {
        tracing::debug!(%severity, "{message}");
        self.entries
            .lock()
            .unwrap()
            .push((severity, message.to_string()));
    }
}
