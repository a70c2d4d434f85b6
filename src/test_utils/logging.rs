//! Log capture for asserting on the pipeline's tracing output.
//!
//! Capture is scoped to the current thread through a default-subscriber
//! guard, so parallel tests never see each other's events. Use it with
//! `#[tokio::test]` (current-thread runtime).

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};

use tracing::Level;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Storage for captured log entries.
#[derive(Default)]
pub struct LogStorage {
    entries: VecDeque<LogEntry>,
    max_entries: usize,
}

impl LogStorage {
    #[must_use]
    pub const fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries,
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        if self.entries.len() >= self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    #[must_use]
    pub const fn entries(&self) -> &VecDeque<LogEntry> {
        &self.entries
    }
}

/// A captured log entry.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: Level,
    pub target: String,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Layer pushing every event into a shared [`LogStorage`].
pub struct TestLogLayer {
    storage: Arc<Mutex<LogStorage>>,
}

impl TestLogLayer {
    pub const fn new(storage: Arc<Mutex<LogStorage>>) -> Self {
        Self { storage }
    }
}

impl<S> tracing_subscriber::Layer<S> for TestLogLayer
where
    S: tracing::Subscriber,
{
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        struct MessageVisitor<'a> {
            message: &'a mut String,
            fields: &'a mut Vec<(String, String)>,
        }

        impl tracing::field::Visit for MessageVisitor<'_> {
            fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                if field.name() == "message" {
                    *self.message = value.to_string();
                } else {
                    self.fields
                        .push((field.name().to_string(), value.to_string()));
                }
            }

            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                let value_str = format!("{value:?}");
                if field.name() == "message" {
                    *self.message = value_str;
                } else {
                    self.fields.push((field.name().to_string(), value_str));
                }
            }
        }

        let metadata = event.metadata();
        let mut message = String::new();
        let mut fields = Vec::new();
        event.record(&mut MessageVisitor {
            message: &mut message,
            fields: &mut fields,
        });

        let entry = LogEntry {
            level: *metadata.level(),
            target: metadata.target().to_string(),
            message,
            fields,
        };
        if let Ok(mut storage) = self.storage.lock() {
            storage.push(entry);
        }
    }
}

/// Captured events for one test; capture stops when this is dropped.
pub struct LogCapture {
    storage: Arc<Mutex<LogStorage>>,
    _guard: DefaultGuard,
}

/// Start capturing events at `level` (an `EnvFilter` directive) on this
/// thread.
#[must_use]
pub fn capture_logs(level: &str) -> LogCapture {
    let storage = Arc::new(Mutex::new(LogStorage::new(1000)));
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::new(level))
        .with(TestLogLayer::new(Arc::clone(&storage)));
    let guard = tracing::subscriber::set_default(subscriber);
    LogCapture {
        storage,
        _guard: guard,
    }
}

impl LogCapture {
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.storage
            .lock()
            .map(|storage| storage.entries().iter().cloned().collect())
            .unwrap_or_default()
    }

    /// First entry at `level` whose message contains `message`.
    #[must_use]
    pub fn find(&self, level: Level, message: &str) -> Option<LogEntry> {
        self.entries()
            .into_iter()
            .find(|e| e.level == level && e.message.contains(message))
    }

    #[must_use]
    pub fn contains(&self, level: Level, message: &str) -> bool {
        self.find(level, message).is_some()
    }

    #[must_use]
    pub fn has_level(&self, level: Level) -> bool {
        self.entries().iter().any(|e| e.level == level)
    }

    /// Format logs for display on test failure.
    #[must_use]
    pub fn format_for_display(&self) -> String {
        let logs = self.entries();
        if logs.is_empty() {
            return String::from("No logs captured");
        }

        let mut output = format!("Captured {} log entries:\n", logs.len());
        for entry in logs {
            let _ = writeln!(
                output,
                "[{}] {}: {}",
                entry.level, entry.target, entry.message
            );
            for (key, value) in &entry.fields {
                let _ = writeln!(output, "    {key} = {value}");
            }
        }
        output
    }
}

/// Assert that a capture holds an entry with the given level and message.
#[macro_export]
macro_rules! assert_log_contains {
    ($capture:expr, $level:expr, $message:expr) => {{
        let capture = &$capture;
        assert!(
            capture.contains($level, $message),
            "Expected log with level {} containing '{}'\n{}",
            $level,
            $message,
            capture.format_for_display()
        );
    }};
}
