//! Per-session log sink.
//!
//! The session never installs a global logger. Callers either inject a
//! [`log::Log`] implementation through
//! [`SessionBuilder::logger`](super::SessionBuilder::logger) or rely on
//! whatever logger the process set up (`env_logger` and friends). Every
//! record is prefixed with the device host.

use std::fmt;
use std::sync::Arc;

use log::{Level, Log, Metadata, Record};

const TARGET: &str = "cliwire::session";

/// Log sink bound to one session.
#[derive(Clone)]
pub struct SessionLog {
    host: String,
    sink: Option<Arc<dyn Log>>,
}

impl SessionLog {
    /// Log through the process-wide logger.
    pub fn global(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            sink: None,
        }
    }

    /// Log through an injected logger.
    pub fn with_sink(host: impl Into<String>, sink: Arc<dyn Log>) -> Self {
        Self {
            host: host.into(),
            sink: Some(sink),
        }
    }

    /// Emit a record at `level`.
    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        let logger: &dyn Log = match &self.sink {
            Some(sink) => sink.as_ref(),
            None => {
                if level > log::max_level() {
                    return;
                }
                log::logger()
            }
        };

        let metadata = Metadata::builder().level(level).target(TARGET).build();
        if !logger.enabled(&metadata) {
            return;
        }

        logger.log(
            &Record::builder()
                .metadata(metadata)
                .args(format_args!("[{}] {}", self.host, args))
                .module_path_static(Some(module_path!()))
                .build(),
        );
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    pub fn trace(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Trace, args);
    }
}

impl fmt::Debug for SessionLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionLog")
            .field("host", &self.host)
            .field("sink", &self.sink.as_ref().map(|_| "<Log>"))
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod capture {
    use std::sync::Mutex;

    use log::{Log, Metadata, Record};

    /// Logger that keeps every record in memory.
    #[derive(Default)]
    pub(crate) struct CaptureLog {
        pub(crate) lines: Mutex<Vec<String>>,
    }

    impl Log for CaptureLog {
        fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &Record<'_>) {
            self.lines
                .lock()
                .unwrap()
                .push(format!("{} {}", record.level(), record.args()));
        }

        fn flush(&self) {}
    }
}
