//! A global logger that keeps every warning and error, for tests that
//! assert a run stayed quiet. Install it from a test binary that runs a
//! single test, since the logger is process wide.

use log::{Level, LevelFilter, Log, Metadata, Record};
use parking_lot::{const_mutex, Mutex};

static CAPTURE: CaptureLogger = CaptureLogger {
    messages: const_mutex(Vec::new()),
};

struct CaptureLogger {
    messages: Mutex<Vec<(Level, String)>>,
}

impl Log for CaptureLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Warn
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.messages
                .lock()
                .push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

/// Returns false if another logger was installed first
pub fn install() -> bool {
    log::set_logger(&CAPTURE)
        .map(|()| log::set_max_level(LevelFilter::Warn))
        .is_ok()
}

/// Warnings and errors logged since install
pub fn captured() -> Vec<(Level, String)> {
    CAPTURE.messages.lock().clone()
}

pub fn clear() {
    CAPTURE.messages.lock().clear();
}
