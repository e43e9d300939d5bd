//! Full-page navigation performed when a refresh cycle fails for good.

use std::sync::{Mutex, PoisonError};

use tracing::warn;

pub trait Navigator: Send + Sync {
    fn redirect(&self, path: &str);
}

/// Logs the redirect; for hosts with no page to navigate.
#[derive(Debug, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn redirect(&self, path: &str) {
        warn!("session ended; redirect requested to '{}'", path);
    }
}

/// Remembers every redirect request in order.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    paths: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirects(&self) -> Vec<String> {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, path: &str) {
        self.paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
    }
}
