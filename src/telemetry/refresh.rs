use std::time::SystemTime;

use tracing::{Level, event};
use uuid::Uuid;

use crate::errors::RefreshFailure;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RefreshOutcome {
    Success,
    Failed,
}

/// Structured events for one refresh cycle, correlated by `attempt_id`.
#[derive(Clone, Debug)]
pub struct RefreshTelemetry {
    attempt_id: Uuid,
    context: String,
}

impl RefreshTelemetry {
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            context: context.into(),
        }
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn emit_start(&self, at: SystemTime) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            context = %self.context,
            timestamp = ?at,
            "refresh.start"
        );
    }

    /// A 401 joined this cycle instead of starting its own.
    pub fn emit_queued(&self, position: usize) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            context = %self.context,
            position,
            "refresh.queued"
        );
    }

    pub fn emit_success(&self, released: usize, at: SystemTime) {
        event!(
            Level::INFO,
            attempt_id = %self.attempt_id,
            context = %self.context,
            timestamp = ?at,
            outcome = ?RefreshOutcome::Success,
            released,
            "refresh.success"
        );
    }

    pub fn emit_failure(&self, failure: &RefreshFailure, released: usize, at: SystemTime) {
        event!(
            Level::ERROR,
            attempt_id = %self.attempt_id,
            context = %self.context,
            timestamp = ?at,
            outcome = ?RefreshOutcome::Failed,
            released,
            error = %failure,
            "refresh.failure"
        );
    }
}
