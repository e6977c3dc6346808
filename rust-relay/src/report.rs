//! Observability collaborator for error and divergence reporting.
//!
//! Handlers report failures and warnings through the [`Reporter`] trait
//! rather than a concrete client, so tests can inject a no-op and the
//! reporting path can never fail or block a response.

use std::fmt::Display;
use std::time::Instant;

use serde_json::Value;
use tracing::{error, info, warn};

/// Process-wide error reporting interface. All methods are best effort.
pub trait Reporter: Send + Sync {
    /// Record a terminal failure.
    fn report_exception(&self, error: &dyn Display);

    /// Record a non-fatal warning with structured context.
    fn report_warning(&self, message: &str, context: &Value);

    /// Open a named transaction scope. The returned guard records the
    /// elapsed time when dropped.
    fn start_transaction(&self, name: &'static str) -> Transaction {
        Transaction {
            name,
            started: Some(Instant::now()),
        }
    }
}

/// Scope guard for a reported transaction.
pub struct Transaction {
    name: &'static str,
    started: Option<Instant>,
}

impl Transaction {
    pub fn noop(name: &'static str) -> Self {
        Transaction {
            name,
            started: None,
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if let Some(started) = self.started {
            info!(
                transaction = self.name,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "transaction_finished"
            );
        }
    }
}

/// Reporter that writes through the tracing pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report_exception(&self, error: &dyn Display) {
        error!(error = %error, "relay_exception_reported");
    }

    fn report_warning(&self, message: &str, context: &Value) {
        warn!(context = %context, "{}", message);
    }
}

/// Reporter that drops everything, for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl Reporter for NoopReporter {
    fn report_exception(&self, _error: &dyn Display) {}

    fn report_warning(&self, _message: &str, _context: &Value) {}

    fn start_transaction(&self, name: &'static str) -> Transaction {
        Transaction::noop(name)
    }
}
