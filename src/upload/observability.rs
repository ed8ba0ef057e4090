//! Observer hooks for upload outcomes.
//!
//! An [`UploadObserver`] hears once per upload call: success with row and batch counts, or
//! failure with a severity. Failures at or above [`super::UploadOptions::alert_at_or_above`]
//! are also raised as alerts.

use std::fmt;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::error::UploadError;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UploadSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (the upload was rejected).
    Error,
    /// Critical error (transport, storage or other infrastructure failures).
    Critical,
}

/// Context about an upload attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadContext {
    /// Name the dataset was (or would have been) created with.
    pub dataset_name: String,
    /// Server-assigned id, once the dataset has been created.
    pub dataset_id: Option<String>,
}

/// Stats reported on a successful upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadStats {
    /// Rows persisted.
    pub rows: usize,
    /// Parquet files uploaded.
    pub batches: usize,
}

/// Observer interface for upload outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts. Observers are told about each
/// upload call once, after its outcome is known.
pub trait UploadObserver: Send + Sync {
    /// Called when an upload succeeds.
    fn on_success(&self, _ctx: &UploadContext, _stats: UploadStats) {}

    /// Called when an upload fails.
    fn on_failure(&self, _ctx: &UploadContext, _severity: UploadSeverity, _error: &UploadError) {}

    /// Called when an upload failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &UploadContext, severity: UploadSeverity, error: &UploadError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn UploadObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer that forwards every callback to `observers`, in order.
    pub fn new(observers: Vec<Arc<dyn UploadObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl UploadObserver for CompositeObserver {
    fn on_success(&self, ctx: &UploadContext, stats: UploadStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &UploadContext, severity: UploadSeverity, error: &UploadError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &UploadContext, severity: UploadSeverity, error: &UploadError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Emits upload outcomes as `tracing` events.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl UploadObserver for TracingObserver {
    fn on_success(&self, ctx: &UploadContext, stats: UploadStats) {
        info!(
            dataset = %ctx.dataset_name,
            dataset_id = ctx.dataset_id.as_deref().unwrap_or("-"),
            rows = stats.rows,
            batches = stats.batches,
            "upload finished"
        );
    }

    fn on_failure(&self, ctx: &UploadContext, severity: UploadSeverity, error: &UploadError) {
        warn!(
            dataset = %ctx.dataset_name,
            dataset_id = ctx.dataset_id.as_deref().unwrap_or("-"),
            ?severity,
            %error,
            "upload failed"
        );
    }

    fn on_alert(&self, ctx: &UploadContext, severity: UploadSeverity, error: &UploadError) {
        error!(
            dataset = %ctx.dataset_name,
            dataset_id = ctx.dataset_id.as_deref().unwrap_or("-"),
            ?severity,
            %error,
            "upload alert"
        );
    }
}

/// Severity of a failed upload.
pub(crate) fn severity_for_error(e: &UploadError) -> UploadSeverity {
    match e {
        UploadError::Io(_) | UploadError::Parquet(_) | UploadError::Transport(_) => UploadSeverity::Critical,
        UploadError::Arrow(_)
        | UploadError::Validation { .. }
        | UploadError::UnsupportedType { .. }
        | UploadError::FeatureNotAvailable { .. } => UploadSeverity::Error,
        #[cfg(feature = "polars")]
        UploadError::Polars(_) => UploadSeverity::Error,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::{
        severity_for_error, CompositeObserver, UploadContext, UploadObserver, UploadSeverity, UploadStats,
    };
    use crate::error::{TransportError, UploadError};

    #[derive(Default)]
    struct Counting {
        successes: Mutex<usize>,
        failures: Mutex<usize>,
    }

    impl UploadObserver for Counting {
        fn on_success(&self, _ctx: &UploadContext, _stats: UploadStats) {
            *self.successes.lock().unwrap() += 1;
        }

        fn on_failure(&self, _ctx: &UploadContext, _severity: UploadSeverity, _error: &UploadError) {
            *self.failures.lock().unwrap() += 1;
        }
    }

    #[test]
    fn composite_fans_out_and_alert_defaults_to_failure() {
        let a = Arc::new(Counting::default());
        let b = Arc::new(Counting::default());
        let composite = CompositeObserver::new(vec![a.clone(), b.clone()]);
        let ctx = UploadContext {
            dataset_name: "d".to_string(),
            dataset_id: None,
        };
        composite.on_success(&ctx, UploadStats { rows: 1, batches: 1 });
        composite.on_alert(&ctx, UploadSeverity::Critical, &UploadError::validation("x"));

        for o in [a, b] {
            assert_eq!(*o.successes.lock().unwrap(), 1);
            assert_eq!(*o.failures.lock().unwrap(), 1);
        }
    }

    #[test]
    fn transport_failures_are_critical() {
        let e = UploadError::from(TransportError::Server("boom".to_string()));
        assert_eq!(severity_for_error(&e), UploadSeverity::Critical);
        assert_eq!(severity_for_error(&UploadError::validation("bad")), UploadSeverity::Error);
    }
}
