use std::sync::{Arc, Mutex};

use airtrain::adapters::upload_from_dicts;
use airtrain::transport::{
    CreateDatasetResponse, DatasetTransport, InMemoryTransport, TriggerIngestResponse,
};
use airtrain::upload::observability::{
    CompositeObserver, TracingObserver, UploadContext, UploadObserver, UploadSeverity, UploadStats,
};
use airtrain::upload::UploadOptions;
use airtrain::{TransportError, UploadError};
use serde_json::json;

#[derive(Default)]
struct RecordingObserver {
    successes: Mutex<Vec<(UploadContext, UploadStats)>>,
    failures: Mutex<Vec<UploadSeverity>>,
    alerts: Mutex<Vec<UploadSeverity>>,
}

impl UploadObserver for RecordingObserver {
    fn on_success(&self, ctx: &UploadContext, stats: UploadStats) {
        self.successes.lock().unwrap().push((ctx.clone(), stats));
    }

    fn on_failure(&self, _ctx: &UploadContext, severity: UploadSeverity, _error: &UploadError) {
        self.failures.lock().unwrap().push(severity);
    }

    fn on_alert(&self, _ctx: &UploadContext, severity: UploadSeverity, _error: &UploadError) {
        self.alerts.lock().unwrap().push(severity);
    }
}

/// Accepts dataset creation, then refuses every upload.
struct RejectingStorage(InMemoryTransport);

impl DatasetTransport for RejectingStorage {
    fn create_dataset(
        &self,
        name: &str,
        embedding_column: Option<&str>,
    ) -> Result<CreateDatasetResponse, TransportError> {
        self.0.create_dataset(name, embedding_column)
    }

    fn upload_dataset_data(&self, _dataset_id: &str, _data: Vec<u8>) -> Result<(), TransportError> {
        Err(TransportError::Server("Expected redirect but got: 200".to_string()))
    }

    fn trigger_dataset_ingest(&self, dataset_id: &str) -> Result<TriggerIngestResponse, TransportError> {
        self.0.trigger_dataset_ingest(dataset_id)
    }

    fn dataset_dashboard_url(&self, dataset_id: &str) -> String {
        self.0.dataset_dashboard_url(dataset_id)
    }
}

fn observed(obs: Arc<RecordingObserver>) -> UploadOptions {
    UploadOptions {
        name: Some("Observed".to_string()),
        observer: Some(obs),
        alert_at_or_above: UploadSeverity::Critical,
        ..Default::default()
    }
}

#[test]
fn observer_receives_success_stats() {
    let obs = Arc::new(RecordingObserver::default());
    let t = InMemoryTransport::new();
    let opts = UploadOptions {
        max_batch_size: 2,
        ..observed(obs.clone())
    };
    let ds = upload_from_dicts(&t, (0..5).map(|i| json!({"i": i})), &opts).unwrap();

    let successes = obs.successes.lock().unwrap().clone();
    assert_eq!(successes.len(), 1);
    let (ctx, stats) = &successes[0];
    assert_eq!(ctx.dataset_name, "Observed");
    assert_eq!(ctx.dataset_id.as_deref(), Some(ds.id()));
    assert_eq!(*stats, UploadStats { rows: 5, batches: 3 });
    assert!(obs.failures.lock().unwrap().is_empty());
}

#[test]
fn transport_failure_is_critical_and_alerts() {
    let obs = Arc::new(RecordingObserver::default());
    let t = RejectingStorage(InMemoryTransport::new());
    let err = upload_from_dicts(&t, [json!({"i": 1})], &observed(obs.clone())).unwrap_err();

    assert!(matches!(err, UploadError::Transport(TransportError::Server(_))));
    assert!(err.to_string().contains("Expected redirect"));
    assert_eq!(*obs.failures.lock().unwrap(), vec![UploadSeverity::Critical]);
    assert_eq!(*obs.alerts.lock().unwrap(), vec![UploadSeverity::Critical]);
}

#[test]
fn validation_failure_does_not_alert_at_critical_threshold() {
    let obs = Arc::new(RecordingObserver::default());
    let t = InMemoryTransport::new();
    let err = upload_from_dicts(&t, Vec::<serde_json::Value>::new(), &observed(obs.clone())).unwrap_err();

    assert!(matches!(err, UploadError::Validation { .. }));
    assert_eq!(*obs.failures.lock().unwrap(), vec![UploadSeverity::Error]);
    assert!(obs.alerts.lock().unwrap().is_empty());
}

#[test]
fn composite_observer_includes_tracing_observer() {
    let recording = Arc::new(RecordingObserver::default());
    let composite = CompositeObserver::new(vec![recording.clone(), Arc::new(TracingObserver)]);
    let opts = UploadOptions {
        observer: Some(Arc::new(composite)),
        ..Default::default()
    };
    let t = InMemoryTransport::new();
    upload_from_dicts(&t, [json!({"i": 1})], &opts).unwrap();
    assert_eq!(recording.successes.lock().unwrap().len(), 1);
}

#[test]
fn failures_before_any_table_are_reported() {
    let obs = Arc::new(RecordingObserver::default());
    let t = InMemoryTransport::new();
    let opts = UploadOptions {
        max_batch_size: 0,
        ..observed(obs.clone())
    };
    upload_from_dicts(&t, [json!({"i": 1})], &opts).unwrap_err();

    assert_eq!(*obs.failures.lock().unwrap(), vec![UploadSeverity::Error]);
    assert_eq!(t.dataset_count(), 0);
}
