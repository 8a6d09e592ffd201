//! OpenTelemetry metrics for Model reconciliation
//!
//! Instruments are created lazily from the global meter, so recording is a
//! no-op until [`crate::telemetry::init_telemetry`] installs an exporter.

use std::time::Duration;

use once_cell::sync::Lazy;
use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::{global, KeyValue};

/// Global meter for operator metrics
static METER: Lazy<Meter> = Lazy::new(|| global::meter("modelreg"));

/// Counter of Model reconciliations
///
/// Labels:
/// - `result`: success, error
/// - `error_type`: conflict, kube, registry, ... (errors only)
pub static MODEL_RECONCILES: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("modelreg_model_reconciles_total")
        .with_description("Total number of Model reconciliations")
        .with_unit("{reconciles}")
        .build()
});

/// Histogram of Model reconciliation duration
///
/// Labels:
/// - `result`: success, error
pub static MODEL_RECONCILE_DURATION: Lazy<Histogram<f64>> = Lazy::new(|| {
    METER
        .f64_histogram("modelreg_model_reconcile_duration_seconds")
        .with_description("Duration of Model reconciliation in seconds")
        .with_unit("s")
        .build()
});

/// Counter of calls made to Pod model registries
///
/// Labels:
/// - `operation`: push, delete
/// - `outcome`: applied, duplicate, error
pub static REGISTRY_CALLS: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("modelreg_registry_calls_total")
        .with_description("Total number of model registry calls")
        .with_unit("{calls}")
        .build()
});

/// Counter of registry status entries dropped because their Pod disappeared
pub static STATUS_ENTRIES_PRUNED: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("modelreg_status_entries_pruned_total")
        .with_description("Total number of registry status entries pruned")
        .with_unit("{entries}")
        .build()
});

/// Outcome label of a registry call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallOutcome {
    /// The registry changed state
    Applied,
    /// The registry already matched (AlreadyExists on push, NotFound on delete)
    Duplicate,
    /// The call failed
    Error,
}

impl CallOutcome {
    /// Metric label value
    pub fn as_str(&self) -> &'static str {
        match self {
            CallOutcome::Applied => "applied",
            CallOutcome::Duplicate => "duplicate",
            CallOutcome::Error => "error",
        }
    }
}

/// Record one finished reconciliation
pub fn record_reconcile(duration: Duration, error_type: Option<&'static str>) {
    let result = if error_type.is_some() {
        "error"
    } else {
        "success"
    };
    MODEL_RECONCILE_DURATION.record(
        duration.as_secs_f64(),
        &[KeyValue::new("result", result)],
    );

    let mut labels = vec![KeyValue::new("result", result)];
    if let Some(error_type) = error_type {
        labels.push(KeyValue::new("error_type", error_type));
    }
    MODEL_RECONCILES.add(1, &labels);
}

/// Record one registry call
pub fn record_registry_call(operation: &'static str, outcome: CallOutcome) {
    REGISTRY_CALLS.add(
        1,
        &[
            KeyValue::new("operation", operation),
            KeyValue::new("outcome", outcome.as_str()),
        ],
    );
}

/// Record a pruned status entry
pub fn record_pruned_entry() {
    STATUS_ENTRIES_PRUNED.add(1, &[]);
}
