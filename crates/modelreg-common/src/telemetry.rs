//! Telemetry initialization for the operator process
//!
//! Sets up, once per process:
//! - JSON logs carrying the current reconcile span (`model`, `namespace`)
//! - W3C TraceContext propagation
//! - OTLP export of traces and metrics when a collector endpoint is configured

use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{Tracer, TracerProvider};
use opentelemetry_sdk::{runtime, Resource};
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Log filter used when neither the config nor `RUST_LOG` provides one
pub const DEFAULT_LOG_FILTER: &str = "info,modelreg=debug,kube=info,tower=warn,hyper=warn,h2=warn";

/// Resource attribute naming the namespace the controller is restricted to
const WATCH_NAMESPACE_ATTRIBUTE: &str = "modelreg.watch_namespace";

/// Errors that can occur during telemetry initialization
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The log filter directives could not be parsed
    #[error("invalid log filter {filter:?}: {message}")]
    InvalidFilter {
        /// The rejected directives
        filter: String,
        /// Parser message
        message: String,
    },

    /// An OTLP exporter could not be built
    #[error("failed to initialize OTLP {signal} exporter: {message}")]
    Exporter {
        /// Signal being exported (traces, metrics)
        signal: &'static str,
        /// Exporter error message
        message: String,
    },

    /// A global subscriber is already installed
    #[error("failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),
}

/// Configuration for telemetry initialization
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name for traces and metrics
    pub service_name: String,

    /// OTLP endpoint for trace and metric export (e.g. "http://otel-collector:4317")
    ///
    /// When None, traces stay local and metrics are recorded into a no-op meter.
    pub otlp_endpoint: Option<String>,

    /// Log filter directives; `RUST_LOG` applies when unset
    pub log_filter: Option<String>,

    /// Namespace the controller is restricted to, attached to exported telemetry
    pub watch_namespace: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "modelreg-operator".to_string(),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(),
            log_filter: None,
            watch_namespace: None,
        }
    }
}

impl TelemetryConfig {
    /// Resolve the log filter: explicit directives, then `RUST_LOG`, then the default
    ///
    /// Only explicit directives are validated; a malformed `RUST_LOG` falls
    /// back to the default so a bad environment cannot stop the operator.
    pub fn env_filter(&self) -> Result<EnvFilter, TelemetryError> {
        if let Some(filter) = &self.log_filter {
            return EnvFilter::try_new(filter).map_err(|e| TelemetryError::InvalidFilter {
                filter: filter.clone(),
                message: e.to_string(),
            });
        }
        Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
    }

    fn resource(&self) -> Resource {
        let mut attributes = vec![
            KeyValue::new(SERVICE_NAME, self.service_name.clone()),
            KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
        ];

        for (var, key) in [
            ("POD_NAME", "k8s.pod.name"),
            ("POD_NAMESPACE", "k8s.namespace.name"),
            ("NODE_NAME", "k8s.node.name"),
        ] {
            if let Ok(value) = std::env::var(var) {
                attributes.push(KeyValue::new(key, value));
            }
        }

        if let Some(ns) = &self.watch_namespace {
            attributes.push(KeyValue::new(WATCH_NAMESPACE_ATTRIBUTE, ns.clone()));
        }

        Resource::new(attributes)
    }
}

/// Initialize telemetry with the given configuration
///
/// Must be called once, from within a Tokio runtime when an OTLP endpoint is
/// set, before any controller starts. A second call fails with
/// [`TelemetryError::SubscriberInit`].
pub fn init_telemetry(config: TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = config.env_filter()?;

    global::set_text_map_propagator(TraceContextPropagator::new());

    let otel_layer = match &config.otlp_endpoint {
        Some(endpoint) => {
            let tracer = install_otlp(endpoint, &config)?;
            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        None => None,
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .with_target(true)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()
        .map_err(|e| TelemetryError::SubscriberInit(e.to_string()))
}

/// Install global OTLP trace and metric providers, returning the tracer
fn install_otlp(endpoint: &str, config: &TelemetryConfig) -> Result<Tracer, TelemetryError> {
    let resource = config.resource();

    let metric_exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| TelemetryError::Exporter {
            signal: "metrics",
            message: e.to_string(),
        })?;
    let reader = PeriodicReader::builder(metric_exporter, runtime::Tokio).build();
    global::set_meter_provider(
        SdkMeterProvider::builder()
            .with_reader(reader)
            .with_resource(resource.clone())
            .build(),
    );

    let span_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| TelemetryError::Exporter {
            signal: "traces",
            message: e.to_string(),
        })?;
    let provider = TracerProvider::builder()
        .with_batch_exporter(span_exporter, runtime::Tokio)
        .with_resource(resource)
        .build();
    global::set_tracer_provider(provider.clone());

    Ok(provider.tracer(config.service_name.clone()))
}
