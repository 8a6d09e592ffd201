//! Controller settings, read from flags or the environment

use std::time::Duration;

use clap::Args;

use modelreg_common::telemetry::TelemetryConfig;
use modelreg_common::{DEFAULT_REGISTRY_PORT, DEFAULT_REQUEUE_DELAY_SECS};

/// Settings for the Model controller
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Only watch Models and Pods in this namespace (all namespaces if unset)
    #[arg(long, env = "WATCH_NAMESPACE")]
    pub namespace: Option<String>,

    /// Port of the model registry service inside each Pod
    #[arg(long, env = "REGISTRY_PORT", default_value_t = DEFAULT_REGISTRY_PORT)]
    pub registry_port: u16,

    /// Timeout in seconds for connecting to a model registry
    #[arg(long, env = "REGISTRY_CONNECT_TIMEOUT_SECS", default_value_t = 10)]
    pub registry_connect_timeout_secs: u64,

    /// Delay in seconds before re-checking registries that were not ready
    #[arg(long, env = "REQUEUE_DELAY_SECS", default_value_t = DEFAULT_REQUEUE_DELAY_SECS)]
    pub requeue_delay_secs: u64,

    /// OTLP collector endpoint for traces and metrics
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Log filter directives, overriding RUST_LOG
    #[arg(long)]
    pub log_filter: Option<String>,
}

impl ControllerConfig {
    /// Registry connect timeout
    pub fn registry_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.registry_connect_timeout_secs)
    }

    /// Requeue delay for unready registries
    pub fn requeue_delay(&self) -> Duration {
        Duration::from_secs(self.requeue_delay_secs)
    }

    /// Telemetry settings for this controller
    pub fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig {
            otlp_endpoint: self.otlp_endpoint.clone(),
            log_filter: self.log_filter.clone(),
            watch_namespace: self.watch_namespace().map(str::to_string),
            ..Default::default()
        }
    }

    /// Namespace to watch, treating an empty value as "all namespaces"
    pub fn watch_namespace(&self) -> Option<&str> {
        self.namespace.as_deref().filter(|ns| !ns.is_empty())
    }
}
