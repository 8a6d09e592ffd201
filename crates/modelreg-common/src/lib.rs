//! Common types for the model registry operator: CRDs, errors, telemetry and
//! Kubernetes helpers shared by the controller and the operator binary.

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod kube_utils;
pub mod metrics;
pub mod telemetry;

pub use error::Error;

/// Finalizer placed on Models that have been (or may be) installed into registries
pub const MODEL_FINALIZER: &str = "config";

/// Pod annotation set by the registry injector once a registry sidecar is present
pub const REGISTRY_INJECT_STATUS_ANNOTATION: &str = "registry.config.onosproject.org/inject-status";

/// Value of [`REGISTRY_INJECT_STATUS_ANNOTATION`] marking a Pod as eligible
pub const REGISTRY_INJECT_STATUS_INJECTED: &str = "injected";

/// Name of the registry sidecar container whose readiness gates installs
pub const REGISTRY_CONTAINER_NAME: &str = "model-registry";

/// Port the model registry gRPC service listens on inside each Pod
pub const DEFAULT_REGISTRY_PORT: u16 = 5151;

/// Delay before re-checking a Model whose registries are not ready yet
pub const DEFAULT_REQUEUE_DELAY_SECS: u64 = 1;
