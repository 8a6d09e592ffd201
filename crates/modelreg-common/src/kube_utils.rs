//! Kubernetes helpers shared by the controller and the operator binary
//!
//! Finalizer bookkeeping operates on `ObjectMeta` so it works for any
//! resource. Pod helpers answer the two questions the install state machine
//! asks of a target: is it eligible to host a registry, and is that registry
//! reachable right now.

use std::time::Duration;

use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::{
    REGISTRY_CONTAINER_NAME, REGISTRY_INJECT_STATUS_ANNOTATION, REGISTRY_INJECT_STATUS_INJECTED,
};

/// Default connection timeout for kube clients
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default read timeout for kube clients
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Finalizers
// =============================================================================

/// Check whether `finalizer` is present on the object
pub fn has_finalizer(meta: &ObjectMeta, finalizer: &str) -> bool {
    meta.finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|s| s == finalizer))
}

/// Add `finalizer` to the object. Returns false if it was already present.
pub fn add_finalizer(meta: &mut ObjectMeta, finalizer: &str) -> bool {
    if has_finalizer(meta, finalizer) {
        return false;
    }
    meta.finalizers
        .get_or_insert_with(Vec::new)
        .push(finalizer.to_string());
    true
}

/// Remove `finalizer` from the object. Returns false if it was not present.
pub fn remove_finalizer(meta: &mut ObjectMeta, finalizer: &str) -> bool {
    match meta.finalizers.as_mut() {
        Some(finalizers) => {
            let before = finalizers.len();
            finalizers.retain(|f| f != finalizer);
            finalizers.len() != before
        }
        None => false,
    }
}

// =============================================================================
// Pods
// =============================================================================

/// True when the registry injector has marked the Pod as hosting a registry
pub fn is_registry_injected(pod: &Pod) -> bool {
    pod.metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(REGISTRY_INJECT_STATUS_ANNOTATION))
        .is_some_and(|v| v == REGISTRY_INJECT_STATUS_INJECTED)
}

/// The Pod's IP, if one has been assigned
pub fn pod_ip(pod: &Pod) -> Option<&str> {
    pod.status
        .as_ref()
        .and_then(|s| s.pod_ip.as_deref())
        .filter(|ip| !ip.is_empty())
}

/// False only when the named container reports itself as not ready
///
/// A Pod that has not published a status for the container yet is not held
/// back; the address check in [`registry_address`] covers Pods that have not
/// started.
pub fn is_container_ready(pod: &Pod, container: &str) -> bool {
    pod.status
        .as_ref()
        .and_then(|s| s.container_statuses.as_ref())
        .map(|statuses| {
            statuses
                .iter()
                .filter(|cs| cs.name == container)
                .all(|cs| cs.ready)
        })
        .unwrap_or(true)
}

/// Address of the Pod's model registry when it can accept calls
///
/// Requires an assigned Pod IP and a ready registry container.
pub fn registry_address(pod: &Pod) -> Option<&str> {
    let ip = pod_ip(pod)?;
    is_container_ready(pod, REGISTRY_CONTAINER_NAME).then_some(ip)
}

// =============================================================================
// Client construction
// =============================================================================

/// Create a Kubernetes client from the inferred config with bounded timeouts
pub async fn create_client() -> Result<kube::Client, kube::Error> {
    let mut config = kube::Config::infer()
        .await
        .map_err(kube::Error::InferConfig)?;
    config.connect_timeout = Some(DEFAULT_CONNECT_TIMEOUT);
    config.read_timeout = Some(DEFAULT_READ_TIMEOUT);
    kube::Client::try_from(config)
}
