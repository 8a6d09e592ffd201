//! Maps Pod and Model changes to the Models that must be reconciled
//!
//! Any change to a registry Pod, or to any Model, re-triggers every Model in
//! the same namespace. Models are read from the controller's own reflector
//! cache, so mapping never calls the API server.

use k8s_openapi::api::core::v1::Pod;
use kube::runtime::reflector::{ObjectRef, Store};
use kube::ResourceExt;

use modelreg_common::crd::Model;
use modelreg_common::kube_utils::is_registry_injected;

/// Every cached Model in `namespace`
pub fn models_in_namespace(
    models: &Store<Model>,
    namespace: Option<&str>,
) -> Vec<ObjectRef<Model>> {
    models
        .state()
        .iter()
        .filter(|model| model.namespace().as_deref() == namespace)
        .map(|model| ObjectRef::from_obj(model.as_ref()))
        .collect()
}

/// Models to reconcile after a Pod change; empty unless the Pod hosts a registry
pub fn models_for_pod(models: &Store<Model>, pod: &Pod) -> Vec<ObjectRef<Model>> {
    if !is_registry_injected(pod) {
        return Vec::new();
    }
    models_in_namespace(models, pod.namespace().as_deref())
}

/// Models to reconcile after a change to `model`
pub fn models_for_model(models: &Store<Model>, model: &Model) -> Vec<ObjectRef<Model>> {
    models_in_namespace(models, model.namespace().as_deref())
}
