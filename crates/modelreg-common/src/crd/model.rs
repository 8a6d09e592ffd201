//! Model CRD types
//!
//! A `Model` describes a config plugin (type, version, YANG modules and their
//! source files) that must be pushed into the model registry of every Pod in
//! the same namespace carrying the registry injection annotation. Per-Pod
//! install progress is tracked in `status.registryStatuses`.

use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// =============================================================================
// Model CRD
// =============================================================================

/// Specification of a config model
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "config.onosproject.org",
    version = "v1beta1",
    kind = "Model",
    plural = "models",
    namespaced,
    status = "ModelStatus",
    printcolumn = r#"{"name":"Type","type":"string","jsonPath":".spec.plugin.type"}"#,
    printcolumn = r#"{"name":"Version","type":"string","jsonPath":".spec.plugin.version"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ModelSpec {
    /// Plugin to distribute to model registries
    ///
    /// Models without a plugin are inert: they are never installed anywhere
    /// and never receive the cleanup finalizer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<PluginSpec>,

    /// YANG modules making up the model
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<ModuleSpec>,

    /// Module source files, keyed by file name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files: BTreeMap<String, String>,
}

/// Identity of the config plugin pushed to each registry
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PluginSpec {
    /// Model type (e.g. "devicesim")
    #[serde(rename = "type")]
    pub type_: String,

    /// Model version (e.g. "1.0.0")
    pub version: String,

    /// How the target device's operational state is retrieved
    #[serde(default)]
    pub get_state_mode: GetStateMode,
}

/// A single YANG module of a Model
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSpec {
    /// Module name
    pub name: String,

    /// Organization publishing the module
    #[serde(default)]
    pub organization: String,

    /// Module revision date
    #[serde(default)]
    pub revision: String,

    /// Name of the entry in `files` holding the module source
    #[serde(default)]
    pub file: String,
}

/// Operational state retrieval mode for a plugin
///
/// This is the only get-state enumeration in the operator; the registry
/// client translates it to the wire enum at the gRPC boundary.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum GetStateMode {
    /// Do not retrieve operational state
    #[default]
    None,
    /// Retrieve the whole operational state tree
    OpState,
    /// Retrieve explicitly listed read-only paths
    ExplicitRoPaths,
    /// Retrieve explicitly listed read-only paths, expanding wildcards
    ExplicitRoPathsExpandWildcards,
}

// =============================================================================
// Status
// =============================================================================

/// Status of a Model
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelStatus {
    /// Install progress per registry Pod, in the order Pods were first seen
    #[serde(default)]
    pub registry_statuses: Vec<RegistryStatus>,
}

/// Install state of the Model in one Pod's registry
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStatus {
    /// Name of the Pod hosting the registry
    pub pod_name: String,

    /// Install phase
    #[serde(default)]
    pub phase: ModelPhase,
}

/// Per-registry install phase
///
/// Phases only move forward; an entry is dropped wholesale when its Pod
/// disappears.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum ModelPhase {
    /// Pod observed, waiting for the registry to become ready
    #[default]
    Pending,
    /// Registry ready, push in progress
    Installing,
    /// Model present in the registry
    Installed,
}

impl RegistryStatus {
    /// New entry for a freshly observed Pod
    pub fn pending(pod_name: impl Into<String>) -> Self {
        Self {
            pod_name: pod_name.into(),
            phase: ModelPhase::Pending,
        }
    }
}

impl ModelStatus {
    /// Index of the entry for `pod_name`, if one exists
    pub fn position(&self, pod_name: &str) -> Option<usize> {
        self.registry_statuses
            .iter()
            .position(|s| s.pod_name == pod_name)
    }

    /// Phase recorded for `pod_name`
    pub fn phase_of(&self, pod_name: &str) -> Option<ModelPhase> {
        self.position(pod_name)
            .map(|i| self.registry_statuses[i].phase)
    }

    /// Set the phase of an existing entry. Returns false if there is none.
    pub fn set_phase(&mut self, pod_name: &str, phase: ModelPhase) -> bool {
        match self.position(pod_name) {
            Some(i) => {
                self.registry_statuses[i].phase = phase;
                true
            }
            None => false,
        }
    }

    /// Drop the entry for `pod_name`. Returns false if there was none.
    pub fn remove(&mut self, pod_name: &str) -> bool {
        let before = self.registry_statuses.len();
        self.registry_statuses.retain(|s| s.pod_name != pod_name);
        self.registry_statuses.len() != before
    }
}

impl Model {
    /// Registry statuses, empty when the Model has no status yet
    pub fn registry_statuses(&self) -> &[RegistryStatus] {
        self.status
            .as_ref()
            .map(|s| s.registry_statuses.as_slice())
            .unwrap_or_default()
    }

    /// Mutable status, created on first use
    pub fn ensure_status(&mut self) -> &mut ModelStatus {
        self.status.get_or_insert_with(ModelStatus::default)
    }
}
