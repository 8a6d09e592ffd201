//! Custom Resource Definitions for the model registry operator
//!
//! The operator manages a single kind, `Model`, against the Pods that host a
//! model registry sidecar.

mod model;

pub use model::{
    GetStateMode, Model, ModelPhase, ModelSpec, ModelStatus, ModuleSpec, PluginSpec, RegistryStatus,
};
