//! Model controller for the config model registry operator
//!
//! Watches `Model` CRDs and installs each Model's plugin into the model
//! registry of every registry-injected Pod in the Model's namespace:
//! - per-Pod install progress lives in `status.registryStatuses`
//! - the `config` finalizer holds deletion until the plugin has been removed
//!   from every registry
//! - status entries of Pods that disappear are pruned
//!
//! Pod and Model changes are fanned out to all Models of the namespace by the
//! mappers in this crate.

#![deny(missing_docs)]

mod controller;
mod finalize;
mod gc;
mod install;
mod mapper;
pub mod registry;
pub mod store;


pub use controller::{
    error_policy, reconcile, reconcile_model, Context, ContextBuilder, ERROR_REQUEUE_DELAY,
};
pub use mapper::{models_for_model, models_for_pod, models_in_namespace};
pub use registry::{GrpcRegistryClient, ModelDescriptor, RegistryClient};
pub use store::{KubeModelStore, ModelStore};
