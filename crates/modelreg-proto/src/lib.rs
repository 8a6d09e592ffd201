//! Protocol buffer definitions for the per-Pod config model registry.
//!
//! Every Pod carrying the registry injection annotation runs a
//! `ConfigModelRegistryService` on a well-known port. The operator pushes a
//! [`ConfigModel`] into each registry when a Model is installed and deletes it
//! by name and version when the Model is finalized.
//!
//! Both calls are idempotent from the operator's point of view:
//!
//! - `PushModel` answers `ALREADY_EXISTS` when the name/version is present
//! - `DeleteModel` answers `NOT_FOUND` when it is absent
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use modelreg_proto::{ConfigModel, GetStateMode, PushModelRequest};
//!
//! let request = PushModelRequest {
//!     model: Some(ConfigModel {
//!         name: "devicesim".to_string(),
//!         version: "1.0.0".to_string(),
//!         get_state_mode: GetStateMode::OpState as i32,
//!         ..Default::default()
//!     }),
//! };
//! ```

// Generated protobuf code doesn't have docs
#![allow(missing_docs)]

/// Generated protobuf types from registry.proto
pub mod onos {
    /// Config model registry protocol
    pub mod configmodel {
        tonic::include_proto!("onos.configmodel");
    }
}

pub use onos::configmodel::*;
