//! Integration tests against a kind cluster
//!
//! - `crd_operations`: creating, reading and updating Models through the
//!   Kubernetes API, including the status subresource
//! - `reconcile_flow`: the reconciler driving a real Model through finalizer
//!   add and removal
//!
//! ```bash
//! cargo test -p modelreg-operator --test kind -- --ignored
//! ```

mod crd_operations;
mod helpers;
mod reconcile_flow;
