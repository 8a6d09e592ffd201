//! Object store access for the Model controller
//!
//! All reads and writes the reconciler performs go through [`ModelStore`], so
//! reconcile logic can be exercised against mocks or an in-memory store.
//! Writes are full-object `replace` calls carrying the `resourceVersion` that
//! was read; a concurrent writer makes them fail with a 409 conflict.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams, PostParams};
use kube::{Client, ResourceExt};

#[cfg(test)]
use mockall::automock;

use modelreg_common::crd::Model;
use modelreg_common::Error;

/// Store operations needed to reconcile a Model
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ModelStore: Send + Sync {
    /// Get a Model, or None if it no longer exists
    async fn get_model(&self, namespace: &str, name: &str) -> Result<Option<Model>, Error>;

    /// Replace a Model's metadata and spec (used for finalizer changes)
    ///
    /// Returns the stored object with its new `resourceVersion`.
    async fn update_model(&self, model: &Model) -> Result<Model, Error>;

    /// Replace a Model's status subresource
    async fn update_model_status(&self, model: &Model) -> Result<Model, Error>;

    /// List all Pods in a namespace, in the order the API server returns them
    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, Error>;

    /// Get a Pod, or None if it no longer exists
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>, Error>;
}

/// [`ModelStore`] backed by the Kubernetes API server
pub struct KubeModelStore {
    client: Client,
}

impl KubeModelStore {
    /// Create a store wrapping the given kube Client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn models(&self, model: &Model) -> Result<(Api<Model>, String), Error> {
        let name = model.name_any();
        let namespace = model.namespace().ok_or_else(|| {
            Error::internal_with_context("store", format!("model {name} has no namespace"))
        })?;
        Ok((Api::namespaced(self.client.clone(), &namespace), name))
    }
}

#[async_trait]
impl ModelStore for KubeModelStore {
    async fn get_model(&self, namespace: &str, name: &str) -> Result<Option<Model>, Error> {
        let api: Api<Model> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn update_model(&self, model: &Model) -> Result<Model, Error> {
        let (api, name) = self.models(model)?;
        Ok(api.replace(&name, &PostParams::default(), model).await?)
    }

    async fn update_model_status(&self, model: &Model) -> Result<Model, Error> {
        let (api, name) = self.models(model)?;
        let data = serde_json::to_vec(model)
            .map_err(|e| Error::serialization_for_kind("Model", e.to_string()))?;
        Ok(api.replace_status(&name, &PostParams::default(), data).await?)
    }

    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, Error> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>, Error> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get_opt(name).await?)
    }
}
