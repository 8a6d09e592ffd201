//! Model reconciliation controller
//!
//! Each invocation re-reads the Model and performs at most one persisted
//! change:
//! - live Model with a plugin: ensure the finalizer, then step the first
//!   registry Pod that needs it (`Pending` → `Installing` → `Installed`), or
//!   prune the status of one Pod that is gone
//! - Model being deleted: delete the plugin from every registry, then release
//!   the finalizer
//!
//! A persisted change produces a watch event for the Model, which re-triggers
//! reconciliation, so successful passes return `await_change`. Passes that
//! skipped an unready registry requeue after a short fixed delay.

use std::sync::Arc;
use std::time::{Duration, Instant};

use k8s_openapi::api::core::v1::Pod;
use kube::runtime::controller::Action;
use kube::{Client, ResourceExt};
use tracing::{debug, error, info, instrument, warn};

use modelreg_common::crd::Model;
use modelreg_common::kube_utils::{add_finalizer, has_finalizer, is_registry_injected};
use modelreg_common::metrics::record_reconcile;
use modelreg_common::{Error, DEFAULT_REGISTRY_PORT, DEFAULT_REQUEUE_DELAY_SECS, MODEL_FINALIZER};

use crate::finalize::finalize_model;
use crate::gc::prune_stale_statuses;
use crate::install::{Scan, Step};
use crate::registry::{GrpcRegistryClient, RegistryClient, DEFAULT_CONNECT_TIMEOUT};
use crate::store::{KubeModelStore, ModelStore};

/// Backoff applied by [`error_policy`]
pub const ERROR_REQUEUE_DELAY: Duration = Duration::from_secs(5);

/// Shared state for Model reconciliation
///
/// Use [`ContextBuilder`] to construct instances:
///
/// ```text
/// let ctx = Context::builder(client)
///     .registry_port(5151)
///     .build();
/// ```
pub struct Context {
    /// Object store for Models and Pods (trait object for testability)
    pub store: Arc<dyn ModelStore>,
    /// Client for Pod model registries
    pub registry: Arc<dyn RegistryClient>,
    /// Delay before re-checking registries that were not ready
    pub requeue_delay: Duration,
}

impl Context {
    /// Create a builder for constructing a Context
    pub fn builder(client: Client) -> ContextBuilder {
        ContextBuilder::new(client)
    }

    /// Create a context with default registry settings
    pub fn new(client: Client) -> Self {
        Self::builder(client).build()
    }

    /// Create a context for testing with custom store and registry
    #[cfg(test)]
    pub fn for_testing(store: Arc<dyn ModelStore>, registry: Arc<dyn RegistryClient>) -> Self {
        Self {
            store,
            registry,
            requeue_delay: Duration::from_secs(DEFAULT_REQUEUE_DELAY_SECS),
        }
    }
}

/// Builder for constructing [`Context`] instances
pub struct ContextBuilder {
    client: Client,
    store: Option<Arc<dyn ModelStore>>,
    registry: Option<Arc<dyn RegistryClient>>,
    registry_port: u16,
    connect_timeout: Duration,
    requeue_delay: Duration,
}

impl ContextBuilder {
    fn new(client: Client) -> Self {
        Self {
            client,
            store: None,
            registry: None,
            registry_port: DEFAULT_REGISTRY_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            requeue_delay: Duration::from_secs(DEFAULT_REQUEUE_DELAY_SECS),
        }
    }

    /// Port the registry sidecars listen on
    pub fn registry_port(mut self, port: u16) -> Self {
        self.registry_port = port;
        self
    }

    /// Connect timeout for registry calls
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Delay before re-checking registries that were not ready
    pub fn requeue_delay(mut self, delay: Duration) -> Self {
        self.requeue_delay = delay;
        self
    }

    /// Override the object store (primarily for testing)
    pub fn store(mut self, store: Arc<dyn ModelStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Override the registry client (primarily for testing)
    pub fn registry_client(mut self, registry: Arc<dyn RegistryClient>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the Context
    pub fn build(self) -> Context {
        let registry_port = self.registry_port;
        let connect_timeout = self.connect_timeout;
        Context {
            store: self
                .store
                .unwrap_or_else(|| Arc::new(KubeModelStore::new(self.client.clone()))),
            registry: self.registry.unwrap_or_else(|| {
                Arc::new(GrpcRegistryClient::new(registry_port, connect_timeout))
            }),
            requeue_delay: self.requeue_delay,
        }
    }
}

/// Reconcile a Model
///
/// The cached object only supplies the identity; the Model is re-read so the
/// pass works against the latest `resourceVersion`.
#[instrument(skip(model, ctx), fields(model = %model.name_any(), namespace = ?model.namespace()))]
pub async fn reconcile(model: Arc<Model>, ctx: Arc<Context>) -> Result<Action, Error> {
    let start = Instant::now();
    let result = match model.namespace() {
        Some(namespace) => reconcile_model(&namespace, &model.name_any(), &ctx).await,
        None => Err(Error::validation_for(model.name_any(), "Model must be namespaced")),
    };
    record_reconcile(start.elapsed(), result.as_ref().err().map(Error::kind_label));
    result
}

/// Reconcile the Model with the given identity
pub async fn reconcile_model(namespace: &str, name: &str, ctx: &Context) -> Result<Action, Error> {
    let Some(model) = ctx.store.get_model(namespace, name).await? else {
        debug!("model no longer exists");
        return Ok(Action::await_change());
    };

    if model.metadata.deletion_timestamp.is_some() {
        debug!("model is being deleted");
        finalize_model(&model, namespace, ctx).await
    } else {
        converge(model, namespace, ctx).await
    }
}

/// Error policy for the Model controller
///
/// Retryable failures (conflicts, registry and server errors) are retried
/// after a fixed backoff from a fresh read. Errors that only a change to the
/// Model can fix wait for that change instead.
pub fn error_policy(model: Arc<Model>, error: &Error, _ctx: Arc<Context>) -> Action {
    if !error.is_retryable() {
        error!(?error, model = %model.name_any(), "reconciliation failed permanently");
        return Action::await_change();
    }
    if error.is_conflict() {
        warn!(model = %model.name_any(), %error, "model changed during reconcile, retrying");
    } else {
        error!(?error, model = %model.name_any(), "reconciliation failed");
    }
    Action::requeue(ERROR_REQUEUE_DELAY)
}

/// Eligible registry Pods in `namespace`, in list order
pub(crate) async fn eligible_pods(namespace: &str, ctx: &Context) -> Result<Vec<Pod>, Error> {
    Ok(ctx
        .store
        .list_pods(namespace)
        .await?
        .into_iter()
        .filter(|pod| is_registry_injected(pod))
        .collect())
}

async fn converge(model: Model, namespace: &str, ctx: &Context) -> Result<Action, Error> {
    let Some(plugin) = model.spec.plugin.clone() else {
        debug!("model has no plugin, nothing to install");
        return Ok(Action::await_change());
    };

    // The finalizer must be stored before anything is pushed to a registry
    let model = if has_finalizer(&model.metadata, MODEL_FINALIZER) {
        model
    } else {
        let mut updated = model;
        add_finalizer(&mut updated.metadata, MODEL_FINALIZER);
        info!("adding finalizer");
        ctx.store.update_model(&updated).await?
    };

    let pods = eligible_pods(namespace, ctx).await?;
    let mut scan = Scan::default();
    if scan.step_targets(&model, &plugin, &pods, ctx).await? == Step::Advanced {
        return Ok(Action::await_change());
    }
    if prune_stale_statuses(&model, namespace, ctx).await? == Step::Advanced {
        return Ok(Action::await_change());
    }

    if scan.needs_requeue {
        debug!(delay = ?ctx.requeue_delay, "waiting for registries to become ready");
        Ok(Action::requeue(ctx.requeue_delay))
    } else {
        Ok(Action::await_change())
    }
}
