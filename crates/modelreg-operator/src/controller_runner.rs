//! Controller runner - builds the Model controller future
//!
//! The controller watches Models directly and re-triggers them from two
//! secondary watches, Pods and Models, both mapped namespace-wide through the
//! controller's own Model cache.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::core::v1::Pod;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client};

use modelreg_common::crd::Model;
use modelreg_model::{error_policy, models_for_model, models_for_pod, reconcile, Context};

use crate::config::ControllerConfig;

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
/// This forces the API server to close the watch before the client times out,
/// preventing "body read timed out" errors on idle watches.
const WATCH_TIMEOUT_SECS: u32 = 25;

/// Build the reconciliation context from configuration
pub fn build_context(client: Client, config: &ControllerConfig) -> Context {
    Context::builder(client)
        .registry_port(config.registry_port)
        .connect_timeout(config.registry_connect_timeout())
        .requeue_delay(config.requeue_delay())
        .build()
}

/// Build the Model controller future
///
/// Runs until SIGTERM or SIGINT.
pub fn build_model_controller(
    client: Client,
    config: &ControllerConfig,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    let ctx = Arc::new(build_context(client.clone(), config));

    let (models, pods): (Api<Model>, Api<Pod>) = match config.watch_namespace() {
        Some(ns) => {
            tracing::info!(namespace = %ns, "Watching a single namespace");
            (
                Api::namespaced(client.clone(), ns),
                Api::namespaced(client, ns),
            )
        }
        None => (Api::all(client.clone()), Api::all(client)),
    };

    let controller = Controller::new(
        models.clone(),
        WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS),
    );
    let cache_for_pods = controller.store();
    let cache_for_models = controller.store();

    tracing::info!("- Model controller");

    Box::pin(
        controller
            .watches(
                pods,
                WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS),
                move |pod| models_for_pod(&cache_for_pods, &pod),
            )
            .watches(
                models,
                WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS),
                move |model| models_for_model(&cache_for_models, &model),
            )
            .shutdown_on_signal()
            .run(reconcile, error_policy, ctx)
            .for_each(log_reconcile_result("Model")),
    )
}

/// Creates a closure for logging reconciliation results.
fn log_reconcile_result<T: std::fmt::Debug, E: std::fmt::Debug>(
    controller_name: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(action) => tracing::debug!(?action, "{} reconciliation completed", controller_name),
            Err(e) => tracing::error!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}
