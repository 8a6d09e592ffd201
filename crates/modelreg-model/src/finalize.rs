//! Deletion path: uninstall from every registry, then release the finalizer

use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{debug, info};

use modelreg_common::crd::Model;
use modelreg_common::kube_utils::{has_finalizer, pod_ip, remove_finalizer};
use modelreg_common::{Error, MODEL_FINALIZER};

use crate::controller::{eligible_pods, Context};
use crate::registry::{DeleteOutcome, RegistryTarget};

/// Remove the Model from all eligible registries and drop the finalizer
///
/// Every eligible Pod is visited in one pass. The first registry failure
/// aborts the pass with the finalizer still in place; the retry revisits all
/// Pods, relying on delete treating an absent model as success.
pub(crate) async fn finalize_model(
    model: &Model,
    namespace: &str,
    ctx: &Context,
) -> Result<Action, Error> {
    let Some(plugin) = &model.spec.plugin else {
        return Ok(Action::await_change());
    };
    if !has_finalizer(&model.metadata, MODEL_FINALIZER) {
        return Ok(Action::await_change());
    }

    for pod in &eligible_pods(namespace, ctx).await? {
        let pod_name = pod.name_any();
        // Without an IP the registry never served this model
        let Some(address) = pod_ip(pod) else {
            debug!(pod = %pod_name, "skipping pod without an address");
            continue;
        };

        let target = RegistryTarget::new(&pod_name, address);
        match ctx
            .registry
            .delete_model(&target, &plugin.type_, &plugin.version)
            .await?
        {
            DeleteOutcome::Deleted => info!(pod = %pod_name, "model deleted from registry"),
            DeleteOutcome::NotInstalled => {
                debug!(pod = %pod_name, "model was not installed in registry")
            }
        }
    }

    let mut updated = model.clone();
    remove_finalizer(&mut updated.metadata, MODEL_FINALIZER);
    ctx.store.update_model(&updated).await?;
    info!(namespace, "model finalized");
    Ok(Action::await_change())
}
