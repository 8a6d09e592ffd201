//! Pruning of status entries whose Pod has disappeared

use tracing::info;

use modelreg_common::crd::Model;
use modelreg_common::metrics::record_pruned_entry;
use modelreg_common::Error;

use crate::controller::Context;
use crate::install::Step;

/// Drop the first status entry whose Pod is confirmed gone
///
/// A Pod counts as gone only when a direct lookup reports it absent. Lookup
/// failures abort the pass instead of being read as absence.
pub(crate) async fn prune_stale_statuses(
    model: &Model,
    namespace: &str,
    ctx: &Context,
) -> Result<Step, Error> {
    for entry in model.registry_statuses() {
        if ctx.store.get_pod(namespace, &entry.pod_name).await?.is_some() {
            continue;
        }

        let mut updated = model.clone();
        updated.ensure_status().remove(&entry.pod_name);
        ctx.store.update_model_status(&updated).await?;
        record_pruned_entry();
        info!(pod = %entry.pod_name, "forgetting registry status of deleted pod");
        return Ok(Step::Advanced);
    }
    Ok(Step::NoChange)
}
