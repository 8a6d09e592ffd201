//! Per-target install state machine
//!
//! Each registry Pod moves through `Pending -> Installing -> Installed`. A
//! convergence pass walks the eligible Pods in list order and performs the
//! first transition it finds, persisting it and stopping there. Pods whose
//! registry is not reachable yet are skipped and flag the pass for a delayed
//! requeue.

use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use tracing::{debug, info};

use modelreg_common::crd::{Model, ModelPhase, PluginSpec, RegistryStatus};
use modelreg_common::kube_utils::registry_address;
use modelreg_common::Error;

use crate::controller::Context;
use crate::registry::{ModelDescriptor, PushOutcome, RegistryTarget};

/// Result of one stage of a convergence pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// One mutation was persisted; the pass must stop
    Advanced,
    /// Nothing was changed
    NoChange,
}

/// What a single target needs next
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum TargetAction {
    /// No status entry yet: start tracking the Pod as Pending
    Track,
    /// Registry unreachable: leave the phase alone and requeue
    Wait,
    /// Registry reachable while Pending: move to Installing
    BeginInstall,
    /// Registry reachable while Installing: push the model
    Push(String),
    /// Already Installed
    Settled,
}

/// Decide the next action for a Pod given its recorded phase
pub(crate) fn next_action(phase: Option<ModelPhase>, pod: &Pod) -> TargetAction {
    match phase {
        None => TargetAction::Track,
        Some(ModelPhase::Installed) => TargetAction::Settled,
        Some(phase) => match (phase, registry_address(pod)) {
            (_, None) => TargetAction::Wait,
            (ModelPhase::Pending, Some(_)) => TargetAction::BeginInstall,
            (_, Some(address)) => TargetAction::Push(address.to_string()),
        },
    }
}

/// Scan over the eligible targets of one Model
#[derive(Debug, Default)]
pub(crate) struct Scan {
    /// Set when some target was skipped because its registry is not ready
    pub needs_requeue: bool,
}

impl Scan {
    /// Advance the first target that needs a change
    pub(crate) async fn step_targets(
        &mut self,
        model: &Model,
        plugin: &PluginSpec,
        pods: &[Pod],
        ctx: &Context,
    ) -> Result<Step, Error> {
        for pod in pods {
            if self.advance_target(model, plugin, pod, ctx).await? == Step::Advanced {
                return Ok(Step::Advanced);
            }
        }
        Ok(Step::NoChange)
    }

    async fn advance_target(
        &mut self,
        model: &Model,
        plugin: &PluginSpec,
        pod: &Pod,
        ctx: &Context,
    ) -> Result<Step, Error> {
        let pod_name = pod.name_any();
        let phase = model.status.as_ref().and_then(|s| s.phase_of(&pod_name));

        match next_action(phase, pod) {
            TargetAction::Track => {
                let mut updated = model.clone();
                updated
                    .ensure_status()
                    .registry_statuses
                    .push(RegistryStatus::pending(&pod_name));
                ctx.store.update_model_status(&updated).await?;
                info!(pod = %pod_name, "tracking registry pod");
                Ok(Step::Advanced)
            }
            TargetAction::Wait => {
                debug!(pod = %pod_name, ?phase, "registry not ready");
                self.needs_requeue = true;
                Ok(Step::NoChange)
            }
            TargetAction::BeginInstall => {
                write_phase(model, &pod_name, ModelPhase::Installing, ctx).await?;
                info!(pod = %pod_name, "registry ready, installing model");
                Ok(Step::Advanced)
            }
            TargetAction::Push(address) => {
                let target = RegistryTarget::new(&pod_name, address);
                let descriptor = ModelDescriptor::new(plugin, &model.spec);
                match ctx.registry.push_model(&target, &descriptor).await? {
                    PushOutcome::Installed => {
                        info!(pod = %pod_name, "model pushed to registry")
                    }
                    PushOutcome::AlreadyInstalled => {
                        debug!(pod = %pod_name, "model already installed in registry")
                    }
                }
                write_phase(model, &pod_name, ModelPhase::Installed, ctx).await?;
                Ok(Step::Advanced)
            }
            TargetAction::Settled => Ok(Step::NoChange),
        }
    }
}

async fn write_phase(
    model: &Model,
    pod_name: &str,
    phase: ModelPhase,
    ctx: &Context,
) -> Result<(), Error> {
    let mut updated = model.clone();
    if !updated.ensure_status().set_phase(pod_name, phase) {
        return Err(Error::internal_with_context(
            "install",
            format!("no registry status for pod {pod_name}"),
        ));
    }
    ctx.store.update_model_status(&updated).await?;
    Ok(())
}
