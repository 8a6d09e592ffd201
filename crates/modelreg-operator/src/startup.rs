//! CRD installation on startup

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, CustomResourceExt};

use modelreg_common::crd::Model;

/// Field manager for server-side apply
pub const FIELD_MANAGER: &str = "modelreg-operator";

/// Install or update the Model CRD using server-side apply
///
/// The applied definition always matches this build of the operator.
pub async fn ensure_crds_installed(client: &Client) -> anyhow::Result<()> {
    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    let params = PatchParams::apply(FIELD_MANAGER).force();
    let name = Model::crd_name();

    tracing::info!(crd = %name, "Installing CRD...");
    crds.patch(name, &params, &Patch::Apply(&Model::crd()))
        .await
        .map_err(|e| anyhow::anyhow!("failed to install {} CRD: {}", name, e))?;
    tracing::info!(crd = %name, "CRD installed/updated");
    Ok(())
}

/// Model CRD rendered as YAML
pub fn model_crd_yaml() -> anyhow::Result<String> {
    serde_yaml::to_string(&Model::crd())
        .map_err(|e| anyhow::anyhow!("failed to serialize CRD: {}", e))
}
