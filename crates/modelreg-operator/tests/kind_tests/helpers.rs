//! Test helpers for integration tests
//!
//! Provides utilities for managing the kind cluster and test namespaces.

use std::collections::BTreeMap;
use std::process::Command;
use std::sync::OnceLock;

use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, PostParams};
use kube::{Client, Config};
use tokio::sync::OnceCell;

use modelreg_common::crd::{GetStateMode, Model, ModelSpec, ModuleSpec, PluginSpec};
use modelreg_operator::startup::ensure_crds_installed;

/// Name of the kind cluster used for integration tests
pub const TEST_CLUSTER_NAME: &str = "modelreg-integration-test";

/// Namespace all test Models live in
pub const TEST_NAMESPACE: &str = "modelreg-test";

/// Global lock to ensure cluster is created only once
static CLUSTER_INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// Track if CRD and namespace have been installed (async-safe)
static CRD_INSTALLED: OnceCell<Result<(), String>> = OnceCell::const_new();

/// Check if a kind cluster with the given name exists
pub fn kind_cluster_exists(name: &str) -> bool {
    let output = Command::new("kind")
        .args(["get", "clusters"])
        .output()
        .expect("failed to run kind");

    let clusters = String::from_utf8_lossy(&output.stdout);
    clusters.lines().any(|line| line.trim() == name)
}

/// Create a kind cluster for testing
pub fn create_kind_cluster(name: &str) -> Result<(), String> {
    if kind_cluster_exists(name) {
        println!("Kind cluster '{name}' already exists, reusing it");
        return Ok(());
    }

    println!("Creating kind cluster '{name}'...");
    let output = Command::new("kind")
        .args(["create", "cluster", "--name", name, "--wait", "60s"])
        .output()
        .map_err(|e| format!("failed to run kind: {e}"))?;

    if !output.status.success() {
        return Err(format!(
            "failed to create kind cluster: {}",
            String::from_utf8_lossy(&output.stderr)
        ));
    }

    println!("Kind cluster '{name}' created successfully");
    Ok(())
}

/// Create a Kubernetes client connected to the test cluster
pub async fn create_test_client() -> Result<Client, String> {
    let context_name = format!("kind-{TEST_CLUSTER_NAME}");

    let config = Config::from_kubeconfig(&kube::config::KubeConfigOptions {
        context: Some(context_name),
        ..Default::default()
    })
    .await
    .map_err(|e| format!("failed to load kubeconfig: {e}"))?;

    Client::try_from(config).map_err(|e| format!("failed to create client: {e}"))
}

async fn ensure_namespace(client: &Client) -> Result<(), String> {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    let ns = Namespace {
        metadata: ObjectMeta {
            name: Some(TEST_NAMESPACE.to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    match namespaces.create(&PostParams::default(), &ns).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(e)) if e.code == 409 => Ok(()),
        Err(e) => Err(format!("failed to create namespace: {e}")),
    }
}

/// Ensure the test cluster is ready (cluster created once, CRD applied once)
///
/// Returns a fresh Client for each call - clients should not be shared across test threads.
pub async fn ensure_test_cluster() -> Result<Client, String> {
    let cluster_result = CLUSTER_INIT.get_or_init(|| create_kind_cluster(TEST_CLUSTER_NAME));
    cluster_result.clone()?;

    let client = create_test_client().await?;

    let crd_result = CRD_INSTALLED
        .get_or_init(|| async {
            let client = create_test_client().await?;
            ensure_crds_installed(&client)
                .await
                .map_err(|e| format!("failed to install CRD: {e}"))?;
            // Give the API server a moment to establish the new CRD
            tokio::time::sleep(std::time::Duration::from_secs(2)).await;
            ensure_namespace(&client).await
        })
        .await;
    crd_result.clone()?;

    Ok(client)
}

/// Sample devicesim Model
pub fn sample_model(name: &str) -> Model {
    let mut model = Model::new(
        name,
        ModelSpec {
            plugin: Some(PluginSpec {
                type_: "devicesim".to_string(),
                version: "1.0.0".to_string(),
                get_state_mode: GetStateMode::OpState,
            }),
            modules: vec![ModuleSpec {
                name: "devicesim".to_string(),
                organization: "Open Networking Foundation".to_string(),
                revision: "2019-06-10".to_string(),
                file: "devicesim@2019-06-10.yang".to_string(),
            }],
            files: BTreeMap::from([(
                "devicesim@2019-06-10.yang".to_string(),
                "module devicesim {}".to_string(),
            )]),
        },
    );
    model.metadata.namespace = Some(TEST_NAMESPACE.to_string());
    model
}

/// Delete a Model, stripping finalizers first so it cannot get stuck
pub async fn cleanup_model(client: &Client, name: &str) {
    let api: Api<Model> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    if let Ok(Some(mut model)) = api.get_opt(name).await {
        model.metadata.finalizers = None;
        let _ = api.replace(name, &PostParams::default(), &model).await;
    }
    let _ = api.delete(name, &DeleteParams::default()).await;
}
