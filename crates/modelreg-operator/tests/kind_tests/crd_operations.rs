//! Integration tests for Model CRD operations
//!
//! These tests tell the story of how a Model travels through the Kubernetes
//! API: its spec round-trips with the wire names other tooling expects, and
//! its status is written through the status subresource only.

use kube::api::{Api, ListParams, PostParams};

use modelreg_common::crd::{GetStateMode, Model, ModelPhase, ModelStatus, RegistryStatus};

use super::helpers::{cleanup_model, ensure_test_cluster, sample_model, TEST_NAMESPACE};

/// Story: an operator applies a devicesim Model and reads it back intact
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_model_spec_is_persisted() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let api: Api<Model> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let name = "crd-spec";
    cleanup_model(&client, name).await;

    api.create(&PostParams::default(), &sample_model(name))
        .await
        .expect("failed to create model");

    let fetched = api.get(name).await.expect("failed to get model");
    let plugin = fetched
        .spec
        .plugin
        .as_ref()
        .expect("plugin should be persisted");
    assert_eq!(plugin.type_, "devicesim");
    assert_eq!(plugin.get_state_mode, GetStateMode::OpState);
    assert_eq!(fetched.spec.modules.len(), 1);
    assert!(fetched.spec.files.contains_key("devicesim@2019-06-10.yang"));

    let listed = api
        .list(&ListParams::default())
        .await
        .expect("failed to list models");
    assert!(listed
        .items
        .iter()
        .any(|m| m.metadata.name.as_deref() == Some(name)));

    cleanup_model(&client, name).await;
}

/// Story: registry progress is recorded through the status subresource
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_status_subresource_is_independent_of_spec() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let api: Api<Model> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let name = "crd-status";
    cleanup_model(&client, name).await;

    let mut created = api
        .create(&PostParams::default(), &sample_model(name))
        .await
        .expect("failed to create model");

    created.status = Some(ModelStatus {
        registry_statuses: vec![RegistryStatus {
            pod_name: "onos-config-0".to_string(),
            phase: ModelPhase::Installing,
        }],
    });
    let data = serde_json_bytes(&created);
    let updated = api
        .replace_status(name, &PostParams::default(), data)
        .await
        .expect("failed to replace status");
    assert_eq!(updated.registry_statuses()[0].phase, ModelPhase::Installing);

    // A stale resourceVersion is rejected rather than merged
    let stale = serde_json_bytes(&created);
    let err = api
        .replace_status(name, &PostParams::default(), stale)
        .await
        .expect_err("stale write should conflict");
    assert!(matches!(err, kube::Error::Api(ref e) if e.code == 409));

    cleanup_model(&client, name).await;
}

fn serde_json_bytes(model: &Model) -> Vec<u8> {
    serde_json::to_vec(model).expect("model should serialize")
}
