//! Integration tests for the reconciler against a real API server
//!
//! The test namespace has no registry-injected Pods, so no registry calls are
//! made; these stories cover the finalizer lifecycle end to end.

use std::time::Duration;

use kube::api::{Api, DeleteParams, PostParams};
use kube::runtime::controller::Action;

use modelreg_common::crd::Model;
use modelreg_common::kube_utils::has_finalizer;
use modelreg_common::MODEL_FINALIZER;
use modelreg_model::{reconcile_model, Context};

use super::helpers::{cleanup_model, ensure_test_cluster, sample_model, TEST_NAMESPACE};

/// Story: a new Model gains the cleanup finalizer, and deleting it releases
/// the finalizer so the object disappears
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_model_finalizer_lifecycle() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let api: Api<Model> = Api::namespaced(client.clone(), TEST_NAMESPACE);
    let ctx = Context::new(client.clone());
    let name = "flow-finalizer";
    cleanup_model(&client, name).await;

    api.create(&PostParams::default(), &sample_model(name))
        .await
        .expect("failed to create model");

    let action = reconcile_model(TEST_NAMESPACE, name, &ctx)
        .await
        .expect("reconcile should succeed");
    assert_eq!(action, Action::await_change());

    let fetched = api.get(name).await.expect("failed to get model");
    assert!(has_finalizer(&fetched.metadata, MODEL_FINALIZER));

    api.delete(name, &DeleteParams::default())
        .await
        .expect("failed to delete model");

    reconcile_model(TEST_NAMESPACE, name, &ctx)
        .await
        .expect("finalize should succeed");

    // Deletion completes asynchronously once the finalizer is gone
    let mut gone = false;
    for _ in 0..10 {
        let current = api.get_opt(name).await.expect("failed to get model");
        if current.is_none() {
            gone = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    assert!(gone, "model should be deleted after finalization");
}

/// Story: reconciling a Model that was never created is a no-op
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_missing_model_is_ignored() {
    let client = ensure_test_cluster()
        .await
        .expect("failed to setup cluster");
    let ctx = Context::new(client);

    let action = reconcile_model(TEST_NAMESPACE, "never-created", &ctx)
        .await
        .expect("reconcile should succeed");
    assert_eq!(action, Action::await_change());
}
