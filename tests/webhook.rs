//! End-to-end review pipeline tests
//!
//! Drives a full admission review through the HTTP transport: YAML config in,
//! review envelope in, patched envelope out.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use http_body_util::BodyExt as _;
use serde_json::{json, Value};
use tower::ServiceExt as _;

use phalanx::admission::ignore::IgnoreChain;
use phalanx::admission::{MutatorConfig, PodMutator};
use phalanx::mutation::PodMutation;
use phalanx::webhook::webhook_router;

const MUTATION_CONFIG: &str = r#"
apiVersion: phalanx.dev/v1
kind: PodMutation
spec:
  template:
    metadata:
      annotations:
        supercool: alsotrue
"#;

fn router(ignore_host_network: bool) -> axum::Router {
    let mutation = PodMutation::decode(MUTATION_CONFIG.as_bytes()).expect("valid config");
    let ignore = IgnoreChain::from_settings(ignore_host_network, &[], &[]);
    let reviewer = Arc::new(PodMutator::new(Arc::new(mutation), MutatorConfig { ignore }));
    webhook_router(reviewer)
}

fn review_envelope(pod: Value) -> Value {
    json!({
        "apiVersion": "admission.k8s.io/v1",
        "kind": "AdmissionReview",
        "request": {
            "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
            "kind": {"group": "", "version": "v1", "kind": "Pod"},
            "resource": {"group": "", "version": "v1", "resource": "pods"},
            "namespace": "coolnamespace",
            "name": "coolpod",
            "object": pod,
        },
    })
}

fn cool_pod(host_network: bool) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {
            "name": "coolpod",
            "namespace": "coolnamespace",
            "annotations": {"cool": "true"},
        },
        "spec": {
            "hostNetwork": host_network,
            "containers": [{"name": "coolcontainer", "image": "coolimage:coolest"}],
        },
    })
}

async fn post(router: axum::Router, body: Value) -> (StatusCode, Value) {
    let request = Request::post("/webhook")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn pod_is_mutated_with_an_annotation_patch() {
    let (status, envelope) = post(router(false), review_envelope(cool_pod(false))).await;
    assert_eq!(status, StatusCode::OK);

    let response = &envelope["response"];
    assert_eq!(response["allowed"], json!(true));
    assert_eq!(response["uid"], json!("705ab4f5-6393-11e8-b7cc-42010a800002"));
    assert_eq!(response["patchType"], json!("JSONPatch"));

    let patch = BASE64
        .decode(response["patch"].as_str().expect("patch present"))
        .expect("patch is base64");
    assert_eq!(
        String::from_utf8(patch).unwrap(),
        r#"[{"op":"add","path":"/metadata/annotations/supercool","value":"alsotrue"}]"#
    );
}

#[tokio::test]
async fn host_network_pod_is_allowed_unmodified() {
    let (status, envelope) = post(router(true), review_envelope(cool_pod(true))).await;
    assert_eq!(status, StatusCode::OK);

    let response = &envelope["response"];
    assert_eq!(response["allowed"], json!(true));
    assert!(response.get("patch").is_none());
    assert!(response.get("patchType").is_none());
}

#[tokio::test]
async fn non_pod_resource_is_rejected() {
    let mut envelope = review_envelope(cool_pod(false));
    envelope["request"]["resource"] = json!({"group": "", "version": "v1", "resource": "configmaps"});
    let (status, envelope) = post(router(false), envelope).await;
    assert_eq!(status, StatusCode::OK);

    let response = &envelope["response"];
    assert_eq!(response["allowed"], json!(false));
    assert_eq!(response["result"]["reason"], json!("Invalid"));
    let message = response["result"]["message"].as_str().unwrap();
    assert!(message.contains("pods"), "{message}");
    assert!(message.contains("configmaps"), "{message}");
}
