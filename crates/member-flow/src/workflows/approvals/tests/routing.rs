use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::{approval_router_with_service, build_service, read_json_body, submit};

fn patch_request(id: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("PATCH")
        .uri(format!("/api/applications/{id}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn patch_approve_returns_the_updated_application() {
    let (service, _, _) = build_service();
    let stored = submit(&service);
    let router = approval_router_with_service(service);

    let response = router
        .oneshot(patch_request(
            &stored.application.id.0,
            json!({ "action": "approve", "reviewerRole": "block_admin" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let application = payload.get("application").expect("application payload");

    assert_eq!(
        application.get("status").and_then(Value::as_str),
        Some("under_review")
    );
    assert_eq!(
        application.get("currentStageIndex").and_then(Value::as_u64),
        Some(1)
    );
    assert_eq!(application.get("version").and_then(Value::as_u64), Some(2));

    let stages = application
        .get("stages")
        .and_then(Value::as_array)
        .expect("stages");
    assert_eq!(
        stages[0].get("status").and_then(Value::as_str),
        Some("approved")
    );
    assert_eq!(
        stages[0].get("reviewerRole").and_then(Value::as_str),
        Some("block_admin")
    );
    assert_eq!(
        stages[1].get("status").and_then(Value::as_str),
        Some("under_review")
    );
}

#[tokio::test]
async fn patch_escalate_exposes_the_audit_marker() {
    let (service, _, _) = build_service();
    let stored = submit(&service);
    let router = approval_router_with_service(service);

    let response = router
        .oneshot(patch_request(
            &stored.application.id.0,
            json!({
                "action": "escalate",
                "reviewerRole": "block_admin",
                "notes": "needs district judgment"
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let stage = &payload["application"]["stages"][0];

    assert_eq!(stage.get("status").and_then(Value::as_str), Some("under_review"));
    assert_eq!(stage.get("escalated").and_then(Value::as_bool), Some(true));
    assert_eq!(
        stage.get("notes").and_then(Value::as_str),
        Some("needs district judgment")
    );
}

#[tokio::test]
async fn patch_unknown_role_maps_to_unprocessable() {
    let (service, _, _) = build_service();
    let stored = submit(&service);
    let router = approval_router_with_service(service);

    let response = router
        .oneshot(patch_request(
            &stored.application.id.0,
            json!({ "action": "approve", "reviewerRole": "village_admin" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("error"), Some(&json!("UnknownRole")));
}

#[tokio::test]
async fn patch_wrong_level_maps_to_forbidden() {
    let (service, _, _) = build_service();
    let stored = submit(&service);
    let router = approval_router_with_service(service);

    let response = router
        .oneshot(patch_request(
            &stored.application.id.0,
            json!({ "action": "approve", "reviewerRole": "district_admin" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("error"), Some(&json!("RoleStageMismatch")));
}

#[tokio::test]
async fn patch_on_terminal_application_maps_to_conflict() {
    let (service, _, _) = build_service();
    let stored = submit(&service);
    service
        .reject(&stored.application.id, "block_admin")
        .expect("rejection");
    let router = approval_router_with_service(service);

    let response = router
        .oneshot(patch_request(
            &stored.application.id.0,
            json!({ "action": "approve", "reviewerRole": "block_admin" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("error"), Some(&json!("ApplicationTerminal")));
}

#[tokio::test]
async fn patch_with_stale_expected_version_maps_to_conflict() {
    let (service, _, _) = build_service();
    let stored = submit(&service);
    service
        .approve(&stored.application.id, "block_admin")
        .expect("first approval");
    let router = approval_router_with_service(service);

    let response = router
        .oneshot(patch_request(
            &stored.application.id.0,
            json!({
                "action": "approve",
                "reviewerRole": "district_admin",
                "expectedVersion": 1
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("error"), Some(&json!("VersionConflict")));
}

#[tokio::test]
async fn patch_missing_application_maps_to_not_found() {
    let (service, _, _) = build_service();
    let router = approval_router_with_service(service);

    let response = router
        .oneshot(patch_request(
            "app-unknown",
            json!({ "action": "approve", "reviewerRole": "block_admin" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("error"), Some(&json!("NotFound")));
}

#[tokio::test]
async fn list_returns_every_application() {
    let (service, _, _) = build_service();
    submit(&service);
    submit(&service);
    let router = approval_router_with_service(service);

    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/applications")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let applications = payload
        .get("applications")
        .and_then(Value::as_array)
        .expect("applications array");
    assert_eq!(applications.len(), 2);
    assert!(applications[0].get("submittedAt").is_some());
}

#[tokio::test]
async fn dashboard_buckets_for_the_requested_role() {
    let (service, _, _) = build_service();
    let stored = submit(&service);
    submit(&service);
    service
        .approve(&stored.application.id, "block_admin")
        .expect("approval");
    let router = approval_router_with_service(service);

    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/dashboard/district_admin")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload.get("pending").and_then(Value::as_array).map(Vec::len),
        Some(1)
    );
    assert_eq!(
        payload.get("all").and_then(Value::as_array).map(Vec::len),
        Some(2)
    );
}

#[tokio::test]
async fn dashboard_rejects_unknown_roles() {
    let (service, _, _) = build_service();
    let router = approval_router_with_service(service);

    let response = router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/dashboard/janitor")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(payload.get("error"), Some(&json!("UnknownRole")));
}
