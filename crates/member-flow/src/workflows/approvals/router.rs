use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use serde_json::json;
use tracing::debug;

use super::domain::ApplicationId;
use super::engine::EngineError;
use super::service::{ApprovalError, ApprovalService, TransitionRequest};
use super::store::{ApplicationStore, Notifier, StoreError, StoredApplication};

/// Router builder exposing the workflow endpoints consumed by the dashboard.
pub fn approval_router<S, N>(service: Arc<ApprovalService<S, N>>) -> Router
where
    S: ApplicationStore + 'static,
    N: Notifier + 'static,
{
    Router::new()
        .route("/api/applications", get(list_handler::<S, N>))
        .route(
            "/api/applications/:application_id",
            patch(transition_handler::<S, N>),
        )
        .route("/api/dashboard/:role", get(dashboard_handler::<S, N>))
        .with_state(service)
}

pub(crate) async fn list_handler<S, N>(
    State(service): State<Arc<ApprovalService<S, N>>>,
) -> Response
where
    S: ApplicationStore + 'static,
    N: Notifier + 'static,
{
    match service.list() {
        Ok(stored) => {
            let applications: Vec<_> = stored.iter().map(StoredApplication::view).collect();
            (
                StatusCode::OK,
                Json(json!({ "applications": applications })),
            )
                .into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn transition_handler<S, N>(
    State(service): State<Arc<ApprovalService<S, N>>>,
    Path(application_id): Path<String>,
    Json(request): Json<TransitionRequest>,
) -> Response
where
    S: ApplicationStore + 'static,
    N: Notifier + 'static,
{
    let id = ApplicationId(application_id);
    match service.apply(&id, request) {
        Ok(stored) => {
            (StatusCode::OK, Json(json!({ "application": stored.view() }))).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn dashboard_handler<S, N>(
    State(service): State<Arc<ApprovalService<S, N>>>,
    Path(role): Path<String>,
) -> Response
where
    S: ApplicationStore + 'static,
    N: Notifier + 'static,
{
    match service.dashboard(&role) {
        Ok(buckets) => (StatusCode::OK, Json(buckets)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: ApprovalError) -> Response {
    // Version conflicts legitimately recur under reviewer contention; keep
    // them out of the fault logs.
    if matches!(error, ApprovalError::Store(StoreError::VersionConflict)) {
        debug!(%error, "stale version on review transition");
    }

    let status = match &error {
        ApprovalError::Store(StoreError::NotFound) => StatusCode::NOT_FOUND,
        ApprovalError::Store(StoreError::Conflict | StoreError::VersionConflict) => {
            StatusCode::CONFLICT
        }
        ApprovalError::Store(StoreError::Unavailable(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        ApprovalError::Engine(EngineError::ApplicationTerminal) => StatusCode::CONFLICT,
        ApprovalError::Engine(EngineError::RoleStageMismatch { .. }) => StatusCode::FORBIDDEN,
        ApprovalError::Engine(EngineError::UnknownRole(_) | EngineError::NoNextStage) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
    };

    (status, Json(json!({ "error": error.kind() }))).into_response()
}
