use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::buckets::{bucket, RoleBuckets};
use super::domain::{Application, ApplicationId};
use super::engine::{self, EngineError, ReviewStamp, TransitionAction};
use super::pipeline::StagePipeline;
use super::roles::RoleResolver;
use super::store::{
    ApplicationStore, Notifier, StoreError, StoredApplication, TransitionEvent, Version,
};

/// Body of `PATCH /api/applications/:id`, doubling as the uniform service
/// command. `expected_version` lets a caller that already read the record
/// demand the compare-and-swap at that version; otherwise the version read
/// within the same request is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub action: TransitionAction,
    pub reviewer_role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<Version>,
}

impl TransitionRequest {
    pub fn new(action: TransitionAction, reviewer_role: impl Into<String>) -> Self {
        Self {
            action,
            reviewer_role: reviewer_role.into(),
            reviewer_id: None,
            notes: None,
            expected_version: None,
        }
    }

    pub fn at_version(mut self, version: Version) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// Service composing the stage pipeline, application store, and notifier.
///
/// Each public operation is a single read-modify-write: read the versioned
/// record, run the pure transition, compare-and-swap, then publish the
/// notifier event. A stale version surfaces as `VersionConflict` for the
/// caller to re-read and retry; the service never retries on its own.
pub struct ApprovalService<S, N> {
    pipeline: Arc<StagePipeline>,
    store: Arc<S>,
    notifier: Arc<N>,
}

static APPLICATION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_application_id() -> ApplicationId {
    let id = APPLICATION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApplicationId(format!("app-{id:06}"))
}

impl<S, N> ApprovalService<S, N>
where
    S: ApplicationStore + 'static,
    N: Notifier + 'static,
{
    pub fn new(store: Arc<S>, notifier: Arc<N>) -> Self {
        Self::with_pipeline(StagePipeline::standard(), store, notifier)
    }

    pub fn with_pipeline(pipeline: StagePipeline, store: Arc<S>, notifier: Arc<N>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            store,
            notifier,
        }
    }

    pub fn pipeline(&self) -> &StagePipeline {
        &self.pipeline
    }

    /// Register a newly submitted application: full stage list, stage one
    /// under review. The registration front-end is an external collaborator;
    /// this is the seam it calls.
    pub fn submit(
        &self,
        applicant_id: impl Into<String>,
    ) -> Result<StoredApplication, ApprovalError> {
        let application = Application::submitted(
            next_application_id(),
            applicant_id,
            Utc::now(),
            &self.pipeline,
        );
        let stored = self.store.insert(application)?;
        info!(
            application = %stored.application.id.0,
            "membership application registered"
        );
        Ok(stored)
    }

    pub fn get(&self, id: &ApplicationId) -> Result<StoredApplication, ApprovalError> {
        Ok(self.store.get(id)?)
    }

    pub fn list(&self) -> Result<Vec<StoredApplication>, ApprovalError> {
        Ok(self.store.list()?)
    }

    /// Bucket the full application set for one reviewer role's dashboard.
    pub fn dashboard(&self, role_name: &str) -> Result<RoleBuckets, ApprovalError> {
        let role = RoleResolver::parse(role_name)?;
        let applications = self.store.list()?;
        Ok(bucket(&applications, role))
    }

    pub fn approve(
        &self,
        id: &ApplicationId,
        reviewer_role: &str,
    ) -> Result<StoredApplication, ApprovalError> {
        self.apply(id, TransitionRequest::new(TransitionAction::Approve, reviewer_role))
    }

    pub fn reject(
        &self,
        id: &ApplicationId,
        reviewer_role: &str,
    ) -> Result<StoredApplication, ApprovalError> {
        self.apply(id, TransitionRequest::new(TransitionAction::Reject, reviewer_role))
    }

    pub fn escalate(
        &self,
        id: &ApplicationId,
        reviewer_role: &str,
    ) -> Result<StoredApplication, ApprovalError> {
        self.apply(id, TransitionRequest::new(TransitionAction::Escalate, reviewer_role))
    }

    /// Apply one transition as an indivisible read-modify-write.
    pub fn apply(
        &self,
        id: &ApplicationId,
        request: TransitionRequest,
    ) -> Result<StoredApplication, ApprovalError> {
        let role = RoleResolver::parse(&request.reviewer_role)?;
        let current = self.store.get(id)?;
        let expected = request.expected_version.unwrap_or(current.version);

        let stamp = ReviewStamp {
            reviewer_id: request.reviewer_id,
            notes: request.notes,
        };
        let (next, kind) =
            engine::apply(&current.application, request.action, role, &stamp, Utc::now())?;
        let new_status = next.status();

        let stored = self.store.compare_and_swap(id, expected, next)?;
        info!(
            application = %id.0,
            action = kind.label(),
            role = role.wire_name(),
            status = new_status.label(),
            "review transition applied"
        );

        // Fire-and-forget: a notification failure must never unwind a
        // transition that already committed.
        let event = TransitionEvent {
            application_id: id.clone(),
            event: kind,
            actor_role: role,
            new_status,
        };
        if let Err(err) = self.notifier.publish(event) {
            warn!(application = %id.0, error = %err, "transition event dropped by notifier");
        }

        Ok(stored)
    }
}

/// Error raised by the approval service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApprovalError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApprovalError {
    /// Stable error-kind string exposed on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Engine(EngineError::ApplicationTerminal) => "ApplicationTerminal",
            Self::Engine(EngineError::RoleStageMismatch { .. }) => "RoleStageMismatch",
            Self::Engine(EngineError::UnknownRole(_)) => "UnknownRole",
            Self::Engine(EngineError::NoNextStage) => "NoNextStage",
            Self::Store(StoreError::NotFound) => "NotFound",
            Self::Store(StoreError::VersionConflict) => "VersionConflict",
            Self::Store(StoreError::Conflict) => "Conflict",
            Self::Store(StoreError::Unavailable(_)) => "StoreUnavailable",
        }
    }
}
