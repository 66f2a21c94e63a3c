use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Application, ApplicationId, ApplicationStatus, ReviewerRole, Stage};
use super::engine::TransitionKind;

/// Monotonically increasing optimistic-concurrency token. Compared on every
/// write; a mismatch means another reviewer won the race.
pub type Version = u64;

/// Versioned record handed out by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredApplication {
    pub application: Application,
    pub version: Version,
}

impl StoredApplication {
    /// Wire representation: the record plus its derived status and version.
    pub fn view(&self) -> ApplicationView {
        ApplicationView {
            id: self.application.id.clone(),
            applicant_id: self.application.applicant_id.clone(),
            submitted_at: self.application.submitted_at,
            current_stage_index: self.application.current_stage_index,
            status: self.application.status(),
            stages: self.application.stages.clone(),
            version: self.version,
        }
    }
}

/// JSON shape consumed by the dashboard collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationView {
    pub id: ApplicationId,
    pub applicant_id: String,
    pub submitted_at: DateTime<Utc>,
    pub current_stage_index: usize,
    pub status: ApplicationStatus,
    pub stages: Vec<Stage>,
    pub version: Version,
}

/// Storage contract for the durable application set. All workflow mutations
/// go through `compare_and_swap`; there is no direct-write path.
pub trait ApplicationStore: Send + Sync {
    fn insert(&self, application: Application) -> Result<StoredApplication, StoreError>;
    fn get(&self, id: &ApplicationId) -> Result<StoredApplication, StoreError>;
    fn compare_and_swap(
        &self,
        id: &ApplicationId,
        expected: Version,
        application: Application,
    ) -> Result<StoredApplication, StoreError>;
    fn list(&self) -> Result<Vec<StoredApplication>, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("application already exists")]
    Conflict,
    #[error("application not found")]
    NotFound,
    #[error("stale version; re-read and retry")]
    VersionConflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Fire-and-forget payload handed to the notification collaborator after a
/// successful transition. Delivery (email/SMS/WhatsApp) is not this crate's
/// concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionEvent {
    pub application_id: ApplicationId,
    pub event: TransitionKind,
    pub actor_role: ReviewerRole,
    pub new_status: ApplicationStatus,
}

/// Outbound notification hook.
pub trait Notifier: Send + Sync {
    fn publish(&self, event: TransitionEvent) -> Result<(), NotifyError>;
}

/// Notification dispatch error.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
