//! Multi-level approval workflow for membership applications.
//!
//! A submitted application carries a fixed, ordered stage list (block,
//! district, state, payment); reviewers approve, reject, or escalate the
//! active stage, and the application status is always derived from the stage
//! list. Concurrent reviewers are serialized by the store's compare-and-swap
//! contract rather than by locks.

pub mod buckets;
pub mod domain;
pub mod engine;
pub mod pipeline;
pub mod roles;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use buckets::{bucket, RoleBuckets};
pub use domain::{
    Application, ApplicationId, ApplicationStatus, InvariantViolation, ReviewerRole, Stage,
    StageKey, StageStatus,
};
pub use engine::{EngineError, ReviewStamp, TransitionAction, TransitionKind};
pub use pipeline::{StagePipeline, StageTemplate};
pub use roles::{RoleGrant, RoleResolver};
pub use router::approval_router;
pub use service::{ApprovalError, ApprovalService, TransitionRequest};
pub use store::{
    ApplicationStore, ApplicationView, Notifier, NotifyError, StoreError, StoredApplication,
    TransitionEvent, Version,
};
