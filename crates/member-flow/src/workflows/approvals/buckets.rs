use serde::Serialize;

use super::domain::{ApplicationStatus, ReviewerRole, StageStatus};
use super::roles::RoleResolver;
use super::store::{ApplicationView, StoredApplication};

/// Dashboard classification of the application set for one reviewer role.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RoleBuckets {
    pub pending: Vec<ApplicationView>,
    pub approved: Vec<ApplicationView>,
    pub rejected: Vec<ApplicationView>,
    pub all: Vec<ApplicationView>,
}

/// Classify applications into pending/approved/rejected/all for the
/// requesting role.
///
/// Stateless by construction: the result is re-derived from whatever
/// application set the caller just read, and must never be cached as mutable
/// truth. This function has no failure mode — work it cannot attribute to the
/// requesting role is left out of the role buckets instead.
pub fn bucket(applications: &[StoredApplication], role: ReviewerRole) -> RoleBuckets {
    let grant = RoleResolver::resolve(role);
    let mut buckets = RoleBuckets::default();

    for stored in applications {
        let view = stored.view();
        buckets.all.push(view.clone());

        match stored.application.status() {
            ApplicationStatus::Rejected => buckets.rejected.push(view),
            // Terminal approval reads as approved at every reviewer level.
            ApplicationStatus::ReadyForPayment => buckets.approved.push(view),
            ApplicationStatus::UnderReview => match stored.application.current_stage() {
                // The role's only live work item: its own stage, currently
                // active. Applications queued at another level are counted in
                // `all` alone.
                Some(stage)
                    if stage.key == grant.stage && stage.status == StageStatus::UnderReview =>
                {
                    buckets.pending.push(view)
                }
                _ => {}
            },
        }
    }

    buckets
}
