//! Pure transition functions over [`Application`].
//!
//! Every operation takes the current record by reference and returns a fresh
//! one, so the caller decides when (and whether) the result is persisted. The
//! compare-and-swap write in the service layer is what serializes racing
//! reviewers; nothing here mutates shared state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{Application, ReviewerRole, StageKey, StageStatus};
use super::roles::RoleResolver;

/// Reviewer intent carried by a transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionAction {
    Approve,
    Reject,
    Escalate,
}

/// Outcome label attached to the notifier event after a successful transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Approved,
    Rejected,
    Escalated,
}

impl TransitionKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Escalated => "escalated",
        }
    }
}

/// Audit details stamped onto the acted-on stage.
#[derive(Debug, Clone, Default)]
pub struct ReviewStamp {
    pub reviewer_id: Option<String>,
    pub notes: Option<String>,
}

impl ReviewStamp {
    fn reviewer_id_or(&self, role: ReviewerRole) -> String {
        self.reviewer_id
            .clone()
            .unwrap_or_else(|| role.wire_name().to_string())
    }
}

/// Failures raised by the transition rules themselves. Store-level failures
/// (missing record, stale version) live in [`super::store::StoreError`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("application is terminal; no further review actions are permitted")]
    ApplicationTerminal,
    #[error("role {role} does not own the {stage} stage")]
    RoleStageMismatch { role: ReviewerRole, stage: StageKey },
    #[error("unknown reviewer role '{0}'")]
    UnknownRole(String),
    #[error("cannot escalate past the final stage")]
    NoNextStage,
}

/// Dispatch a transition by action.
pub fn apply(
    application: &Application,
    action: TransitionAction,
    role: ReviewerRole,
    stamp: &ReviewStamp,
    acted_at: DateTime<Utc>,
) -> Result<(Application, TransitionKind), EngineError> {
    match action {
        TransitionAction::Approve => {
            approve(application, role, stamp, acted_at).map(|next| (next, TransitionKind::Approved))
        }
        TransitionAction::Reject => {
            reject(application, role, stamp, acted_at).map(|next| (next, TransitionKind::Rejected))
        }
        TransitionAction::Escalate => {
            escalate(application, role, stamp).map(|next| (next, TransitionKind::Escalated))
        }
    }
}

/// Approve the current stage and activate the next one. Approving the final
/// stage exhausts the pipeline; the derived status becomes ready-for-payment
/// once no stage is left blocking.
pub fn approve(
    application: &Application,
    role: ReviewerRole,
    stamp: &ReviewStamp,
    acted_at: DateTime<Utc>,
) -> Result<Application, EngineError> {
    let index = active_stage_index(application, role)?;
    let mut next = application.clone();
    {
        let stage = &mut next.stages[index];
        stage.status = StageStatus::Approved;
        stage.reviewed_at = Some(acted_at);
        stage.reviewer_id = Some(stamp.reviewer_id_or(role));
        stage.notes = stamp.notes.clone();
    }
    advance(&mut next);

    debug_assert!(next.verify().is_ok(), "approve broke stage invariants");
    Ok(next)
}

/// Reject the current stage. The index stays pinned at the rejecting stage
/// and the application becomes terminal.
pub fn reject(
    application: &Application,
    role: ReviewerRole,
    stamp: &ReviewStamp,
    acted_at: DateTime<Utc>,
) -> Result<Application, EngineError> {
    let index = active_stage_index(application, role)?;
    let mut next = application.clone();
    let stage = &mut next.stages[index];
    stage.status = StageStatus::Rejected;
    stage.reviewed_at = Some(acted_at);
    stage.reviewer_id = Some(stamp.reviewer_id_or(role));
    stage.notes = stamp.notes.clone();

    debug_assert!(next.verify().is_ok(), "reject broke stage invariants");
    Ok(next)
}

/// Advance past the current stage without approving it. The bypassed stage
/// keeps status `under_review` and gains the `escalated` marker so audit
/// trails show the application skipped ordinary approval at that level.
pub fn escalate(
    application: &Application,
    role: ReviewerRole,
    stamp: &ReviewStamp,
) -> Result<Application, EngineError> {
    let index = active_stage_index(application, role)?;
    if index + 1 >= application.stages.len() {
        return Err(EngineError::NoNextStage);
    }

    let mut next = application.clone();
    {
        let stage = &mut next.stages[index];
        stage.escalated = true;
        stage.notes = Some(
            stamp
                .notes
                .clone()
                .unwrap_or_else(|| format!("escalated by {role}")),
        );
    }
    advance(&mut next);

    debug_assert!(next.verify().is_ok(), "escalate broke stage invariants");
    Ok(next)
}

/// Locate the stage the role may act on right now: the application must not
/// be terminal and the role must own the active stage or hold override.
fn active_stage_index(
    application: &Application,
    role: ReviewerRole,
) -> Result<usize, EngineError> {
    if application.is_terminal() {
        return Err(EngineError::ApplicationTerminal);
    }

    let index = application.current_stage_index;
    let stage = application
        .stages
        .get(index)
        .ok_or(EngineError::ApplicationTerminal)?;

    let grant = RoleResolver::resolve(role);
    if !grant.permits(stage.key) {
        return Err(EngineError::RoleStageMismatch {
            role,
            stage: stage.key,
        });
    }

    Ok(index)
}

fn advance(application: &mut Application) {
    application.current_stage_index += 1;
    let index = application.current_stage_index;
    if let Some(stage) = application.stages.get_mut(index) {
        stage.status = StageStatus::UnderReview;
    }
}
