use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pipeline::StagePipeline;

/// Identifier wrapper for submitted membership applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Checkpoint keys of the fixed review pipeline, in pipeline order.
///
/// `payment` is the terminal approval gate rather than a human review step:
/// clearing it marks the application ready for payment collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKey {
    Block,
    District,
    State,
    Payment,
}

impl StageKey {
    pub const fn ordered() -> [Self; 4] {
        [Self::Block, Self::District, Self::State, Self::Payment]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Block => "Block Review",
            Self::District => "District Review",
            Self::State => "State Review",
            Self::Payment => "Payment Gate",
        }
    }

    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::District => "district",
            Self::State => "state",
            Self::Payment => "payment",
        }
    }
}

impl fmt::Display for StageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Administrator roles that may act on the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewerRole {
    BlockAdmin,
    DistrictAdmin,
    StateAdmin,
    SuperAdmin,
}

impl ReviewerRole {
    pub const fn ordered() -> [Self; 4] {
        [
            Self::BlockAdmin,
            Self::DistrictAdmin,
            Self::StateAdmin,
            Self::SuperAdmin,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::BlockAdmin => "Block Admin",
            Self::DistrictAdmin => "District Admin",
            Self::StateAdmin => "State Admin",
            Self::SuperAdmin => "Super Admin",
        }
    }

    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::BlockAdmin => "block_admin",
            Self::DistrictAdmin => "district_admin",
            Self::StateAdmin => "state_admin",
            Self::SuperAdmin => "super_admin",
        }
    }
}

impl fmt::Display for ReviewerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Per-stage review state. `Pending` models a stage the pipeline has not
/// reached yet; only the stage at the current index is `UnderReview`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    UnderReview,
    Approved,
    Rejected,
}

impl StageStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// Application-level status, always derived from the stage list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    UnderReview,
    ReadyForPayment,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::UnderReview => "under_review",
            Self::ReadyForPayment => "ready_for_payment",
            Self::Rejected => "rejected",
        }
    }

    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::UnderReview)
    }
}

/// One checkpoint of an application's pipeline.
///
/// `reviewed_at`/`reviewer_id` are stamped only by a terminal action on the
/// stage (approve or reject). Escalation leaves the status `under_review` and
/// records only the `escalated` marker and `notes`, so audit trails show the
/// stage was bypassed rather than cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub sequence: u32,
    pub key: StageKey,
    pub reviewer_role: ReviewerRole,
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "is_false")]
    pub escalated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Stage {
    /// A cleared stage no longer blocks pipeline completion: it was either
    /// approved outright or bypassed via escalation.
    pub fn is_cleared(&self) -> bool {
        self.status == StageStatus::Approved || self.escalated
    }
}

/// The unit of workflow: a membership application and its per-stage history.
///
/// There is deliberately no stored status field; `Application::status` is the
/// only source of truth so no code path can set the status out of step with
/// the stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: ApplicationId,
    pub applicant_id: String,
    pub submitted_at: DateTime<Utc>,
    pub stages: Vec<Stage>,
    pub current_stage_index: usize,
}

impl Application {
    /// Build the record created at submission time: the full stage list with
    /// stage one under review and every later stage pending.
    pub fn submitted(
        id: ApplicationId,
        applicant_id: impl Into<String>,
        submitted_at: DateTime<Utc>,
        pipeline: &StagePipeline,
    ) -> Self {
        Self {
            id,
            applicant_id: applicant_id.into(),
            submitted_at,
            stages: pipeline.instantiate(),
            current_stage_index: 0,
        }
    }

    /// Derive the application status from the stage list.
    pub fn status(&self) -> ApplicationStatus {
        if self
            .stages
            .iter()
            .any(|stage| stage.status == StageStatus::Rejected)
        {
            ApplicationStatus::Rejected
        } else if self.stages.iter().all(Stage::is_cleared) {
            ApplicationStatus::ReadyForPayment
        } else {
            ApplicationStatus::UnderReview
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn current_stage(&self) -> Option<&Stage> {
        self.stages.get(self.current_stage_index)
    }

    /// Check the structural invariants of the stage list against the index.
    ///
    /// Earlier stages must be approved or escalated, the indexed stage must be
    /// the single active one (or the rejected stage that terminated the
    /// pipeline), and later stages must still be pending.
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        let len = self.stages.len();
        if self.current_stage_index > len {
            return Err(InvariantViolation::IndexOutOfBounds {
                index: self.current_stage_index,
                len,
            });
        }

        for (position, stage) in self.stages.iter().enumerate() {
            let expected = position as u32 + 1;
            if stage.sequence != expected {
                return Err(InvariantViolation::SequenceGap {
                    position,
                    sequence: stage.sequence,
                    expected,
                });
            }

            if position < self.current_stage_index {
                let escalated_open = stage.status == StageStatus::UnderReview && stage.escalated;
                if stage.status != StageStatus::Approved && !escalated_open {
                    return Err(InvariantViolation::UnsettledEarlierStage {
                        sequence: stage.sequence,
                        status: stage.status,
                    });
                }
            } else if position == self.current_stage_index {
                let active = stage.status == StageStatus::UnderReview && !stage.escalated;
                if !active && stage.status != StageStatus::Rejected {
                    return Err(InvariantViolation::InactiveCurrentStage {
                        sequence: stage.sequence,
                        status: stage.status,
                    });
                }
            } else if stage.status != StageStatus::Pending {
                return Err(InvariantViolation::PrematureLaterStage {
                    sequence: stage.sequence,
                    status: stage.status,
                });
            }
        }

        Ok(())
    }
}

/// Structural defects detectable in an application's stage list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("current stage index {index} out of bounds for {len} stages")]
    IndexOutOfBounds { index: usize, len: usize },
    #[error("stage at position {position} carries sequence {sequence}, expected {expected}")]
    SequenceGap {
        position: usize,
        sequence: u32,
        expected: u32,
    },
    #[error("stage {sequence} precedes the active stage but is {status:?} and not escalated")]
    UnsettledEarlierStage { sequence: u32, status: StageStatus },
    #[error("stage {sequence} is indexed as current but is {status:?}")]
    InactiveCurrentStage { sequence: u32, status: StageStatus },
    #[error("stage {sequence} follows the active stage but is already {status:?}")]
    PrematureLaterStage { sequence: u32, status: StageStatus },
}
