use super::domain::{ReviewerRole, Stage, StageKey, StageStatus};

/// One checkpoint definition in the fixed pipeline: which stage, owned by
/// which reviewer role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTemplate {
    pub key: StageKey,
    pub reviewer_role: ReviewerRole,
}

/// Static, process-wide stage table. Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct StagePipeline {
    templates: Vec<StageTemplate>,
}

impl StagePipeline {
    /// The portal's standard four-level chain: block, district, and state
    /// review followed by the payment gate.
    pub fn standard() -> Self {
        Self {
            templates: vec![
                StageTemplate {
                    key: StageKey::Block,
                    reviewer_role: ReviewerRole::BlockAdmin,
                },
                StageTemplate {
                    key: StageKey::District,
                    reviewer_role: ReviewerRole::DistrictAdmin,
                },
                StageTemplate {
                    key: StageKey::State,
                    reviewer_role: ReviewerRole::StateAdmin,
                },
                StageTemplate {
                    key: StageKey::Payment,
                    reviewer_role: ReviewerRole::SuperAdmin,
                },
            ],
        }
    }

    pub fn templates(&self) -> &[StageTemplate] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn position_of(&self, key: StageKey) -> Option<usize> {
        self.templates
            .iter()
            .position(|template| template.key == key)
    }

    /// Materialize the stage list for a freshly submitted application: stage
    /// one under review, all later stages pending.
    pub fn instantiate(&self) -> Vec<Stage> {
        self.templates
            .iter()
            .enumerate()
            .map(|(position, template)| Stage {
                sequence: position as u32 + 1,
                key: template.key,
                reviewer_role: template.reviewer_role,
                status: if position == 0 {
                    StageStatus::UnderReview
                } else {
                    StageStatus::Pending
                },
                escalated: false,
                reviewed_at: None,
                reviewer_id: None,
                notes: None,
            })
            .collect()
    }
}

impl Default for StagePipeline {
    fn default() -> Self {
        Self::standard()
    }
}
