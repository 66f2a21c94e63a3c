use super::domain::{ReviewerRole, StageKey};
use super::engine::EngineError;

/// Stage ownership granted to a reviewer role. `override_any` marks the
/// top-level role that may act on whatever stage is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleGrant {
    pub stage: StageKey,
    pub override_any: bool,
}

impl RoleGrant {
    /// Whether this grant permits acting on the given current stage.
    pub fn permits(self, current: StageKey) -> bool {
        self.override_any || self.stage == current
    }
}

/// The single role-to-stage lookup consumed by every permission check.
///
/// Keeping the mapping in one table (rather than per-handler branching) is
/// what guarantees the engine, the bucketing service, and the HTTP layer can
/// never drift apart on who owns which stage.
#[derive(Debug, Default, Clone, Copy)]
pub struct RoleResolver;

const GRANTS: [(ReviewerRole, RoleGrant); 4] = [
    (
        ReviewerRole::BlockAdmin,
        RoleGrant {
            stage: StageKey::Block,
            override_any: false,
        },
    ),
    (
        ReviewerRole::DistrictAdmin,
        RoleGrant {
            stage: StageKey::District,
            override_any: false,
        },
    ),
    (
        ReviewerRole::StateAdmin,
        RoleGrant {
            stage: StageKey::State,
            override_any: false,
        },
    ),
    (
        ReviewerRole::SuperAdmin,
        RoleGrant {
            stage: StageKey::Payment,
            override_any: true,
        },
    ),
];

impl RoleResolver {
    /// Pure lookup of the grant for a typed role.
    pub fn resolve(role: ReviewerRole) -> RoleGrant {
        GRANTS
            .iter()
            .find(|(candidate, _)| *candidate == role)
            .map(|(_, grant)| *grant)
            .expect("grant table covers every reviewer role")
    }

    /// Parse a wire role name; unknown names are a caller error, not a panic.
    pub fn parse(name: &str) -> Result<ReviewerRole, EngineError> {
        let trimmed = name.trim();
        ReviewerRole::ordered()
            .into_iter()
            .find(|role| role.wire_name() == trimmed)
            .ok_or_else(|| EngineError::UnknownRole(trimmed.to_string()))
    }
}
