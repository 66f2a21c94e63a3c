//! Workflow subsystems of the membership portal core.

pub mod approvals;
