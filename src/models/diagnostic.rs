//! Run-level diagnostics.
//!
//! Diagnostics flag conditions the allocator could not fully resolve. They
//! never abort a run; the best-effort schedule is returned alongside them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A non-fatal condition reported by an allocation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Diagnostic {
    /// A full sweep placed nothing; these stories stay unassigned.
    AllocationDeadlock { story_ids: Vec<String> },
    /// A developer's idle gap before a story exceeds the configured budget.
    IdleThresholdViolation {
        story_id: String,
        developer_id: String,
        idle_days: u32,
        limit: u32,
    },
    /// The repair loop hit its pass cap before reaching a fixed point.
    StabilizationLimitReached { passes_run: usize },
    /// A repair found no alternative developer for the story's period.
    FailedReallocation {
        story_id: String,
        developer_id: String,
    },
}

/// Discriminant of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DiagnosticKind {
    AllocationDeadlock,
    IdleThresholdViolation,
    StabilizationLimitReached,
    FailedReallocation,
}

impl Diagnostic {
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Self::AllocationDeadlock { .. } => DiagnosticKind::AllocationDeadlock,
            Self::IdleThresholdViolation { .. } => DiagnosticKind::IdleThresholdViolation,
            Self::StabilizationLimitReached { .. } => DiagnosticKind::StabilizationLimitReached,
            Self::FailedReallocation { .. } => DiagnosticKind::FailedReallocation,
        }
    }

    /// Stories this diagnostic is about.
    pub fn story_ids(&self) -> Vec<&str> {
        match self {
            Self::AllocationDeadlock { story_ids } => story_ids.iter().map(String::as_str).collect(),
            Self::IdleThresholdViolation { story_id, .. }
            | Self::FailedReallocation { story_id, .. } => vec![story_id.as_str()],
            Self::StabilizationLimitReached { .. } => Vec::new(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationDeadlock { story_ids } => {
                write!(f, "allocation deadlock: {} unplaced", story_ids.join(", "))
            }
            Self::IdleThresholdViolation {
                story_id,
                developer_id,
                idle_days,
                limit,
            } => write!(
                f,
                "developer '{developer_id}' idle {idle_days} workdays before '{story_id}' (limit {limit})"
            ),
            Self::StabilizationLimitReached { passes_run } => {
                write!(f, "schedule not stable after {passes_run} repair passes")
            }
            Self::FailedReallocation {
                story_id,
                developer_id,
            } => write!(
                f,
                "no developer other than '{developer_id}' is free for '{story_id}'"
            ),
        }
    }
}
