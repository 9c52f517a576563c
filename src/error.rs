//! Structural errors.
//!
//! These abort an allocation run before any story is touched. Run-level
//! conditions (deadlock, idleness, stabilization) are not errors; see
//! [`Diagnostic`](crate::models::Diagnostic).

use thiserror::Error;

/// A structural problem with the input or the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// The dependency relation contains a cycle (a self-reference is a 1-cycle).
    #[error("cyclic dependency: {} -> {}", .cycle.join(" -> "), .cycle.first().map(String::as_str).unwrap_or("?"))]
    CyclicDependency {
        /// Story IDs along the cycle, in traversal order.
        cycle: Vec<String>,
    },

    /// A story depends on an ID that is not in the backlog.
    #[error("story '{story}' depends on unknown story '{dependency}'")]
    UnknownDependency { story: String, dependency: String },

    #[error("duplicate story id '{0}'")]
    DuplicateStory(String),

    #[error("duplicate developer id '{0}'")]
    DuplicateDeveloper(String),

    #[error("story id must not be empty")]
    EmptyStoryId,

    /// Story size is not on the point scale.
    #[error("story '{story}' has size {size}, expected one of {:?}", crate::models::STORY_POINTS)]
    InvalidStorySize { story: String, size: u32 },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl AllocationError {
    /// Whether this error is a dependency cycle.
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::CyclicDependency { .. })
    }
}
