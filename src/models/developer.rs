//! Developer model.
//!
//! Developers carry no schedule state. Occupancy is derived from the
//! stories assigned to them.

use serde::{Deserialize, Serialize};

/// A developer that stories can be assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Developer {
    /// Unique developer identifier.
    pub id: String,
    /// Display name.
    pub name: String,
}

impl Developer {
    /// Creates a developer whose name defaults to its ID.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}
