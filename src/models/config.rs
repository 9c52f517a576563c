//! Allocation configuration.
//!
//! Configuration is usually built in code with the `with_*` builders, or
//! loaded from TOML:
//!
//! ```
//! use u_roadmap::models::{AllocationConfig, AllocationPolicy};
//!
//! let config = AllocationConfig::from_toml_str(r#"
//!     capacity_per_period = 20
//!     workdays_per_period = 10
//!     max_idle_days = 3
//!     policy = "LoadBalanced"
//!     roadmap_start = "2024-01-08"
//!     holidays = ["2024-01-15"]
//!
//!     [limits]
//!     max_passes = 5
//! "#).unwrap();
//!
//! assert_eq!(config.policy, AllocationPolicy::LoadBalanced);
//! assert_eq!(config.limits.max_passes, 5);
//! assert_eq!(config.limits.max_reallocations_per_story, 3);
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AllocationError;

/// How a developer is chosen among the available candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationPolicy {
    /// Prefer the developer who owns a dependency, then balance load.
    #[default]
    OwnershipFirst,
    /// Fewest assigned stories wins; ties by developer ID.
    LoadBalanced,
}

/// Team throughput: `capacity` story points every `workdays` workdays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Velocity {
    pub capacity: u32,
    pub workdays: u32,
}

impl Velocity {
    /// Creates a velocity, rejecting zero inputs.
    pub fn new(capacity: u32, workdays: u32) -> Result<Self, AllocationError> {
        let velocity = Self { capacity, workdays };
        velocity.validate()?;
        Ok(velocity)
    }

    pub fn validate(&self) -> Result<(), AllocationError> {
        if self.capacity == 0 || self.workdays == 0 {
            return Err(AllocationError::InvalidConfiguration(format!(
                "velocity must be positive (capacity {} per {} workdays)",
                self.capacity, self.workdays
            )));
        }
        Ok(())
    }

    /// Story points per workday.
    pub fn points_per_day(&self) -> f64 {
        f64::from(self.capacity) / f64::from(self.workdays)
    }
}

/// Bounds that guarantee termination of the allocation loops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairLimits {
    /// Maximum validate-and-repair passes.
    pub max_passes: usize,
    /// Reallocations allowed for one story within a run.
    pub max_reallocations_per_story: usize,
    /// Reallocations allowed across the whole run.
    pub max_reallocations_total: usize,
}

impl Default for RepairLimits {
    fn default() -> Self {
        Self {
            max_passes: 10,
            max_reallocations_per_story: 3,
            max_reallocations_total: 100,
        }
    }
}

/// Configuration of one allocation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    /// Story points completed per period.
    pub capacity_per_period: u32,
    /// Workdays in one period.
    pub workdays_per_period: u32,
    /// Maximum idle workdays between consecutive assignments. `None` = unconstrained.
    pub max_idle_days: Option<u32>,
    pub policy: AllocationPolicy,
    /// No story starts before this date.
    pub roadmap_start: Option<NaiveDate>,
    /// Non-working days besides weekends.
    pub holidays: Vec<NaiveDate>,
    pub limits: RepairLimits,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            capacity_per_period: 10,
            workdays_per_period: 10,
            max_idle_days: None,
            policy: AllocationPolicy::OwnershipFirst,
            roadmap_start: None,
            holidays: Vec::new(),
            limits: RepairLimits::default(),
        }
    }
}

impl AllocationConfig {
    /// Creates a configuration with the given velocity inputs.
    pub fn new(capacity_per_period: u32, workdays_per_period: u32) -> Self {
        Self {
            capacity_per_period,
            workdays_per_period,
            ..Self::default()
        }
    }

    pub fn with_max_idle_days(mut self, days: u32) -> Self {
        self.max_idle_days = Some(days);
        self
    }

    pub fn with_policy(mut self, policy: AllocationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_roadmap_start(mut self, date: NaiveDate) -> Self {
        self.roadmap_start = Some(date);
        self
    }

    pub fn with_holiday(mut self, date: NaiveDate) -> Self {
        self.holidays.push(date);
        self
    }

    pub fn with_limits(mut self, limits: RepairLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, AllocationError> {
        let config: Self = toml::from_str(source)
            .map_err(|e| AllocationError::InvalidConfiguration(e.message().to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Velocity derived from the period inputs.
    pub fn velocity(&self) -> Result<Velocity, AllocationError> {
        Velocity::new(self.capacity_per_period, self.workdays_per_period)
    }

    /// Rejects configurations the allocator cannot run with.
    pub fn validate(&self) -> Result<(), AllocationError> {
        self.velocity()?;
        if self.limits.max_passes == 0 {
            return Err(AllocationError::InvalidConfiguration(
                "limits.max_passes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
