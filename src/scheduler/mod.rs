//! Story allocation and roadmap metrics.
//!
//! [`Allocator`] turns a validated backlog and a developer pool into a
//! dated roadmap in three phases:
//!
//! - **Initial allocation**: place unplaced stories in backlog order at
//!   their earliest start where a developer is free.
//! - **Stabilization**: repair dependency violations and calendar
//!   conflicts, preferring reallocation over shifting dates, until a pass
//!   changes nothing or the pass cap is hit.
//! - **Finalization**: assign schedule order, count what is left
//!   unresolved, and compute [`AllocationMetrics`] and [`RoadmapKpi`].
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems", Ch. 3-4
//! - Kolisch (1996), "Serial and parallel resource-constrained project
//!   scheduling methods revisited"

mod allocator;
mod metrics;
mod repair;
mod run;

pub use allocator::{AllocationOutcome, Allocator};
pub use metrics::{AllocationMetrics, RepairCounts, RoadmapKpi};
