//! Run metrics and roadmap KPIs.
//!
//! [`AllocationMetrics`] counts what one run did. [`RoadmapKpi`] measures
//! the resulting roadmap.
//!
//! # KPIs
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Roadmap end | Latest story end date |
//! | Makespan | Workdays from roadmap start to roadmap end (inclusive) |
//! | Busy workdays | Workdays a developer spends on stories |
//! | Utilization | Busy workdays / makespan |
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 1.2: Performance Measures

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Period, Story, WorkCalendar};

/// Repairs performed by the stabilization loop, by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairCounts {
    /// Moved to another developer, dates kept.
    pub reallocated: usize,
    /// Dates moved later.
    pub shifted: usize,
    /// Dates realigned after a size, velocity or calendar change.
    pub resized: usize,
    /// Moved to another developer to stay within the idle budget.
    pub idle_reallocated: usize,
}

impl RepairCounts {
    pub fn total(&self) -> usize {
        self.reallocated + self.shifted + self.resized + self.idle_reallocated
    }
}

/// Counters collected during one allocation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationMetrics {
    /// Stories in the input backlog.
    pub stories_processed: usize,
    pub stories_per_wave: BTreeMap<u32, usize>,
    /// Candidate start dates tried during initial allocation, per wave.
    pub placement_iterations_per_wave: BTreeMap<u32, usize>,
    /// Stories placed by initial allocation.
    pub initial_placements: usize,
    /// Successful reallocations (repair and idle).
    pub reallocations: usize,
    pub repairs: RepairCounts,
    /// Stabilization passes run.
    pub passes: usize,
    /// Placed stories still violating a dependency or calendar rule.
    pub unresolved_violations: usize,
    /// Stories left without developer or dates.
    pub unplaced: usize,
}

/// Roadmap performance indicators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoadmapKpi {
    /// Earliest story start.
    pub roadmap_start: Option<NaiveDate>,
    /// Latest story end.
    pub roadmap_end: Option<NaiveDate>,
    /// Workdays between start and end, inclusive.
    pub makespan_workdays: u32,
    pub busy_workdays_by_developer: BTreeMap<String, u32>,
    /// Busy workdays / makespan, per developer.
    pub utilization_by_developer: BTreeMap<String, f64>,
    /// Mean utilization over developers with at least one story.
    pub avg_utilization: f64,
}

impl RoadmapKpi {
    /// Computes KPIs over the scheduled stories.
    pub fn calculate(stories: &[Story], calendar: &WorkCalendar) -> Self {
        let scheduled: Vec<(&Story, Period)> = stories
            .iter()
            .filter(|s| s.developer_id.is_some())
            .filter_map(|s| Some((s, s.period()?)))
            .collect();

        let roadmap_start = scheduled.iter().map(|(_, p)| p.start).min();
        let roadmap_end = scheduled.iter().map(|(_, p)| p.end).max();
        let makespan_workdays = match (roadmap_start, roadmap_end) {
            (Some(start), Some(end)) => calendar.workdays_in(&Period::new(start, end)),
            _ => 0,
        };

        let mut busy_workdays_by_developer: BTreeMap<String, u32> = BTreeMap::new();
        for (story, period) in &scheduled {
            if let Some(developer_id) = &story.developer_id {
                *busy_workdays_by_developer
                    .entry(developer_id.clone())
                    .or_insert(0) += calendar.workdays_in(period);
            }
        }

        let utilization_by_developer: BTreeMap<String, f64> = if makespan_workdays == 0 {
            BTreeMap::new()
        } else {
            busy_workdays_by_developer
                .iter()
                .map(|(id, busy)| (id.clone(), f64::from(*busy) / f64::from(makespan_workdays)))
                .collect()
        };

        let avg_utilization = if utilization_by_developer.is_empty() {
            0.0
        } else {
            let sum: f64 = utilization_by_developer.values().sum();
            sum / utilization_by_developer.len() as f64
        };

        Self {
            roadmap_start,
            roadmap_end,
            makespan_workdays,
            busy_workdays_by_developer,
            utilization_by_developer,
            avg_utilization,
        }
    }

    /// Whether the roadmap meets the given quality thresholds.
    pub fn meets_thresholds(&self, max_makespan_workdays: u32, min_utilization: f64) -> bool {
        self.makespan_workdays <= max_makespan_workdays && self.avg_utilization >= min_utilization
    }
}
