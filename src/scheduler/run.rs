//! Per-run allocation state.

use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::warn;

use super::AllocationMetrics;
use crate::models::{Developer, Diagnostic, Period, RepairLimits, Story};

/// State owned by one allocation run and discarded afterwards.
///
/// Stories keep their input order; `order` holds the backlog processing
/// order as indices into `stories`.
#[derive(Debug)]
pub(crate) struct AllocationRun {
    pub stories: Vec<Story>,
    pub order: Vec<usize>,
    /// Expected duration of each story under the current velocity.
    pub durations: Vec<u32>,
    index: HashMap<String, usize>,
    reallocation_attempts: usize,
    attempts_by_story: Vec<usize>,
    pub diagnostics: Vec<Diagnostic>,
    pub metrics: AllocationMetrics,
}

impl AllocationRun {
    pub fn new(stories: Vec<Story>, order: Vec<usize>, durations: Vec<u32>) -> Self {
        let index = stories
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        let len = stories.len();
        Self {
            stories,
            order,
            durations,
            index,
            reallocation_attempts: 0,
            attempts_by_story: vec![0; len],
            diagnostics: Vec::new(),
            metrics: AllocationMetrics::default(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Story> {
        self.index.get(id).map(|&i| &self.stories[i])
    }

    /// Position of each story in the processing order.
    pub fn positions(&self) -> Vec<usize> {
        let mut positions = vec![0; self.stories.len()];
        for (pos, &i) in self.order.iter().enumerate() {
            positions[i] = pos;
        }
        positions
    }

    /// Latest end date among the story's dependencies that have one.
    pub fn latest_dependency_end(&self, i: usize) -> Option<NaiveDate> {
        self.stories[i]
            .dependencies
            .iter()
            .filter_map(|d| self.get(d)?.end_date)
            .max()
    }

    /// Story starts on or before the end of one of its dependencies.
    pub fn has_dependency_violation(&self, i: usize) -> bool {
        match (self.stories[i].start_date, self.latest_dependency_end(i)) {
            (Some(start), Some(end)) => start <= end,
            _ => false,
        }
    }

    /// Story overlaps another story of the same developer.
    pub fn has_conflict(&self, i: usize) -> bool {
        let story = &self.stories[i];
        match (story.developer_id.as_deref(), story.period()) {
            (Some(developer_id), Some(period)) => !self.is_free(developer_id, &period, i),
            _ => false,
        }
    }

    /// Story overlaps a story of the same developer that keeps its slot:
    /// one earlier in the processing order, or a locked one.
    pub fn must_yield(&self, i: usize, positions: &[usize]) -> bool {
        let story = &self.stories[i];
        let (Some(developer_id), Some(period)) = (story.developer_id.as_deref(), story.period())
        else {
            return false;
        };
        self.stories.iter().enumerate().any(|(j, other)| {
            j != i
                && other.is_assigned_to(developer_id)
                && other.period().is_some_and(|p| p.overlaps(&period))
                && (positions[j] < positions[i] || other.is_locked())
        })
    }

    /// Latest end among the developer's stories overlapping `period`,
    /// ignoring story `exclude`.
    pub fn blocking_end(&self, developer_id: &str, period: &Period, exclude: usize) -> Option<NaiveDate> {
        self.stories
            .iter()
            .enumerate()
            .filter(|(j, s)| *j != exclude && s.is_assigned_to(developer_id))
            .filter_map(|(_, s)| s.period())
            .filter(|p| p.overlaps(period))
            .map(|p| p.end)
            .max()
    }

    pub fn is_free(&self, developer_id: &str, period: &Period, exclude: usize) -> bool {
        self.blocking_end(developer_id, period, exclude).is_none()
    }

    /// Developers with no story overlapping `period`, in input order.
    pub fn free_developers<'d>(
        &self,
        developers: &'d [Developer],
        period: &Period,
        exclude: usize,
    ) -> Vec<&'d Developer> {
        developers
            .iter()
            .filter(|d| self.is_free(&d.id, period, exclude))
            .collect()
    }

    /// Whether another reallocation attempt is allowed for story `i`.
    pub fn can_reallocate(&self, i: usize, limits: &RepairLimits) -> bool {
        self.attempts_by_story[i] < limits.max_reallocations_per_story
            && self.reallocation_attempts < limits.max_reallocations_total
    }

    pub fn record_reallocation_attempt(&mut self, i: usize) {
        self.attempts_by_story[i] += 1;
        self.reallocation_attempts += 1;
    }

    /// Assigns story `i` to a developer over `period`.
    pub fn assign(&mut self, i: usize, developer_id: &str, period: Period, duration: u32) {
        let story = &mut self.stories[i];
        story.developer_id = Some(developer_id.to_string());
        story.set_dates(period, duration);
    }

    /// Records a diagnostic once per run.
    pub fn emit(&mut self, diagnostic: Diagnostic) {
        if self.diagnostics.contains(&diagnostic) {
            return;
        }
        warn!(kind = ?diagnostic.kind(), "{diagnostic}");
        self.diagnostics.push(diagnostic);
    }
}
