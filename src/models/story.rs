//! Story (work item) model.
//!
//! A story is the unit of work allocated to a developer. Its identity,
//! size, ranking and dependencies come from the backlog owner; its
//! schedule fields (`developer_id`, dates, duration, order) are owned by
//! the allocator and rewritten on every run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Period;

/// Allowed story sizes (story points).
pub const STORY_POINTS: [u32; 7] = [1, 2, 3, 5, 8, 13, 21];

/// Weight of one wave in the ordering key.
///
/// Exceeds every possible `priority`, so wave strictly dominates priority.
pub const WAVE_WEIGHT: u64 = 1 << 32;

/// Workflow state of a story.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoryStatus {
    #[default]
    Backlog,
    InProgress,
    InTest,
    Done,
    Blocked,
}

/// A story to be allocated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    /// Unique story identifier.
    pub id: String,
    /// Effort in story points (one of [`STORY_POINTS`]).
    pub size: u32,
    /// Workflow state.
    pub status: StoryStatus,
    /// Ranking inside a wave (lower = more urgent).
    pub priority: u32,
    /// Ordering group. Never a calendar barrier.
    pub wave: u32,
    /// IDs of stories that must end before this one starts.
    pub dependencies: Vec<String>,
    /// Assigned developer.
    pub developer_id: Option<String>,
    /// First workday of the story.
    pub start_date: Option<NaiveDate>,
    /// Last workday of the story (inclusive).
    pub end_date: Option<NaiveDate>,
    /// Length in workdays.
    pub duration: Option<u32>,
    /// Position in the final roadmap (1-based).
    pub schedule_order: Option<usize>,
}

/// The allocator-owned fields of a story.
///
/// Two snapshots compare equal iff the allocator left the story untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleFields {
    pub developer_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub duration: Option<u32>,
    pub schedule_order: Option<usize>,
}

impl Story {
    /// Creates an unscheduled backlog story.
    pub fn new(id: impl Into<String>, size: u32) -> Self {
        Self {
            id: id.into(),
            size,
            status: StoryStatus::Backlog,
            priority: 0,
            wave: 0,
            dependencies: Vec::new(),
            developer_id: None,
            start_date: None,
            end_date: None,
            duration: None,
            schedule_order: None,
        }
    }

    pub fn with_status(mut self, status: StoryStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_wave(mut self, wave: u32) -> Self {
        self.wave = wave;
        self
    }

    /// Adds a dependency on another story.
    pub fn with_dependency(mut self, story_id: impl Into<String>) -> Self {
        self.dependencies.push(story_id.into());
        self
    }

    /// Sets a pre-existing assignment (e.g. loaded from a previous run).
    pub fn with_assignment(
        mut self,
        developer_id: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
        duration: u32,
    ) -> Self {
        self.developer_id = Some(developer_id.into());
        self.start_date = Some(start_date);
        self.end_date = Some(end_date);
        self.duration = Some(duration);
        self
    }

    /// Composite ordering key: `wave * WAVE_WEIGHT + priority`.
    #[inline]
    pub fn ordering_key(&self) -> u64 {
        u64::from(self.wave) * WAVE_WEIGHT + u64::from(self.priority)
    }

    /// Whether the story has a developer and a start date.
    pub fn is_placed(&self) -> bool {
        self.developer_id.is_some() && self.start_date.is_some()
    }

    /// A placed `Done` story is history and is never moved.
    pub fn is_locked(&self) -> bool {
        self.status == StoryStatus::Done && self.is_placed()
    }

    /// Whether this story is assigned to the given developer.
    pub fn is_assigned_to(&self, developer_id: &str) -> bool {
        self.developer_id.as_deref() == Some(developer_id)
    }

    /// Occupied period, if both dates are known.
    pub fn period(&self) -> Option<Period> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some(Period::new(start, end)),
            _ => None,
        }
    }

    /// Whether `story_id` is a direct dependency.
    pub fn depends_on(&self, story_id: &str) -> bool {
        self.dependencies.iter().any(|d| d == story_id)
    }

    /// Drops every allocator-owned field except `schedule_order`.
    pub fn clear_schedule(&mut self) {
        self.developer_id = None;
        self.start_date = None;
        self.end_date = None;
        self.duration = None;
    }

    /// Sets the dates of the story, keeping the developer.
    pub(crate) fn set_dates(&mut self, period: Period, duration: u32) {
        self.start_date = Some(period.start);
        self.end_date = Some(period.end);
        self.duration = Some(duration);
    }

    /// Snapshot of the allocator-owned fields.
    pub fn schedule_fields(&self) -> ScheduleFields {
        ScheduleFields {
            developer_id: self.developer_id.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            duration: self.duration,
            schedule_order: self.schedule_order,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_story_builder() {
        let story = Story::new("S1", 5)
            .with_priority(3)
            .with_wave(2)
            .with_status(StoryStatus::InProgress)
            .with_dependency("S0");

        assert_eq!(story.id, "S1");
        assert_eq!(story.size, 5);
        assert_eq!(story.priority, 3);
        assert_eq!(story.wave, 2);
        assert_eq!(story.status, StoryStatus::InProgress);
        assert!(story.depends_on("S0"));
        assert!(!story.is_placed());
        assert!(story.period().is_none());
    }

    #[test]
    fn test_ordering_key_wave_dominates() {
        let early_wave = Story::new("A", 1).with_wave(0).with_priority(u32::MAX);
        let late_wave = Story::new("B", 1).with_wave(1).with_priority(0);
        assert!(early_wave.ordering_key() < late_wave.ordering_key());
    }

    #[test]
    fn test_locked_requires_done_and_placed() {
        let placed = Story::new("S1", 2).with_assignment("D1", date(2024, 1, 1), date(2024, 1, 2), 2);
        assert!(placed.is_placed());
        assert!(!placed.is_locked());

        let done = placed.clone().with_status(StoryStatus::Done);
        assert!(done.is_locked());

        let unplaced_done = Story::new("S2", 2).with_status(StoryStatus::Done);
        assert!(!unplaced_done.is_locked());
    }

    #[test]
    fn test_clear_schedule_keeps_order() {
        let mut story =
            Story::new("S1", 2).with_assignment("D1", date(2024, 1, 1), date(2024, 1, 2), 2);
        story.schedule_order = Some(4);
        story.clear_schedule();
        assert!(!story.is_placed());
        assert_eq!(story.duration, None);
        assert_eq!(story.schedule_order, Some(4));
    }

    #[test]
    fn test_schedule_fields_detect_change() {
        let story = Story::new("S1", 2).with_assignment("D1", date(2024, 1, 1), date(2024, 1, 2), 2);
        let before = story.schedule_fields();
        let mut after = story.clone();
        assert_eq!(before, after.schedule_fields());
        after.developer_id = Some("D2".into());
        assert_ne!(before, after.schedule_fields());
    }
}
