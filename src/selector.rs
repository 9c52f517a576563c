//! Developer selection.
//!
//! Chooses a developer for a story among the candidates the caller found
//! free over the story's period.
//!
//! # Steps
//! 1. Compute each candidate's idle gap before the story's start.
//! 2. If an idle budget is configured, keep candidates within it (a
//!    developer with no prior assignment is always within it). If nobody
//!    remains, fall back to the full candidate pool.
//! 3. Apply the allocation policy to the working set.
//!
//! Idle gaps are measured against the developer's most recent assignment
//! over the whole roadmap, regardless of wave.

use chrono::NaiveDate;

use crate::models::{AllocationPolicy, Developer, Story, WorkCalendar};

/// Policy-driven developer chooser over a snapshot of the backlog.
#[derive(Debug, Clone, Copy)]
pub struct DeveloperSelector<'a> {
    calendar: &'a WorkCalendar,
    policy: AllocationPolicy,
    max_idle_days: Option<u32>,
}

impl<'a> DeveloperSelector<'a> {
    pub fn new(
        calendar: &'a WorkCalendar,
        policy: AllocationPolicy,
        max_idle_days: Option<u32>,
    ) -> Self {
        Self {
            calendar,
            policy,
            max_idle_days,
        }
    }

    pub fn policy(&self) -> AllocationPolicy {
        self.policy
    }

    /// Workdays between the developer's latest assignment ending before
    /// `start` and `start`.
    ///
    /// `exclude` is the story being placed. Returns `None` when the
    /// developer has no earlier assignment.
    pub fn idle_gap(
        &self,
        developer_id: &str,
        start: NaiveDate,
        stories: &[Story],
        exclude: &str,
    ) -> Option<u32> {
        stories
            .iter()
            .filter(|s| s.id != exclude && s.is_assigned_to(developer_id))
            .filter_map(|s| s.end_date)
            .filter(|end| *end < start)
            .max()
            .map(|end| self.calendar.count_workdays_between(end, start))
    }

    /// Whether starting `story` on `start` keeps the developer within the
    /// idle budget. Always true without a budget or without history.
    pub fn within_idle_budget(
        &self,
        developer_id: &str,
        start: NaiveDate,
        stories: &[Story],
        exclude: &str,
    ) -> bool {
        match self.max_idle_days {
            None => true,
            Some(limit) => self
                .idle_gap(developer_id, start, stories, exclude)
                .map_or(true, |gap| gap <= limit),
        }
    }

    /// Chooses a developer for `story` starting on `start`.
    ///
    /// `candidates` must already be free over the story's period. Returns
    /// `None` only when `candidates` is empty.
    pub fn select<'d>(
        &self,
        story: &Story,
        start: NaiveDate,
        candidates: &[&'d Developer],
        stories: &[Story],
    ) -> Option<&'d Developer> {
        if candidates.is_empty() {
            return None;
        }

        let within: Vec<&'d Developer> = candidates
            .iter()
            .copied()
            .filter(|d| self.within_idle_budget(&d.id, start, stories, &story.id))
            .collect();
        let working = if within.is_empty() {
            candidates.to_vec()
        } else {
            within
        };

        match self.policy {
            AllocationPolicy::OwnershipFirst => self
                .dependency_owner(story, &working, stories)
                .or_else(|| least_loaded(&working, stories, &story.id)),
            AllocationPolicy::LoadBalanced => least_loaded(&working, stories, &story.id),
        }
    }

    /// Owner of the first dependency (in dependency order) whose owner is
    /// in `working`.
    fn dependency_owner<'d>(
        &self,
        story: &Story,
        working: &[&'d Developer],
        stories: &[Story],
    ) -> Option<&'d Developer> {
        story.dependencies.iter().find_map(|dep_id| {
            let owner = stories
                .iter()
                .find(|s| &s.id == dep_id)?
                .developer_id
                .as_deref()?;
            working.iter().copied().find(|d| d.id == owner)
        })
    }
}

/// Developer with the fewest assigned stories; ties by lowest ID.
fn least_loaded<'d>(
    working: &[&'d Developer],
    stories: &[Story],
    exclude: &str,
) -> Option<&'d Developer> {
    working.iter().copied().min_by(|a, b| {
        let load_a = assigned_count(&a.id, stories, exclude);
        let load_b = assigned_count(&b.id, stories, exclude);
        load_a.cmp(&load_b).then_with(|| a.id.cmp(&b.id))
    })
}

fn assigned_count(developer_id: &str, stories: &[Story], exclude: &str) -> usize {
    stories
        .iter()
        .filter(|s| s.id != exclude && s.is_assigned_to(developer_id))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn devs() -> Vec<Developer> {
        vec![Developer::new("X"), Developer::new("Y"), Developer::new("Z")]
    }

    fn refs(devs: &[Developer]) -> Vec<&Developer> {
        devs.iter().collect()
    }

    #[test]
    fn test_idle_gap_first_assignment_is_unknown() {
        let cal = WorkCalendar::new();
        let sel = DeveloperSelector::new(&cal, AllocationPolicy::LoadBalanced, Some(3));
        assert_eq!(sel.idle_gap("X", date(2024, 1, 10), &[], "S"), None);
        assert!(sel.within_idle_budget("X", date(2024, 1, 10), &[], "S"));
    }

    #[test]
    fn test_idle_gap_uses_latest_prior_end() {
        let cal = WorkCalendar::new();
        let sel = DeveloperSelector::new(&cal, AllocationPolicy::LoadBalanced, None);
        let stories = vec![
            Story::new("old", 1).with_assignment("X", date(2024, 1, 1), date(2024, 1, 1), 1),
            Story::new("recent", 1).with_assignment("X", date(2024, 1, 3), date(2024, 1, 3), 1),
            // Ends after the start: not prior history.
            Story::new("later", 1).with_assignment("X", date(2024, 1, 20), date(2024, 1, 22), 1),
        ];
        // Wed 3rd → Tue 9th: Thu, Fri, Mon in between.
        assert_eq!(sel.idle_gap("X", date(2024, 1, 9), &stories, "S"), Some(3));
    }

    #[test]
    fn test_idle_gap_ignores_wave() {
        let cal = WorkCalendar::new();
        let sel = DeveloperSelector::new(&cal, AllocationPolicy::LoadBalanced, Some(3));
        let stories = vec![Story::new("w1", 1)
            .with_wave(1)
            .with_assignment("X", date(2024, 1, 1), date(2024, 1, 1), 1)];
        let next_wave = Story::new("w2", 1).with_wave(2);
        // Mon 1st → Mon 15th: 9 idle workdays, even though the wave changed.
        assert_eq!(sel.idle_gap("X", date(2024, 1, 15), &stories, &next_wave.id), Some(9));
        assert!(!sel.within_idle_budget("X", date(2024, 1, 15), &stories, &next_wave.id));
    }

    #[test]
    fn test_load_balanced_picks_fewest_then_id() {
        let cal = WorkCalendar::new();
        let sel = DeveloperSelector::new(&cal, AllocationPolicy::LoadBalanced, None);
        let devs = devs();
        let stories = vec![
            Story::new("a", 1).with_assignment("X", date(2024, 1, 1), date(2024, 1, 1), 1),
            Story::new("b", 1).with_assignment("Y", date(2024, 1, 1), date(2024, 1, 1), 1),
        ];
        let story = Story::new("new", 1);
        let chosen = sel.select(&story, date(2024, 1, 2), &refs(&devs), &stories).unwrap();
        assert_eq!(chosen.id, "Z");

        let chosen = sel.select(&story, date(2024, 1, 2), &refs(&devs), &[]).unwrap();
        assert_eq!(chosen.id, "X");
    }

    #[test]
    fn test_ownership_first_prefers_dependency_owner() {
        let cal = WorkCalendar::new();
        let sel = DeveloperSelector::new(&cal, AllocationPolicy::OwnershipFirst, Some(3));
        let devs = devs();
        let stories = vec![
            Story::new("A", 1).with_assignment("Y", date(2024, 1, 1), date(2024, 1, 2), 2),
            Story::new("other", 1).with_assignment("Y", date(2023, 12, 1), date(2023, 12, 1), 1),
        ];
        let b = Story::new("B", 1).with_dependency("A");
        let chosen = sel.select(&b, date(2024, 1, 3), &refs(&devs), &stories).unwrap();
        assert_eq!(chosen.id, "Y"); // despite Y carrying the most load
    }

    #[test]
    fn test_ownership_owner_outside_idle_budget_falls_to_load_balancing() {
        let cal = WorkCalendar::new();
        let sel = DeveloperSelector::new(&cal, AllocationPolicy::OwnershipFirst, Some(3));
        let devs = devs();
        let stories = vec![
            // X owns A but finished long before B can start.
            Story::new("A", 1).with_assignment("X", date(2024, 1, 1), date(2024, 1, 1), 1),
            Story::new("y1", 1).with_assignment("Y", date(2024, 1, 29), date(2024, 1, 30), 2),
        ];
        let b = Story::new("B", 1).with_dependency("A");
        let chosen = sel.select(&b, date(2024, 1, 31), &refs(&devs), &stories).unwrap();
        // Working set {Y (gap 0), Z (no history)}; Z carries less load.
        assert_eq!(chosen.id, "Z");
    }

    #[test]
    fn test_idle_filter_empty_falls_back_to_full_pool() {
        let cal = WorkCalendar::new();
        let sel = DeveloperSelector::new(&cal, AllocationPolicy::OwnershipFirst, Some(1));
        let devs = vec![Developer::new("X"), Developer::new("Y")];
        let stories = vec![
            Story::new("A", 1).with_assignment("Y", date(2024, 1, 1), date(2024, 1, 1), 1),
            Story::new("x1", 1).with_assignment("X", date(2024, 1, 1), date(2024, 1, 1), 1),
            Story::new("x2", 1).with_assignment("X", date(2024, 1, 2), date(2024, 1, 2), 1),
        ];
        let b = Story::new("B", 1).with_dependency("A");
        // Both are far over budget; ownership still runs over the full pool.
        let chosen = sel.select(&b, date(2024, 2, 1), &refs(&devs), &stories).unwrap();
        assert_eq!(chosen.id, "Y");
    }

    #[test]
    fn test_ownership_uses_first_dependency_with_available_owner() {
        let cal = WorkCalendar::new();
        let sel = DeveloperSelector::new(&cal, AllocationPolicy::OwnershipFirst, None);
        let devs = vec![Developer::new("Y"), Developer::new("Z")];
        let stories = vec![
            Story::new("A", 1).with_assignment("X", date(2024, 1, 1), date(2024, 1, 1), 1),
            Story::new("B", 1).with_assignment("Z", date(2024, 1, 1), date(2024, 1, 1), 1),
        ];
        // X owns A but is not a candidate; Z owns B.
        let c = Story::new("C", 1).with_dependency("A").with_dependency("B");
        let chosen = sel.select(&c, date(2024, 1, 2), &refs(&devs), &stories).unwrap();
        assert_eq!(chosen.id, "Z");
    }

    #[test]
    fn test_no_candidates() {
        let cal = WorkCalendar::new();
        let sel = DeveloperSelector::new(&cal, AllocationPolicy::LoadBalanced, None);
        assert!(sel.select(&Story::new("S", 1), date(2024, 1, 1), &[], &[]).is_none());
    }
}
