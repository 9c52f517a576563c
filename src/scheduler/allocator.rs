//! Story allocator.
//!
//! # Algorithm
//!
//! 1. Validate the input and compute the backlog order.
//! 2. Normalize pre-existing assignments: clear orphaned and partial ones,
//!    recompute durations that no longer match size and velocity.
//! 3. Initial allocation: sweep unplaced stories in backlog order, placing
//!    each at its earliest start where some developer is free.
//! 4. Stabilization: repair dependency violations and calendar conflicts
//!    until a pass changes nothing (see `repair`).
//! 5. Finalize schedule order, metrics and KPIs.
//!
//! # Complexity
//! Placing one story is O(n² * d) for n stories and d developers, since
//! each busy candidate start jumps past at least one story. Each repair
//! pass is O(n² * d).
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 4: Priority Dispatching

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::run::AllocationRun;
use super::{AllocationMetrics, RoadmapKpi};
use crate::error::AllocationError;
use crate::models::{
    AllocationConfig, Developer, Diagnostic, ScheduleFields, Story, Velocity, WorkCalendar,
};
use crate::ordering::backlog_order;
use crate::selector::DeveloperSelector;
use crate::validation::validate_input;

/// Result of one allocation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationOutcome {
    /// All stories, in input order, with updated schedule fields.
    pub stories: Vec<Story>,
    /// IDs of stories whose schedule fields changed, in input order.
    pub changed: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
    pub metrics: AllocationMetrics,
    pub kpi: RoadmapKpi,
}

impl AllocationOutcome {
    /// Stories whose schedule fields changed.
    pub fn changed_stories(&self) -> impl Iterator<Item = &Story> + '_ {
        self.stories.iter().filter(|s| self.changed.contains(&s.id))
    }

    /// Story by ID.
    pub fn story(&self, id: &str) -> Option<&Story> {
        self.stories.iter().find(|s| s.id == id)
    }

    /// Whether the run produced no diagnostics.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Allocates stories to developers over workdays.
///
/// Immutable after construction; every [`allocate`](Self::allocate) call
/// owns its own run state.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use u_roadmap::models::{AllocationConfig, Developer, Story};
/// use u_roadmap::scheduler::Allocator;
///
/// let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let allocator = Allocator::new(
///     AllocationConfig::new(10, 10).with_roadmap_start(monday),
/// ).unwrap();
///
/// let stories = vec![
///     Story::new("login", 3),
///     Story::new("profile", 2).with_dependency("login"),
/// ];
/// let developers = vec![Developer::new("ana")];
///
/// let outcome = allocator.allocate(&stories, &developers).unwrap();
/// let profile = outcome.story("profile").unwrap();
/// assert_eq!(profile.developer_id.as_deref(), Some("ana"));
/// assert_eq!(profile.start_date, NaiveDate::from_ymd_opt(2024, 1, 4));
/// assert!(outcome.is_clean());
/// ```
#[derive(Debug, Clone)]
pub struct Allocator {
    config: AllocationConfig,
    calendar: WorkCalendar,
    velocity: Velocity,
    roadmap_start: NaiveDate,
}

impl Allocator {
    /// Creates an allocator, validating the configuration.
    ///
    /// Without a configured roadmap start, today's local date is used.
    pub fn new(config: AllocationConfig) -> Result<Self, AllocationError> {
        config.validate()?;
        let velocity = config.velocity()?;
        let calendar = WorkCalendar::with_holidays(config.holidays.iter().copied());
        let roadmap_start = config
            .roadmap_start
            .unwrap_or_else(|| Local::now().date_naive());
        Ok(Self {
            config,
            calendar,
            velocity,
            roadmap_start,
        })
    }

    pub fn config(&self) -> &AllocationConfig {
        &self.config
    }

    pub fn calendar(&self) -> &WorkCalendar {
        &self.calendar
    }

    pub fn velocity(&self) -> Velocity {
        self.velocity
    }

    pub fn roadmap_start(&self) -> NaiveDate {
        self.roadmap_start
    }

    /// Developer selector for this configuration.
    pub fn selector(&self) -> DeveloperSelector<'_> {
        DeveloperSelector::new(&self.calendar, self.config.policy, self.config.max_idle_days)
    }

    /// Allocates `stories` to `developers`.
    ///
    /// Inputs are never mutated; the updated stories are returned in the
    /// outcome. Structural problems (cycles, unknown or duplicate IDs,
    /// invalid sizes) abort the run before anything is scheduled; when
    /// several are found, a cycle is reported first.
    pub fn allocate(
        &self,
        stories: &[Story],
        developers: &[Developer],
    ) -> Result<AllocationOutcome, AllocationError> {
        if let Err(mut errors) = validate_input(stories, developers) {
            for e in &errors {
                error!(error = %e, "rejected allocation input");
            }
            let first = errors.iter().position(AllocationError::is_cycle).unwrap_or(0);
            return Err(errors.swap_remove(first));
        }

        let order = backlog_order(stories)?;
        let durations = stories
            .iter()
            .map(|s| self.calendar.duration_workdays(s.size, &self.velocity))
            .collect::<Result<Vec<_>, _>>()?;
        let before: Vec<ScheduleFields> = stories.iter().map(Story::schedule_fields).collect();

        info!(
            stories = stories.len(),
            developers = developers.len(),
            policy = ?self.config.policy,
            roadmap_start = %self.roadmap_start,
            "allocation started"
        );

        let mut run = AllocationRun::new(stories.to_vec(), order, durations);
        run.metrics.stories_processed = stories.len();

        self.normalize(&mut run, developers);
        self.initial_allocation(&mut run, developers);
        self.stabilize(&mut run, developers);
        let outcome = self.finalize(run, &before);

        info!(
            changed = outcome.changed.len(),
            unplaced = outcome.metrics.unplaced,
            passes = outcome.metrics.passes,
            diagnostics = outcome.diagnostics.len(),
            "allocation finished"
        );
        Ok(outcome)
    }

    /// Clears assignments that cannot be kept and realigns stale dates.
    ///
    /// A kept start that is not a workday moves to the next workday. Locked
    /// stories are left untouched.
    fn normalize(&self, run: &mut AllocationRun, developers: &[Developer]) {
        for i in 0..run.stories.len() {
            let duration = run.durations[i];
            let story = &mut run.stories[i];
            if story.is_locked() {
                continue;
            }

            let orphaned = story
                .developer_id
                .as_deref()
                .is_some_and(|id| !developers.iter().any(|d| d.id == id));
            let partial = story.developer_id.is_some() != story.start_date.is_some();
            let leftover = story.start_date.is_none()
                && (story.end_date.is_some() || story.duration.is_some());
            if orphaned || partial || leftover {
                debug!(story = %story.id, "clearing incomplete assignment");
                story.clear_schedule();
                continue;
            }

            if let Some(start) = story.start_date {
                let period = self
                    .calendar
                    .period(self.calendar.workday_on_or_after(start), duration);
                if period.start != start
                    || story.end_date != Some(period.end)
                    || story.duration != Some(duration)
                {
                    debug!(story = %story.id, duration, start = %period.start, end = %period.end, "resized story");
                    story.set_dates(period, duration);
                    run.metrics.repairs.resized += 1;
                }
            }
        }
    }

    /// Places unplaced stories, sweeping until nothing is left or a sweep
    /// makes no progress.
    fn initial_allocation(&self, run: &mut AllocationRun, developers: &[Developer]) {
        loop {
            let pending: Vec<usize> = run
                .order
                .iter()
                .copied()
                .filter(|&i| !run.stories[i].is_placed())
                .collect();
            if pending.is_empty() {
                return;
            }

            let mut placed = 0;
            for &i in &pending {
                if self.place(run, i, developers) {
                    placed += 1;
                }
            }

            if placed == 0 {
                let story_ids = pending.iter().map(|&i| run.stories[i].id.clone()).collect();
                run.emit(Diagnostic::AllocationDeadlock { story_ids });
                return;
            }
        }
    }

    /// Places story `i` at the first start, from its earliest feasible
    /// one, where some developer is free.
    ///
    /// While every developer is busy, the start jumps past the earliest
    /// blocking story. Fails only when the story is not ready or there are
    /// no developers.
    fn place(&self, run: &mut AllocationRun, i: usize, developers: &[Developer]) -> bool {
        let story = &run.stories[i];
        let Some(mut start) =
            self.calendar
                .earliest_feasible_start(story, self.roadmap_start, |id| run.get(id))
        else {
            return false;
        };
        let wave = story.wave;
        let duration = run.durations[i];
        let selector = self.selector();

        loop {
            *run.metrics
                .placement_iterations_per_wave
                .entry(wave)
                .or_insert(0) += 1;

            let period = self.calendar.period(start, duration);
            let pool = run.free_developers(developers, &period, i);
            if let Some(developer) = selector.select(&run.stories[i], start, &pool, &run.stories)
            {
                if let Some(violation) = self.idle_violation(run, i, &developer.id, start) {
                    run.emit(violation);
                }
                run.assign(i, &developer.id, period, duration);
                run.metrics.initial_placements += 1;
                debug!(
                    story = %run.stories[i].id,
                    developer = %developer.id,
                    %start,
                    end = %period.end,
                    "placed story"
                );
                return true;
            }

            // Every developer stays busy until at least the earliest
            // blocking end.
            let earliest_release = developers
                .iter()
                .filter_map(|d| run.blocking_end(&d.id, &period, i))
                .min();
            match earliest_release {
                Some(end) => start = self.calendar.next_workday(end),
                None => {
                    debug!(story = %run.stories[i].id, "no developers to place story");
                    return false;
                }
            }
        }
    }

    /// Idle-budget violation if story `i` starts on `start` for the developer.
    pub(super) fn idle_violation(
        &self,
        run: &AllocationRun,
        i: usize,
        developer_id: &str,
        start: NaiveDate,
    ) -> Option<Diagnostic> {
        let limit = self.config.max_idle_days?;
        let story_id = &run.stories[i].id;
        let idle_days = self
            .selector()
            .idle_gap(developer_id, start, &run.stories, story_id)?;
        (idle_days > limit).then(|| Diagnostic::IdleThresholdViolation {
            story_id: story_id.clone(),
            developer_id: developer_id.to_string(),
            idle_days,
            limit,
        })
    }

    fn finalize(&self, mut run: AllocationRun, before: &[ScheduleFields]) -> AllocationOutcome {
        let positions = run.positions();
        let mut placed: Vec<usize> = run
            .order
            .iter()
            .copied()
            .filter(|&i| run.stories[i].is_placed())
            .collect();
        placed.sort_by_key(|&i| (run.stories[i].start_date, positions[i]));
        let sequence: Vec<usize> = placed
            .into_iter()
            .chain(run.order.iter().copied().filter(|&i| !run.stories[i].is_placed()))
            .collect();
        for (n, &i) in sequence.iter().enumerate() {
            run.stories[i].schedule_order = Some(n + 1);
        }

        run.metrics.unresolved_violations = (0..run.stories.len())
            .filter(|&i| run.stories[i].is_placed())
            .filter(|&i| run.has_dependency_violation(i) || run.has_conflict(i))
            .count();
        run.metrics.unplaced = run.stories.iter().filter(|s| !s.is_placed()).count();
        for story in &run.stories {
            *run.metrics.stories_per_wave.entry(story.wave).or_insert(0) += 1;
        }

        let changed = run
            .stories
            .iter()
            .zip(before)
            .filter(|(story, fields)| story.schedule_fields() != **fields)
            .map(|(story, _)| story.id.clone())
            .collect();
        let kpi = RoadmapKpi::calculate(&run.stories, &self.calendar);

        AllocationOutcome {
            stories: run.stories,
            changed,
            diagnostics: run.diagnostics,
            metrics: run.metrics,
            kpi,
        }
    }
}
