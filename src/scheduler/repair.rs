//! Stabilization loop.
//!
//! Each pass walks the backlog order and repairs every placed, unlocked
//! story that starts before a dependency has ended or overlaps a story of
//! the same developer it must yield to. A pass that repairs nothing ends
//! the loop.
//!
//! # Repair
//! 1. A dependency violation moves the start to the first feasible workday.
//! 2. If the developer is busy over the (possibly new) period, try another
//!    developer free over the same period before moving any dates.
//! 3. Otherwise shift the story to the developer's first free start.
//! 4. If the developer would now idle beyond the budget, try a developer
//!    within budget; otherwise report the violation.
//!
//! Reallocations are capped per story and per run, and the number of passes
//! is capped, so the loop always terminates.

use chrono::NaiveDate;
use tracing::debug;

use super::run::AllocationRun;
use super::Allocator;
use crate::models::{Developer, Diagnostic, Period};

/// What a reallocation attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reallocation {
    Reassigned,
    NoCandidate,
    CapReached,
}

impl Allocator {
    pub(super) fn stabilize(&self, run: &mut AllocationRun, developers: &[Developer]) {
        let max_passes = self.config().limits.max_passes;
        let positions = run.positions();

        for pass in 1..=max_passes {
            run.metrics.passes = pass;
            let mut repairs = 0;

            for pos in 0..run.order.len() {
                let i = run.order[pos];
                let story = &run.stories[i];
                if !story.is_placed() || story.is_locked() {
                    continue;
                }
                let violated = run.has_dependency_violation(i);
                if (violated || run.must_yield(i, &positions))
                    && self.repair(run, i, violated, developers)
                {
                    repairs += 1;
                }
            }

            debug!(pass, repairs, "repair pass finished");
            if repairs == 0 {
                return;
            }
        }

        run.emit(Diagnostic::StabilizationLimitReached {
            passes_run: max_passes,
        });
    }

    /// Repairs story `i`. Returns whether anything changed.
    fn repair(
        &self,
        run: &mut AllocationRun,
        i: usize,
        violated: bool,
        developers: &[Developer],
    ) -> bool {
        let story = &run.stories[i];
        let (Some(developer_id), Some(mut start)) = (story.developer_id.clone(), story.start_date)
        else {
            return false;
        };
        let duration = run.durations[i];
        let calendar = self.calendar();

        let mut shifted = false;
        if violated {
            if let Some(dependency_end) = run.latest_dependency_end(i) {
                let floor = calendar.workday_on_or_after(self.roadmap_start());
                start = floor.max(calendar.next_workday(dependency_end));
                shifted = true;
            }
        }

        let period = calendar.period(start, duration);
        if run.is_free(&developer_id, &period, i) {
            run.assign(i, &developer_id, period, duration);
            if shifted {
                run.metrics.repairs.shifted += 1;
                debug!(story = %run.stories[i].id, %start, "shifted after dependency");
                self.recheck_idleness(run, i, developers);
            }
            return shifted;
        }

        match self.reallocate(run, i, period, &developer_id, developers, false) {
            Reallocation::Reassigned => {
                run.metrics.repairs.reallocated += 1;
                if shifted {
                    run.metrics.repairs.shifted += 1;
                }
                self.recheck_idleness(run, i, developers);
                return true;
            }
            Reallocation::NoCandidate => run.emit(Diagnostic::FailedReallocation {
                story_id: run.stories[i].id.clone(),
                developer_id: developer_id.clone(),
            }),
            Reallocation::CapReached => {}
        }

        let start = self.first_free_start(run, i, &developer_id, start, duration);
        let period = calendar.period(start, duration);
        run.assign(i, &developer_id, period, duration);
        run.metrics.repairs.shifted += 1;
        debug!(story = %run.stories[i].id, developer = %developer_id, %start, "shifted to free slot");
        self.recheck_idleness(run, i, developers);
        true
    }

    /// Moves story `i` to another developer free over `period`.
    ///
    /// With `within_budget`, only developers whose idle gap stays within the
    /// budget are considered.
    fn reallocate(
        &self,
        run: &mut AllocationRun,
        i: usize,
        period: Period,
        current: &str,
        developers: &[Developer],
        within_budget: bool,
    ) -> Reallocation {
        if !run.can_reallocate(i, &self.config().limits) {
            return Reallocation::CapReached;
        }
        run.record_reallocation_attempt(i);

        let selector = self.selector();
        let story = &run.stories[i];
        let pool: Vec<&Developer> = run
            .free_developers(developers, &period, i)
            .into_iter()
            .filter(|d| d.id != current)
            .filter(|d| {
                !within_budget
                    || selector.within_idle_budget(&d.id, period.start, &run.stories, &story.id)
            })
            .collect();
        let Some(developer) = selector.select(story, period.start, &pool, &run.stories) else {
            return Reallocation::NoCandidate;
        };

        debug!(story = %story.id, from = %current, to = %developer.id, "reallocated story");
        let duration = run.durations[i];
        run.assign(i, &developer.id, period, duration);
        run.metrics.reallocations += 1;
        Reallocation::Reassigned
    }

    /// Reallocates or reports story `i` if its developer idles beyond the
    /// budget before it.
    fn recheck_idleness(&self, run: &mut AllocationRun, i: usize, developers: &[Developer]) {
        let story = &run.stories[i];
        let (Some(developer_id), Some(period)) = (story.developer_id.clone(), story.period()) else {
            return;
        };
        let Some(violation) = self.idle_violation(run, i, &developer_id, period.start) else {
            return;
        };

        if self.reallocate(run, i, period, &developer_id, developers, true)
            == Reallocation::Reassigned
        {
            run.metrics.repairs.idle_reallocated += 1;
            return;
        }
        run.emit(violation);
    }

    /// First start on or after `start` where the developer is free for
    /// `duration` workdays.
    fn first_free_start(
        &self,
        run: &AllocationRun,
        i: usize,
        developer_id: &str,
        mut start: NaiveDate,
        duration: u32,
    ) -> NaiveDate {
        let calendar = self.calendar();
        loop {
            let period = calendar.period(start, duration);
            match run.blocking_end(developer_id, &period, i) {
                Some(end) => start = calendar.next_workday(end),
                None => return start,
            }
        }
    }
}
