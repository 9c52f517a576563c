//! Workday calendar and date periods.
//!
//! All arithmetic is on calendar dates; no timezone or time of day is
//! modelled.
//!
//! # Workdays
//! A date is a workday iff it is Monday to Friday AND not a configured
//! holiday.
//!
//! # Periods
//! A story occupies the closed interval `[start, end]`: `end` is the last
//! workday of the story, so a story of duration 1 starts and ends on the
//! same day, and a dependent starts on the first workday after `end`.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::{Story, Velocity};
use crate::error::AllocationError;

/// A closed date interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    /// First day (inclusive).
    pub start: NaiveDate,
    /// Last day (inclusive).
    pub end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Whether a date falls within this period.
    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Whether two periods share at least one day.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// Weekend-and-holiday calendar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkCalendar {
    holidays: BTreeSet<NaiveDate>,
}

impl WorkCalendar {
    /// A calendar where every weekday is a workday.
    pub fn new() -> Self {
        Self::default()
    }

    /// A calendar with the given holidays.
    pub fn with_holidays(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    /// Adds a holiday.
    pub fn with_holiday(mut self, date: NaiveDate) -> Self {
        self.holidays.insert(date);
        self
    }

    pub fn holidays(&self) -> impl Iterator<Item = &NaiveDate> {
        self.holidays.iter()
    }

    /// Whether `date` is a working day.
    pub fn is_workday(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }

    /// First workday strictly after `date`.
    pub fn next_workday(&self, date: NaiveDate) -> NaiveDate {
        let mut day = tomorrow(date);
        while !self.is_workday(day) {
            day = tomorrow(day);
        }
        day
    }

    /// `date` itself if it is a workday, otherwise the next one.
    pub fn workday_on_or_after(&self, date: NaiveDate) -> NaiveDate {
        if self.is_workday(date) {
            date
        } else {
            self.next_workday(date)
        }
    }

    /// Advances `n` workdays from `date`. `add_workdays(d, 0) == d`.
    pub fn add_workdays(&self, date: NaiveDate, n: u32) -> NaiveDate {
        (0..n).fold(date, |day, _| self.next_workday(day))
    }

    /// Number of workdays strictly between `start` and `end`.
    pub fn count_workdays_between(&self, start: NaiveDate, end: NaiveDate) -> u32 {
        let mut count = 0;
        let mut day = tomorrow(start);
        while day < end {
            if self.is_workday(day) {
                count += 1;
            }
            day = tomorrow(day);
        }
        count
    }

    /// Number of workdays within a closed period.
    pub fn workdays_in(&self, period: &Period) -> u32 {
        if period.end < period.start {
            return 0;
        }
        let mut count = u32::from(self.is_workday(period.start));
        if period.end > period.start {
            count += self.count_workdays_between(period.start, period.end)
                + u32::from(self.is_workday(period.end));
        }
        count
    }

    /// Last workday of a story of `duration` workdays starting on `start`.
    ///
    /// `start` is expected to be a workday.
    pub fn end_date(&self, start: NaiveDate, duration: u32) -> NaiveDate {
        self.add_workdays(start, duration.saturating_sub(1))
    }

    /// Period occupied by a story of `duration` workdays starting on `start`.
    pub fn period(&self, start: NaiveDate, duration: u32) -> Period {
        Period::new(start, self.end_date(start, duration))
    }

    /// Workdays needed for `size` points: `ceil(size / velocity)`.
    ///
    /// Computed exactly as `ceil(size * workdays / capacity)`.
    pub fn duration_workdays(&self, size: u32, velocity: &Velocity) -> Result<u32, AllocationError> {
        velocity.validate()?;
        let numerator = u64::from(size) * u64::from(velocity.workdays);
        let days = numerator.div_ceil(u64::from(velocity.capacity));
        u32::try_from(days).map_err(|_| {
            AllocationError::InvalidConfiguration(format!(
                "duration of {size} points overflows at velocity {}/{}",
                velocity.capacity, velocity.workdays
            ))
        })
    }

    /// Earliest date `story` may start.
    ///
    /// The later of the first workday on or after `roadmap_start` and the
    /// first workday after the latest dependency end. Returns `None` while
    /// any dependency has no end date yet.
    pub fn earliest_feasible_start<'s, F>(
        &self,
        story: &Story,
        roadmap_start: NaiveDate,
        lookup: F,
    ) -> Option<NaiveDate>
    where
        F: Fn(&str) -> Option<&'s Story>,
    {
        let floor = self.workday_on_or_after(roadmap_start);
        let mut latest_end: Option<NaiveDate> = None;
        for dep_id in &story.dependencies {
            let end = lookup(dep_id.as_str())?.end_date?;
            latest_end = Some(latest_end.map_or(end, |l| l.max(end)));
        }
        match latest_end {
            Some(end) => Some(floor.max(self.next_workday(end))),
            None => Some(floor),
        }
    }
}

fn tomorrow(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // 2024-01-01 is a Monday.
    fn monday() -> NaiveDate {
        date(2024, 1, 1)
    }

    #[test]
    fn test_period_overlap_is_closed() {
        let a = Period::new(date(2024, 1, 1), date(2024, 1, 3));
        let b = Period::new(date(2024, 1, 3), date(2024, 1, 5));
        let c = Period::new(date(2024, 1, 4), date(2024, 1, 5));
        assert!(a.overlaps(&b)); // shared last/first day
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        assert!(a.contains(date(2024, 1, 3)));
        assert!(!a.contains(date(2024, 1, 4)));
    }

    #[test]
    fn test_weekends_and_holidays() {
        let cal = WorkCalendar::new().with_holiday(date(2024, 1, 3));
        assert!(cal.is_workday(monday()));
        assert!(!cal.is_workday(date(2024, 1, 3))); // holiday
        assert!(!cal.is_workday(date(2024, 1, 6))); // Saturday
        assert!(!cal.is_workday(date(2024, 1, 7))); // Sunday
    }

    #[test]
    fn test_next_workday_skips_weekend() {
        let cal = WorkCalendar::new();
        assert_eq!(cal.next_workday(date(2024, 1, 5)), date(2024, 1, 8));
        assert_eq!(cal.next_workday(date(2024, 1, 6)), date(2024, 1, 8));
        assert_eq!(cal.workday_on_or_after(date(2024, 1, 6)), date(2024, 1, 8));
        assert_eq!(cal.workday_on_or_after(monday()), monday());
    }

    #[test]
    fn test_add_workdays() {
        let cal = WorkCalendar::new().with_holiday(date(2024, 1, 9));
        assert_eq!(cal.add_workdays(monday(), 0), monday());
        assert_eq!(cal.add_workdays(monday(), 4), date(2024, 1, 5));
        // Fri + 1 → Mon; Tue 9th is a holiday.
        assert_eq!(cal.add_workdays(monday(), 5), date(2024, 1, 8));
        assert_eq!(cal.add_workdays(monday(), 6), date(2024, 1, 10));
    }

    #[test]
    fn test_count_workdays_between_is_exclusive() {
        let cal = WorkCalendar::new();
        assert_eq!(cal.count_workdays_between(monday(), date(2024, 1, 2)), 0);
        assert_eq!(cal.count_workdays_between(monday(), date(2024, 1, 5)), 3);
        // Fri → next Tue: only Monday in between.
        assert_eq!(cal.count_workdays_between(date(2024, 1, 5), date(2024, 1, 9)), 1);
        assert_eq!(cal.count_workdays_between(date(2024, 1, 5), monday()), 0);
    }

    #[test]
    fn test_workdays_in_period() {
        let cal = WorkCalendar::new();
        assert_eq!(cal.workdays_in(&Period::new(monday(), monday())), 1);
        assert_eq!(cal.workdays_in(&Period::new(monday(), date(2024, 1, 7))), 5);
        assert_eq!(cal.workdays_in(&Period::new(monday(), date(2024, 1, 12))), 10);
        assert_eq!(cal.workdays_in(&Period::new(date(2024, 1, 6), date(2024, 1, 6))), 0);
    }

    #[test]
    fn test_end_date_inclusive() {
        let cal = WorkCalendar::new();
        assert_eq!(cal.end_date(monday(), 1), monday());
        assert_eq!(cal.end_date(monday(), 5), date(2024, 1, 5));
        assert_eq!(cal.end_date(monday(), 6), date(2024, 1, 8));
        let p = cal.period(monday(), 3);
        assert_eq!(cal.workdays_in(&p), 3);
    }

    #[test]
    fn test_duration_workdays_ceil() {
        let cal = WorkCalendar::new();
        let v = Velocity::new(10, 10).unwrap(); // 1 point/day
        assert_eq!(cal.duration_workdays(5, &v).unwrap(), 5);

        let v = Velocity::new(20, 10).unwrap(); // 2 points/day
        assert_eq!(cal.duration_workdays(5, &v).unwrap(), 3);
        assert_eq!(cal.duration_workdays(8, &v).unwrap(), 4);

        let v = Velocity::new(3, 2).unwrap(); // 1.5 points/day
        assert_eq!(cal.duration_workdays(13, &v).unwrap(), 9); // ceil(8.67)
    }

    #[test]
    fn test_duration_rejects_zero_velocity() {
        let cal = WorkCalendar::new();
        let v = Velocity {
            capacity: 0,
            workdays: 10,
        };
        assert!(matches!(
            cal.duration_workdays(3, &v),
            Err(AllocationError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_earliest_start_without_dependencies() {
        let cal = WorkCalendar::new();
        let story = Story::new("S1", 3);
        let map: HashMap<String, Story> = HashMap::new();
        // Roadmap starts on a Saturday → Monday.
        let start = cal.earliest_feasible_start(&story, date(2024, 1, 6), |id| map.get(id));
        assert_eq!(start, Some(date(2024, 1, 8)));
    }

    #[test]
    fn test_earliest_start_after_latest_dependency() {
        let cal = WorkCalendar::new();
        let a = Story::new("A", 1).with_assignment("D1", monday(), date(2024, 1, 2), 2);
        let b = Story::new("B", 1).with_assignment("D2", monday(), date(2024, 1, 5), 5);
        let c = Story::new("C", 1).with_dependency("A").with_dependency("B");
        let map: HashMap<String, Story> =
            [a, b].into_iter().map(|s| (s.id.clone(), s)).collect();

        let start = cal.earliest_feasible_start(&c, monday(), |id| map.get(id));
        assert_eq!(start, Some(date(2024, 1, 8))); // B ends Friday
    }

    #[test]
    fn test_earliest_start_roadmap_floor_wins() {
        let cal = WorkCalendar::new();
        let a = Story::new("A", 1).with_assignment("D1", monday(), monday(), 1);
        let b = Story::new("B", 1).with_dependency("A");
        let map: HashMap<String, Story> = [(a.id.clone(), a)].into_iter().collect();

        let start = cal.earliest_feasible_start(&b, date(2024, 2, 1), |id| map.get(id));
        assert_eq!(start, Some(date(2024, 2, 1)));
    }

    #[test]
    fn test_earliest_start_blocked_by_unscheduled_dependency() {
        let cal = WorkCalendar::new();
        let a = Story::new("A", 1);
        let b = Story::new("B", 1).with_dependency("A");
        let map: HashMap<String, Story> = [(a.id.clone(), a)].into_iter().collect();
        assert_eq!(cal.earliest_feasible_start(&b, monday(), |id| map.get(id)), None);
    }

    #[test]
    fn test_earliest_start_ignores_wave() {
        let cal = WorkCalendar::new();
        let late_wave = Story::new("W3", 1).with_wave(3);
        let map: HashMap<String, Story> = HashMap::new();
        assert_eq!(
            cal.earliest_feasible_start(&late_wave, monday(), |id| map.get(id)),
            Some(monday())
        );
    }
}
