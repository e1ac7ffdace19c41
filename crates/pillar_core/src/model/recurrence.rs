//! Recurrence rules and occurrence arithmetic.
//!
//! # Invariants
//! - A series starts on its task's `scheduled_date`; that date is occurrence 0.
//! - Occurrence `n` is computed from the start, never chained from `n - 1`,
//!   so monthly series clamp short months without drifting.
//! - `until` is inclusive.

use crate::model::validation::ValidationError;
use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }
}

/// Why a date failed to resolve to an occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccurrenceMiss {
    /// Before the start or after `until`.
    OutOfRange,
    /// Inside the range but off the cadence.
    OffCadence,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    /// Repeat every `interval` units of `frequency`. Always >= 1.
    pub interval: u32,
    /// Last date (inclusive) the series may produce.
    pub until: Option<NaiveDate>,
}

impl RecurrenceRule {
    pub fn new(frequency: Frequency, interval: u32) -> Self {
        Self {
            frequency,
            interval,
            until: None,
        }
    }

    pub fn weekly() -> Self {
        Self::new(Frequency::Weekly, 1)
    }

    pub fn daily() -> Self {
        Self::new(Frequency::Daily, 1)
    }

    pub fn with_until(mut self, until: NaiveDate) -> Self {
        self.until = Some(until);
        self
    }

    pub fn validate(&self, start: NaiveDate) -> Result<(), ValidationError> {
        if self.interval == 0 {
            return Err(ValidationError::InvalidInterval(self.interval));
        }
        if let Some(until) = self.until {
            if until < start {
                return Err(ValidationError::UntilBeforeStart { start, until });
            }
        }
        Ok(())
    }

    /// Returns occurrence `n` ignoring `until`.
    pub fn nth(&self, start: NaiveDate, n: u32) -> Option<NaiveDate> {
        let steps = n.checked_mul(self.interval)?;
        match self.frequency {
            Frequency::Daily => start.checked_add_days(Days::new(u64::from(steps))),
            Frequency::Weekly => start.checked_add_days(Days::new(u64::from(steps) * 7)),
            Frequency::Monthly => start.checked_add_months(Months::new(steps)),
        }
    }

    /// Resolves `date` to its occurrence index.
    pub fn position(&self, start: NaiveDate, date: NaiveDate) -> Result<u32, OccurrenceMiss> {
        if date < start || self.until.is_some_and(|until| date > until) {
            return Err(OccurrenceMiss::OutOfRange);
        }
        let interval = i64::from(self.interval.max(1));
        let index = match self.frequency {
            Frequency::Daily | Frequency::Weekly => {
                let step = interval * self.day_step();
                let days = (date - start).num_days();
                if days % step != 0 {
                    return Err(OccurrenceMiss::OffCadence);
                }
                days / step
            }
            Frequency::Monthly => {
                let months = month_distance(start, date);
                if months % interval != 0 {
                    return Err(OccurrenceMiss::OffCadence);
                }
                months / interval
            }
        };
        let index = u32::try_from(index).map_err(|_| OccurrenceMiss::OutOfRange)?;
        if self.nth(start, index) != Some(date) {
            return Err(OccurrenceMiss::OffCadence);
        }
        Ok(index)
    }

    pub fn is_occurrence(&self, start: NaiveDate, date: NaiveDate) -> bool {
        self.position(start, date).is_ok()
    }

    /// Lists occurrences in `[from, to]`, clipped to `until`.
    pub fn occurrences_between(
        &self,
        start: NaiveDate,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        if to < from || to < start {
            return dates;
        }

        let interval = i64::from(self.interval.max(1));
        let first_guess = if from <= start {
            0
        } else {
            match self.frequency {
                Frequency::Daily | Frequency::Weekly => {
                    (from - start).num_days() / (interval * self.day_step())
                }
                Frequency::Monthly => month_distance(start, from) / interval,
            }
        };
        let mut n = u32::try_from(first_guess.max(0)).unwrap_or(u32::MAX);

        while let Some(date) = self.nth(start, n) {
            if date > to || self.until.is_some_and(|until| date > until) {
                break;
            }
            if date >= from {
                dates.push(date);
            }
            n = match n.checked_add(1) {
                Some(next) => next,
                None => break,
            };
        }
        dates
    }

    fn day_step(&self) -> i64 {
        match self.frequency {
            Frequency::Weekly => 7,
            Frequency::Daily | Frequency::Monthly => 1,
        }
    }
}

fn month_distance(from: NaiveDate, to: NaiveDate) -> i64 {
    i64::from(to.year() - from.year()) * 12 + i64::from(to.month()) - i64::from(from.month())
}

#[cfg(test)]
mod tests {
    use super::{Frequency, OccurrenceMiss, RecurrenceRule};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn weekly_position_and_cadence() {
        let rule = RecurrenceRule::weekly();
        let start = date(2025, 1, 6);
        assert_eq!(rule.position(start, date(2025, 2, 3)), Ok(4));
        assert_eq!(
            rule.position(start, date(2025, 2, 4)),
            Err(OccurrenceMiss::OffCadence)
        );
        assert_eq!(
            rule.position(start, date(2025, 1, 5)),
            Err(OccurrenceMiss::OutOfRange)
        );
    }

    #[test]
    fn until_is_inclusive() {
        let rule = RecurrenceRule::daily().with_until(date(2025, 1, 3));
        let start = date(2025, 1, 1);
        assert!(rule.is_occurrence(start, date(2025, 1, 3)));
        assert_eq!(
            rule.position(start, date(2025, 1, 4)),
            Err(OccurrenceMiss::OutOfRange)
        );
        assert_eq!(
            rule.occurrences_between(start, date(2024, 12, 1), date(2025, 2, 1)),
            vec![date(2025, 1, 1), date(2025, 1, 2), date(2025, 1, 3)]
        );
    }

    #[test]
    fn monthly_clamps_without_drift() {
        let rule = RecurrenceRule::new(Frequency::Monthly, 1);
        let start = date(2025, 1, 31);
        let dates = rule.occurrences_between(start, date(2025, 1, 1), date(2025, 4, 30));
        assert_eq!(
            dates,
            vec![
                date(2025, 1, 31),
                date(2025, 2, 28),
                date(2025, 3, 31),
                date(2025, 4, 30)
            ]
        );
        assert!(rule.is_occurrence(start, date(2025, 2, 28)));
        assert!(!rule.is_occurrence(start, date(2025, 3, 28)));
    }

    #[test]
    fn window_starting_mid_series_skips_earlier_dates() {
        let rule = RecurrenceRule::new(Frequency::Daily, 2);
        let start = date(2025, 1, 1);
        assert_eq!(
            rule.occurrences_between(start, date(2025, 1, 4), date(2025, 1, 9)),
            vec![date(2025, 1, 5), date(2025, 1, 7), date(2025, 1, 9)]
        );
    }

    #[test]
    fn zero_interval_is_rejected() {
        let rule = RecurrenceRule::new(Frequency::Weekly, 0);
        assert!(rule.validate(date(2025, 1, 1)).is_err());
    }
}
