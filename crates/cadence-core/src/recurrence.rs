use chrono::{DateTime, Duration, Months, Utc};

use crate::error::CoreError;
use crate::models::{Frequency, IntervalUnit, RecurrenceRule};

/// Shifts a timestamp by whole calendar months, preserving the time of day.
/// Day-of-month is clamped to the target month's last day where the source
/// day does not exist (Jan 31 + 1 month = Feb 28, or Feb 29 in leap years).
fn shift_months(anchor: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    anchor
        .checked_add_months(Months::new(months))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl RecurrenceRule {
    /// Creates a validated rule with no bounds. Bounds are added with
    /// [`until`](Self::until) and [`limited_to`](Self::limited_to).
    ///
    /// # Errors
    /// * `CoreError::InvalidRule` if a custom frequency carries a zero
    ///   interval. Validation is front-loaded here so the calculation paths
    ///   never see a malformed rule.
    pub fn new(frequency: Frequency, anchor_start: DateTime<Utc>) -> Result<Self, CoreError> {
        if let Frequency::Custom { interval: 0, .. } = frequency {
            return Err(CoreError::InvalidRule(
                "custom frequency requires an interval of at least 1".to_string(),
            ));
        }
        Ok(Self {
            frequency,
            anchor_start,
            end_bound: None,
            count_bound: None,
        })
    }

    /// Returns the rule with a terminal date bound. No occurrence later than
    /// `end_bound` is generated; an occurrence falling exactly on it still is.
    pub fn until(mut self, end_bound: DateTime<Utc>) -> Self {
        self.end_bound = Some(end_bound);
        self
    }

    /// Returns the rule with a maximum occurrence count.
    pub fn limited_to(mut self, count_bound: u32) -> Self {
        self.count_bound = Some(count_bound);
        self
    }

    /// Advances an anchor timestamp by exactly one step of this rule's
    /// frequency. Pure and total: day and week steps are fixed-length
    /// regardless of month boundaries or leap years, month steps use
    /// calendar arithmetic with end-of-month clamping.
    pub fn advance(&self, anchor: DateTime<Utc>) -> DateTime<Utc> {
        match self.frequency {
            Frequency::Daily => anchor + Duration::days(1),
            Frequency::Weekly => anchor + Duration::days(7),
            Frequency::BiWeekly => anchor + Duration::days(14),
            Frequency::Monthly => shift_months(anchor, 1),
            Frequency::Custom { interval, unit } => match unit {
                IntervalUnit::Days => anchor + Duration::days(i64::from(interval)),
                IntervalUnit::Weeks => anchor + Duration::days(i64::from(interval) * 7),
                IntervalUnit::Months => shift_months(anchor, interval),
            },
        }
    }

    /// Computes the next due timestamp given the most recently materialized
    /// occurrence. A definition that has never generated is due at
    /// `anchor_start` itself, not at start-plus-one-interval.
    pub fn next_occurrence(&self, last_generated: Option<DateTime<Utc>>) -> DateTime<Utc> {
        match last_generated {
            None => self.anchor_start,
            Some(anchor) => self.advance(anchor),
        }
    }

    /// Counts the occurrences this rule produces in `[start, end]`, both
    /// boundaries inclusive.
    ///
    /// The count walks the occurrence grid from `anchor_start` one step at a
    /// time. Dividing elapsed time by an average period length miscounts
    /// month-based rules, since months run 28 to 31 days.
    pub fn occurrences_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
        if end < start {
            return 0;
        }
        let mut count = 0;
        let mut cursor = self.anchor_start;
        while cursor <= end {
            if cursor >= start {
                count += 1;
            }
            let next = self.advance(cursor);
            if next <= cursor {
                // advance saturates at the far end of the calendar
                break;
            }
            cursor = next;
        }
        count
    }

    /// Number of occurrences already produced once `last_generated` is the
    /// most recently materialized one. `None` means nothing was produced.
    pub fn occurrences_through(&self, last_generated: Option<DateTime<Utc>>) -> u32 {
        match last_generated {
            None => 0,
            Some(last) => self.occurrences_between(self.anchor_start, last),
        }
    }

    /// The next up-to-`count` occurrence timestamps this rule would still
    /// produce after `last_generated`, honoring both bounds. Intended for
    /// "upcoming due dates" views.
    pub fn preview(
        &self,
        last_generated: Option<DateTime<Utc>>,
        count: usize,
    ) -> Vec<DateTime<Utc>> {
        let mut upcoming = Vec::with_capacity(count);
        let mut produced = self.occurrences_through(last_generated);
        let mut cursor = last_generated;
        while upcoming.len() < count {
            let next = self.next_occurrence(cursor);
            if self.end_bound.is_some_and(|end| next > end) {
                break;
            }
            if self.count_bound.is_some_and(|limit| produced >= limit) {
                break;
            }
            if cursor.is_some_and(|prev| next <= prev) {
                break;
            }
            upcoming.push(next);
            produced += 1;
            cursor = Some(next);
        }
        upcoming
    }
}
