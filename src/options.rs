//! Reader configuration.
//!
//! Statement lines carry their entry (booking) date as month and day only.
//! Producers disagree on which year that implies, so the year inference is a
//! policy the caller has to pick and there is no default.

use chrono::{Datelike, NaiveDate};
use std::fmt;

/// Resolves an entry date's year from the value date.
pub type EntryDateResolver = fn(value_date: NaiveDate, month: u32, day: u32) -> Option<NaiveDate>;

/// Strategy for completing `MMDD` entry dates.
#[derive(Clone, Copy)]
pub enum EntryDatePolicy {
    /// The valid candidate in the value date's year, the year before or the
    /// year after that lies closest to the value date. Ties go to the earlier date.
    NearestToValueDate,
    /// The value date's year, or the following year when the entry month is
    /// earlier than the value month.
    RolloverOnEarlierMonth,
    /// Caller supplied resolver.
    Custom(EntryDateResolver),
}

impl EntryDatePolicy {
    /// Complete `month`/`day` to a full date. `None` when no valid date results.
    pub fn resolve(&self, value_date: NaiveDate, month: u32, day: u32) -> Option<NaiveDate> {
        match self {
            EntryDatePolicy::NearestToValueDate => {
                let year = value_date.year();
                [year - 1, year, year + 1]
                    .into_iter()
                    .filter_map(|y| NaiveDate::from_ymd_opt(y, month, day))
                    .min_by_key(|candidate| ((*candidate - value_date).num_days().abs(), *candidate))
            }
            EntryDatePolicy::RolloverOnEarlierMonth => {
                let year = if month < value_date.month() {
                    value_date.year() + 1
                } else {
                    value_date.year()
                };
                NaiveDate::from_ymd_opt(year, month, day)
            }
            EntryDatePolicy::Custom(resolver) => resolver(value_date, month, day),
        }
    }
}

impl fmt::Debug for EntryDatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryDatePolicy::NearestToValueDate => f.write_str("NearestToValueDate"),
            EntryDatePolicy::RolloverOnEarlierMonth => f.write_str("RolloverOnEarlierMonth"),
            EntryDatePolicy::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Options shared by every reader in the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    pub entry_dates: EntryDatePolicy,
}

impl ReadOptions {
    pub fn new(entry_dates: EntryDatePolicy) -> Self {
        Self { entry_dates }
    }
}
