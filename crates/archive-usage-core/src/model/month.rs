/// Calendar month keys — the bucket identity for usage and the row identity
/// of the report.
///
/// A `MonthKey` is a plain `(year, month)` pair. The derived ordering compares
/// year first, then month, which is chronological order.
use crate::error::UsageError;
use chrono::{DateTime, Datelike, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// First operational month of the archive. Every report starts here.
pub const ARCHIVE_EPOCH: MonthKey = MonthKey {
    year: 2005,
    month: 1,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Build a key, rejecting months outside `1..=12` and years that do not
    /// fit the four-digit `YYYYMM` form.
    pub fn new(year: i32, month: u32) -> Result<Self, UsageError> {
        if !(0..=9999).contains(&year) || !(1..=12).contains(&month) {
            return Err(UsageError::InvalidMonth(format!("{year:04}{month:02}")));
        }
        Ok(Self { year, month })
    }

    /// Bucket a timestamp into its calendar month, in the timestamp's own zone.
    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        Self {
            year: dt.year(),
            month: dt.month(),
        }
    }

    #[inline]
    pub fn year(self) -> i32 {
        self.year
    }

    #[inline]
    pub fn month(self) -> u32 {
        self.month
    }

    /// The following month, rolling December over into January.
    pub fn succ(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// The preceding month, rolling January back into December.
    pub fn pred(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// Every month from `self` through `end`, both inclusive.
    ///
    /// Yields nothing when `end` precedes `self`.
    pub fn months_through(self, end: MonthKey) -> MonthRange {
        MonthRange {
            next: (self <= end).then_some(self),
            end,
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || UsageError::InvalidMonth(s.to_string());
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let year: i32 = s[..4].parse().map_err(|_| invalid())?;
        let month: u32 = s[4..].parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl TryFrom<String> for MonthKey {
    type Error = UsageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MonthKey> for String {
    fn from(key: MonthKey) -> Self {
        key.to_string()
    }
}

/// Contiguous, strictly increasing walk over calendar months.
#[derive(Debug, Clone)]
pub struct MonthRange {
    next: Option<MonthKey>,
    end: MonthKey,
}

impl Iterator for MonthRange {
    type Item = MonthKey;

    fn next(&mut self) -> Option<MonthKey> {
        let current = self.next?;
        self.next = (current < self.end).then(|| current.succ());
        Some(current)
    }
}
