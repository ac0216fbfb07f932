/// Month-keyed byte totals accumulated during a single run.
///
/// The map is owned by exactly one run: the accumulator fills it, the report
/// generator reads it, and it is dropped once the report is written.
use super::month::MonthKey;
use serde::ser::{Serialize, Serializer};
use std::collections::HashMap;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UsageMap {
    buckets: HashMap<MonthKey, u64>,
}

impl UsageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `bytes` to the bucket for `key`, creating it when absent.
    ///
    /// Returns the bucket's new total. Repeated calls for the same key sum.
    pub fn increment(&mut self, key: MonthKey, bytes: u64) -> u64 {
        let total = self.buckets.entry(key).or_insert(0);
        *total = total.saturating_add(bytes);
        *total
    }

    /// Bytes recorded for `key`; an absent month counts as zero.
    #[inline]
    pub fn get(&self, key: MonthKey) -> u64 {
        self.buckets.get(&key).copied().unwrap_or(0)
    }

    #[inline]
    pub fn contains(&self, key: MonthKey) -> bool {
        self.buckets.contains_key(&key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Sum over every bucket, regardless of month.
    pub fn total(&self) -> u64 {
        self.buckets
            .values()
            .fold(0u64, |acc, &bytes| acc.saturating_add(bytes))
    }

    /// Buckets in ascending month order.
    pub fn iter_sorted(&self) -> Vec<(MonthKey, u64)> {
        let mut entries: Vec<(MonthKey, u64)> =
            self.buckets.iter().map(|(&k, &v)| (k, v)).collect();
        entries.sort_unstable_by_key(|&(k, _)| k);
        entries
    }
}

impl Serialize for UsageMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.iter_sorted()
                .into_iter()
                .map(|(month, bytes)| (month.to_string(), bytes)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> MonthKey {
        s.parse().unwrap()
    }

    #[test]
    fn absent_month_reads_as_zero() {
        let usage = UsageMap::new();
        assert_eq!(usage.get(key("201510")), 0);
        assert!(!usage.contains(key("201510")));
    }

    #[test]
    fn increment_initialises_then_sums() {
        let mut usage = UsageMap::new();
        assert_eq!(usage.increment(key("201610"), 1_024), 1_024);
        assert_eq!(usage.increment(key("201610"), 2_048), 3_072);
        assert_eq!(usage.get(key("201610")), 3_072);
        assert_eq!(usage.len(), 1);
    }

    /// The final total must not depend on the order projects were added in.
    #[test]
    fn increment_order_does_not_matter() {
        let mut a = UsageMap::new();
        let mut b = UsageMap::new();
        for bytes in [5u64, 100, 7] {
            a.increment(key("201801"), bytes);
        }
        for bytes in [7u64, 5, 100] {
            b.increment(key("201801"), bytes);
        }
        assert_eq!(a, b);
    }

    #[test]
    fn zero_increment_still_records_the_month() {
        let mut usage = UsageMap::new();
        usage.increment(key("201611"), 0);
        assert!(usage.contains(key("201611")));
        assert_eq!(usage.get(key("201611")), 0);
    }

    #[test]
    fn increment_saturates_instead_of_wrapping() {
        let mut usage = UsageMap::new();
        usage.increment(key("201601"), u64::MAX - 1);
        assert_eq!(usage.increment(key("201601"), 10), u64::MAX);
    }

    #[test]
    fn total_and_sorted_iteration() {
        let mut usage = UsageMap::new();
        usage.increment(key("201801"), 30);
        usage.increment(key("201510"), 10);
        usage.increment(key("201610"), 20);
        assert_eq!(usage.total(), 60);
        let months: Vec<String> = usage
            .iter_sorted()
            .into_iter()
            .map(|(m, _)| m.to_string())
            .collect();
        assert_eq!(months, ["201510", "201610", "201801"]);
    }

    #[test]
    fn serialises_as_month_ordered_object() {
        let mut usage = UsageMap::new();
        usage.increment(key("201610"), 2);
        usage.increment(key("201510"), 1);
        let json = serde_json::to_string(&usage).unwrap();
        assert_eq!(json, r#"{"201510":1,"201610":2}"#);
    }
}
