//! Dashboard metrics derived from the log snapshot.
//!
//! Every function here is a pure, total transformation: it takes the
//! current record set (already sorted newest-first by the store) and
//! returns a fresh derived collection. Nothing is retained between calls
//! and the input is never mutated; the caller re-invokes on every change
//! notification and recomputes from the full snapshot.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::record::LogRecord;

/// Bucket label for records missing a location or refrigerant value.
pub const UNKNOWN: &str = "Unknown";

/// Summary counters shown in the dashboard stat tiles.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct Stats {
    pub total_entries: usize,
    pub total_gas: f64,
    pub active_sites: usize,
}

/// Per-refrigerant consumption, in first-appearance order.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct GasUsage {
    pub name: String,
    pub amount: f64,
}

/// Per-location entry count for the distribution view.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct SiteCount {
    pub name: String,
    pub value: usize,
}

/// Per-location consumption with share of the grand total.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct SiteUsage {
    pub name: String,
    pub amount: f64,
    pub percentage: u32,
}

/// Per-day consumption, oldest day first.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct DayUsage {
    pub date: String,
    pub amount: f64,
}

// Missing or malformed amounts contribute zero to every sum.
fn pounds(record: &LogRecord) -> f64 {
    match record.amount {
        Some(a) if a.is_finite() => a,
        _ => 0.0,
    }
}

// Missing locations and refrigerants all land in the "Unknown" bucket.
fn bucket(value: Option<&str>) -> &str {
    match value {
        Some(s) if !s.trim().is_empty() => s,
        _ => UNKNOWN,
    }
}

// Round half-up at the tenths digit.
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Summary counters over the whole snapshot.
///
/// `total_gas` sums `amount` with missing values as zero, rounded to one
/// decimal. `active_sites` counts distinct locations, with missing values
/// coalesced into the single "Unknown" bucket so the count agrees with the
/// grouping used by [`by_location`] and [`leaderboard`]. An empty input
/// yields all zeros.
pub fn summarize(records: &[LogRecord]) -> Stats {
    let mut total_gas = 0.0;
    let mut sites = HashSet::new();

    for record in records {
        total_gas += pounds(record);
        sites.insert(bucket(record.location.as_deref()));
    }

    Stats {
        total_entries: records.len(),
        total_gas: round1(total_gas),
        active_sites: sites.len(),
    }
}

/// Consumption grouped by refrigerant type.
///
/// Output order is the first appearance of each distinct refrigerant while
/// scanning the (newest-first) input, NOT sorted by amount; the bar chart
/// renders groups in exactly this order.
pub fn by_refrigerant(records: &[LogRecord]) -> Vec<GasUsage> {
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, f64> = HashMap::new();

    for record in records {
        let name = bucket(record.refrigerant.as_deref());
        if !totals.contains_key(name) {
            order.push(name.to_string());
        }
        *totals.entry(name.to_string()).or_insert(0.0) += pounds(record);
    }

    order
        .into_iter()
        .map(|name| {
            let amount = round1(totals[&name]);
            GasUsage { name, amount }
        })
        .collect()
}

/// Entry counts for the first 5 distinct locations.
///
/// Truncation keeps the first five groups in order of first appearance,
/// not the five largest.
pub fn by_location(records: &[LogRecord]) -> Vec<SiteCount> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for record in records {
        let name = bucket(record.location.as_deref());
        if !counts.contains_key(name) {
            order.push(name.to_string());
        }
        *counts.entry(name.to_string()).or_insert(0) += 1;
    }

    order
        .into_iter()
        .take(5)
        .map(|name| {
            let value = counts[&name];
            SiteCount { name, value }
        })
        .collect()
}

/// Locations ranked by total consumption.
///
/// `percentage` is the group's share of the grand total, rounded and
/// clamped to 100; it is defined as 0 when the grand total is 0. Sorting
/// is stable, so groups with equal amounts keep first-appearance order.
pub fn leaderboard(records: &[LogRecord]) -> Vec<SiteUsage> {
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, f64> = HashMap::new();
    let mut grand_total = 0.0;

    for record in records {
        let name = bucket(record.location.as_deref());
        if !totals.contains_key(name) {
            order.push(name.to_string());
        }
        let amount = pounds(record);
        *totals.entry(name.to_string()).or_insert(0.0) += amount;
        grand_total += amount;
    }

    let mut ranked: Vec<SiteUsage> = order
        .into_iter()
        .map(|name| {
            let amount = totals[&name];
            let percentage = if grand_total > 0.0 {
                ((100.0 * amount / grand_total).round() as u32).min(100)
            } else {
                0
            };
            SiteUsage {
                name,
                amount: round1(amount),
                percentage,
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    ranked
}

/// Consumption summed per calendar day of `created_at`.
///
/// Day keys are locale-independent `%Y-%m-%d` strings. The input is
/// scanned newest-first, then the grouped sequence is reversed so the
/// output runs oldest-day-first and a time-series chart renders
/// left-to-right chronologically.
pub fn timeline(records: &[LogRecord]) -> Vec<DayUsage> {
    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, f64> = HashMap::new();

    for record in records {
        let day = record.created_at.format("%Y-%m-%d").to_string();
        if !totals.contains_key(&day) {
            order.push(day.clone());
        }
        *totals.entry(day).or_insert(0.0) += pounds(record);
    }

    order
        .into_iter()
        .rev()
        .map(|date| {
            let amount = round1(totals[&date]);
            DayUsage { date, amount }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(
        id: u64,
        day: u32,
        location: Option<&str>,
        refrigerant: Option<&str>,
        amount: Option<f64>,
    ) -> LogRecord {
        LogRecord {
            id,
            created_at: Utc.with_ymd_and_hms(2025, 11, day, 12, 0, 0).unwrap(),
            location: location.map(str::to_string),
            unit_id: format!("AC-{id}"),
            refrigerant: refrigerant.map(str::to_string),
            amount,
        }
    }

    // The concrete scenario: three records across two sites and two days,
    // presented newest-first.
    fn sample() -> Vec<LogRecord> {
        vec![
            record(3, 2, Some("B"), Some("R-410A"), Some(2.0)),
            record(2, 1, Some("A"), Some("R-22"), Some(3.0)),
            record(1, 1, Some("A"), Some("R-410A"), Some(5.0)),
        ]
    }

    #[test]
    fn summarize_empty_is_all_zeros() {
        let stats = summarize(&[]);
        assert_eq!(
            stats,
            Stats {
                total_entries: 0,
                total_gas: 0.0,
                active_sites: 0
            }
        );
    }

    #[test]
    fn summarize_counts_and_sums() {
        let stats = summarize(&sample());
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.total_gas, 10.0);
        assert_eq!(stats.active_sites, 2);
    }

    #[test]
    fn summarize_rounds_to_one_decimal() {
        let records = vec![
            record(2, 1, Some("A"), None, Some(0.08)),
            record(1, 1, Some("A"), None, Some(0.07)),
        ];
        assert_eq!(summarize(&records).total_gas, 0.2);
    }

    #[test]
    fn missing_location_coalesces_into_one_unknown_site() {
        let records = vec![
            record(3, 1, None, None, Some(1.0)),
            record(2, 1, Some(""), None, Some(1.0)),
            record(1, 1, Some("A"), None, Some(1.0)),
        ];
        // None and empty both land in "Unknown", so two distinct sites.
        assert_eq!(summarize(&records).active_sites, 2);
    }

    #[test]
    fn by_refrigerant_groups_in_first_appearance_order() {
        let groups = by_refrigerant(&sample());
        assert_eq!(
            groups,
            vec![
                GasUsage {
                    name: "R-410A".to_string(),
                    amount: 7.0
                },
                GasUsage {
                    name: "R-22".to_string(),
                    amount: 3.0
                },
            ]
        );
    }

    #[test]
    fn by_refrigerant_distinct_group_count() {
        let records = vec![
            record(4, 1, Some("A"), Some("R-22"), Some(1.0)),
            record(3, 1, Some("A"), None, Some(1.0)),
            record(2, 1, Some("A"), Some("R-410A"), Some(1.0)),
            record(1, 1, Some("A"), None, Some(1.0)),
        ];
        let groups = by_refrigerant(&records);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[1].name, UNKNOWN);
        assert_eq!(groups[1].amount, 2.0);
    }

    #[test]
    fn by_location_truncates_to_first_five_groups() {
        let records: Vec<LogRecord> = (0..8)
            .map(|i| {
                let site = format!("Site {i}");
                record(8 - i as u64, 1, Some(site.as_str()), None, Some(1.0))
            })
            .collect();
        let groups = by_location(&records);
        assert_eq!(groups.len(), 5);
        // First appearance wins, not largest count.
        assert_eq!(groups[0].name, "Site 0");
        assert_eq!(groups[4].name, "Site 4");
    }

    #[test]
    fn by_location_counts_occurrences_not_amounts() {
        let groups = by_location(&sample());
        assert_eq!(
            groups,
            vec![
                SiteCount {
                    name: "B".to_string(),
                    value: 1
                },
                SiteCount {
                    name: "A".to_string(),
                    value: 2
                },
            ]
        );
    }

    #[test]
    fn leaderboard_ranks_descending_with_percentages() {
        let ranked = leaderboard(&sample());
        assert_eq!(
            ranked,
            vec![
                SiteUsage {
                    name: "A".to_string(),
                    amount: 8.0,
                    percentage: 80
                },
                SiteUsage {
                    name: "B".to_string(),
                    amount: 2.0,
                    percentage: 20
                },
            ]
        );
    }

    #[test]
    fn leaderboard_percentages_stay_in_bounds() {
        let records = vec![
            record(3, 1, Some("A"), None, Some(1.0)),
            record(2, 1, Some("B"), None, Some(1.0)),
            record(1, 1, Some("C"), None, Some(1.0)),
        ];
        for site in leaderboard(&records) {
            assert!(site.percentage <= 100);
        }
    }

    #[test]
    fn leaderboard_zero_total_yields_zero_percentages() {
        let records = vec![
            record(2, 1, Some("A"), None, None),
            record(1, 1, Some("B"), None, Some(0.0)),
        ];
        let ranked = leaderboard(&records);
        assert_eq!(ranked.len(), 2);
        for site in &ranked {
            assert_eq!(site.percentage, 0);
        }
    }

    #[test]
    fn leaderboard_ties_keep_first_appearance_order() {
        let records = vec![
            record(2, 1, Some("B"), None, Some(4.0)),
            record(1, 1, Some("A"), None, Some(4.0)),
        ];
        let ranked = leaderboard(&records);
        assert_eq!(ranked[0].name, "B");
        assert_eq!(ranked[1].name, "A");
    }

    #[test]
    fn timeline_runs_oldest_day_first() {
        let days = timeline(&sample());
        assert_eq!(
            days,
            vec![
                DayUsage {
                    date: "2025-11-01".to_string(),
                    amount: 8.0
                },
                DayUsage {
                    date: "2025-11-02".to_string(),
                    amount: 2.0
                },
            ]
        );
    }

    #[test]
    fn timeline_conserves_the_grand_total() {
        let records = vec![
            record(4, 3, Some("A"), None, Some(1.3)),
            record(3, 2, Some("B"), None, None),
            record(2, 2, Some("A"), None, Some(2.2)),
            record(1, 1, Some("C"), None, Some(0.5)),
        ];
        let day_sum: f64 = timeline(&records).iter().map(|d| d.amount).sum();
        assert_eq!(round1(day_sum), summarize(&records).total_gas);
    }

    #[test]
    fn null_amount_contributes_zero_everywhere() {
        let records = vec![
            record(2, 1, Some("A"), Some("R-22"), None),
            record(1, 1, Some("A"), Some("R-22"), Some(3.0)),
        ];
        assert_eq!(summarize(&records).total_gas, 3.0);
        assert_eq!(by_refrigerant(&records)[0].amount, 3.0);
        assert_eq!(leaderboard(&records)[0].amount, 3.0);
        assert_eq!(timeline(&records)[0].amount, 3.0);
    }

    #[test]
    fn non_finite_amount_degrades_to_zero() {
        let records = vec![record(1, 1, Some("A"), None, Some(f64::NAN))];
        assert_eq!(summarize(&records).total_gas, 0.0);
        assert_eq!(leaderboard(&records)[0].percentage, 0);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let records = sample();
        assert_eq!(summarize(&records), summarize(&records));
        assert_eq!(by_refrigerant(&records), by_refrigerant(&records));
        assert_eq!(by_location(&records), by_location(&records));
        assert_eq!(leaderboard(&records), leaderboard(&records));
        assert_eq!(timeline(&records), timeline(&records));
    }
}
