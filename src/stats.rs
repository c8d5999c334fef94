use crate::models::{Category, TaskRecord};
use chrono::{Duration, Local, NaiveDate, TimeZone, Utc};
use std::collections::BTreeMap;

/// The chart always shows the last seven calendar days, zero-filled, so an
/// empty or single-day history still renders a full axis.
pub const WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCount {
    pub day: NaiveDate,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MineralCount {
    pub day: NaiveDate,
    pub rock: u32,
    pub pebble: u32,
    pub sand: u32,
}

impl MineralCount {
    pub fn total(&self) -> u32 {
        self.rock + self.pebble + self.sand
    }
}

/// Records bucket by the local calendar day of their timestamp.
fn local_day(timestamp_ms: i64) -> Option<NaiveDate> {
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|t| t.with_timezone(&Local).date_naive())
}

fn window(today: NaiveDate) -> Vec<NaiveDate> {
    (0..WINDOW_DAYS)
        .map(|i| today - Duration::days(WINDOW_DAYS - 1 - i))
        .collect()
}

/// Finished tasks per day over the window, ascending by date.
pub fn daily_counts(history: &[TaskRecord], today: NaiveDate) -> Vec<DayCount> {
    let mut buckets: BTreeMap<NaiveDate, u32> =
        window(today).into_iter().map(|d| (d, 0)).collect();
    for rec in history {
        if let Some(day) = local_day(rec.timestamp) {
            if let Some(count) = buckets.get_mut(&day) {
                *count += 1;
            }
        }
    }
    buckets
        .into_iter()
        .map(|(day, count)| DayCount { day, count })
        .collect()
}

/// Per-day counts split into the three mineral series.
pub fn mineral_counts(history: &[TaskRecord], today: NaiveDate) -> Vec<MineralCount> {
    let mut buckets: BTreeMap<NaiveDate, (u32, u32, u32)> =
        window(today).into_iter().map(|d| (d, (0, 0, 0))).collect();
    for rec in history {
        if let Some(day) = local_day(rec.timestamp) {
            if let Some((rock, pebble, sand)) = buckets.get_mut(&day) {
                match rec.category {
                    Category::Rock => *rock += 1,
                    Category::Pebble => *pebble += 1,
                    Category::Sand => *sand += 1,
                }
            }
        }
    }
    buckets
        .into_iter()
        .map(|(day, (rock, pebble, sand))| MineralCount {
            day,
            rock,
            pebble,
            sand,
        })
        .collect()
}

/// Running total of all finished tasks per window day. Records older than
/// the window are folded into the starting total so the curve never dips.
pub fn cumulative_counts(history: &[TaskRecord], today: NaiveDate) -> Vec<DayCount> {
    let daily = daily_counts(history, today);
    let start = today - Duration::days(WINDOW_DAYS - 1);
    let mut total = history
        .iter()
        .filter_map(|r| local_day(r.timestamp))
        .filter(|d| *d < start)
        .count() as u32;
    daily
        .into_iter()
        .map(|d| {
            total += d.count;
            DayCount {
                day: d.day,
                count: total,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_on(day: u32, hour: u32, category: Category) -> TaskRecord {
        // Timestamps built from local dates so bucketing is
        // timezone-independent in tests.
        let ts = Local
            .with_ymd_and_hms(2024, 3, day, hour, 0, 0)
            .unwrap()
            .timestamp_millis();
        TaskRecord {
            name: "t".into(),
            amount: "1.00".into(),
            timestamp: ts,
            duration: Some(60),
            category,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_empty_history_yields_seven_zero_buckets() {
        let counts = daily_counts(&[], day(10));
        assert_eq!(counts.len(), 7);
        assert_eq!(counts[0].day, day(4));
        assert_eq!(counts[6].day, day(10));
        assert!(counts.iter().all(|c| c.count == 0));
        // Strictly ascending.
        assert!(counts.windows(2).all(|w| w[0].day < w[1].day));
    }

    #[test]
    fn test_daily_counts_bucket_by_day() {
        let history = vec![
            record_on(10, 9, Category::Rock),
            record_on(10, 15, Category::Sand),
            record_on(8, 12, Category::Pebble),
            // Outside the window ending on the 10th.
            record_on(1, 12, Category::Rock),
        ];
        let counts = daily_counts(&history, day(10));
        assert_eq!(counts[6].count, 2);
        assert_eq!(counts[4].count, 1);
        assert_eq!(counts.iter().map(|c| c.count).sum::<u32>(), 3);
    }

    #[test]
    fn test_mineral_counts_split_by_category() {
        let history = vec![
            record_on(10, 9, Category::Rock),
            record_on(10, 10, Category::Rock),
            record_on(10, 11, Category::Pebble),
            record_on(9, 9, Category::Sand),
        ];
        let counts = mineral_counts(&history, day(10));
        assert_eq!(counts.len(), 7);

        let today = &counts[6];
        assert_eq!((today.rock, today.pebble, today.sand), (2, 1, 0));
        assert_eq!(today.total(), 3);

        let yesterday = &counts[5];
        assert_eq!((yesterday.rock, yesterday.pebble, yesterday.sand), (0, 0, 1));
    }

    #[test]
    fn test_cumulative_includes_older_history() {
        let history = vec![
            record_on(1, 9, Category::Rock),
            record_on(1, 10, Category::Rock),
            record_on(8, 9, Category::Rock),
            record_on(10, 9, Category::Rock),
        ];
        let counts = cumulative_counts(&history, day(10));
        // Two records predate the window, so the curve starts at 2.
        assert_eq!(counts[0].count, 2);
        assert_eq!(counts[4].count, 3);
        assert_eq!(counts[6].count, 4);
        // Never decreasing.
        assert!(counts.windows(2).all(|w| w[0].count <= w[1].count));
    }

    #[test]
    fn test_same_input_same_output() {
        let history = vec![record_on(9, 9, Category::Pebble)];
        assert_eq!(
            daily_counts(&history, day(10)),
            daily_counts(&history, day(10))
        );
    }
}
