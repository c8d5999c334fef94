use crate::store::RecordStore;
use anyhow::Result;
use chrono::NaiveDate;

/// Consecutive-day usage counter. Same day leaves the count alone, the next
/// day extends it, any other gap starts over at 1.
pub fn bump(count: u32, last_login: Option<NaiveDate>, today: NaiveDate) -> u32 {
    match last_login {
        None => 1,
        Some(last) => match (today - last).num_days() {
            0 => count,
            1 => count + 1,
            _ => 1,
        },
    }
}

/// Applies the streak rule once per process start and persists the result.
pub fn record_login(store: &RecordStore, today: NaiveDate) -> Result<u32> {
    let count = bump(store.login_streak(), store.last_login(), today);
    store.set_login_streak(count)?;
    store.set_last_login(today)?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_first_login_starts_at_one() {
        assert_eq!(bump(0, None, day(1)), 1);
    }

    #[test]
    fn test_same_day_unchanged() {
        assert_eq!(bump(4, Some(day(10)), day(10)), 4);
    }

    #[test]
    fn test_next_day_increments() {
        assert_eq!(bump(4, Some(day(10)), day(11)), 5);
    }

    #[test]
    fn test_gap_resets() {
        assert_eq!(bump(4, Some(day(10)), day(13)), 1);
    }

    #[test]
    fn test_clock_rollback_resets() {
        assert_eq!(bump(4, Some(day(10)), day(9)), 1);
    }

    #[test]
    fn test_record_login_persists() {
        let store = RecordStore::in_memory();

        assert_eq!(record_login(&store, day(1)).unwrap(), 1);
        assert_eq!(record_login(&store, day(2)).unwrap(), 2);
        assert_eq!(record_login(&store, day(2)).unwrap(), 2);
        assert_eq!(record_login(&store, day(5)).unwrap(), 1);

        assert_eq!(store.login_streak(), 1);
        assert_eq!(store.last_login(), Some(day(5)));
    }
}
