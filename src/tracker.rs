use crate::clock::Clock;
use crate::models::{Category, TaskRecord};
use crate::store::RecordStore;
use crate::utils::{format_money, money_for};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::rc::Rc;

/// The main stopwatch. Elapsed time is always re-derived from an absolute
/// start instant, never incremented, so ticks cannot drift and a restarted
/// process resumes exactly where the wall clock says it should.
pub struct Tracker {
    store: RecordStore,
    clock: Rc<dyn Clock>,
    pub hourly_rate: f64,
    pub elapsed: u64,
    pub current_task: String,
    pub current_category: Category,
    start_instant: Option<DateTime<Utc>>,
}

impl Tracker {
    /// Loads persisted state but does not start counting; call `resume`
    /// once the caller is ready to run. Starting from an unloaded baseline
    /// would race the display against a zero timer.
    pub fn new(store: RecordStore, clock: Rc<dyn Clock>, default_rate: f64) -> Self {
        let hourly_rate = store.hourly_rate().unwrap_or(default_rate);
        let elapsed = store.timer();
        let current_task = store.current_task();
        let current_category = store.current_category();
        Self {
            store,
            clock,
            hourly_rate,
            elapsed,
            current_task,
            current_category,
            start_instant: None,
        }
    }

    /// Rebinds the start instant so the persisted elapsed value keeps
    /// counting forward from now.
    pub fn resume(&mut self) {
        self.start_instant =
            Some(self.clock.now() - Duration::seconds(self.elapsed as i64));
    }

    /// Freezes the stopwatch at its current value. Used while an open loop
    /// is counting instead.
    pub fn pause(&mut self) -> Result<()> {
        self.tick()?;
        self.start_instant = None;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.start_instant.is_some()
    }

    pub fn tick(&mut self) -> Result<()> {
        if let Some(start) = self.start_instant {
            let seconds = (self.clock.now() - start).num_seconds();
            self.elapsed = seconds.max(0) as u64;
            self.store.set_timer(self.elapsed)?;
        }
        Ok(())
    }

    /// Logs the current task to history and restarts the stopwatch. A name
    /// that is blank after trimming produces no record, but the timer still
    /// resets: abandoned work is discarded, not retried.
    pub fn finish(&mut self) -> Result<Option<TaskRecord>> {
        let now = self.clock.now();
        let record = if self.current_task.trim().is_empty() {
            None
        } else {
            let record = TaskRecord {
                name: self.current_task.clone(),
                amount: format_money(self.amount_spent()),
                timestamp: now.timestamp_millis(),
                duration: Some(self.elapsed),
                category: self.current_category,
            };
            self.store.push_task(record.clone())?;
            Some(record)
        };

        self.current_task.clear();
        self.store.set_current_task("")?;
        self.elapsed = 0;
        self.store.set_timer(0)?;
        // Restart only if the stopwatch was counting; a paused tracker
        // stays paused so an active open loop keeps exclusive time.
        if self.start_instant.is_some() {
            self.start_instant = Some(now);
        }
        Ok(record)
    }

    pub fn reset(&mut self) -> Result<()> {
        self.elapsed = 0;
        self.start_instant = None;
        self.store.set_timer(0)
    }

    pub fn amount_spent(&self) -> f64 {
        money_for(self.elapsed, self.hourly_rate)
    }

    pub fn per_minute(&self) -> f64 {
        self.hourly_rate / 60.0
    }

    pub fn per_second(&self) -> f64 {
        self.hourly_rate / 3600.0
    }

    pub fn set_rate(&mut self, rate: f64) -> Result<()> {
        self.hourly_rate = rate;
        self.store.set_hourly_rate(rate)
    }

    pub fn set_task_name(&mut self, name: &str) -> Result<()> {
        self.current_task = name.to_string();
        self.store.set_current_task(name)
    }

    pub fn set_category(&mut self, category: Category) -> Result<()> {
        self.current_category = category;
        self.store.set_current_category(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::DEFAULT_HOURLY_RATE;
    use chrono::TimeZone;

    fn setup() -> (RecordStore, Rc<ManualClock>, Tracker) {
        let store = RecordStore::in_memory();
        let clock = Rc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        ));
        let tracker = Tracker::new(store.clone(), clock.clone(), DEFAULT_HOURLY_RATE);
        (store, clock, tracker)
    }

    #[test]
    fn test_resume_counts_forward_from_persisted_elapsed() {
        let (store, clock, _) = setup();
        store.set_timer(5).unwrap();

        let mut tracker = Tracker::new(store.clone(), clock.clone(), DEFAULT_HOURLY_RATE);
        tracker.resume();
        clock.advance(7);
        tracker.tick().unwrap();

        assert_eq!(tracker.elapsed, 12);
        assert_eq!(store.timer(), 12);
    }

    #[test]
    fn test_elapsed_survives_simulated_reload() {
        let (store, clock, mut tracker) = setup();
        tracker.resume();
        clock.advance(30);
        tracker.tick().unwrap();
        drop(tracker);

        // New process: same store, counting continues monotonically.
        let mut reloaded = Tracker::new(store.clone(), clock.clone(), DEFAULT_HOURLY_RATE);
        reloaded.resume();
        clock.advance(10);
        reloaded.tick().unwrap();
        assert_eq!(reloaded.elapsed, 40);
    }

    #[test]
    fn test_tick_recomputes_instead_of_incrementing() {
        let (_, clock, mut tracker) = setup();
        tracker.resume();

        // One tick after a 5 s stall still lands on wall-clock truth.
        clock.advance(5);
        tracker.tick().unwrap();
        assert_eq!(tracker.elapsed, 5);
    }

    #[test]
    fn test_finish_blank_name_discards_but_resets() {
        let (store, clock, mut tracker) = setup();
        tracker.set_task_name("   ").unwrap();
        tracker.resume();
        clock.advance(90);
        tracker.tick().unwrap();

        let record = tracker.finish().unwrap();
        assert!(record.is_none());
        assert!(store.task_history().is_empty());
        assert_eq!(tracker.elapsed, 0);
        assert_eq!(store.timer(), 0);
        assert!(tracker.is_running());
    }

    #[test]
    fn test_finish_emits_record_and_resets() {
        let (store, clock, mut tracker) = setup();
        tracker.set_task_name("Write report").unwrap();
        tracker.resume();
        clock.advance(125);
        tracker.tick().unwrap();

        let record = tracker.finish().unwrap().unwrap();
        assert_eq!(record.name, "Write report");
        assert_eq!(record.amount, "3.13");
        assert_eq!(record.duration, Some(125));
        assert_eq!(record.category, Category::Rock);
        assert_eq!(record.timestamp, clock.now().timestamp_millis());

        let history = store.task_history();
        assert_eq!(history.len(), 1);
        assert_eq!(tracker.elapsed, 0);
        assert_eq!(tracker.current_task, "");
        assert_eq!(store.current_task(), "");

        // Stopwatch restarted from the finish instant.
        clock.advance(3);
        tracker.tick().unwrap();
        assert_eq!(tracker.elapsed, 3);
    }

    #[test]
    fn test_finish_prepends_newest_first() {
        let (store, clock, mut tracker) = setup();
        tracker.resume();
        tracker.set_task_name("first").unwrap();
        clock.advance(10);
        tracker.tick().unwrap();
        tracker.finish().unwrap();

        tracker.set_task_name("second").unwrap();
        clock.advance(20);
        tracker.tick().unwrap();
        tracker.finish().unwrap();

        let names: Vec<_> = store.task_history().into_iter().map(|r| r.name).collect();
        assert_eq!(names, ["second", "first"]);
    }

    #[test]
    fn test_amount_spent_property() {
        let (_, clock, mut tracker) = setup();
        tracker.set_rate(90.0).unwrap();
        tracker.resume();
        clock.advance(125);
        tracker.tick().unwrap();

        assert_eq!(format_money(tracker.amount_spent()), "3.13");
        assert_eq!(format_money(tracker.per_minute()), "1.50");
        assert_eq!(format_money(tracker.per_second()), "0.03");
    }

    #[test]
    fn test_pause_freezes_elapsed() {
        let (store, clock, mut tracker) = setup();
        tracker.resume();
        clock.advance(10);
        tracker.pause().unwrap();

        clock.advance(100);
        tracker.tick().unwrap();
        assert_eq!(tracker.elapsed, 10);
        assert_eq!(store.timer(), 10);

        tracker.resume();
        clock.advance(5);
        tracker.tick().unwrap();
        assert_eq!(tracker.elapsed, 15);
    }

    #[test]
    fn test_reset_clears_and_stops() {
        let (store, clock, mut tracker) = setup();
        tracker.resume();
        clock.advance(50);
        tracker.tick().unwrap();

        tracker.reset().unwrap();
        assert_eq!(tracker.elapsed, 0);
        assert_eq!(store.timer(), 0);
        assert!(!tracker.is_running());
    }

    #[test]
    fn test_setters_write_through() {
        let (store, _, mut tracker) = setup();
        tracker.set_rate(45.5).unwrap();
        tracker.set_task_name("emails").unwrap();
        tracker.set_category(Category::Sand).unwrap();

        assert_eq!(store.hourly_rate(), Some(45.5));
        assert_eq!(store.current_task(), "emails");
        assert_eq!(store.current_category(), Category::Sand);
    }

    #[test]
    fn test_negative_rate_left_permissive() {
        let (_, clock, mut tracker) = setup();
        tracker.set_rate(-90.0).unwrap();
        tracker.resume();
        clock.advance(125);
        tracker.tick().unwrap();
        assert_eq!(format_money(tracker.amount_spent()), "-3.13");
    }
}
