use chrono::{DateTime, Duration, Utc};
use std::rc::Rc;

/// Source of the current instant. Injected everywhere a timestamp is read
/// so tests can drive a virtual clock instead of the wall clock.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Gate for periodic work inside a polling loop. `due` reports how many
/// whole periods have elapsed since the last call, so a delayed poll
/// catches up instead of losing ticks, and dropping the ticker releases
/// the schedule.
pub struct Ticker {
    clock: Rc<dyn Clock>,
    period: Duration,
    last: DateTime<Utc>,
}

impl Ticker {
    pub fn new(clock: Rc<dyn Clock>, period: Duration) -> Self {
        let last = clock.now();
        Self {
            clock,
            period,
            last,
        }
    }

    pub fn due(&mut self) -> u32 {
        let now = self.clock.now();
        let mut fired = 0;
        while now - self.last >= self.period {
            self.last = self.last + self.period;
            fired += 1;
        }
        fired
    }
}

#[cfg(test)]
pub struct ManualClock {
    now: std::cell::Cell<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: std::cell::Cell::new(start),
        }
    }

    pub fn advance(&self, seconds: i64) {
        self.now.set(self.now.get() + Duration::seconds(seconds));
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_ticker_fires_once_per_period() {
        let clock = Rc::new(ManualClock::new(start()));
        let mut ticker = Ticker::new(clock.clone(), Duration::seconds(1));

        assert_eq!(ticker.due(), 0);
        clock.advance(1);
        assert_eq!(ticker.due(), 1);
        assert_eq!(ticker.due(), 0);
    }

    #[test]
    fn test_ticker_catches_up_after_delay() {
        let clock = Rc::new(ManualClock::new(start()));
        let mut ticker = Ticker::new(clock.clone(), Duration::seconds(1));

        clock.advance(5);
        assert_eq!(ticker.due(), 5);
        assert_eq!(ticker.due(), 0);
        clock.advance(2);
        assert_eq!(ticker.due(), 2);
    }
}
