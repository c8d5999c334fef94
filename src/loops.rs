use crate::clock::Clock;
use crate::models::OpenLoop;
use crate::store::RecordStore;
use crate::utils::{format_money, money_for};
use anyhow::Result;
use std::rc::Rc;

/// Result of a play/pause toggle. `Activated` obliges the caller to pause
/// the main tracker: at most one of {tracker, any loop} counts at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Activated,
    Paused,
}

/// The open-loop dashboard: secondary timers for distractions the user
/// wants to see the price of. The whole list and the minimized flag are
/// persisted on every mutation.
pub struct LoopRegistry {
    store: RecordStore,
    clock: Rc<dyn Clock>,
    pub loops: Vec<OpenLoop>,
    pub minimized: bool,
    default_rate: f64,
}

impl LoopRegistry {
    pub fn new(store: RecordStore, clock: Rc<dyn Clock>, default_rate: f64) -> Self {
        let mut loops = store.open_loops();
        // A fresh session starts with the main tracker counting, so no loop
        // may come back active: one timer holds the clock at a time.
        for l in &mut loops {
            l.is_active = false;
        }
        let minimized = store.loops_minimized();
        Self {
            store,
            clock,
            loops,
            minimized,
            default_rate,
        }
    }

    fn save(&self) -> Result<()> {
        self.store.save_open_loops(&self.loops)
    }

    /// Prepends a new inactive loop. Blank titles are ignored.
    pub fn add(&mut self, title: &str) -> Result<bool> {
        if title.trim().is_empty() {
            return Ok(false);
        }
        // Creation time in ms is the id; bump past the newest existing id
        // so two loops created in the same millisecond stay distinct.
        let mut id = self.clock.now().timestamp_millis();
        if let Some(max) = self.loops.iter().map(|l| l.id).max() {
            if id <= max {
                id = max + 1;
            }
        }
        self.loops.insert(
            0,
            OpenLoop {
                id,
                title: title.to_string(),
                is_checked: false,
                time: 0,
                is_active: false,
                rate: self.default_rate,
            },
        );
        self.save()?;
        Ok(true)
    }

    /// Activates the target loop (deactivating every other one) or pauses
    /// it if it was already active. Unknown ids are ignored.
    pub fn toggle_play(&mut self, id: i64) -> Result<Option<Toggle>> {
        let Some(target) = self.loops.iter().position(|l| l.id == id) else {
            return Ok(None);
        };
        let outcome = if self.loops[target].is_active {
            self.loops[target].is_active = false;
            Toggle::Paused
        } else {
            for l in &mut self.loops {
                l.is_active = false;
            }
            self.loops[target].is_active = true;
            Toggle::Activated
        };
        self.save()?;
        Ok(Some(outcome))
    }

    /// Checking a loop completes it, which removes it outright; there is no
    /// persisted done state.
    pub fn complete(&mut self, id: i64) -> Result<()> {
        self.loops.retain(|l| l.id != id);
        self.save()
    }

    /// One second of time for the active loop, if any.
    pub fn tick(&mut self) -> Result<()> {
        if let Some(active) = self.loops.iter_mut().find(|l| l.is_active) {
            active.time += 1;
            self.save()?;
        }
        Ok(())
    }

    pub fn active(&self) -> Option<&OpenLoop> {
        self.loops.iter().find(|l| l.is_active)
    }

    pub fn toggle_minimized(&mut self) -> Result<()> {
        self.minimized = !self.minimized;
        self.store.set_loops_minimized(self.minimized)
    }

    pub fn cost(loop_: &OpenLoop) -> String {
        format_money(money_for(loop_.time, loop_.rate))
    }
}
