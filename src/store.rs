use crate::models::{Category, OpenLoop, TaskRecord};
use anyhow::Result;
use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

pub const DEFAULT_HOURLY_RATE: f64 = 90.0;
pub const DEFAULT_LOOP_RATE: f64 = 1000.0;

/// Persisted key names. These match the original extension's storage so a
/// migrated store keeps working.
pub mod keys {
    pub const HOURLY_RATE: &str = "hourlyRate";
    pub const TIMER: &str = "timer";
    pub const CURRENT_TASK: &str = "currentTask";
    pub const CURRENT_TASK_CATEGORY: &str = "currentTaskCategory";
    pub const TASK_HISTORY: &str = "taskHistory";
    pub const OPEN_LOOPS: &str = "openLoopsDashboard";
    pub const OPEN_LOOPS_MINIMIZED: &str = "openLoopsMinimized";
    pub const SHOW_MINERALS: &str = "showMinerals";
    pub const TASK_HISTORY_MINIMIZED: &str = "taskHistoryMinimized";
    pub const LOGIN_STREAK: &str = "loginStreak";
    pub const LAST_LOGIN_DATE: &str = "lastLoginDate";
    pub const DATA_VERSION: &str = "dataVersion";
    pub const HISTORY_BACKUP_PREFIX: &str = "taskHistoryBackup_";
}

/// Flat string-keyed, string-valued storage. The file-backed and in-memory
/// implementations are interchangeable, which is what keeps the tracker and
/// registry testable without touching the filesystem.
pub trait StoragePort {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Key-value store persisted as a single JSON object. Every `set` rewrites
/// the file through a temp-file rename, so a crash never leaves a torn file.
pub struct FileStore {
    path: PathBuf,
    map: RefCell<BTreeMap<String, String>>,
}

impl FileStore {
    pub fn base_dir() -> Result<PathBuf> {
        let mut path =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
        path.push(".burnmeter");
        if !path.exists() {
            fs::create_dir_all(&path)?;
        }
        Ok(path)
    }

    pub fn open_default() -> Result<Self> {
        let path = Self::base_dir()?;
        Ok(Self::from_path(path.join("store.json")))
    }

    pub fn from_path(path: PathBuf) -> Self {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                let _ = fs::create_dir_all(parent);
            }
        }
        let map = fs::read_to_string(&path)
            .ok()
            .and_then(|data| serde_json::from_str(&data).ok())
            .unwrap_or_default();
        Self {
            path,
            map: RefCell::new(map),
        }
    }

    fn write_out(&self) -> Result<()> {
        let data = serde_json::to_string_pretty(&*self.map.borrow())?;
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, &data)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl StoragePort for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.map
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self.write_out()
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MemStore {
    map: RefCell<BTreeMap<String, String>>,
}

#[cfg(test)]
impl StoragePort for MemStore {
    fn get(&self, key: &str) -> Option<String> {
        self.map.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.map
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Typed access to every persisted setting. Reads fall back silently to the
/// documented defaults when a key is absent or holds something unparseable;
/// writes go through to the port immediately, one key at a time.
#[derive(Clone)]
pub struct RecordStore {
    port: Rc<dyn StoragePort>,
}

impl RecordStore {
    pub fn open() -> Result<Self> {
        Ok(Self::new(Rc::new(FileStore::open_default()?)))
    }

    pub fn new(port: Rc<dyn StoragePort>) -> Self {
        Self { port }
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::new(Rc::new(MemStore::default()))
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.port.get(key)
    }

    pub fn set_raw(&self, key: &str, value: &str) -> Result<()> {
        self.port.set(key, value)
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        self.raw(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    pub fn hourly_rate(&self) -> Option<f64> {
        self.raw(keys::HOURLY_RATE).and_then(|v| v.parse().ok())
    }

    pub fn set_hourly_rate(&self, rate: f64) -> Result<()> {
        self.set_raw(keys::HOURLY_RATE, &rate.to_string())
    }

    pub fn timer(&self) -> u64 {
        self.raw(keys::TIMER)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    pub fn set_timer(&self, seconds: u64) -> Result<()> {
        self.set_raw(keys::TIMER, &seconds.to_string())
    }

    pub fn current_task(&self) -> String {
        self.raw(keys::CURRENT_TASK).unwrap_or_default()
    }

    pub fn set_current_task(&self, name: &str) -> Result<()> {
        self.set_raw(keys::CURRENT_TASK, name)
    }

    pub fn current_category(&self) -> Category {
        self.raw(keys::CURRENT_TASK_CATEGORY)
            .and_then(|v| Category::parse(&v))
            .unwrap_or_default()
    }

    pub fn set_current_category(&self, category: Category) -> Result<()> {
        self.set_raw(keys::CURRENT_TASK_CATEGORY, category.as_str())
    }

    pub fn task_history(&self) -> Vec<TaskRecord> {
        self.raw(keys::TASK_HISTORY)
            .and_then(|v| serde_json::from_str(&v).ok())
            .unwrap_or_default()
    }

    pub fn save_task_history(&self, history: &[TaskRecord]) -> Result<()> {
        self.set_raw(keys::TASK_HISTORY, &serde_json::to_string(history)?)
    }

    /// Prepends a record so the history stays newest-first.
    pub fn push_task(&self, record: TaskRecord) -> Result<()> {
        let mut history = self.task_history();
        history.insert(0, record);
        self.save_task_history(&history)
    }

    pub fn delete_task(&self, index: usize) -> Result<()> {
        let mut history = self.task_history();
        if index < history.len() {
            history.remove(index);
            self.save_task_history(&history)?;
        }
        Ok(())
    }

    pub fn open_loops(&self) -> Vec<OpenLoop> {
        self.raw(keys::OPEN_LOOPS)
            .and_then(|v| serde_json::from_str(&v).ok())
            .unwrap_or_default()
    }

    pub fn save_open_loops(&self, loops: &[OpenLoop]) -> Result<()> {
        self.set_raw(keys::OPEN_LOOPS, &serde_json::to_string(loops)?)
    }

    pub fn loops_minimized(&self) -> bool {
        self.flag(keys::OPEN_LOOPS_MINIMIZED, false)
    }

    pub fn set_loops_minimized(&self, minimized: bool) -> Result<()> {
        self.set_raw(keys::OPEN_LOOPS_MINIMIZED, &minimized.to_string())
    }

    pub fn show_minerals(&self) -> bool {
        self.flag(keys::SHOW_MINERALS, true)
    }

    pub fn set_show_minerals(&self, show: bool) -> Result<()> {
        self.set_raw(keys::SHOW_MINERALS, &show.to_string())
    }

    pub fn history_minimized(&self) -> bool {
        self.flag(keys::TASK_HISTORY_MINIMIZED, false)
    }

    pub fn set_history_minimized(&self, minimized: bool) -> Result<()> {
        self.set_raw(keys::TASK_HISTORY_MINIMIZED, &minimized.to_string())
    }

    pub fn login_streak(&self) -> u32 {
        self.raw(keys::LOGIN_STREAK)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    pub fn set_login_streak(&self, count: u32) -> Result<()> {
        self.set_raw(keys::LOGIN_STREAK, &count.to_string())
    }

    pub fn last_login(&self) -> Option<NaiveDate> {
        self.raw(keys::LAST_LOGIN_DATE)
            .and_then(|v| NaiveDate::parse_from_str(&v, "%Y-%m-%d").ok())
    }

    pub fn set_last_login(&self, date: NaiveDate) -> Result<()> {
        self.set_raw(keys::LAST_LOGIN_DATE, &date.format("%Y-%m-%d").to_string())
    }

    pub fn data_version(&self) -> Option<String> {
        self.raw(keys::DATA_VERSION)
    }

    pub fn set_data_version(&self, version: &str) -> Result<()> {
        self.set_raw(keys::DATA_VERSION, version)
    }
}
