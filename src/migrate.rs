use crate::models::{Category, TaskRecord};
use crate::store::{keys, RecordStore};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Store layout version. Bumped to 1.1 when task records gained a category.
pub const DATA_VERSION: &str = "1.1";

/// Record shape written before 1.1: no category field.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecordV0 {
    name: String,
    amount: String,
    timestamp: i64,
    #[serde(default)]
    duration: Option<u64>,
}

impl From<TaskRecordV0> for TaskRecord {
    fn from(v0: TaskRecordV0) -> Self {
        TaskRecord {
            name: v0.name,
            amount: v0.amount,
            timestamp: v0.timestamp,
            duration: v0.duration,
            category: Category::Rock,
        }
    }
}

/// Upgrades an unversioned store to the current layout. The raw history is
/// backed up under a timestamped key before anything is rewritten, and the
/// version marker is written last, so the upgrade runs at most once and a
/// failure partway through never loses data. Returns whether it ran.
pub fn migrate(store: &RecordStore, now: DateTime<Utc>) -> Result<bool> {
    if store.data_version().is_some() {
        return Ok(false);
    }

    if let Some(raw) = store.raw(keys::TASK_HISTORY) {
        let backup_key = format!(
            "{}{}",
            keys::HISTORY_BACKUP_PREFIX,
            now.timestamp_millis()
        );
        store.set_raw(&backup_key, &raw)?;

        // Unreadable history falls back to empty, like every other load.
        let upgraded: Vec<TaskRecord> = serde_json::from_str::<Vec<TaskRecordV0>>(&raw)
            .map(|records| records.into_iter().map(TaskRecord::from).collect())
            .unwrap_or_default();
        store.save_task_history(&upgraded)?;
    }

    store.set_data_version(DATA_VERSION)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_adds_category_to_legacy_records() {
        let store = RecordStore::in_memory();
        store
            .set_raw(
                keys::TASK_HISTORY,
                r#"[{"name":"a","amount":"0.10","timestamp":1}]"#,
            )
            .unwrap();

        assert!(migrate(&store, at()).unwrap());

        let history = store.task_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].name, "a");
        assert_eq!(history[0].category, Category::Rock);
        assert_eq!(store.data_version().as_deref(), Some(DATA_VERSION));
    }

    #[test]
    fn test_backs_up_raw_history_before_rewrite() {
        let store = RecordStore::in_memory();
        let raw = r#"[{"name":"a","amount":"0.10","timestamp":1}]"#;
        store.set_raw(keys::TASK_HISTORY, raw).unwrap();

        migrate(&store, at()).unwrap();

        let backup_key = format!("{}{}", keys::HISTORY_BACKUP_PREFIX, at().timestamp_millis());
        assert_eq!(store.raw(&backup_key).as_deref(), Some(raw));
    }

    #[test]
    fn test_second_run_is_a_noop() {
        let store = RecordStore::in_memory();
        store
            .set_raw(
                keys::TASK_HISTORY,
                r#"[{"name":"a","amount":"0.10","timestamp":1}]"#,
            )
            .unwrap();

        assert!(migrate(&store, at()).unwrap());
        let after_first = store.raw(keys::TASK_HISTORY);

        assert!(!migrate(&store, at()).unwrap());
        assert_eq!(store.raw(keys::TASK_HISTORY), after_first);
    }

    #[test]
    fn test_empty_store_just_gets_marked() {
        let store = RecordStore::in_memory();
        assert!(migrate(&store, at()).unwrap());
        assert_eq!(store.data_version().as_deref(), Some(DATA_VERSION));
        assert_eq!(store.raw(keys::TASK_HISTORY), None);
    }

    #[test]
    fn test_keeps_durations() {
        let store = RecordStore::in_memory();
        store
            .set_raw(
                keys::TASK_HISTORY,
                r#"[{"name":"b","amount":"3.13","timestamp":5,"duration":125}]"#,
            )
            .unwrap();

        migrate(&store, at()).unwrap();
        assert_eq!(store.task_history()[0].duration, Some(125));
    }
}
