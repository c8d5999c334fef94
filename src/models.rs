use serde::{Deserialize, Serialize};

/// Three-tier task weight: rocks are the big things, sand is the rest.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Rock,
    Pebble,
    Sand,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Rock => "rock",
            Category::Pebble => "pebble",
            Category::Sand => "sand",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "rock" => Some(Category::Rock),
            "pebble" => Some(Category::Pebble),
            "sand" => Some(Category::Sand),
            _ => None,
        }
    }

    pub fn cycle(self) -> Self {
        match self {
            Category::Rock => Category::Pebble,
            Category::Pebble => Category::Sand,
            Category::Sand => Category::Rock,
        }
    }
}

/// One finished task. Created only by the finish action, never edited;
/// the history list keeps the newest record first.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub name: String,
    /// Cost at finish time, already formatted to two decimals.
    pub amount: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    /// Absent in records written before the category migration.
    #[serde(default)]
    pub category: Category,
}

/// A secondary distraction timer. At most one loop is active at a time,
/// and an active loop excludes the main tracker as well.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OpenLoop {
    /// Creation instant in epoch milliseconds; unique and monotonic.
    pub id: i64,
    pub title: String,
    pub is_checked: bool,
    /// Accrued seconds.
    pub time: u64,
    pub is_active: bool,
    /// Currency per hour.
    pub rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_roundtrip() {
        for c in [Category::Rock, Category::Pebble, Category::Sand] {
            assert_eq!(Category::parse(c.as_str()), Some(c));
        }
        assert_eq!(Category::parse("boulder"), None);
    }

    #[test]
    fn test_category_cycle_covers_all() {
        let c = Category::Rock;
        assert_eq!(c.cycle(), Category::Pebble);
        assert_eq!(c.cycle().cycle(), Category::Sand);
        assert_eq!(c.cycle().cycle().cycle(), Category::Rock);
    }

    #[test]
    fn test_task_record_defaults_category() {
        // Records persisted before the migration have no category field.
        let rec: TaskRecord =
            serde_json::from_str(r#"{"name":"a","amount":"0.10","timestamp":1}"#).unwrap();
        assert_eq!(rec.category, Category::Rock);
        assert_eq!(rec.duration, None);
    }

    #[test]
    fn test_open_loop_wire_names() {
        let loop_ = OpenLoop {
            id: 1,
            title: "email".into(),
            is_checked: false,
            time: 0,
            is_active: true,
            rate: 1000.0,
        };
        let json = serde_json::to_string(&loop_).unwrap();
        assert!(json.contains("\"isChecked\""));
        assert!(json.contains("\"isActive\""));
    }
}
