use crate::stats::{cumulative_counts, daily_counts, mineral_counts};
use crate::store::RecordStore;
use crate::utils::{format_duration, format_min_sec, format_money};
use anyhow::Result;
use chrono::{Local, NaiveDate, TimeZone, Utc};

pub struct Reporter {
    store: RecordStore,
}

impl Reporter {
    pub fn new(store: RecordStore) -> Self {
        Self { store }
    }

    pub fn report(&self, minerals: bool, today: NaiveDate) -> Result<()> {
        let history = self.store.task_history();

        println!("Burnmeter Report");
        println!("================");

        let streak = self.store.login_streak();
        if streak > 0 {
            println!("Login streak: {} day(s)", streak);
        }

        if history.is_empty() {
            println!("No tasks finished yet.");
            return Ok(());
        }

        let total_spend: f64 = history
            .iter()
            .filter_map(|r| r.amount.parse::<f64>().ok())
            .sum();
        let total_seconds: u64 = history.iter().filter_map(|r| r.duration).sum();

        println!("\nTasks finished: {}", history.len());
        println!("Tracked time:   {}", format_duration(total_seconds as i64));
        println!("Total spend:    ${}", format_money(total_spend));

        println!("\nRecent tasks");
        println!("------------");
        for rec in history.iter().take(10) {
            let name = if rec.name.trim().is_empty() {
                "Untitled"
            } else {
                rec.name.as_str()
            };
            let when = Utc
                .timestamp_millis_opt(rec.timestamp)
                .single()
                .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string());
            let duration = rec
                .duration
                .map(format_min_sec)
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {}  ${:>8}  {:>8}  [{}] {}",
                when,
                rec.amount,
                duration,
                rec.category.as_str(),
                name
            );
        }

        println!("\nLast 7 days");
        println!("-----------");
        if minerals {
            for m in mineral_counts(&history, today) {
                println!(
                    "  {}  rock {:>2} | pebble {:>2} | sand {:>2}",
                    m.day, m.rock, m.pebble, m.sand
                );
            }
        } else {
            let daily = daily_counts(&history, today);
            let cumulative = cumulative_counts(&history, today);
            for (d, c) in daily.iter().zip(&cumulative) {
                println!("  {}  finished {:>2}  (total {:>3})", d.day, d.count, c.count);
            }
        }

        Ok(())
    }
}
