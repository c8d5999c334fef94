/// Formats a second count as `mm:ss` for the running timers.
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Formats a stored task duration as `3m 05s`.
pub fn format_min_sec(seconds: u64) -> String {
    format!("{}m {:02}s", seconds / 60, seconds % 60)
}

pub fn format_duration(seconds: i64) -> String {
    let hours = seconds / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;

    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if mins > 0 {
        parts.push(format!("{}m", mins));
    }
    if secs > 0 || (hours == 0 && mins == 0) {
        parts.push(format!("{}s", secs));
    }

    parts.join(" ")
}

/// Half-up rounding to two decimal places. `format!("{:.2}", ..)` alone
/// rounds ties to even, which would render 3.125 as "3.12".
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Currency amount as a 2-decimal string, half-up.
pub fn format_money(x: f64) -> String {
    format!("{:.2}", round2(x))
}

/// Cost of `seconds` at `rate` currency units per hour. Multiplies before
/// dividing so that whole-cent amounts stay exact: 125 s at 90/h is 3.125,
/// not 3.124999….
pub fn money_for(seconds: u64, rate: f64) -> f64 {
    (seconds as f64 * rate) / 3600.0
}
