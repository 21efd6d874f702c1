//! Display helpers for server health figures.

use std::time::Duration;

use crate::model::HealthSnapshot;

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
const BASE: f64 = 1024.0;

#[expect(clippy::cast_precision_loss, reason = "byte counts are displayed with two decimals")]
fn approx(bytes: u64) -> f64 {
    bytes as f64
}

/// Human-readable byte count using binary multiples, e.g. `1.5 KB`.
///
/// Values are rounded to two decimals and trailing zeros are dropped.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_owned();
    }
    let mut value = approx(bytes);
    let mut unit = "B";
    for next in UNITS.iter().skip(1) {
        if value < BASE {
            break;
        }
        value /= BASE;
        unit = next;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{rounded} {unit}")
}

/// Uptime as `{d}d {h}h {m}m {s}s`.
#[must_use]
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    let days = total / 86_400;
    let hours = (total / 3_600) % 24;
    let minutes = (total / 60) % 60;
    let seconds = total % 60;
    format!("{days}d {hours}h {minutes}m {seconds}s")
}

/// Share of the maximum heap in use, rounded to a whole percent.
///
/// Returns 0 when the server reports no maximum.
#[must_use]
pub fn memory_usage_pct(snapshot: &HealthSnapshot) -> u64 {
    if snapshot.max_memory == 0 {
        return 0;
    }
    let used = u128::from(snapshot.used_memory) * 100;
    let max = u128::from(snapshot.max_memory);
    let rounded = (used + max / 2) / max;
    u64::try_from(rounded).unwrap_or(u64::MAX)
}

/// Load average with two decimals, or `N/A` when the platform cannot report it.
#[must_use]
pub fn format_load(load: f64) -> String {
    if load < 0.0 {
        return "N/A".to_owned();
    }
    format!("{load:.2}")
}
