//! Time formatting helpers.

use std::time::Duration;

/// Render a duration for operator-facing messages, e.g. `23h 59m 30s`.
///
/// Zero-valued units are skipped; sub-second remainders are rounded up so a
/// retry-after of 0.4s never reads as `0s`.
pub fn format_duration(duration: Duration) -> String {
    let mut secs = duration.as_secs();
    if duration.subsec_nanos() > 0 {
        secs += 1;
    }
    if secs == 0 {
        return "0s".to_string();
    }

    let units = [(86_400, "d"), (3_600, "h"), (60, "m"), (1, "s")];
    let mut parts = Vec::new();
    for (size, suffix) in units {
        let n = secs / size;
        if n > 0 {
            parts.push(format!("{n}{suffix}"));
            secs %= size;
        }
    }
    parts.join(" ")
}
