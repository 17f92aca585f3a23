//! Rounding conventions shared by every metric in the report.
//!
//! Values are rounded half away from zero to one decimal place. A percentage
//! only reads 100.0 when every record counted, and only reads 0.0 when none
//! did; otherwise it is clamped into [0.1, 99.9].

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `count / total * 100`, one decimal. An empty total yields 0.0.
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 || count == 0 {
        return 0.0;
    }
    if count >= total {
        return 100.0;
    }

    let rounded = round_one_decimal(count as f64 / total as f64 * 100.0);
    rounded.clamp(0.1, 99.9)
}
