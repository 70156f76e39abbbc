//! Size-adaptive duration rendering (component C5).
//!
//! Deterministic, locale-independent, up to three significant digits, one of
//! four suffixes (`ns`, `µs`, `ms`, `s`) chosen by range. Values that would
//! need a fourth significant digit to stay inside a unit's range (which only
//! happens right at a unit boundary, after rounding) fall back to scientific
//! notation in that same unit rather than bumping to the next one — callers
//! must accept forms like `1.00e+03µs`.

use std::time::Duration;

const NANOS_PER_MICRO: f64 = 1_000.0;
const NANOS_PER_MILLI: f64 = 1_000_000.0;
const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Renders `d` using the table from spec §4.5.
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();

    if nanos < 1_000 {
        return format!("{}ns", nanos);
    }
    if nanos < 1_000_000 {
        return format!("{}µs", format_sig3(nanos as f64 / NANOS_PER_MICRO));
    }
    if nanos < 1_000_000_000 {
        return format!("{}ms", format_sig3(nanos as f64 / NANOS_PER_MILLI));
    }
    format!("{}s", format_sig3(nanos as f64 / NANOS_PER_SEC))
}

/// Formats `value` with at most three significant digits, falling back to
/// scientific notation once the magnitude no longer fits a fixed-point
/// rendering with three significant digits (|exponent| > 2).
fn format_sig3(value: f64) -> String {
    if value == 0.0 {
        return "0.00".to_string();
    }

    let magnitude = value.abs().log10().floor() as i32;
    if !(-2..=2).contains(&magnitude) {
        let mantissa = value / 10f64.powi(magnitude);
        let sign = if magnitude >= 0 { "+" } else { "-" };
        return format!("{:.2}e{}{:02}", mantissa, sign, magnitude.abs());
    }

    let decimals = (2 - magnitude).max(0) as usize;
    let rendered = format!("{:.*}", decimals, value);

    // Rounding can bump the magnitude (e.g. 9.996 at decimals=2 rounds to
    // "10.00"); reformat once at the new magnitude so the digit count stays
    // at three significant figures.
    if let Ok(parsed) = rendered.parse::<f64>() {
        if parsed > 0.0 {
            let new_magnitude = parsed.log10().floor() as i32;
            if new_magnitude != magnitude && (-2..=2).contains(&new_magnitude) {
                let new_decimals = (2 - new_magnitude).max(0) as usize;
                return format!("{:.*}", new_decimals, parsed);
            }
        }
    }
    rendered
}
