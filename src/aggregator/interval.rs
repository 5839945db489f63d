//! Polling interval parsing.
//!
//! Accepts Go-style durations such as `30s`, `1m`, `1h30m`, `1.5h` or
//! `500ms`, the extra unit `d` for days, and a bare integer meaning seconds.

use std::time::Duration;

use crate::app::{GatorError, Result};

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;

fn unit_seconds(unit: &str) -> Option<f64> {
    let secs = match unit {
        "ns" => 1e-9,
        "us" | "µs" => 1e-6,
        "ms" => 1e-3,
        "s" => 1.0,
        "m" => SECS_PER_MINUTE as f64,
        "h" => SECS_PER_HOUR as f64,
        "d" => SECS_PER_DAY as f64,
        _ => return None,
    };
    Some(secs)
}

/// Parse an interval string. Zero is rejected since it cannot drive a ticker.
pub fn parse_interval(s: &str) -> Result<Duration> {
    let input = s.trim();
    let invalid = |reason: &str| GatorError::InvalidInterval(format!("{:?}: {}", s, reason));

    if input.is_empty() {
        return Err(invalid("empty"));
    }

    if let Ok(secs) = input.parse::<u64>() {
        return match secs {
            0 => Err(invalid("must be greater than zero")),
            secs => Ok(Duration::from_secs(secs)),
        };
    }

    let mut total = Duration::ZERO;
    let mut rest = input;

    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_end);
        if number.is_empty() {
            return Err(invalid("expected a number"));
        }
        let value: f64 = number.parse().map_err(|_| invalid("bad number"))?;

        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_end);
        if unit.is_empty() {
            return Err(invalid("missing unit"));
        }
        let scale = unit_seconds(unit).ok_or_else(|| invalid("unknown unit"))?;

        let part = Duration::try_from_secs_f64(value * scale).map_err(|_| invalid("out of range"))?;
        total = total
            .checked_add(part)
            .ok_or_else(|| invalid("out of range"))?;
        rest = next;
    }

    if total.is_zero() {
        return Err(invalid("must be greater than zero"));
    }

    Ok(total)
}

/// Format an interval for display, using the largest whole unit.
pub fn format_interval(every: Duration) -> String {
    let secs = every.as_secs();

    if every.subsec_nanos() != 0 || secs == 0 {
        format!("{:?}", every)
    } else if secs % SECS_PER_DAY == 0 {
        format!("{}d", secs / SECS_PER_DAY)
    } else if secs % SECS_PER_HOUR == 0 {
        format!("{}h", secs / SECS_PER_HOUR)
    } else if secs % SECS_PER_MINUTE == 0 {
        format!("{}m", secs / SECS_PER_MINUTE)
    } else {
        format!("{}s", secs)
    }
}
