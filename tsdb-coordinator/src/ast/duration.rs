// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Duration rendering for query text and listings

use std::time::Duration;

const NANOS_PER_MICRO: i64 = 1_000;
const NANOS_PER_MILLI: i64 = 1_000_000;
const NANOS_PER_SECOND: i64 = 1_000_000_000;
const NANOS_PER_MINUTE: i64 = 60 * NANOS_PER_SECOND;
const NANOS_PER_HOUR: i64 = 60 * NANOS_PER_MINUTE;
const NANOS_PER_DAY: i64 = 24 * NANOS_PER_HOUR;
const NANOS_PER_WEEK: i64 = 7 * NANOS_PER_DAY;

/// Render a duration as a query-language literal (`1h`, `7d`, `2w`, `90s`)
///
/// The largest unit that divides the duration exactly is used.
pub fn format_duration_literal(d: chrono::Duration) -> String {
    let Some(nanos) = d.num_nanoseconds() else {
        return format!("{}ms", d.num_milliseconds());
    };
    if nanos == 0 {
        return "0s".to_string();
    }
    let sign = if nanos < 0 { "-" } else { "" };
    let abs = nanos.unsigned_abs() as i64;
    let units = [
        (NANOS_PER_WEEK, "w"),
        (NANOS_PER_DAY, "d"),
        (NANOS_PER_HOUR, "h"),
        (NANOS_PER_MINUTE, "m"),
        (NANOS_PER_SECOND, "s"),
        (NANOS_PER_MILLI, "ms"),
        (NANOS_PER_MICRO, "u"),
    ];
    for (size, suffix) in units {
        if abs % size == 0 {
            return format!("{}{}{}", sign, abs / size, suffix);
        }
    }
    format!("{}{}ns", sign, abs)
}

/// Literal form of a retention-style duration
pub fn format_std_duration_literal(d: Duration) -> String {
    format_duration_literal(chrono::Duration::from_std(d).unwrap_or(chrono::Duration::MAX))
}

/// Render a duration in `h/m/s` form, e.g. `168h0m0s`, `1m30s`, `1.5s`, `250ms`
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }

    if nanos < NANOS_PER_SECOND as u128 {
        let (div, unit) = if nanos < NANOS_PER_MICRO as u128 {
            (1, "ns")
        } else if nanos < NANOS_PER_MILLI as u128 {
            (NANOS_PER_MICRO as u128, "µs")
        } else {
            (NANOS_PER_MILLI as u128, "ms")
        };
        return format!("{}{}", trim_fraction(nanos, div), unit);
    }

    let total = d.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = (total % 60) as u128 * NANOS_PER_SECOND as u128 + d.subsec_nanos() as u128;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    out.push_str(&trim_fraction(seconds, NANOS_PER_SECOND as u128));
    out.push('s');
    out
}

fn trim_fraction(value: u128, div: u128) -> String {
    let whole = value / div;
    let rem = value % div;
    if rem == 0 {
        return whole.to_string();
    }
    let width = div.to_string().len() - 1;
    let frac = format!("{:0width$}", rem, width = width);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}
