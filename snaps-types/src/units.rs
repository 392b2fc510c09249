// SPDX-License-Identifier: GPL-3.0-only

//! Human units, timestamps and compact ages shared by the tools.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

/// Concise 1024-scaled size, e.g. `3.5G`.
pub fn human(bytes: u64) -> String {
    let mut number = bytes as f64;
    for suffix in ['K', 'M', 'G'] {
        number /= 1024.0;
        if number < 99.95 {
            return format!("{number:.1}{suffix}");
        }
    }
    format!("{:.1}T", number / 1024.0)
}

/// Parse a binary-scaled size as printed by `btrfs filesystem du`,
/// e.g. `3.50GiB`, `16.00KiB`, `123B`.
pub fn parse_human(value: &str) -> Option<u64> {
    let value = value.trim();
    let (number, factor) = if let Some(rest) = value.strip_suffix("TiB") {
        (rest, (1u64 << 40) as f64)
    } else if let Some(rest) = value.strip_suffix("GiB") {
        (rest, (1u64 << 30) as f64)
    } else if let Some(rest) = value.strip_suffix("MiB") {
        (rest, (1u64 << 20) as f64)
    } else if let Some(rest) = value.strip_suffix("KiB") {
        (rest, 1024.0)
    } else if let Some(rest) = value.strip_suffix('B') {
        (rest, 1.0)
    } else {
        return None;
    };

    let number: f64 = number.trim().parse().ok()?;
    Some((number * factor).round() as u64)
}

/// Timestamp embedded in snapshot names: `2024-01-10-174732`.
pub fn timestamp_str(now: DateTime<Local>) -> String {
    now.format("%Y-%m-%d-%H%M%S").to_string()
}

/// Compact age of a time difference in seconds, e.g. `18h39m`.
pub fn ago_str(delta_secs: i64) -> String {
    const UNITS: [char; 6] = ['s', 'm', 'h', 'd', 'w', 'y'];

    let ago = delta_secs.unsigned_abs();
    let mut low = ago % 60;
    let mut high = ago / 60;
    let mut unit = 1usize;
    for div in [60u64, 24, 7, 52, 9_999_999] {
        if high < div {
            break;
        }
        low = high % div;
        high /= div;
        unit += 1;
    }

    let mut out = String::new();
    if high > 0 {
        out.push_str(&format!("{high}{}", UNITS[unit]));
    }
    out.push_str(&format!("{low}{}", UNITS[unit - 1]));
    out
}

/// Age of the standard timestamp embedded in `name`, empty when no
/// timestamp is present or it does not parse.
pub fn ago_whence(name: &str, now: DateTime<Local>) -> String {
    let Some(stamp) = find_timestamp(name) else {
        return String::new();
    };
    let Ok(parsed) = NaiveDateTime::parse_from_str(stamp, "%Y-%m-%d-%H%M%S") else {
        return String::new();
    };
    let Some(then) = Local.from_local_datetime(&parsed).earliest() else {
        return String::new();
    };
    ago_str((now - then).num_seconds())
}

/// Locate a `YYYY-MM-DD-HHMMSS` run bounded by non-word characters.
fn find_timestamp(name: &str) -> Option<&str> {
    const MASK: &[u8] = b"dddd-dd-dd-dddddd";

    let bytes = name.as_bytes();
    if bytes.len() < MASK.len() {
        return None;
    }
    for start in 0..=bytes.len() - MASK.len() {
        let window = &bytes[start..start + MASK.len()];
        let matched = MASK.iter().zip(window).all(|(mask, byte)| match mask {
            b'd' => byte.is_ascii_digit(),
            _ => *byte == b'-',
        });
        if !matched {
            continue;
        }
        let end = start + MASK.len();
        let bounded_left = start == 0 || !is_word_byte(bytes[start - 1]);
        let bounded_right = end == bytes.len() || !is_word_byte(bytes[end]);
        if bounded_left && bounded_right {
            return Some(&name[start..end]);
        }
    }
    None
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}
