//! Signed `HH:MM` rendering of decimal hours.

/// Formats decimal hours as a zero-padded, signed `HH:MM` string.
///
/// Rounds the magnitude to whole minutes before splitting, so `"00:60"` cannot
/// occur. Non-finite input renders as `"00:00"`. The `-` prefix is only
/// emitted when at least one minute remains after rounding, so `-0.0001`
/// renders as `"00:00"`.
#[allow(clippy::cast_possible_truncation)]
pub fn format_hours(hours: f64) -> String {
    if !hours.is_finite() {
        return "00:00".to_string();
    }

    let total_minutes = (hours.abs() * 60.0).round() as i64;
    let sign = if hours < 0.0 && total_minutes > 0 {
        "-"
    } else {
        ""
    };

    format!("{sign}{:02}:{:02}", total_minutes / 60, total_minutes % 60)
}

/// Formats whole minutes as signed `HH:MM`.
#[allow(clippy::cast_precision_loss)]
pub fn format_minutes(minutes: i64) -> String {
    format_hours(minutes as f64 / 60.0)
}

/// Parses a signed `HH:MM` string back into minutes.
pub fn parse_duration(s: &str) -> Option<i64> {
    let (negative, rest) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let (hours, minutes) = rest.split_once(':')?;
    if hours.len() < 2 || minutes.len() != 2 {
        return None;
    }
    if !hours.bytes().chain(minutes.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    let hours: i64 = hours.parse().ok()?;
    let minutes: i64 = minutes.parse().ok()?;
    if minutes >= 60 {
        return None;
    }

    let total = hours.checked_mul(60)?.checked_add(minutes)?;
    Some(if negative { -total } else { total })
}
