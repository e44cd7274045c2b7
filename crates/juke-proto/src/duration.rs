//! Track-time formatting: `"M:SS"` under an hour, `"H:MM:SS"` from there on.

/// Format whole seconds, e.g. `61 -> "1:01"`, `3661 -> "1:01:01"`.
pub fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}

/// Format a millisecond count, truncating to whole seconds.
pub fn format_millis(ms: u64) -> String {
    format_duration(ms / 1000)
}

/// Inverse of [`format_duration`].  Accepts `"M:SS"` and `"H:MM:SS"`; minutes
/// and seconds after the leading field must be two digits below 60.
pub fn parse_duration(text: &str) -> Option<u64> {
    let parts: Vec<&str> = text.split(':').collect();
    let (hours, mins, secs) = match parts.as_slice() {
        [m, s] => (0, parse_field(m, false)?, parse_field(s, true)?),
        [h, m, s] => (
            parse_field(h, false)?,
            parse_field(m, true)?,
            parse_field(s, true)?,
        ),
        _ => return None,
    };
    if parts.len() == 2 && mins >= 60 {
        return None;
    }
    hours
        .checked_mul(3600)?
        .checked_add(mins * 60 + secs)
}

fn parse_field(field: &str, padded: bool) -> Option<u64> {
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u64 = field.parse().ok()?;
    if padded && (field.len() != 2 || value >= 60) {
        return None;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(61), "1:01");
        assert_eq!(format_duration(3661), "1:01:01");
        assert_eq!(format_duration(443), "7:23");
        assert_eq!(format_duration(3599), "59:59");
        assert_eq!(format_duration(3600), "1:00:00");
        assert_eq!(format_duration(123 * 3600 + 3 * 60 + 59), "123:03:59");
    }

    #[test]
    fn test_millis_truncate() {
        assert_eq!(format_millis(5000), "0:05");
        assert_eq!(format_millis(129_213), "2:09");
        assert_eq!(format_millis(999), "0:00");
    }

    #[test]
    fn test_round_trip() {
        let samples = (0..7300)
            .chain([35_999, 36_000, 86_399, 86_400, 359_999, 1_000_000, u32::MAX as u64]);
        for t in samples {
            assert_eq!(parse_duration(&format_duration(t)), Some(t), "t={}", t);
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_duration(""), None);
        assert_eq!(parse_duration("1"), None);
        assert_eq!(parse_duration("1:1"), None);
        assert_eq!(parse_duration("1:60"), None);
        assert_eq!(parse_duration("60:00"), None);
        assert_eq!(parse_duration("1:-1:00"), None);
        assert_eq!(parse_duration("a:00"), None);
    }

    #[test]
    fn test_parse_huge_hours_is_none() {
        assert_eq!(parse_duration(&format!("{}:00:00", u64::MAX)), None);
        assert_eq!(parse_duration(&format!("{}:59:59", u64::MAX / 3600)), None);
        let max_hours = u64::MAX / 3600 - 1;
        assert_eq!(
            parse_duration(&format!("{}:00:00", max_hours)),
            Some(max_hours * 3600)
        );
    }
}
