//! Duration flag value grammar.
//!
//! Durations are written as one or more `<number><unit>` segments, where the
//! unit is one of `ms`, `s`, `m`, `h`, or `d`. Segments add up, so `2h45m`
//! is two hours and forty-five minutes. A bare number without a unit is
//! rejected rather than guessed at.

use std::time::Duration;

use thiserror::Error;

/// Errors from [`parse_duration`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    /// Input is empty or whitespace-only.
    #[error("empty duration")]
    Empty,
    /// A segment has a unit but no digits (e.g. `"h"`).
    #[error("missing number before unit in '{0}'")]
    MissingNumber(String),
    /// A segment has digits but no unit (e.g. `"90"`).
    #[error("missing unit after number in '{0}'")]
    MissingUnit(String),
    /// A segment names an unknown unit (e.g. `"5x"`).
    #[error("unknown duration unit '{0}' (expected ms, s, m, h, or d)")]
    UnknownUnit(String),
    /// The accumulated value overflows.
    #[error("duration out of range: '{0}'")]
    OutOfRange(String),
}

/// Parses a numeric+unit duration string into a [`Duration`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use forge_dispatch::parse_duration;
///
/// assert_eq!(parse_duration("300ms"), Ok(Duration::from_millis(300)));
/// assert_eq!(parse_duration("90s"), Ok(Duration::from_secs(90)));
/// assert_eq!(parse_duration("2h45m"), Ok(Duration::from_secs(2 * 3600 + 45 * 60)));
/// assert!(parse_duration("2x").is_err());
/// assert!(parse_duration("90").is_err());
/// assert!(parse_duration("").is_err());
/// ```
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(DurationError::Empty);
    }

    let mut total = Duration::ZERO;
    let mut chars = s.chars().peekable();

    while chars.peek().is_some() {
        let mut digits = String::new();
        while let Some(c) = chars.peek() {
            if c.is_ascii_digit() {
                digits.push(*c);
                chars.next();
            } else {
                break;
            }
        }

        let mut unit = String::new();
        while let Some(c) = chars.peek() {
            if c.is_ascii_alphabetic() {
                unit.push(*c);
                chars.next();
            } else {
                break;
            }
        }

        if digits.is_empty() {
            return Err(DurationError::MissingNumber(s.to_string()));
        }
        if unit.is_empty() {
            return Err(DurationError::MissingUnit(s.to_string()));
        }

        let count: u64 = digits
            .parse()
            .map_err(|_| DurationError::OutOfRange(s.to_string()))?;
        let segment = match unit.as_str() {
            "ms" => Duration::from_millis(count),
            "s" => Duration::from_secs(count),
            "m" => Duration::from_secs(count.checked_mul(60).ok_or_else(|| DurationError::OutOfRange(s.to_string()))?),
            "h" => Duration::from_secs(count.checked_mul(3600).ok_or_else(|| DurationError::OutOfRange(s.to_string()))?),
            "d" => Duration::from_secs(count.checked_mul(86_400).ok_or_else(|| DurationError::OutOfRange(s.to_string()))?),
            _ => return Err(DurationError::UnknownUnit(unit)),
        };
        total = total
            .checked_add(segment)
            .ok_or_else(|| DurationError::OutOfRange(s.to_string()))?;
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_segments() {
        assert_eq!(parse_duration("300ms"), Ok(Duration::from_millis(300)));
        assert_eq!(parse_duration("45s"), Ok(Duration::from_secs(45)));
        assert_eq!(parse_duration("10m"), Ok(Duration::from_secs(600)));
        assert_eq!(parse_duration("3h"), Ok(Duration::from_secs(10_800)));
        assert_eq!(parse_duration("2d"), Ok(Duration::from_secs(172_800)));
    }

    #[test]
    fn test_parse_chained_segments_accumulate() {
        assert_eq!(
            parse_duration("2h45m"),
            Ok(Duration::from_secs(2 * 3600 + 45 * 60))
        );
        assert_eq!(
            parse_duration("1m30s500ms"),
            Ok(Duration::from_secs(90) + Duration::from_millis(500))
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert_eq!(parse_duration(""), Err(DurationError::Empty));
        assert_eq!(parse_duration("  "), Err(DurationError::Empty));
        assert_eq!(
            parse_duration("h"),
            Err(DurationError::MissingNumber("h".to_string()))
        );
        assert_eq!(
            parse_duration("90"),
            Err(DurationError::MissingUnit("90".to_string()))
        );
        assert_eq!(
            parse_duration("5x"),
            Err(DurationError::UnknownUnit("x".to_string()))
        );
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(parse_duration(" 90s "), Ok(Duration::from_secs(90)));
    }
}
