//! Duration strings in the `1h30m` / `500ms` / `1.5s` style.

use std::time::Duration;

use crate::error::{Error, Result};

/// Parse a duration string made of one or more `<number><unit>` terms.
///
/// Units: `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`. Numbers may carry a
/// decimal fraction. A bare `"0"` is accepted as zero.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let s = input.trim();
    if s.is_empty() {
        return Err(Error::invalid_duration(input, "empty duration string"));
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut rest = s;
    let mut total_secs = 0f64;

    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (num_str, tail) = rest.split_at(num_end);
        if num_str.is_empty() {
            return Err(Error::invalid_duration(input, "expected a number"));
        }
        let value: f64 = num_str
            .parse()
            .map_err(|_| Error::invalid_duration(input, format!("invalid number {num_str:?}")))?;

        let unit_end = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_end);
        let scale = match unit {
            "ns" => 1e-9,
            "us" | "µs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3_600.0,
            "" => return Err(Error::invalid_duration(input, "missing unit (ms/s/m/h)")),
            other => {
                return Err(Error::invalid_duration(
                    input,
                    format!("unknown unit {other:?} (expected ns/us/ms/s/m/h)"),
                ));
            },
        };

        total_secs += value * scale;
        rest = next;
    }

    Duration::try_from_secs_f64(total_secs)
        .map_err(|e| Error::invalid_duration(input, e.to_string()))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case("1m", Duration::from_secs(60))]
    #[case("30s", Duration::from_secs(30))]
    #[case("500ms", Duration::from_millis(500))]
    #[case("1h30m", Duration::from_secs(5_400))]
    #[case("1.5s", Duration::from_millis(1_500))]
    #[case("  2m  ", Duration::from_secs(120))]
    #[case("0", Duration::ZERO)]
    fn parses(#[case] input: &str, #[case] expected: Duration) {
        assert_eq!(parse_duration(input).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("10")]
    #[case("m")]
    #[case("10x")]
    #[case("1..5s")]
    fn rejects(#[case] input: &str) {
        let err = parse_duration(input).unwrap_err();
        assert!(matches!(err, Error::InvalidDuration { .. }), "{err}");
    }

    #[test]
    fn microseconds_in_both_spellings() {
        assert_eq!(
            parse_duration("250us").unwrap(),
            parse_duration("250µs").unwrap()
        );
    }
}
