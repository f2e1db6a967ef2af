//! Drift-free elapsed time computation
//!
//! Elapsed time is always derived from two absolute instants and a clock
//! offset, never from counting tick callbacks. A missed or delayed tick only
//! delays the displayed value; the next computation is exact again.

use chrono::DateTime;

use crate::error::TimerError;

/// Elapsed seconds of a run segment.
///
/// `started_at` is the segment start on the authoritative clock (epoch ms),
/// `clock_offset_ms` is authoritative minus local, and `now_ms` is local.
/// Returns `base_accumulated + floor((now + offset - started_at) / 1000)`,
/// never less than `base_accumulated`. Without a start instant the timer is
/// not accruing and the base is returned unchanged.
pub fn compute_elapsed(
    started_at: Option<i64>,
    base_accumulated: u64,
    clock_offset_ms: i64,
    now_ms: i64,
) -> u64 {
    let Some(started_at) = started_at else {
        return base_accumulated;
    };

    let adjusted_now = now_ms.saturating_add(clock_offset_ms);
    let elapsed_ms = adjusted_now.saturating_sub(started_at);
    if elapsed_ms <= 0 {
        return base_accumulated;
    }

    base_accumulated.saturating_add((elapsed_ms / 1000) as u64)
}

/// Authoritative minus local, in milliseconds.
pub fn clock_offset(authoritative_now_ms: i64, local_now_ms: i64) -> i64 {
    authoritative_now_ms.saturating_sub(local_now_ms)
}

/// Parse an RFC 3339 timestamp into epoch milliseconds.
pub fn parse_timestamp(input: &str) -> Result<i64, TimerError> {
    DateTime::parse_from_rfc3339(input.trim())
        .map(|dt| dt.timestamp_millis())
        .map_err(|_| TimerError::MalformedTimestamp {
            input: input.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_started_returns_base() {
        assert_eq!(compute_elapsed(None, 42, 0, 1_000_000), 42);
        assert_eq!(compute_elapsed(None, 42, -5_000, 0), 42);
    }

    #[test]
    fn test_basic_elapsed() {
        assert_eq!(compute_elapsed(Some(1_000), 0, 0, 1_000), 0);
        assert_eq!(compute_elapsed(Some(1_000), 0, 0, 1_999), 0);
        assert_eq!(compute_elapsed(Some(1_000), 0, 0, 2_000), 1);
        assert_eq!(compute_elapsed(Some(1_000), 0, 0, 66_000), 65);
        assert_eq!(compute_elapsed(Some(1_000), 65, 0, 11_000), 75);
    }

    #[test]
    fn test_offset_is_applied_to_local_now() {
        // Local clock runs 30s behind the authority.
        let offset = clock_offset(100_000, 70_000);
        assert_eq!(offset, 30_000);
        assert_eq!(compute_elapsed(Some(100_000), 0, offset, 80_000), 10);

        // Local clock runs ahead.
        let offset = clock_offset(100_000, 160_000);
        assert_eq!(compute_elapsed(Some(100_000), 5, offset, 172_500), 17);
    }

    #[test]
    fn test_clamped_to_base() {
        // Start instant in the future relative to adjusted now.
        assert_eq!(compute_elapsed(Some(50_000), 7, 0, 10_000), 7);
        assert_eq!(compute_elapsed(Some(50_000), 7, -60_000, 50_000), 7);
    }

    #[test]
    fn test_difference_depends_only_on_instants() {
        let started_at = Some(1_700_000_000_000);
        let offset = 1_234;
        let base = 90;
        let samples = [0i64, 999, 1_000, 1_001, 59_999, 60_000, 300_000, 86_400_000];

        for &a in &samples {
            for &b in &samples {
                if a >= b {
                    continue;
                }
                let t1 = 1_700_000_000_000 + a - offset;
                let t2 = 1_700_000_000_000 + b - offset;
                let d = compute_elapsed(started_at, base, offset, t2)
                    - compute_elapsed(started_at, base, offset, t1);
                // Segment-aligned instants: the difference is the whole seconds between them.
                assert_eq!(d, (b / 1000 - a / 1000) as u64, "a={} b={}", a, b);
            }
        }
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("1970-01-01T00:00:01Z"), Ok(1_000));
        assert_eq!(parse_timestamp("1970-01-01T09:00:01+09:00"), Ok(1_000));
        assert_eq!(
            parse_timestamp("2024-03-01T12:00:00.250Z"),
            Ok(1_709_294_400_250)
        );
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(matches!(
            parse_timestamp("not-a-date"),
            Err(TimerError::MalformedTimestamp { .. })
        ));
        assert!(parse_timestamp("").is_err());
        assert!(parse_timestamp("2024-13-01T00:00:00Z").is_err());
    }
}
