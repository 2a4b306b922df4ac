use crate::model::{DeviceRecord, SkipReason};

/// Seconds without telemetry after which a device counts as offline.
pub const DEFAULT_OFFLINE_THRESHOLD_SECS: i64 = 5 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation<'a> {
    Skip(SkipReason),
    Online { age_secs: i64 },
    Stale { token: &'a str, age_secs: i64 },
}

/// Decides whether a device is offline at `now`.
///
/// The token is checked before the timestamp. A device is stale only when
/// it is strictly more than `threshold_secs` behind `now`, so future
/// timestamps (clock skew) read as online.
pub fn evaluate(record: &DeviceRecord, now: i64, threshold_secs: i64) -> Evaluation<'_> {
    let token = match record.fcm_token.as_deref() {
        Some(token) if !token.is_empty() => token,
        _ => return Evaluation::Skip(SkipReason::NoToken),
    };

    let last_seen = match record.last_seen {
        Some(ts) if ts != 0 => ts,
        _ => return Evaluation::Skip(SkipReason::NoTimestamp),
    };

    let age_secs = now.saturating_sub(last_seen);
    if age_secs > threshold_secs {
        Evaluation::Stale { token, age_secs }
    } else {
        Evaluation::Online { age_secs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn device(token: Option<&str>, age: Option<i64>) -> DeviceRecord {
        DeviceRecord::new(token, age.map(|a| NOW - a))
    }

    #[test]
    fn test_stale_device() {
        let record = device(Some("tokA"), Some(600));
        assert_eq!(
            evaluate(&record, NOW, DEFAULT_OFFLINE_THRESHOLD_SECS),
            Evaluation::Stale {
                token: "tokA",
                age_secs: 600
            }
        );
    }

    #[test]
    fn test_recent_device_is_online() {
        let record = device(Some("tokB"), Some(100));
        assert_eq!(
            evaluate(&record, NOW, DEFAULT_OFFLINE_THRESHOLD_SECS),
            Evaluation::Online { age_secs: 100 }
        );
    }

    #[test]
    fn test_boundary_is_exclusive() {
        let at = device(Some("t"), Some(300));
        assert_eq!(
            evaluate(&at, NOW, DEFAULT_OFFLINE_THRESHOLD_SECS),
            Evaluation::Online { age_secs: 300 }
        );

        let past = device(Some("t"), Some(301));
        assert!(matches!(
            evaluate(&past, NOW, DEFAULT_OFFLINE_THRESHOLD_SECS),
            Evaluation::Stale { age_secs: 301, .. }
        ));
    }

    #[test]
    fn test_seen_just_now() {
        let record = device(Some("t"), Some(0));
        assert_eq!(
            evaluate(&record, NOW, DEFAULT_OFFLINE_THRESHOLD_SECS),
            Evaluation::Online { age_secs: 0 }
        );
    }

    #[test]
    fn test_future_timestamp_is_online() {
        let record = device(Some("t"), Some(-3600));
        assert_eq!(
            evaluate(&record, NOW, DEFAULT_OFFLINE_THRESHOLD_SECS),
            Evaluation::Online { age_secs: -3600 }
        );
    }

    #[test]
    fn test_missing_token_wins_over_missing_timestamp() {
        let record = device(None, None);
        assert_eq!(
            evaluate(&record, NOW, DEFAULT_OFFLINE_THRESHOLD_SECS),
            Evaluation::Skip(SkipReason::NoToken)
        );
    }

    #[test]
    fn test_missing_token() {
        let record = device(None, Some(1000));
        assert_eq!(
            evaluate(&record, NOW, DEFAULT_OFFLINE_THRESHOLD_SECS),
            Evaluation::Skip(SkipReason::NoToken)
        );

        let empty = device(Some(""), Some(1000));
        assert_eq!(
            evaluate(&empty, NOW, DEFAULT_OFFLINE_THRESHOLD_SECS),
            Evaluation::Skip(SkipReason::NoToken)
        );
    }

    #[test]
    fn test_missing_or_zero_timestamp() {
        let record = device(Some("tokD"), None);
        assert_eq!(
            evaluate(&record, NOW, DEFAULT_OFFLINE_THRESHOLD_SECS),
            Evaluation::Skip(SkipReason::NoTimestamp)
        );

        let zero = DeviceRecord::new(Some("tokD"), Some(0));
        assert_eq!(
            evaluate(&zero, NOW, DEFAULT_OFFLINE_THRESHOLD_SECS),
            Evaluation::Skip(SkipReason::NoTimestamp)
        );
    }

    #[test]
    fn test_custom_threshold() {
        let record = device(Some("t"), Some(90));
        assert!(matches!(
            evaluate(&record, NOW, 60),
            Evaluation::Stale { .. }
        ));
        assert!(matches!(
            evaluate(&record, NOW, 120),
            Evaluation::Online { .. }
        ));
    }
}
