use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Registry view of one device, as far as liveness is concerned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceRecord {
    pub fcm_token: Option<String>,
    /// Last-seen time, Unix epoch seconds.
    pub last_seen: Option<i64>,
}

impl DeviceRecord {
    pub fn new(fcm_token: Option<&str>, last_seen: Option<i64>) -> Self {
        Self {
            fcm_token: fcm_token.map(str::to_string),
            last_seen,
        }
    }

    /// Decodes a Realtime Database device node
    /// (`{"fcmToken": "...", "sensors": {"timestamp": 1700000000}}`).
    ///
    /// Never fails: fields of the wrong shape are treated as absent so a
    /// single malformed device cannot spoil the snapshot.
    pub fn from_value(value: &Value) -> Self {
        let fcm_token = value
            .get("fcmToken")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        let last_seen = value
            .get("sensors")
            .and_then(|s| s.get("timestamp"))
            .and_then(epoch_seconds)
            .filter(|ts| *ts != 0);

        Self {
            fcm_token,
            last_seen,
        }
    }
}

fn epoch_seconds(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64),
        _ => None,
    }
}

/// Point-in-time copy of the registry, keyed by device ID.
pub type Snapshot = HashMap<String, DeviceRecord>;

/// Push message for one stale device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub token: String,
    pub title: String,
    pub body: String,
}

pub const OFFLINE_TITLE: &str = "Device Offline";

impl Notification {
    pub fn offline(device_id: &str, token: &str, threshold_secs: i64) -> Self {
        Self {
            token: token.to_string(),
            title: OFFLINE_TITLE.to_string(),
            body: format!(
                "Device {} is offline for more than {}.",
                device_id,
                describe_threshold(threshold_secs)
            ),
        }
    }
}

fn describe_threshold(secs: i64) -> String {
    match (secs % 60, secs / 60) {
        (0, 1) => "1 minute".to_string(),
        (0, minutes) if minutes > 0 => format!("{} minutes", minutes),
        _ => format!("{} seconds", secs),
    }
}

/// Delivery service acknowledgement (FCM message name).
pub type Receipt = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NoToken,
    NoTimestamp,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NoToken => "no_token",
            SkipReason::NoTimestamp => "no_timestamp",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoToken => write!(f, "no token"),
            SkipReason::NoTimestamp => write!(f, "no timestamp"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeviceStatus {
    Online { age_secs: i64 },
    Skipped { reason: SkipReason },
    Notified { age_secs: i64, receipt: Receipt },
    DeliveryFailed { age_secs: i64, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceOutcome {
    pub device_id: String,
    #[serde(flatten)]
    pub status: DeviceStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    Completed,
    NoDevices,
    RegistryUnavailable,
}

/// Summary of one cycle. Returned whatever happened inside it.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub now: i64,
    pub outcome: CycleOutcome,
    pub devices: usize,
    pub online: usize,
    pub stale: usize,
    pub skipped_no_token: usize,
    pub skipped_no_timestamp: usize,
    pub delivered: usize,
    pub failed: usize,
    pub results: Vec<DeviceOutcome>,
}

impl CycleReport {
    pub fn empty(cycle_id: Uuid, now: i64, outcome: CycleOutcome) -> Self {
        Self {
            cycle_id,
            now,
            outcome,
            devices: 0,
            online: 0,
            stale: 0,
            skipped_no_token: 0,
            skipped_no_timestamp: 0,
            delivered: 0,
            failed: 0,
            results: Vec::new(),
        }
    }

    pub fn record(&mut self, device_id: String, status: DeviceStatus) {
        match &status {
            DeviceStatus::Online { .. } => self.online += 1,
            DeviceStatus::Skipped {
                reason: SkipReason::NoToken,
            } => self.skipped_no_token += 1,
            DeviceStatus::Skipped {
                reason: SkipReason::NoTimestamp,
            } => self.skipped_no_timestamp += 1,
            DeviceStatus::Notified { .. } => {
                self.stale += 1;
                self.delivered += 1;
            }
            DeviceStatus::DeliveryFailed { .. } => {
                self.stale += 1;
                self.failed += 1;
            }
        }
        self.results.push(DeviceOutcome { device_id, status });
    }

    /// Status recorded for `device_id`, if it was part of the snapshot.
    pub fn status_of(&self, device_id: &str) -> Option<&DeviceStatus> {
        self.results
            .iter()
            .find(|r| r.device_id == device_id)
            .map(|r| &r.status)
    }
}
