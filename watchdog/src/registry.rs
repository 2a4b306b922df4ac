use crate::errors::RegistryError;
use crate::model::{DeviceRecord, Snapshot};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Read-only access to the device registry.
#[async_trait]
pub trait RegistryReader: Send + Sync {
    /// Takes a snapshot of every registered device. `Ok(None)` means the
    /// registry holds no device collection at all.
    async fn snapshot(&self) -> Result<Option<Snapshot>, RegistryError>;
}

/// Firebase Realtime Database over its REST API.
pub struct FirebaseRegistry {
    client: reqwest::Client,
    url: String,
    auth: Option<String>,
}

impl FirebaseRegistry {
    pub fn new(
        database_url: &str,
        path: &str,
        auth: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: snapshot_url(database_url, path),
            auth,
        })
    }
}

fn snapshot_url(database_url: &str, path: &str) -> String {
    format!(
        "{}/{}.json",
        database_url.trim_end_matches('/'),
        path.trim_matches('/')
    )
}

#[async_trait]
impl RegistryReader for FirebaseRegistry {
    async fn snapshot(&self) -> Result<Option<Snapshot>, RegistryError> {
        let mut request = self.client.get(&self.url);
        if let Some(auth) = &self.auth {
            request = request.query(&[("auth", auth)]);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                RegistryError::Timeout
            } else {
                RegistryError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        debug!("Registry returned {} bytes", body.len());
        parse_snapshot(serde_json::from_slice(&body)?)
    }
}

/// Turns a Realtime Database node into a snapshot.
///
/// Objects map key to device. Arrays (what the database returns for
/// numeric keys) map index to device and drop empty slots. `null` means the
/// node does not exist.
pub fn parse_snapshot(root: Value) -> Result<Option<Snapshot>, RegistryError> {
    match root {
        Value::Null => Ok(None),
        Value::Object(devices) => Ok(Some(
            devices
                .iter()
                .map(|(id, node)| (id.clone(), DeviceRecord::from_value(node)))
                .collect(),
        )),
        Value::Array(devices) => Ok(Some(
            devices
                .iter()
                .enumerate()
                .filter(|(_, node)| !node.is_null())
                .map(|(idx, node)| (idx.to_string(), DeviceRecord::from_value(node)))
                .collect(),
        )),
        other => Err(RegistryError::Malformed(format!(
            "expected an object of devices, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_url() {
        assert_eq!(
            snapshot_url("https://demo.firebaseio.com/", "/devices/"),
            "https://demo.firebaseio.com/devices.json"
        );
        assert_eq!(
            snapshot_url("http://localhost:9000", "fleet/devices"),
            "http://localhost:9000/fleet/devices.json"
        );
    }

    #[test]
    fn test_null_root_is_absent() {
        assert!(parse_snapshot(Value::Null).unwrap().is_none());
    }

    #[test]
    fn test_object_root() {
        let snapshot = parse_snapshot(json!({
            "dev1": { "fcmToken": "tokA", "sensors": { "timestamp": 100 } },
            "dev2": "not a device"
        }))
        .unwrap()
        .unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["dev1"], DeviceRecord::new(Some("tokA"), Some(100)));
        assert_eq!(snapshot["dev2"], DeviceRecord::default());
    }

    #[test]
    fn test_empty_object_root() {
        let snapshot = parse_snapshot(json!({})).unwrap().unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_array_root_skips_holes() {
        let snapshot = parse_snapshot(json!([
            null,
            { "fcmToken": "tok1", "sensors": { "timestamp": 5 } }
        ]))
        .unwrap()
        .unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot["1"], DeviceRecord::new(Some("tok1"), Some(5)));
    }

    #[test]
    fn test_scalar_root_is_malformed() {
        let err = parse_snapshot(json!("devices")).unwrap_err();
        assert!(matches!(err, RegistryError::Malformed(_)));
        assert!(err.to_string().contains("a string"));
    }
}
