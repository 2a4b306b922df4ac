//! Push delivery.
//!
//! [`FcmNotifier`] talks to the Firebase Cloud Messaging HTTP v1 API. The
//! access token is obtained outside this process and passed in as-is.

use crate::errors::DeliveryError;
use crate::model::{Notification, Receipt};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_FCM_ENDPOINT: &str = "https://fcm.googleapis.com";

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sends one push message and returns the service's receipt for it.
    async fn send(&self, notification: &Notification) -> Result<Receipt, DeliveryError>;
}

pub struct FcmNotifier {
    client: reqwest::Client,
    send_url: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    name: String,
}

impl FcmNotifier {
    pub fn new(
        endpoint: &str,
        project_id: &str,
        access_token: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            send_url: send_url(endpoint, project_id),
            access_token,
        })
    }
}

fn send_url(endpoint: &str, project_id: &str) -> String {
    format!(
        "{}/v1/projects/{}/messages:send",
        endpoint.trim_end_matches('/'),
        project_id
    )
}

fn message_body(notification: &Notification) -> Value {
    json!({
        "message": {
            "token": notification.token,
            "notification": {
                "title": notification.title,
                "body": notification.body,
            }
        }
    })
}

#[async_trait]
impl Notifier for FcmNotifier {
    async fn send(&self, notification: &Notification) -> Result<Receipt, DeliveryError> {
        let response = self
            .client
            .post(&self.send_url)
            .bearer_auth(&self.access_token)
            .json(&message_body(notification))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::Timeout
                } else {
                    DeliveryError::Http(e)
                }
            })?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SendResponse = serde_json::from_str(&body)?;
        Ok(parsed.name)
    }
}
