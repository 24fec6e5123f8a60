//! Webhook delivery of notifications.
//!
//! Each notification is wrapped in a versioned JSON envelope and POSTed to
//! every configured endpoint whose event filter accepts it. Bodies can be
//! signed with HMAC-SHA256 in the `X-Uptime-Signature-256` header.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{DeliveryError, Notification, NotificationSink, TransitionContext};

pub const SIGNATURE_HEADER: &str = "X-Uptime-Signature-256";

/// Configuration for a single webhook endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,

    /// Notification kinds to deliver (`recovery`, `problem`, `test`). Empty means all.
    #[serde(default)]
    pub events: Vec<String>,

    #[serde(default = "default_webhook_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_webhook_retries")]
    pub max_retries: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

fn default_webhook_timeout_ms() -> u64 {
    5000
}

fn default_webhook_retries() -> u32 {
    2
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            events: Vec::new(),
            timeout_ms: default_webhook_timeout_ms(),
            max_retries: default_webhook_retries(),
            secret: None,
        }
    }

    pub fn accepts(&self, kind: &str) -> bool {
        self.events.is_empty() || self.events.iter().any(|e| e == kind)
    }
}

/// The JSON envelope POSTed to webhook endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub version: u8,
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: String,
    pub app_name: String,
    pub title: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<TransitionContext>,
}

impl WebhookPayload {
    pub fn from_notification(notification: &Notification) -> Self {
        let timestamp = notification
            .context
            .as_ref()
            .map(|c| c.timestamp)
            .unwrap_or_else(Utc::now);
        Self {
            version: 1,
            id: Uuid::new_v4().to_string(),
            timestamp,
            kind: notification.kind.as_str().to_string(),
            app_name: notification.app_name.clone(),
            title: notification.title.clone(),
            message: notification.message.clone(),
            transition: notification.context.clone(),
        }
    }
}

pub struct WebhookSink {
    webhooks: Vec<WebhookConfig>,
    client: Client,
}

impl WebhookSink {
    pub fn new(webhooks: Vec<WebhookConfig>, client: Client) -> Self {
        Self { webhooks, client }
    }

    pub fn endpoints(&self) -> &[WebhookConfig] {
        &self.webhooks
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    /// Deliver to every accepting endpoint. One failing endpoint does not
    /// stop the others; the last failure is reported.
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        let kind = notification.kind.as_str();
        let payload = WebhookPayload::from_notification(notification);
        let body = serde_json::to_vec(&payload)?;

        let mut outcome = Ok(());
        for wh in self.webhooks.iter().filter(|wh| wh.accepts(kind)) {
            match deliver(&self.client, wh, &body).await {
                Ok(()) => debug!(url = %wh.url, kind, "Webhook delivered"),
                Err(e) => {
                    warn!(url = %wh.url, kind, error = %e, "Webhook delivery failed");
                    outcome = Err(e);
                }
            }
        }
        outcome
    }
}

async fn deliver(client: &Client, wh: &WebhookConfig, body: &[u8]) -> Result<(), DeliveryError> {
    let timeout = Duration::from_millis(wh.timeout_ms);
    let signature = wh.secret.as_deref().map(|s| sign_payload(body, s));
    let mut last_error = None;

    for attempt in 0..=wh.max_retries {
        if attempt > 0 {
            let backoff = Duration::from_millis(500 * 2u64.pow(attempt - 1));
            tokio::time::sleep(backoff).await;
        }

        let mut req = client
            .post(&wh.url)
            .header("Content-Type", "application/json")
            .timeout(timeout)
            .body(body.to_vec());
        if let Some(sig) = &signature {
            req = req.header(SIGNATURE_HEADER, format!("sha256={}", sig));
        }

        match req.send().await {
            Ok(resp) if resp.status().is_success() => return Ok(()),
            Ok(resp) => {
                let status = resp.status().as_u16();
                if (400..500).contains(&status) && status != 429 {
                    return Err(DeliveryError::Rejected {
                        url: wh.url.clone(),
                        status,
                    });
                }
                last_error = Some(DeliveryError::Http {
                    url: wh.url.clone(),
                    status,
                });
            }
            Err(e) => {
                last_error = Some(DeliveryError::Network {
                    url: wh.url.clone(),
                    message: e.to_string(),
                });
            }
        }
    }

    Err(last_error.unwrap_or_else(|| DeliveryError::Network {
        url: wh.url.clone(),
        message: "no attempt made".into(),
    }))
}

pub fn sign_payload(body: &[u8], secret: &str) -> String {
    // HMAC accepts keys of any length, so this cannot fail in practice.
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::status::StatusValue;
    use crate::notify::NotificationKind;
    use wiremock::matchers::{header, header_exists, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    fn problem() -> Notification {
        Notification {
            kind: NotificationKind::Problem,
            title: "Server Problem".into(),
            message: "GitHub\nonline → timeout".into(),
            app_name: "Server Monitor".into(),
            timeout_seconds: 10,
            context: Some(TransitionContext {
                target_name: "GitHub".into(),
                previous_status: StatusValue::Online,
                new_status: StatusValue::Timeout,
                timestamp: Utc::now(),
            }),
        }
    }

    fn fast(url: String) -> WebhookConfig {
        WebhookConfig {
            timeout_ms: 1000,
            max_retries: 0,
            ..WebhookConfig::new(url)
        }
    }

    #[test]
    fn empty_filter_accepts_everything() {
        let wh = WebhookConfig::new("https://hooks.example");
        assert!(wh.accepts("recovery"));
        assert!(wh.accepts("problem"));
        assert!(wh.accepts("test"));
    }

    #[test]
    fn filter_limits_kinds() {
        let wh = WebhookConfig {
            events: vec!["problem".into()],
            ..WebhookConfig::new("https://hooks.example")
        };
        assert!(wh.accepts("problem"));
        assert!(!wh.accepts("recovery"));
    }

    #[test]
    fn payload_carries_transition() {
        let payload = WebhookPayload::from_notification(&problem());
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(json["type"], "problem");
        assert_eq!(json["title"], "Server Problem");
        assert_eq!(json["transition"]["target_name"], "GitHub");
        assert_eq!(json["transition"]["new_status"]["kind"], "timeout");
    }

    #[test]
    fn signature_is_deterministic() {
        let a = sign_payload(b"body", "secret");
        assert_eq!(a, sign_payload(b"body", "secret"));
        assert_ne!(a, sign_payload(b"body", "other"));
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn posts_signed_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("Content-Type", "application/json"))
            .and(header_exists(SIGNATURE_HEADER))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let wh = WebhookConfig {
            secret: Some("s3cret".into()),
            ..fast(format!("{}/hook", server.uri()))
        };
        let sink = WebhookSink::new(vec![wh], Client::new());
        sink.deliver(&problem()).await.unwrap();

        let requests: Vec<Request> = server.received_requests().await.unwrap();
        let sig = requests[0]
            .headers
            .get(SIGNATURE_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert_eq!(sig, format!("sha256={}", sign_payload(&requests[0].body, "s3cret")));
    }

    #[tokio::test]
    async fn filtered_endpoint_is_not_called() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let wh = WebhookConfig {
            events: vec!["recovery".into()],
            ..fast(server.uri())
        };
        WebhookSink::new(vec![wh], Client::new())
            .deliver(&problem())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let wh = WebhookConfig {
            max_retries: 3,
            ..fast(server.uri())
        };
        let err = WebhookSink::new(vec![wh], Client::new())
            .deliver(&problem())
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Rejected { status: 404, .. }));
    }

    #[tokio::test]
    async fn server_error_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let wh = WebhookConfig {
            max_retries: 1,
            ..fast(server.uri())
        };
        let err = WebhookSink::new(vec![wh], Client::new())
            .deliver(&problem())
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Http { status: 503, .. }));
    }
}
