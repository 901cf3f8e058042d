use std::{error::Error as _, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

/// What came back from a webhook, whatever the status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    pub status: u16,
    pub body: String,
}

/// The request never produced a response (DNS, refused connection, timeout...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// HTTP seam of the publisher, swapped for a stub in tests.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn post_json(&self, url: &str, body: &Value) -> Result<WebhookResponse, TransportError>;
}

/// reqwest client that ignores proxy settings from the environment.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .no_proxy()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;
        Ok(Self { client, timeout })
    }

    fn describe(&self, e: reqwest::Error) -> TransportError {
        if e.is_timeout() {
            return TransportError(format!(
                "request timed out after {}s",
                self.timeout.as_secs()
            ));
        }
        let mut msg = e.to_string();
        let mut source = e.source();
        while let Some(cause) = source {
            msg.push_str(": ");
            msg.push_str(&cause.to_string());
            source = cause.source();
        }
        TransportError(msg)
    }
}

#[async_trait]
impl WebhookTransport for HttpTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<WebhookResponse, TransportError> {
        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.describe(e))?;

        let status = resp.status().as_u16();
        // a body that cannot be read still leaves us a status to report
        let body = resp.text().await.unwrap_or_default();
        Ok(WebhookResponse { status, body })
    }
}
