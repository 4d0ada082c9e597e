//! Outbound email relay client
//!
//! Fire-and-forget: sends are spawned onto the runtime and the HTTP result
//! is logged, never awaited by request handlers. With no relay URL
//! configured, sends are dropped silently.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Email relay errors
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Relay error {0}: {1}")]
    RelayError(u16, String),
}

/// Template email posted to the relay
#[derive(Debug, Clone, Serialize)]
struct TemplateMessage {
    template: String,
    to: String,
    from: String,
    data: serde_json::Value,
}

/// Client for the outbound email relay
#[derive(Clone)]
pub struct EmailClient {
    http: reqwest::Client,
    relay_url: Option<String>,
    from: String,
}

impl EmailClient {
    pub fn new(relay_url: Option<String>, from: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            http,
            relay_url,
            from,
        }
    }

    /// A client with no relay configured; every send is a no-op
    pub fn disabled() -> Self {
        Self::new(None, String::new())
    }

    /// Queue a template email without waiting for delivery
    ///
    /// The send runs on a spawned task; failures are logged and dropped.
    pub fn send_template(&self, template: &str, to: &str, data: serde_json::Value) {
        let relay_url = match &self.relay_url {
            Some(url) => url.clone(),
            None => {
                debug!("Email relay not configured; dropping '{}' to {}", template, to);
                return;
            }
        };

        let message = TemplateMessage {
            template: template.to_string(),
            to: to.to_string(),
            from: self.from.clone(),
            data,
        };
        let http = self.http.clone();

        tokio::spawn(async move {
            match post_message(&http, &relay_url, &message).await {
                Ok(()) => debug!("Sent '{}' email to {}", message.template, message.to),
                Err(e) => warn!(
                    "Failed to send '{}' email to {}: {}",
                    message.template, message.to, e
                ),
            }
        });
    }
}

async fn post_message(
    http: &reqwest::Client,
    relay_url: &str,
    message: &TemplateMessage,
) -> Result<(), EmailError> {
    let response = http
        .post(relay_url)
        .json(message)
        .send()
        .await
        .map_err(|e| EmailError::NetworkError(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(EmailError::RelayError(status.as_u16(), body));
    }

    Ok(())
}
