//! Outbound calls to Discord-compatible webhook endpoints.
//!
//! A single client serves both directions: the read-only `GET` probe used by
//! the health sweep and URL validation, and the fire-and-forget `POST` used
//! to announce administrative changes in a channel.

use std::time::Duration;

use serde::Serialize;

/// Timeout applied to every probe and every posted message.
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of probing an endpoint with `GET`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The endpoint answered, with any status code.
    Responded(u16),
    /// Timeout, connection refused, DNS failure or an invalid URL.
    Failed(String),
}

#[derive(Debug, Serialize)]
struct MessagePayload<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: reqwest::Client,
}

impl WebhookClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeout(WEBHOOK_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Issue a plain `GET` against the endpoint. Never fails: transport
    /// errors are folded into [`ProbeOutcome::Failed`].
    pub async fn probe(&self, url: &str) -> ProbeOutcome {
        match self.client.get(url).send().await {
            Ok(resp) => ProbeOutcome::Responded(resp.status().as_u16()),
            Err(e) => {
                tracing::debug!(url, "Webhook probe failed: {e}");
                ProbeOutcome::Failed(e.to_string())
            }
        }
    }

    /// Post a text message to the endpoint.
    ///
    /// Returns immediately without a request when `url` or `content` is blank.
    /// Delivery problems are logged and swallowed.
    pub async fn send_message(&self, url: &str, content: &str, username: Option<&str>) {
        if url.trim().is_empty() || content.trim().is_empty() {
            return;
        }

        let payload = MessagePayload {
            content,
            username: username.filter(|u| !u.is_empty()),
        };

        match self.client.post(url).json(&payload).send().await {
            Ok(resp) => {
                let status = resp.status();
                // Discord answers 204 on success
                if !status.is_success() {
                    let body = resp.text().await.unwrap_or_default();
                    tracing::warn!(status = status.as_u16(), "Webhook message rejected: {body}");
                }
            }
            Err(e) => {
                tracing::warn!("Failed to send webhook message: {e}");
            }
        }
    }
}

/// Announcement posted to a link's channel after it has been disabled.
pub fn disabled_notice(group_name: &str, service_name: &str, contact: Option<&str>) -> String {
    let mut content = format!(
        "Service Announcement\n\n🔕 Webhook disabled for **{group_name} / {service_name}**."
    );
    match contact {
        Some(contact) if !contact.trim().is_empty() => {
            content.push_str(&format!(
                "\n\nPlease contact your provider ({}) to re-enable services.",
                contact.trim()
            ));
        }
        _ => content.push_str("\n\nPlease contact your provider to re-enable services."),
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_omits_missing_username() {
        let payload = MessagePayload { content: "hi", username: None };
        assert_eq!(serde_json::to_string(&payload).unwrap(), r#"{"content":"hi"}"#);

        let payload = MessagePayload { content: "hi", username: Some("Webhook Manager") };
        assert_eq!(
            serde_json::to_string(&payload).unwrap(),
            r#"{"content":"hi","username":"Webhook Manager"}"#
        );
    }

    #[test]
    fn disabled_notice_names_the_link() {
        let text = disabled_notice("Chipotle Flips", "Fooji", Some("admin#0001"));
        assert!(text.contains("**Chipotle Flips / Fooji**"));
        assert!(text.ends_with("Please contact your provider (admin#0001) to re-enable services."));

        let text = disabled_notice("Chipotle Flips", "Fooji", None);
        assert!(text.ends_with("Please contact your provider to re-enable services."));
    }
}
