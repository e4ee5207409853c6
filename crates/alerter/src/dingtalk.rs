use crate::error::AlerterError;
use base64::Engine;
use configuration::NotifierConfig;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Signs a webhook call: `base64(HMAC-SHA256(secret, "{timestamp}\n{secret}"))`.
///
/// The timestamp is in milliseconds since the epoch and must be sent alongside the signature.
pub fn sign(secret: &str, timestamp_ms: i64) -> Result<String, AlerterError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AlerterError::Signing(e.to_string()))?;
    mac.update(format!("{}\n{}", timestamp_ms, secret).as_bytes());
    let code_bytes = mac.finalize().into_bytes();
    Ok(base64::engine::general_purpose::STANDARD.encode(code_bytes))
}

/// The JSON payload of a markdown robot message.
#[derive(Debug, Serialize)]
struct MarkdownPayload<'a> {
    msgtype: &'static str,
    markdown: MarkdownBody<'a>,
}

#[derive(Debug, Serialize)]
struct MarkdownBody<'a> {
    title: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct WebhookReply {
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

/// A client for a DingTalk group robot webhook.
pub struct DingTalkNotifier {
    client: Client,
    webhook_url: String,
    secret: Option<String>,
}

impl DingTalkNotifier {
    /// Creates a notifier, or `NotConfigured` when there is no webhook URL.
    pub fn new(config: &NotifierConfig) -> Result<Self, AlerterError> {
        if config.webhook_url.is_empty() {
            return Err(AlerterError::NotConfigured);
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            webhook_url: config.webhook_url.clone(),
            secret: (!config.secret.is_empty()).then(|| config.secret.clone()),
        })
    }

    /// Posts a markdown message. A non-zero `errcode` in the reply is an error.
    pub async fn send_markdown(&self, title: &str, text: &str) -> Result<(), AlerterError> {
        let payload = MarkdownPayload {
            msgtype: "markdown",
            markdown: MarkdownBody { title, text },
        };

        let mut request = self.client.post(&self.webhook_url);
        if let Some(secret) = &self.secret {
            let timestamp = chrono::Utc::now().timestamp_millis();
            let signature = sign(secret, timestamp)?;
            request = request.query(&[("timestamp", timestamp.to_string()), ("sign", signature)]);
        }

        let response = request.json(&payload).send().await?;
        if !response.status().is_success() {
            return Err(AlerterError::ApiError(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let reply: WebhookReply = response.json().await?;
        if reply.errcode != 0 {
            return Err(AlerterError::ApiError(format!(
                "errcode {}: {}",
                reply.errcode, reply.errmsg
            )));
        }

        tracing::info!(title, "DingTalk message delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_matches_reference_value() {
        // HMAC-SHA256("secret", "1700000000000\nsecret"), base64 encoded.
        let expected = {
            let mut mac = HmacSha256::new_from_slice(b"secret").unwrap();
            mac.update(b"1700000000000\nsecret");
            base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
        };
        assert_eq!(sign("secret", 1_700_000_000_000).unwrap(), expected);
    }

    #[test]
    fn signature_depends_on_timestamp() {
        let a = sign("SEC123", 1).unwrap();
        let b = sign("SEC123", 2).unwrap();
        assert_ne!(a, b);
        // 32-byte digest -> 44 base64 characters.
        assert_eq!(a.len(), 44);
    }

    #[test]
    fn missing_webhook_is_not_configured() {
        let config = NotifierConfig::default();
        assert!(matches!(
            DingTalkNotifier::new(&config),
            Err(AlerterError::NotConfigured)
        ));
    }
}
