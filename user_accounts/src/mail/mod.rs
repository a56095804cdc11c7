//! Mail delivery abstraction for OTP notification.
//!
//! Delivery is attempt-once: the OTP manager persists the code before
//! handing the message to a [`Mailer`], and a failed send surfaces to the
//! caller without rolling the code back. Implementations decide transport;
//! [`HttpApiMailer`] posts to an HTTP mail API and [`LogMailer`] logs the
//! payload for local development.

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::Serialize;

/// A single outbound message.
#[derive(Debug, Clone)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mail delivery abstraction used by the OTP manager.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver a message or return an error; never retried.
    async fn send(&self, message: &MailMessage) -> Result<()>;
}

/// Local dev mailer that logs the payload instead of sending real email.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        log::info!(
            "mail send stub: to={} subject={:?} body={:?}",
            message.to,
            message.subject,
            message.body
        );
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiEmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiSendBody {
    sender: ApiEmailAddress,
    to: Vec<ApiEmailAddress>,
    subject: String,
    text_content: String,
}

/// Mailer backed by a transactional HTTP mail API.
pub struct HttpApiMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    sender_email: String,
    sender_name: Option<String>,
}

impl HttpApiMailer {
    pub fn new(
        api_url: String,
        api_key: String,
        sender_email: String,
        sender_name: Option<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            sender_email,
            sender_name,
        }
    }
}

#[async_trait]
impl Mailer for HttpApiMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        let body = ApiSendBody {
            sender: ApiEmailAddress {
                email: self.sender_email.clone(),
                name: self.sender_name.clone(),
            },
            to: vec![ApiEmailAddress {
                email: message.to.clone(),
                name: None,
            }],
            subject: message.subject.clone(),
            text_content: message.body.clone(),
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            bail!("mail API returned {status}");
        }
        Ok(())
    }
}

/// Test mailer that records messages and can be told to fail.
#[cfg(test)]
pub mod recording {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<MailMessage>>,
        pub fail: bool,
    }

    impl RecordingMailer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        pub fn last_body(&self) -> Option<String> {
            self.sent.lock().unwrap().last().map(|m| m.body.clone())
        }
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &MailMessage) -> Result<()> {
            if self.fail {
                bail!("simulated delivery failure");
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_mailer_always_succeeds() {
        let mailer = LogMailer;
        let message = MailMessage {
            to: "dev@example.com".to_string(),
            subject: "Your OTP for Registration".to_string(),
            body: "Your OTP is 123456.".to_string(),
        };
        assert!(mailer.send(&message).await.is_ok());
    }

    #[test]
    fn test_api_body_serializes_camel_case() {
        let body = ApiSendBody {
            sender: ApiEmailAddress {
                email: "noreply@example.com".to_string(),
                name: Some("Accounts".to_string()),
            },
            to: vec![ApiEmailAddress {
                email: "user@example.com".to_string(),
                name: None,
            }],
            subject: "subject".to_string(),
            text_content: "body".to_string(),
        };

        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("textContent").is_some());
        assert!(json["to"][0].get("name").is_none());
    }
}
