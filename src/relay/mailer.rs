use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::{Result, SooqError};

/// One outgoing message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Email {
    pub email: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<()>;
}

/// Delivers through a mail API that takes `{email, subject, body}` as JSON
pub struct HttpMailer {
    http: Client,
    endpoint: String,
    service_key: String,
}

impl HttpMailer {
    pub fn new(endpoint: &str, service_key: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("syria-sooq-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            service_key: service_key.to_string(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &Email) -> Result<()> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.service_key)
            .json(email)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %message, "Mail API rejected the message");
            return Err(SooqError::Remote {
                status: status.as_u16(),
                message: format!("Failed to send email: {}", message.trim()),
            });
        }
        info!(to = %email.email, "Email sent");
        Ok(())
    }
}
