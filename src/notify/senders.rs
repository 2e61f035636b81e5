use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::{EmailApiConfig, NotifyConfig, WhatsAppApiConfig};

use super::{EmailMessage, NotifyError, TextMessage};

#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), NotifyError>;

    async fn send_message(&self, message: &TextMessage) -> Result<(), NotifyError>;
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    content_type: &'static str,
    value: &'a str,
}

#[derive(Serialize)]
struct MailRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
}

/// Email over a SendGrid-style JSON API, WhatsApp over a Twilio-style
/// messages endpoint. An unconfigured channel only logs the message.
pub struct HttpSender {
    http: reqwest::Client,
    email: Option<EmailApiConfig>,
    whatsapp: Option<WhatsAppApiConfig>,
}

impl HttpSender {
    pub fn new(config: &NotifyConfig, timeout: Duration) -> Result<Self, NotifyError> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            email: config.email.clone(),
            whatsapp: config.whatsapp.clone(),
        })
    }

    async fn check(resp: reqwest::Response) -> Result<(), NotifyError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(NotifyError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl NotificationSender for HttpSender {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        let Some(config) = &self.email else {
            tracing::info!(to = %message.to, subject = %message.subject, "email channel not configured, skipping");
            return Ok(());
        };

        let html = message.template.render(&message.data);
        let request = MailRequest {
            personalizations: vec![Personalization {
                to: vec![Address { email: &message.to }],
            }],
            from: Address {
                email: &config.from,
            },
            subject: &message.subject,
            content: vec![Content {
                content_type: "text/html",
                value: &html,
            }],
        };

        let resp = self
            .http
            .post(&config.url)
            .bearer_auth(&config.api_key)
            .json(&request)
            .send()
            .await?;
        Self::check(resp).await?;
        tracing::debug!(to = %message.to, template = message.template.name(), "email sent");
        Ok(())
    }

    async fn send_message(&self, message: &TextMessage) -> Result<(), NotifyError> {
        let Some(config) = &self.whatsapp else {
            tracing::info!(to = %message.to, text = %message.text, "whatsapp channel not configured, skipping");
            return Ok(());
        };

        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            config.url.trim_end_matches('/'),
            config.account_sid
        );
        let from = format!("whatsapp:{}", config.from);
        let to = format!("whatsapp:{}", message.to);
        let resp = self
            .http
            .post(url)
            .basic_auth(&config.account_sid, Some(&config.auth_token))
            .form(&[
                ("From", from.as_str()),
                ("To", to.as_str()),
                ("Body", message.text.as_str()),
            ])
            .send()
            .await?;
        Self::check(resp).await?;
        tracing::debug!(to = %message.to, "whatsapp message sent");
        Ok(())
    }
}
