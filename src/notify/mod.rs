//! Outbound customer notifications.
//!
//! Requests hand messages to [`Notifier::dispatch`], which never blocks and
//! never fails the caller. A background worker delivers each message on its own
//! task and retries failed sends with exponential backoff, so a slow or broken
//! channel does not hold up state changes that already committed.

use std::{sync::Arc, time::Duration};

use serde_json::Value;
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    config::NotifyConfig,
    models::{User, collections::USERS},
    store::DocumentStore,
};

pub mod senders;
pub mod templates;

pub use senders::{HttpSender, NotificationSender};
pub use templates::Template;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("notification provider rejected the message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub template: Template,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMessage {
    pub to: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Email(EmailMessage),
    WhatsApp(TextMessage),
}

/// Email content before a recipient is known.
#[derive(Debug, Clone)]
pub struct EmailDraft {
    pub subject: String,
    pub template: Template,
    pub data: Value,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    const MAX_DELAY: Duration = Duration::from_secs(60);

    /// Delay before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff.saturating_mul(factor).min(Self::MAX_DELAY)
    }
}

impl From<&NotifyConfig> for RetryPolicy {
    fn from(config: &NotifyConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: config.backoff,
        }
    }
}

#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<Notification>,
}

impl Notifier {
    pub fn start(
        sender: Arc<dyn NotificationSender>,
        policy: RetryPolicy,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Notification>(capacity.max(1));
        let worker = tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                tokio::spawn(deliver(sender.clone(), notification, policy));
            }
            tracing::debug!("notification outbox closed");
        });
        (Self { tx }, worker)
    }

    pub fn dispatch(&self, notification: Notification) {
        if let Err(err) = self.tx.try_send(notification) {
            tracing::warn!(error = %err, "dropping notification, outbox unavailable");
        }
    }

    pub fn email(&self, to: impl Into<String>, draft: EmailDraft) {
        self.dispatch(Notification::Email(EmailMessage {
            to: to.into(),
            subject: draft.subject,
            template: draft.template,
            data: draft.data,
        }));
    }

    pub fn whatsapp(&self, to: impl Into<String>, text: impl Into<String>) {
        self.dispatch(Notification::WhatsApp(TextMessage {
            to: to.into(),
            text: text.into(),
        }));
    }
}

async fn deliver(
    sender: Arc<dyn NotificationSender>,
    notification: Notification,
    policy: RetryPolicy,
) {
    let mut attempt = 1;
    loop {
        let result = match &notification {
            Notification::Email(message) => sender.send_email(message).await,
            Notification::WhatsApp(message) => sender.send_message(message).await,
        };
        match result {
            Ok(()) => return,
            Err(err) if attempt < policy.max_attempts => {
                let delay = policy.delay(attempt);
                tracing::warn!(error = %err, attempt, ?delay, "notification failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => {
                tracing::error!(error = %err, attempt, "notification abandoned");
                return;
            }
        }
    }
}

/// Send an email and/or a WhatsApp text to the owner of a record, using the
/// contact details on their profile. Lookup failures are logged and swallowed.
pub async fn notify_owner(
    store: &dyn DocumentStore,
    notifier: &Notifier,
    owner_id: &str,
    email: Option<EmailDraft>,
    text: Option<String>,
) {
    let user = match store.get(USERS, owner_id).await {
        Ok(Some(doc)) => match doc.decode::<User>() {
            Ok(user) => user,
            Err(err) => {
                tracing::warn!(error = %err, owner_id, "unreadable user profile, skipping notification");
                return;
            }
        },
        Ok(None) => {
            tracing::debug!(owner_id, "no user profile, skipping notification");
            return;
        }
        Err(err) => {
            tracing::warn!(error = %err, owner_id, "user lookup failed, skipping notification");
            return;
        }
    };

    if let (Some(draft), Some(address)) = (email, user.email()) {
        notifier.email(address, draft);
    }
    if let (Some(text), Some(phone)) = (text, user.phone_number.as_deref()) {
        notifier.whatsapp(phone, text);
    }
}
