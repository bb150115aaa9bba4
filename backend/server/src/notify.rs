//! Customer emails. Delivery is best effort: callers log failures and move on.
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: Email) -> anyhow::Result<()>;
}

/// Used when no mail relay is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        info!(to = %email.to, subject = %email.subject, "Email (not sent, no relay configured)");

        Ok(())
    }
}

#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

/// Posts `{from, to, subject, body}` as JSON to a mail relay.
pub struct RelayNotifier {
    client: Client,
    url: String,
    from: String,
}

impl RelayNotifier {
    pub fn new(url: String, from: String) -> Self {
        Self {
            client: Client::new(),
            url,
            from,
        }
    }
}

#[async_trait]
impl Notifier for RelayNotifier {
    async fn send(&self, email: Email) -> anyhow::Result<()> {
        let message = RelayMessage {
            from: &self.from,
            to: &email.to,
            subject: &email.subject,
            body: &email.body,
        };

        self.client
            .post(&self.url)
            .json(&message)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
