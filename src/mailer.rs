use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

/// Email templates known to the notification collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    SignUp,
    ResetPassword,
}

impl Template {
    pub fn name(self) -> &'static str {
        match self {
            Template::SignUp => "sign-up",
            Template::ResetPassword => "reset-password",
        }
    }
}

/// Everything a template needs to render one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient: String,
    pub template: Template,
    pub first_name: String,
    pub link: String,
    pub year: i32,
}

/// Builds `<base>?token=<token>`, the link format both templates rely on.
pub fn token_link(base_url: &str, token: &str) -> String {
    format!("{base_url}?token={token}")
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, notification: Notification) -> anyhow::Result<()>;
}

/// Sends in the background; the caller's response never waits on delivery and
/// failures are only logged.
pub fn dispatch(mailer: Arc<dyn Mailer>, notification: Notification) {
    tokio::spawn(async move {
        let recipient = notification.recipient.clone();
        let template = notification.template.name();
        if let Err(e) = mailer.send(notification).await {
            warn!(error = ?e, %recipient, template, "notification delivery failed");
        }
    });
}

/// Logs outgoing notifications instead of delivering them.
#[derive(Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, n: Notification) -> anyhow::Result<()> {
        info!(
            recipient = %n.recipient,
            template = n.template.name(),
            link = %n.link,
            "notification dispatched"
        );
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_link_appends_query_parameter() {
        assert_eq!(
            token_link("https://app.local/verify-email", "abc123"),
            "https://app.local/verify-email?token=abc123"
        );
    }

    #[tokio::test]
    async fn dispatch_delivers_in_background() {
        let mailer = testing::RecordingMailer::default();
        dispatch(
            Arc::new(mailer.clone()),
            Notification {
                recipient: "ann@example.com".into(),
                template: Template::ResetPassword,
                first_name: "Ann".into(),
                link: token_link("http://localhost/reset", "t0k3n"),
                year: 2025,
            },
        );
        let sent = mailer.wait_for(1).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].link, "http://localhost/reset?token=t0k3n");
    }

    #[test]
    fn template_names() {
        assert_eq!(Template::SignUp.name(), "sign-up");
        assert_eq!(Template::ResetPassword.name(), "reset-password");
    }
}
