use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::debug;

use crate::config::SmtpConfig;

pub const ACTIVATION_SUBJECT: &str = "Your Activation Code";

pub fn activation_body(code: &str) -> String {
    format!("Your 4-digit activation code is: {code}. It expires in 1 minute.")
}

/// Outbound notification channel.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_activation_code(&self, to: &str, code: &str) -> anyhow::Result<()>;
    /// Reachability probe used by the health endpoint.
    async fn check(&self) -> anyhow::Result<()>;
}

/// Plain SMTP relay without authentication or TLS.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        let from = config
            .from
            .parse::<Mailbox>()
            .with_context(|| format!("invalid from address {:?}", config.from))?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port)
            .timeout(Some(Duration::from_secs(config.timeout_secs)))
            .build();
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_activation_code(&self, to: &str, code: &str) -> anyhow::Result<()> {
        let to = to
            .parse::<Mailbox>()
            .with_context(|| format!("invalid recipient {to:?}"))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(ACTIVATION_SUBJECT)
            .header(ContentType::TEXT_PLAIN)
            .body(activation_body(code))
            .context("build activation message")?;
        self.transport
            .send(message)
            .await
            .context("smtp send")?;
        debug!("activation message handed to smtp relay");
        Ok(())
    }

    async fn check(&self) -> anyhow::Result<()> {
        let ok = self
            .transport
            .test_connection()
            .await
            .context("smtp connection test")?;
        if !ok {
            anyhow::bail!("smtp server did not answer NOOP");
        }
        Ok(())
    }
}
