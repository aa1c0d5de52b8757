use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};

use crate::config::Smtp;
use crate::notify::{Notification, Notifier, NotifyResult};

pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl std::fmt::Debug for SmtpNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpNotifier").field("from", &self.from).finish()
    }
}

impl SmtpNotifier {
    pub fn new(config: &Smtp) -> NotifyResult<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(config.host())?
            .port(config.port())
            .credentials(Credentials::new(
                config.username().to_string(),
                config.password().to_string(),
            ))
            .build();

        Ok(Self {
            transport,
            from: config.from().parse()?,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, notification: &Notification) -> NotifyResult<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(
                Some(notification.recipient_name().to_string()),
                notification.recipient().parse()?,
            ))
            .subject(notification.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body())?;

        self.transport.send(message).await?;
        tracing::debug!("mail sent to {}", notification.recipient());
        Ok(())
    }
}
