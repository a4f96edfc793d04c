use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use orderhub_types::events::Notification;

/// Queues transactional emails for the background mailer.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
    /// Returns the notifier and the receiving end to hand to [`run_mailer`].
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn notify(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            warn!("Mailer is not running, notification dropped");
        }
    }
}

pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

pub enum Mailer {
    Smtp {
        transport: AsyncSmtpTransport<Tokio1Executor>,
        from: Mailbox,
    },
    /// No SMTP configured: notifications are only logged.
    Log,
}

impl Mailer {
    pub fn smtp(settings: &SmtpSettings) -> anyhow::Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
            .port(settings.port);
        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self::Smtp {
            transport: builder.build(),
            from: settings.from.parse()?,
        })
    }

    async fn deliver(&self, notification: &Notification) -> anyhow::Result<()> {
        match self {
            Self::Smtp { transport, from } => {
                let message = Message::builder()
                    .from(from.clone())
                    .to(notification.recipient().parse()?)
                    .subject(notification.subject())
                    .header(ContentType::TEXT_PLAIN)
                    .body(notification.body())?;
                transport.send(message).await?;
            }
            Self::Log => {
                info!(
                    to = notification.recipient(),
                    subject = %notification.subject(),
                    body = %notification.body(),
                    "SMTP not configured, email not sent"
                );
            }
        }
        Ok(())
    }
}

/// Drains the notification queue until every [`Notifier`] is dropped.
pub async fn run_mailer(mailer: Mailer, mut rx: mpsc::UnboundedReceiver<Notification>) {
    while let Some(notification) = rx.recv().await {
        match mailer.deliver(&notification).await {
            Ok(()) => info!("Sent '{}' to {}", notification.subject(), notification.recipient()),
            Err(e) => error!("Failed to email {}: {}", notification.recipient(), e),
        }
    }
    info!("Mailer stopped");
}
