use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use std::time::Duration;

use crate::config::SmtpConfig;
use crate::models::ChallengeKind;
use crate::services::ServiceError;

/// Outbound delivery of one-time passcodes to an identity's registered
/// address.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_code(
        &self,
        to_email: &str,
        code: &str,
        kind: ChallengeKind,
    ) -> Result<(), ServiceError>;
}

#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: SmtpTransport,
    from_email: String,
}

impl SmtpNotifier {
    pub fn new(config: &SmtpConfig) -> Result<Self, ServiceError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let mailer = SmtpTransport::relay(&config.host)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!(e.to_string())))?
            .credentials(creds)
            .port(config.port)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, "SMTP notifier initialized");

        Ok(Self {
            mailer,
            from_email: config.from.clone(),
        })
    }

    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        plain_body: &str,
        html_body: &str,
    ) -> Result<(), ServiceError> {
        let email = Message::builder()
            .from(self.from_email.parse().map_err(
                |e: lettre::address::AddressError| ServiceError::Internal(e.into()),
            )?)
            .to(to_email.parse().map_err(
                |e: lettre::address::AddressError| ServiceError::Internal(e.into()),
            )?)
            .subject(subject)
            .multipart(
                lettre::message::MultiPart::alternative()
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain_body.to_string()),
                    )
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )
            .map_err(|e| ServiceError::Internal(e.into()))?;

        // Send in the blocking pool to keep the async runtime free
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| ServiceError::Internal(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(to = %to_email, subject = %subject, "Email sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, to = %to_email, "Failed to send email");
                Err(ServiceError::DeliveryFailed(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_code(
        &self,
        to_email: &str,
        code: &str,
        kind: ChallengeKind,
    ) -> Result<(), ServiceError> {
        let (subject, lede) = match kind {
            ChallengeKind::Verify => (
                "Verify your email address",
                "Thank you for registering. Enter the code below to verify your email address:",
            ),
            ChallengeKind::Reset => (
                "Reset your password",
                "We received a request to reset your password. Enter the code below to continue:",
            ),
        };

        let html_body = format!(
            r###"<html>
    <body style="font-family: Arial, sans-serif;">
        <h2>{}</h2>
        <p>{}</p>
        <p style="font-size: 28px; letter-spacing: 6px; font-weight: bold;">{}</p>
        <p style="color: #666; font-size: 12px;">
            This code will expire in 10 minutes. If you didn't request this, please ignore this email.
        </p>
    </body>
</html>
"###,
            subject, lede, code
        );

        let plain_body = format!(
            "{}\n\n{}\n\n{}\n\nThis code will expire in 10 minutes. If you didn't request this, please ignore this email.",
            subject, lede, code
        );

        self.send_email(to_email, subject, &plain_body, &html_body)
            .await
    }
}

/// Test notifier that records dispatched codes instead of sending them.
#[derive(Default)]
pub struct MockNotifier {
    sent: std::sync::Mutex<Vec<SentCode>>,
}

#[derive(Debug, Clone)]
pub struct SentCode {
    pub to_email: String,
    pub code: String,
    pub kind: ChallengeKind,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently dispatched code for an address, if any.
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .iter()
            .rev()
            .find(|sent| sent.to_email == email)
            .map(|sent| sent.code.clone())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("notifier mutex poisoned").len()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send_code(
        &self,
        to_email: &str,
        code: &str,
        kind: ChallengeKind,
    ) -> Result<(), ServiceError> {
        self.sent.lock().expect("notifier mutex poisoned").push(SentCode {
            to_email: to_email.to_string(),
            code: code.to_string(),
            kind,
        });
        Ok(())
    }
}
