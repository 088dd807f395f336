//! Email service for account verification and password reset notifications

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use std::str::FromStr;
use std::sync::Arc;

use crate::{
    config::EmailConfig,
    error::{AppError, AppResult},
};

/// A composed message, ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivery backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> AppResult<()>;
}

/// SMTP delivery through lettre
pub struct SmtpMailer {
    config: EmailConfig,
}

impl SmtpMailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(&self, email: &OutgoingEmail) -> AppResult<Message> {
        let from_name = self.config.smtp_from_name.as_deref().unwrap_or("BiblioTech");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(&email.to)
            .map_err(|e| AppError::Internal(format!("Invalid to address: {}", e)))?;

        Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(email.subject.as_str())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.body.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body(&email.body)),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))
    }

    fn build_transport(&self) -> AppResult<SmtpTransport> {
        let mailer_builder = if self.config.smtp_use_tls {
            // Use STARTTLS for secure connection
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer_builder
        };

        Ok(mailer_builder.build())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> AppResult<()> {
        let message = self.build_message(&email)?;
        let transport = self.build_transport()?;

        // lettre's SMTP transport blocks; keep it off the async workers
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| AppError::Internal(format!("Email task failed: {}", e)))?
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        tracing::info!("Email sent to {}", email.to);
        Ok(())
    }
}

/// HTML alternative of a plain-text body; `<pre>` keeps its line breaks
fn html_body(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    format!("<html><body><pre>{}</pre></body></html>", escaped)
}

/// Writes messages to the log instead of delivering them (email disabled)
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> AppResult<()> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "Email delivery disabled, message not sent:\n{}",
            email.body
        );
        Ok(())
    }
}

/// Composes account notifications and hands them to a `Mailer`
#[derive(Clone)]
pub struct EmailService {
    mailer: Arc<dyn Mailer>,
    frontend_url: String,
}

impl EmailService {
    pub fn new(mailer: Arc<dyn Mailer>, frontend_url: impl Into<String>) -> Self {
        Self {
            mailer,
            frontend_url: frontend_url.into(),
        }
    }

    /// Pick the delivery backend from configuration
    pub fn from_config(config: &EmailConfig, frontend_url: &str) -> Self {
        let mailer: Arc<dyn Mailer> = if config.enabled {
            Arc::new(SmtpMailer::new(config.clone()))
        } else {
            Arc::new(LogMailer)
        };
        Self::new(mailer, frontend_url)
    }

    /// Link the user follows to verify their email
    pub fn verification_url(&self, token: &str) -> String {
        format!(
            "{}/verify-email?token={}",
            self.frontend_url.trim_end_matches('/'),
            token
        )
    }

    /// Send the email verification link
    pub async fn send_verification(&self, to: &str, name: &str, token: &str) -> AppResult<()> {
        let body = format!(
            r#"Bonjour {name},

Merci pour votre inscription sur BiblioTech.
Confirmez votre adresse email en ouvrant ce lien :

{url}

Ce lien est valable 24 heures.
Si vous n'êtes pas à l'origine de cette inscription, ignorez cet email.
"#,
            name = name,
            url = self.verification_url(token)
        );

        self.mailer
            .send(OutgoingEmail {
                to: to.to_string(),
                subject: "Confirmez votre inscription - BiblioTech".to_string(),
                body,
            })
            .await
    }

    /// Send a password reset code
    pub async fn send_reset_code(&self, to: &str, name: &str, code: &str) -> AppResult<()> {
        let body = format!(
            r#"Bonjour {name},

Votre code de réinitialisation de mot de passe est : {code}

Ce code expire dans 15 minutes et ne peut être utilisé qu'une seule fois.
Si vous n'avez pas demandé de réinitialisation, ignorez cet email.
"#,
            name = name,
            code = code
        );

        self.mailer
            .send(OutgoingEmail {
                to: to.to_string(),
                subject: "Code de réinitialisation - BiblioTech".to_string(),
                body,
            })
            .await
    }

    /// Notify that the password was changed with a reset code
    pub async fn send_password_changed(&self, to: &str, name: &str) -> AppResult<()> {
        let body = format!(
            r#"Bonjour {name},

Le mot de passe de votre compte BiblioTech vient d'être réinitialisé.
Si vous n'êtes pas à l'origine de ce changement, contactez le support immédiatement.
"#,
            name = name
        );

        self.mailer
            .send(OutgoingEmail {
                to: to.to_string(),
                subject: "Mot de passe modifié - BiblioTech".to_string(),
                body,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_body_escapes_markup() {
        let html = html_body("Bonjour <b>Léa</b> & co,\nligne 2");
        assert_eq!(
            html,
            "<html><body><pre>Bonjour &lt;b&gt;Léa&lt;/b&gt; &amp; co,\nligne 2</pre></body></html>"
        );
        assert!(!html.contains("<br>"));
    }

    #[tokio::test]
    async fn test_reset_code_email_carries_code() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send()
            .withf(|email| {
                email.to == "lea@example.org"
                    && email.subject.contains("réinitialisation")
                    && email.body.contains("042917")
            })
            .times(1)
            .returning(|_| Ok(()));

        let service = EmailService::new(Arc::new(mailer), "http://localhost:5173");
        service
            .send_reset_code("lea@example.org", "Léa Martin", "042917")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_verification_email_links_to_frontend() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send()
            .withf(|email| email.body.contains("https://app.example.org/verify-email?token=abc-_1"))
            .times(1)
            .returning(|_| Ok(()));

        let service = EmailService::new(Arc::new(mailer), "https://app.example.org/");
        service
            .send_verification("lea@example.org", "Léa Martin", "abc-_1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delivery_errors_are_returned_to_caller() {
        let mut mailer = MockMailer::new();
        mailer
            .expect_send()
            .returning(|_| Err(AppError::Internal("smtp down".to_string())));

        let service = EmailService::new(Arc::new(mailer), "http://localhost:5173");
        assert!(service
            .send_password_changed("lea@example.org", "Léa Martin")
            .await
            .is_err());
    }
}
