//! Email service for order notifications.
//!
//! Uses SMTP via lettre for delivery with Askama HTML and text templates.
//! Notifications are best effort: a send failure is logged, never returned
//! to the request that triggered it.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::SmtpConfig;
use crate::models::Order;
use crate::models::user::GUEST_EMAIL;

/// Port on which SMTP servers expect implicit TLS.
const IMPLICIT_TLS_PORT: u16 = 465;

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    order: &'a Order,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    order: &'a Order,
}

#[derive(Template)]
#[template(path = "email/order_shipped.html")]
struct OrderShippedHtml<'a> {
    order: &'a Order,
}

#[derive(Template)]
#[template(path = "email/order_shipped.txt")]
struct OrderShippedText<'a> {
    order: &'a Order,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// A rendered email ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Render the "order confirmed" email.
///
/// # Errors
///
/// Returns `EmailError::Template` if rendering fails.
pub fn render_order_confirmation(order: &Order) -> Result<RenderedEmail, EmailError> {
    Ok(RenderedEmail {
        subject: format!("Your Order {} is Confirmed", order.order_number),
        text: OrderConfirmationText { order }.render()?,
        html: OrderConfirmationHtml { order }.render()?,
    })
}

/// Render the "order shipped" email.
///
/// # Errors
///
/// Returns `EmailError::Template` if rendering fails.
pub fn render_order_shipped(order: &Order) -> Result<RenderedEmail, EmailError> {
    Ok(RenderedEmail {
        subject: format!("Your Order {} has shipped", order.order_number),
        text: OrderShippedText { order }.render()?,
        html: OrderShippedHtml { order }.render()?,
    })
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// Port 465 uses implicit TLS; any other port upgrades with STARTTLS.
    ///
    /// # Errors
    ///
    /// Returns error if the relay host is invalid.
    pub fn new(config: &SmtpConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let builder = if config.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        };

        let mailer = builder.port(config.port).credentials(credentials).build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send a rendered email to one recipient.
    ///
    /// # Errors
    ///
    /// Returns error if an address is invalid or the SMTP send fails.
    pub async fn send(&self, to: &str, email: &RenderedEmail) -> Result<(), EmailError> {
        self.send_multipart_email(to, &email.subject, &email.text, &email.html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

/// Which order notification to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderNotification {
    Confirmed,
    Shipped,
}

/// Send an order notification to the order's customer, best effort.
///
/// Skips (with a log line) when SMTP is not configured or the order belongs
/// to the shared guest row, whose address is not deliverable.
pub async fn notify_customer(
    email: Option<&EmailService>,
    order: &Order,
    notification: OrderNotification,
) {
    let Some(email) = email else {
        tracing::warn!(
            order_number = %order.order_number,
            ?notification,
            "SMTP not configured; skipping order email"
        );
        return;
    };

    if order.customer_email == GUEST_EMAIL {
        tracing::info!(
            order_number = %order.order_number,
            ?notification,
            "Guest order; no customer address to email"
        );
        return;
    }

    let rendered = match notification {
        OrderNotification::Confirmed => render_order_confirmation(order),
        OrderNotification::Shipped => render_order_shipped(order),
    };

    let result = match rendered {
        Ok(rendered) => email.send(&order.customer_email, &rendered).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        tracing::error!(
            error = %e,
            order_number = %order.order_number,
            ?notification,
            "Failed to send order email"
        );
    }
}
