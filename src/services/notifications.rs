//! Best-effort customer notifications.
//!
//! Messages are rendered synchronously and delivered on a spawned task, so a
//! slow or failing mailer never affects the request that triggered it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivery backend.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), MailerError>;
}

#[derive(Debug, thiserror::Error)]
#[error("mail delivery failed: {0}")]
pub struct MailerError(pub String);

/// Mailer that only records deliveries in the log.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), MailerError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body_len = message.body.len(),
            "Email delivered to log mailer"
        );
        Ok(())
    }
}

/// One purchased line as it appears in a confirmation.
#[derive(Debug, Clone)]
pub struct ConfirmationLine {
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone)]
pub enum Notification {
    Welcome {
        name: String,
    },
    OrderConfirmation {
        name: String,
        order_id: Uuid,
        order_date: DateTime<Utc>,
        payment_method: String,
        lines: Vec<ConfirmationLine>,
        subtotal: Decimal,
        shipping: Decimal,
        grand_total: Decimal,
    },
}

impl Notification {
    pub fn render(&self, to: &str) -> OutgoingMessage {
        match self {
            Notification::Welcome { name } => OutgoingMessage {
                to: to.to_string(),
                subject: "Welcome to Our Community!".to_string(),
                body: format!(
                    "Hello {name},\n\nYour account has been created. You can now log in, top up your wallet and start shopping.\n"
                ),
            },
            Notification::OrderConfirmation {
                name,
                order_id,
                order_date,
                payment_method,
                lines,
                subtotal,
                shipping,
                grand_total,
            } => {
                let mut body = format!(
                    "Hello {name},\n\nThank you for your order! Here are the details:\n\nOrder ID: #{order_id}\nDate: {}\nPayment Method: {payment_method}\n\nItems:\n",
                    order_date.format("%B %d, %Y at %I:%M %p")
                );
                for line in lines {
                    let total = line.unit_price * Decimal::from(line.quantity);
                    body.push_str(&format!(
                        "- {} x{} @ {:.2} = {:.2}\n",
                        line.name, line.quantity, line.unit_price, total
                    ));
                }
                body.push_str(&format!(
                    "\nSubtotal: {subtotal:.2}\nShipping: {shipping:.2}\nGrand Total: {grand_total:.2}\n\nYour order is being processed. We'll notify you when it's shipped.\n"
                ));
                OutgoingMessage {
                    to: to.to_string(),
                    subject: format!("Order #{order_id} Confirmed!"),
                    body,
                }
            }
        }
    }
}

/// Fire-and-forget front door to the configured [`Mailer`].
#[derive(Clone)]
pub struct NotificationDispatcher {
    mailer: Arc<dyn Mailer>,
}

impl NotificationDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    pub fn logging() -> Self {
        Self::new(Arc::new(LogMailer))
    }

    /// Renders and queues a message; failures are logged and dropped.
    pub fn dispatch(&self, to: &str, notification: Notification) -> tokio::task::JoinHandle<()> {
        let message = notification.render(to);
        let mailer = self.mailer.clone();
        tokio::spawn(async move {
            if let Err(err) = mailer.send(&message).await {
                warn!(to = %message.to, subject = %message.subject, error = %err, "Notification not delivered");
            }
        })
    }
}
