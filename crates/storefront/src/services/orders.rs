//! Checkout order notifications.
//!
//! Submitting an order sends two mails at once, an alert to the shop owner
//! and a confirmation to the buyer, and waits for both to settle. Whether a
//! failed notification fails the order is decided by [`DeliveryPolicy`].

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use mring_core::Email;

use super::email::{Delivery, EmailError, Mailer};
use super::messages;
use crate::config::DeliveryPolicy;
use crate::models::{MissingField, Order};

/// Errors from order submission.
#[derive(Debug, Error)]
pub enum OrderError {
    /// A required checkout field was blank.
    #[error("missing required field: {}", .0.as_str())]
    MissingField(MissingField),

    /// The buyer's email address is malformed.
    #[error("invalid customer email: {0}")]
    InvalidEmail(#[from] mring_core::EmailError),

    /// Rendering the notifications failed.
    #[error("failed to compose notification: {0}")]
    Compose(#[source] EmailError),

    /// A notification was not delivered under [`DeliveryPolicy::RequireAll`].
    #[error("order notifications not delivered")]
    NotDelivered,
}

impl From<MissingField> for OrderError {
    fn from(field: MissingField) -> Self {
        Self::MissingField(field)
    }
}

/// What happened to each notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderReceipt {
    pub owner_notified: bool,
    pub customer_notified: bool,
}

impl OrderReceipt {
    #[must_use]
    pub const fn fully_delivered(self) -> bool {
        self.owner_notified && self.customer_notified
    }
}

/// Sends order notifications.
#[derive(Clone)]
pub struct OrderService {
    mailer: Arc<dyn Mailer>,
    owner: Email,
    shop: String,
    policy: DeliveryPolicy,
}

impl OrderService {
    #[must_use]
    pub fn new(
        mailer: Arc<dyn Mailer>,
        owner: Email,
        shop: impl Into<String>,
        policy: DeliveryPolicy,
    ) -> Self {
        Self {
            mailer,
            owner,
            shop: shop.into(),
            policy,
        }
    }

    /// Notify the owner and the buyer about `order`.
    ///
    /// # Errors
    ///
    /// Returns `OrderError` if the buyer address is invalid, a message cannot
    /// be rendered, or delivery failed and the policy requires it.
    #[instrument(skip(self, order), fields(product = %order.product_name))]
    pub async fn submit(&self, order: &Order) -> Result<OrderReceipt, OrderError> {
        let customer = order.customer_email()?;

        let owner_mail = messages::owner_order_alert(&self.shop, self.owner.clone(), order)
            .map_err(OrderError::Compose)?;
        let customer_mail = messages::customer_confirmation(&self.shop, customer, order)
            .map_err(OrderError::Compose)?;

        let (owner_result, customer_result) = tokio::join!(
            self.mailer.send(owner_mail),
            self.mailer.send(customer_mail)
        );

        let receipt = OrderReceipt {
            owner_notified: settled("owner", &owner_result),
            customer_notified: settled("customer", &customer_result),
        };

        if !receipt.fully_delivered() {
            tracing::warn!(
                owner_notified = receipt.owner_notified,
                customer_notified = receipt.customer_notified,
                policy = ?self.policy,
                "Some emails were not accepted by SMTP server"
            );
            if self.policy == DeliveryPolicy::RequireAll {
                return Err(OrderError::NotDelivered);
            }
        }

        tracing::info!("Order submitted");
        Ok(receipt)
    }
}

/// Whether a dispatch ended with at least one accepted recipient.
fn settled(recipient: &str, result: &Result<Delivery, EmailError>) -> bool {
    match result {
        Ok(delivery) => delivery.is_accepted(),
        Err(e) => {
            tracing::warn!(recipient, error = %e, "Order notification failed");
            false
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::services::email::OutgoingEmail;

    /// Accepts everything except mail addressed to `refuse`.
    #[derive(Default)]
    struct FakeMailer {
        sent: Mutex<Vec<OutgoingEmail>>,
        refuse: Option<Email>,
    }

    #[async_trait]
    impl Mailer for FakeMailer {
        async fn send(&self, email: OutgoingEmail) -> Result<Delivery, EmailError> {
            let refused = self.refuse.as_ref() == Some(&email.to);
            self.sent.lock().unwrap().push(email.clone());
            if refused {
                Ok(Delivery::default())
            } else {
                Ok(Delivery::all_accepted(&email.to))
            }
        }
    }

    fn order() -> Order {
        Order {
            product_name: "Футболка".to_string(),
            product_price: "2100₽".to_string(),
            name: "Иван".to_string(),
            email: "Buyer@Example.com".to_string(),
            phone: "+79990000000".to_string(),
            address: "Самара".to_string(),
            details: "Нет дополнительных комментариев".to_string(),
        }
    }

    fn owner() -> Email {
        Email::parse("owner@example.com").unwrap()
    }

    fn service(mailer: Arc<FakeMailer>, policy: DeliveryPolicy) -> OrderService {
        OrderService::new(mailer, owner(), "MR.ING", policy)
    }

    #[tokio::test]
    async fn test_sends_owner_and_customer_mail() {
        let mailer = Arc::new(FakeMailer::default());
        let receipt = service(mailer.clone(), DeliveryPolicy::BestEffort)
            .submit(&order())
            .await
            .unwrap();

        assert!(receipt.fully_delivered());
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().any(|m| m.to == owner() && m.subject == "Новый заказ MR.ING"));
        assert!(
            sent.iter()
                .any(|m| m.to.as_str() == "buyer@example.com" && m.subject.contains("в обработке"))
        );
    }

    #[tokio::test]
    async fn test_best_effort_reports_success_on_refusal() {
        let mailer = Arc::new(FakeMailer {
            refuse: Some(owner()),
            ..FakeMailer::default()
        });
        let receipt = service(mailer.clone(), DeliveryPolicy::BestEffort)
            .submit(&order())
            .await
            .unwrap();

        assert!(!receipt.owner_notified);
        assert!(receipt.customer_notified);
        assert_eq!(mailer.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_require_all_fails_on_refusal() {
        let mailer = Arc::new(FakeMailer {
            refuse: Some(Email::parse("buyer@example.com").unwrap()),
            ..FakeMailer::default()
        });
        let result = service(mailer.clone(), DeliveryPolicy::RequireAll)
            .submit(&order())
            .await;

        assert!(matches!(result, Err(OrderError::NotDelivered)));
        // Both dispatches are still attempted.
        assert_eq!(mailer.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_customer_email_sends_nothing() {
        let mailer = Arc::new(FakeMailer::default());
        let mut order = order();
        order.email = "not-an-email".to_string();

        let result = service(mailer.clone(), DeliveryPolicy::BestEffort)
            .submit(&order)
            .await;

        assert!(matches!(result, Err(OrderError::InvalidEmail(_))));
        assert!(mailer.sent.lock().unwrap().is_empty());
    }
}
