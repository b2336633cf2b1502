//! Rendered transactional messages.
//!
//! Bodies live in `templates/email/`. Text templates are not escaped; the
//! HTML template is.

use askama::Template;

use mring_core::{Email, VerificationCode};

use super::email::{EmailError, OutgoingEmail};
use crate::models::Order;

#[derive(Template)]
#[template(path = "email/verification_code.html")]
struct VerificationCodeHtml<'a> {
    shop: &'a str,
    code: &'a str,
    ttl_minutes: u64,
}

#[derive(Template)]
#[template(path = "email/verification_code.txt")]
struct VerificationCodeText<'a> {
    code: &'a str,
    ttl_minutes: u64,
}

#[derive(Template)]
#[template(path = "email/order_owner.txt")]
struct OwnerOrderAlertText<'a> {
    order: &'a Order,
}

#[derive(Template)]
#[template(path = "email/order_customer.txt")]
struct CustomerConfirmationText<'a> {
    order: &'a Order,
}

/// The one-time code mail.
///
/// # Errors
///
/// Returns `EmailError::Template` if rendering fails.
pub fn verification_code(
    shop: &str,
    to: Email,
    code: &VerificationCode,
    ttl_minutes: u64,
) -> Result<OutgoingEmail, EmailError> {
    let code = code.as_str();
    Ok(OutgoingEmail {
        to,
        subject: format!("🔐 Код подтверждения - {shop}"),
        text: VerificationCodeText { code, ttl_minutes }.render()?,
        html: Some(
            VerificationCodeHtml {
                shop,
                code,
                ttl_minutes,
            }
            .render()?,
        ),
    })
}

/// New-order alert for the shop owner.
///
/// # Errors
///
/// Returns `EmailError::Template` if rendering fails.
pub fn owner_order_alert(
    shop: &str,
    owner: Email,
    order: &Order,
) -> Result<OutgoingEmail, EmailError> {
    Ok(OutgoingEmail {
        to: owner,
        subject: format!("Новый заказ {shop}"),
        text: OwnerOrderAlertText { order }.render()?,
        html: None,
    })
}

/// "We got your order" note for the buyer.
///
/// # Errors
///
/// Returns `EmailError::Template` if rendering fails.
pub fn customer_confirmation(
    shop: &str,
    customer: Email,
    order: &Order,
) -> Result<OutgoingEmail, EmailError> {
    Ok(OutgoingEmail {
        to: customer,
        subject: format!("✅ Ваш заказ в обработке - {shop}"),
        text: CustomerConfirmationText { order }.render()?,
        html: None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn order() -> Order {
        Order {
            product_name: "Худи <oversize>".to_string(),
            product_price: "4200₽".to_string(),
            name: "Анна".to_string(),
            email: "buyer@example.com".to_string(),
            phone: "+79000000000".to_string(),
            address: "Казань".to_string(),
            details: "Размер L".to_string(),
        }
    }

    #[test]
    fn test_verification_code_bodies() {
        let code = VerificationCode::from_number(482_913).unwrap();
        let email =
            verification_code("MR.ING", Email::parse("a@b.c").unwrap(), &code, 10).unwrap();

        assert_eq!(email.subject, "🔐 Код подтверждения - MR.ING");
        assert!(email.text.contains("482913"));
        assert!(email.text.contains("10 минут"));
        let html = email.html.unwrap();
        assert!(html.contains("482913"));
        assert!(html.contains("MR.ING"));
    }

    #[test]
    fn test_owner_alert_lists_buyer() {
        let owner = Email::parse("owner@example.com").unwrap();
        let email = owner_order_alert("MR.ING", owner.clone(), &order()).unwrap();

        assert_eq!(email.to, owner);
        assert_eq!(email.subject, "Новый заказ MR.ING");
        assert!(email.text.starts_with("Новый заказ: Худи <oversize> — 4200₽."));
        assert!(email.text.contains("Покупатель: Анна, +79000000000, buyer@example.com."));
        assert!(email.text.contains("Адрес: Казань."));
        assert!(email.text.contains("Детали: Размер L"));
    }

    #[test]
    fn test_customer_confirmation_omits_contact_details() {
        let customer = Email::parse("buyer@example.com").unwrap();
        let email = customer_confirmation("MR.ING", customer, &order()).unwrap();

        assert!(email.text.contains("Ваш заказ принят: Худи <oversize> — 4200₽."));
        assert!(!email.text.contains("Казань"));
    }
}
