//! Checkout order types.
//!
//! Orders are never stored. An [`Order`] only lives long enough to be
//! rendered into the owner alert and the customer confirmation.

use serde::Deserialize;

use mring_core::Email;

/// Comment used when the buyer leaves the order details blank.
pub const DEFAULT_ORDER_DETAILS: &str = "Нет дополнительных комментариев";

/// Checkout form as posted by the storefront.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    #[serde(default)]
    pub product_name: Option<String>,
    /// Display string, e.g. "3500₽".
    #[serde(default)]
    pub product_price: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub order_details: Option<String>,
}

/// A required checkout field that was absent or blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    ProductName,
    ProductPrice,
    Name,
    Email,
    Phone,
    Address,
}

impl MissingField {
    /// Field name as it appears in the JSON body.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProductName => "productName",
            Self::ProductPrice => "productPrice",
            Self::Name => "name",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Address => "address",
        }
    }
}

/// A validated order with every required field present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub product_name: String,
    pub product_price: String,
    pub name: String,
    /// Raw address as typed; see [`Order::customer_email`].
    pub email: String,
    pub phone: String,
    pub address: String,
    pub details: String,
}

impl Order {
    /// Parsed customer address, if it is deliverable at all.
    ///
    /// # Errors
    ///
    /// Returns the parse error for addresses without a usable shape.
    pub fn customer_email(&self) -> Result<Email, mring_core::EmailError> {
        Email::normalize(&self.email)
    }
}

impl TryFrom<OrderRequest> for Order {
    type Error = MissingField;

    fn try_from(req: OrderRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            product_name: required(req.product_name, MissingField::ProductName)?,
            product_price: required(req.product_price, MissingField::ProductPrice)?,
            name: required(req.name, MissingField::Name)?,
            email: required(req.email, MissingField::Email)?,
            phone: required(req.phone, MissingField::Phone)?,
            address: required(req.address, MissingField::Address)?,
            details: req
                .order_details
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| DEFAULT_ORDER_DETAILS.to_string()),
        })
    }
}

fn required(value: Option<String>, field: MissingField) -> Result<String, MissingField> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(field)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn full_request() -> OrderRequest {
        OrderRequest {
            product_name: Some("Baccarat Rouge (10 мл)".to_string()),
            product_price: Some("3500₽".to_string()),
            name: Some("Анна".to_string()),
            email: Some("buyer@example.com".to_string()),
            phone: Some("+7 900 000-00-00".to_string()),
            address: Some("Москва, ул. Пушкина, 1".to_string()),
            order_details: None,
        }
    }

    #[test]
    fn test_deserialize_camel_case() {
        let req: OrderRequest = serde_json::from_str(
            r#"{"productName":"Tee","productPrice":"2100₽","name":"A","email":"a@b.c",
                "phone":"1","address":"Street","orderDetails":"size M"}"#,
        )
        .unwrap();
        let order = Order::try_from(req).unwrap();
        assert_eq!(order.product_name, "Tee");
        assert_eq!(order.details, "size M");
    }

    #[test]
    fn test_details_default_when_absent_or_blank() {
        let order = Order::try_from(full_request()).unwrap();
        assert_eq!(order.details, DEFAULT_ORDER_DETAILS);

        let mut req = full_request();
        req.order_details = Some("   ".to_string());
        assert_eq!(Order::try_from(req).unwrap().details, DEFAULT_ORDER_DETAILS);
    }

    #[test]
    fn test_each_required_field_is_checked() {
        let cases: [(fn(&mut OrderRequest), MissingField); 6] = [
            (|r| r.product_name = None, MissingField::ProductName),
            (|r| r.product_price = Some(String::new()), MissingField::ProductPrice),
            (|r| r.name = Some("  ".to_string()), MissingField::Name),
            (|r| r.email = None, MissingField::Email),
            (|r| r.phone = None, MissingField::Phone),
            (|r| r.address = Some("\t".to_string()), MissingField::Address),
        ];

        for (clear, expected) in cases {
            let mut req = full_request();
            clear(&mut req);
            assert_eq!(Order::try_from(req).unwrap_err(), expected);
        }
    }
}
