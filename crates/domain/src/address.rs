//! Shipping destination.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shipping address field was left blank.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Shipping address is missing {field}")]
pub struct AddressError {
    pub field: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub recipient: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingAddress {
    pub fn new(
        recipient: impl Into<String>,
        street: impl Into<String>,
        city: impl Into<String>,
        postal_code: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            street: street.into(),
            city: city.into(),
            postal_code: postal_code.into(),
            country: country.into(),
        }
    }

    /// Checks that every field carries a value.
    pub fn validate(&self) -> Result<(), AddressError> {
        let fields = [
            ("recipient", &self.recipient),
            ("street", &self.street),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ];
        for (field, value) in fields {
            if value.trim().is_empty() {
                return Err(AddressError { field });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_address_is_valid() {
        let address = ShippingAddress::new("Jo", "1 Main St", "Springfield", "12345", "US");
        assert!(address.validate().is_ok());
    }

    #[test]
    fn blank_field_is_reported() {
        let address = ShippingAddress::new("Jo", "1 Main St", "  ", "12345", "US");
        assert_eq!(address.validate(), Err(AddressError { field: "city" }));
    }
}
