//! Card format and expiry validation.
//!
//! No authorization is performed against a payment network; the order keeps
//! only a truncated reference to the card.

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use thiserror::Error;

/// Reasons card data is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardError {
    /// Not 13 to 19 digits after removing spaces and dashes.
    #[error("Card number must contain 13 to 19 digits")]
    InvalidNumber,

    #[error("Card number checksum mismatch")]
    ChecksumMismatch,

    /// Expiry not in `MM/YY` or `MM/YYYY` form.
    #[error("Card expiry must be MM/YY or MM/YYYY")]
    InvalidExpiry,

    #[error("Card expired at end of {month:02}/{year}")]
    Expired { month: u32, year: i32 },

    #[error("Card security code must be 3 or 4 digits")]
    InvalidCvv,
}

/// Card data submitted at checkout.
#[derive(Clone, Deserialize)]
pub struct PaymentInfo {
    pub card_number: String,
    pub expiry: String,
    pub cvv: String,
}

impl PaymentInfo {
    pub fn new(
        card_number: impl Into<String>,
        expiry: impl Into<String>,
        cvv: impl Into<String>,
    ) -> Self {
        Self {
            card_number: card_number.into(),
            expiry: expiry.into(),
            cvv: cvv.into(),
        }
    }

    /// Validates the card as of `today`.
    pub fn validate(&self, today: NaiveDate) -> Result<(), CardError> {
        validate_card(&self.card_number, &self.expiry, &self.cvv, today)
    }

    /// Returns the truncated reference stored on the order, e.g. `**** **** **** 4242`.
    pub fn reference(&self) -> String {
        let digits = normalized_digits(&self.card_number);
        let last_four: String = digits
            .iter()
            .skip(digits.len().saturating_sub(4))
            .map(|d| char::from(b'0' + d))
            .collect();
        format!("**** **** **** {last_four}")
    }
}

impl std::fmt::Debug for PaymentInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentInfo")
            .field("card", &self.reference())
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

/// Checks card number format and checksum, expiry, and security code.
///
/// The card is valid through the last day of its expiry month.
pub fn validate_card(
    number: &str,
    expiry: &str,
    cvv: &str,
    today: NaiveDate,
) -> Result<(), CardError> {
    let raw_ok = number
        .chars()
        .all(|c| c.is_ascii_digit() || c == ' ' || c == '-');
    let digits = normalized_digits(number);
    if !raw_ok || !(13..=19).contains(&digits.len()) {
        return Err(CardError::InvalidNumber);
    }
    if !luhn_valid(&digits) {
        return Err(CardError::ChecksumMismatch);
    }

    let (month, year) = parse_expiry(expiry)?;
    if (year, month) < (today.year(), today.month()) {
        return Err(CardError::Expired { month, year });
    }

    let cvv = cvv.trim();
    if !(3..=4).contains(&cvv.len()) || !cvv.chars().all(|c| c.is_ascii_digit()) {
        return Err(CardError::InvalidCvv);
    }

    Ok(())
}

fn normalized_digits(number: &str) -> Vec<u8> {
    number
        .bytes()
        .filter(u8::is_ascii_digit)
        .map(|b| b - b'0')
        .collect()
}

fn luhn_valid(digits: &[u8]) -> bool {
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            let d = u32::from(d);
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

fn parse_expiry(expiry: &str) -> Result<(u32, i32), CardError> {
    let (month, year) = expiry
        .trim()
        .split_once('/')
        .ok_or(CardError::InvalidExpiry)?;

    let all_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if month.len() != 2 || !all_digits(month) || !all_digits(year) {
        return Err(CardError::InvalidExpiry);
    }

    let month: u32 = month.parse().map_err(|_| CardError::InvalidExpiry)?;
    if !(1..=12).contains(&month) {
        return Err(CardError::InvalidExpiry);
    }

    let year: i32 = match year.len() {
        2 => 2000 + year.parse::<i32>().map_err(|_| CardError::InvalidExpiry)?,
        4 => year.parse().map_err(|_| CardError::InvalidExpiry)?,
        _ => return Err(CardError::InvalidExpiry),
    };

    Ok((month, year))
}
