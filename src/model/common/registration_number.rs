use std::fmt::{Display, Formatter};
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of digits in a civil registration number.
pub const REGISTRATION_NUMBER_LENGTH: usize = 12;

/// A civil registration number: exactly twelve ASCII digits.
///
/// Deserialization does not validate. Values from clients go through
/// [`RegistrationNumber::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationNumber(String);

impl RegistrationNumber {
    /// Validate a registration number submitted by a client.
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.len() == REGISTRATION_NUMBER_LENGTH && raw.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(raw.to_string()))
        } else {
            Err(Error::Validation(format!(
                "Registration number must be exactly {REGISTRATION_NUMBER_LENGTH} digits"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for RegistrationNumber {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for RegistrationNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registration number as a client sent it: clients send either a JSON
/// string or a JSON integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRegistrationNumber {
    Text(String),
    Number(u64),
}

impl RawRegistrationNumber {
    /// The submitted value as text, exactly as sent.
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Number(number) => number.to_string(),
        }
    }

    /// An empty or all-whitespace string, which counts as not sent at all.
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Text(text) if text.trim().is_empty())
    }

    pub fn validate(&self) -> Result<RegistrationNumber> {
        RegistrationNumber::parse(&self.to_text())
    }
}

impl From<&RegistrationNumber> for RawRegistrationNumber {
    fn from(number: &RegistrationNumber) -> Self {
        Self::Text(number.0.clone())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_exactly_twelve_digits() {
        assert_eq!(
            RegistrationNumber::parse("123456789012").unwrap(),
            RegistrationNumber::example()
        );
        assert!(RegistrationNumber::parse("000000000000").is_ok());
    }

    #[test]
    fn rejects_anything_else() {
        for bad in [
            "",
            "12345678901",
            "1234567890123",
            "12345678901a",
            " 23456789012",
            "1234-5678-90",
            "١٢٣٤٥٦٧٨٩٠١٢",
            "+23456789012",
        ] {
            match RegistrationNumber::parse(bad) {
                Err(Error::Validation(_)) => {}
                other => panic!("{bad:?} was not rejected: {other:?}"),
            }
        }
    }

    #[test]
    fn raw_numbers_accept_strings_and_integers() {
        let text: RawRegistrationNumber =
            rocket::serde::json::serde_json::from_str("\"123456789012\"").unwrap();
        let number: RawRegistrationNumber =
            rocket::serde::json::serde_json::from_str("123456789012").unwrap();
        assert_eq!(text.validate().unwrap(), RegistrationNumber::example());
        assert_eq!(number.validate().unwrap(), RegistrationNumber::example());

        let short: RawRegistrationNumber =
            rocket::serde::json::serde_json::from_str("12345").unwrap();
        assert!(short.validate().is_err());
    }

    #[test]
    fn raw_numbers_are_not_trimmed() {
        for padded in [" 123456789012", "123456789012\n", "\t123456789012  "] {
            let raw = RawRegistrationNumber::Text(padded.to_string());
            assert_eq!(raw.to_text(), padded);
            assert!(!raw.is_blank());
            assert!(matches!(raw.validate(), Err(Error::Validation(_))));
        }
    }

    #[test]
    fn blank_raw_numbers() {
        for blank in ["", "   ", "\t"] {
            assert!(RawRegistrationNumber::Text(blank.to_string()).is_blank());
        }
        assert!(!RawRegistrationNumber::Number(0).is_blank());
        assert!(!RawRegistrationNumber::from(&RegistrationNumber::example()).is_blank());
    }
}
