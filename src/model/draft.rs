use crate::error::Rejection;
use crate::model::{Amount, Kind};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The transaction input form exactly as typed: nothing here has been validated.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Draft {
    pub value: String,
    /// The category label.
    pub description: String,
    pub detail: String,
    pub kind: Kind,
}

/// A `Draft` that passed validation.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct Valid {
    pub(crate) value: Amount,
    pub(crate) description: String,
    pub(crate) detail: Option<String>,
    pub(crate) kind: Kind,
}

impl Draft {
    pub fn new(
        value: impl Into<String>,
        description: impl Into<String>,
        detail: impl Into<String>,
        kind: Kind,
    ) -> Self {
        Self {
            value: value.into(),
            description: description.into(),
            detail: detail.into(),
            kind,
        }
    }

    /// Checks the draft the way the save button does, in the same order: the value and category
    /// must both be present, then the value must be a non-negative number below the amount limit.
    ///
    /// The category label is stored as typed. Only a blank detail is dropped.
    pub(crate) fn validate(&self) -> Result<Valid, Rejection> {
        if self.value.trim().is_empty() {
            return Err(Rejection::EmptyValue);
        }
        if self.description.trim().is_empty() {
            return Err(Rejection::EmptyCategory);
        }
        let value = Amount::from_str(&self.value)?;
        if value.is_negative() {
            return Err(Rejection::NegativeValue(self.value.trim().to_string()));
        }
        if value.exceeds_limit() {
            return Err(Rejection::TooLarge(self.value.trim().to_string()));
        }
        let detail = if self.detail.trim().is_empty() {
            None
        } else {
            Some(self.detail.clone())
        };
        Ok(Valid {
            value,
            description: self.description.clone(),
            detail,
            kind: self.kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_draft() {
        let valid = Draft::new("10,5", "Mercado", "  ", Kind::Expense)
            .validate()
            .unwrap();
        assert_eq!(valid.value, Amount::from_str("10.5").unwrap());
        assert_eq!(valid.description, "Mercado");
        assert_eq!(valid.detail, None);
    }

    #[test]
    fn test_missing_value() {
        let err = Draft::new("", "Mercado", "", Kind::Expense)
            .validate()
            .unwrap_err();
        assert_eq!(err, Rejection::EmptyValue);
    }

    #[test]
    fn test_blank_category() {
        let err = Draft::new("10", "   ", "", Kind::Expense)
            .validate()
            .unwrap_err();
        assert_eq!(err, Rejection::EmptyCategory);
    }

    #[test]
    fn test_non_numeric_value() {
        let err = Draft::new("abc", "Mercado", "", Kind::Income)
            .validate()
            .unwrap_err();
        assert_eq!(err, Rejection::InvalidValue("abc".to_string()));
    }

    #[test]
    fn test_negative_value() {
        let err = Draft::new("-3", "Mercado", "", Kind::Income)
            .validate()
            .unwrap_err();
        assert_eq!(err, Rejection::NegativeValue("-3".to_string()));
    }

    #[test]
    fn test_value_too_large() {
        let max = "79228162514264337593543950335";
        let err = Draft::new(max, "Pix", "", Kind::Income)
            .validate()
            .unwrap_err();
        assert_eq!(err, Rejection::TooLarge(max.to_string()));
        assert!(Draft::new("999999999999999,99", "Pix", "", Kind::Income)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_zero_is_allowed() {
        assert!(Draft::new("0", "Mercado", "", Kind::Income)
            .validate()
            .is_ok());
    }
}
