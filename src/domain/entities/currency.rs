//! # Currency Entity
//!
//! ISO 4217 currency reference data.
//!
//! # Examples
//!
//! ```
//! use paystore::domain::entities::{Currency, CurrencyPatch, Entity};
//!
//! let eur = Currency::new(978, "Euro", "EUR", 2);
//! let renamed = eur.clone().apply_patch(CurrencyPatch {
//!     name: Some("euro".to_string()),
//!     ..CurrencyPatch::default()
//! });
//!
//! assert_eq!(renamed.name.as_deref(), Some("euro"));
//! assert_eq!(renamed.char_code, eur.char_code);
//! ```

use crate::domain::entities::Entity;
use crate::domain::specification::{Page, Specification, id_in};
use crate::domain::value_objects::Identified;
use serde::{Deserialize, Serialize};

/// Currency.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Currency {
    /// Store-assigned identifier.
    pub id: Option<i64>,
    /// ISO 4217 numeric code, e.g. 978.
    pub numeric_code: Option<i32>,
    /// Display name.
    pub name: Option<String>,
    /// ISO 4217 alphabetic code, e.g. `EUR`.
    pub char_code: Option<String>,
    /// Number of minor-unit digits.
    pub exponent: Option<i32>,
}

impl Currency {
    /// Creates an unsaved currency with all fields set.
    #[must_use]
    pub fn new(
        numeric_code: i32,
        name: impl Into<String>,
        char_code: impl Into<String>,
        exponent: i32,
    ) -> Self {
        Self {
            id: None,
            numeric_code: Some(numeric_code),
            name: Some(name.into()),
            char_code: Some(char_code.into()),
            exponent: Some(exponent),
        }
    }
}

/// Partial update of a [`Currency`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CurrencyPatch {
    /// New numeric code.
    pub numeric_code: Option<i32>,
    /// New name.
    pub name: Option<String>,
    /// New alphabetic code.
    pub char_code: Option<String>,
    /// New exponent.
    pub exponent: Option<i32>,
}

/// Currency query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrencySpec {
    /// Every currency.
    All,
    /// Currency with this id.
    ById(i64),
    /// Currencies with any of these ids.
    ByIds(Vec<i64>),
    /// Currency with this ISO numeric code.
    ByNumericCode(i32),
    /// Limit/offset window.
    Page(Page),
}

impl Specification<Currency> for CurrencySpec {
    fn is_satisfied_by(&self, currency: &Currency, position: usize) -> bool {
        match self {
            Self::All => true,
            Self::ById(id) => currency.id == Some(*id),
            Self::ByIds(ids) => id_in(currency.id, ids),
            Self::ByNumericCode(code) => currency.numeric_code == Some(*code),
            Self::Page(page) => page.contains(position),
        }
    }
}

impl Identified for Currency {
    fn id(&self) -> Option<i64> {
        self.id
    }
}

impl Entity for Currency {
    const NAME: &'static str = "currency";

    type Patch = CurrencyPatch;
    type Spec = CurrencySpec;

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn apply_patch(self, patch: CurrencyPatch) -> Self {
        Self {
            id: self.id,
            numeric_code: patch.numeric_code.or(self.numeric_code),
            name: patch.name.or(self.name),
            char_code: patch.char_code.or(self.char_code),
            exponent: patch.exponent.or(self.exponent),
        }
    }

    fn by_ids(ids: Vec<i64>) -> CurrencySpec {
        CurrencySpec::ByIds(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eur() -> Currency {
        Currency {
            id: Some(1),
            ..Currency::new(978, "Euro", "EUR", 2)
        }
    }

    #[test]
    fn empty_patch_is_identity() {
        assert_eq!(eur().apply_patch(CurrencyPatch::default()), eur());
    }

    #[test]
    fn patch_overrides_only_present_fields() {
        let patched = eur().apply_patch(CurrencyPatch {
            exponent: Some(3),
            ..CurrencyPatch::default()
        });
        assert_eq!(patched.exponent, Some(3));
        assert_eq!(patched.numeric_code, Some(978));
        assert_eq!(patched.id, Some(1));
    }

    #[test]
    fn numeric_code_spec() {
        assert!(CurrencySpec::ByNumericCode(978).is_satisfied_by(&eur(), 0));
        assert!(!CurrencySpec::ByNumericCode(840).is_satisfied_by(&eur(), 0));
        assert!(CurrencySpec::ByIds(vec![1, 2]).is_satisfied_by(&eur(), 9));
    }
}
