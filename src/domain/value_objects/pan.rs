//! # Primary Account Number
//!
//! Card numbers never leave this type unmasked except through
//! [`Pan::expose`], which exists for the vault wire format and for matching.
//! `Display` and `Debug` both render the masked form.
//!
//! # Examples
//!
//! ```
//! use paystore::domain::value_objects::{CardBrand, Pan};
//!
//! let pan = Pan::new("4111111111111111");
//! assert_eq!(pan.to_string(), "************1111");
//! assert_eq!(pan.brand(), CardBrand::Visa);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Mask character used for hidden PAN digits.
pub const MASK_CHAR: char = '*';

/// Number of trailing characters left visible.
pub const VISIBLE_SUFFIX: usize = 4;

/// Masks all but the last four characters of `value`.
///
/// Values shorter than four characters are returned unchanged.
///
/// ```
/// use paystore::domain::value_objects::mask_pan;
///
/// assert_eq!(mask_pan("5555444433331111"), "************1111");
/// assert_eq!(mask_pan("123"), "123");
/// ```
#[must_use]
pub fn mask_pan(value: &str) -> String {
    let len = value.chars().count();
    let hidden = len.saturating_sub(VISIBLE_SUFFIX);
    value
        .chars()
        .enumerate()
        .map(|(i, c)| if i < hidden { MASK_CHAR } else { c })
        .collect()
}

/// Primary account number.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pan(String);

impl Pan {
    /// Wraps a card number.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the raw number.
    #[inline]
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Returns the masked number.
    #[must_use]
    pub fn masked(&self) -> String {
        mask_pan(&self.0)
    }

    /// Returns the last four characters.
    #[must_use]
    pub fn last4(&self) -> &str {
        let start = self
            .0
            .char_indices()
            .rev()
            .nth(VISIBLE_SUFFIX - 1)
            .map_or(0, |(i, _)| i);
        self.0.get(start..).unwrap_or_default()
    }

    /// Detects the card scheme from the number prefix.
    #[must_use]
    pub fn brand(&self) -> CardBrand {
        CardBrand::detect(&self.0)
    }
}

impl fmt::Display for Pan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

impl fmt::Debug for Pan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pan({})", self.masked())
    }
}

impl From<&str> for Pan {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Card scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardBrand {
    /// Visa.
    Visa,
    /// Mastercard.
    Mastercard,
    /// American Express.
    Amex,
    /// Discover.
    Discover,
    /// JCB.
    Jcb,
    /// Diners Club.
    Diners,
    /// Mir.
    Mir,
    /// Maestro.
    Maestro,
    /// Anything else.
    Unknown,
}

impl CardBrand {
    /// Detects the scheme from a card number.
    #[must_use]
    pub fn detect(number: &str) -> Self {
        if number.is_empty() || !number.chars().all(|c| c.is_ascii_digit()) {
            return Self::Unknown;
        }
        let prefix = |n: usize| number.get(..n).and_then(|p| p.parse::<u32>().ok());

        match (prefix(1), prefix(2), prefix(3), prefix(4)) {
            (_, _, _, Some(2200..=2204)) => Self::Mir,
            (_, _, _, Some(2221..=2720)) | (_, Some(51..=55), _, _) => Self::Mastercard,
            (_, Some(34 | 37), _, _) => Self::Amex,
            (_, _, _, Some(6011)) | (_, Some(65), _, _) | (_, _, Some(644..=649), _) => {
                Self::Discover
            }
            (_, _, _, Some(3528..=3589)) => Self::Jcb,
            (_, Some(36 | 38), _, _) | (_, _, Some(300..=305), _) => Self::Diners,
            (_, Some(50 | 56..=58), _, _) | (_, _, _, Some(6304 | 6759 | 6761..=6763)) => {
                Self::Maestro
            }
            (Some(4), _, _, _) => Self::Visa,
            _ => Self::Unknown,
        }
    }

    /// Short scheme name.
    #[must_use]
    pub const fn short_name(&self) -> &'static str {
        match self {
            Self::Visa => "visa",
            Self::Mastercard => "mastercard",
            Self::Amex => "amex",
            Self::Discover => "discover",
            Self::Jcb => "jcb",
            Self::Diners => "diners",
            Self::Mir => "mir",
            Self::Maestro => "maestro",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for CardBrand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}
