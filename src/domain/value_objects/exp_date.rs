//! # Card Expiry Date
//!
//! Month/year expiry. The vault speaks `YY/MM`; callers may also supply the
//! ISO-like `YYYY-MM`.
//!
//! ```
//! use paystore::domain::value_objects::ExpDate;
//!
//! let exp: ExpDate = "2027-05".parse().unwrap();
//! assert_eq!(exp.to_string(), "27/05");
//! assert_eq!("27/05".parse::<ExpDate>().unwrap(), exp);
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned for malformed expiry dates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid expiry date: {0}")]
pub struct InvalidExpDateError(pub String);

/// Card expiry month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExpDate {
    year: u16,
    month: u8,
}

impl ExpDate {
    /// Creates an expiry date.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidExpDateError`] if the month is not in `1..=12`.
    pub fn new(year: u16, month: u8) -> Result<Self, InvalidExpDateError> {
        if !(1..=12).contains(&month) {
            return Err(InvalidExpDateError(format!("{year}-{month}")));
        }
        Ok(Self { year, month })
    }

    /// Four-digit year.
    #[inline]
    #[must_use]
    pub const fn year(&self) -> u16 {
        self.year
    }

    /// Month, `1..=12`.
    #[inline]
    #[must_use]
    pub const fn month(&self) -> u8 {
        self.month
    }
}

impl FromStr for ExpDate {
    type Err = InvalidExpDateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidExpDateError(s.to_string());
        let s = s.trim();

        let (year, month) = if let Some((yy, mm)) = s.split_once('/') {
            if yy.len() != 2 || mm.len() != 2 {
                return Err(invalid());
            }
            let yy: u16 = yy.parse().map_err(|_| invalid())?;
            (2000 + yy, mm.parse::<u8>().map_err(|_| invalid())?)
        } else if let Some((yyyy, mm)) = s.split_once('-') {
            if yyyy.len() != 4 || mm.len() != 2 {
                return Err(invalid());
            }
            (
                yyyy.parse::<u16>().map_err(|_| invalid())?,
                mm.parse::<u8>().map_err(|_| invalid())?,
            )
        } else {
            return Err(invalid());
        };

        Self::new(year, month).map_err(|_| invalid())
    }
}

impl fmt::Display for ExpDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}", self.year % 100, self.month)
    }
}

impl Serialize for ExpDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ExpDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_month() {
        assert!("27/13".parse::<ExpDate>().is_err());
        assert!("2027-00".parse::<ExpDate>().is_err());
        assert!(ExpDate::new(2027, 0).is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!("".parse::<ExpDate>().is_err());
        assert!("0527".parse::<ExpDate>().is_err());
        assert!("7/5".parse::<ExpDate>().is_err());
    }

    #[test]
    fn json_uses_vault_format() {
        let exp = ExpDate::new(2031, 1).unwrap();
        assert_eq!(serde_json::to_string(&exp).unwrap(), r#""31/01""#);
        let back: ExpDate = serde_json::from_str(r#""31/01""#).unwrap();
        assert_eq!(back, exp);
        assert_eq!(back.year(), 2031);
        assert_eq!(back.month(), 1);
    }
}
