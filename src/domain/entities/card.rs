//! # Card Entity
//!
//! A vaulted payment card. The PAN is only ever rendered masked and the
//! access token is generated once, when the card is first stored.

use crate::domain::entities::Entity;
use crate::domain::specification::{Page, Specification, id_in};
use crate::domain::value_objects::{CardBrand, ExpDate, Identified, Pan};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment card.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Card {
    /// Store-assigned identifier.
    pub id: Option<i64>,
    /// Access token, 64 lowercase hex characters.
    pub token: Option<String>,
    /// Card number.
    pub pan: Option<Pan>,
    /// Expiry month.
    pub exp_date: Option<ExpDate>,
    /// Cardholder name.
    pub holder: Option<String>,
}

impl Card {
    /// Creates an unsaved card.
    #[must_use]
    pub fn new(pan: impl Into<Pan>, exp_date: ExpDate, holder: impl Into<String>) -> Self {
        Self {
            id: None,
            token: None,
            pan: Some(pan.into()),
            exp_date: Some(exp_date),
            holder: Some(holder.into()),
        }
    }

    /// Brand detected from the PAN.
    #[must_use]
    pub fn brand(&self) -> CardBrand {
        self.pan.as_ref().map_or(CardBrand::Unknown, Pan::brand)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pan {
            Some(pan) => write!(f, "{pan}")?,
            None => write!(f, "?")?,
        }
        match &self.exp_date {
            Some(exp) => write!(f, " ({exp})")?,
            None => write!(f, " (?)")?,
        }
        write!(
            f,
            " <{}> [{}]",
            self.token.as_deref().unwrap_or("?"),
            self.brand()
        )
    }
}

/// Partial update of a [`Card`]. The token is not updatable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CardPatch {
    /// New card number.
    pub pan: Option<Pan>,
    /// New expiry month.
    pub exp_date: Option<ExpDate>,
    /// New cardholder name.
    pub holder: Option<String>,
}

/// Card query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardSpec {
    /// Every card.
    All,
    /// Card with this id.
    ById(i64),
    /// Cards with any of these ids.
    ByIds(Vec<i64>),
    /// Card with this number.
    ByPan(Pan),
    /// Limit/offset window.
    Page(Page),
}

impl Specification<Card> for CardSpec {
    fn is_satisfied_by(&self, card: &Card, position: usize) -> bool {
        match self {
            Self::All => true,
            Self::ById(id) => card.id == Some(*id),
            Self::ByIds(ids) => id_in(card.id, ids),
            Self::ByPan(pan) => card.pan.as_ref() == Some(pan),
            Self::Page(page) => page.contains(position),
        }
    }
}

impl Identified for Card {
    fn id(&self) -> Option<i64> {
        self.id
    }
}

impl Entity for Card {
    const NAME: &'static str = "card";

    type Patch = CardPatch;
    type Spec = CardSpec;

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn apply_patch(self, patch: CardPatch) -> Self {
        Self {
            id: self.id,
            token: self.token,
            pan: patch.pan.or(self.pan),
            exp_date: patch.exp_date.or(self.exp_date),
            holder: patch.holder.or(self.holder),
        }
    }

    fn by_ids(ids: Vec<i64>) -> CardSpec {
        CardSpec::ByIds(ids)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn display_masks_pan() {
        let mut card = Card::new("4111111111111111", ExpDate::new(2027, 5).unwrap(), "A B");
        card.token = Some("abc".to_string());
        assert_eq!(card.to_string(), "************1111 (27/05) <abc> [visa]");
        assert!(!format!("{card:?}").contains("4111111111111111"));
    }

    #[test]
    fn patch_never_touches_token() {
        let mut card = Card::new("4111111111111111", ExpDate::new(2027, 5).unwrap(), "A B");
        card.token = Some("t".to_string());
        let patched = card.apply_patch(CardPatch {
            holder: Some("C D".to_string()),
            ..CardPatch::default()
        });
        assert_eq!(patched.token.as_deref(), Some("t"));
        assert_eq!(patched.holder.as_deref(), Some("C D"));
        assert_eq!(patched.pan, Some(Pan::new("4111111111111111")));
    }

    #[test]
    fn by_pan_matches_exact_number() {
        let card = Card::new("5555555555554444", ExpDate::new(2030, 1).unwrap(), "X");
        assert!(CardSpec::ByPan(Pan::new("5555555555554444")).is_satisfied_by(&card, 0));
        assert!(!CardSpec::ByPan(Pan::new("5555555555554445")).is_satisfied_by(&card, 0));
    }
}
