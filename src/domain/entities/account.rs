//! # Account Entity
//!
//! Acquiring account: feature flags, the settlement currency and the channel
//! the account is connected through.
//!
//! Currency and channel are [`Reference`]s; repositories return them loaded.

use crate::domain::entities::{Channel, Currency, Entity};
use crate::domain::specification::{Page, Specification, id_in};
use crate::domain::value_objects::{Identified, Reference, detach, merge_reference};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Free-form JSON settings.
pub type Settings = serde_json::Map<String, serde_json::Value>;

/// Acquiring account.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Account {
    /// Store-assigned identifier.
    pub id: Option<i64>,
    /// Account accepts operations.
    pub is_enabled: Option<bool>,
    /// Test (sandbox) account.
    pub is_test: Option<bool>,
    /// Rebills allowed.
    pub rebill_enabled: Option<bool>,
    /// Refunds allowed.
    pub refund_enabled: Option<bool>,
    /// Reversals allowed.
    pub reversal_enabled: Option<bool>,
    /// Partial confirmation of pre-authorizations allowed.
    pub partial_confirm_enabled: Option<bool>,
    /// Partial reversals allowed.
    pub partial_reversal_enabled: Option<bool>,
    /// Partial refunds allowed.
    pub partial_refund_enabled: Option<bool>,
    /// Amount conversion into the account currency allowed.
    pub currency_conversion_enabled: Option<bool>,
    /// Settlement currency.
    pub currency: Option<Reference<Currency>>,
    /// Acquiring channel.
    pub channel: Option<Reference<Channel>>,
    /// Channel-specific settings.
    pub settings: Option<Settings>,
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Account <")?;
        match self.id {
            Some(id) => write!(f, "{id}")?,
            None => write!(f, "new")?,
        }
        match self.channel.as_ref().and_then(Reference::as_loaded) {
            Some(channel) => write!(f, "> ({channel})"),
            None => write!(f, ">"),
        }
    }
}

/// Partial update of an [`Account`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AccountPatch {
    /// New enabled flag.
    pub is_enabled: Option<bool>,
    /// New test flag.
    pub is_test: Option<bool>,
    /// New rebill flag.
    pub rebill_enabled: Option<bool>,
    /// New refund flag.
    pub refund_enabled: Option<bool>,
    /// New reversal flag.
    pub reversal_enabled: Option<bool>,
    /// New partial confirmation flag.
    pub partial_confirm_enabled: Option<bool>,
    /// New partial reversal flag.
    pub partial_reversal_enabled: Option<bool>,
    /// New partial refund flag.
    pub partial_refund_enabled: Option<bool>,
    /// New currency conversion flag.
    pub currency_conversion_enabled: Option<bool>,
    /// New currency.
    pub currency: Option<Reference<Currency>>,
    /// New channel.
    pub channel: Option<Reference<Channel>>,
    /// New settings (replaces the stored object).
    pub settings: Option<Settings>,
}

/// Account query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountSpec {
    /// Every account.
    All,
    /// Account with this id.
    ById(i64),
    /// Accounts with any of these ids.
    ByIds(Vec<i64>),
    /// Limit/offset window.
    Page(Page),
}

impl Specification<Account> for AccountSpec {
    fn is_satisfied_by(&self, account: &Account, position: usize) -> bool {
        match self {
            Self::All => true,
            Self::ById(id) => account.id == Some(*id),
            Self::ByIds(ids) => id_in(account.id, ids),
            Self::Page(page) => page.contains(position),
        }
    }
}

impl Identified for Account {
    fn id(&self) -> Option<i64> {
        self.id
    }
}

impl Entity for Account {
    const NAME: &'static str = "account";

    type Patch = AccountPatch;
    type Spec = AccountSpec;

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn apply_patch(self, patch: AccountPatch) -> Self {
        Self {
            id: self.id,
            is_enabled: patch.is_enabled.or(self.is_enabled),
            is_test: patch.is_test.or(self.is_test),
            rebill_enabled: patch.rebill_enabled.or(self.rebill_enabled),
            refund_enabled: patch.refund_enabled.or(self.refund_enabled),
            reversal_enabled: patch.reversal_enabled.or(self.reversal_enabled),
            partial_confirm_enabled: patch
                .partial_confirm_enabled
                .or(self.partial_confirm_enabled),
            partial_reversal_enabled: patch
                .partial_reversal_enabled
                .or(self.partial_reversal_enabled),
            partial_refund_enabled: patch.partial_refund_enabled.or(self.partial_refund_enabled),
            currency_conversion_enabled: patch
                .currency_conversion_enabled
                .or(self.currency_conversion_enabled),
            currency: merge_reference(patch.currency, self.currency),
            channel: merge_reference(patch.channel, self.channel),
            settings: patch.settings.or(self.settings),
        }
    }

    fn by_ids(ids: Vec<i64>) -> AccountSpec {
        AccountSpec::ByIds(ids)
    }

    fn detach_references(&mut self) {
        detach(&mut self.currency);
        detach(&mut self.channel);
    }
}
