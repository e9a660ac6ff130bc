//! # Transaction Entity
//!
//! A payment operation and its lifecycle.
//!
//! # Lifecycle
//!
//! ```text
//! New ──► Wait3ds / WaitMethodUrl ──► Success | Declined
//!  └───────────────────────────────────┘
//! ```
//!
//! `Success` and `Declined` are final. Operations that act on an earlier
//! transaction (confirmation, reversal, refund, rebill) point at it through
//! [`Transaction::reference`].

use crate::domain::entities::{Account, Currency, Entity, Instrument, Profile};
use crate::domain::specification::{Page, Specification, id_in};
use crate::domain::value_objects::{Identified, Reference, detach, merge_reference, reference_id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Free-form data attached by the caller.
pub type AdditionalData = serde_json::Map<String, serde_json::Value>;

/// Error returned when parsing an unknown transaction type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown transaction type: {0}")]
pub struct InvalidTransactionTypeError(pub String);

/// Error returned when parsing an unknown transaction status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown transaction status: {0}")]
pub struct InvalidTransactionStatusError(pub String);

/// Kind of payment operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Single-step authorization and capture.
    Authorize,
    /// Authorization hold, captured later.
    PreAuthorize,
    /// Capture of a pre-authorization.
    ConfirmAuth,
    /// Release of a hold.
    Reversal,
    /// Return of captured funds.
    Refund,
    /// Repeat charge without cardholder interaction.
    Rebill,
}

impl TransactionType {
    /// Wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Authorize => "authorize",
            Self::PreAuthorize => "preauthorize",
            Self::ConfirmAuth => "confirmauth",
            Self::Reversal => "reversal",
            Self::Refund => "refund",
            Self::Rebill => "rebill",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = InvalidTransactionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authorize" => Ok(Self::Authorize),
            "preauthorize" => Ok(Self::PreAuthorize),
            "confirmauth" => Ok(Self::ConfirmAuth),
            "reversal" => Ok(Self::Reversal),
            "refund" => Ok(Self::Refund),
            "rebill" => Ok(Self::Rebill),
            _ => Err(InvalidTransactionTypeError(s.to_string())),
        }
    }
}

/// Transaction lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Created, not yet processed.
    New,
    /// Approved.
    Success,
    /// Declined by the processor or the issuer.
    Declined,
    /// Waiting for the 3-D Secure challenge result.
    Wait3ds,
    /// Waiting for the 3-D Secure method URL round trip.
    WaitMethodUrl,
}

impl TransactionStatus {
    /// Wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Success => "success",
            Self::Declined => "declined",
            Self::Wait3ds => "wait3ds",
            Self::WaitMethodUrl => "waitmethodurl",
        }
    }

    /// Returns true for statuses that never change again.
    #[inline]
    #[must_use]
    pub const fn is_final(&self) -> bool {
        matches!(self, Self::Success | Self::Declined)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = InvalidTransactionStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "success" => Ok(Self::Success),
            "declined" => Ok(Self::Declined),
            "wait3ds" => Ok(Self::Wait3ds),
            "waitmethodurl" => Ok(Self::WaitMethodUrl),
            _ => Err(InvalidTransactionStatusError(s.to_string())),
        }
    }
}

/// 3-D Secure 1.0 challenge artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ThreeDSecure10 {
    /// ACS endpoint.
    pub acs_url: Option<String>,
    /// Payer authentication request.
    pub pa_req: Option<String>,
}

/// 3-D Secure 2.x challenge artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ThreeDSecure20 {
    /// ACS endpoint.
    pub acs_url: Option<String>,
    /// Challenge request.
    pub creq: Option<String>,
}

/// 3-D Secure method URL step.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ThreeDSMethodUrl {
    /// Method endpoint.
    pub method_url: Option<String>,
    /// Data posted to the method endpoint.
    pub three_ds_method_data: Option<String>,
}

/// Payment operation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Transaction {
    /// Store-assigned identifier.
    pub id: Option<i64>,
    /// Creation instant, assigned by the store.
    pub created: Option<DateTime<Utc>>,
    /// Operation kind.
    #[serde(rename = "type")]
    pub kind: Option<TransactionType>,
    /// Lifecycle status.
    pub status: Option<TransactionStatus>,
    /// Merchant profile.
    pub profile: Option<Reference<Profile>>,
    /// Acquiring account.
    pub account: Option<Reference<Account>>,
    /// Payment instrument kind.
    pub instrument: Option<Reference<Instrument>>,
    /// Id of the instrument record (e.g. the card) in its own store.
    pub instrument_record: Option<i64>,
    /// Amount in minor units of `currency`.
    pub amount: Option<i64>,
    /// Profile currency.
    pub currency: Option<Reference<Currency>>,
    /// Amount in minor units of `currency_converted`.
    pub amount_converted: Option<i64>,
    /// Account currency.
    pub currency_converted: Option<Reference<Currency>>,
    /// Issuer authorization code.
    pub auth_code: Option<String>,
    /// Retrieval reference number.
    pub rrn: Option<String>,
    /// Processor response code.
    pub response_code: Option<String>,
    /// Decline reason.
    pub error_message: Option<String>,
    /// Processor-side identifier.
    pub remote_id: Option<String>,
    /// Merchant order identifier.
    pub order_id: Option<String>,
    /// Earlier transaction this one acts on.
    pub reference: Option<Reference<Transaction>>,
    /// 3-D Secure 1.0 artifacts.
    pub three_ds10: Option<ThreeDSecure10>,
    /// 3-D Secure 2.x artifacts.
    pub three_ds20: Option<ThreeDSecure20>,
    /// 3-D Secure method URL step.
    pub three_ds_method_url: Option<ThreeDSMethodUrl>,
    /// Caller data.
    pub additional_data: Option<AdditionalData>,
    /// Customer identifier.
    pub customer: Option<String>,
}

impl Transaction {
    /// Creates a `New` transaction of `kind`.
    ///
    /// The amount currency is taken from the profile and the converted
    /// currency from the account, when those are loaded. No conversion is
    /// performed: the converted amount equals the amount.
    #[must_use]
    pub fn new(
        kind: TransactionType,
        profile: Reference<Profile>,
        account: Reference<Account>,
        amount: i64,
    ) -> Self {
        let currency = profile.as_loaded().and_then(|p| p.currency.clone());
        let currency_converted = account.as_loaded().and_then(|a| a.currency.clone());
        Self {
            kind: Some(kind),
            status: Some(TransactionStatus::New),
            profile: Some(profile),
            account: Some(account),
            amount: Some(amount),
            currency,
            amount_converted: Some(amount),
            currency_converted,
            ..Self::default()
        }
    }

    /// Sets the instrument kind and the id of the instrument record.
    #[must_use]
    pub fn with_instrument(mut self, instrument: Reference<Instrument>, record: i64) -> Self {
        self.instrument = Some(instrument);
        self.instrument_record = Some(record);
        self
    }

    /// Sets the merchant order id.
    #[must_use]
    pub fn with_order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    /// Sets the customer identifier.
    #[must_use]
    pub fn with_customer(mut self, customer: impl Into<String>) -> Self {
        self.customer = Some(customer.into());
        self
    }

    /// Points at the transaction this one acts on.
    #[must_use]
    pub fn with_reference(mut self, reference: Reference<Transaction>) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Moves to `New`.
    pub fn mark_new(&mut self) {
        self.status = Some(TransactionStatus::New);
    }

    /// Moves to `Success`.
    pub fn mark_success(&mut self) {
        self.status = Some(TransactionStatus::Success);
    }

    /// Moves to `Declined`, recording the reason.
    pub fn mark_declined(&mut self, error_message: Option<String>) {
        self.status = Some(TransactionStatus::Declined);
        self.error_message = error_message;
    }

    /// Moves to `Wait3ds`.
    pub fn wait_3ds(&mut self) {
        self.status = Some(TransactionStatus::Wait3ds);
    }

    /// Moves to `WaitMethodUrl`.
    pub fn wait_method_url(&mut self) {
        self.status = Some(TransactionStatus::WaitMethodUrl);
    }

    /// Returns true if approved.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == Some(TransactionStatus::Success)
    }

    /// Returns true while waiting for the 3-D Secure challenge.
    #[must_use]
    pub fn is_3ds_waiting(&self) -> bool {
        self.status == Some(TransactionStatus::Wait3ds)
    }

    /// Returns true while waiting for the method URL step.
    #[must_use]
    pub fn is_method_url_waiting(&self) -> bool {
        self.status == Some(TransactionStatus::WaitMethodUrl)
    }

    /// Returns true once the status can no longer change.
    #[must_use]
    pub fn in_final_state(&self) -> bool {
        self.status.is_some_and(|status| status.is_final())
    }

    /// Returns true for single-step authorizations.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        self.kind == Some(TransactionType::Authorize)
    }

    /// Returns true for pre-authorizations.
    #[must_use]
    pub fn is_preauth(&self) -> bool {
        self.kind == Some(TransactionType::PreAuthorize)
    }
}

/// Partial update of a [`Transaction`].
///
/// Every stored field except the id and the creation instant can be
/// patched. References without an id are ignored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransactionPatch {
    /// New operation kind.
    #[serde(rename = "type")]
    pub kind: Option<TransactionType>,
    /// New status.
    pub status: Option<TransactionStatus>,
    /// New profile.
    pub profile: Option<Reference<Profile>>,
    /// New account.
    pub account: Option<Reference<Account>>,
    /// New instrument kind.
    pub instrument: Option<Reference<Instrument>>,
    /// New instrument record id.
    pub instrument_record: Option<i64>,
    /// New amount.
    pub amount: Option<i64>,
    /// New amount currency.
    pub currency: Option<Reference<Currency>>,
    /// New converted amount.
    pub amount_converted: Option<i64>,
    /// New converted amount currency.
    pub currency_converted: Option<Reference<Currency>>,
    /// New auth code.
    pub auth_code: Option<String>,
    /// New RRN.
    pub rrn: Option<String>,
    /// New response code.
    pub response_code: Option<String>,
    /// New decline reason.
    pub error_message: Option<String>,
    /// New processor-side id.
    pub remote_id: Option<String>,
    /// New merchant order id.
    pub order_id: Option<String>,
    /// New earlier transaction.
    pub reference: Option<Reference<Transaction>>,
    /// New 3-D Secure 1.0 artifacts.
    pub three_ds10: Option<ThreeDSecure10>,
    /// New 3-D Secure 2.x artifacts.
    pub three_ds20: Option<ThreeDSecure20>,
    /// New method URL step.
    pub three_ds_method_url: Option<ThreeDSMethodUrl>,
    /// New caller data.
    pub additional_data: Option<AdditionalData>,
    /// New customer identifier.
    pub customer: Option<String>,
}

impl TransactionPatch {
    /// Patch carrying the status (and decline reason) of `transaction`.
    #[must_use]
    pub fn status_of(transaction: &Transaction) -> Self {
        Self {
            status: transaction.status,
            error_message: transaction.error_message.clone(),
            ..Self::default()
        }
    }
}

/// Transaction query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionSpec {
    /// Every transaction.
    All,
    /// Transaction with this id.
    ById(i64),
    /// Transactions with any of these ids.
    ByIds(Vec<i64>),
    /// Follow-up transactions of `reference_id` in `status`.
    ByReferenceAndStatus {
        /// Referenced transaction id.
        reference_id: i64,
        /// Required status.
        status: TransactionStatus,
    },
    /// Limit/offset window.
    Page(Page),
}

impl Specification<Transaction> for TransactionSpec {
    fn is_satisfied_by(&self, tx: &Transaction, position: usize) -> bool {
        match self {
            Self::All => true,
            Self::ById(id) => tx.id == Some(*id),
            Self::ByIds(ids) => id_in(tx.id, ids),
            Self::ByReferenceAndStatus {
                reference_id: id,
                status,
            } => reference_id(&tx.reference) == Some(*id) && tx.status == Some(*status),
            Self::Page(page) => page.contains(position),
        }
    }
}

impl Identified for Transaction {
    fn id(&self) -> Option<i64> {
        self.id
    }
}

impl Entity for Transaction {
    const NAME: &'static str = "transaction";

    type Patch = TransactionPatch;
    type Spec = TransactionSpec;

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn apply_patch(self, patch: TransactionPatch) -> Self {
        Self {
            id: self.id,
            created: self.created,
            kind: patch.kind.or(self.kind),
            status: patch.status.or(self.status),
            profile: merge_reference(patch.profile, self.profile),
            account: merge_reference(patch.account, self.account),
            instrument: merge_reference(patch.instrument, self.instrument),
            instrument_record: patch.instrument_record.or(self.instrument_record),
            amount: patch.amount.or(self.amount),
            currency: merge_reference(patch.currency, self.currency),
            amount_converted: patch.amount_converted.or(self.amount_converted),
            currency_converted: merge_reference(patch.currency_converted, self.currency_converted),
            auth_code: patch.auth_code.or(self.auth_code),
            rrn: patch.rrn.or(self.rrn),
            response_code: patch.response_code.or(self.response_code),
            error_message: patch.error_message.or(self.error_message),
            remote_id: patch.remote_id.or(self.remote_id),
            order_id: patch.order_id.or(self.order_id),
            reference: merge_reference(patch.reference, self.reference),
            three_ds10: patch.three_ds10.or(self.three_ds10),
            three_ds20: patch.three_ds20.or(self.three_ds20),
            three_ds_method_url: patch.three_ds_method_url.or(self.three_ds_method_url),
            additional_data: patch.additional_data.or(self.additional_data),
            customer: patch.customer.or(self.customer),
        }
    }

    fn by_ids(ids: Vec<i64>) -> TransactionSpec {
        TransactionSpec::ByIds(ids)
    }

    fn detach_references(&mut self) {
        detach(&mut self.profile);
        detach(&mut self.account);
        detach(&mut self.instrument);
        detach(&mut self.currency);
        detach(&mut self.currency_converted);
        detach(&mut self.reference);
    }
}

/// Count and amount sum of one transaction type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Turnover {
    /// Number of transactions.
    pub count: u64,
    /// Sum of amounts, in minor units.
    pub sum: i64,
}

impl Turnover {
    /// Groups `transactions` by type. Untyped transactions are skipped and
    /// missing amounts count as zero.
    pub fn tally<'a>(
        transactions: impl IntoIterator<Item = &'a Transaction>,
    ) -> BTreeMap<TransactionType, Turnover> {
        let mut result = BTreeMap::<TransactionType, Turnover>::new();
        for tx in transactions {
            let Some(kind) = tx.kind else { continue };
            let entry = result.entry(kind).or_default();
            entry.count = entry.count.saturating_add(1);
            entry.sum = entry.sum.saturating_add(tx.amount.unwrap_or(0));
        }
        result
    }
}
