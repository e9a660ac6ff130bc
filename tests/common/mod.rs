//! Add and patch sequences shared by the backend test suites.

use paystore::domain::RequestContext;
use paystore::domain::entities::{
    Account, AccountPatch, Currency, Profile, Transaction, TransactionPatch, TransactionSpec,
    TransactionStatus, TransactionType,
};
use paystore::domain::value_objects::Reference;
use paystore::infrastructure::Repositories;

fn currency_code(slot: &Option<Reference<Currency>>) -> Option<String> {
    slot.as_ref().map(|reference| match reference.as_loaded() {
        Some(currency) => currency.char_code.clone().unwrap_or_default(),
        None => "unresolved".to_string(),
    })
}

/// Account as seen by a caller, without store-assigned ids.
#[derive(Debug, PartialEq)]
pub struct AccountView {
    pub is_enabled: Option<bool>,
    pub is_test: Option<bool>,
    pub currency: Option<String>,
}

impl AccountView {
    fn of(account: &Account) -> Self {
        Self {
            is_enabled: account.is_enabled,
            is_test: account.is_test,
            currency: currency_code(&account.currency),
        }
    }
}

/// Transaction as seen by a caller, without store-assigned ids.
#[derive(Debug, PartialEq)]
pub struct TransactionView {
    pub kind: Option<TransactionType>,
    pub status: Option<TransactionStatus>,
    pub amount: Option<i64>,
    pub amount_converted: Option<i64>,
    pub currency: Option<String>,
    pub currency_converted: Option<String>,
    pub order_id: Option<String>,
    pub has_reference: bool,
}

impl TransactionView {
    fn of(tx: &Transaction) -> Self {
        Self {
            kind: tx.kind,
            status: tx.status,
            amount: tx.amount,
            amount_converted: tx.amount_converted,
            currency: currency_code(&tx.currency),
            currency_converted: currency_code(&tx.currency_converted),
            order_id: tx.order_id.clone(),
            has_reference: tx.reference.is_some(),
        }
    }
}

/// Results of [`run_merge_sequence`].
#[derive(Debug, PartialEq)]
pub struct MergeOutcome {
    pub account_after_id_less_patch: AccountView,
    pub account_after_currency_change: AccountView,
    pub transaction_after_amount_patch: TransactionView,
    pub transaction_after_id_less_patch: TransactionView,
}

/// Adds an account and a transaction, then patches both, including with
/// id-less references.
pub async fn run_merge_sequence(repos: &Repositories, profile_key: &str) -> MergeOutcome {
    let ctx = RequestContext::new();
    let usd = repos
        .currencies
        .add(&ctx, Currency::new(840, "US Dollar", "USD", 2))
        .await
        .unwrap();
    let eur = repos
        .currencies
        .add(&ctx, Currency::new(978, "Euro", "EUR", 2))
        .await
        .unwrap();

    let account = repos
        .accounts
        .add(
            &ctx,
            Account {
                is_enabled: Some(true),
                currency: Some(Reference::shallow(usd.id.unwrap())),
                ..Account::default()
            },
        )
        .await
        .unwrap();
    let account_id = account.id.unwrap();
    let after_id_less = repos
        .accounts
        .update(
            &ctx,
            account_id,
            AccountPatch {
                is_test: Some(true),
                currency: Some(Reference::loaded(Currency::default())),
                ..AccountPatch::default()
            },
        )
        .await
        .unwrap();
    let after_change = repos
        .accounts
        .update(
            &ctx,
            account_id,
            AccountPatch {
                currency: Some(Reference::loaded(eur)),
                ..AccountPatch::default()
            },
        )
        .await
        .unwrap();

    let profile = repos
        .profiles
        .add(
            &ctx,
            Profile::new(profile_key, Some(Reference::shallow(usd.id.unwrap()))),
        )
        .await
        .unwrap();
    let tx = repos
        .transactions
        .add(
            &ctx,
            Transaction::new(
                TransactionType::Authorize,
                Reference::loaded(profile),
                Reference::loaded(after_change.clone()),
                100,
            ),
        )
        .await
        .unwrap();
    let tx_id = tx.id.unwrap();
    let after_amount = repos
        .transactions
        .update(
            &ctx,
            tx_id,
            TransactionPatch {
                status: Some(TransactionStatus::Success),
                amount: Some(250),
                amount_converted: Some(270),
                order_id: Some("o-1".to_string()),
                ..TransactionPatch::default()
            },
        )
        .await
        .unwrap();
    let after_id_less_tx = repos
        .transactions
        .update(
            &ctx,
            tx_id,
            TransactionPatch {
                kind: Some(TransactionType::Rebill),
                reference: Some(Reference::loaded(Transaction::default())),
                account: Some(Reference::loaded(Account::default())),
                ..TransactionPatch::default()
            },
        )
        .await
        .unwrap();

    MergeOutcome {
        account_after_id_less_patch: AccountView::of(&after_id_less),
        account_after_currency_change: AccountView::of(&after_change),
        transaction_after_amount_patch: TransactionView::of(&after_amount),
        transaction_after_id_less_patch: TransactionView::of(&after_id_less_tx),
    }
}

/// Stores a transaction, points it at itself and reads it back.
pub async fn self_referencing_transaction(repos: &Repositories) -> (i64, Transaction) {
    let ctx = RequestContext::new();
    let tx = repos
        .transactions
        .add(
            &ctx,
            Transaction {
                kind: Some(TransactionType::Authorize),
                amount: Some(1),
                ..Transaction::default()
            },
        )
        .await
        .unwrap();
    let id = tx.id.unwrap();
    let updated = repos
        .transactions
        .update(
            &ctx,
            id,
            TransactionPatch {
                reference: Some(Reference::shallow(id)),
                ..TransactionPatch::default()
            },
        )
        .await
        .unwrap();
    assert!(updated.reference.as_ref().unwrap().is_loaded());

    let found = repos
        .transactions
        .query(&ctx, &TransactionSpec::ById(id))
        .await
        .unwrap();
    (id, found.items.into_iter().next().unwrap())
}
