//! Runs against a live database only when `DATABASE_URL` is set.

#![allow(clippy::unwrap_used)]

mod common;

use paystore::config::{DatabaseSettings, connect_pool};
use paystore::domain::entities::{
    Account, Currency, CurrencyPatch, CurrencySpec, Profile, ProfileSpec, Transaction,
    TransactionPatch, TransactionSpec, TransactionStatus, TransactionType,
};
use paystore::domain::specification::Page;
use paystore::domain::value_objects::Reference;
use paystore::domain::{Logger, RequestContext};
use paystore::infrastructure::persistence::SessionOptions;
use paystore::infrastructure::{Repositories, SensitiveBackend};
use tokio::sync::OnceCell;
use uuid::Uuid;

const SCHEMA: &str = include_str!("../migrations/0001_init.sql");

static MIGRATED: OnceCell<()> = OnceCell::const_new();

async fn repositories() -> Option<Repositories> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = connect_pool(&DatabaseSettings {
        url,
        max_connections: 4,
    })
    .await
    .unwrap();
    MIGRATED
        .get_or_init(|| async {
            sqlx::raw_sql(SCHEMA).execute(&pool).await.unwrap();
        })
        .await;
    Some(Repositories::postgres(
        &pool,
        SensitiveBackend::InMemory,
        SessionOptions::default(),
        &Logger::default(),
    ))
}

#[tokio::test]
async fn currency_lifecycle() {
    let Some(repos) = repositories().await else {
        return;
    };
    let ctx = RequestContext::new();

    let added = repos
        .currencies
        .add(&ctx, Currency::new(999, "Test", "TST", 2))
        .await
        .unwrap();
    let id = added.id.unwrap();

    let updated = repos
        .currencies
        .update(
            &ctx,
            id,
            CurrencyPatch {
                name: Some("Renamed".to_string()),
                ..CurrencyPatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name.as_deref(), Some("Renamed"));
    assert_eq!(updated.char_code.as_deref(), Some("TST"));
    assert_eq!(updated.exponent, Some(2));

    let found = repos
        .currencies
        .query(&ctx, &CurrencySpec::ById(id))
        .await
        .unwrap();
    assert_eq!(found.items, vec![updated.clone()]);
    assert!(found.total >= 1);

    let deleted = repos.currencies.delete(&ctx, id).await.unwrap();
    assert_eq!(deleted, updated);
    assert!(repos.currencies.delete(&ctx, id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn page_window_is_bounded() {
    let Some(repos) = repositories().await else {
        return;
    };
    let ctx = RequestContext::new();
    let page = repos
        .currencies
        .query(&ctx, &CurrencySpec::Page(Page::new(2, 0)))
        .await
        .unwrap();
    assert!(page.items.len() <= 2);
}

#[tokio::test]
async fn profile_and_transaction_hydrate() {
    let Some(repos) = repositories().await else {
        return;
    };
    let ctx = RequestContext::new();
    let key = Uuid::new_v4().to_string();

    let currency = repos
        .currencies
        .add(&ctx, Currency::new(643, "Ruble", "RUB", 2))
        .await
        .unwrap();
    let profile = repos
        .profiles
        .add(
            &ctx,
            Profile::new(key.clone(), Some(Reference::shallow(currency.id.unwrap()))),
        )
        .await
        .unwrap();
    let by_key = repos
        .profiles
        .query(&ctx, &ProfileSpec::ByKey(key))
        .await
        .unwrap();
    assert_eq!(by_key.items, vec![profile.clone()]);
    assert!(profile.currency.as_ref().unwrap().is_loaded());

    let account = repos.accounts.add(&ctx, Account::default()).await.unwrap();
    let tx = repos
        .transactions
        .add(
            &ctx,
            Transaction::new(
                TransactionType::PreAuthorize,
                Reference::loaded(profile.clone()),
                Reference::shallow(account.id.unwrap()),
                250,
            ),
        )
        .await
        .unwrap();
    assert!(tx.created.is_some());
    assert_eq!(
        tx.currency.as_ref().and_then(Reference::as_loaded),
        Some(&currency)
    );

    let tx_id = tx.id.unwrap();
    let declined = repos
        .transactions
        .update(
            &ctx,
            tx_id,
            TransactionPatch {
                status: Some(TransactionStatus::Declined),
                error_message: Some("insufficient funds".to_string()),
                ..TransactionPatch::default()
            },
        )
        .await
        .unwrap();
    assert!(declined.in_final_state());
    assert_eq!(declined.amount, Some(250));

    let turnover = repos
        .transactions
        .type_turnover(&ctx, &TransactionSpec::ById(tx_id))
        .await
        .unwrap();
    assert_eq!(turnover[&TransactionType::PreAuthorize].sum, 250);
}

#[tokio::test]
async fn merges_match_the_in_memory_backend() {
    let Some(repos) = repositories().await else {
        return;
    };
    let key = Uuid::new_v4().to_string();
    let in_memory = Repositories::in_memory(SessionOptions::default(), &Logger::default());

    let expected = common::run_merge_sequence(&in_memory, &key).await;
    let actual = common::run_merge_sequence(&repos, &key).await;
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn self_reference_loads_one_level() {
    let Some(repos) = repositories().await else {
        return;
    };
    let (id, tx) = common::self_referencing_transaction(&repos).await;
    let inner = tx.reference.as_ref().and_then(Reference::as_loaded).unwrap();
    assert_eq!(inner.id, Some(id));
    assert_eq!(inner.reference, Some(Reference::Id(id)));
}
