//! # Repository Wiring
//!
//! Builds a complete, cross-linked set of repositories for one backend.
//!
//! Hydration dependencies are wired in the same order for every backend:
//! leaf reference data first, then accounts and profiles, then routes and
//! transactions.

use crate::domain::Logger;
use crate::domain::entities::{
    Account, Card, Channel, Currency, Instrument, Profile, Route, Router, Session,
};
use crate::infrastructure::persistence::in_memory::InMemoryStore;
use crate::infrastructure::persistence::postgres::PgStore;
use crate::infrastructure::persistence::{
    AccountDeps, ProfileDeps, Repository, RouteDeps, SessionOptions, TransactionDeps,
    TransactionRepository,
};
use crate::infrastructure::vault::{VaultCardStore, VaultClient, VaultSessionStore};
use sqlx::PgPool;
use std::sync::Arc;

/// Where cards and sessions live when the rest is in PostgreSQL.
#[derive(Debug, Clone)]
pub enum SensitiveBackend {
    /// Process-local stores.
    InMemory,
    /// External vault.
    Vault(VaultClient),
}

/// One repository per entity.
#[derive(Debug, Clone)]
pub struct Repositories {
    /// Currencies.
    pub currencies: Arc<dyn Repository<Currency>>,
    /// Channels.
    pub channels: Arc<dyn Repository<Channel>>,
    /// Routers.
    pub routers: Arc<dyn Repository<Router>>,
    /// Instruments.
    pub instruments: Arc<dyn Repository<Instrument>>,
    /// Accounts.
    pub accounts: Arc<dyn Repository<Account>>,
    /// Profiles.
    pub profiles: Arc<dyn Repository<Profile>>,
    /// Routes.
    pub routes: Arc<dyn Repository<Route>>,
    /// Transactions.
    pub transactions: Arc<dyn TransactionRepository>,
    /// Cards.
    pub cards: Arc<dyn Repository<Card>>,
    /// Sessions.
    pub sessions: Arc<dyn Repository<Session>>,
}

impl Repositories {
    /// Builds an all-in-memory set.
    #[must_use]
    pub fn in_memory(session: SessionOptions, logger: &Logger) -> Self {
        let currencies: Arc<dyn Repository<Currency>> =
            Arc::new(InMemoryStore::new(()).with_logger(logger.clone()));
        let channels: Arc<dyn Repository<Channel>> =
            Arc::new(InMemoryStore::new(()).with_logger(logger.clone()));
        let routers: Arc<dyn Repository<Router>> =
            Arc::new(InMemoryStore::new(()).with_logger(logger.clone()));
        let instruments: Arc<dyn Repository<Instrument>> =
            Arc::new(InMemoryStore::new(()).with_logger(logger.clone()));
        let accounts: Arc<dyn Repository<Account>> = Arc::new(
            InMemoryStore::new(AccountDeps {
                currencies: Arc::clone(&currencies),
                channels: Arc::clone(&channels),
            })
            .with_logger(logger.clone()),
        );
        let profiles: Arc<dyn Repository<Profile>> = Arc::new(
            InMemoryStore::new(ProfileDeps {
                currencies: Arc::clone(&currencies),
            })
            .with_logger(logger.clone()),
        );
        let routes: Arc<dyn Repository<Route>> = Arc::new(
            InMemoryStore::new(RouteDeps {
                profiles: Arc::clone(&profiles),
                instruments: Arc::clone(&instruments),
                accounts: Arc::clone(&accounts),
                routers: Arc::clone(&routers),
            })
            .with_logger(logger.clone()),
        );
        let transactions: Arc<dyn TransactionRepository> = Arc::new(
            InMemoryStore::new(TransactionDeps {
                profiles: Arc::clone(&profiles),
                accounts: Arc::clone(&accounts),
                instruments: Arc::clone(&instruments),
                currencies: Arc::clone(&currencies),
            })
            .with_logger(logger.clone()),
        );

        Self {
            currencies,
            channels,
            routers,
            instruments,
            accounts,
            profiles,
            routes,
            transactions,
            cards: Arc::new(InMemoryStore::<Card>::new(()).with_logger(logger.clone())),
            sessions: Arc::new(InMemoryStore::<Session>::new(session).with_logger(logger.clone())),
        }
    }

    /// Builds a PostgreSQL-backed set with cards and sessions on `sensitive`.
    #[must_use]
    pub fn postgres(
        pool: &PgPool,
        sensitive: SensitiveBackend,
        session: SessionOptions,
        logger: &Logger,
    ) -> Self {
        let currencies: Arc<dyn Repository<Currency>> =
            Arc::new(PgStore::new(pool.clone(), ()).with_logger(logger.clone()));
        let channels: Arc<dyn Repository<Channel>> =
            Arc::new(PgStore::new(pool.clone(), ()).with_logger(logger.clone()));
        let routers: Arc<dyn Repository<Router>> =
            Arc::new(PgStore::new(pool.clone(), ()).with_logger(logger.clone()));
        let instruments: Arc<dyn Repository<Instrument>> =
            Arc::new(PgStore::new(pool.clone(), ()).with_logger(logger.clone()));
        let accounts: Arc<dyn Repository<Account>> = Arc::new(
            PgStore::new(
                pool.clone(),
                AccountDeps {
                    currencies: Arc::clone(&currencies),
                    channels: Arc::clone(&channels),
                },
            )
            .with_logger(logger.clone()),
        );
        let profiles: Arc<dyn Repository<Profile>> = Arc::new(
            PgStore::new(
                pool.clone(),
                ProfileDeps {
                    currencies: Arc::clone(&currencies),
                },
            )
            .with_logger(logger.clone()),
        );
        let routes: Arc<dyn Repository<Route>> = Arc::new(
            PgStore::new(
                pool.clone(),
                RouteDeps {
                    profiles: Arc::clone(&profiles),
                    instruments: Arc::clone(&instruments),
                    accounts: Arc::clone(&accounts),
                    routers: Arc::clone(&routers),
                },
            )
            .with_logger(logger.clone()),
        );
        let transactions: Arc<dyn TransactionRepository> = Arc::new(
            PgStore::new(
                pool.clone(),
                TransactionDeps {
                    profiles: Arc::clone(&profiles),
                    accounts: Arc::clone(&accounts),
                    instruments: Arc::clone(&instruments),
                    currencies: Arc::clone(&currencies),
                },
            )
            .with_logger(logger.clone()),
        );

        let (cards, sessions): (Arc<dyn Repository<Card>>, Arc<dyn Repository<Session>>) =
            match sensitive {
                SensitiveBackend::InMemory => (
                    Arc::new(InMemoryStore::<Card>::new(()).with_logger(logger.clone())),
                    Arc::new(InMemoryStore::<Session>::new(session).with_logger(logger.clone())),
                ),
                SensitiveBackend::Vault(client) => (
                    Arc::new(VaultCardStore::new(client.clone()).with_logger(logger.clone())),
                    Arc::new(VaultSessionStore::new(client, session).with_logger(logger.clone())),
                ),
            };

        Self {
            currencies,
            channels,
            routers,
            instruments,
            accounts,
            profiles,
            routes,
            transactions,
            cards,
            sessions,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::RequestContext;
    use crate::domain::entities::{Transaction, TransactionSpec, TransactionType};
    use crate::domain::value_objects::Reference;

    #[tokio::test]
    async fn in_memory_set_hydrates_across_stores() {
        let repos = Repositories::in_memory(SessionOptions::default(), &Logger::default());
        let ctx = RequestContext::new();

        let rub = repos
            .currencies
            .add(&ctx, Currency::new(643, "Ruble", "RUB", 2))
            .await
            .unwrap();
        let profile = repos
            .profiles
            .add(
                &ctx,
                Profile::new("shop", Some(Reference::shallow(rub.id.unwrap()))),
            )
            .await
            .unwrap();
        assert_eq!(
            profile.currency.as_ref().and_then(Reference::as_loaded),
            Some(&rub)
        );

        let account = repos.accounts.add(&ctx, Account::default()).await.unwrap();
        let tx = Transaction::new(
            TransactionType::Authorize,
            Reference::loaded(profile.clone()),
            Reference::shallow(account.id.unwrap()),
            100,
        );
        let tx = repos.transactions.add(&ctx, tx).await.unwrap();
        assert_eq!(tx.currency.as_ref().and_then(Reference::as_loaded), Some(&rub));
        assert_eq!(
            tx.profile.as_ref().and_then(Reference::as_loaded).and_then(|p| p.id),
            profile.id
        );

        let turnover = repos
            .transactions
            .type_turnover(&ctx, &TransactionSpec::All)
            .await
            .unwrap();
        assert_eq!(turnover[&TransactionType::Authorize].sum, 100);
    }
}
