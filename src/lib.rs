//! # paystore
//!
//! Repositories for payment-processing entities: currencies, channels,
//! accounts, profiles, routers, instruments, routes, transactions, cards
//! and sessions.
//!
//! Every entity is stored through the same [`Repository`] contract:
//! `add`, `delete`, `update` (partial merge) and `query` (by specification).
//! Three backends implement it:
//!
//! - an insertion-ordered in-memory store, one mutex per entity
//! - PostgreSQL through `sqlx`, with parameterized SQL only
//! - an external HTTP vault for cards and sessions
//!
//! Records referencing other entities are returned with those references
//! loaded, one batched lookup per reference field.
//!
//! # Examples
//!
//! ```no_run
//! use paystore::config::Settings;
//! use paystore::domain::{Logger, RequestContext};
//! use paystore::domain::entities::{Card, CardSpec};
//! use paystore::domain::value_objects::{ExpDate, Pan};
//! use paystore::infrastructure::persistence::Repository;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::load(None)?;
//! let repos = settings.repositories(&Logger::default()).await?;
//! let ctx = RequestContext::new();
//!
//! let card = Card::new("4111111111111111", ExpDate::new(2027, 5)?, "A B");
//! repos.cards.add(&ctx, card).await?;
//! let found = repos.cards.query(&ctx, &CardSpec::ByPan(Pan::new("4111111111111111"))).await?;
//! assert_eq!(found.items.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! [`Repository`]: infrastructure::persistence::Repository

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;
