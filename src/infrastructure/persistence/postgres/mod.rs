//! # PostgreSQL Repositories
//!
//! Relational storage for the reference data, merchant configuration and
//! transactions. Cards and sessions are not stored in the database.
//!
//! The schema lives in `migrations/0001_init.sql`.

mod merchant;
mod reference_data;
pub mod store;
mod transaction;

pub use merchant::{AccountRow, ProfileRow, RouteRow};
pub use reference_data::{ChannelRow, CurrencyRow, KeyedRow};
pub use store::{
    PgRecord, PgStore, SqlList, SqlSpecification, push_eq_filter, push_id_filter,
    push_ids_filter, set_coalesce,
};
pub use transaction::TransactionRow;
