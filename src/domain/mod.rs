//! # Domain Layer
//!
//! Payment entities, their value objects and the query vocabulary shared
//! by every storage backend.
//!
//! - `entities`: records with patch and specification types
//! - `value_objects`: references, card numbers, expiry dates, tokens
//! - `specification`: record predicates and limit/offset windows
//! - `context`: per-request context and logger capability

pub mod context;
pub mod entities;
pub mod specification;
pub mod value_objects;

pub use context::{Logger, LoggerFn, RequestContext};
