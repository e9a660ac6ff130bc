//! # Request Context
//!
//! Request-scoped state passed through every repository operation.
//!
//! A [`RequestContext`] carries the request identifier, free-form logging
//! fields and a cancellation flag. The [`Logger`] capability maps a context to
//! a `tracing` span, which backends use as the parent of their diagnostics.
//!
//! # Examples
//!
//! ```
//! use paystore::domain::context::{Logger, RequestContext};
//!
//! let ctx = RequestContext::new().with_field("merchant", "acme");
//! let logger = Logger::default();
//! let _span = logger.span(&ctx);
//!
//! assert!(!ctx.is_cancelled());
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::Span;
use uuid::Uuid;

/// Request-scoped context.
///
/// Cloning is cheap; clones share the cancellation flag.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Uuid,
    fields: BTreeMap<String, String>,
    cancelled: Arc<AtomicBool>,
}

impl RequestContext {
    /// Creates a context with a fresh random request id.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(Uuid::new_v4())
    }

    /// Creates a context for an existing request id.
    #[must_use]
    pub fn with_request_id(request_id: Uuid) -> Self {
        Self {
            request_id,
            fields: BTreeMap::new(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Adds a logging field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Returns the request id.
    #[inline]
    #[must_use]
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Returns the logging fields.
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Marks the request as cancelled.
    ///
    /// Operations that have not started yet fail with
    /// `RepositoryError::Cancelled`; in-flight backend calls run to completion.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true if the request was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Function mapping a request context to a structured logger.
pub type LoggerFn = dyn Fn(&RequestContext) -> Span + Send + Sync;

/// Injected logger capability.
///
/// Used for diagnostics only; never for control flow.
#[derive(Clone)]
pub struct Logger(Arc<LoggerFn>);

impl Logger {
    /// Wraps a custom span factory.
    #[must_use]
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&RequestContext) -> Span + Send + Sync + 'static,
    {
        Self(Arc::new(factory))
    }

    /// Returns the span for a request.
    #[must_use]
    pub fn span(&self, ctx: &RequestContext) -> Span {
        (self.0)(ctx)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(|ctx| {
            tracing::info_span!(
                "repository",
                request_id = %ctx.request_id(),
                fields = ?ctx.fields(),
            )
        })
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Logger")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_cancellation() {
        let ctx = RequestContext::new();
        let clone = ctx.clone();
        clone.cancel();
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.request_id(), clone.request_id());
    }

    #[test]
    fn fields_are_kept_in_order() {
        let ctx = RequestContext::new()
            .with_field("b", "2")
            .with_field("a", "1");
        let keys: Vec<&str> = ctx.fields().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn custom_logger_is_invoked() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);
        let logger = Logger::new(move |_| {
            flag.store(true, Ordering::SeqCst);
            tracing::debug_span!("custom")
        });
        let _span = logger.span(&RequestContext::new());
        assert!(called.load(Ordering::SeqCst));
    }
}
