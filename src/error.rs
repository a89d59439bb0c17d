//! Error taxonomy shared by the planner and the apply orchestrator.
//!
//! Library entry points return [`MigrateError`]; the CLI layer wraps these with
//! `anyhow` context before reporting them. Per-change failures during apply are
//! collected as [`ApplyError`] values and never abort the batch.

use crate::store::StoreError;

pub type Result<T, E = MigrateError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrateError {
    /// Malformed or incomplete schema document. Always raised before any store access.
    #[error("schema error: {0}")]
    Schema(String),
    /// A change refers to a field or resource missing from the current store state.
    #[error("lookup error: {0}")]
    Lookup(String),
    #[error("{context}: {source}")]
    Store {
        context: String,
        #[source]
        source: StoreError,
    },
    #[error("operation cancelled")]
    Cancelled,
}

impl MigrateError {
    pub fn schema(message: impl Into<String>) -> Self {
        MigrateError::Schema(message.into())
    }

    pub fn lookup(message: impl Into<String>) -> Self {
        MigrateError::Lookup(message.into())
    }

    /// Adapter for `map_err` on store calls.
    pub fn store(context: impl Into<String>) -> impl FnOnce(StoreError) -> MigrateError {
        let context = context.into();
        move |source| MigrateError::Store { context, source }
    }
}

/// A single failed change, recorded against the change path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to apply {path}: {source}")]
pub struct ApplyError {
    pub path: String,
    #[source]
    pub source: MigrateError,
}

impl ApplyError {
    pub fn new(path: impl Into<String>, source: MigrateError) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }
}
