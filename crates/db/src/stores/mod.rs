use reacji_core::errors::StoreError;

pub mod admin;
pub mod emoji;
pub mod memory;

pub use admin::SqlAdminStore;
pub use emoji::SqlEmojiStore;
pub use memory::{InMemoryAdminStore, InMemoryEmojiStore};

/// Connectivity failures are surfaced as retryable `Unavailable`; everything
/// else is a plain operation failure. Unique violations are handled at the
/// call sites that know which code collided.
pub(crate) fn map_sqlx_error(error: sqlx::Error) -> StoreError {
    match &error {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(error.to_string())
        }
        _ => StoreError::Operation(error.to_string()),
    }
}

pub(crate) fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(db) if db.is_unique_violation())
}
