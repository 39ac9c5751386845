use thiserror::Error;

use plusplus_core::points::StoreError;

#[cfg(feature = "dynamodb")]
pub mod dynamo;
pub mod memory;
pub mod points;

#[cfg(feature = "dynamodb")]
pub use dynamo::DynamoPointStore;
pub use memory::InMemoryPointStore;
pub use points::SqlPointStore;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("dynamodb error: {0}")]
    Dynamo(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for StoreError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Decode(message) => StoreError::Decode(message),
            RepositoryError::Database(sqlx::Error::PoolClosed) => StoreError::Closed,
            other => StoreError::Backend(other.to_string()),
        }
    }
}
