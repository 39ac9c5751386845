pub mod connection;
pub mod migrations;
pub mod repositories;

use std::sync::Arc;

use tracing::info;

use plusplus_core::config::{AppConfig, StorageBackend};
use plusplus_core::points::PointStore;

pub use connection::{connect, connect_with_settings, normalize_database_url, DbPool};
pub use repositories::{InMemoryPointStore, RepositoryError, SqlPointStore};

#[cfg(feature = "dynamodb")]
pub use repositories::DynamoPointStore;

/// Opens the point store selected by `storage.backend`, ready for use.
pub async fn open_point_store(config: &AppConfig) -> Result<Arc<dyn PointStore>, RepositoryError> {
    let store: Arc<dyn PointStore> = match config.storage.backend {
        StorageBackend::Sqlite => Arc::new(
            SqlPointStore::open(
                &config.database.url,
                config.database.max_connections,
                config.database.timeout_secs,
            )
            .await?,
        ),
        StorageBackend::DynamoDb => open_dynamo(config).await?,
    };

    info!(
        event_name = "store.opened",
        backend = store.backend_name(),
        correlation_id = "bootstrap",
        "point store ready"
    );
    Ok(store)
}

#[cfg(feature = "dynamodb")]
async fn open_dynamo(config: &AppConfig) -> Result<Arc<dyn PointStore>, RepositoryError> {
    Ok(Arc::new(DynamoPointStore::connect(&config.dynamodb).await?))
}

#[cfg(not(feature = "dynamodb"))]
async fn open_dynamo(_config: &AppConfig) -> Result<Arc<dyn PointStore>, RepositoryError> {
    Err(RepositoryError::Dynamo(
        "this build does not include the `dynamodb` feature".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use plusplus_core::config::{AppConfig, StorageBackend};

    use super::open_point_store;

    #[tokio::test]
    async fn sqlite_backend_is_selected_by_default() {
        let mut config = AppConfig::default();
        config.database.url = "sqlite::memory:".to_string();
        config.database.max_connections = 1;
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);

        let store = open_point_store(&config).await.expect("store opens");
        store.add_points("U1", 2, true).await.expect("add");

        assert_eq!(store.backend_name(), "sqlite");
        assert_eq!(store.get_points("U1").await.expect("read"), 2);
        store.close().await.expect("close");
    }
}
