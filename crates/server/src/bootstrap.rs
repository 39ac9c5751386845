use std::sync::Arc;

use plusplus_core::config::{AppConfig, ConfigError};
use plusplus_core::{KarmaService, PointStore};
use plusplus_db::{open_point_store, RepositoryError};
use plusplus_slack::events::message_dispatcher;
use plusplus_slack::karma::KarmaMessageService;
use plusplus_slack::socket::{ReconnectPolicy, SocketModeRunner, WebSocketTransport};
use plusplus_slack::web::SlackWebClient;
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub store: Arc<dyn PointStore>,
    pub slack_runner: SocketModeRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("point store initialization failed: {0}")]
    Store(#[source] RepositoryError),
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        storage_backend = config.storage.backend.as_str(),
        "starting application bootstrap"
    );
    config.validate()?;

    let store = open_point_store(&config).await.map_err(BootstrapError::Store)?;
    info!(
        event_name = "system.bootstrap.store_ready",
        correlation_id = "bootstrap",
        backend = store.backend_name(),
        "point store ready"
    );

    let web = SlackWebClient::new(&config.slack);
    let karma = Arc::new(KarmaService::new(Arc::clone(&store), Arc::new(web.clone())));
    let dispatcher = message_dispatcher(KarmaMessageService::new(karma));
    // a long-lived bot keeps reconnecting; backoff is capped by the policy
    let policy = ReconnectPolicy { max_retries: u32::MAX, ..ReconnectPolicy::default() };
    let slack_runner = SocketModeRunner::new(
        Arc::new(WebSocketTransport::new(web.clone())),
        dispatcher,
        Arc::new(web),
        policy,
    );

    Ok(Application { config, store, slack_runner })
}
