use crate::commands::{current_thread_runtime, load_store_config, CommandResult};
use plusplus_core::config::StorageBackend;
use plusplus_db::{connect_with_settings, migrations};

pub fn run() -> CommandResult {
    let config = match load_store_config("migrate") {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    if config.storage.backend != StorageBackend::Sqlite {
        return CommandResult::failure(
            "migrate",
            "unsupported_backend",
            format!(
                "migrations apply to the sqlite backend only; configured backend is `{}`",
                config.storage.backend.as_str()
            ),
            2,
        );
    }

    let runtime = match current_thread_runtime("migrate") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;
        pool.close().await;
        Ok::<(), (&'static str, String, u8)>(())
    });

    match result {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}
