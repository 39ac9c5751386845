use crate::commands::{current_thread_runtime, load_store_config, CommandResult};
use plusplus_core::extract_target;
use plusplus_core::points::{PointRecord, PointStore};
use plusplus_db::open_point_store;

type Failure = (&'static str, String, u8);

/// Mentions and emoji markers resolve to their store key; anything else is used as-is.
pub fn resolve_key(raw: &str) -> String {
    match extract_target(raw) {
        Some(target) => target.key().to_string(),
        None => raw.trim().to_string(),
    }
}

pub fn run(raw_key: &str) -> CommandResult {
    let key = resolve_key(raw_key);
    if key.is_empty() {
        return CommandResult::failure("points", "invalid_key", "key must not be empty", 2);
    }

    let config = match load_store_config("points") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match current_thread_runtime("points") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let store = open_point_store(&config)
            .await
            .map_err(|error| ("store_connectivity", error.to_string(), 4u8))?;
        lookup(store.as_ref(), &key).await
    });

    match result {
        Ok(Some(record)) => CommandResult::success(
            "points",
            format!(
                "{key}: {points} (kind: {kind}, last modified {modified})",
                points = record.points,
                kind = if record.is_user { "user" } else { "non-user" },
                modified = record.last_modified.to_rfc3339(),
            ),
        ),
        Ok(None) => CommandResult::success("points", format!("{key}: 0 (no record)")),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("points", error_class, message, exit_code)
        }
    }
}

/// Reads `key` and closes the store. A read failure outranks a close failure.
async fn lookup(store: &dyn PointStore, key: &str) -> Result<Option<PointRecord>, Failure> {
    let record = store.find_record(key).await;
    let closed = store.close().await;

    let record = record.map_err(|error| ("store_read", error.to_string(), 5u8))?;
    closed.map_err(|error| ("store_close", error.to_string(), 5u8))?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use plusplus_core::points::{PointRecord, PointStore, StoreError};

    use super::{lookup, resolve_key};

    struct FailingStore {
        read_fails: bool,
    }

    #[async_trait]
    impl PointStore for FailingStore {
        async fn add_points(&self, _key: &str, _delta: i64, _is_user: bool) -> Result<(), StoreError> {
            Ok(())
        }

        async fn get_points(&self, _key: &str) -> Result<i64, StoreError> {
            Ok(0)
        }

        async fn find_record(&self, _key: &str) -> Result<Option<PointRecord>, StoreError> {
            if self.read_fails {
                return Err(StoreError::Backend("disk I/O error".to_string()));
            }
            Ok(None)
        }

        async fn close(&self) -> Result<(), StoreError> {
            Err(StoreError::Backend("pool did not shut down".to_string()))
        }

        fn backend_name(&self) -> &'static str {
            "failing"
        }
    }

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime")
            .block_on(future)
    }

    #[test]
    fn close_failure_after_a_good_read_is_reported() {
        let result = block_on(lookup(&FailingStore { read_fails: false }, "U1"));

        let (error_class, message, exit_code) = result.expect_err("close should fail");
        assert_eq!(error_class, "store_close");
        assert_eq!(exit_code, 5);
        assert!(message.contains("pool did not shut down"), "unexpected message: {message}");
    }

    #[test]
    fn read_failure_outranks_close_failure() {
        let result = block_on(lookup(&FailingStore { read_fails: true }, "U1"));

        let (error_class, message, _) = result.expect_err("read should fail");
        assert_eq!(error_class, "store_read");
        assert!(message.contains("disk I/O error"), "unexpected message: {message}");
    }

    #[test]
    fn resolves_mentions_emoji_and_bare_keys() {
        assert_eq!(resolve_key("<@U123ABC>"), "U123ABC");
        assert_eq!(resolve_key(":sake:"), "sake");
        assert_eq!(resolve_key("  U999  "), "U999");
        assert_eq!(resolve_key(""), "");
    }
}
