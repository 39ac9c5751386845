//! Karma intent handling
//!
//! `KarmaService` turns one chat message into at most one reply description:
//!
//! ```text
//! text -> detect_operation -> extract_target -> self guard -> PointStore -> KarmaReply
//! ```
//!
//! Rendering the reply text and delivering it belong to the transport layer.
//! No lock orders messages against each other; concurrent increments rely on
//! the store's atomic upsert.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::{DirectoryError, KarmaError};
use crate::parser::{detect_operation, extract_target, Operation, Target};
use crate::points::PointStore;

/// Resolves whether a chat account belongs to an automated agent (a bot).
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn is_automated(&self, account_id: &str) -> Result<bool, DirectoryError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    Increment,
    Decrement,
    Query,
    SelfRejected,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KarmaReply {
    pub kind: ReplyKind,
    pub target: Target,
    pub points: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KarmaOutcome {
    /// The text carries no operation token.
    NoOperation,
    /// An operation token matched but no user or emoji marker could be resolved.
    TargetMissing,
    Reply(KarmaReply),
}

pub struct KarmaService {
    store: Arc<dyn PointStore>,
    directory: Arc<dyn AccountDirectory>,
}

impl KarmaService {
    pub fn new(store: Arc<dyn PointStore>, directory: Arc<dyn AccountDirectory>) -> Self {
        Self { store, directory }
    }

    pub fn store(&self) -> &Arc<dyn PointStore> {
        &self.store
    }

    pub async fn handle_message(
        &self,
        text: &str,
        author_id: &str,
    ) -> Result<KarmaOutcome, KarmaError> {
        let operation = detect_operation(text);
        if operation == Operation::None {
            return Ok(KarmaOutcome::NoOperation);
        }

        info!(
            event_name = "karma.operation_detected",
            operation = ?operation,
            author_id,
            "point operation detected"
        );

        let Some(target) = extract_target(text) else {
            warn!(
                event_name = "karma.target_missing",
                operation = ?operation,
                author_id,
                "no target found in message"
            );
            return Ok(KarmaOutcome::TargetMissing);
        };

        let Some(delta) = operation.delta() else {
            let points = self.store.get_points(target.key()).await?;
            return Ok(KarmaOutcome::Reply(KarmaReply { kind: ReplyKind::Query, target, points }));
        };

        if let Target::User { id } = &target {
            if id == author_id {
                info!(
                    event_name = "karma.self_operation_rejected",
                    author_id,
                    "rejected point change on own account"
                );
                return Ok(KarmaOutcome::Reply(KarmaReply {
                    kind: ReplyKind::SelfRejected,
                    target,
                    points: 0,
                }));
            }
        }

        let is_user = match &target {
            Target::User { id } => !self.directory.is_automated(id).await?,
            Target::Emoji { .. } => false,
        };

        self.store.add_points(target.key(), delta, is_user).await?;
        let points = self.store.get_points(target.key()).await?;

        debug!(
            event_name = "karma.points_applied",
            target = target.key(),
            delta,
            points,
            is_user,
            "points applied"
        );

        let kind = if delta > 0 { ReplyKind::Increment } else { ReplyKind::Decrement };
        Ok(KarmaOutcome::Reply(KarmaReply { kind, target, points }))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::Mutex;

    use super::{AccountDirectory, KarmaOutcome, KarmaReply, KarmaService, ReplyKind};
    use crate::errors::{DirectoryError, KarmaError};
    use crate::parser::Target;
    use crate::points::{PointRecord, PointStore, StoreError};

    #[derive(Default)]
    struct RecordingStore {
        state: Mutex<RecordingState>,
    }

    #[derive(Default)]
    struct RecordingState {
        records: HashMap<String, PointRecord>,
        add_calls: Vec<(String, i64, bool)>,
        fail_writes: bool,
    }

    impl RecordingStore {
        fn failing_writes() -> Self {
            Self {
                state: Mutex::new(RecordingState { fail_writes: true, ..RecordingState::default() }),
            }
        }

        async fn add_calls(&self) -> Vec<(String, i64, bool)> {
            self.state.lock().await.add_calls.clone()
        }
    }

    #[async_trait]
    impl PointStore for RecordingStore {
        async fn add_points(
            &self,
            key: &str,
            delta: i64,
            is_user: bool,
        ) -> Result<(), StoreError> {
            let mut state = self.state.lock().await;
            if state.fail_writes {
                return Err(StoreError::Backend("disk I/O error".to_owned()));
            }
            state.add_calls.push((key.to_owned(), delta, is_user));
            let record = state.records.entry(key.to_owned()).or_insert_with(|| PointRecord {
                key: key.to_owned(),
                points: 0,
                is_user,
                last_modified: Utc::now(),
            });
            record.points += delta;
            record.is_user = is_user;
            record.last_modified = Utc::now();
            Ok(())
        }

        async fn get_points(&self, key: &str) -> Result<i64, StoreError> {
            let state = self.state.lock().await;
            Ok(state.records.get(key).map(|record| record.points).unwrap_or(0))
        }

        async fn find_record(&self, key: &str) -> Result<Option<PointRecord>, StoreError> {
            Ok(self.state.lock().await.records.get(key).cloned())
        }

        async fn close(&self) -> Result<(), StoreError> {
            Ok(())
        }

        fn backend_name(&self) -> &'static str {
            "recording"
        }
    }

    #[derive(Default)]
    struct StaticDirectory {
        bots: HashSet<String>,
        unreachable: bool,
    }

    #[async_trait]
    impl AccountDirectory for StaticDirectory {
        async fn is_automated(&self, account_id: &str) -> Result<bool, DirectoryError> {
            if self.unreachable {
                return Err(DirectoryError::Lookup {
                    account_id: account_id.to_owned(),
                    message: "users.info unavailable".to_owned(),
                });
            }
            Ok(self.bots.contains(account_id))
        }
    }

    fn service_with(
        store: Arc<RecordingStore>,
        directory: StaticDirectory,
    ) -> KarmaService {
        KarmaService::new(store, Arc::new(directory))
    }

    #[tokio::test]
    async fn increments_mentioned_user_and_reports_new_total() {
        let store = Arc::new(RecordingStore::default());
        let service = service_with(store.clone(), StaticDirectory::default());

        let outcome = service.handle_message("<@U2>++", "U1").await.expect("handled");

        assert_eq!(
            outcome,
            KarmaOutcome::Reply(KarmaReply {
                kind: ReplyKind::Increment,
                target: Target::user("U2"),
                points: 1,
            })
        );
        assert_eq!(store.add_calls().await, vec![("U2".to_owned(), 1, true)]);
    }

    #[tokio::test]
    async fn decrements_emoji_as_non_user_kind() {
        let store = Arc::new(RecordingStore::default());
        let service = service_with(store.clone(), StaticDirectory::default());

        let outcome = service.handle_message(":sake: --", "U1").await.expect("handled");

        assert_eq!(
            outcome,
            KarmaOutcome::Reply(KarmaReply {
                kind: ReplyKind::Decrement,
                target: Target::emoji("sake"),
                points: -1,
            })
        );
        assert_eq!(store.add_calls().await, vec![("sake".to_owned(), -1, false)]);
    }

    #[tokio::test]
    async fn bot_targets_are_stored_as_non_user_kind() {
        let store = Arc::new(RecordingStore::default());
        let directory = StaticDirectory {
            bots: HashSet::from(["B0T".to_owned()]),
            ..StaticDirectory::default()
        };
        let service = service_with(store.clone(), directory);

        service.handle_message("<@B0T>++", "U1").await.expect("handled");

        assert_eq!(store.add_calls().await, vec![("B0T".to_owned(), 1, false)]);
    }

    #[tokio::test]
    async fn self_increment_is_rejected_without_mutation() {
        let store = Arc::new(RecordingStore::default());
        store.add_points("U1", 3, true).await.expect("seed");
        let before = store.find_record("U1").await.expect("read");
        let service = service_with(store.clone(), StaticDirectory::default());

        let outcome = service.handle_message("<@U1> ++", "U1").await.expect("handled");

        assert_eq!(
            outcome,
            KarmaOutcome::Reply(KarmaReply {
                kind: ReplyKind::SelfRejected,
                target: Target::user("U1"),
                points: 0,
            })
        );
        assert_eq!(store.find_record("U1").await.expect("read"), before);
        assert_eq!(store.add_calls().await.len(), 1);
    }

    #[tokio::test]
    async fn query_reads_without_mutation_even_for_self() {
        let store = Arc::new(RecordingStore::default());
        store.add_points("U1", 7, true).await.expect("seed");
        let before = store.find_record("U1").await.expect("read");
        let service = service_with(store.clone(), StaticDirectory::default());

        let outcome = service.handle_message("<@U1>==", "U1").await.expect("handled");

        assert_eq!(
            outcome,
            KarmaOutcome::Reply(KarmaReply {
                kind: ReplyKind::Query,
                target: Target::user("U1"),
                points: 7,
            })
        );
        assert_eq!(store.find_record("U1").await.expect("read"), before);
    }

    #[tokio::test]
    async fn query_for_unknown_target_reports_zero() {
        let service = service_with(Arc::new(RecordingStore::default()), StaticDirectory::default());

        let outcome = service.handle_message(":coffee: ==", "U1").await.expect("handled");

        assert!(matches!(outcome, KarmaOutcome::Reply(KarmaReply { points: 0, .. })));
    }

    #[tokio::test]
    async fn plain_chatter_is_ignored() {
        let store = Arc::new(RecordingStore::default());
        let service = service_with(store.clone(), StaticDirectory::default());

        let outcome = service.handle_message("lunch at noon?", "U1").await.expect("handled");

        assert_eq!(outcome, KarmaOutcome::NoOperation);
        assert!(store.add_calls().await.is_empty());
    }

    #[tokio::test]
    async fn directory_failure_aborts_before_mutation() {
        let store = Arc::new(RecordingStore::default());
        let directory = StaticDirectory { unreachable: true, ..StaticDirectory::default() };
        let service = service_with(store.clone(), directory);

        let error = service.handle_message("<@U2>++", "U1").await.expect_err("lookup fails");

        assert!(matches!(error, KarmaError::Directory(_)));
        assert!(store.add_calls().await.is_empty());
    }

    #[tokio::test]
    async fn store_failure_surfaces_as_error() {
        let service =
            service_with(Arc::new(RecordingStore::failing_writes()), StaticDirectory::default());

        let error = service.handle_message(":sake:++", "U1").await.expect_err("write fails");

        assert_eq!(error, KarmaError::Store(StoreError::Backend("disk I/O error".to_owned())));
    }
}
