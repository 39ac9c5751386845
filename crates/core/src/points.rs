//! Point storage contract
//!
//! A [`PointStore`] is a durable keyed counter. Every backend must honour the
//! same guarantees:
//! - `add_points` is a single atomic upsert: it creates the record with
//!   `points = delta` or applies `points += delta`, and concurrent callers on the
//!   same key never lose an update.
//! - `get_points` reports `0` for keys that were never written.
//! - Reads never touch `points` or `last_modified`.
//!
//! Backends do not retry. Any I/O failure surfaces as [`StoreError`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Logical table (or collection) holding every point record.
pub const POINTS_TABLE: &str = "user_points";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointRecord {
    pub key: String,
    pub points: i64,
    pub is_user: bool,
    pub last_modified: DateTime<Utc>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("point store backend failure: {0}")]
    Backend(String),
    #[error("point store returned an undecodable record: {0}")]
    Decode(String),
    #[error("point store is closed")]
    Closed,
}

#[async_trait]
pub trait PointStore: Send + Sync {
    async fn add_points(&self, key: &str, delta: i64, is_user: bool) -> Result<(), StoreError>;

    async fn get_points(&self, key: &str) -> Result<i64, StoreError>;

    async fn find_record(&self, key: &str) -> Result<Option<PointRecord>, StoreError>;

    /// Releases pooled connections. Called once at shutdown.
    async fn close(&self) -> Result<(), StoreError>;

    fn backend_name(&self) -> &'static str;
}
