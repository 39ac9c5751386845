use thiserror::Error;

use crate::points::StoreError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("account lookup failed for `{account_id}`: {message}")]
    Lookup { account_id: String, message: String },
}

/// Failure while handling a single chat message. Never fatal to the process;
/// the event loop logs it and moves on to the next message.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum KarmaError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl KarmaError {
    /// Stable label used in structured logs.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Store(_) => "store_error",
            Self::Directory(_) => "directory_error",
        }
    }
}
