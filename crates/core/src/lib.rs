pub mod config;
pub mod errors;
pub mod karma;
pub mod parser;
pub mod points;

pub use errors::{DirectoryError, KarmaError};
pub use karma::{AccountDirectory, KarmaOutcome, KarmaReply, KarmaService, ReplyKind};
pub use parser::{detect_operation, extract_target, Operation, Target};
pub use points::{PointRecord, PointStore, StoreError, POINTS_TABLE};
