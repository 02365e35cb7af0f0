/// Version history for collaboratively edited posts.
///
/// Every edit to a document is kept as a durable version: a full snapshot
/// every so often, line diffs in between. Any version's content can be
/// rebuilt by replaying from the nearest snapshot, and history can be reset
/// (drop versions after a point) or squashed (fold versions up to a point
/// into one snapshot). Storage is an embedded redb database.
pub mod clock;
pub mod codec;
pub mod config;
pub mod entry;
pub mod error;
pub mod locks;
pub mod log;
pub mod policy;
pub mod reconstruct;
pub mod service;

pub use clock::{Clock, SystemClock};
pub use codec::{Patch, PatchMismatchError};
pub use config::HistoryConfig;
pub use entry::{
    Author, CommitReceipt, DocumentHead, HistoryPage, HistoryStats, ResetOutcome, SortOrder,
    SquashOutcome, VersionContent, VersionEntry, VersionSummary,
};
pub use error::{HistoryError, Result};
pub use log::VersionLog;
pub use policy::{CadencePolicy, SnapshotPolicy};
pub use reconstruct::ContentReconstructor;
pub use service::{HistoryQuery, HistoryService, VerifyReport};
