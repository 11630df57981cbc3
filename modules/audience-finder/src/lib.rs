pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod finder;
pub mod pipeline;
pub mod query;
pub mod report;
pub mod scheduling;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod types;

pub use discovery::SearchDepths;
pub use error::{Result, ScanError};
pub use finder::AudienceFinder;
pub use pipeline::scan::{
    ProgressSink, ScanController, ScanOutcome, ScanProgress, ScanSession, ScanState,
    TracingProgress,
};
pub use pipeline::stats::ScanStats;
pub use query::QuerySet;
pub use report::{CommunityRow, RankedTable};
pub use traits::RedditApi;
pub use types::{CommunityRecord, EvidenceTag};
