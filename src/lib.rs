pub mod args;
pub mod audit;
pub mod clock;
pub mod config;
pub mod gemini;
pub mod history;
pub mod ip;
pub mod report;
pub mod sqlite;
pub mod stats;
pub mod store;
pub mod usage;
pub mod utils;

pub use args::Args;
pub use audit::{AuditError, AuditOutcome, Auditor};
pub use config::Config;
pub use gemini::GeminiProvider;
pub use history::{HistoryEntry, HistoryStore, HISTORY_CAPACITY};
pub use ip::ClientIp;
pub use report::AuditReport;
pub use sqlite::SqliteStore;
pub use stats::HistorySummary;
pub use store::{KeyValueStore, MemoryStore, StoreError};
pub use usage::{UsageLimiter, UsageRecord, MAX_DAILY_LIMIT};
