pub mod sqlite_usage_store;

pub use sqlite_usage_store::SqliteUsageStore;
