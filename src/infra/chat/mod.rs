pub mod sqlite_message_store;

pub use sqlite_message_store::SqliteMessageStore;
