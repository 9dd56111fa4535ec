pub mod sqlite_banned_term_store;

pub use sqlite_banned_term_store::SqliteBannedTermStore;
