//! Core types and traits for flagtree transaction stores.
//!
//! This crate provides the `TransactionStore` trait, the record and report
//! types it exchanges, and the pure functions that turn comparison counts and
//! deletion shapes into explanations. Store implementations live in separate
//! crates.

pub mod efficiency;
pub mod impact;
pub mod models;
pub mod report;
pub mod store;

// Re-export key types at crate root for convenience
pub use efficiency::efficiency_note;
pub use impact::Restructure;
pub use models::{
    validate_transaction_id, DuplicatePolicy, FlaggedTransaction, NewTransaction, NodeType,
    ParsePolicyError,
};
pub use report::{DeleteReport, InsertReport, SearchReport};
pub use store::{StoreError, TransactionStore};
