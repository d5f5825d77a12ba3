//! flagtree: a flagged transaction store that reports how many key
//! comparisons each lookup costs in a BST versus an unordered list.

pub mod api;
pub mod config;
pub mod docs;
pub mod telemetry;

pub use flagtree_core::{DuplicatePolicy, NewTransaction, StoreError, TransactionStore};
pub use flagtree_memory::InMemoryStore;
