use std::sync::Arc;

use crate::{
    models::{DuplicatePolicy, FlaggedTransaction, NewTransaction},
    report::{DeleteReport, InsertReport, SearchReport},
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("transaction already flagged: {0}")]
    DuplicateTransaction(String),
    #[error("store invariant violated: {0}")]
    Inconsistent(String),
    #[error("store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// True for errors caused by the caller's input rather than the store.
    pub fn is_client_error(&self) -> bool {
        matches!(self, StoreError::InvalidTransaction(_) | StoreError::DuplicateTransaction(_))
    }
}

/// A keyed store of flagged transactions that reports the comparison cost of
/// every lookup and the structural impact of every delete.
///
/// Not-found is a normal answer (`found == false`, `deleted == false`), never
/// an error.
pub trait TransactionStore: Send + Sync {
    fn insert(&self, transaction: NewTransaction) -> Result<InsertReport, StoreError>;
    fn search(&self, transaction_id: &str) -> Result<SearchReport, StoreError>;
    fn delete(&self, transaction_id: &str) -> Result<DeleteReport, StoreError>;
    /// All records in ascending transaction id order.
    fn list(&self) -> Result<Vec<Arc<FlaggedTransaction>>, StoreError>;
    fn size(&self) -> Result<usize, StoreError>;
    fn duplicate_policy(&self) -> DuplicatePolicy;
}
