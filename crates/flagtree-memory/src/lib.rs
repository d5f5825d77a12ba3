//! In-memory transaction store backed by an unbalanced BST and a shadow list.

pub mod shadow_list;
pub mod tree;

use std::{
    collections::BTreeSet,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use time::OffsetDateTime;

use flagtree_core::{
    DeleteReport, DuplicatePolicy, FlaggedTransaction, InsertReport, NewTransaction, SearchReport, StoreError,
    TransactionStore,
};

use shadow_list::ShadowList;
use tree::{Insertion, Removal, TransactionTree};

struct Representations {
    tree: TransactionTree,
    list: ShadowList,
}

impl Representations {
    fn check_sizes(&self) -> Result<(), StoreError> {
        if self.tree.len() != self.list.len() {
            return Err(StoreError::Inconsistent(format!(
                "BST holds {} records but shadow list holds {}",
                self.tree.len(),
                self.list.len()
            )));
        }
        Ok(())
    }

    /// Returns `(replaced, depth, size)`.
    fn insert(
        &mut self,
        record: Arc<FlaggedTransaction>,
        policy: DuplicatePolicy,
    ) -> Result<(bool, usize, usize), StoreError> {
        let (replaced, depth) = match self.tree.insert(record.clone(), policy)? {
            Insertion::Created { depth } => {
                self.list.push(record);
                (false, depth)
            }
            Insertion::Replaced { depth, .. } => {
                let id = record.transaction_id().to_string();
                if !self.list.replace(record) {
                    return Err(StoreError::Inconsistent(format!(
                        "{} is in the BST but not in the shadow list",
                        id
                    )));
                }
                (true, depth)
            }
        };
        self.check_sizes()?;
        Ok((replaced, depth, self.tree.len()))
    }

    fn search(&self, transaction_id: &str) -> Result<SearchReport, StoreError> {
        let bst = self.tree.search(transaction_id);
        let scan = self.list.linear_search(transaction_id);
        if bst.record.is_some() != scan.index.is_some() {
            return Err(StoreError::Inconsistent(format!(
                "BST and shadow list disagree on presence of {}",
                transaction_id
            )));
        }
        Ok(SearchReport::new(bst.record, bst.comparisons, scan.comparisons, self.list.len()))
    }

    fn delete(&mut self, transaction_id: &str) -> Result<(Option<Removal>, usize), StoreError> {
        let removal = match self.tree.remove(transaction_id) {
            Some(removal) => removal,
            None => return Ok((None, self.tree.len())),
        };
        if self.list.remove(transaction_id).is_none() {
            return Err(StoreError::Inconsistent(format!(
                "{} was in the BST but not in the shadow list",
                transaction_id
            )));
        }
        self.check_sizes()?;
        Ok((Some(removal), self.tree.len()))
    }
}

fn log_inconsistency(err: StoreError) -> StoreError {
    if let StoreError::Inconsistent(detail) = &err {
        tracing::warn!(%detail, "Store representations diverged");
    }
    err
}

/// The single entry point over both representations. Mutations take the
/// write lock, lookups share the read lock, so neither side is ever observed
/// with a different key set than the other.
pub struct InMemoryStore {
    inner: RwLock<Representations>,
    policy: DuplicatePolicy,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_policy(DuplicatePolicy::default())
    }

    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            inner: RwLock::new(Representations {
                tree: TransactionTree::new(),
                list: ShadowList::new(),
            }),
            policy,
        }
    }

    /// Current tree height, in nodes.
    pub fn height(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.tree.height())
    }

    /// Full consistency check: tree ordering plus key-set equality with the
    /// shadow list.
    pub fn verify(&self) -> Result<(), StoreError> {
        let inner = self.read()?;
        inner.tree.verify()?;
        inner.check_sizes()?;

        let tree_keys: BTreeSet<&str> = inner.tree.iter().map(|r| r.transaction_id()).collect();
        let list_keys: BTreeSet<&str> = inner.list.iter().map(|r| r.transaction_id()).collect();
        if tree_keys != list_keys {
            let missing: Vec<&str> = tree_keys.symmetric_difference(&list_keys).copied().collect();
            return Err(StoreError::Inconsistent(format!(
                "key sets differ on {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Representations>, StoreError> {
        self.inner.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Representations>, StoreError> {
        self.inner.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl TransactionStore for InMemoryStore {
    // Each operation releases the lock before it logs.
    fn insert(&self, transaction: NewTransaction) -> Result<InsertReport, StoreError> {
        let record = Arc::new(FlaggedTransaction::new(transaction, OffsetDateTime::now_utc())?);

        let applied = self.write()?.insert(record.clone(), self.policy);
        let (replaced, depth, size) = applied.map_err(log_inconsistency)?;

        tracing::debug!(transaction_id = record.transaction_id(), size, depth, replaced, "Transaction flagged");
        Ok(InsertReport { size, replaced, depth })
    }

    fn search(&self, transaction_id: &str) -> Result<SearchReport, StoreError> {
        flagtree_core::validate_transaction_id(transaction_id)?;

        let found = self.read()?.search(transaction_id);
        let report = found.map_err(log_inconsistency)?;

        tracing::debug!(
            transaction_id,
            found = report.found,
            bst_comparisons = report.bst_comparisons,
            list_comparisons = report.list_comparisons,
            "Transaction searched"
        );
        Ok(report)
    }

    fn delete(&self, transaction_id: &str) -> Result<DeleteReport, StoreError> {
        flagtree_core::validate_transaction_id(transaction_id)?;

        let removed = self.write()?.delete(transaction_id);
        let (removal, size) = removed.map_err(log_inconsistency)?;

        let removal = match removal {
            Some(removal) => removal,
            None => return Ok(DeleteReport::not_found(size)),
        };
        tracing::debug!(
            transaction_id,
            node_type = %removal.restructure.node_type(),
            promoted = removal.restructure.promoted_key(),
            size,
            "Transaction deleted"
        );
        Ok(DeleteReport::removed(&removal.restructure, size))
    }

    fn list(&self) -> Result<Vec<Arc<FlaggedTransaction>>, StoreError> {
        Ok(self.read()?.tree.iter().cloned().collect())
    }

    fn size(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.tree.len())
    }

    fn duplicate_policy(&self) -> DuplicatePolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use flagtree_core::NodeType;
    use rust_decimal_macros::dec;

    use super::*;

    fn flag(store: &InMemoryStore, id: &str) -> InsertReport {
        store.insert(NewTransaction::new(id, dec!(100))).unwrap()
    }

    #[test]
    fn insert_updates_both_representations() {
        let store = InMemoryStore::new();
        assert_eq!(flag(&store, "TX2").size, 1);
        assert_eq!(flag(&store, "TX1").size, 2);
        store.verify().unwrap();

        let report = store.search("TX1").unwrap();
        assert_eq!(report.bst_comparisons, 2);
        assert_eq!(report.list_comparisons, 2);
        assert_eq!(report.list_size, 2);
    }

    #[test]
    fn invalid_input_never_mutates() {
        let store = InMemoryStore::new();
        let err = store.insert(NewTransaction::new("  ", dec!(1))).unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransaction(_)));
        assert!(err.is_client_error());
        assert_eq!(store.size().unwrap(), 0);
        assert!(store.search("").is_err());
        assert!(store.delete("").is_err());
    }

    #[test]
    fn conflict_is_distinct_from_validation() {
        let store = InMemoryStore::new();
        flag(&store, "TX1");
        let err = store.insert(NewTransaction::new("TX1", dec!(2))).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateTransaction(_)));
        assert_eq!(store.size().unwrap(), 1);
        assert_eq!(store.search("TX1").unwrap().transaction.unwrap().amount(), dec!(100));
    }

    #[test]
    fn replace_policy_swaps_in_place() {
        let store = InMemoryStore::with_policy(DuplicatePolicy::Replace);
        flag(&store, "TX2");
        flag(&store, "TX1");
        let report = store.insert(NewTransaction::new("TX1", dec!(7)).with_reason("rechecked")).unwrap();
        assert!(report.replaced);
        assert_eq!(report.size, 2);

        let found = store.search("TX1").unwrap();
        assert_eq!(found.list_comparisons, 2);
        assert_eq!(found.transaction.unwrap().reason(), Some("rechecked"));
        store.verify().unwrap();
    }

    #[test]
    fn delete_reports_impact() {
        let store = InMemoryStore::new();
        for id in ["M", "C", "X", "P"] {
            flag(&store, id);
        }
        let report = store.delete("M").unwrap();
        assert!(report.deleted);
        assert_eq!(report.node_type, Some(NodeType::TwoChildren));
        assert_eq!(report.promoted_key.as_deref(), Some("P"));
        assert_eq!(report.size, 3);
        store.verify().unwrap();

        let again = store.delete("M").unwrap();
        assert!(!again.deleted);
        assert_eq!(again.size, 3);
    }

    #[test]
    fn events_are_emitted_after_the_lock_is_released() {
        let store = Arc::new(InMemoryStore::new());
        let events = Arc::new(AtomicUsize::new(0));
        let while_locked = Arc::new(AtomicUsize::new(0));

        let make_writer = {
            let store = store.clone();
            let events = events.clone();
            let while_locked = while_locked.clone();
            move || {
                events.fetch_add(1, Ordering::SeqCst);
                if store.inner.try_write().is_err() {
                    while_locked.fetch_add(1, Ordering::SeqCst);
                }
                std::io::sink()
            }
        };
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(make_writer)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            flag(&store, "TX2");
            flag(&store, "TX1");
            assert!(store.search("TX1").unwrap().found);
            assert!(store.delete("TX2").unwrap().deleted);
        });

        assert!(events.load(Ordering::SeqCst) >= 4);
        assert_eq!(while_locked.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn concurrent_callers_keep_sets_equal() {
        let store = Arc::new(InMemoryStore::new());
        std::thread::scope(|scope| {
            for worker in 0..4 {
                let store = store.clone();
                scope.spawn(move || {
                    for i in 0..200 {
                        let id = format!("TX{}-{:03}", worker, i);
                        store.insert(NewTransaction::new(id.clone(), dec!(1))).unwrap();
                        let report = store.search(&id).unwrap();
                        assert!(report.found);
                        if i % 3 == 0 {
                            assert!(store.delete(&id).unwrap().deleted);
                        }
                    }
                });
            }
        });
        store.verify().unwrap();
        assert_eq!(store.size().unwrap(), 4 * (200 - 67));
    }
}
