use std::sync::Arc;

use flagtree_core::FlaggedTransaction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListSearch {
    pub index: Option<usize>,
    pub comparisons: usize,
}

/// The same records as the tree, kept in insertion order and only ever
/// scanned front to back. It is the baseline for comparison counts.
#[derive(Debug, Default)]
pub struct ShadowList {
    records: Vec<Arc<FlaggedTransaction>>,
}

impl ShadowList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: Arc<FlaggedTransaction>) {
        self.records.push(record);
    }

    /// Swaps the record with the same id in place. False if none matched.
    pub fn replace(&mut self, record: Arc<FlaggedTransaction>) -> bool {
        match self.linear_search(record.transaction_id()).index {
            Some(index) => {
                self.records[index] = record;
                true
            }
            None => false,
        }
    }

    /// Removes the matching record; survivors keep their relative order.
    pub fn remove(&mut self, transaction_id: &str) -> Option<Arc<FlaggedTransaction>> {
        let index = self.linear_search(transaction_id).index?;
        Some(self.records.remove(index))
    }

    /// One comparison per element examined, up to and including the match.
    pub fn linear_search(&self, transaction_id: &str) -> ListSearch {
        for (index, record) in self.records.iter().enumerate() {
            if record.transaction_id() == transaction_id {
                return ListSearch {
                    index: Some(index),
                    comparisons: index + 1,
                };
            }
        }
        ListSearch {
            index: None,
            comparisons: self.records.len(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<FlaggedTransaction>> {
        self.records.iter()
    }
}
