use std::{cmp::Ordering, mem, sync::Arc};

use flagtree_core::{DuplicatePolicy, FlaggedTransaction, NodeType, Restructure, StoreError};

type NodeId = usize;

#[derive(Debug)]
struct Node {
    record: Arc<FlaggedTransaction>,
    left: Option<NodeId>,
    right: Option<NodeId>,
}

impl Node {
    fn new(record: Arc<FlaggedTransaction>) -> Self {
        Self {
            record,
            left: None,
            right: None,
        }
    }

    fn key(&self) -> &str {
        self.record.transaction_id()
    }
}

/// Where a node hangs: the root slot or one side of a parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Root,
    Left(NodeId),
    Right(NodeId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion {
    Created { depth: usize },
    Replaced { previous: Arc<FlaggedTransaction>, depth: usize },
}

#[derive(Debug, Clone)]
pub struct TreeSearch {
    pub record: Option<Arc<FlaggedTransaction>>,
    pub comparisons: usize,
}

#[derive(Debug, Clone)]
pub struct Removal {
    pub record: Arc<FlaggedTransaction>,
    pub restructure: Restructure,
}

/// Unbalanced binary search tree keyed by transaction id.
///
/// Nodes live in an arena and refer to each other by slot index; freed slots
/// are recycled through `free`. Every walk is iterative, so a tree that has
/// degenerated into a chain costs no stack depth.
#[derive(Debug, Default)]
pub struct TransactionTree {
    nodes: Vec<Option<Node>>,
    free: Vec<NodeId>,
    root: Option<NodeId>,
    len: usize,
}

impl TransactionTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, record: Arc<FlaggedTransaction>, policy: DuplicatePolicy) -> Result<Insertion, StoreError> {
        let (link, comparisons) = self.locate(record.transaction_id());
        match self.child(link) {
            Some(id) => match policy {
                DuplicatePolicy::Reject => Err(StoreError::DuplicateTransaction(record.transaction_id().to_string())),
                DuplicatePolicy::Replace => {
                    let previous = mem::replace(&mut self.node_mut(id).record, record);
                    Ok(Insertion::Replaced { previous, depth: comparisons })
                }
            },
            None => {
                let id = self.alloc(record);
                self.set_child(link, Some(id));
                self.len += 1;
                Ok(Insertion::Created { depth: comparisons + 1 })
            }
        }
    }

    pub fn search(&self, key: &str) -> TreeSearch {
        let (link, comparisons) = self.locate(key);
        TreeSearch {
            record: self.child(link).map(|id| self.node(id).record.clone()),
            comparisons,
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Removal> {
        let (link, _) = self.locate(key);
        let id = self.child(link)?;

        let removal = match (self.node(id).left, self.node(id).right) {
            (Some(_), Some(right)) => {
                let mut succ_link = Link::Right(id);
                let mut succ = right;
                while let Some(left) = self.node(succ).left {
                    succ_link = Link::Left(succ);
                    succ = left;
                }

                // The successor has no left child, so its right child (if any)
                // takes its place.
                let succ_node = self.release(succ);
                let vacated = if succ_node.right.is_some() { NodeType::SingleChild } else { NodeType::Leaf };
                self.set_child(succ_link, succ_node.right);

                let key = succ_node.record.transaction_id().to_string();
                let record = mem::replace(&mut self.node_mut(id).record, succ_node.record);
                Removal {
                    record,
                    restructure: Restructure::SuccessorPromoted { key, vacated },
                }
            }
            (left, right) => {
                let node = self.release(id);
                let restructure = if left.is_none() && right.is_none() {
                    Restructure::Detached
                } else {
                    Restructure::ChildPromoted
                };
                self.set_child(link, left.or(right));
                Removal {
                    record: node.record,
                    restructure,
                }
            }
        };

        self.len -= 1;
        Some(removal)
    }

    /// Node count on the longest root-to-leaf path; 0 for an empty tree.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut stack: Vec<(NodeId, usize)> = self.root.map(|id| (id, 1)).into_iter().collect();
        while let Some((id, depth)) = stack.pop() {
            height = height.max(depth);
            let node = self.node(id);
            stack.extend(node.left.map(|c| (c, depth + 1)));
            stack.extend(node.right.map(|c| (c, depth + 1)));
        }
        height
    }

    /// In-order walk, ascending by transaction id.
    pub fn iter(&self) -> InOrder<'_> {
        let mut iter = InOrder {
            tree: self,
            stack: Vec::new(),
        };
        iter.push_left_spine(self.root);
        iter
    }

    /// Checks strict ascending order and that `len` matches the reachable nodes.
    pub fn verify(&self) -> Result<(), StoreError> {
        let mut previous: Option<&str> = None;
        let mut count = 0;
        for record in self.iter() {
            let key = record.transaction_id();
            if let Some(prev) = previous {
                if prev >= key {
                    return Err(StoreError::Inconsistent(format!(
                        "BST order broken: {} is not below {}",
                        prev, key
                    )));
                }
            }
            previous = Some(key);
            count += 1;
        }
        if count != self.len {
            return Err(StoreError::Inconsistent(format!(
                "BST holds {} reachable nodes but counts {}",
                count, self.len
            )));
        }
        Ok(())
    }

    /// Descends toward `key`. Returns the link holding the matching node, or
    /// the empty link where it would be attached, plus the comparisons made.
    fn locate(&self, key: &str) -> (Link, usize) {
        let mut link = Link::Root;
        let mut comparisons = 0;
        while let Some(id) = self.child(link) {
            comparisons += 1;
            match key.cmp(self.node(id).key()) {
                Ordering::Equal => break,
                Ordering::Less => link = Link::Left(id),
                Ordering::Greater => link = Link::Right(id),
            }
        }
        (link, comparisons)
    }

    fn child(&self, link: Link) -> Option<NodeId> {
        match link {
            Link::Root => self.root,
            Link::Left(parent) => self.node(parent).left,
            Link::Right(parent) => self.node(parent).right,
        }
    }

    fn set_child(&mut self, link: Link, child: Option<NodeId>) {
        match link {
            Link::Root => self.root = child,
            Link::Left(parent) => self.node_mut(parent).left = child,
            Link::Right(parent) => self.node_mut(parent).right = child,
        }
    }

    fn node(&self, id: NodeId) -> &Node {
        match &self.nodes[id] {
            Some(node) => node,
            None => unreachable!("link to freed slot {}", id),
        }
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        match &mut self.nodes[id] {
            Some(node) => node,
            None => unreachable!("link to freed slot {}", id),
        }
    }

    fn alloc(&mut self, record: Arc<FlaggedTransaction>) -> NodeId {
        let node = Some(Node::new(record));
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        }
    }

    fn release(&mut self, id: NodeId) -> Node {
        match self.nodes[id].take() {
            Some(node) => {
                self.free.push(id);
                node
            }
            None => unreachable!("double release of slot {}", id),
        }
    }
}

pub struct InOrder<'a> {
    tree: &'a TransactionTree,
    stack: Vec<NodeId>,
}

impl<'a> InOrder<'a> {
    fn push_left_spine(&mut self, mut next: Option<NodeId>) {
        while let Some(id) = next {
            self.stack.push(id);
            next = self.tree.node(id).left;
        }
    }
}

impl<'a> Iterator for InOrder<'a> {
    type Item = &'a Arc<FlaggedTransaction>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let tree = self.tree;
        let node = tree.node(id);
        self.push_left_spine(node.right);
        Some(&node.record)
    }
}
