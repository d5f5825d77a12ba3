use crate::models::NodeType;

/// How the tree was repaired after a node was unlinked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restructure {
    /// A leaf was cut off its parent (or the root was cleared).
    Detached,
    /// The only child took the removed node's place.
    ChildPromoted,
    /// The in-order successor's record moved into the removed node's slot and
    /// the successor's own slot, shaped as `vacated`, was unlinked.
    SuccessorPromoted { key: String, vacated: NodeType },
}

impl Restructure {
    pub fn node_type(&self) -> NodeType {
        match self {
            Restructure::Detached => NodeType::Leaf,
            Restructure::ChildPromoted => NodeType::SingleChild,
            Restructure::SuccessorPromoted { .. } => NodeType::TwoChildren,
        }
    }

    pub fn promoted_key(&self) -> Option<&str> {
        match self {
            Restructure::SuccessorPromoted { key, .. } => Some(key),
            _ => None,
        }
    }

    pub fn explain(&self) -> String {
        match self {
            Restructure::Detached => "Leaf node removed with no restructuring: its parent's link was cleared \
                 and every other search path is unchanged."
                .to_string(),
            Restructure::ChildPromoted => "Single-child node removed: its child was promoted directly into the \
                 removed node's position, so the child's subtree keeps its shape one level higher."
                .to_string(),
            Restructure::SuccessorPromoted { key, vacated } => {
                let vacated = match vacated {
                    NodeType::Leaf => "a leaf",
                    _ => "a single-child node whose right child moved up",
                };
                format!(
                    "Two-children node removed: in-order successor key {} promoted into its position; \
                     the successor's original position was removed as {}.",
                    key, vacated
                )
            }
        }
    }
}
