use axum::{extract::State, Json};
use flagtree_core::DuplicatePolicy;
use serde_json::{json, Value};

use crate::api::AppState;

/// Static explanation of how the store inserts, searches and deletes.
pub async fn bst_explanation(State(state): State<AppState>) -> Json<Value> {
    Json(explanation(state.store.duplicate_policy()))
}

pub fn explanation(policy: DuplicatePolicy) -> Value {
    let duplicates = match policy {
        DuplicatePolicy::Reject => "Inserting an id that is already flagged is rejected with a conflict; the store is unchanged.",
        DuplicatePolicy::Replace => "Inserting an id that is already flagged replaces the stored record in place; tree shape and list order are unchanged.",
    };

    json!({
        "title": "flagtree - BST flagged transaction store",
        "insertion": {
            "description": "Insertion adds a flagged transaction to the tree and appends it to the unordered list.",
            "behavior": format!(
                "Transactions are ordered by transaction id: smaller ids go left, larger ids go right. {} \
                 The tree is never rebalanced, so inserting ids in ascending or descending order builds a chain.",
                duplicates
            ),
            "duplicatePolicy": policy.to_string(),
        },
        "search": {
            "description": "Search looks the id up in both structures and reports the comparisons each needed.",
            "bstEfficiency": "BST search: one comparison per level visited; O(log n) when the tree is bushy, O(n) when it has degenerated into a chain.",
            "listEfficiency": "Unordered list search: one comparison per element scanned; an absent id always costs the full list length.",
            "comparison": "For 1000 randomly ordered ids a BST lookup takes about 10 to 20 comparisons against an average of 500 for the list.",
        },
        "deletion": {
            "description": "Deletion removes a reviewed transaction from both structures and explains how the tree was repaired.",
            "leafNode": "Leaf: the node has no children and is cut from its parent. Nothing else moves.",
            "singleChild": "Single child: the child takes the removed node's place. Its subtree keeps its shape one level higher.",
            "twoChildren": "Two children: the in-order successor (leftmost node of the right subtree) is promoted into the node's position and its old slot, a leaf or a node with only a right child, is unlinked.",
        },
        "fraudSystemImpact": "Every repair keeps the BST ordering intact, so cleared transactions leave the active set while searches for the remaining ids stay correct.",
    })
}
