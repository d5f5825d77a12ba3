use std::sync::Arc;

use serde::Serialize;

use crate::{efficiency::efficiency_note, impact::Restructure, models::{FlaggedTransaction, NodeType}};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertReport {
    pub size: usize,
    /// True when an existing record was swapped under `DuplicatePolicy::Replace`.
    pub replaced: bool,
    /// 1-based depth of the node holding the record.
    pub depth: usize,
}

/// One lookup answered by both the tree and the shadow list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchReport {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<Arc<FlaggedTransaction>>,
    pub bst_comparisons: usize,
    pub list_comparisons: usize,
    pub list_size: usize,
    pub efficiency_note: String,
}

impl SearchReport {
    pub fn new(
        transaction: Option<Arc<FlaggedTransaction>>,
        bst_comparisons: usize,
        list_comparisons: usize,
        list_size: usize,
    ) -> Self {
        Self {
            found: transaction.is_some(),
            transaction,
            bst_comparisons,
            list_comparisons,
            list_size,
            efficiency_note: efficiency_note(bst_comparisons, list_comparisons, list_size),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReport {
    pub deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_type: Option<NodeType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact_explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promoted_key: Option<String>,
    pub size: usize,
}

impl DeleteReport {
    pub fn not_found(size: usize) -> Self {
        Self {
            deleted: false,
            node_type: None,
            impact_explanation: None,
            promoted_key: None,
            size,
        }
    }

    pub fn removed(restructure: &Restructure, size: usize) -> Self {
        Self {
            deleted: true,
            node_type: Some(restructure.node_type()),
            impact_explanation: Some(restructure.explain()),
            promoted_key: restructure.promoted_key().map(str::to_string),
            size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_report_wire_shape() {
        let report = DeleteReport::removed(
            &Restructure::SuccessorPromoted { key: "TX1010".into(), vacated: NodeType::Leaf },
            3,
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["deleted"], true);
        assert_eq!(json["nodeType"], "two-children");
        assert_eq!(json["promotedKey"], "TX1010");
        assert_eq!(json["size"], 3);

        let json = serde_json::to_value(DeleteReport::not_found(3)).unwrap();
        assert_eq!(json["deleted"], false);
        assert!(json.get("nodeType").is_none());
        assert!(json.get("impactExplanation").is_none());
    }

    #[test]
    fn search_report_derives_found_and_note() {
        let report = SearchReport::new(None, 1, 3, 3);
        assert!(!report.found);
        assert!(!report.efficiency_note.is_empty());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["bstComparisons"], 1);
        assert_eq!(json["listComparisons"], 3);
        assert_eq!(json["listSize"], 3);
        assert!(json.get("transaction").is_none());
    }
}
