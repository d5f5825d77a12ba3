/// Describes how a BST lookup compared with a linear scan of `list_size`
/// records for the same key.
pub fn efficiency_note(bst_comparisons: usize, list_comparisons: usize, list_size: usize) -> String {
    if list_size == 0 {
        return "No transactions in store. Add flagged transactions to compare search efficiency.".to_string();
    }

    if bst_comparisons < list_comparisons {
        let saved = list_comparisons - bst_comparisons;
        if bst_comparisons * 2 <= list_comparisons {
            format!(
                "BST used {} comparisons versus {} for the unordered list scan over {} records: \
                 {} fewer, a substantial saving that grows with volume (O(log n) average vs O(n)).",
                bst_comparisons, list_comparisons, list_size, saved
            )
        } else {
            format!(
                "BST used {} comparisons versus {} for the unordered list scan over {} records ({} fewer).",
                bst_comparisons, list_comparisons, list_size, saved
            )
        }
    } else if bst_comparisons == list_comparisons && bst_comparisons == 1 {
        if list_size == 1 {
            "BST and unordered list both used 1 comparison; with a single record there is nothing to save."
                .to_string()
        } else {
            format!(
                "BST and unordered list both used 1 comparison over {} records: the match is the BST root, \
                 which is always the first record inserted, so both structures find it at once.",
                list_size
            )
        }
    } else if bst_comparisons == list_comparisons {
        format!(
            "BST and unordered list both used {} comparisons over {} records. The tree has degenerated \
             toward a chain, which happens when transactions are inserted in monotonic id order; \
             without rebalancing its search cost matches a linear scan.",
            bst_comparisons, list_size
        )
    } else {
        format!(
            "Unordered list used {} comparisons versus {} for the BST: the match sits near the front of \
             insertion order. Over {} records the list averages n/2 comparisons while the tree stays near its depth.",
            list_comparisons, bst_comparisons, list_size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store() {
        assert!(efficiency_note(0, 0, 0).starts_with("No transactions"));
    }

    #[test]
    fn substantial_and_modest_savings() {
        let note = efficiency_note(3, 10, 10);
        assert!(note.contains("substantial"));
        assert!(note.contains("7 fewer"));

        let note = efficiency_note(3, 4, 4);
        assert!(note.contains("(1 fewer)"));
        assert!(!note.contains("substantial"));
    }

    #[test]
    fn degenerate_chain() {
        assert!(efficiency_note(5, 5, 5).contains("degenerated"));
        assert!(efficiency_note(1, 1, 1).contains("single record"));
    }

    #[test]
    fn root_hit_is_not_a_chain() {
        let note = efficiency_note(1, 1, 4);
        assert!(note.contains("BST root"));
        assert!(!note.contains("degenerated"));
    }

    #[test]
    fn list_wins_near_front() {
        assert!(efficiency_note(4, 1, 8).contains("near the front"));
    }
}
