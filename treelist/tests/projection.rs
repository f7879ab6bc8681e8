use std::time::Instant;

use treelist::{
    DriverCall, FlatRow, NodeId, NodeSpec, RecordingDriver, SCROLL_DELAY, Tree, TreeError,
    TreeList,
};

fn leaf(key: &str) -> NodeSpec<String> {
    NodeSpec::new(key, key.to_uppercase())
}

fn new_list() -> (TreeList<String>, RecordingDriver<String>) {
    let driver = RecordingDriver::new();
    let list = TreeList::new(Box::new(driver.clone()));
    (list, driver)
}

fn keys(list: &TreeList<String>) -> Vec<String> {
    list.rows()
        .iter()
        .map(|row| list.tree().key_of(row.id).unwrap().to_string())
        .collect()
}

/// Recompute the projection from scratch and compare: it must equal the
/// pre-order traversal of nodes whose full ancestor chain is expanded, and
/// the node→index map must agree.
fn assert_projection_consistent(list: &TreeList<String>) {
    fn collect(tree: &Tree<String>, node: NodeId, depth: u16, out: &mut Vec<FlatRow>) {
        out.push(FlatRow { id: node, depth });
        if tree.is_expanded(node) {
            for child in tree.children_of(node).unwrap() {
                collect(tree, child, depth + 1, out);
            }
        }
    }
    let mut expected = Vec::new();
    for child in list.tree().children_of(list.root()).unwrap() {
        collect(list.tree(), child, 0, &mut expected);
    }
    assert_eq!(list.rows(), expected.as_slice());
    for (index, row) in expected.iter().enumerate() {
        assert_eq!(list.index_of(row.id), Some(index));
    }
}

/// Every row's projected descendants must sit directly after it as one
/// unbroken run of strictly deeper rows.
fn assert_contiguity(list: &TreeList<String>) {
    let rows = list.rows();
    for (index, row) in rows.iter().enumerate() {
        let span = rows[index + 1..]
            .iter()
            .take_while(|r| r.depth > row.depth)
            .count();
        for r in &rows[index + 1..index + 1 + span] {
            assert!(r.depth > row.depth);
        }
        if let Some(next) = rows.get(index + 1 + span) {
            assert!(next.depth <= row.depth);
        }
    }
}

// =============================================================================
// Spec scenarios
// =============================================================================

#[test]
fn test_scenario_a_add_appends_after_visible_subtree() {
    let (mut list, driver) = new_list();
    let root = list.root();
    list.add_children(root, vec![leaf("a"), leaf("b")]).unwrap();
    driver.take();

    list.add_children(root, vec![leaf("c")]).unwrap();
    assert_eq!(keys(&list), ["a", "b", "c"]);
    assert_eq!(driver.take(), vec![DriverCall::Insert(2)]);
}

#[test]
fn test_scenario_b_expand_reveals_hidden_children() {
    let (mut list, driver) = new_list();
    let root = list.root();
    let a = list.add_children(root, vec![leaf("a")]).unwrap()[0];
    list.add_children(a, vec![leaf("a1"), leaf("a2")]).unwrap();
    list.add_children(root, vec![leaf("b")]).unwrap();
    assert_eq!(keys(&list), ["a", "b"]);
    driver.take();

    list.expand(a).unwrap();
    assert_eq!(keys(&list), ["a", "a1", "a2", "b"]);
    assert_eq!(
        driver.take(),
        vec![DriverCall::Insert(1), DriverCall::Insert(2)]
    );
    assert_projection_consistent(&list);
}

#[test]
fn test_scenario_c_collapse_removes_block_high_to_low() {
    let (mut list, driver) = new_list();
    let root = list.root();
    let a = list.add_children(root, vec![leaf("a")]).unwrap()[0];
    list.add_children(a, vec![leaf("a1"), leaf("a2")]).unwrap();
    list.add_children(root, vec![leaf("b")]).unwrap();
    list.expand(a).unwrap();
    driver.take();

    list.collapse(a).unwrap();
    assert_eq!(keys(&list), ["a", "b"]);

    let calls = driver.take();
    assert_eq!(calls.len(), 2);
    match (&calls[0], &calls[1]) {
        (
            DriverCall::Remove { index: first, .. },
            DriverCall::Remove { index: second, .. },
        ) => {
            assert_eq!(*first, 2);
            assert_eq!(*second, 1);
        }
        other => panic!("expected two removes, got {other:?}"),
    }
    assert_projection_consistent(&list);
}

#[test]
fn test_scenario_d_remove_projected_subtree_as_one_block() {
    let (mut list, driver) = new_list();
    let root = list.root();
    list.add_children(root, vec![leaf("x"), leaf("y"), leaf("z")])
        .unwrap();
    let b = list.add_children(root, vec![leaf("b")]).unwrap()[0];
    list.add_children(b, vec![leaf("b1"), leaf("b2")]).unwrap();
    list.expand(b).unwrap();
    assert_eq!(list.index_of(b), Some(3));
    driver.take();

    list.remove_children(root, &["b"]).unwrap();
    assert_eq!(keys(&list), ["x", "y", "z"]);

    let removed_indices: Vec<usize> = driver
        .take()
        .into_iter()
        .map(|call| match call {
            DriverCall::Remove { index, row } => {
                // Snapshots carry the captured appearance of detached rows.
                assert!(["b", "b1", "b2"].contains(&row.key.as_str()));
                index
            }
            other => panic!("expected remove, got {other:?}"),
        })
        .collect();
    assert_eq!(removed_indices, vec![5, 4, 3]);
    assert_projection_consistent(&list);
}

#[test]
fn test_scenario_e_insert_at_first_sibling_position() {
    let (mut list, driver) = new_list();
    let root = list.root();
    let a = list.add_children(root, vec![leaf("a")]).unwrap()[0];
    list.add_children(a, vec![leaf("a1")]).unwrap();
    list.add_children(root, vec![leaf("b")]).unwrap();
    list.expand(a).unwrap();
    assert_eq!(keys(&list), ["a", "a1", "b"]);
    driver.take();

    list.insert_children(root, 0, vec![leaf("z")]).unwrap();
    assert_eq!(keys(&list), ["z", "a", "a1", "b"]);
    assert_eq!(driver.take(), vec![DriverCall::Insert(0)]);
    assert_projection_consistent(&list);
}

// =============================================================================
// Invariants
// =============================================================================

#[test]
fn test_projection_tracks_mixed_mutation_sequence() {
    let (mut list, _driver) = new_list();
    let root = list.root();
    let top = list
        .add_children(root, vec![leaf("a"), leaf("b"), leaf("c")])
        .unwrap();
    let a_kids = list
        .add_children(top[0], vec![leaf("a1"), leaf("a2")])
        .unwrap();
    list.add_children(a_kids[1], vec![leaf("a2x")]).unwrap();
    list.expand(top[0]).unwrap();
    list.expand(a_kids[1]).unwrap();
    list.insert_children(root, 1, vec![leaf("m")]).unwrap();
    list.remove_children(top[0], &["a1"]).unwrap();
    list.collapse(top[0]).unwrap();
    list.expand(top[0]).unwrap();

    assert_eq!(keys(&list), ["a", "a2", "a2x", "m", "b", "c"]);
    assert_projection_consistent(&list);
    assert_contiguity(&list);
}

#[test]
fn test_expand_collapse_round_trip_restores_projection() {
    let (mut list, _driver) = new_list();
    let root = list.root();
    let spec = NodeSpec::new("a", "A".to_string())
        .child(leaf("a1"))
        .child(NodeSpec::new("a2", "A2".to_string()).expanded(true).child(leaf("a2x")));
    let a = list.add_children(root, vec![spec]).unwrap()[0];
    list.add_children(root, vec![leaf("b")]).unwrap();

    let before: Vec<FlatRow> = list.rows().to_vec();
    list.expand(a).unwrap();
    // Stored flags are honored: a2 re-opens expanded.
    assert_eq!(keys(&list), ["a", "a1", "a2", "a2x", "b"]);
    list.collapse(a).unwrap();
    assert_eq!(list.rows(), before.as_slice());
    assert_projection_consistent(&list);
}

#[test]
fn test_toggle_flips_expansion_both_ways() {
    let (mut list, driver) = new_list();
    let root = list.root();
    let a = list.add_children(root, vec![leaf("a")]).unwrap()[0];
    list.add_children(a, vec![leaf("a1")]).unwrap();
    list.add_children(root, vec![leaf("b")]).unwrap();
    driver.take();

    list.toggle(a).unwrap();
    assert_eq!(keys(&list), ["a", "a1", "b"]);
    // calls() peeks without clearing; the later take() sees both toggles.
    assert_eq!(driver.calls(), vec![DriverCall::Insert(1)]);

    list.toggle(a).unwrap();
    assert_eq!(keys(&list), ["a", "b"]);
    let calls = driver.take();
    assert_eq!(calls.len(), 2);
    assert!(matches!(calls[1], DriverCall::Remove { index: 1, .. }));
    assert_projection_consistent(&list);
}

#[test]
fn test_collapse_of_collapsed_node_is_a_no_op() {
    let (mut list, driver) = new_list();
    let root = list.root();
    let a = list.add_children(root, vec![leaf("a")]).unwrap()[0];
    list.add_children(a, vec![leaf("a1")]).unwrap();
    list.poll_scroll_at(Instant::now() + SCROLL_DELAY);
    driver.take();

    list.collapse(a).unwrap();
    list.collapse(a).unwrap();
    assert!(driver.is_empty());
    assert!(!list.has_pending_scroll());
}

#[test]
fn test_mutations_under_collapsed_ancestor_touch_tree_only() {
    let (mut list, driver) = new_list();
    let root = list.root();
    let a = list.add_children(root, vec![leaf("a")]).unwrap()[0];
    let a1 = list.add_children(a, vec![leaf("a1")]).unwrap()[0];
    list.poll_scroll_at(Instant::now() + SCROLL_DELAY);
    driver.take();

    // `a` is collapsed: none of this is visible.
    list.add_children(a1, vec![leaf("a1x")]).unwrap();
    list.insert_children(a, 0, vec![leaf("a0")]).unwrap();
    list.remove_children(a, &["a1"]).unwrap();
    list.update_value(a1, "gone".to_string()).unwrap_err();

    assert_eq!(keys(&list), ["a"]);
    assert!(driver.is_empty());
    assert!(!list.has_pending_scroll());
    assert_projection_consistent(&list);
}

#[test]
fn test_pre_expanded_subtree_spec_arrives_fully_visible() {
    let (mut list, driver) = new_list();
    let root = list.root();
    list.add_children(root, vec![leaf("top")]).unwrap();
    driver.take();

    let spec = NodeSpec::new("a", "A".to_string())
        .expanded(true)
        .child(leaf("a1"))
        .child(NodeSpec::new("a2", "A2".to_string()).child(leaf("hidden")));
    list.add_children(root, vec![spec]).unwrap();

    // `hidden` stays hidden: a2 is collapsed.
    assert_eq!(keys(&list), ["top", "a", "a1", "a2"]);
    assert_eq!(
        driver.take(),
        vec![
            DriverCall::Insert(1),
            DriverCall::Insert(2),
            DriverCall::Insert(3)
        ]
    );
    assert_eq!(list.row(2).unwrap().depth, 1);
    assert_projection_consistent(&list);
}

#[test]
fn test_remove_multiple_siblings_processes_blocks_back_to_front() {
    let (mut list, driver) = new_list();
    let root = list.root();
    let ids = list
        .add_children(root, vec![leaf("a"), leaf("b"), leaf("c")])
        .unwrap();
    list.add_children(ids[0], vec![leaf("a1")]).unwrap();
    list.expand(ids[0]).unwrap();
    assert_eq!(keys(&list), ["a", "a1", "b", "c"]);
    driver.take();

    list.remove_children(root, &["a", "c"]).unwrap();
    assert_eq!(keys(&list), ["b"]);

    let removed_indices: Vec<usize> = driver
        .take()
        .into_iter()
        .map(|call| match call {
            DriverCall::Remove { index, .. } => index,
            other => panic!("expected remove, got {other:?}"),
        })
        .collect();
    // c first (index 3), then a's block (1, 0).
    assert_eq!(removed_indices, vec![3, 1, 0]);
    assert_projection_consistent(&list);
}

// =============================================================================
// Updates
// =============================================================================

#[test]
fn test_update_refreshes_projected_row_in_place() {
    let (mut list, driver) = new_list();
    let root = list.root();
    let ids = list.add_children(root, vec![leaf("a"), leaf("b")]).unwrap();
    driver.take();

    list.update_value(ids[1], "B'".to_string()).unwrap();
    assert_eq!(driver.take(), vec![DriverCall::Refresh(1)]);
    assert_eq!(keys(&list), ["a", "b"]);
}

#[test]
fn test_update_of_hidden_node_emits_no_refresh() {
    let (mut list, driver) = new_list();
    let root = list.root();
    let a = list.add_children(root, vec![leaf("a")]).unwrap()[0];
    let a1 = list.add_children(a, vec![leaf("a1")]).unwrap()[0];
    driver.take();

    list.update_value(a1, "A1'".to_string()).unwrap();
    assert!(driver.is_empty());
}

// =============================================================================
// Queries / snapshots
// =============================================================================

#[test]
fn test_index_of_is_none_for_hidden_nodes() {
    let (mut list, _driver) = new_list();
    let root = list.root();
    let a = list.add_children(root, vec![leaf("a")]).unwrap()[0];
    let a1 = list.add_children(a, vec![leaf("a1")]).unwrap()[0];

    assert_eq!(list.index_of(a), Some(0));
    assert_eq!(list.index_of(a1), None);
    list.expand(a).unwrap();
    assert_eq!(list.index_of(a1), Some(1));
}

#[test]
fn test_row_snapshot_carries_key_value_depth() {
    let (mut list, _driver) = new_list();
    let root = list.root();
    let a = list.add_children(root, vec![leaf("a")]).unwrap()[0];
    list.add_children(a, vec![leaf("a1")]).unwrap();
    list.expand(a).unwrap();

    let snapshot = list.row_snapshot(1).unwrap();
    assert_eq!(snapshot.key, "a1");
    assert_eq!(snapshot.value, "A1");
    assert_eq!(snapshot.depth, 1);
    assert!(list.row_snapshot(9).is_none());
}

#[test]
fn test_with_tree_builds_initial_projection_without_animations() {
    let mut tree = Tree::new();
    let root = tree.root();
    let a = tree.add_children(root, vec![leaf("a"), leaf("b")]).unwrap()[0];
    tree.add_children(a, vec![leaf("a1")]).unwrap();
    tree.set_expanded(a, true).unwrap();

    let driver = RecordingDriver::new();
    let list = TreeList::with_tree(tree, Box::new(driver.clone()));
    assert_eq!(keys(&list), ["a", "a1", "b"]);
    assert!(driver.is_empty());
    assert_projection_consistent(&list);
}

// =============================================================================
// Disposal
// =============================================================================

#[test]
fn test_disposed_controller_rejects_mutations() {
    let (mut list, driver) = new_list();
    let root = list.root();
    let a = list.add_children(root, vec![leaf("a")]).unwrap()[0];
    driver.take();

    list.dispose();
    list.dispose(); // idempotent

    assert!(list.is_disposed());
    assert_eq!(
        list.add_children(root, vec![leaf("b")]),
        Err(TreeError::Disposed)
    );
    assert_eq!(list.expand(a), Err(TreeError::Disposed));
    assert_eq!(
        list.update_value(a, "x".to_string()),
        Err(TreeError::Disposed)
    );
    assert!(driver.is_empty());

    // Reads still answer from the last state.
    assert_eq!(keys(&list), ["a"]);
    assert_eq!(list.index_of(a), Some(0));
}

#[test]
fn test_expansion_request_on_root_is_rejected() {
    let (mut list, _driver) = new_list();
    let root = list.root();
    assert_eq!(list.collapse(root), Err(TreeError::RootNode));
    assert_eq!(list.expand(root), Err(TreeError::RootNode));
}
