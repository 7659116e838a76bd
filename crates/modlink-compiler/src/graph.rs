//! Cycle detection and ordering over declaration dependency graphs.
//!
//! Declaration chains can be as long as a unit is, so every traversal here
//! keeps its own stack instead of recursing.

use petgraph::algo::kosaraju_scc;
use petgraph::graph::DiGraph;
use petgraph::visit::DfsPostOrder;

/// Find every cycle among `node_count` declarations.
///
/// Each cycle is returned as its member indices in ascending (declaration)
/// order, and cycles are ordered by their first member, so the result does
/// not depend on edge insertion order.
pub fn find_cycles(node_count: usize, edges: impl IntoIterator<Item = (usize, usize)>) -> Vec<Vec<usize>> {
    let (graph, self_loops) = build(node_count, edges);

    let mut cycles: Vec<Vec<usize>> = kosaraju_scc(&graph)
        .into_iter()
        .map(|scc| {
            let mut members: Vec<_> = scc.into_iter().map(|n| n.index()).collect();
            members.sort_unstable();
            members
        })
        .filter(|members| members.len() > 1 || self_loops[members[0]])
        .collect();
    cycles.sort_unstable_by_key(|members| members[0]);
    cycles
}

/// Order `node_count` declarations so each one follows everything its edges
/// point at, except where a cycle makes that impossible. Roots are taken in
/// declaration order, so independent declarations keep their relative order.
pub fn dependency_order(node_count: usize, edges: impl IntoIterator<Item = (usize, usize)>) -> Vec<usize> {
    let (graph, _) = build(node_count, edges);
    let mut dfs = DfsPostOrder::empty(&graph);
    let mut order = Vec::with_capacity(node_count);
    for root in graph.node_indices() {
        dfs.move_to(root);
        while let Some(node) = dfs.next(&graph) {
            order.push(node.index());
        }
    }
    order
}

fn build(node_count: usize, edges: impl IntoIterator<Item = (usize, usize)>) -> (DiGraph<(), ()>, Vec<bool>) {
    let mut graph = DiGraph::<(), ()>::with_capacity(node_count, node_count);
    let nodes: Vec<_> = (0..node_count).map(|_| graph.add_node(())).collect();
    let mut self_loops = vec![false; node_count];

    for (from, to) in edges {
        if from == to {
            self_loops[from] = true;
        }
        graph.add_edge(nodes[from], nodes[to], ());
    }
    (graph, self_loops)
}
