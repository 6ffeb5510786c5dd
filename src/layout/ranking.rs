use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};

use crate::config::LayoutConfig;
use crate::ir::{ClusterId, Diagram, NodeId};

use super::NodeLayout;

/// Layered placement used when dagre is disabled or returns nothing usable.
pub(super) fn assign_positions_manual(
    diagram: &Diagram,
    nodes: &mut BTreeMap<NodeId, NodeLayout>,
    config: &LayoutConfig,
) {
    let node_ids: Vec<NodeId> = nodes.keys().copied().collect();
    let edges: Vec<(NodeId, NodeId)> = diagram
        .edges()
        .iter()
        .filter(|edge| edge.from != edge.to)
        .map(|edge| (edge.from, edge.to))
        .collect();

    let ranks = compute_ranks(&node_ids, &edges);
    let max_rank = ranks.values().copied().max().unwrap_or(0);
    let mut rank_nodes: Vec<Vec<NodeId>> = vec![Vec::new(); max_rank + 1];
    for id in &node_ids {
        rank_nodes[*ranks.get(id).unwrap_or(&0)].push(*id);
    }

    order_rank_nodes(&mut rank_nodes, &edges, config.order_passes);
    group_by_cluster(diagram, &mut rank_nodes);

    let attrs = &diagram.options.graph;
    let horizontal = attrs.rankdir.is_horizontal();
    let cluster_gap = config.cluster_padding * 2.0 + config.cluster_label_height;

    // Cross-axis extent of each rank, so ranks can be centred on each other.
    let mut extents: Vec<f32> = Vec::with_capacity(rank_nodes.len());
    for bucket in &rank_nodes {
        let mut extent = 0.0;
        for (idx, id) in bucket.iter().enumerate() {
            let node = &nodes[id];
            extent += if horizontal { node.height } else { node.width };
            if idx > 0 {
                extent += attrs.nodesep_px();
                if nodes[&bucket[idx - 1]].cluster != node.cluster {
                    extent += cluster_gap;
                }
            }
        }
        extents.push(extent);
    }
    let widest = extents.iter().copied().fold(0.0f32, f32::max);

    let mut main_cursor = 0.0;
    for (rank, bucket) in rank_nodes.iter().enumerate() {
        let mut cross_cursor = (widest - extents[rank]) / 2.0;
        let mut max_main: f32 = 0.0;
        let mut previous: Option<Option<ClusterId>> = None;
        for id in bucket {
            let Some(node) = nodes.get_mut(id) else {
                continue;
            };
            if let Some(prev) = previous
                && prev != node.cluster
            {
                cross_cursor += cluster_gap;
            }
            previous = Some(node.cluster);
            if horizontal {
                node.x = main_cursor;
                node.y = cross_cursor;
                cross_cursor += node.height + attrs.nodesep_px();
                max_main = max_main.max(node.width);
            } else {
                node.x = cross_cursor;
                node.y = main_cursor;
                cross_cursor += node.width + attrs.nodesep_px();
                max_main = max_main.max(node.height);
            }
        }
        main_cursor += max_main + attrs.ranksep_px();
    }
}

/// Longest-path ranks over a topological order. Cycles are broken at the
/// earliest-declared remaining node; its incoming edges become back-edges.
pub(super) fn compute_ranks(
    node_ids: &[NodeId],
    edges: &[(NodeId, NodeId)],
) -> HashMap<NodeId, usize> {
    let set: HashSet<NodeId> = node_ids.iter().copied().collect();
    let mut adj: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    let mut indeg: HashMap<NodeId, usize> = node_ids.iter().map(|id| (*id, 0)).collect();

    for (from, to) in edges {
        if set.contains(from) && set.contains(to) {
            adj.entry(*from).or_default().push(*to);
            *indeg.entry(*to).or_insert(0) += 1;
        }
    }

    let mut ready: BinaryHeap<Reverse<NodeId>> = node_ids
        .iter()
        .filter(|id| indeg[*id] == 0)
        .map(|id| Reverse(*id))
        .collect();

    let mut order = Vec::with_capacity(set.len());
    let mut processed: HashSet<NodeId> = HashSet::new();
    loop {
        while let Some(Reverse(id)) = ready.pop() {
            if !processed.insert(id) {
                continue;
            }
            order.push(id);
            for next in adj.get(&id).into_iter().flatten() {
                if processed.contains(next) {
                    continue;
                }
                if let Some(deg) = indeg.get_mut(next) {
                    *deg = deg.saturating_sub(1);
                    if *deg == 0 {
                        ready.push(Reverse(*next));
                    }
                }
            }
        }

        if processed.len() >= set.len() {
            break;
        }
        match node_ids.iter().find(|id| !processed.contains(id)) {
            Some(id) => ready.push(Reverse(*id)),
            None => break,
        }
    }

    let order_index: HashMap<NodeId, usize> =
        order.iter().enumerate().map(|(idx, id)| (*id, idx)).collect();

    let mut ranks: HashMap<NodeId, usize> = HashMap::new();
    for id in &order {
        let rank = *ranks.entry(*id).or_insert(0);
        let from_idx = order_index[id];
        for next in adj.get(id).into_iter().flatten() {
            if order_index.get(next).is_none_or(|to_idx| *to_idx <= from_idx) {
                continue;
            }
            let entry = ranks.entry(*next).or_insert(0);
            *entry = (*entry).max(rank + 1);
        }
    }
    ranks
}

/// Median-heuristic sweeps, down then up, to reduce crossings.
pub(super) fn order_rank_nodes(
    rank_nodes: &mut [Vec<NodeId>],
    edges: &[(NodeId, NodeId)],
    passes: usize,
) {
    if rank_nodes.len() <= 1 {
        return;
    }
    let mut incoming: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    let mut outgoing: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for (from, to) in edges {
        outgoing.entry(*from).or_default().push(*to);
        incoming.entry(*to).or_default().push(*from);
    }

    let mut positions: HashMap<NodeId, usize> = HashMap::new();
    let update_positions = |rank_nodes: &[Vec<NodeId>], positions: &mut HashMap<NodeId, usize>| {
        positions.clear();
        for bucket in rank_nodes {
            for (idx, id) in bucket.iter().enumerate() {
                positions.insert(*id, idx);
            }
        }
    };
    update_positions(rank_nodes, &mut positions);

    let sort_bucket = |bucket: &mut Vec<NodeId>,
                       neighbors: &HashMap<NodeId, Vec<NodeId>>,
                       positions: &HashMap<NodeId, usize>| {
        let current: HashMap<NodeId, usize> =
            bucket.iter().enumerate().map(|(idx, id)| (*id, idx)).collect();
        bucket.sort_by(|a, b| {
            let a_score = median_position(*a, neighbors, positions, &current);
            let b_score = median_position(*b, neighbors, positions, &current);
            a_score
                .partial_cmp(&b_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| current[a].cmp(&current[b]))
        });
    };

    for _ in 0..passes.max(1) {
        for rank in 1..rank_nodes.len() {
            if rank_nodes[rank].len() > 1 {
                sort_bucket(&mut rank_nodes[rank], &incoming, &positions);
                update_positions(rank_nodes, &mut positions);
            }
        }
        for rank in (0..rank_nodes.len() - 1).rev() {
            if rank_nodes[rank].len() > 1 {
                sort_bucket(&mut rank_nodes[rank], &outgoing, &positions);
                update_positions(rank_nodes, &mut positions);
            }
        }
    }
}

fn median_position(
    id: NodeId,
    neighbors: &HashMap<NodeId, Vec<NodeId>>,
    positions: &HashMap<NodeId, usize>,
    current: &HashMap<NodeId, usize>,
) -> f32 {
    let fallback = *current.get(&id).unwrap_or(&0) as f32;
    let Some(list) = neighbors.get(&id) else {
        return fallback;
    };
    let mut values: Vec<f32> = list
        .iter()
        .filter_map(|neighbor| positions.get(neighbor).map(|pos| *pos as f32))
        .collect();
    if values.is_empty() {
        return fallback;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) * 0.5
    }
}

/// Keeps members of the same cluster adjacent within each rank.
fn group_by_cluster(diagram: &Diagram, rank_nodes: &mut [Vec<NodeId>]) {
    let chain = |id: &NodeId| -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = diagram.get_node(*id).and_then(|node| node.cluster);
        while let Some(cluster) = current {
            path.push(cluster.0);
            current = diagram.get_cluster(cluster).and_then(|c| c.parent);
        }
        path.reverse();
        path
    };
    for bucket in rank_nodes.iter_mut() {
        bucket.sort_by_cached_key(chain);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<NodeId> {
        (0..n).map(NodeId).collect()
    }

    #[test]
    fn ranks_follow_longest_path() {
        let n = ids(4);
        let edges = vec![(n[0], n[1]), (n[1], n[2]), (n[0], n[2]), (n[2], n[3])];
        let ranks = compute_ranks(&n, &edges);
        assert_eq!(ranks[&n[0]], 0);
        assert_eq!(ranks[&n[1]], 1);
        assert_eq!(ranks[&n[2]], 2);
        assert_eq!(ranks[&n[3]], 3);
    }

    #[test]
    fn cycles_still_rank_every_node() {
        let n = ids(3);
        let edges = vec![(n[0], n[1]), (n[1], n[2]), (n[2], n[0])];
        let ranks = compute_ranks(&n, &edges);
        assert_eq!(ranks.len(), 3);
        assert_eq!(ranks[&n[0]], 0);
        assert_eq!(ranks[&n[2]], 2);
    }

    #[test]
    fn ordering_reduces_crossing() {
        let n = ids(4);
        // 0 -> 3 and 1 -> 2 cross when rank 1 is [2, 3].
        let edges = vec![(n[0], n[3]), (n[1], n[2])];
        let mut buckets = vec![vec![n[0], n[1]], vec![n[2], n[3]]];
        order_rank_nodes(&mut buckets, &edges, 2);
        assert_eq!(buckets[1], vec![n[3], n[2]]);
    }
}
