use crate::config::LayoutConfig;
use crate::ir::{ClusterId, Diagram, Direction, EdgeStyle, Icon, NodeId, Splines};
use crate::text_metrics::text_width;
use crate::theme::Theme;
use dagre_rust::{
    GraphConfig as DagreConfig, GraphEdge as DagreEdge, GraphNode as DagreNode,
    layout as dagre_layout,
};
use graphlib_rust::{Graph as DagreGraph, GraphOption};
use log::{debug, warn};
use std::collections::{BTreeMap, HashSet};
use std::panic::{self, AssertUnwindSafe};

mod ranking;
mod routing;

#[derive(Debug, Clone)]
pub struct TextBlock {
    pub lines: Vec<String>,
    pub width: f32,
    pub height: f32,
}

impl TextBlock {
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|line| line.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct NodeLayout {
    pub id: NodeId,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub icon: Icon,
    pub icon_size: f32,
    pub label: TextBlock,
    pub cluster: Option<ClusterId>,
}

impl NodeLayout {
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Top-left corner of the icon square, centred horizontally above the label.
    pub fn icon_origin(&self) -> (f32, f32) {
        (self.x + (self.width - self.icon_size) / 2.0, self.y)
    }

    /// Centre of the first label line's box.
    pub fn label_center(&self, gap: f32) -> (f32, f32) {
        (
            self.x + self.width / 2.0,
            self.y + self.icon_size + gap + self.label.height / 2.0,
        )
    }
}

#[derive(Debug, Clone)]
pub struct EdgeLayout {
    pub index: usize,
    pub from: NodeId,
    pub to: NodeId,
    pub points: Vec<(f32, f32)>,
    pub label: Option<TextBlock>,
    pub label_position: Option<(f32, f32)>,
    pub style: EdgeStyle,
    pub color: String,
    pub arrow_start: bool,
    pub arrow_end: bool,
}

#[derive(Debug, Clone)]
pub struct ClusterLayout {
    pub id: ClusterId,
    pub label: String,
    pub depth: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub dashed: bool,
    pub background: String,
    pub border: String,
}

#[derive(Debug, Clone)]
pub struct TitleLayout {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
}

#[derive(Debug, Clone)]
pub struct Layout {
    pub direction: Direction,
    pub splines: Splines,
    pub nodes: BTreeMap<NodeId, NodeLayout>,
    pub edges: Vec<EdgeLayout>,
    pub clusters: Vec<ClusterLayout>,
    pub title: Option<TitleLayout>,
    /// Family for node and edge labels.
    pub font_family: String,
    /// Family for the title and cluster labels, led by the graph `fontname`.
    pub title_font_family: String,
    pub label_gap: f32,
    pub width: f32,
    pub height: f32,
}

pub fn compute_layout(diagram: &Diagram, theme: &Theme, config: &LayoutConfig) -> Layout {
    let attrs = &diagram.options.graph;
    let font_family = theme.font_family.clone();
    let title_font_family = effective_font(&attrs.fontname, theme);

    let mut nodes: BTreeMap<NodeId, NodeLayout> = BTreeMap::new();
    for node in diagram.nodes() {
        let label = measure_label(&node.label, theme.font_size, &font_family, config);
        let width = config.icon_size.max(label.width);
        let height = if label.is_empty() {
            config.icon_size
        } else {
            config.icon_size + config.label_gap + label.height
        };
        nodes.insert(
            node.id,
            NodeLayout {
                id: node.id,
                x: 0.0,
                y: 0.0,
                width,
                height,
                icon: node.icon.clone(),
                icon_size: config.icon_size,
                label,
                cluster: node.cluster,
            },
        );
    }

    let used_dagre = config.use_dagre && assign_positions_dagre(diagram, &mut nodes);
    if !used_dagre {
        if config.use_dagre {
            warn!("dagre produced no usable positions, falling back to manual ranking");
        }
        ranking::assign_positions_manual(diagram, &mut nodes, config);
    }
    debug!(
        "placed {} nodes ({})",
        nodes.len(),
        if used_dagre { "dagre" } else { "manual" }
    );

    let mut clusters = compute_cluster_boxes(diagram, &nodes, theme, config);
    let mut edges = routing::route_edges(diagram, &nodes, theme, config, &font_family);
    routing::place_edge_labels(&mut edges, &nodes);

    if !used_dagre {
        apply_direction_mirror(attrs.rankdir, &mut nodes, &mut edges, &mut clusters);
    }

    let pad = attrs.pad_px();
    normalize_layout(&mut nodes, &mut edges, &mut clusters, pad);
    let (content_w, content_h) = content_bounds(&nodes, &edges, &clusters);

    let mut width = content_w + pad;
    let mut height = content_h + pad;
    let title = (!diagram.name.trim().is_empty()).then(|| {
        let font_size = attrs.fontsize.max(1.0);
        let title_width = text_width(&diagram.name, font_size, &title_font_family);
        width = width.max(title_width + pad * 2.0);
        let y = content_h + font_size * 1.6;
        height = y + pad.max(font_size * 0.6);
        TitleLayout {
            text: diagram.name.clone(),
            x: width / 2.0,
            y,
            font_size,
        }
    });

    Layout {
        direction: attrs.rankdir,
        splines: attrs.splines,
        nodes,
        edges,
        clusters,
        title,
        font_family,
        title_font_family,
        label_gap: config.label_gap,
        width,
        height,
    }
}

fn effective_font(fontname: &str, theme: &Theme) -> String {
    if fontname.trim().is_empty() || fontname.eq_ignore_ascii_case("sans-serif") {
        theme.font_family.clone()
    } else {
        format!("{fontname}, {}", theme.font_family)
    }
}

fn assign_positions_dagre(
    diagram: &Diagram,
    nodes: &mut BTreeMap<NodeId, NodeLayout>,
) -> bool {
    if nodes.is_empty() {
        return false;
    }
    let attrs = &diagram.options.graph;

    // Compound mode lets dagre keep cluster members together.
    let compound_enabled = !diagram.clusters().is_empty();
    let mut dagre_graph: DagreGraph<DagreConfig, DagreNode, DagreEdge> =
        DagreGraph::new(Some(GraphOption {
            directed: Some(true),
            multigraph: Some(false),
            compound: Some(compound_enabled),
        }));

    let mut graph_config = DagreConfig::default();
    graph_config.rankdir = Some(dagre_rankdir(attrs.rankdir).to_string());
    graph_config.nodesep = Some(attrs.nodesep_px());
    graph_config.ranksep = Some(attrs.ranksep_px());
    graph_config.marginx = Some(8.0);
    graph_config.marginy = Some(8.0);
    dagre_graph.set_graph(graph_config);

    for layout in nodes.values() {
        let mut node = DagreNode::default();
        node.width = layout.width;
        node.height = layout.height;
        dagre_graph.set_node(layout.id.key(), Some(node));
    }

    if compound_enabled {
        for cluster in diagram.clusters() {
            dagre_graph.set_node(cluster_key(cluster.id), Some(DagreNode::default()));
        }
        for cluster in diagram.clusters() {
            if let Some(parent) = cluster.parent {
                let child_key = cluster_key(cluster.id);
                let _ = dagre_graph.set_parent(&child_key, Some(cluster_key(parent)));
            }
        }
        for layout in nodes.values() {
            if let Some(cluster) = layout.cluster {
                let node_key = layout.id.key();
                let _ = dagre_graph.set_parent(&node_key, Some(cluster_key(cluster)));
            }
        }
    }

    let mut edge_set: HashSet<(NodeId, NodeId)> = HashSet::new();
    for edge in diagram.edges() {
        if edge.from == edge.to || !edge_set.insert((edge.from, edge.to)) {
            continue;
        }
        let from = edge.from.key();
        let to = edge.to.key();
        let mut edge_label = DagreEdge::default();
        edge_label.minlen = Some(1.0);
        let _ = dagre_graph.set_edge(&from, &to, Some(edge_label), None);
    }

    // dagre_rust panics on some compound graphs; treat that as "no positions".
    let ran = panic::catch_unwind(AssertUnwindSafe(|| {
        dagre_layout::run_layout(&mut dagre_graph);
    }));
    if ran.is_err() {
        debug!("dagre panicked while laying out '{}'", diagram.name);
        return false;
    }

    let mut placed: Vec<(NodeId, f32, f32)> = Vec::with_capacity(nodes.len());
    for layout in nodes.values() {
        let key = layout.id.key();
        let Some(dagre_node) = dagre_graph.node(&key) else {
            return false;
        };
        if !dagre_node.x.is_finite() || !dagre_node.y.is_finite() {
            return false;
        }
        placed.push((layout.id, dagre_node.x, dagre_node.y));
    }

    for (id, cx, cy) in placed {
        if let Some(node) = nodes.get_mut(&id) {
            node.x = cx - node.width / 2.0;
            node.y = cy - node.height / 2.0;
        }
    }
    true
}

fn dagre_rankdir(direction: Direction) -> &'static str {
    match direction {
        Direction::TopDown => "tb",
        Direction::BottomTop => "bt",
        Direction::LeftRight => "lr",
        Direction::RightLeft => "rl",
    }
}

fn cluster_key(id: ClusterId) -> String {
    format!("cluster_{}", id.0)
}

/// Cluster rectangles, innermost first so parents can enclose their children.
fn compute_cluster_boxes(
    diagram: &Diagram,
    nodes: &BTreeMap<NodeId, NodeLayout>,
    theme: &Theme,
    config: &LayoutConfig,
) -> Vec<ClusterLayout> {
    let mut order: Vec<&crate::ir::Cluster> = diagram.clusters().iter().collect();
    order.sort_by(|a, b| b.depth.cmp(&a.depth).then(a.id.cmp(&b.id)));

    let mut boxes: BTreeMap<ClusterId, ClusterLayout> = BTreeMap::new();
    for cluster in order {
        let mut min_x = f32::MAX;
        let mut min_y = f32::MAX;
        let mut max_x = f32::MIN;
        let mut max_y = f32::MIN;
        let mut extend = |x: f32, y: f32, w: f32, h: f32| {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x + w);
            max_y = max_y.max(y + h);
        };
        for node in nodes.values() {
            if node.cluster == Some(cluster.id) {
                extend(node.x, node.y, node.width, node.height);
            }
        }
        for child in diagram.child_clusters(Some(cluster.id)) {
            if let Some(inner) = boxes.get(&child) {
                extend(inner.x, inner.y, inner.width, inner.height);
            }
        }
        if min_x > max_x {
            continue;
        }

        let pad = config.cluster_padding;
        let label_band = if cluster.label.trim().is_empty() {
            0.0
        } else {
            config.cluster_label_height
        };
        boxes.insert(
            cluster.id,
            ClusterLayout {
                id: cluster.id,
                label: cluster.label.clone(),
                depth: cluster.depth,
                x: min_x - pad,
                y: min_y - pad - label_band,
                width: max_x - min_x + pad * 2.0,
                height: max_y - min_y + pad * 2.0 + label_band,
                dashed: cluster.attrs.style == EdgeStyle::Dashed,
                background: cluster
                    .attrs
                    .bgcolor
                    .clone()
                    .unwrap_or_else(|| theme.cluster_background(cluster.depth).to_string()),
                border: cluster
                    .attrs
                    .pencolor
                    .clone()
                    .unwrap_or_else(|| theme.cluster_border.clone()),
            },
        );
    }

    // Outer clusters are painted first.
    let mut out: Vec<ClusterLayout> = boxes.into_values().collect();
    out.sort_by(|a, b| a.depth.cmp(&b.depth).then(a.id.cmp(&b.id)));
    out
}

fn content_bounds(
    nodes: &BTreeMap<NodeId, NodeLayout>,
    edges: &[EdgeLayout],
    clusters: &[ClusterLayout],
) -> (f32, f32) {
    let mut max_x: f32 = 0.0;
    let mut max_y: f32 = 0.0;
    for node in nodes.values() {
        max_x = max_x.max(node.x + node.width);
        max_y = max_y.max(node.y + node.height);
    }
    for cluster in clusters {
        max_x = max_x.max(cluster.x + cluster.width);
        max_y = max_y.max(cluster.y + cluster.height);
    }
    for edge in edges {
        for (x, y) in &edge.points {
            max_x = max_x.max(*x);
            max_y = max_y.max(*y);
        }
        if let (Some(label), Some((x, y))) = (&edge.label, edge.label_position) {
            max_x = max_x.max(x + label.width / 2.0);
            max_y = max_y.max(y + label.height / 2.0);
        }
    }
    (max_x, max_y)
}

fn apply_direction_mirror(
    direction: Direction,
    nodes: &mut BTreeMap<NodeId, NodeLayout>,
    edges: &mut [EdgeLayout],
    clusters: &mut [ClusterLayout],
) {
    if !matches!(direction, Direction::RightLeft | Direction::BottomTop) {
        return;
    }
    let (max_x, max_y) = content_bounds(nodes, edges, clusters);
    let flip_x = direction == Direction::RightLeft;
    for node in nodes.values_mut() {
        if flip_x {
            node.x = max_x - node.x - node.width;
        } else {
            node.y = max_y - node.y - node.height;
        }
    }
    for edge in edges.iter_mut() {
        for point in edge.points.iter_mut() {
            if flip_x {
                point.0 = max_x - point.0;
            } else {
                point.1 = max_y - point.1;
            }
        }
        if let Some(pos) = edge.label_position.as_mut() {
            if flip_x {
                pos.0 = max_x - pos.0;
            } else {
                pos.1 = max_y - pos.1;
            }
        }
    }
    for cluster in clusters.iter_mut() {
        if flip_x {
            cluster.x = max_x - cluster.x - cluster.width;
        } else {
            cluster.y = max_y - cluster.y - cluster.height;
        }
    }
}

/// Shifts everything so the top-left content corner sits at `(padding, padding)`.
fn normalize_layout(
    nodes: &mut BTreeMap<NodeId, NodeLayout>,
    edges: &mut [EdgeLayout],
    clusters: &mut [ClusterLayout],
    padding: f32,
) {
    let mut min_x = f32::MAX;
    let mut min_y = f32::MAX;
    for node in nodes.values() {
        min_x = min_x.min(node.x);
        min_y = min_y.min(node.y);
    }
    for cluster in clusters.iter() {
        min_x = min_x.min(cluster.x);
        min_y = min_y.min(cluster.y);
    }
    for edge in edges.iter() {
        for (x, y) in &edge.points {
            min_x = min_x.min(*x);
            min_y = min_y.min(*y);
        }
        if let (Some(label), Some((x, y))) = (&edge.label, edge.label_position) {
            min_x = min_x.min(x - label.width / 2.0);
            min_y = min_y.min(y - label.height / 2.0);
        }
    }
    if min_x == f32::MAX {
        return;
    }

    let shift_x = padding - min_x;
    let shift_y = padding - min_y;
    for node in nodes.values_mut() {
        node.x += shift_x;
        node.y += shift_y;
    }
    for edge in edges.iter_mut() {
        for point in edge.points.iter_mut() {
            point.0 += shift_x;
            point.1 += shift_y;
        }
        if let Some(pos) = edge.label_position.as_mut() {
            pos.0 += shift_x;
            pos.1 += shift_y;
        }
    }
    for cluster in clusters.iter_mut() {
        cluster.x += shift_x;
        cluster.y += shift_y;
    }
}

pub(crate) fn measure_label(
    text: &str,
    font_size: f32,
    font_family: &str,
    config: &LayoutConfig,
) -> TextBlock {
    let mut lines = Vec::new();
    for line in split_lines(text) {
        lines.extend(wrap_line(&line, config.max_label_width_chars));
    }
    if lines.is_empty() {
        lines.push(String::new());
    }

    let width = lines
        .iter()
        .map(|line| text_width(line, font_size, font_family))
        .fold(0.0f32, f32::max);
    let height = if lines.iter().all(|l| l.is_empty()) {
        0.0
    } else {
        lines.len() as f32 * font_size * config.label_line_height
    };

    TextBlock {
        lines,
        width,
        height,
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.replace("\\n", "\n")
        .split('\n')
        .map(|line| line.trim().to_string())
        .collect()
}

fn wrap_line(line: &str, max_chars: usize) -> Vec<String> {
    if line.chars().count() <= max_chars {
        return vec![line.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if candidate.chars().count() > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Glyph;
    use crate::ir::{ClusterAttrs, EdgeAttrs};

    fn manual() -> LayoutConfig {
        LayoutConfig {
            use_dagre: false,
            ..LayoutConfig::default()
        }
    }

    fn sample() -> Diagram {
        let mut d = Diagram::new("Sample");
        let user = d.node("User", Glyph::Users);
        let (gw, pod) = d.cluster("Cluster", ClusterAttrs::default(), |d| {
            let gw = d.cluster("Ingress Layer", ClusterAttrs::dashed(), |d| {
                d.node("Gateway", Glyph::Istio)
            });
            (gw, d.node("frontend-pod", Glyph::Pod))
        });
        d.chain(&[user, gw, pod], EdgeAttrs::labeled("HTTPS"));
        d
    }

    #[test]
    fn wraps_long_labels() {
        let lines = wrap_line("tekton pipeline notifications go here", 16);
        assert!(lines.len() >= 2);
        assert!(lines.iter().all(|l| l.chars().count() <= 16));
    }

    #[test]
    fn empty_label_has_no_height() {
        let block = measure_label("", 13.0, "Sans-Serif", &LayoutConfig::default());
        assert!(block.is_empty());
        assert_eq!(block.height, 0.0);
    }

    #[test]
    fn manual_layout_orders_ranks_left_to_right() {
        let d = sample();
        let layout = compute_layout(&d, &Theme::default(), &manual());
        let user = &layout.nodes[&NodeId(0)];
        let gw = &layout.nodes[&NodeId(1)];
        let pod = &layout.nodes[&NodeId(2)];
        assert!(user.x < gw.x);
        assert!(gw.x < pod.x);
        assert_eq!(layout.edges.len(), 2);
    }

    #[test]
    fn clusters_enclose_members_and_nest() {
        let d = sample();
        let layout = compute_layout(&d, &Theme::default(), &manual());
        assert_eq!(layout.clusters.len(), 2);
        let outer = &layout.clusters[0];
        let inner = &layout.clusters[1];
        assert_eq!(outer.label, "Cluster");
        assert!(inner.dashed);
        assert!(inner.x >= outer.x && inner.y >= outer.y);
        assert!(inner.x + inner.width <= outer.x + outer.width);
        for id in d.cluster_members(ClusterId(0)) {
            let node = &layout.nodes[&id];
            assert!(node.x >= outer.x && node.x + node.width <= outer.x + outer.width);
            assert!(node.y >= outer.y && node.y + node.height <= outer.y + outer.height);
        }
    }

    #[test]
    fn layout_is_padded_and_titled() {
        let d = sample();
        let layout = compute_layout(&d, &Theme::default(), &manual());
        let pad = d.options.graph.pad_px();
        let min_x = layout.nodes.values().map(|n| n.x).fold(f32::MAX, f32::min);
        assert!(min_x >= pad - 0.01);
        let title = layout.title.as_ref().unwrap();
        assert_eq!(title.text, "Sample");
        assert!(title.y < layout.height);
    }

    #[test]
    fn layout_is_deterministic() {
        let d = sample();
        let a = compute_layout(&d, &Theme::default(), &manual());
        let b = compute_layout(&d, &Theme::default(), &manual());
        for (id, node) in &a.nodes {
            assert_eq!(node.x, b.nodes[id].x);
            assert_eq!(node.y, b.nodes[id].y);
        }
        assert_eq!(a.width, b.width);
    }

    #[test]
    fn manual_ranking_is_the_default() {
        assert!(!LayoutConfig::default().use_dagre);
        let d = sample();
        let a = compute_layout(&d, &Theme::default(), &LayoutConfig::default());
        let b = compute_layout(&d, &Theme::default(), &manual());
        for (id, node) in &a.nodes {
            assert_eq!((node.x, node.y), (b.nodes[id].x, b.nodes[id].y));
        }
    }

    #[test]
    fn dagre_panic_falls_back_to_manual() {
        let mut d = Diagram::new("Chain");
        let ids = d.cluster("Cluster", ClusterAttrs::default(), |d| {
            (0..12)
                .map(|i| d.node(format!("step {i}"), Glyph::Pod))
                .collect::<Vec<_>>()
        });
        d.chain(&ids, EdgeAttrs::new());
        let config = LayoutConfig {
            use_dagre: true,
            ..LayoutConfig::default()
        };
        let layout = compute_layout(&d, &Theme::default(), &config);
        assert_eq!(layout.nodes.len(), 12);
        assert!(layout.nodes.values().all(|n| n.x.is_finite() && n.y.is_finite()));
        let outer = &layout.clusters[0];
        for node in layout.nodes.values() {
            assert!(node.x >= outer.x && node.x + node.width <= outer.x + outer.width);
        }
    }

    #[test]
    fn graph_font_leads_title_only() {
        let mut d = sample();
        d.options.graph.fontname = "Inter".to_string();
        let theme = Theme::default();
        let layout = compute_layout(&d, &theme, &manual());
        assert_eq!(layout.font_family, theme.font_family);
        assert!(layout.title_font_family.starts_with("Inter, "));
    }

    #[test]
    fn right_left_mirrors_manual_layout() {
        let mut d = sample();
        d.options.graph.rankdir = Direction::RightLeft;
        let layout = compute_layout(&d, &Theme::default(), &manual());
        assert!(layout.nodes[&NodeId(0)].x > layout.nodes[&NodeId(2)].x);
    }
}
