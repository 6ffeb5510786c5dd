use crate::catalog::Glyph;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Pixels per inch used to convert Graphviz-style attributes (`nodesep`, `pad`, ...).
pub const POINTS_PER_INCH: f32 = 72.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    TopDown,
    BottomTop,
    LeftRight,
    RightLeft,
}

impl Direction {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "TD" | "TB" => Some(Self::TopDown),
            "BT" => Some(Self::BottomTop),
            "LR" => Some(Self::LeftRight),
            "RL" => Some(Self::RightLeft),
            _ => None,
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            Self::TopDown => "TB",
            Self::BottomTop => "BT",
            Self::LeftRight => "LR",
            Self::RightLeft => "RL",
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::LeftRight | Self::RightLeft)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Splines {
    Spline,
    Polyline,
    Line,
    Ortho,
}

impl Splines {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "spline" | "true" => Some(Self::Spline),
            "polyline" => Some(Self::Polyline),
            "line" | "false" => Some(Self::Line),
            "ortho" => Some(Self::Ortho),
            _ => None,
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            Self::Spline => "spline",
            Self::Polyline => "polyline",
            Self::Line => "line",
            Self::Ortho => "ortho",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Svg,
    Dot,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
            Self::Dot => "dot",
        }
    }
}

/// Graph-level attributes, in Graphviz units (inches for spacing).
#[derive(Debug, Clone, PartialEq)]
pub struct GraphAttrs {
    pub rankdir: Direction,
    pub splines: Splines,
    pub pad: f32,
    pub nodesep: f32,
    pub ranksep: f32,
    pub fontname: String,
    pub fontsize: f32,
    pub fontcolor: String,
    pub bgcolor: Option<String>,
}

impl Default for GraphAttrs {
    fn default() -> Self {
        Self {
            rankdir: Direction::LeftRight,
            splines: Splines::Ortho,
            pad: 2.0,
            nodesep: 0.60,
            ranksep: 0.75,
            fontname: "Sans-Serif".to_string(),
            fontsize: 15.0,
            fontcolor: "#2D3436".to_string(),
            bgcolor: None,
        }
    }
}

impl GraphAttrs {
    pub fn pad_px(&self) -> f32 {
        self.pad * POINTS_PER_INCH
    }

    pub fn nodesep_px(&self) -> f32 {
        self.nodesep * POINTS_PER_INCH
    }

    pub fn ranksep_px(&self) -> f32 {
        self.ranksep * POINTS_PER_INCH
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiagramOptions {
    pub filename: Option<String>,
    pub format: OutputFormat,
    pub graph: GraphAttrs,
}

impl Default for DiagramOptions {
    fn default() -> Self {
        Self {
            filename: None,
            format: OutputFormat::Png,
            graph: GraphAttrs::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusterId(pub usize);

impl NodeId {
    /// Stable textual key, also used as the DOT identifier.
    pub fn key(self) -> String {
        format!("n{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Icon {
    Glyph(Glyph),
    Custom(PathBuf),
}

impl Icon {
    pub fn custom(path: impl AsRef<Path>) -> Self {
        Self::Custom(path.as_ref().to_path_buf())
    }
}

impl From<Glyph> for Icon {
    fn from(glyph: Glyph) -> Self {
        Self::Glyph(glyph)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub label: String,
    pub icon: Icon,
    pub cluster: Option<ClusterId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
    Bold,
}

impl EdgeStyle {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "solid" | "" => Some(Self::Solid),
            "dashed" => Some(Self::Dashed),
            "dotted" => Some(Self::Dotted),
            "bold" => Some(Self::Bold),
            _ => None,
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            Self::Solid => "solid",
            Self::Dashed => "dashed",
            Self::Dotted => "dotted",
            Self::Bold => "bold",
        }
    }
}

/// Which ends of an edge carry an arrowhead (Graphviz `dir`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgeDirection {
    #[default]
    Forward,
    Back,
    Both,
    None,
}

impl EdgeDirection {
    pub fn as_token(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Back => "back",
            Self::Both => "both",
            Self::None => "none",
        }
    }

    pub fn arrow_start(self) -> bool {
        matches!(self, Self::Back | Self::Both)
    }

    pub fn arrow_end(self) -> bool {
        matches!(self, Self::Forward | Self::Both)
    }
}

/// Attributes attached to an edge declaration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeAttrs {
    pub label: Option<String>,
    pub style: EdgeStyle,
    pub color: Option<String>,
    pub direction: EdgeDirection,
}

impl EdgeAttrs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labeled(label: impl Into<String>) -> Self {
        Self::new().label(label)
    }

    pub fn dashed(color: &str) -> Self {
        Self::new().style(EdgeStyle::Dashed).color(color)
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn style(mut self, style: EdgeStyle) -> Self {
        self.style = style;
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn direction(mut self, direction: EdgeDirection) -> Self {
        self.direction = direction;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub attrs: EdgeAttrs,
}

impl Edge {
    pub fn label(&self) -> Option<&str> {
        self.attrs.label.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterAttrs {
    pub style: EdgeStyle,
    pub bgcolor: Option<String>,
    pub pencolor: Option<String>,
}

impl ClusterAttrs {
    pub fn dashed() -> Self {
        Self {
            style: EdgeStyle::Dashed,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct Cluster {
    pub id: ClusterId,
    pub label: String,
    pub parent: Option<ClusterId>,
    pub depth: usize,
    pub attrs: ClusterAttrs,
}

/// An edge with a source but no target. Dropping it declares nothing.
#[derive(Debug, Clone)]
#[must_use = "an edge without a target is never drawn"]
pub struct PendingEdge {
    pub from: NodeId,
    pub attrs: EdgeAttrs,
}

impl PendingEdge {
    /// Completes the edge, adding it to the diagram.
    pub fn to(self, diagram: &mut Diagram, to: NodeId) {
        diagram.connect(self.from, to, self.attrs);
    }
}

#[derive(Debug, Clone)]
pub struct Diagram {
    pub name: String,
    pub options: DiagramOptions,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    clusters: Vec<Cluster>,
    open_clusters: Vec<ClusterId>,
}

impl Diagram {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_options(name, DiagramOptions::default())
    }

    pub fn with_options(name: impl Into<String>, options: DiagramOptions) -> Self {
        Self {
            name: name.into(),
            options,
            nodes: Vec::new(),
            edges: Vec::new(),
            clusters: Vec::new(),
            open_clusters: Vec::new(),
        }
    }

    /// Output file stem: the explicit filename, or the name in snake case.
    pub fn filename(&self) -> String {
        match &self.options.filename {
            Some(name) => name.clone(),
            None => self
                .name
                .split_whitespace()
                .collect::<Vec<_>>()
                .join("_")
                .to_lowercase(),
        }
    }

    pub fn output_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!(
            "{}.{}",
            self.filename(),
            self.options.format.extension()
        ))
    }

    /// Declares a node inside the innermost open cluster.
    pub fn node(&mut self, label: impl Into<String>, icon: impl Into<Icon>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id,
            label: label.into(),
            icon: icon.into(),
            cluster: self.open_clusters.last().copied(),
        });
        id
    }

    /// Runs `build` with a new cluster open; nodes declared inside belong to it.
    pub fn cluster<R>(
        &mut self,
        label: impl Into<String>,
        attrs: ClusterAttrs,
        build: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let id = ClusterId(self.clusters.len());
        let parent = self.open_clusters.last().copied();
        self.clusters.push(Cluster {
            id,
            label: label.into(),
            parent,
            depth: self.open_clusters.len(),
            attrs,
        });
        self.open_clusters.push(id);
        let result = build(self);
        self.open_clusters.pop();
        result
    }

    pub fn connect(&mut self, from: NodeId, to: NodeId, attrs: EdgeAttrs) {
        self.edges.push(Edge { from, to, attrs });
    }

    /// `from << to`: the edge runs from `from` to `to` but the arrowhead sits on `from`.
    pub fn connect_back(&mut self, from: NodeId, to: NodeId, attrs: EdgeAttrs) {
        let attrs = match attrs.direction {
            EdgeDirection::Forward => attrs.direction(EdgeDirection::Back),
            _ => attrs,
        };
        self.connect(from, to, attrs);
    }

    pub fn chain(&mut self, path: &[NodeId], attrs: EdgeAttrs) {
        for pair in path.windows(2) {
            self.connect(pair[0], pair[1], attrs.clone());
        }
    }

    pub fn fan_out(&mut self, from: NodeId, targets: &[NodeId], attrs: EdgeAttrs) {
        for to in targets {
            self.connect(from, *to, attrs.clone());
        }
    }

    pub fn fan_in(&mut self, sources: &[NodeId], to: NodeId, attrs: EdgeAttrs) {
        for from in sources {
            self.connect(*from, to, attrs.clone());
        }
    }

    pub fn dangling(&self, from: NodeId, attrs: EdgeAttrs) -> PendingEdge {
        PendingEdge { from, attrs }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn get_cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.get(id.0)
    }

    /// True if `cluster` is `ancestor` or nested somewhere inside it.
    pub fn cluster_within(&self, cluster: ClusterId, ancestor: ClusterId) -> bool {
        let mut current = Some(cluster);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get_cluster(id).and_then(|c| c.parent);
        }
        false
    }

    /// Nodes inside `cluster`, including those of nested clusters.
    pub fn cluster_members(&self, cluster: ClusterId) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|node| {
                node.cluster
                    .is_some_and(|own| self.cluster_within(own, cluster))
            })
            .map(|node| node.id)
            .collect()
    }

    /// Direct child clusters of `parent` (`None` for top level).
    pub fn child_clusters(&self, parent: Option<ClusterId>) -> Vec<ClusterId> {
        self.clusters
            .iter()
            .filter(|c| c.parent == parent)
            .map(|c| c.id)
            .collect()
    }

    /// Edge count per unordered endpoint pair, used to fan out parallel edges.
    pub fn edge_pair_counts(&self) -> BTreeMap<(NodeId, NodeId), usize> {
        let mut counts = BTreeMap::new();
        for edge in &self.edges {
            *counts.entry(pair_key(edge.from, edge.to)).or_insert(0) += 1;
        }
        counts
    }
}

pub(crate) fn pair_key(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a <= b { (a, b) } else { (b, a) }
}
