use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use finure_diagram::validate::validate;
use finure_diagram::{
    Config, Diagram, Error, Icon, OutputFormat, RenderTarget, Theme, compute_layout,
    finure_diagram, render, to_dot,
};

fn custom_icon_paths(diagram: &Diagram) -> BTreeSet<PathBuf> {
    diagram
        .nodes()
        .iter()
        .filter_map(|node| match &node.icon {
            Icon::Custom(path) => Some(path.clone()),
            Icon::Glyph(_) => None,
        })
        .collect()
}

#[cfg(feature = "png")]
fn icon_bytes() -> Vec<u8> {
    let mut pixmap = resvg::tiny_skia::Pixmap::new(16, 16).expect("pixmap");
    pixmap.fill(resvg::tiny_skia::Color::from_rgba8(0x32, 0x6c, 0xe5, 0xff));
    pixmap.encode_png().expect("encode icon")
}

#[cfg(not(feature = "png"))]
fn icon_bytes() -> Vec<u8> {
    b"<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"16\" height=\"16\"><rect width=\"16\" height=\"16\" fill=\"#326ce5\"/></svg>".to_vec()
}

/// Writes a placeholder image for every custom icon the diagram references.
fn write_icons(dir: &Path, diagram: &Diagram) {
    let bytes = icon_bytes();
    for path in custom_icon_paths(diagram) {
        let target = dir.join(&path);
        std::fs::create_dir_all(target.parent().expect("icon parent")).expect("icon dir");
        std::fs::write(target, &bytes).expect("icon write");
    }
}

fn with_format(format: OutputFormat) -> Diagram {
    let mut diagram = finure_diagram();
    diagram.options.format = format;
    diagram
}

#[test]
fn declaration_counts_are_deterministic() {
    let first = finure_diagram();
    let second = finure_diagram();
    assert_eq!(first.nodes().len(), 58);
    assert_eq!(first.edges().len(), 82);
    assert_eq!(first.nodes().len(), second.nodes().len());
    assert_eq!(first.edges().len(), second.edges().len());
    for (a, b) in first.nodes().iter().zip(second.nodes()) {
        assert_eq!(a.label, b.label);
        assert_eq!(a.icon, b.icon);
    }
    for (a, b) in first.edges().iter().zip(second.edges()) {
        assert_eq!((a.from, a.to), (b.from, b.to));
        assert_eq!(a.attrs, b.attrs);
    }
}

#[test]
fn every_edge_references_declared_nodes() {
    let diagram = finure_diagram();
    let ids: BTreeSet<_> = diagram.nodes().iter().map(|node| node.id).collect();
    for edge in diagram.edges() {
        assert!(ids.contains(&edge.from), "edge from {:?}", edge.from);
        assert!(ids.contains(&edge.to), "edge to {:?}", edge.to);
    }
    validate(&diagram).expect("duplicate labels must not fail validation");
}

#[test]
fn uses_nineteen_distinct_icon_files() {
    let paths = custom_icon_paths(&finure_diagram());
    assert_eq!(paths.len(), 19);
    assert!(paths.iter().all(|p| p.starts_with("./icons")));
    assert!(paths.contains(Path::new("./icons/gke-cluster.png")));
}

#[test]
fn dot_lists_every_edge() {
    let dot = to_dot(&finure_diagram(), &Theme::default());
    assert_eq!(dot.lines().filter(|line| line.contains(" -> ")).count(), 82);
    assert!(dot.contains("rankdir=\"LR\""));
    assert!(dot.contains("splines=\"spline\""));
    assert!(dot.contains("subgraph cluster_1"));
}

#[test]
fn layout_is_deterministic_and_encloses_clusters() {
    let diagram = finure_diagram();
    let config = Config::default();
    assert!(!config.layout.use_dagre);
    let a = compute_layout(&diagram, &config.theme, &config.layout);
    let b = compute_layout(&diagram, &config.theme, &config.layout);
    assert_eq!(a.nodes.len(), 58);
    assert_eq!(a.edges.len(), 82);
    assert_eq!(a.clusters.len(), 2);
    for (id, node) in &a.nodes {
        assert_eq!((node.x, node.y), (b.nodes[id].x, b.nodes[id].y));
    }
    let outer = &a.clusters[0];
    for id in diagram.cluster_members(outer.id) {
        let node = &a.nodes[&id];
        assert!(node.x >= outer.x - 0.5 && node.x + node.width <= outer.x + outer.width + 0.5);
    }
    assert!(a.width > 0.0 && a.height > 0.0);
}

#[test]
fn svg_output_carries_labels() {
    let dir = tempfile::tempdir().unwrap();
    let diagram = with_format(OutputFormat::Svg);
    write_icons(dir.path(), &diagram);
    let rendered = render(&diagram, &Config::default(), &RenderTarget::in_dir(dir.path())).unwrap();
    assert_eq!(rendered.path, dir.path().join("finure_arch.svg"));
    let svg = std::fs::read_to_string(&rendered.path).unwrap();
    assert!(svg.contains("Finure high level workflow"));
    assert!(svg.contains("validate &amp; push seed data"));
    assert!(svg.contains("Ingress Layer"));
    assert_eq!(svg.matches("<image ").count(), 19);
}

#[cfg(feature = "png")]
#[test]
fn renders_finure_png() {
    let dir = tempfile::tempdir().unwrap();
    let diagram = finure_diagram();
    write_icons(dir.path(), &diagram);
    let rendered = render(&diagram, &Config::default(), &RenderTarget::in_dir(dir.path())).unwrap();
    assert_eq!(rendered.path, dir.path().join("finure_arch.png"));
    assert_eq!((rendered.nodes, rendered.edges), (58, 82));
    let bytes = std::fs::read(&rendered.path).unwrap();
    assert!(!bytes.is_empty());
    assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"));
    assert_eq!(rendered.bytes, bytes.len() as u64);
}

#[test]
fn missing_icon_fails_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let diagram = with_format(OutputFormat::Svg);
    write_icons(dir.path(), &diagram);
    std::fs::remove_file(dir.path().join("icons/signoz.png")).unwrap();
    let err = render(&diagram, &Config::default(), &RenderTarget::in_dir(dir.path())).unwrap_err();
    match err {
        Error::Icon { path, .. } => assert!(path.ends_with("signoz.png")),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!dir.path().join("finure_arch.svg").exists());
}
