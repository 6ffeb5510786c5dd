use crate::catalog::{BadgeShape, Glyph};
use crate::config::RenderConfig;
use crate::error::{Error, Result};
use crate::icons::IconStore;
use crate::ir::{EdgeStyle, Icon, Splines};
use crate::layout::{ClusterLayout, EdgeLayout, Layout, NodeLayout, TextBlock};
use crate::theme::Theme;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

pub fn render_svg(layout: &Layout, theme: &Theme, icons: &IconStore) -> Result<String> {
    let mut svg = String::new();
    let width = layout.width.max(1.0);
    let height = layout.height.max(1.0);
    let font = escape_xml(&layout.font_family);
    let title_font = escape_xml(&layout.title_font_family);

    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" xmlns:xlink=\"http://www.w3.org/1999/xlink\" width=\"{width:.2}\" height=\"{height:.2}\" viewBox=\"0 0 {width:.2} {height:.2}\">",
    );
    let _ = write!(
        svg,
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    );

    let markers = marker_ids(&layout.edges);
    svg.push_str("<defs>");
    for (color, id) in &markers {
        let _ = write!(
            svg,
            "<marker id=\"{id}\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"7\" markerHeight=\"7\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
            escape_xml(color)
        );
    }
    svg.push_str("</defs>");

    for cluster in &layout.clusters {
        push_cluster(&mut svg, cluster, theme, &title_font);
    }

    for edge in &layout.edges {
        push_edge(&mut svg, edge, layout.splines, &markers);
    }

    for edge in &layout.edges {
        if let (Some(label), Some((x, y))) = (&edge.label, edge.label_position) {
            if theme.edge_label_background != "none" {
                let _ = write!(
                    svg,
                    "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"3\" ry=\"3\" fill=\"{}\" fill-opacity=\"0.85\"/>",
                    x - label.width / 2.0 - 3.0,
                    y - label.height / 2.0 - 2.0,
                    label.width + 6.0,
                    label.height + 4.0,
                    theme.edge_label_background
                );
            }
            svg.push_str(&text_block_svg(
                x,
                y - label.height / 2.0,
                label,
                theme.font_size,
                &theme.edge_label_color,
                &font,
            ));
        }
    }

    for node in layout.nodes.values() {
        push_node(&mut svg, node, layout.label_gap, theme, icons, &font)?;
    }

    if let Some(title) = &layout.title {
        let _ = write!(
            svg,
            "<text x=\"{:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{title_font}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            title.x,
            title.y,
            title.font_size,
            theme.text_color,
            escape_xml(&title.text)
        );
    }

    svg.push_str("</svg>");
    Ok(svg)
}

/// One arrowhead marker per distinct edge colour.
fn marker_ids(edges: &[EdgeLayout]) -> BTreeMap<String, String> {
    let mut markers = BTreeMap::new();
    for edge in edges {
        if edge.arrow_start || edge.arrow_end {
            let next = format!("arrow-{}", markers.len());
            markers.entry(edge.color.clone()).or_insert(next);
        }
    }
    markers
}

fn push_cluster(svg: &mut String, cluster: &ClusterLayout, theme: &Theme, font: &str) {
    let dash = if cluster.dashed {
        " stroke-dasharray=\"6 4\""
    } else {
        ""
    };
    let _ = write!(
        svg,
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"6\" ry=\"6\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1\"{dash}/>",
        cluster.x, cluster.y, cluster.width, cluster.height, cluster.background, cluster.border
    );
    if !cluster.label.trim().is_empty() {
        let _ = write!(
            svg,
            "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{font}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            cluster.x + 10.0,
            cluster.y + theme.cluster_font_size + 6.0,
            theme.cluster_font_size,
            theme.text_color,
            escape_xml(&cluster.label)
        );
    }
}

fn push_edge(
    svg: &mut String,
    edge: &EdgeLayout,
    splines: Splines,
    markers: &BTreeMap<String, String>,
) {
    if edge.points.len() < 2 {
        return;
    }
    let d = match splines {
        Splines::Spline => points_to_spline(&edge.points),
        Splines::Polyline | Splines::Line | Splines::Ortho => points_to_path(&edge.points),
    };
    let (width, dash) = match edge.style {
        EdgeStyle::Solid => (1.0, ""),
        EdgeStyle::Bold => (2.0, ""),
        EdgeStyle::Dashed => (1.0, " stroke-dasharray=\"6 4\""),
        EdgeStyle::Dotted => (1.0, " stroke-dasharray=\"1.5 3\" stroke-linecap=\"round\""),
    };
    let mut marker = String::new();
    if let Some(id) = markers.get(&edge.color) {
        if edge.arrow_start {
            let _ = write!(marker, " marker-start=\"url(#{id})\"");
        }
        if edge.arrow_end {
            let _ = write!(marker, " marker-end=\"url(#{id})\"");
        }
    }
    let _ = write!(
        svg,
        "<path d=\"{d}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{width}\"{dash}{marker}/>",
        escape_xml(&edge.color)
    );
}

fn push_node(
    svg: &mut String,
    node: &NodeLayout,
    label_gap: f32,
    theme: &Theme,
    icons: &IconStore,
    font: &str,
) -> Result<()> {
    let (ix, iy) = node.icon_origin();
    match &node.icon {
        Icon::Glyph(glyph) => push_glyph(svg, *glyph, ix, iy, node.icon_size, theme),
        Icon::Custom(path) => {
            let loaded = icons.get(path).ok_or_else(|| Error::Icon {
                path: icons.resolve(path),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "icon was not loaded"),
            })?;
            let _ = write!(
                svg,
                "<image x=\"{ix:.2}\" y=\"{iy:.2}\" width=\"{size:.2}\" height=\"{size:.2}\" preserveAspectRatio=\"xMidYMid meet\" xlink:href=\"{}\"/>",
                loaded.data_uri,
                size = node.icon_size
            );
        }
    }
    if !node.label.is_empty() {
        let (cx, _) = node.label_center(label_gap);
        svg.push_str(&text_block_svg(
            cx,
            node.y + node.icon_size + label_gap,
            &node.label,
            theme.font_size,
            &theme.text_color,
            font,
        ));
    }
    Ok(())
}

fn push_glyph(svg: &mut String, glyph: Glyph, x: f32, y: f32, size: f32, theme: &Theme) {
    let cx = x + size / 2.0;
    let cy = y + size / 2.0;
    let r = size * 0.42;
    let color = glyph.color();
    match glyph.badge() {
        BadgeShape::Circle => {
            let _ = write!(
                svg,
                "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{r:.2}\" fill=\"{color}\"/>"
            );
        }
        BadgeShape::RoundedSquare => {
            let _ = write!(
                svg,
                "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"{:.2}\" fill=\"{color}\"/>",
                cx - r,
                cy - r,
                r * 2.0,
                r * 2.0,
                size * 0.14
            );
        }
        BadgeShape::Hexagon => {
            let mut points = String::new();
            for i in 0..6 {
                let angle = std::f32::consts::FRAC_PI_3 * i as f32 - std::f32::consts::FRAC_PI_2;
                let _ = write!(points, "{:.2},{:.2} ", cx + r * angle.cos(), cy + r * angle.sin());
            }
            let _ = write!(
                svg,
                "<polygon points=\"{}\" fill=\"{color}\"/>",
                points.trim_end()
            );
        }
    }
    let mark_size = size * 0.24;
    let _ = write!(
        svg,
        "<text x=\"{cx:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"sans-serif\" font-weight=\"bold\" font-size=\"{mark_size:.2}\" fill=\"{}\">{}</text>",
        cy + mark_size * 0.35,
        theme.glyph_text_color,
        escape_xml(glyph.mark())
    );
}

fn points_to_path(points: &[(f32, f32)]) -> String {
    let mut d = String::new();
    for (idx, (x, y)) in points.iter().enumerate() {
        let cmd = if idx == 0 { "M" } else { " L" };
        let _ = write!(d, "{cmd} {x:.2} {y:.2}");
    }
    d
}

/// Smooth path through every point (Catmull-Rom converted to cubic Béziers).
fn points_to_spline(points: &[(f32, f32)]) -> String {
    if points.len() < 3 {
        return points_to_path(points);
    }
    let mut d = format!("M {:.2} {:.2}", points[0].0, points[0].1);
    for i in 0..points.len() - 1 {
        let p0 = if i == 0 { points[0] } else { points[i - 1] };
        let p1 = points[i];
        let p2 = points[i + 1];
        let p3 = if i + 2 < points.len() { points[i + 2] } else { p2 };
        let c1 = (p1.0 + (p2.0 - p0.0) / 6.0, p1.1 + (p2.1 - p0.1) / 6.0);
        let c2 = (p2.0 - (p3.0 - p1.0) / 6.0, p2.1 - (p3.1 - p1.1) / 6.0);
        let _ = write!(
            d,
            " C {:.2} {:.2} {:.2} {:.2} {:.2} {:.2}",
            c1.0, c1.1, c2.0, c2.1, p2.0, p2.1
        );
    }
    d
}

/// Multi-line text whose first line box starts at `top`.
fn text_block_svg(
    x: f32,
    top: f32,
    label: &TextBlock,
    font_size: f32,
    fill: &str,
    font: &str,
) -> String {
    let line_height = if label.lines.is_empty() {
        font_size
    } else {
        label.height / label.lines.len() as f32
    };
    let baseline = top + line_height * 0.5 + font_size * 0.35;
    let mut text = String::new();
    let _ = write!(
        text,
        "<text x=\"{x:.2}\" y=\"{baseline:.2}\" text-anchor=\"middle\" font-family=\"{font}\" font-size=\"{font_size}\" fill=\"{fill}\">",
    );
    for (idx, line) in label.lines.iter().enumerate() {
        let dy = if idx == 0 { 0.0 } else { line_height };
        let _ = write!(
            text,
            "<tspan x=\"{x:.2}\" dy=\"{dy:.2}\">{}</tspan>",
            escape_xml(line)
        );
    }
    text.push_str("</text>");
    text
}

pub fn write_output_svg(svg: &str, output: &Path) -> Result<()> {
    std::fs::write(output, svg)?;
    Ok(())
}

pub fn write_output_dot(dot: &str, output: &Path) -> Result<()> {
    std::fs::write(output, dot)?;
    Ok(())
}

#[cfg(feature = "png")]
pub fn rasterize_png(svg: &str, render_cfg: &RenderConfig) -> Result<Vec<u8>> {
    let mut opt = usvg::Options::default();
    if render_cfg.load_system_fonts {
        opt.fontdb_mut().load_system_fonts();
    }
    opt.font_family = render_cfg.font_family.clone();

    let tree = usvg::Tree::from_str(svg, &opt).map_err(|err| Error::Svg(err.to_string()))?;
    let scale = render_cfg.scale.max(0.01);
    let size = tree.size();
    let width = (size.width() * scale).ceil().max(1.0) as u32;
    let height = (size.height() * scale).ceil().max(1.0) as u32;
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or(Error::Pixmap { width, height })?;

    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );
    pixmap.encode_png().map_err(|err| Error::Png(err.to_string()))
}

#[cfg(not(feature = "png"))]
pub fn rasterize_png(_svg: &str, _render_cfg: &RenderConfig) -> Result<Vec<u8>> {
    Err(Error::FormatDisabled("png"))
}

pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let bytes = rasterize_png(svg, render_cfg)?;
    std::fs::write(output, bytes)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::ir::{ClusterAttrs, Diagram, EdgeAttrs, EdgeDirection};
    use crate::layout::compute_layout;

    fn small() -> Diagram {
        let mut d = Diagram::new("Alpha & Beta");
        let a = d.node("Alpha", Glyph::Kafka);
        let b = d.cluster("Ingress Layer", ClusterAttrs::dashed(), |d| {
            d.node("Beta <1>", Glyph::Pod)
        });
        d.connect(
            a,
            b,
            EdgeAttrs::dashed("#6a8caf")
                .label("produce")
                .direction(EdgeDirection::Both),
        );
        d.connect(b, a, EdgeAttrs::new().style(EdgeStyle::Dotted));
        d
    }

    fn render(d: &Diagram) -> String {
        let config = LayoutConfig {
            use_dagre: false,
            ..LayoutConfig::default()
        };
        let theme = Theme::default();
        let layout = compute_layout(d, &theme, &config);
        render_svg(&layout, &theme, &IconStore::default()).unwrap()
    }

    #[test]
    fn render_svg_basic() {
        let svg = render(&small());
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("Alpha"));
        assert!(svg.contains("Beta &lt;1&gt;"));
        assert!(svg.contains("Alpha &amp; Beta"));
        assert!(svg.contains("Ingress Layer"));
        assert!(svg.contains("produce"));
    }

    #[test]
    fn edge_styles_and_markers() {
        let svg = render(&small());
        assert!(svg.contains("stroke=\"#6a8caf\""));
        assert!(svg.contains("stroke-dasharray=\"6 4\""));
        assert!(svg.contains("stroke-dasharray=\"1.5 3\""));
        assert!(svg.contains("marker-start=\"url(#arrow-"));
        assert_eq!(svg.matches("<marker ").count(), 2);
    }

    #[test]
    fn custom_icon_must_be_loaded() {
        let mut d = Diagram::new("t");
        d.node("KServe", Icon::custom("./icons/kserve.png"));
        let config = LayoutConfig {
            use_dagre: false,
            ..LayoutConfig::default()
        };
        let layout = compute_layout(&d, &Theme::default(), &config);
        let err = render_svg(&layout, &Theme::default(), &IconStore::default()).unwrap_err();
        assert!(matches!(err, Error::Icon { .. }));
    }

    #[test]
    fn spline_path_uses_curves() {
        let d = points_to_spline(&[(0.0, 0.0), (50.0, 10.0), (100.0, 0.0)]);
        assert!(d.starts_with("M 0.00 0.00"));
        assert_eq!(d.matches(" C ").count(), 2);
        assert_eq!(points_to_path(&[(0.0, 0.0), (1.0, 1.0)]), "M 0.00 0.00 L 1.00 1.00");
    }

    #[cfg(feature = "png")]
    #[test]
    fn rasterizes_to_png() {
        let svg = render(&small());
        let cfg = RenderConfig {
            load_system_fonts: false,
            ..RenderConfig::default()
        };
        let bytes = rasterize_png(&svg, &cfg).unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
    }
}
