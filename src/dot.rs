//! Graphviz DOT emission for a declared diagram.
//!
//! Node, edge and cluster defaults match the icon-diagram conventions, so a
//! `.dot` file can be rendered by `dot -Tpng` when a Graphviz install is at hand.

use std::fmt::Write;

use crate::ir::{ClusterId, Diagram, EdgeDirection, EdgeStyle, Icon};
use crate::theme::Theme;

/// Replaces anything outside `[A-Za-z0-9_]` with an underscore.
pub fn sanitize_id(input: &str) -> String {
    input
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

pub fn escape_label(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn write_indent(output: &mut String, level: usize) {
    for _ in 0..level {
        output.push_str("  ");
    }
}

/// Small builder that keeps indentation consistent across nested subgraphs.
struct DotBuilder {
    output: String,
    indent: usize,
}

impl DotBuilder {
    fn new(name: &str) -> Self {
        let mut output = String::with_capacity(4096);
        let _ = writeln!(output, "digraph \"{}\" {{", escape_label(name));
        Self { output, indent: 1 }
    }

    fn attr(&mut self, key: &str, value: &str) -> &mut Self {
        write_indent(&mut self.output, self.indent);
        let _ = writeln!(self.output, "{}=\"{}\";", key, escape_label(value));
        self
    }

    fn defaults(&mut self, kind: &str, attrs: &[(&str, String)]) -> &mut Self {
        write_indent(&mut self.output, self.indent);
        let _ = write!(self.output, "{kind} [");
        write_attr_list(&mut self.output, attrs);
        self.output.push_str("];\n");
        self
    }

    fn node(&mut self, id: &str, attrs: &[(&str, String)]) -> &mut Self {
        write_indent(&mut self.output, self.indent);
        let _ = write!(self.output, "{id} [");
        write_attr_list(&mut self.output, attrs);
        self.output.push_str("];\n");
        self
    }

    fn edge(&mut self, from: &str, to: &str, attrs: &[(&str, String)]) -> &mut Self {
        write_indent(&mut self.output, self.indent);
        if attrs.is_empty() {
            let _ = writeln!(self.output, "{from} -> {to};");
        } else {
            let _ = write!(self.output, "{from} -> {to} [");
            write_attr_list(&mut self.output, attrs);
            self.output.push_str("];\n");
        }
        self
    }

    fn start_cluster(&mut self, id: &str) -> &mut Self {
        write_indent(&mut self.output, self.indent);
        let _ = writeln!(self.output, "subgraph cluster_{} {{", sanitize_id(id));
        self.indent += 1;
        self
    }

    fn end_cluster(&mut self) -> &mut Self {
        self.indent = self.indent.saturating_sub(1);
        write_indent(&mut self.output, self.indent);
        self.output.push_str("}\n");
        self
    }

    fn blank(&mut self) -> &mut Self {
        self.output.push('\n');
        self
    }

    fn build(mut self) -> String {
        self.output.push_str("}\n");
        self.output
    }
}

fn write_attr_list(output: &mut String, attrs: &[(&str, String)]) {
    for (i, (key, value)) in attrs.iter().enumerate() {
        if i > 0 {
            output.push_str(", ");
        }
        let _ = write!(output, "{}=\"{}\"", key, escape_label(value));
    }
}

pub fn to_dot(diagram: &Diagram, theme: &Theme) -> String {
    let graph = &diagram.options.graph;
    let mut dot = DotBuilder::new(&diagram.name);

    dot.attr("label", &diagram.name)
        .attr("labelloc", "b")
        .attr("rankdir", graph.rankdir.as_token())
        .attr("splines", graph.splines.as_token())
        .attr("pad", &fmt_num(graph.pad))
        .attr("nodesep", &fmt_num(graph.nodesep))
        .attr("ranksep", &fmt_num(graph.ranksep))
        .attr("fontname", &graph.fontname)
        .attr("fontsize", &fmt_num(graph.fontsize))
        .attr("fontcolor", &graph.fontcolor);
    if let Some(bg) = &graph.bgcolor {
        dot.attr("bgcolor", bg);
    }

    dot.defaults(
        "node",
        &[
            ("shape", "box".to_string()),
            ("style", "rounded".to_string()),
            ("fixedsize", "true".to_string()),
            ("width", "1.4".to_string()),
            ("height", "1.4".to_string()),
            ("labelloc", "b".to_string()),
            ("imagescale", "true".to_string()),
            ("fontname", theme.font_family.clone()),
            ("fontsize", fmt_num(theme.font_size)),
            ("fontcolor", theme.text_color.clone()),
        ],
    )
    .defaults(
        "edge",
        &[
            ("color", theme.line_color.clone()),
            ("fontname", theme.font_family.clone()),
        ],
    )
    .blank();

    write_scope(&mut dot, diagram, theme, None);
    dot.blank();

    for edge in diagram.edges() {
        let mut attrs: Vec<(&str, String)> = Vec::new();
        if let Some(label) = edge.label() {
            attrs.push(("label", label.to_string()));
        }
        if edge.attrs.style != EdgeStyle::Solid {
            attrs.push(("style", edge.attrs.style.as_token().to_string()));
        }
        if let Some(color) = &edge.attrs.color {
            attrs.push(("color", color.clone()));
        }
        if edge.attrs.direction != EdgeDirection::Forward {
            attrs.push(("dir", edge.attrs.direction.as_token().to_string()));
        }
        dot.edge(&edge.from.key(), &edge.to.key(), &attrs);
    }

    dot.build()
}

/// Emits the nodes directly inside `scope`, then each child cluster recursively.
fn write_scope(dot: &mut DotBuilder, diagram: &Diagram, theme: &Theme, scope: Option<ClusterId>) {
    for node in diagram.nodes().iter().filter(|node| node.cluster == scope) {
        let mut attrs = vec![("label", node.label.clone())];
        match &node.icon {
            Icon::Glyph(glyph) => attrs.push(("tooltip", glyph.category().to_string())),
            Icon::Custom(path) => attrs.push(("image", path.display().to_string())),
        }
        dot.node(&node.id.key(), &attrs);
    }

    for child in diagram.child_clusters(scope) {
        let Some(cluster) = diagram.get_cluster(child) else {
            continue;
        };
        let style = match cluster.attrs.style {
            EdgeStyle::Solid => "rounded".to_string(),
            other => format!("rounded,{}", other.as_token()),
        };
        dot.start_cluster(&child.0.to_string())
            .attr("label", &cluster.label)
            .attr("labeljust", "l")
            .attr("style", &style)
            .attr(
                "bgcolor",
                cluster
                    .attrs
                    .bgcolor
                    .as_deref()
                    .unwrap_or_else(|| theme.cluster_background(cluster.depth)),
            )
            .attr(
                "pencolor",
                cluster
                    .attrs
                    .pencolor
                    .as_deref()
                    .unwrap_or(&theme.cluster_border),
            )
            .attr("fontname", &diagram.options.graph.fontname)
            .attr("fontsize", &fmt_num(theme.cluster_font_size));
        write_scope(dot, diagram, theme, Some(child));
        dot.end_cluster();
    }
}

fn fmt_num(value: f32) -> String {
    let text = format!("{value:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Glyph;
    use crate::ir::{ClusterAttrs, EdgeAttrs};

    fn sample() -> Diagram {
        let mut d = Diagram::new("Finure \"AI\"");
        let user = d.node("User", Glyph::Users);
        let gw = d.cluster("Cluster", ClusterAttrs::default(), |d| {
            d.cluster("Ingress Layer", ClusterAttrs::dashed(), |d| {
                d.node("Gateway", Icon::custom("./icons/gateway.png"))
            })
        });
        d.connect(user, gw, EdgeAttrs::labeled("HTTPS"));
        d.connect_back(gw, user, EdgeAttrs::dashed("#888888"));
        d
    }

    #[test]
    fn emits_nested_clusters() {
        let dot = to_dot(&sample(), &Theme::default());
        assert!(dot.starts_with("digraph \"Finure \\\"AI\\\"\" {"));
        let outer = dot.find("subgraph cluster_0").unwrap();
        let inner = dot.find("subgraph cluster_1").unwrap();
        assert!(outer < inner);
        assert!(dot.contains("style=\"rounded,dashed\""));
        assert!(dot.contains("image=\"./icons/gateway.png\""));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn emits_edge_attributes() {
        let dot = to_dot(&sample(), &Theme::default());
        assert!(dot.contains("n0 -> n1 [label=\"HTTPS\"];"));
        assert!(dot.contains("n1 -> n0 [style=\"dashed\", color=\"#888888\", dir=\"back\"];"));
    }

    #[test]
    fn graph_font_stays_off_node_labels() {
        let mut d = sample();
        d.options.graph.fontname = "Inter".to_string();
        let dot = to_dot(&d, &Theme::default());
        assert!(dot.contains("  fontname=\"Inter\";"));
        assert!(dot.contains("fixedsize=\"true\", width=\"1.4\", height=\"1.4\", labelloc=\"b\", imagescale=\"true\", fontname=\"Sans-Serif\""));
        assert!(dot.contains("edge [color=\"#7B8894\", fontname=\"Sans-Serif\"];"));
        assert!(dot.contains("    fontname=\"Inter\";"));
    }

    #[test]
    fn numbers_are_trimmed() {
        assert_eq!(fmt_num(0.55), "0.55");
        assert_eq!(fmt_num(2.0), "2");
        assert_eq!(fmt_num(0.9), "0.9");
        assert_eq!(sanitize_id("a-b c"), "a_b_c");
    }
}
