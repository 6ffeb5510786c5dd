use crate::error::ValidationError;
use crate::ir::Diagram;
use once_cell::sync::Lazy;
use regex::Regex;

static HEX_COLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").unwrap());
static NAMED_COLOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z]{3,20}$").unwrap());

pub fn is_valid_color(color: &str) -> bool {
    let color = color.trim();
    HEX_COLOR_RE.is_match(color) || NAMED_COLOR_RE.is_match(color)
}

/// Checks references and colours. Labels are display-only and never rejected.
pub fn validate(diagram: &Diagram) -> Result<(), ValidationError> {
    let node_count = diagram.nodes().len();
    let cluster_count = diagram.clusters().len();

    for node in diagram.nodes() {
        if let Some(cluster) = node.cluster
            && cluster.0 >= cluster_count
        {
            return Err(ValidationError::UnknownCluster {
                owner: format!("node '{}'", node.label),
                cluster,
            });
        }
    }

    for cluster in diagram.clusters() {
        if let Some(parent) = cluster.parent
            && parent.0 >= cluster_count
        {
            return Err(ValidationError::UnknownCluster {
                owner: format!("cluster '{}'", cluster.label),
                cluster: parent,
            });
        }
        for color in [&cluster.attrs.bgcolor, &cluster.attrs.pencolor]
            .into_iter()
            .flatten()
        {
            if !is_valid_color(color) {
                return Err(ValidationError::InvalidColor {
                    owner: format!("cluster '{}'", cluster.label),
                    color: color.clone(),
                });
            }
        }
    }

    for (index, edge) in diagram.edges().iter().enumerate() {
        for endpoint in [edge.from, edge.to] {
            if endpoint.0 >= node_count {
                return Err(ValidationError::DanglingEdge {
                    index,
                    endpoint: endpoint.0,
                });
            }
        }
        if let Some(color) = &edge.attrs.color
            && !is_valid_color(color)
        {
            return Err(ValidationError::InvalidColor {
                owner: format!("edge {index}"),
                color: color.clone(),
            });
        }
    }

    if let Some(bg) = &diagram.options.graph.bgcolor
        && !is_valid_color(bg)
    {
        return Err(ValidationError::InvalidColor {
            owner: "graph".to_string(),
            color: bg.clone(),
        });
    }

    Ok(())
}
