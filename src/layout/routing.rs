use std::collections::{BTreeMap, HashMap};

use crate::config::LayoutConfig;
use crate::ir::{Diagram, Direction, NodeId, Splines, pair_key};
use crate::theme::Theme;

use super::{EdgeLayout, NodeLayout, measure_label};

type Rect = (f32, f32, f32, f32);

pub(super) fn route_edges(
    diagram: &Diagram,
    nodes: &BTreeMap<NodeId, NodeLayout>,
    theme: &Theme,
    config: &LayoutConfig,
    font_family: &str,
) -> Vec<EdgeLayout> {
    let attrs = &diagram.options.graph;
    let pair_counts = diagram.edge_pair_counts();
    let mut pair_seen: HashMap<(NodeId, NodeId), usize> = HashMap::new();
    let mut edges = Vec::with_capacity(diagram.edges().len());

    for (index, edge) in diagram.edges().iter().enumerate() {
        let (Some(from), Some(to)) = (nodes.get(&edge.from), nodes.get(&edge.to)) else {
            continue;
        };

        let points = if edge.from == edge.to {
            route_self_loop(from, attrs.rankdir, attrs.nodesep_px())
        } else {
            let key = pair_key(edge.from, edge.to);
            let total = pair_counts.get(&key).copied().unwrap_or(1);
            let slot = pair_seen.entry(key).or_insert(0);
            let offset = (*slot as f32 - (total as f32 - 1.0) / 2.0) * config.parallel_edge_spacing;
            *slot += 1;
            // Offsets are measured in the pair's canonical orientation so that
            // a->b and b->a edges do not land on the same line.
            let sign = if edge.from == key.0 { 1.0 } else { -1.0 };
            route_between(from, to, attrs.splines, attrs.rankdir, offset * sign)
        };

        let label = edge
            .label()
            .filter(|text| !text.trim().is_empty())
            .map(|text| measure_label(text, theme.font_size, font_family, config));

        edges.push(EdgeLayout {
            index,
            from: edge.from,
            to: edge.to,
            points,
            label,
            label_position: None,
            style: edge.attrs.style,
            color: edge
                .attrs
                .color
                .clone()
                .unwrap_or_else(|| theme.line_color.clone()),
            arrow_start: edge.attrs.direction.arrow_start(),
            arrow_end: edge.attrs.direction.arrow_end(),
        });
    }
    edges
}

fn route_between(
    from: &NodeLayout,
    to: &NodeLayout,
    splines: Splines,
    direction: Direction,
    offset: f32,
) -> Vec<(f32, f32)> {
    let c1 = from.center();
    let c2 = to.center();
    let (dx, dy) = (c2.0 - c1.0, c2.1 - c1.1);
    let len = (dx * dx + dy * dy).sqrt().max(f32::EPSILON);
    let perp = (-dy / len, dx / len);

    if splines == Splines::Ortho {
        return route_orthogonal(from, to, direction, offset);
    }

    let mid = (
        (c1.0 + c2.0) / 2.0 + perp.0 * offset,
        (c1.1 + c2.1) / 2.0 + perp.1 * offset,
    );
    let start = boundary_point(from, mid);
    let end = boundary_point(to, mid);
    if splines == Splines::Line && offset == 0.0 {
        vec![start, end]
    } else {
        vec![start, mid, end]
    }
}

fn route_orthogonal(
    from: &NodeLayout,
    to: &NodeLayout,
    direction: Direction,
    offset: f32,
) -> Vec<(f32, f32)> {
    let c1 = from.center();
    let c2 = to.center();
    if direction.is_horizontal() {
        let forward = c2.0 >= c1.0;
        let sx = if forward { from.x + from.width } else { from.x };
        let ex = if forward { to.x } else { to.x + to.width };
        let sy = clamp_within(c1.1 + offset, from.y, from.height);
        let ey = clamp_within(c2.1 + offset, to.y, to.height);
        let mx = (sx + ex) / 2.0 + offset;
        vec![(sx, sy), (mx, sy), (mx, ey), (ex, ey)]
    } else {
        let forward = c2.1 >= c1.1;
        let sy = if forward { from.y + from.height } else { from.y };
        let ey = if forward { to.y } else { to.y + to.height };
        let sx = clamp_within(c1.0 + offset, from.x, from.width);
        let ex = clamp_within(c2.0 + offset, to.x, to.width);
        let my = (sy + ey) / 2.0 + offset;
        vec![(sx, sy), (sx, my), (ex, my), (ex, ey)]
    }
}

fn clamp_within(value: f32, start: f32, extent: f32) -> f32 {
    if extent <= 2.0 {
        return start + extent / 2.0;
    }
    value.clamp(start + 1.0, start + extent - 1.0)
}

/// Point where the ray from the node centre towards `target` leaves the node box.
fn boundary_point(node: &NodeLayout, target: (f32, f32)) -> (f32, f32) {
    let (cx, cy) = node.center();
    let (dx, dy) = (target.0 - cx, target.1 - cy);
    if dx.abs() < f32::EPSILON && dy.abs() < f32::EPSILON {
        return (cx, cy);
    }
    let half_w = node.width / 2.0;
    let half_h = node.height / 2.0;
    let tx = if dx.abs() > f32::EPSILON { half_w / dx.abs() } else { f32::MAX };
    let ty = if dy.abs() > f32::EPSILON { half_h / dy.abs() } else { f32::MAX };
    let t = tx.min(ty);
    (cx + dx * t, cy + dy * t)
}

fn route_self_loop(node: &NodeLayout, direction: Direction, spacing: f32) -> Vec<(f32, f32)> {
    let pad = spacing.max(20.0) * 0.6;
    if direction.is_horizontal() {
        let start = (node.x + node.width, node.y + node.height / 2.0);
        let p1 = (node.x + node.width + pad, node.y + node.height / 2.0);
        let p2 = (node.x + node.width + pad, node.y - pad);
        let p3 = (node.x + node.width / 2.0, node.y - pad);
        let end = (node.x + node.width / 2.0, node.y);
        vec![start, p1, p2, p3, end]
    } else {
        let start = (node.x + node.width / 2.0, node.y + node.height);
        let p1 = (node.x + node.width / 2.0, node.y + node.height + pad);
        let p2 = (node.x + node.width + pad, node.y + node.height + pad);
        let p3 = (node.x + node.width + pad, node.y + node.height / 2.0);
        let end = (node.x + node.width, node.y + node.height / 2.0);
        vec![start, p1, p2, p3, end]
    }
}

/// Anchors each label near its route midpoint, nudging it off nodes and earlier labels.
pub(super) fn place_edge_labels(edges: &mut [EdgeLayout], nodes: &BTreeMap<NodeId, NodeLayout>) {
    let mut occupied: Vec<Rect> = nodes
        .values()
        .map(|node| (node.x, node.y, node.width, node.height))
        .collect();

    for edge in edges.iter_mut() {
        let Some(label) = edge.label.as_ref() else {
            continue;
        };
        let (mid_x, mid_y) = route_midpoint(&edge.points);
        let step = label.height + 4.0;
        let mut placed = None;
        for attempt in 0..9 {
            let shift = match attempt {
                0 => 0.0,
                n if n % 2 == 1 => ((n + 1) / 2) as f32 * step,
                n => -((n / 2) as f32) * step,
            };
            let (x, y) = (mid_x, mid_y + shift);
            let rect = label_rect(x, y, label.width, label.height);
            if !collides(&rect, &occupied) {
                occupied.push(rect);
                placed = Some((x, y));
                break;
            }
        }
        edge.label_position = Some(placed.unwrap_or((mid_x, mid_y)));
    }
}

fn label_rect(x: f32, y: f32, width: f32, height: f32) -> Rect {
    (x - width / 2.0 - 3.0, y - height / 2.0 - 2.0, width + 6.0, height + 4.0)
}

fn route_midpoint(points: &[(f32, f32)]) -> (f32, f32) {
    match points.len() {
        0 => (0.0, 0.0),
        1 => points[0],
        n if n % 2 == 1 => points[n / 2],
        n => {
            let a = points[n / 2 - 1];
            let b = points[n / 2];
            ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
        }
    }
}

fn collides(rect: &Rect, occupied: &[Rect]) -> bool {
    occupied.iter().any(|(x, y, w, h)| {
        rect.0 < x + w && rect.0 + rect.2 > *x && rect.1 < y + h && rect.1 + rect.3 > *y
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Glyph;
    use crate::ir::Icon;
    use crate::layout::TextBlock;

    fn node(id: usize, x: f32, y: f32) -> NodeLayout {
        NodeLayout {
            id: NodeId(id),
            x,
            y,
            width: 100.0,
            height: 120.0,
            icon: Icon::Glyph(Glyph::Pod),
            icon_size: 100.0,
            label: TextBlock {
                lines: vec!["pod".to_string()],
                width: 20.0,
                height: 16.0,
            },
            cluster: None,
        }
    }

    #[test]
    fn boundary_point_lies_on_box_edge() {
        let n = node(0, 0.0, 0.0);
        let (x, y) = boundary_point(&n, (500.0, 60.0));
        assert!((x - 100.0).abs() < 0.01);
        assert!((y - 60.0).abs() < 0.01);
    }

    #[test]
    fn spline_route_has_offset_midpoint() {
        let a = node(0, 0.0, 0.0);
        let b = node(1, 300.0, 0.0);
        let straight = route_between(&a, &b, Splines::Spline, Direction::LeftRight, 0.0);
        let bent = route_between(&a, &b, Splines::Spline, Direction::LeftRight, 12.0);
        assert_eq!(straight.len(), 3);
        assert!((straight[1].1 - 60.0).abs() < 0.01);
        assert!((bent[1].1 - 72.0).abs() < 0.01);
    }

    #[test]
    fn ortho_route_is_axis_aligned() {
        let a = node(0, 0.0, 0.0);
        let b = node(1, 300.0, 200.0);
        let points = route_orthogonal(&a, &b, Direction::LeftRight, 0.0);
        assert_eq!(points.len(), 4);
        for pair in points.windows(2) {
            assert!(pair[0].0 == pair[1].0 || pair[0].1 == pair[1].1);
        }
    }

    #[test]
    fn midpoint_of_even_route() {
        let points = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (20.0, 10.0)];
        assert_eq!(route_midpoint(&points), (10.0, 5.0));
    }
}
