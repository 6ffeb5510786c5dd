use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use finure_diagram::config::LayoutConfig;
use finure_diagram::icons::IconStore;
use finure_diagram::layout::compute_layout;
use finure_diagram::render::render_svg;
use finure_diagram::theme::Theme;
use finure_diagram::{ClusterAttrs, Diagram, EdgeAttrs, Glyph, finure_diagram, to_dot};
use std::hint::black_box;

/// Glyph-only chain with skip edges, grouped into clusters of eight.
fn dense_diagram(nodes: usize, extra_edges: usize) -> Diagram {
    let mut d = Diagram::new("dense");
    let mut ids = Vec::with_capacity(nodes);
    for chunk in 0..nodes.div_ceil(8) {
        let start = chunk * 8;
        let end = (start + 8).min(nodes);
        let members = d.cluster(format!("group {chunk}"), ClusterAttrs::default(), |d| {
            (start..end)
                .map(|i| d.node(format!("Node {i}"), Glyph::ALL[i % Glyph::ALL.len()]))
                .collect::<Vec<_>>()
        });
        ids.extend(members);
    }
    d.chain(&ids, EdgeAttrs::new());
    let mut count = 0usize;
    'outer: for i in 0..ids.len() {
        for j in (i + 2)..ids.len() {
            if count >= extra_edges {
                break 'outer;
            }
            d.connect(ids[i], ids[j], EdgeAttrs::labeled("flow"));
            count += 1;
        }
    }
    d
}

/// Opt-in dagre placement; compound graphs fall back to the manual ranking.
fn dagre() -> LayoutConfig {
    LayoutConfig {
        use_dagre: true,
        ..LayoutConfig::default()
    }
}

fn bench_declare(c: &mut Criterion) {
    c.bench_function("declare/finure", |b| b.iter(|| black_box(finure_diagram())));
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let theme = Theme::default();
    let finure = finure_diagram();
    let config = LayoutConfig::default();
    group.bench_function("finure", |b| {
        b.iter(|| black_box(compute_layout(black_box(&finure), &theme, &config)))
    });
    for size in [16usize, 64, 128] {
        let diagram = dense_diagram(size, size / 2);
        group.bench_with_input(BenchmarkId::new("dense", size), &diagram, |b, d| {
            b.iter(|| black_box(compute_layout(black_box(d), &theme, &config)))
        });
    }
    let small = dense_diagram(12, 0);
    group.bench_function("dagre_fallback/12", |b| {
        b.iter(|| black_box(compute_layout(black_box(&small), &theme, &dagre())))
    });
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let theme = Theme::default();
    let icons = IconStore::default();
    for size in [16usize, 64, 128] {
        let diagram = dense_diagram(size, size / 2);
        let layout = compute_layout(&diagram, &theme, &LayoutConfig::default());
        group.bench_with_input(BenchmarkId::from_parameter(size), &layout, |b, data| {
            b.iter(|| black_box(render_svg(black_box(data), &theme, &icons)))
        });
    }
    group.finish();
}

fn bench_dot(c: &mut Criterion) {
    let theme = Theme::default();
    let finure = finure_diagram();
    c.bench_function("dot/finure", |b| {
        b.iter(|| black_box(to_dot(black_box(&finure), &theme)))
    });
}

criterion_group!(benches, bench_declare, bench_layout, bench_render, bench_dot);
criterion_main!(benches);
