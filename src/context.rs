//! Scoped rendering: declare a diagram inside a closure, then validate, lay out
//! and write it exactly once when the closure returns.

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::config::Config;
use crate::dot::to_dot;
use crate::error::Result;
use crate::icons::IconStore;
use crate::ir::{Diagram, DiagramOptions, OutputFormat};
use crate::layout::compute_layout;
use crate::layout_dump::write_layout_dump;
use crate::render::{render_svg, write_output_dot, write_output_png, write_output_svg};
use crate::validate::validate;

/// Where a render goes and where its inputs come from.
#[derive(Debug, Clone)]
pub struct RenderTarget {
    /// Directory the default `<filename>.<ext>` lands in.
    pub output_dir: PathBuf,
    /// Explicit output path; overrides `output_dir` and the diagram filename.
    pub output: Option<PathBuf>,
    /// Base directory for relative custom icon paths.
    pub icons_dir: PathBuf,
    /// Optional JSON dump of the computed layout.
    pub dump_layout: Option<PathBuf>,
}

impl Default for RenderTarget {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            output: None,
            icons_dir: PathBuf::from("."),
            dump_layout: None,
        }
    }
}

impl RenderTarget {
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref().to_path_buf();
        Self {
            output_dir: dir.clone(),
            icons_dir: dir,
            ..Self::default()
        }
    }

    pub fn output_path(&self, diagram: &Diagram) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => diagram.output_path(&self.output_dir),
        }
    }
}

/// Summary of a finished render.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub path: PathBuf,
    pub format: OutputFormat,
    pub nodes: usize,
    pub edges: usize,
    pub clusters: usize,
    pub bytes: u64,
}

/// Builds a diagram with `build` and renders it when the scope closes.
///
/// Nothing is written if `build` fails, the diagram does not validate, or the
/// layout dump cannot be written.
pub fn render_diagram<F>(
    name: &str,
    options: DiagramOptions,
    config: &Config,
    target: &RenderTarget,
    build: F,
) -> Result<Rendered>
where
    F: FnOnce(&mut Diagram) -> Result<()>,
{
    let mut diagram = Diagram::with_options(name, options);
    build(&mut diagram)?;
    render(&diagram, config, target)
}

/// Renders an already declared diagram to its output file.
pub fn render(diagram: &Diagram, config: &Config, target: &RenderTarget) -> Result<Rendered> {
    validate(diagram)?;

    let mut icons = IconStore::new(&target.icons_dir);
    icons.preload(diagram)?;

    let format = diagram.options.format;
    let output = target.output_path(diagram);
    debug!(
        "rendering '{}' ({} nodes, {} edges, {} clusters) as {}",
        diagram.name,
        diagram.nodes().len(),
        diagram.edges().len(),
        diagram.clusters().len(),
        format.extension()
    );

    let layout = match format {
        OutputFormat::Dot => None,
        OutputFormat::Svg | OutputFormat::Png => {
            Some(compute_layout(diagram, &config.theme, &config.layout))
        }
    };
    let svg = match &layout {
        Some(layout) => Some(render_svg(layout, &config.theme, &icons)?),
        None => None,
    };

    // The output file is written last so a failed dump leaves nothing behind.
    if let Some(path) = &target.dump_layout {
        match &layout {
            Some(layout) => write_layout_dump(path, layout, diagram)?,
            None => write_layout_dump(
                path,
                &compute_layout(diagram, &config.theme, &config.layout),
                diagram,
            )?,
        }
        debug!("wrote layout dump to {}", path.display());
    }

    match svg {
        Some(svg) if format == OutputFormat::Png => {
            write_output_png(&svg, &output, &config.render)?
        }
        Some(svg) => write_output_svg(&svg, &output)?,
        None => write_output_dot(&to_dot(diagram, &config.theme), &output)?,
    }

    let bytes = std::fs::metadata(&output)?.len();
    info!(
        "wrote {} ({} bytes, {} nodes, {} edges)",
        output.display(),
        bytes,
        diagram.nodes().len(),
        diagram.edges().len()
    );

    Ok(Rendered {
        path: output,
        format,
        nodes: diagram.nodes().len(),
        edges: diagram.edges().len(),
        clusters: diagram.clusters().len(),
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Glyph;
    use crate::error::Error;
    use crate::ir::{EdgeAttrs, Icon};

    fn svg_options() -> DiagramOptions {
        DiagramOptions {
            format: OutputFormat::Svg,
            ..DiagramOptions::default()
        }
    }

    #[test]
    fn writes_default_filename_in_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let target = RenderTarget::in_dir(dir.path());
        let rendered = render_diagram("Tiny Arch", svg_options(), &Config::default(), &target, |d| {
            let a = d.node("a", Glyph::Kafka);
            let b = d.node("b", Glyph::Pod);
            d.connect(a, b, EdgeAttrs::new());
            Ok(())
        })
        .unwrap();
        assert_eq!(rendered.path, dir.path().join("tiny_arch.svg"));
        assert_eq!((rendered.nodes, rendered.edges), (2, 1));
        assert!(rendered.bytes > 0);
        let svg = std::fs::read_to_string(&rendered.path).unwrap();
        assert!(svg.starts_with("<svg"));
    }

    #[test]
    fn failing_scope_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let target = RenderTarget::in_dir(dir.path());
        let err = render_diagram("Broken", svg_options(), &Config::default(), &target, |d| {
            d.node("a", Glyph::Kafka);
            Err(Error::Io(std::io::Error::other("boom")))
        })
        .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_icon_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let target = RenderTarget::in_dir(dir.path());
        let err = render_diagram("Icons", svg_options(), &Config::default(), &target, |d| {
            d.node("KServe", Icon::custom("./icons/kserve.png"));
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, Error::Icon { .. }));
        assert!(!dir.path().join("icons.svg").exists());
    }

    #[test]
    fn dot_output_and_layout_dump() {
        let dir = tempfile::tempdir().unwrap();
        let mut target = RenderTarget::in_dir(dir.path());
        target.dump_layout = Some(dir.path().join("layout.json"));
        let options = DiagramOptions {
            format: OutputFormat::Dot,
            ..DiagramOptions::default()
        };
        let rendered = render_diagram("Dot Out", options, &Config::default(), &target, |d| {
            let a = d.node("a", Glyph::Helm);
            let b = d.node("b", Glyph::Flux);
            d.connect(a, b, EdgeAttrs::labeled("sync"));
            Ok(())
        })
        .unwrap();
        let dot = std::fs::read_to_string(&rendered.path).unwrap();
        assert!(dot.contains("n0 -> n1 [label=\"sync\"];"));
        let dump: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("layout.json")).unwrap())
                .unwrap();
        assert_eq!(dump["nodes"].as_array().unwrap().len(), 2);
        assert_eq!(dump["name"], "Dot Out");
    }

    #[test]
    fn failed_layout_dump_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let mut target = RenderTarget::in_dir(dir.path());
        target.dump_layout = Some(blocker.join("layout.json"));
        let result = render_diagram("Dump Fails", svg_options(), &Config::default(), &target, |d| {
            let a = d.node("a", Glyph::Kafka);
            let b = d.node("b", Glyph::Pod);
            d.connect(a, b, EdgeAttrs::new());
            Ok(())
        });
        assert!(result.is_err());
        assert!(!dir.path().join("dump_fails.svg").exists());
    }
}
