use crate::config::load_config;
use crate::context::{RenderTarget, Rendered, render};
use crate::finure::finure_diagram;
use crate::ir;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "finure-arch",
    version,
    about = "Render the Finure high level workflow diagram"
)]
pub struct Args {
    /// Output file. Defaults to finure_arch.<format> in the working directory.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "png")]
    pub output_format: OutputFormat,

    /// Config JSON5 file (theme, layout and render overrides)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Base directory that ./icons/*.png paths are resolved against
    #[arg(long = "icons-dir", default_value = ".")]
    pub icons_dir: PathBuf,

    /// Write the computed layout as JSON
    #[arg(long = "dump-layout")]
    pub dump_layout: Option<PathBuf>,

    /// Raster scale factor for PNG output
    #[arg(short = 's', long = "scale")]
    pub scale: Option<f32>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long = "log-level", default_value = "warn")]
    pub log_level: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Svg,
    Dot,
}

impl From<OutputFormat> for ir::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Png => ir::OutputFormat::Png,
            OutputFormat::Svg => ir::OutputFormat::Svg,
            OutputFormat::Dot => ir::OutputFormat::Dot,
        }
    }
}

pub fn run(args: &Args) -> Result<Rendered> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(scale) = args.scale {
        anyhow::ensure!(scale > 0.0, "--scale must be positive, got {scale}");
        config.render.scale = scale;
    }

    let mut diagram = finure_diagram();
    diagram.options.format = args.output_format.into();

    let target = RenderTarget {
        output_dir: PathBuf::from("."),
        output: args.output.clone(),
        icons_dir: args.icons_dir.clone(),
        dump_layout: args.dump_layout.clone(),
    };
    let rendered = render(&diagram, &config, &target)
        .with_context(|| format!("failed to render '{}'", diagram.name))?;
    info!(
        "{} nodes, {} edges, {} clusters",
        rendered.nodes, rendered.edges, rendered.clusters
    );
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_script() {
        let args = Args::try_parse_from(["finure-arch"]).unwrap();
        assert_eq!(args.output_format, OutputFormat::Png);
        assert_eq!(args.icons_dir, PathBuf::from("."));
        assert!(args.output.is_none());
        assert_eq!(args.log_level, "warn");
    }

    #[test]
    fn parses_short_and_long_flags() {
        let args = Args::try_parse_from([
            "finure-arch",
            "-e",
            "svg",
            "-o",
            "out.svg",
            "-c",
            "cfg.json5",
            "--scale",
            "2",
        ])
        .unwrap();
        assert_eq!(args.output_format, OutputFormat::Svg);
        assert_eq!(args.output, Some(PathBuf::from("out.svg")));
        assert_eq!(args.scale, Some(2.0));
        assert_eq!(ir::OutputFormat::from(args.output_format), ir::OutputFormat::Svg);
    }

    #[test]
    fn missing_icons_fail_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("finure.dot");
        let args = Args::try_parse_from([
            "finure-arch",
            "-e",
            "dot",
            "-o",
            out.to_str().unwrap(),
            "--icons-dir",
            dir.path().to_str().unwrap(),
        ])
        .unwrap();
        let err = run(&args).unwrap_err();
        assert!(format!("{err:#}").contains("kaggle.png"));
        assert!(!out.exists());
    }
}
