pub mod catalog;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod context;
pub mod dot;
pub mod error;
pub mod finure;
pub mod icons;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod render;
pub mod text_metrics;
pub mod theme;
pub mod validate;

pub use catalog::Glyph;
#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, LayoutConfig, RenderConfig, load_config};
pub use context::{RenderTarget, Rendered, render, render_diagram};
pub use dot::to_dot;
pub use error::{Error, Result, ValidationError};
pub use finure::{declare_finure, finure_diagram, finure_options};
pub use icons::IconStore;
pub use ir::{
    ClusterAttrs, Diagram, DiagramOptions, EdgeAttrs, EdgeDirection, EdgeStyle, Icon, NodeId,
    OutputFormat,
};
pub use layout::compute_layout;
pub use render::render_svg;
pub use theme::Theme;
