use crate::ir::ClusterId;
use std::path::PathBuf;
use thiserror::Error;

/// Structural problems in a diagram declaration.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("edge {index} references undeclared node n{endpoint}")]
    DanglingEdge { index: usize, endpoint: usize },
    #[error("{owner} references undeclared cluster {cluster:?}")]
    UnknownCluster { owner: String, cluster: ClusterId },
    #[error("{owner} has invalid color '{color}'")]
    InvalidColor { owner: String, color: String },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to read icon {}: {source}", path.display())]
    Icon {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported icon format: {}", path.display())]
    UnsupportedIcon { path: PathBuf },
    #[error("svg parse failed: {0}")]
    Svg(String),
    #[error("failed to allocate {width}x{height} pixmap")]
    Pixmap { width: u32, height: u32 },
    #[error("png encode failed: {0}")]
    Png(String),
    #[error("layout dump failed: {0}")]
    Dump(#[from] serde_json::Error),
    #[error("{0} output is not compiled in")]
    FormatDisabled(&'static str),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
