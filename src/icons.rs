//! Custom icon assets, loaded from disk and embedded as data URIs.

use crate::error::{Error, Result};
use crate::ir::{Diagram, Icon};
use base64::Engine as _;
use log::debug;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Gif,
    Svg,
}

impl ImageKind {
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            return Some(Self::Png);
        }
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }
        if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }
        let head = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]);
        let head = head.trim_start();
        if head.starts_with("<svg") || (head.starts_with("<?xml") && head.contains("<svg")) {
            return Some(Self::Svg);
        }
        None
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Svg => "image/svg+xml",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadedIcon {
    pub kind: ImageKind,
    pub data_uri: String,
}

/// Resolves `Icon::Custom` paths against a base directory and caches the result.
#[derive(Debug, Default)]
pub struct IconStore {
    base_dir: PathBuf,
    loaded: HashMap<PathBuf, LoadedIcon>,
}

impl IconStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            loaded: HashMap::new(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Loads every custom icon the diagram uses. Fails on the first missing file.
    pub fn preload(&mut self, diagram: &Diagram) -> Result<()> {
        for node in diagram.nodes() {
            if let Icon::Custom(path) = &node.icon {
                self.load(path)?;
            }
        }
        debug!("loaded {} custom icons from {}", self.loaded.len(), self.base_dir.display());
        Ok(())
    }

    pub fn load(&mut self, path: &Path) -> Result<&LoadedIcon> {
        if !self.loaded.contains_key(path) {
            let resolved = self.resolve(path);
            let bytes = std::fs::read(&resolved).map_err(|source| Error::Icon {
                path: resolved.clone(),
                source,
            })?;
            let kind = ImageKind::sniff(&bytes)
                .ok_or_else(|| Error::UnsupportedIcon { path: resolved })?;
            let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
            self.loaded.insert(
                path.to_path_buf(),
                LoadedIcon {
                    kind,
                    data_uri: format!("data:{};base64,{}", kind.mime(), encoded),
                },
            );
        }
        self.loaded
            .get(path)
            .ok_or_else(|| Error::UnsupportedIcon { path: path.to_path_buf() })
    }

    /// Previously loaded icon, if any.
    pub fn get(&self, path: &Path) -> Option<&LoadedIcon> {
        self.loaded.get(path)
    }
}
