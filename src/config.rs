use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Side of the square icon box (diagrams default: 1.4in).
    pub icon_size: f32,
    pub label_gap: f32,
    pub label_line_height: f32,
    pub max_label_width_chars: usize,
    pub cluster_padding: f32,
    pub cluster_label_height: f32,
    pub parallel_edge_spacing: f32,
    pub order_passes: usize,
    /// Opt-in dagre placement. Falls back to the manual ranking when dagre fails.
    pub use_dagre: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            icon_size: 1.4 * crate::ir::POINTS_PER_INCH,
            label_gap: 6.0,
            label_line_height: 1.25,
            max_label_width_chars: 32,
            cluster_padding: 18.0,
            cluster_label_height: 24.0,
            parallel_edge_spacing: 12.0,
            order_passes: 4,
            use_dagre: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub scale: f32,
    pub font_family: String,
    pub load_system_fonts: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            font_family: "Inter".to_string(),
            load_system_fonts: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    cluster_font_size: Option<f32>,
    text_color: Option<String>,
    line_color: Option<String>,
    edge_label_color: Option<String>,
    edge_label_background: Option<String>,
    cluster_backgrounds: Option<Vec<String>>,
    cluster_border: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutOverrides {
    icon_size: Option<f32>,
    label_gap: Option<f32>,
    max_label_width_chars: Option<usize>,
    cluster_padding: Option<f32>,
    parallel_edge_spacing: Option<f32>,
    order_passes: Option<usize>,
    use_dagre: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderOverrides {
    scale: Option<f32>,
    font_family: Option<String>,
    load_system_fonts: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutOverrides>,
    render: Option<RenderOverrides>,
}

/// Loads a JSON5 config file on top of the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = json5::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        config.theme = Theme::from_name(theme_name)
            .ok_or_else(|| anyhow::anyhow!("unknown theme '{theme_name}'"))?;
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.cluster_font_size {
            config.theme.cluster_font_size = v;
        }
        if let Some(v) = vars.text_color {
            config.theme.text_color = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.edge_label_color {
            config.theme.edge_label_color = v;
        }
        if let Some(v) = vars.edge_label_background {
            config.theme.edge_label_background = v;
        }
        if let Some(v) = vars.cluster_backgrounds {
            config.theme.cluster_backgrounds = v;
        }
        if let Some(v) = vars.cluster_border {
            config.theme.cluster_border = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
    }

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.icon_size {
            config.layout.icon_size = v;
        }
        if let Some(v) = layout.label_gap {
            config.layout.label_gap = v;
        }
        if let Some(v) = layout.max_label_width_chars {
            config.layout.max_label_width_chars = v.max(1);
        }
        if let Some(v) = layout.cluster_padding {
            config.layout.cluster_padding = v;
        }
        if let Some(v) = layout.parallel_edge_spacing {
            config.layout.parallel_edge_spacing = v;
        }
        if let Some(v) = layout.order_passes {
            config.layout.order_passes = v;
        }
        if let Some(v) = layout.use_dagre {
            config.layout.use_dagre = v;
        }
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.scale {
            anyhow::ensure!(v > 0.0, "render scale must be positive, got {v}");
            config.render.scale = v;
        }
        if let Some(v) = render.font_family {
            config.render.font_family = v;
        }
        if let Some(v) = render.load_system_fonts {
            config.render.load_system_fonts = v;
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_gives_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.theme.line_color, "#7B8894");
        assert!(!config.layout.use_dagre);
    }

    #[test]
    fn json5_overrides_apply() {
        let config = parse_config(
            r##"{
                // comments are allowed
                theme: "modern",
                themeVariables: { fontSize: 14, lineColor: "#000" },
                layout: { iconSize: 64, useDagre: true },
                render: { scale: 2 },
            }"##,
        )
        .unwrap();
        assert_eq!(config.theme.font_size, 14.0);
        assert_eq!(config.theme.line_color, "#000");
        assert_eq!(config.layout.icon_size, 64.0);
        assert!(config.layout.use_dagre);
        assert_eq!(config.render.scale, 2.0);
    }

    #[test]
    fn rejects_unknown_theme_and_bad_scale() {
        assert!(parse_config(r#"{ theme: "neon" }"#).is_err());
        assert!(parse_config(r#"{ render: { scale: 0 } }"#).is_err());
    }
}
