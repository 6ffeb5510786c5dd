use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub cluster_font_size: f32,
    pub text_color: String,
    pub line_color: String,
    pub edge_label_color: String,
    pub edge_label_background: String,
    pub cluster_backgrounds: Vec<String>,
    pub cluster_border: String,
    pub background: String,
    pub glyph_text_color: String,
}

impl Theme {
    /// Icon-diagram defaults: 13pt labels, slate edges, pastel cluster bands.
    pub fn diagrams_default() -> Self {
        Self {
            font_family: "Sans-Serif".to_string(),
            font_size: 13.0,
            cluster_font_size: 12.0,
            text_color: "#2D3436".to_string(),
            line_color: "#7B8894".to_string(),
            edge_label_color: "#2D3436".to_string(),
            edge_label_background: "none".to_string(),
            cluster_backgrounds: vec![
                "#E5F5FD".to_string(),
                "#EBF3E7".to_string(),
                "#ECE8F6".to_string(),
                "#FDF7E3".to_string(),
            ],
            cluster_border: "#AEB6BE".to_string(),
            background: "#FFFFFF".to_string(),
            glyph_text_color: "#FFFFFF".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 12.0,
            cluster_font_size: 12.0,
            text_color: "#1C2430".to_string(),
            line_color: "#7A8AA6".to_string(),
            edge_label_color: "#1C2430".to_string(),
            edge_label_background: "#FFFFFF".to_string(),
            cluster_backgrounds: vec![
                "#F7FAFF".to_string(),
                "#EEF2F8".to_string(),
                "#F4F1FA".to_string(),
                "#FBF8EE".to_string(),
            ],
            cluster_border: "#D7E0F0".to_string(),
            background: "#FFFFFF".to_string(),
            glyph_text_color: "#FFFFFF".to_string(),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "diagrams" | "default" | "base" => Some(Self::diagrams_default()),
            "modern" => Some(Self::modern()),
            _ => None,
        }
    }

    pub fn cluster_background(&self, depth: usize) -> &str {
        if self.cluster_backgrounds.is_empty() {
            return "none";
        }
        &self.cluster_backgrounds[depth % self.cluster_backgrounds.len()]
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::diagrams_default()
    }
}
