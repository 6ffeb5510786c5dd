use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));

/// Width of `text` in the first installed family of `font_family`, if any is installed.
pub fn measure_text_width(text: &str, font_size: f32, font_family: &str) -> Option<f32> {
    if text.is_empty() || font_size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = TEXT_MEASURER.lock().ok()?;
    guard.measure(text, font_size, font_family)
}

/// Width estimate used when no font could be loaded.
pub fn approximate_text_width(text: &str, font_size: f32) -> f32 {
    text.chars()
        .map(|ch| match ch {
            'i' | 'l' | 'j' | '.' | ',' | ':' | ';' | '\'' | '|' | '!' => 0.3,
            'm' | 'w' | 'M' | 'W' => 0.85,
            ' ' => 0.3,
            c if c.is_ascii_uppercase() => 0.68,
            _ => 0.55,
        })
        .sum::<f32>()
        * font_size
}

pub fn text_width(text: &str, font_size: f32, font_family: &str) -> f32 {
    measure_text_width(text, font_size, font_family)
        .unwrap_or_else(|| approximate_text_width(text, font_size))
}

struct TextMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    cache: HashMap<String, Option<FontMetrics>>,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            cache: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str) -> Option<f32> {
        let key = normalize_family_key(font_family);
        if !self.cache.contains_key(&key) {
            let metrics = self.load_metrics(font_family);
            if metrics.is_none() {
                log::warn!("no font found for '{font_family}', using approximate text widths");
            }
            self.cache.insert(key.clone(), metrics);
        }
        let metrics = self.cache.get(&key)?.as_ref()?;
        Some(metrics.width(text, font_size))
    }

    fn load_metrics(&mut self, font_family: &str) -> Option<FontMetrics> {
        let names = family_names(font_family);
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|name| generic_family(name).unwrap_or(Family::Name(name.as_str())))
            .collect();
        families.push(Family::SansSerif);

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        self.db
            .with_face_data(id, |data, index| {
                Face::parse(data, index).ok().map(|face| FontMetrics::from_face(&face))
            })
            .flatten()
    }
}

/// Horizontal advances of one face, in font units.
struct FontMetrics {
    units_per_em: f32,
    advances: HashMap<char, u16>,
    fallback_advance: f32,
}

impl FontMetrics {
    fn from_face(face: &Face<'_>) -> Self {
        let units_per_em = face.units_per_em().max(1) as f32;
        let mut advances = HashMap::new();
        let chars = (' '..='~').chain("–—’“”…·×→←↔éèàüöäñ".chars());
        for ch in chars {
            if let Some(advance) = face
                .glyph_index(ch)
                .and_then(|glyph| face.glyph_hor_advance(glyph))
            {
                advances.insert(ch, advance);
            }
        }
        Self {
            units_per_em,
            advances,
            fallback_advance: units_per_em * 0.56,
        }
    }

    fn width(&self, text: &str, font_size: f32) -> f32 {
        let scale = font_size / self.units_per_em;
        let units: f32 = text
            .chars()
            .filter(|ch| *ch != '\n')
            .map(|ch| {
                self.advances
                    .get(&ch)
                    .map(|advance| *advance as f32)
                    .unwrap_or(self.fallback_advance)
            })
            .sum();
        (units * scale).max(0.0)
    }
}

fn family_names(font_family: &str) -> Vec<String> {
    font_family
        .split(',')
        .map(|part| part.trim().trim_matches('"').trim_matches('\'').to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

fn generic_family(name: &str) -> Option<Family<'static>> {
    match name.to_ascii_lowercase().as_str() {
        "serif" => Some(Family::Serif),
        "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => Some(Family::SansSerif),
        "monospace" | "ui-monospace" => Some(Family::Monospace),
        "cursive" => Some(Family::Cursive),
        "fantasy" => Some(Family::Fantasy),
        _ => None,
    }
}

fn normalize_family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "sans-serif".to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approximate_width_grows_with_text() {
        let short = approximate_text_width("Loki", 13.0);
        let long = approximate_text_width("OpenTelemetry Collector", 13.0);
        assert!(short > 0.0);
        assert!(long > short * 3.0);
    }

    #[test]
    fn empty_text_has_zero_width() {
        assert_eq!(measure_text_width("", 13.0, "Inter"), Some(0.0));
    }

    #[test]
    fn family_list_parsing() {
        assert_eq!(
            family_names("Inter, \"Segoe UI\", sans-serif"),
            vec!["Inter", "Segoe UI", "sans-serif"]
        );
        assert!(generic_family("Sans-Serif").is_some());
        assert!(generic_family("Inter").is_none());
    }
}
