use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

/// Average advance of a glyph relative to the font size, used when no font
/// can be loaded or a glyph is missing.
pub const FALLBACK_ADVANCE: f32 = 0.56;

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));

/// Width of `text` set in the first available family of the CSS-like
/// `font_family` list. `None` when no matching system font exists.
pub fn measure_text_width(text: &str, font_size: f32, font_family: &str) -> Option<f32> {
    if text.is_empty() || font_size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = TEXT_MEASURER.lock().ok()?;
    guard.measure(text, font_size, font_family)
}

/// Font-independent width estimate.
pub fn estimate_text_width(text: &str, font_size: f32) -> f32 {
    let text = text.replace('\t', "    ");
    text.chars().filter(|ch| *ch != '\n').count() as f32 * font_size * FALLBACK_ADVANCE
}

/// Measured width, or the estimate when no font is available.
pub fn text_width(text: &str, font_size: f32, font_family: &str) -> f32 {
    measure_text_width(text, font_size, font_family)
        .unwrap_or_else(|| estimate_text_width(text, font_size))
}

struct TextMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    fonts: HashMap<String, Option<LoadedFont>>,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            fonts: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str) -> Option<f32> {
        let key = family_key(font_family);
        if !self.fonts.contains_key(&key) {
            let font = self.load(font_family);
            if font.is_none() {
                tracing::debug!(family = %key, "no system font found, estimating text widths");
            }
            self.fonts.insert(key.clone(), font);
        }
        let font = self.fonts.get_mut(&key)?.as_mut()?;
        Some(font.width(&text.replace('\t', "    "), font_size))
    }

    fn load(&mut self, font_family: &str) -> Option<LoadedFont> {
        let names = family_names(font_family);
        let families: Vec<Family<'_>> = names.iter().map(FamilyName::as_family).collect();

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
            .with_face_data(id, |data, index| LoadedFont::new(data.to_vec(), index))
            .flatten()
    }
}

enum FamilyName {
    Generic(Family<'static>),
    Named(String),
}

impl FamilyName {
    fn as_family(&self) -> Family<'_> {
        match self {
            FamilyName::Generic(family) => *family,
            FamilyName::Named(name) => Family::Name(name),
        }
    }
}

fn family_names(font_family: &str) -> Vec<FamilyName> {
    let mut names: Vec<FamilyName> = font_family
        .split(',')
        .map(|part| part.trim().trim_matches('"').trim_matches('\''))
        .filter(|raw| !raw.is_empty())
        .map(|raw| match raw.to_ascii_lowercase().as_str() {
            "serif" => FamilyName::Generic(Family::Serif),
            "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => {
                FamilyName::Generic(Family::SansSerif)
            }
            "monospace" | "ui-monospace" => FamilyName::Generic(Family::Monospace),
            "cursive" => FamilyName::Generic(Family::Cursive),
            "fantasy" => FamilyName::Generic(Family::Fantasy),
            _ => FamilyName::Named(raw.to_string()),
        })
        .collect();
    if names.is_empty() {
        names.push(FamilyName::Generic(Family::SansSerif));
    }
    names
}

fn family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "sans-serif".to_string()
    } else {
        trimmed.to_string()
    }
}

struct LoadedFont {
    data: Vec<u8>,
    index: u32,
    units_per_em: u16,
    ascii: [Option<u16>; 128],
    advances: HashMap<char, Option<u16>>,
}

impl LoadedFont {
    fn new(data: Vec<u8>, index: u32) -> Option<Self> {
        let face = Face::parse(&data, index).ok()?;
        let units_per_em = face.units_per_em().max(1);
        let mut ascii = [None; 128];
        for (byte, slot) in ascii.iter_mut().enumerate() {
            *slot = glyph_advance(&face, byte as u8 as char);
        }
        Some(Self {
            data,
            index,
            units_per_em,
            ascii,
            advances: HashMap::new(),
        })
    }

    fn advance(&mut self, ch: char) -> Option<u16> {
        if ch.is_ascii() {
            return self.ascii[ch as usize];
        }
        if let Some(advance) = self.advances.get(&ch) {
            return *advance;
        }
        let advance = Face::parse(&self.data, self.index)
            .ok()
            .and_then(|face| glyph_advance(&face, ch));
        self.advances.insert(ch, advance);
        advance
    }

    fn width(&mut self, text: &str, font_size: f32) -> f32 {
        let scale = font_size / self.units_per_em as f32;
        let fallback = font_size * FALLBACK_ADVANCE;
        let mut width = 0.0f32;
        for ch in text.chars().filter(|ch| *ch != '\n') {
            width += match self.advance(ch) {
                Some(advance) if advance > 0 => advance as f32 * scale,
                _ => fallback,
            };
        }
        width.max(0.0)
    }
}

fn glyph_advance(face: &Face<'_>, ch: char) -> Option<u16> {
    face.glyph_index(ch)
        .and_then(|glyph| face.glyph_hor_advance(glyph))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_no_width() {
        assert_eq!(measure_text_width("", 13.0, "sans-serif"), Some(0.0));
        assert_eq!(text_width("", 13.0, "sans-serif"), 0.0);
    }

    #[test]
    fn estimate_grows_with_length() {
        let short = estimate_text_width("He is a man", 13.0);
        let long = estimate_text_width("Socrates is mortal", 13.0);
        assert!(long > short);
        assert_eq!(estimate_text_width("ab", 10.0), 2.0 * 10.0 * FALLBACK_ADVANCE);
    }

    #[test]
    fn longer_text_measures_wider() {
        let short = text_width("He is a man", 13.0, "sans-serif");
        let long = text_width("Socrates is mortal", 13.0, "sans-serif");
        assert!(long > short);
    }

    #[test]
    fn family_list_understands_generics() {
        let names = family_names("\"Inter\", system-ui, monospace");
        assert_eq!(names.len(), 3);
        assert!(matches!(&names[0], FamilyName::Named(name) if name == "Inter"));
        assert!(matches!(names[1], FamilyName::Generic(Family::SansSerif)));
        assert!(matches!(names[2], FamilyName::Generic(Family::Monospace)));
        assert!(matches!(family_names("")[0], FamilyName::Generic(Family::SansSerif)));
    }
}
