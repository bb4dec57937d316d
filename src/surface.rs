//! Drawing surfaces the canvas paints on.
//!
//! The canvas only talks to the [`Surface`] trait, in device pixels. The
//! bundled [`SvgSurface`] turns each call into an SVG element; hosts with a
//! real 2D context implement the trait on top of it.

use crate::geometry::{Path, Point, Rect};
use crate::text_metrics;

/// Font of a text run, in the CSS shorthand sense.
#[derive(Debug, Clone, PartialEq)]
pub struct Font {
    /// `"italic"`, `"bold"` or empty.
    pub style: String,
    pub size: f32,
    pub family: String,
}

impl Font {
    pub fn new(style: impl Into<String>, size: f32, family: impl Into<String>) -> Self {
        Self {
            style: style.into(),
            size,
            family: family.into(),
        }
    }

    /// CSS shorthand, e.g. `italic 13px sans-serif`.
    pub fn css(&self) -> String {
        let size = format!("{}px", self.size);
        [self.style.as_str(), size.as_str(), self.family.as_str()]
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub trait Surface {
    fn resize(&mut self, width: u32, height: u32);
    fn size(&self) -> (u32, u32);
    fn clear(&mut self);
    fn fill_rect(&mut self, rect: Rect, color: &str);
    fn stroke_rect(&mut self, rect: Rect, color: &str, line_width: f32);
    fn stroke_path(&mut self, path: &Path, color: &str, line_width: f32);
    fn fill_path(&mut self, path: &Path, color: &str);
    /// Draws `text` with its baseline starting at `at`.
    fn fill_text(&mut self, text: &str, at: Point, font: &Font, color: &str);
    fn measure_text(&self, text: &str, font: &Font) -> f32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TextMeasure {
    Font,
    Estimate,
}

/// Surface that records drawing calls as SVG markup.
#[derive(Debug, Clone)]
pub struct SvgSurface {
    width: u32,
    height: u32,
    background: Option<String>,
    measure: TextMeasure,
    elements: Vec<String>,
}

impl SvgSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            background: None,
            measure: TextMeasure::Font,
            elements: Vec::new(),
        }
    }

    /// Paint `color` under everything on every clear.
    pub fn with_background(mut self, color: impl Into<String>) -> Self {
        self.background = Some(color.into());
        self
    }

    /// Measure text with the fixed per-glyph estimate instead of system
    /// fonts. Layouts become independent of the fonts installed.
    pub fn fast_text(mut self) -> Self {
        self.measure = TextMeasure::Estimate;
        self
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn to_svg(&self) -> String {
        let (width, height) = (self.width, self.height);
        let mut svg = String::new();
        svg.push_str(&format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
        ));
        if let Some(background) = &self.background {
            svg.push_str(&format!(
                "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
                escape_xml(background)
            ));
        }
        for element in &self.elements {
            svg.push_str(element);
        }
        svg.push_str("</svg>");
        svg
    }
}

impl Surface for SvgSurface {
    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self) {
        self.elements.clear();
    }

    fn fill_rect(&mut self, rect: Rect, color: &str) {
        self.elements.push(format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\"/>",
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            escape_xml(color)
        ));
    }

    fn stroke_rect(&mut self, rect: Rect, color: &str, line_width: f32) {
        self.elements.push(format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{:.2}\"/>",
            rect.x,
            rect.y,
            rect.width,
            rect.height,
            escape_xml(color),
            line_width
        ));
    }

    fn stroke_path(&mut self, path: &Path, color: &str, line_width: f32) {
        self.elements.push(format!(
            "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{:.2}\"/>",
            path_data(path),
            escape_xml(color),
            line_width
        ));
    }

    fn fill_path(&mut self, path: &Path, color: &str) {
        self.elements.push(format!(
            "<path d=\"{}\" fill=\"{}\" stroke=\"none\"/>",
            path_data(path),
            escape_xml(color)
        ));
    }

    fn fill_text(&mut self, text: &str, at: Point, font: &Font, color: &str) {
        let style = match font.style.as_str() {
            "italic" | "oblique" => format!(" font-style=\"{}\"", font.style),
            "bold" => " font-weight=\"bold\"".to_string(),
            _ => String::new(),
        };
        self.elements.push(format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-family=\"{}\" font-size=\"{}\"{} fill=\"{}\" xml:space=\"preserve\">{}</text>",
            at.x,
            at.y,
            escape_xml(&font.family),
            font.size,
            style,
            escape_xml(color),
            escape_xml(text)
        ));
    }

    fn measure_text(&self, text: &str, font: &Font) -> f32 {
        match self.measure {
            TextMeasure::Font => text_metrics::text_width(text, font.size, &font.family),
            TextMeasure::Estimate => text_metrics::estimate_text_width(text, font.size),
        }
    }
}

fn path_data(path: &Path) -> String {
    let mut d = String::new();
    for segment in &path.segments {
        for (idx, point) in segment.iter().enumerate() {
            if !d.is_empty() {
                d.push(' ');
            }
            let op = if idx == 0 { 'M' } else { 'L' };
            d.push_str(&format!("{op} {:.2} {:.2}", point.x, point.y));
        }
        if path.closed && !segment.is_empty() {
            d.push_str(" Z");
        }
    }
    d
}

pub(crate) fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
