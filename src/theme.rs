use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::model::{Claim, Relation};

/// Border colours handed out to scopes, taken from the end first.
const SCOPE_COLORS: [&str; 22] = [
    "#ff0000", "#ffee00", "#5395a6", "#40002b", "#f20000", "#7f7920", "#6c98d9", "#d9a3bf",
    "#e58273", "#807d60", "#3d3df2", "#ff408c", "#ff8c40", "#5ccc33", "#110080", "#8c2331",
    "#e6c3ac", "#004d29", "#282633", "#593c00", "#00bf99", "#b32daa",
];

/// Colours, fonts and sizes the default style hooks are built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub line_height: f32,
    pub claim_padding: f32,
    pub claim_background: String,
    pub text_color: String,
    pub border_color: String,
    /// Text, border and line colour of anything marked as an assumption.
    pub assumption_color: String,
    pub assumption_font_style: String,
    pub line_color: String,
    pub arrow_radius: f32,
    pub focus_color: String,
    pub blur_color: String,
    pub background: String,
    pub scope_palette: Vec<String>,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "sans-serif".to_string(),
            font_size: 13.0,
            line_height: 16.0,
            claim_padding: 5.0,
            claim_background: "white".to_string(),
            text_color: "black".to_string(),
            border_color: "black".to_string(),
            assumption_color: "#ccc".to_string(),
            assumption_font_style: "italic".to_string(),
            line_color: "black".to_string(),
            arrow_radius: 5.0,
            focus_color: "blue".to_string(),
            blur_color: "gray".to_string(),
            background: "#FFFFFF".to_string(),
            scope_palette: SCOPE_COLORS.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            line_height: 17.0,
            claim_padding: 8.0,
            claim_background: "#F8FAFF".to_string(),
            text_color: "#1C2430".to_string(),
            border_color: "#7A8AA6".to_string(),
            assumption_color: "#B8C2D3".to_string(),
            assumption_font_style: "italic".to_string(),
            line_color: "#7A8AA6".to_string(),
            arrow_radius: 5.0,
            focus_color: "#2F6FEB".to_string(),
            blur_color: "#9AA5B8".to_string(),
            background: "#FFFFFF".to_string(),
            scope_palette: SCOPE_COLORS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}

/// Hands out one border colour per scope and remembers the choice.
#[derive(Debug, Clone, Default)]
pub struct ScopePalette {
    assigned: HashMap<String, String>,
    remaining: Vec<String>,
}

impl ScopePalette {
    pub fn new(colors: Vec<String>) -> Self {
        Self {
            assigned: HashMap::new(),
            remaining: colors,
        }
    }

    /// Colour for `scope`, assigning the next free one on first use. `None`
    /// once the palette has run out.
    pub fn color_for_scope(&mut self, scope: &str) -> Option<String> {
        if let Some(color) = self.assigned.get(scope) {
            return Some(color.clone());
        }
        let color = self.remaining.pop()?;
        self.assigned.insert(scope.to_string(), color.clone());
        Some(color)
    }

    pub fn assigned(&self, scope: &str) -> Option<&str> {
        self.assigned.get(scope).map(String::as_str)
    }
}

pub type ClaimHook = Box<dyn Fn(&Claim) -> String>;
pub type BorderHook = Box<dyn Fn(&Claim, &mut ScopePalette) -> String>;
pub type RelationHook = Box<dyn Fn(&Relation) -> String>;

pub struct ClaimStyle {
    pub padding: f32,
    pub font_size: f32,
    pub line_height: f32,
    pub font_family: String,
    pub background: ClaimHook,
    pub font_color: ClaimHook,
    pub font_style: ClaimHook,
    pub border: BorderHook,
}

pub struct RelationStyle {
    /// Arrowhead radius.
    pub size: f32,
    pub color: RelationHook,
}

/// Everything the canvas needs to paint: numbers plus per-entity hooks.
/// Replace any hook to restyle claims or relations.
pub struct Style {
    /// Device pixel ratio; drawing coordinates are multiplied by it.
    pub scale: f32,
    pub claim: ClaimStyle,
    pub relation: RelationStyle,
    pub focus_color: String,
    pub blur_color: String,
    pub scope_palette: Vec<String>,
    /// Paint the layout containers over the graph.
    pub debug_layout: bool,
}

impl Style {
    pub fn from_theme(theme: &Theme) -> Self {
        let background = theme.claim_background.clone();
        let (text, faded) = (theme.text_color.clone(), theme.assumption_color.clone());
        let italic = theme.assumption_font_style.clone();
        let (border, border_faded) = (theme.border_color.clone(), theme.assumption_color.clone());
        let (line, line_faded) = (theme.line_color.clone(), theme.assumption_color.clone());

        Self {
            scale: 1.0,
            claim: ClaimStyle {
                padding: theme.claim_padding,
                font_size: theme.font_size,
                line_height: theme.line_height,
                font_family: theme.font_family.clone(),
                background: Box::new(move |_| background.clone()),
                font_color: Box::new(move |claim| {
                    if claim.metadata.assumption { faded.clone() } else { text.clone() }
                }),
                font_style: Box::new(move |claim| {
                    if claim.metadata.assumption { italic.clone() } else { String::new() }
                }),
                border: Box::new(move |claim, palette| {
                    let plain = if claim.metadata.assumption { &border_faded } else { &border };
                    match claim.metadata.scope.as_deref() {
                        Some(scope) => palette
                            .color_for_scope(scope)
                            .unwrap_or_else(|| plain.clone()),
                        None => plain.clone(),
                    }
                }),
            },
            relation: RelationStyle {
                size: theme.arrow_radius,
                color: Box::new(move |relation| {
                    if relation.metadata.assumption { line_faded.clone() } else { line.clone() }
                }),
            },
            focus_color: theme.focus_color.clone(),
            blur_color: theme.blur_color.clone(),
            scope_palette: theme.scope_palette.clone(),
            debug_layout: false,
        }
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn palette(&self) -> ScopePalette {
        ScopePalette::new(self.scope_palette.clone())
    }

    /// The settings claim sizes are computed from.
    pub fn text_metrics(&self) -> TextMetrics {
        TextMetrics {
            scale: self.scale,
            padding: self.claim.padding,
            font_size: self.claim.font_size,
            line_height: self.claim.line_height,
            font_family: self.claim.font_family.clone(),
        }
    }
}

/// When two styles report equal metrics, a claim measured under one keeps
/// its size under the other.
#[derive(Debug, Clone, PartialEq)]
pub struct TextMetrics {
    pub scale: f32,
    pub padding: f32,
    pub font_size: f32,
    pub line_height: f32,
    pub font_family: String,
}

impl Default for Style {
    fn default() -> Self {
        Self::from_theme(&Theme::classic())
    }
}

impl fmt::Debug for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Style")
            .field("scale", &self.scale)
            .field("padding", &self.claim.padding)
            .field("font_size", &self.claim.font_size)
            .field("line_height", &self.claim.line_height)
            .field("font_family", &self.claim.font_family)
            .field("arrow_radius", &self.relation.size)
            .field("debug_layout", &self.debug_layout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArgumentGraph, Metadata};

    #[test]
    fn scope_colors_are_stable_and_distinct() {
        let mut palette = ScopePalette::new(vec!["#111".into(), "#222".into()]);
        assert_eq!(palette.color_for_scope("a").as_deref(), Some("#222"));
        assert_eq!(palette.color_for_scope("b").as_deref(), Some("#111"));
        assert_eq!(palette.color_for_scope("a").as_deref(), Some("#222"));
        assert_eq!(palette.color_for_scope("c"), None);
        assert_eq!(palette.assigned("b"), Some("#111"));
    }

    #[test]
    fn default_hooks_fade_assumptions() {
        let mut graph = ArgumentGraph::new();
        let plain = graph.add_claim("plain", Metadata::default());
        let assumed = graph.add_claim("assumed", Metadata::assumption());
        let scoped = graph.add_claim("scoped", Metadata::default().with_scope("s1"));

        let style = Style::default();
        let mut palette = style.palette();
        let plain = graph.claim(plain).unwrap();
        let assumed = graph.claim(assumed).unwrap();
        let scoped = graph.claim(scoped).unwrap();

        assert_eq!((style.claim.font_color)(plain), "black");
        assert_eq!((style.claim.font_color)(assumed), "#ccc");
        assert_eq!((style.claim.font_style)(assumed), "italic");
        assert_eq!((style.claim.border)(assumed, &mut palette), "#ccc");
        assert_eq!((style.claim.border)(scoped, &mut palette), "#b32daa");
        assert_eq!((style.claim.background)(plain), "white");
    }

    #[test]
    fn colours_do_not_change_text_metrics() {
        let mut style = Style::default();
        let before = style.text_metrics();
        style.focus_color = "red".to_string();
        style.claim.background = Box::new(|_| "ivory".to_string());
        assert_eq!(style.text_metrics(), before);

        style.claim.line_height = 20.0;
        assert_ne!(style.text_metrics(), before);
        assert_ne!(Style::default().with_scale(2.0).text_metrics(), before);
    }
}
