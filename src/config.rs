use crate::theme::{Style, Theme};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Gap between children of a horizontal container.
    pub horizontal_spacing: f32,
    /// Gap between children of a vertical container.
    pub vertical_spacing: f32,
    pub origin_x: f32,
    pub origin_y: f32,
    /// Room left of a relation's own incoming relations, for the arrow into it.
    pub relation_spacer: Size,
    /// Room above a relation that nothing supports or attacks.
    pub leaf_spacer: Size,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            horizontal_spacing: 10.0,
            vertical_spacing: 10.0,
            origin_x: 20.0,
            origin_y: 20.0,
            relation_spacer: Size::new(200.0, 20.0),
            leaf_spacer: Size::new(20.0, 50.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub scale: f32,
    pub padding: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
            scale: 1.0,
            padding: 10.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::classic();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            render,
        }
    }
}

impl Config {
    /// Style hooks for this configuration's theme at its render scale.
    pub fn style(&self) -> Style {
        Style::from_theme(&self.theme).with_scale(self.render.scale)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    line_height: Option<f32>,
    padding: Option<f32>,
    background_color: Option<String>,
    claim_background: Option<String>,
    text_color: Option<String>,
    border_color: Option<String>,
    assumption_color: Option<String>,
    assumption_font_style: Option<String>,
    line_color: Option<String>,
    arrow_radius: Option<f32>,
    focus_color: Option<String>,
    blur_color: Option<String>,
    scope_palette: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutConfigFile {
    horizontal_spacing: Option<f32>,
    vertical_spacing: Option<f32>,
    origin: Option<[f32; 2]>,
    relation_spacer: Option<Size>,
    leaf_spacer: Option<Size>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutConfigFile>,
    scale: Option<f32>,
    padding: Option<f32>,
    width: Option<f32>,
    height: Option<f32>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = serde_json::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        match theme_name {
            "modern" => config.theme = Theme::modern(),
            "classic" | "default" => config.theme = Theme::classic(),
            other => anyhow::bail!("unknown theme '{other}'"),
        }
        config.render.background = config.theme.background.clone();
    }

    if let Some(vars) = parsed.theme_variables {
        let theme = &mut config.theme;
        if let Some(v) = vars.font_family {
            theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            theme.font_size = v;
        }
        if let Some(v) = vars.line_height {
            theme.line_height = v;
        }
        if let Some(v) = vars.padding {
            theme.claim_padding = v;
        }
        if let Some(v) = vars.claim_background {
            theme.claim_background = v;
        }
        if let Some(v) = vars.text_color {
            theme.text_color = v;
        }
        if let Some(v) = vars.border_color {
            theme.border_color = v;
        }
        if let Some(v) = vars.assumption_color {
            theme.assumption_color = v;
        }
        if let Some(v) = vars.assumption_font_style {
            theme.assumption_font_style = v;
        }
        if let Some(v) = vars.line_color {
            theme.line_color = v;
        }
        if let Some(v) = vars.arrow_radius {
            theme.arrow_radius = v;
        }
        if let Some(v) = vars.focus_color {
            theme.focus_color = v;
        }
        if let Some(v) = vars.blur_color {
            theme.blur_color = v;
        }
        if let Some(v) = vars.scope_palette {
            theme.scope_palette = v;
        }
        if let Some(v) = vars.background_color {
            theme.background = v.clone();
            config.render.background = v;
        }
    }

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout.horizontal_spacing {
            config.layout.horizontal_spacing = v;
        }
        if let Some(v) = layout.vertical_spacing {
            config.layout.vertical_spacing = v;
        }
        if let Some([x, y]) = layout.origin {
            config.layout.origin_x = x;
            config.layout.origin_y = y;
        }
        if let Some(v) = layout.relation_spacer {
            config.layout.relation_spacer = v;
        }
        if let Some(v) = layout.leaf_spacer {
            config.layout.leaf_spacer = v;
        }
    }

    if let Some(v) = parsed.scale {
        anyhow::ensure!(v > 0.0, "scale must be positive, got {v}");
        config.render.scale = v;
    }
    if let Some(v) = parsed.padding {
        config.render.padding = v;
    }
    if let Some(v) = parsed.width {
        config.render.width = v;
    }
    if let Some(v) = parsed.height {
        config.render.height = v;
    }

    Ok(config)
}
