use argmap::{RenderOptions, render_script_with_options, render_with_options};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArgumentRenderOptions {
    theme: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    scale: Option<f32>,
    padding: Option<f32>,
    fast_text: Option<bool>,
    debug_layout: Option<bool>,
}

fn build_render_options(options: ArgumentRenderOptions) -> RenderOptions {
    let mut render_options = if options.theme.as_deref() == Some("modern") {
        RenderOptions::modern()
    } else {
        RenderOptions::classic()
    };

    let config = &mut render_options.config;
    if let Some(font_family) = options.font_family {
        config.theme.font_family = font_family;
    }
    if let Some(font_size) = options.font_size {
        config.theme.font_size = font_size;
    }
    if let Some(scale) = options.scale.filter(|scale| *scale > 0.0) {
        config.render.scale = scale;
    }
    if let Some(padding) = options.padding {
        config.render.padding = padding;
    }
    // No system fonts in the browser; the estimate is the default there.
    render_options.fast_text = options.fast_text.unwrap_or(true);
    render_options.debug_layout = options.debug_layout.unwrap_or(false);

    render_options
}

#[wasm_bindgen]
pub fn render_argument_svg(payload: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let render_options = parse_options(options_json)?;
    render_with_options(payload, render_options).map_err(to_js_error)
}

#[wasm_bindgen]
pub fn render_argument_script_svg(
    script: &str,
    options_json: Option<String>,
) -> Result<String, JsValue> {
    let render_options = parse_options(options_json)?;
    render_script_with_options(script, render_options).map_err(to_js_error)
}

fn parse_options(options_json: Option<String>) -> Result<RenderOptions, JsValue> {
    let options = match options_json {
        Some(raw_options) => serde_json::from_str::<ArgumentRenderOptions>(&raw_options)
            .map_err(|error| JsValue::from_str(&error.to_string()))?,
        None => ArgumentRenderOptions::default(),
    };
    Ok(build_render_options(options))
}

fn to_js_error(error: anyhow::Error) -> JsValue {
    JsValue::from_str(&error.to_string())
}

#[cfg(test)]
mod tests {
    use argmap::{render_script_with_options, render_with_options};

    use crate::{ArgumentRenderOptions, build_render_options};

    #[test]
    fn renders_support_and_attack() {
        let payload = r#"{
            "claims": [
                {"id": 1, "text": "We should cycle to work"},
                {"id": 2, "text": "Cycling is healthy"},
                {"id": 3, "text": "It rains a lot", "assumption": true}
            ],
            "relations": [
                {"id": 1, "sources": [{"cls": "claim", "id": 2}],
                 "target": {"cls": "claim", "id": 1}, "type": "support"},
                {"id": 2, "sources": [{"cls": "claim", "id": 3}],
                 "target": {"cls": "relation", "id": 1}, "type": "attack"}
            ]
        }"#;

        let options = build_render_options(ArgumentRenderOptions::default());
        let svg = render_with_options(payload, options).expect("argument graph should render");

        assert!(svg.contains("<svg"));
        assert!(svg.contains("Cycling is healthy"));
        assert!(svg.contains("It rains a lot"));
    }

    #[test]
    fn renders_scripts() {
        let script = "a: We should cycle to work\nb: Cycling is healthy\nx: b supports a\n";
        let options = build_render_options(ArgumentRenderOptions::default());
        let svg = render_script_with_options(script, options).expect("script should render");
        assert!(svg.contains("Cycling is healthy"));

        let options = build_render_options(ArgumentRenderOptions::default());
        let err = render_script_with_options("x: b supports a\n", options).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn modern_theme_and_scale_are_applied() {
        let options = build_render_options(ArgumentRenderOptions {
            theme: Some("modern".to_string()),
            scale: Some(2.0),
            ..ArgumentRenderOptions::default()
        });
        assert_eq!(options.config.render.scale, 2.0);
        assert_eq!(options.config.theme.claim_padding, 8.0);
        assert!(options.fast_text);
    }
}
