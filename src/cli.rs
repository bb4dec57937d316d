use crate::config::{Config, load_config};
use crate::ingest::parse_payload;
use crate::layout_dump::write_layout_dump;
use crate::render::{write_output_png, write_output_svg};
use crate::script::parse_script;
use crate::{RenderOptions, render_canvas, render_script_canvas};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "argmap", version, about = "Lay out and render argument graphs")]
pub struct Args {
    /// Input payload (.json / .json5), script (.txt / .hasl) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Input format; `auto` picks `script` for .txt and .hasl files
    #[arg(short = 'f', long = "format", value_enum, default_value = "auto")]
    pub input_format: InputFormat,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (theme, themeVariables, layout)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Write claim and relation positions as JSON
    #[arg(long = "dump-layout")]
    pub dump_layout: Option<PathBuf>,

    /// Space above the topmost claim; scripts also get it left of the leftmost
    #[arg(long = "padding")]
    pub padding: Option<f32>,

    /// Device pixels per layout unit
    #[arg(long = "scale")]
    pub scale: Option<f32>,

    /// Draw the layout boxes over the graph
    #[arg(long = "debug-layout")]
    pub debug_layout: bool,

    /// Measure text with a fixed glyph width instead of system fonts
    #[arg(long = "fast-text")]
    pub fast_text: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Auto,
    Json,
    Script,
}

impl InputFormat {
    fn resolve(self, input: Option<&Path>) -> InputFormat {
        if self != InputFormat::Auto {
            return self;
        }
        let ext = input
            .and_then(Path::extension)
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("txt" | "hasl") => InputFormat::Script,
            _ => InputFormat::Json,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
}

pub fn run() -> Result<()> {
    init_tracing();
    run_with_args(Args::parse())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

pub fn run_with_args(args: Args) -> Result<()> {
    let config = apply_overrides(load_config(args.config.as_deref())?, &args)?;
    let input = read_input(args.input.as_deref())?;

    let options = RenderOptions {
        config,
        fast_text: args.fast_text,
        debug_layout: args.debug_layout,
    };
    let canvas = match args.input_format.resolve(args.input.as_deref()) {
        InputFormat::Script => render_script_canvas(&parse_script(&input), &options)?,
        _ => render_canvas(&parse_payload(&input)?, &options)?,
    };
    tracing::info!(
        claims = canvas.graph().claim_count(),
        relations = canvas.graph().relation_count(),
        "rendered argument graph"
    );

    if let Some(path) = args.dump_layout.as_deref() {
        write_layout_dump(path, canvas.graph())?;
    }

    let svg = canvas.surface().to_svg();
    match args.output_format {
        OutputFormat::Svg => write_output_svg(&svg, args.output.as_deref())?,
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            write_output_png(&svg, &output, &options.config.render)?;
        }
    }
    Ok(())
}

fn apply_overrides(mut config: Config, args: &Args) -> Result<Config> {
    if let Some(padding) = args.padding {
        config.render.padding = padding;
    }
    if let Some(scale) = args.scale {
        if scale <= 0.0 {
            anyhow::bail!("scale must be positive, got {scale}");
        }
        config.render.scale = scale;
    }
    Ok(config)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return Ok(std::fs::read_to_string(path)?);
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
        "claims": [{"id": 1, "text": "Tweety flies"}, {"id": 2, "text": "Tweety is a bird"}],
        "relations": [{"id": 1, "sources": [{"cls": "claim", "id": 2}],
                       "target": {"cls": "claim", "id": 1}, "type": "support"}]
    }"#;

    const SCRIPT: &str = "\
a: Tweety flies
b: Tweety is a bird
c: assume Birds fly
x: b c supports a
";

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["argmap"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn parses_flags() {
        let parsed = args(&["-i", "in.json", "-e", "png", "--padding", "4", "--debug-layout"]);
        assert_eq!(parsed.input.as_deref(), Some(Path::new("in.json")));
        assert_eq!(parsed.output_format, OutputFormat::Png);
        assert_eq!(parsed.padding, Some(4.0));
        assert!(parsed.debug_layout);
        assert!(!parsed.fast_text);
    }

    #[test]
    fn input_format_follows_the_extension() {
        let auto = InputFormat::Auto;
        assert_eq!(auto.resolve(Some(Path::new("a.hasl"))), InputFormat::Script);
        assert_eq!(auto.resolve(Some(Path::new("a.TXT"))), InputFormat::Script);
        assert_eq!(auto.resolve(Some(Path::new("a.json5"))), InputFormat::Json);
        assert_eq!(auto.resolve(None), InputFormat::Json);
        let forced = InputFormat::Script;
        assert_eq!(forced.resolve(Some(Path::new("a.json"))), InputFormat::Script);
    }

    #[test]
    fn png_needs_an_output_path() {
        assert!(ensure_output(&None, "png").is_err());
        assert!(ensure_output(&Some(PathBuf::from("a.png")), "png").is_ok());
    }

    #[test]
    fn rejects_non_positive_scale() {
        let parsed = args(&["--scale", "0"]);
        assert!(apply_overrides(Config::default(), &parsed).is_err());
    }

    #[test]
    fn writes_svg_and_layout_dump() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("payload.json");
        let output = dir.path().join("out.svg");
        let dump = dir.path().join("layout.json");
        std::fs::write(&input, PAYLOAD).unwrap();

        run_with_args(args(&[
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--dump-layout",
            dump.to_str().unwrap(),
            "--fast-text",
        ]))
        .unwrap();

        let svg = std::fs::read_to_string(&output).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Tweety is a bird"));
        let layout: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&dump).unwrap()).unwrap();
        assert_eq!(layout["claims"].as_array().unwrap().len(), 2);
        assert_eq!(layout["claims"][0]["y"], 10.0);
    }

    #[test]
    fn scripts_are_fitted_on_both_axes() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("tweety.hasl");
        let output = dir.path().join("out.svg");
        let dump = dir.path().join("layout.json");
        std::fs::write(&input, SCRIPT).unwrap();

        run_with_args(args(&[
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--dump-layout",
            dump.to_str().unwrap(),
            "--fast-text",
        ]))
        .unwrap();

        let svg = std::fs::read_to_string(&output).unwrap();
        assert!(svg.contains("Birds fly"));
        let layout: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&dump).unwrap()).unwrap();
        let claims = layout["claims"].as_array().unwrap();
        assert_eq!(claims.len(), 4);
        let min = |key: &str| {
            claims
                .iter()
                .map(|claim| claim[key].as_f64().unwrap())
                .fold(f64::INFINITY, f64::min)
        };
        assert_eq!((min("x"), min("y")), (10.0, 10.0));
    }

    #[test]
    fn script_errors_name_the_line() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("broken.txt");
        std::fs::write(&input, "a: Tweety flies\nx: n supports a\n").unwrap();
        let err = run_with_args(args(&["-i", input.to_str().unwrap(), "--fast-text"]))
            .unwrap_err();
        assert_eq!(err.to_string(), "parse error on line 2: variable \"n\" is unknown");
    }
}
