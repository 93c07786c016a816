use crate::config::{Config, apply_label_options, load_config, parse_json_or_json5};
use crate::ir::{LabelInput, SceneMark};
use crate::layout::{base_mark, compute_label_layout};
use crate::layout_dump::write_label_dump;
use crate::render::{render_svg, write_output_svg};
use anyhow::Result;
use clap::{ArgAction, Parser, ValueEnum};
use log::info;
use serde::Deserialize;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "chlabel", version, about = "Collision-free label placement for chart scenes")]
pub struct Args {
    /// Scene file (.json/.json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for JSON and SVG.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "json")]
    pub output_format: OutputFormat,

    /// Config JSON file (label options, theme, themeVariables)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Chart width, overriding the configured size
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Chart height, overriding the configured size
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// More log output (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Svg,
    Png,
}

/// Input scene: labels with their base marks, plus optional inline label options.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub labels: Vec<LabelInput>,
    #[serde(default)]
    pub label: Option<serde_json::Value>,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose, args.quiet);

    let mut config = load_config(args.config.as_deref())?;
    let input = read_input(args.input.as_deref())?;
    let scene: Scene = parse_json_or_json5(&input)?;
    if let Some(options) = scene.label {
        apply_label_options(&mut config.label, options)?;
    }
    apply_size_overrides(&mut config, args.width, args.height);

    let labels = scene.labels;
    let layout = compute_label_layout(&labels, &config.label)?;
    info!(
        "placed {} of {} label(s)",
        layout.stats.placed,
        labels.len()
    );
    let size = config.label.chart_size()?;

    match args.output_format {
        OutputFormat::Json => {
            write_label_dump(args.output.as_deref(), &labels, &layout, size)?;
        }
        OutputFormat::Svg => {
            let svg = render_preview(&labels, &layout, &config, size);
            write_output_svg(&svg, args.output.as_deref())?;
        }
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            let svg = render_preview(&labels, &layout, &config, size);
            write_png(&svg, &output, &config)?;
        }
    }
    Ok(())
}

fn render_preview(
    labels: &[LabelInput],
    layout: &crate::layout::LabelLayout,
    config: &Config,
    size: (f32, f32),
) -> String {
    let mut marks: Vec<SceneMark> = config.label.avoid_marks.clone();
    marks.extend(base_mark(labels));
    render_svg(labels, layout, &marks, size, &config.theme)
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, config: &Config) -> Result<()> {
    crate::render::write_output_png(svg, output, &config.render)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _config: &Config) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn setup_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));
    if quiet || verbose > 0 {
        builder.parse_filters(level);
    }
    // A logger installed by an embedding program wins.
    let _ = builder.format_timestamp_secs().try_init();
}

/// `-w`/`-H` replace one or both chart dimensions; a missing dimension comes
/// from the configured size, or from the render size when none is configured.
fn apply_size_overrides(config: &mut Config, width: Option<f32>, height: Option<f32>) {
    if width.is_none() && height.is_none() {
        return;
    }
    let (base_width, base_height) = config
        .label
        .chart_size()
        .unwrap_or((config.render.width, config.render.height));
    let width = width.unwrap_or(base_width);
    let height = height.unwrap_or(base_height);
    config.label.size = Some(vec![width, height]);
    config.render.width = width;
    config.render.height = height;
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path != Path::new("-") {
            return Ok(std::fs::read_to_string(path)?);
        }
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!(
        "Output path required for {} output",
        ext
    ))
}
