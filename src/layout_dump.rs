use crate::ir::LabelInput;
use crate::layout::{Align, Baseline, LabelLayout, LayoutStats};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelDump {
    pub width: f32,
    pub height: f32,
    pub stats: LayoutStats,
    pub labels: Vec<LabelEntryDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelEntryDump {
    pub index: usize,
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub opacity: f32,
    pub align: Align,
    pub baseline: Baseline,
    pub original_opacity: f32,
    pub transformed: bool,
}

impl LabelDump {
    pub fn from_layout(inputs: &[LabelInput], layout: &LabelLayout, size: (f32, f32)) -> Self {
        let labels = inputs
            .iter()
            .zip(&layout.labels)
            .enumerate()
            .map(|(index, (input, output))| LabelEntryDump {
                index,
                text: input.text.clone(),
                x: output.x,
                y: output.y,
                opacity: output.opacity,
                align: output.align,
                baseline: output.baseline,
                original_opacity: output.original_opacity,
                transformed: output.transformed,
            })
            .collect();
        LabelDump {
            width: size.0,
            height: size.1,
            stats: layout.stats,
            labels,
        }
    }
}

/// Pretty-printed dump, to `path` or to stdout when `path` is `None`.
pub fn write_label_dump(
    path: Option<&Path>,
    inputs: &[LabelInput],
    layout: &LabelLayout,
    size: (f32, f32),
) -> anyhow::Result<()> {
    let dump = LabelDump::from_layout(inputs, layout, size);
    match path {
        Some(path) => {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, &dump)?;
        }
        None => {
            let mut stdout = io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, &dump)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}
