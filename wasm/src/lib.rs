use chart_labeler::config::apply_label_options;
use chart_labeler::layout_dump::LabelDump;
use chart_labeler::{LabelConfig, LabelInput, compute_label_layout};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WasmScene {
    labels: Vec<LabelInput>,
    #[serde(default)]
    label: Option<serde_json::Value>,
}

fn layout_json(scene_json: &str, options_json: Option<String>) -> Result<String, String> {
    let scene: WasmScene = serde_json::from_str(scene_json).map_err(|error| error.to_string())?;
    let mut config = LabelConfig::default();
    if let Some(options) = scene.label {
        apply_label_options(&mut config, options).map_err(|error| error.to_string())?;
    }
    if let Some(raw_options) = options_json {
        let options: serde_json::Value =
            serde_json::from_str(&raw_options).map_err(|error| error.to_string())?;
        apply_label_options(&mut config, options).map_err(|error| error.to_string())?;
    }

    let layout = compute_label_layout(&scene.labels, &config).map_err(|error| error.to_string())?;
    let size = config.chart_size().unwrap_or_default();
    let dump = LabelDump::from_layout(&scene.labels, &layout, size);
    serde_json::to_string(&dump).map_err(|error| error.to_string())
}

/// Lay out the labels of `scene_json` and return the placements as JSON.
/// `options_json` overrides the scene's own label options.
#[wasm_bindgen]
pub fn layout_labels(scene_json: &str, options_json: Option<String>) -> Result<String, JsValue> {
    layout_json(scene_json, options_json).map_err(|error| JsValue::from_str(&error))
}
