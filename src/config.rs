use crate::ir::SceneMark;
use crate::layout::{Anchor, AnchorOffset, LabelError};
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_OFFSET: f32 = 1.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LineAnchor {
    Begin,
    #[default]
    End,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum NumberOrList {
    Number(f32),
    List(Vec<f32>),
}

impl NumberOrList {
    fn into_vec(self) -> Vec<f32> {
        match self {
            NumberOrList::Number(val) => vec![val],
            NumberOrList::List(vals) => vals,
        }
    }
}

/// Anchor names stay strings until after the untagged match, so an unknown
/// name reports itself instead of a generic variant mismatch.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum AnchorOrList {
    Name(String),
    List(Vec<String>),
}

impl AnchorOrList {
    fn into_anchors(self) -> Result<Vec<Anchor>, LabelError> {
        match self {
            AnchorOrList::Name(name) => Ok(vec![Anchor::from_name(&name)?]),
            AnchorOrList::List(names) => names.iter().map(|name| Anchor::from_name(name)).collect(),
        }
    }
}

fn deserialize_offsets<'de, D>(deserializer: D) -> Result<Vec<f32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    NumberOrList::deserialize(deserializer).map(NumberOrList::into_vec)
}

fn deserialize_anchors<'de, D>(deserializer: D) -> Result<Vec<Anchor>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    AnchorOrList::deserialize(deserializer)?
        .into_anchors()
        .map_err(<D::Error as serde::de::Error>::custom)
}

/// Options of one label layout run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelConfig {
    /// Inset applied before grid scaling.
    pub padding: f32,
    /// Sub-mark of a group item that supplies boundaries.
    pub mark_index: usize,
    pub line_anchor: LineAnchor,
    pub avoid_base_mark: bool,
    /// Chart `[width, height]` in pixels. Required.
    pub size: Option<Vec<f32>>,
    #[serde(deserialize_with = "deserialize_offsets")]
    pub offset: Vec<f32>,
    #[serde(deserialize_with = "deserialize_anchors")]
    pub anchor: Vec<Anchor>,
    pub sort: Option<SortOrder>,
    pub avoid_marks: Vec<SceneMark>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            padding: 0.0,
            mark_index: 0,
            line_anchor: LineAnchor::End,
            avoid_base_mark: true,
            size: None,
            offset: vec![DEFAULT_OFFSET],
            anchor: Anchor::DEFAULTS.to_vec(),
            sort: None,
            avoid_marks: Vec::new(),
        }
    }
}

impl LabelConfig {
    pub fn with_size(width: f32, height: f32) -> Self {
        Self {
            size: Some(vec![width, height]),
            ..Default::default()
        }
    }

    /// Chart size, validated as a finite, non-negative pair.
    pub fn chart_size(&self) -> Result<(f32, f32), LabelError> {
        let size = self.size.as_deref().ok_or_else(LabelError::missing_size)?;
        let [width, height] = size else {
            return Err(LabelError::InvalidSize { len: size.len() });
        };
        let (width, height) = (*width, *height);
        if !(width.is_finite() && height.is_finite()) || width < 0.0 || height < 0.0 {
            return Err(LabelError::NegativeSize { width, height });
        }
        Ok((width, height))
    }

    /// Anchor/offset pairs in trial order. The shorter list is extended by
    /// repeating its last value.
    pub fn placements(&self) -> Vec<AnchorOffset> {
        let anchors: &[Anchor] = if self.anchor.is_empty() {
            &Anchor::DEFAULTS
        } else {
            &self.anchor
        };
        let offsets: &[f32] = if self.offset.is_empty() {
            &[DEFAULT_OFFSET]
        } else {
            &self.offset
        };
        let count = anchors.len().max(offsets.len());
        (0..count)
            .map(|i| {
                let anchor = anchors[i.min(anchors.len() - 1)];
                let offset = offsets[i.min(offsets.len() - 1)];
                AnchorOffset::new(anchor, offset)
            })
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub label: LabelConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: Theme::modern(),
            label: LabelConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    text_color: Option<String>,
    mark_color: Option<String>,
    mark_stroke: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct LabelConfigFile {
    padding: Option<f32>,
    mark_index: Option<usize>,
    line_anchor: Option<LineAnchor>,
    avoid_base_mark: Option<bool>,
    size: Option<Vec<f32>>,
    offset: Option<NumberOrList>,
    anchor: Option<AnchorOrList>,
    sort: Option<SortOrder>,
    avoid_marks: Option<Vec<SceneMark>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    label: Option<LabelConfigFile>,
    width: Option<f32>,
    height: Option<f32>,
}

/// Parse JSON, accepting JSON5 (comments, trailing commas) as a fallback.
pub(crate) fn parse_json_or_json5<T>(contents: &str) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
{
    match serde_json::from_str(contents) {
        Ok(value) => Ok(value),
        Err(json_err) => json5::from_str(contents)
            .map_err(|json5_err| anyhow::anyhow!("{json_err} (as JSON5: {json5_err})")),
    }
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };
    let contents = std::fs::read_to_string(path)?;
    apply_config_str(config, &contents)
}

pub fn apply_config_str(mut config: Config, contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = parse_json_or_json5(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        if theme_name == "modern" {
            config.theme = Theme::modern();
        } else if theme_name == "classic" || theme_name == "default" {
            config.theme = Theme::classic();
        }
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.text_color {
            config.theme.text_color = v;
        }
        if let Some(v) = vars.mark_color {
            config.theme.mark_color = v;
        }
        if let Some(v) = vars.mark_stroke {
            config.theme.mark_stroke = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
    }

    if let Some(v) = parsed.width {
        config.render.width = v;
    }
    if let Some(v) = parsed.height {
        config.render.height = v;
    }

    if let Some(label) = parsed.label {
        apply_label_overrides(&mut config.label, label)?;
    }

    Ok(config)
}

/// Apply label options given inline, e.g. in a scene file, over `config`.
/// Options that are absent keep their current value.
pub fn apply_label_options(config: &mut LabelConfig, options: serde_json::Value) -> anyhow::Result<()> {
    let file: LabelConfigFile = serde_json::from_value(options)?;
    apply_label_overrides(config, file)?;
    Ok(())
}

fn apply_label_overrides(config: &mut LabelConfig, file: LabelConfigFile) -> Result<(), LabelError> {
    if let Some(v) = file.padding {
        config.padding = v;
    }
    if let Some(v) = file.mark_index {
        config.mark_index = v;
    }
    if let Some(v) = file.line_anchor {
        config.line_anchor = v;
    }
    if let Some(v) = file.avoid_base_mark {
        config.avoid_base_mark = v;
    }
    if let Some(v) = file.size {
        config.size = Some(v);
    }
    if let Some(v) = file.offset {
        config.offset = v.into_vec();
    }
    if let Some(v) = file.anchor {
        config.anchor = v.into_anchors()?;
    }
    if let Some(v) = file.sort {
        config.sort = Some(v);
    }
    if let Some(v) = file.avoid_marks {
        config.avoid_marks = v;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_options() {
        let config = LabelConfig::default();
        assert_eq!(config.padding, 0.0);
        assert_eq!(config.mark_index, 0);
        assert_eq!(config.line_anchor, LineAnchor::End);
        assert!(config.avoid_base_mark);
        assert_eq!(config.offset, vec![1.0]);
        assert_eq!(config.anchor, Anchor::DEFAULTS.to_vec());
        assert!(config.size.is_none());
    }

    #[test]
    fn scalar_and_list_forms_are_equivalent() {
        let scalar: LabelConfig =
            serde_json::from_str(r#"{"offset": 3, "anchor": "top"}"#).expect("scalar form");
        let list: LabelConfig =
            serde_json::from_str(r#"{"offset": [3], "anchor": ["top"]}"#).expect("list form");
        assert_eq!(scalar.offset, list.offset);
        assert_eq!(scalar.anchor, list.anchor);
        assert_eq!(scalar.anchor, vec![Anchor::Top]);
    }

    #[test]
    fn unknown_anchor_is_rejected() {
        let err = serde_json::from_str::<LabelConfig>(r#"{"anchor": ["top", "upper-left"]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("unknown label anchor `upper-left`"), "{err}");

        let mut config = LabelConfig::with_size(100.0, 100.0);
        let err = apply_label_options(&mut config, serde_json::json!({ "anchor": "north" }))
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<LabelError>(),
            Some(&LabelError::UnknownAnchor("north".to_string()))
        );
        assert_eq!(config.anchor, Anchor::DEFAULTS.to_vec());
    }

    #[test]
    fn placements_extend_shorter_list() {
        let config = LabelConfig {
            anchor: vec![Anchor::Top, Anchor::Bottom, Anchor::Middle],
            offset: vec![2.0, -1.0],
            ..LabelConfig::default()
        };
        let placements = config.placements();
        assert_eq!(placements.len(), 3);
        assert_eq!(placements[2], AnchorOffset::new(Anchor::Middle, -1.0));

        let config = LabelConfig {
            anchor: vec![Anchor::Right],
            offset: vec![1.0, 2.0, 4.0],
            ..LabelConfig::default()
        };
        let placements = config.placements();
        assert_eq!(placements.len(), 3);
        assert!(placements.iter().all(|p| p.anchor == Anchor::Right));
        assert_eq!(placements[2].offset, 4.0);
    }

    #[test]
    fn default_placements_are_outside_compass_points() {
        let placements = LabelConfig::default().placements();
        assert_eq!(placements.len(), 8);
        assert!(placements.iter().all(|p| !p.is_inside()));
    }

    #[test]
    fn chart_size_validation() {
        assert_eq!(
            LabelConfig::default().chart_size(),
            Err(LabelError::InvalidSize { len: 0 })
        );
        let config = LabelConfig {
            size: Some(vec![100.0, 200.0, 3.0]),
            ..LabelConfig::default()
        };
        assert_eq!(config.chart_size(), Err(LabelError::InvalidSize { len: 3 }));
        let config = LabelConfig::with_size(-1.0, 10.0);
        assert!(matches!(
            config.chart_size(),
            Err(LabelError::NegativeSize { .. })
        ));
        assert_eq!(LabelConfig::with_size(300.0, 150.0).chart_size(), Ok((300.0, 150.0)));
    }

    #[test]
    fn config_file_overrides_label_options() {
        let config = apply_config_str(
            Config::default(),
            r##"{
                // JSON5 comments are accepted
                theme: "classic",
                themeVariables: { textColor: "#111111", fontFamily: "Fira Sans" },
                label: { padding: 4, offset: [2, -2], anchor: ["top", "middle"], sort: "descending" },
            }"##,
        )
        .expect("config should parse");
        assert_eq!(config.theme.text_color, "#111111");
        assert_eq!(config.theme.font_family, "Fira Sans");
        assert_eq!(config.label.padding, 4.0);
        assert_eq!(config.label.offset, vec![2.0, -2.0]);
        assert_eq!(config.label.anchor, vec![Anchor::Top, Anchor::Middle]);
        assert_eq!(config.label.sort, Some(SortOrder::Descending));
        assert!(config.label.avoid_base_mark);
    }

    #[test]
    fn inline_label_options_keep_unset_values() {
        let mut config = LabelConfig::with_size(400.0, 300.0);
        config.padding = 3.0;
        apply_label_options(
            &mut config,
            serde_json::json!({ "avoidBaseMark": false, "lineAnchor": "begin" }),
        )
        .expect("options should apply");
        assert!(!config.avoid_base_mark);
        assert_eq!(config.line_anchor, LineAnchor::Begin);
        assert_eq!(config.padding, 3.0);
        assert_eq!(config.chart_size(), Ok((400.0, 300.0)));
    }
}
