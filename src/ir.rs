use serde::{Deserialize, Serialize};

/// Default symbol area in square pixels.
pub const DEFAULT_SYMBOL_SIZE: f32 = 64.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkType {
    Symbol,
    Rect,
    Rule,
    Line,
    Area,
    Text,
    Path,
    Arc,
    Image,
    Group,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolShape {
    #[default]
    Circle,
    Square,
    Diamond,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Bounds {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    pub fn point(x: f32, y: f32) -> Self {
        Self {
            x1: x,
            y1: y,
            x2: x,
            y2: y,
        }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }
}

/// One rendered primitive of a mark, with the geometry computed upstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SceneItem {
    pub x: f32,
    pub y: f32,
    pub x2: Option<f32>,
    pub y2: Option<f32>,
    pub width: f32,
    pub height: f32,
    /// Symbol area in square pixels.
    pub size: Option<f32>,
    pub shape: SymbolShape,
    /// SVG path data for `path` marks.
    pub path: Option<String>,
    pub bounds: Option<Bounds>,
    pub fill: Option<String>,
    pub stroke: Option<String>,
    pub stroke_width: Option<f32>,
    pub opacity: Option<f32>,
    pub fill_opacity: Option<f32>,
    pub stroke_opacity: Option<f32>,
    /// Child marks of a group item.
    pub items: Vec<SceneMark>,
}

impl SceneItem {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            ..Default::default()
        }
    }

    pub fn symbol_radius(&self) -> f32 {
        (self.size.unwrap_or(DEFAULT_SYMBOL_SIZE).max(0.0) / std::f32::consts::PI).sqrt()
    }

    /// Explicit bounds when present, otherwise bounds derived from the geometry
    /// the given mark type draws. A group with children covers their union.
    pub fn bounds_for(&self, marktype: MarkType) -> Bounds {
        if let Some(bounds) = self.bounds {
            return bounds;
        }
        match marktype {
            MarkType::Symbol => {
                let r = self.symbol_radius();
                Bounds::new(self.x - r, self.y - r, self.x + r, self.y + r)
            }
            MarkType::Group if !self.items.is_empty() => self
                .items
                .iter()
                .flat_map(|mark| mark.items.iter().map(|item| item.bounds_for(mark.marktype)))
                .reduce(|acc, b| acc.union(&b))
                .unwrap_or_else(|| Bounds::point(self.x, self.y)),
            MarkType::Rect | MarkType::Image | MarkType::Group => Bounds::new(
                self.x,
                self.y,
                self.x2.unwrap_or(self.x + self.width),
                self.y2.unwrap_or(self.y + self.height),
            ),
            MarkType::Rule | MarkType::Line | MarkType::Area => Bounds::new(
                self.x,
                self.y,
                self.x2.unwrap_or(self.x),
                self.y2.unwrap_or(self.y),
            ),
            MarkType::Text | MarkType::Path | MarkType::Arc => Bounds::point(self.x, self.y),
        }
    }
}

/// A collection of items sharing one mark type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneMark {
    pub marktype: MarkType,
    #[serde(default)]
    pub items: Vec<SceneItem>,
}

impl SceneMark {
    pub fn new(marktype: MarkType, items: Vec<SceneItem>) -> Self {
        Self { marktype, items }
    }
}

/// The scene item a label is attached to, tagged with its mark type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseItem {
    pub marktype: MarkType,
    #[serde(flatten)]
    pub item: SceneItem,
}

impl BaseItem {
    pub fn new(marktype: MarkType, item: SceneItem) -> Self {
        Self { marktype, item }
    }
}

fn default_font() -> String {
    "sans-serif".to_string()
}

fn default_font_size() -> f32 {
    11.0
}

fn default_opacity() -> f32 {
    1.0
}

/// A text label as handed over by the rendering pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelInput {
    pub text: String,
    #[serde(default = "default_font")]
    pub font: String,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    /// Position used as the boundary when no base mark is attached.
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default)]
    pub sort_key: Option<f64>,
    /// Precomputed text width; skips font measurement.
    #[serde(default)]
    pub text_width: Option<f32>,
    #[serde(default)]
    pub datum: Option<BaseItem>,
    /// Set on labels that already went through a layout run.
    #[serde(default)]
    pub transformed: bool,
    #[serde(default)]
    pub original_opacity: Option<f32>,
}

impl LabelInput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font: default_font(),
            font_size: default_font_size(),
            x: 0.0,
            y: 0.0,
            opacity: default_opacity(),
            sort_key: None,
            text_width: None,
            datum: None,
            transformed: false,
            original_opacity: None,
        }
    }

    pub fn with_datum(mut self, marktype: MarkType, item: SceneItem) -> Self {
        self.datum = Some(BaseItem::new(marktype, item));
        self
    }

    pub fn with_text_width(mut self, width: f32) -> Self {
        self.text_width = Some(width);
        self
    }

    pub fn with_sort_key(mut self, key: f64) -> Self {
        self.sort_key = Some(key);
        self
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }
}
