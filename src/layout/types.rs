use serde::{Deserialize, Serialize};

use crate::ir::BaseItem;

use super::error::LabelError;

/// 1/sqrt(2): corner anchors split their offset evenly over both axes.
pub(crate) const SIZE_FACTOR: f32 = std::f32::consts::FRAC_1_SQRT_2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", try_from = "String")]
pub enum Anchor {
    TopLeft,
    Top,
    TopRight,
    Left,
    Middle,
    Right,
    BottomLeft,
    Bottom,
    BottomRight,
}

impl Anchor {
    /// The eight compass anchors tried when none are configured.
    pub const DEFAULTS: [Anchor; 8] = [
        Anchor::TopLeft,
        Anchor::Left,
        Anchor::BottomLeft,
        Anchor::Top,
        Anchor::Bottom,
        Anchor::TopRight,
        Anchor::Right,
        Anchor::BottomRight,
    ];

    pub fn from_name(name: &str) -> Result<Self, LabelError> {
        match name.trim() {
            "top-left" => Ok(Self::TopLeft),
            "top" => Ok(Self::Top),
            "top-right" => Ok(Self::TopRight),
            "left" => Ok(Self::Left),
            "middle" => Ok(Self::Middle),
            "right" => Ok(Self::Right),
            "bottom-left" => Ok(Self::BottomLeft),
            "bottom" => Ok(Self::Bottom),
            "bottom-right" => Ok(Self::BottomRight),
            other => Err(LabelError::UnknownAnchor(other.to_string())),
        }
    }

    /// Horizontal direction: -1 left, 0 center, 1 right.
    pub fn dx(self) -> i32 {
        match self {
            Self::TopLeft | Self::Left | Self::BottomLeft => -1,
            Self::Top | Self::Middle | Self::Bottom => 0,
            Self::TopRight | Self::Right | Self::BottomRight => 1,
        }
    }

    /// Vertical direction: -1 top, 0 middle, 1 bottom.
    pub fn dy(self) -> i32 {
        match self {
            Self::TopLeft | Self::Top | Self::TopRight => -1,
            Self::Left | Self::Middle | Self::Right => 0,
            Self::BottomLeft | Self::Bottom | Self::BottomRight => 1,
        }
    }
}

impl TryFrom<String> for Anchor {
    type Error = LabelError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Anchor::from_name(&name)
    }
}

/// A candidate position: anchor on the mark boundary plus signed pixel offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorOffset {
    pub anchor: Anchor,
    pub offset: f32,
}

impl AnchorOffset {
    pub fn new(anchor: Anchor, offset: f32) -> Self {
        Self { anchor, offset }
    }

    pub fn is_inside(&self) -> bool {
        self.anchor == Anchor::Middle || self.offset < 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    /// Indexed by `dx * inside_factor + 1`.
    pub(crate) fn from_direction(dir: i32) -> Self {
        match dir {
            d if d < 0 => Self::Right,
            0 => Self::Center,
            _ => Self::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Baseline {
    #[default]
    Top,
    Middle,
    Bottom,
}

impl Baseline {
    /// Indexed by `dy * inside_factor + 1`.
    pub(crate) fn from_direction(dir: i32) -> Self {
        match dir {
            d if d < 0 => Self::Bottom,
            0 => Self::Middle,
            _ => Self::Top,
        }
    }
}

/// Boundary of the mark a label belongs to: three x stops and three y stops.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MarkBound {
    pub x1: f32,
    pub xc: f32,
    pub x2: f32,
    pub y1: f32,
    pub yc: f32,
    pub y2: f32,
}

impl MarkBound {
    pub fn point(x: f32, y: f32) -> Self {
        Self {
            x1: x,
            xc: x,
            x2: x,
            y1: y,
            yc: y,
            y2: y,
        }
    }

    pub fn rect(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1,
            xc: (x1 + x2) / 2.0,
            x2,
            y1,
            yc: (y1 + y2) / 2.0,
            y2,
        }
    }

    pub fn x_at(&self, dx: i32) -> f32 {
        match dx {
            d if d < 0 => self.x1,
            0 => self.xc,
            _ => self.x2,
        }
    }

    pub fn y_at(&self, dy: i32) -> f32 {
        match dy {
            d if d < 0 => self.y1,
            0 => self.yc,
            _ => self.y2,
        }
    }

    pub fn contains(&self, x1: f32, y1: f32, x2: f32, y2: f32) -> bool {
        self.x1 <= x1 && x2 <= self.x2 && self.y1 <= y1 && y2 <= self.y2
    }

    /// True when the mark lies entirely outside a `width` x `height` canvas.
    pub fn outside_canvas(&self, width: f32, height: f32) -> bool {
        self.x2 < 0.0 || self.y2 < 0.0 || self.x1 > width || self.y1 > height
    }
}

/// Per-label working record for one layout run.
///
/// `x`, `y`, `align` and `baseline` are only meaningful once `transformed` is set.
#[derive(Debug, Clone)]
pub struct LabelCandidate<'a> {
    pub index: usize,
    pub text: &'a str,
    pub font: &'a str,
    pub font_size: f32,
    pub text_width: Option<f32>,
    pub mark_bound: MarkBound,
    pub sort_key: Option<f64>,
    pub original_opacity: f32,
    pub datum: Option<&'a BaseItem>,
    pub x: f32,
    pub y: f32,
    pub opacity: f32,
    pub align: Align,
    pub baseline: Baseline,
    pub transformed: bool,
}

impl<'a> LabelCandidate<'a> {
    /// Font size doubles as the text height.
    pub fn text_height(&self) -> f32 {
        self.font_size
    }

    /// Measured at most once per run; precomputed widths are used as-is.
    pub fn text_width(&mut self) -> f32 {
        if let Some(width) = self.text_width {
            return width;
        }
        let width = super::text::label_width(self.text, self.font_size, self.font);
        self.text_width = Some(width);
        width
    }

    pub fn to_output(&self) -> LabelOutput {
        LabelOutput {
            x: self.x,
            y: self.y,
            opacity: self.opacity,
            align: self.align,
            baseline: self.baseline,
            original_opacity: self.original_opacity,
            transformed: self.transformed,
        }
    }
}

/// Label attributes computed by a layout run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelOutput {
    pub x: f32,
    pub y: f32,
    pub opacity: f32,
    pub align: Align,
    pub baseline: Baseline,
    pub original_opacity: f32,
    pub transformed: bool,
}

impl LabelOutput {
    pub fn is_visible(&self) -> bool {
        self.opacity > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutStats {
    pub placed: usize,
    pub hidden: usize,
    /// Labels skipped because their input opacity was zero.
    pub skipped: usize,
    pub grid_width: i32,
    pub grid_height: i32,
    pub pixel_ratio: f32,
}

/// Result of a layout run; `labels[i]` belongs to input label `i`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LabelLayout {
    pub labels: Vec<LabelOutput>,
    pub stats: LayoutStats,
}
