// Mark boundary extraction, chosen once per layout run from the base mark type.

use crate::config::LineAnchor;
use crate::ir::{LabelInput, MarkType};

use super::types::MarkBound;

/// Sentinel far outside any canvas, for grouped lines without points.
const EMPTY_LINE_COORD: f32 = f32::MIN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryStrategy {
    /// No base mark: the label's own position.
    Point,
    /// Per-datum line or area item: the datum position.
    Datum,
    /// Grouped line: the first or last point of the line at `mark_index`.
    GroupLine {
        line_anchor: LineAnchor,
        mark_index: usize,
    },
    /// Anything else: the item's bounding box and its midpoint.
    Bounds,
}

impl BoundaryStrategy {
    pub fn select(
        marktype: Option<MarkType>,
        grouptype: Option<MarkType>,
        line_anchor: LineAnchor,
        mark_index: usize,
    ) -> Self {
        match (marktype, grouptype) {
            (None, _) => Self::Point,
            (Some(MarkType::Line | MarkType::Area), _) => Self::Datum,
            (Some(MarkType::Group), Some(MarkType::Line)) => Self::GroupLine {
                line_anchor,
                mark_index,
            },
            _ => Self::Bounds,
        }
    }

    pub fn extract(&self, label: &LabelInput) -> MarkBound {
        let Some(datum) = label.datum.as_ref() else {
            return MarkBound::point(label.x, label.y);
        };
        match *self {
            Self::Point => MarkBound::point(label.x, label.y),
            Self::Datum => MarkBound::point(datum.item.x, datum.item.y),
            Self::GroupLine {
                line_anchor,
                mark_index,
            } => {
                let points = datum
                    .item
                    .items
                    .get(mark_index)
                    .map(|mark| mark.items.as_slice())
                    .unwrap_or(&[]);
                let end = match line_anchor {
                    LineAnchor::Begin => points.first(),
                    LineAnchor::End => points.last(),
                };
                match end {
                    Some(item) => MarkBound::point(item.x, item.y),
                    None => MarkBound::point(EMPTY_LINE_COORD, EMPTY_LINE_COORD),
                }
            }
            Self::Bounds => {
                let b = datum.item.bounds_for(datum.marktype);
                MarkBound::rect(b.x1, b.y1, b.x2, b.y2)
            }
        }
    }
}
