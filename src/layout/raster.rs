// Occupancy grids built from a rasterized drawing of the marks to avoid.

use log::debug;

use crate::ir::{LabelInput, MarkType, SceneMark};
use crate::render::{MarkStyle, marks_svg};

use super::bitmap::BitMap;
use super::error::LabelError;
use super::types::LabelCandidate;

/// Alpha of an interior pixel under inside styling (`INSIDE_FILL_OPACITY` of 255).
const INSIDE_ALPHA: u8 = 16;
const INSIDE_ALPHA_TOLERANCE: u8 = 1;

/// Per-pixel alpha of a drawing, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Coverage {
    pub width: u32,
    pub height: u32,
    pub alpha: Vec<u8>,
}

impl Coverage {
    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        self.alpha[(y * self.width + x) as usize]
    }
}

/// Draws marks into an offscreen buffer of `width` x `height` pixels.
///
/// With `inside` set, filled shapes must be drawn with a fill alpha of 16/255
/// and an opaque outline so that interiors and borders can be separated.
pub trait Rasterize {
    fn rasterize(
        &self,
        marks: &[SceneMark],
        width: u32,
        height: u32,
        inside: bool,
    ) -> Result<Coverage, LabelError>;
}

/// Rasterizes through an SVG document rendered by resvg.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgRasterizer;

impl Rasterize for SvgRasterizer {
    fn rasterize(
        &self,
        marks: &[SceneMark],
        width: u32,
        height: u32,
        inside: bool,
    ) -> Result<Coverage, LabelError> {
        let style = if inside {
            MarkStyle::Inside
        } else {
            MarkStyle::Occupancy
        };
        let svg = marks_svg(marks, width as f32, height as f32, style);
        let tree = usvg::Tree::from_str(&svg, &usvg::Options::default())
            .map_err(|err| LabelError::Raster(err.to_string()))?;
        let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
            .ok_or_else(|| LabelError::Raster(format!("cannot allocate {width}x{height} pixmap")))?;
        resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap.as_mut());
        Ok(Coverage {
            width,
            height,
            alpha: pixmap.pixels().iter().map(|p| p.alpha()).collect(),
        })
    }
}

/// Grids of one layout run.
pub(crate) struct Bitmaps {
    /// Everything labels must avoid, including placed labels.
    pub primary: BitMap,
    /// Mark outlines; present when labels may go inside marks or the base
    /// mark is a grouped area.
    pub border: Option<BitMap>,
    /// Boxes of placed labels only.
    pub labels: BitMap,
}

pub(crate) struct BitmapRequest<'a> {
    pub inputs: &'a [LabelInput],
    pub candidates: &'a [LabelCandidate<'a>],
    pub size: (f32, f32),
    pub padding: f32,
    pub marktype: Option<MarkType>,
    pub avoid_base_mark: bool,
    pub avoid_marks: &'a [SceneMark],
    pub label_inside: bool,
    pub group_area: bool,
}

/// Base mark of a run: every label's datum item under the first label's mark type.
pub fn base_mark(inputs: &[LabelInput]) -> Option<SceneMark> {
    let marktype = inputs.first()?.datum.as_ref()?.marktype;
    let items = inputs
        .iter()
        .filter_map(|input| input.datum.as_ref())
        .map(|datum| datum.item.clone())
        .collect();
    Some(SceneMark::new(marktype, items))
}

pub(crate) fn prepare_bitmaps(
    request: &BitmapRequest<'_>,
    rasterizer: &dyn Rasterize,
) -> Result<Bitmaps, LabelError> {
    let (width, height) = request.size;
    let padding = request.padding;
    let mut primary = BitMap::new(width, height, padding);
    let labels = BitMap::new(width, height, padding);

    let mut marks: Vec<SceneMark> = request.avoid_marks.to_vec();
    if request.marktype.is_some() && (request.avoid_base_mark || request.group_area) {
        marks.extend(base_mark(request.inputs));
    }

    if marks.is_empty() {
        if request.avoid_base_mark {
            // No scene geometry: each label's anchor point is the obstacle.
            for candidate in request.candidates {
                primary.mark(candidate.mark_bound.x1, candidate.mark_bound.y1);
            }
        }
        return Ok(Bitmaps {
            primary,
            border: None,
            labels,
        });
    }

    let mut border =
        (request.label_inside || request.group_area).then(|| BitMap::new(width, height, padding));
    let canvas_width = width as u32;
    let canvas_height = height as u32;
    if canvas_width == 0 || canvas_height == 0 {
        debug!("chart rounds to an empty canvas; nothing rasterized");
        return Ok(Bitmaps {
            primary,
            border,
            labels,
        });
    }

    let coverage = rasterizer.rasterize(
        &marks,
        canvas_width,
        canvas_height,
        request.label_inside || request.group_area,
    )?;
    fill_from_coverage(
        &coverage,
        &mut primary,
        border.as_mut(),
        request.label_inside,
        request.group_area,
    );
    debug!(
        "rasterized {} mark(s) into {}x{} pixels",
        marks.len(),
        canvas_width,
        canvas_height
    );

    Ok(Bitmaps {
        primary,
        border,
        labels,
    })
}

fn is_interior(alpha: u8) -> bool {
    alpha.abs_diff(INSIDE_ALPHA) <= INSIDE_ALPHA_TOLERANCE
}

fn fill_from_coverage(
    coverage: &Coverage,
    primary: &mut BitMap,
    mut border: Option<&mut BitMap>,
    label_inside: bool,
    group_area: bool,
) {
    for y in 0..coverage.height {
        for x in 0..coverage.width {
            let alpha = coverage.alpha_at(x, y);
            if alpha == 0 {
                continue;
            }
            let (px, py) = (x as f32, y as f32);
            let on_border = !is_interior(alpha);
            if group_area {
                // Area interiors stay free for the flood fill; only outlines block.
                if on_border {
                    if let Some(border) = border.as_deref_mut() {
                        border.mark(px, py);
                    }
                }
                continue;
            }
            primary.mark(px, py);
            if label_inside && on_border {
                if let Some(border) = border.as_deref_mut() {
                    border.mark(px, py);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::SceneItem;
    use crate::layout::types::MarkBound;

    struct FixedCoverage(Coverage);

    impl Rasterize for FixedCoverage {
        fn rasterize(
            &self,
            _marks: &[SceneMark],
            _width: u32,
            _height: u32,
            _inside: bool,
        ) -> Result<Coverage, LabelError> {
            Ok(self.0.clone())
        }
    }

    fn filled_rect() -> Vec<SceneMark> {
        let item = SceneItem {
            width: 60.0,
            height: 40.0,
            fill: Some("steelblue".to_string()),
            ..SceneItem::at(20.0, 20.0)
        };
        vec![SceneMark::new(MarkType::Rect, vec![item])]
    }

    fn request<'a>(
        avoid_marks: &'a [SceneMark],
        label_inside: bool,
        group_area: bool,
    ) -> BitmapRequest<'a> {
        BitmapRequest {
            inputs: &[],
            candidates: &[],
            size: (4.0, 1.0),
            padding: 0.0,
            marktype: None,
            avoid_base_mark: true,
            avoid_marks,
            label_inside,
            group_area,
        }
    }

    fn strip() -> FixedCoverage {
        // empty, interior, border, near-interior
        FixedCoverage(Coverage {
            width: 4,
            height: 1,
            alpha: vec![0, 16, 255, 15],
        })
    }

    #[test]
    fn outside_mode_marks_every_covered_pixel() {
        let marks = filled_rect();
        let maps = prepare_bitmaps(&request(&marks, false, false), &strip()).expect("bitmaps");
        assert!(maps.border.is_none());
        assert!(!maps.primary.get(0.0, 0.0));
        assert!(maps.primary.get(1.0, 0.0));
        assert!(maps.primary.get(2.0, 0.0));
        assert!(maps.primary.get(3.0, 0.0));
    }

    #[test]
    fn inside_mode_separates_borders() {
        let marks = filled_rect();
        let maps = prepare_bitmaps(&request(&marks, true, false), &strip()).expect("bitmaps");
        let border = maps.border.expect("border grid");
        assert!(maps.primary.get(1.0, 0.0));
        assert!(!border.get(1.0, 0.0));
        assert!(border.get(2.0, 0.0));
        assert!(!border.get(3.0, 0.0));
    }

    #[test]
    fn group_area_fills_border_only() {
        let marks = filled_rect();
        let maps = prepare_bitmaps(&request(&marks, false, true), &strip()).expect("bitmaps");
        assert!(maps.primary.is_empty());
        let border = maps.border.expect("border grid");
        assert!(border.get(2.0, 0.0));
        assert!(!border.get(1.0, 0.0));
    }

    #[test]
    fn without_marks_label_points_are_obstacles() {
        let inputs = vec![LabelInput::new("a").at(3.0, 0.0)];
        let candidate = LabelCandidate {
            index: 0,
            text: "a",
            font: "sans-serif",
            font_size: 11.0,
            text_width: None,
            mark_bound: MarkBound::point(3.0, 0.0),
            sort_key: None,
            original_opacity: 1.0,
            datum: None,
            x: 0.0,
            y: 0.0,
            opacity: 0.0,
            align: Default::default(),
            baseline: Default::default(),
            transformed: false,
        };
        let candidates = [candidate];
        let req = BitmapRequest {
            inputs: &inputs,
            candidates: &candidates,
            ..request(&[], false, false)
        };
        let maps = prepare_bitmaps(&req, &strip()).expect("bitmaps");
        assert!(maps.primary.get(3.0, 0.0));
        assert!(!maps.primary.get(1.0, 0.0));
    }

    #[test]
    fn svg_rasterizer_separates_fill_from_outline() {
        let coverage = SvgRasterizer
            .rasterize(&filled_rect(), 100, 100, true)
            .expect("rasterize");
        assert_eq!((coverage.width, coverage.height), (100, 100));
        assert!(is_interior(coverage.alpha_at(50, 40)));
        assert!(coverage.alpha_at(20, 40) > 200);
        assert_eq!(coverage.alpha_at(5, 5), 0);
    }

    #[test]
    fn base_mark_collects_datum_items() {
        let inputs = vec![
            LabelInput::new("a").with_datum(MarkType::Symbol, SceneItem::at(1.0, 1.0)),
            LabelInput::new("b"),
            LabelInput::new("c").with_datum(MarkType::Symbol, SceneItem::at(2.0, 2.0)),
        ];
        let mark = base_mark(&inputs).expect("base mark");
        assert_eq!(mark.marktype, MarkType::Symbol);
        assert_eq!(mark.items.len(), 2);
        assert!(base_mark(&inputs[1..2]).is_none());
    }
}
