mod area_placement;
pub(crate) mod bitmap;
mod boundary;
mod error;
pub(crate) mod label_placement;
pub(crate) mod raster;
mod text;
pub(crate) mod types;

pub use bitmap::BitMap;
pub use boundary::BoundaryStrategy;
pub use error::LabelError;
pub use raster::{Coverage, Rasterize, SvgRasterizer, base_mark};
pub use types::*;

use crate::config::{LabelConfig, SortOrder};
use crate::ir::{LabelInput, MarkType};
use area_placement::AreaLabelPlacer;
use label_placement::LabelPlacer;
use log::{debug, trace};
use raster::{BitmapRequest, prepare_bitmaps};
use std::cmp::Ordering;

/// Place every label of `labels` against the default SVG rasterizer.
pub fn compute_label_layout(
    labels: &[LabelInput],
    config: &LabelConfig,
) -> Result<LabelLayout, LabelError> {
    compute_label_layout_with(labels, config, &SvgRasterizer)
}

/// Place every label of `labels`, drawing avoided marks with `rasterizer`.
///
/// Labels are placed in priority order (sorted when `config.sort` is set,
/// input order otherwise). The result is indexed like the input. Labels that
/// cannot be placed come back with opacity 0.
pub fn compute_label_layout_with(
    labels: &[LabelInput],
    config: &LabelConfig,
    rasterizer: &dyn Rasterize,
) -> Result<LabelLayout, LabelError> {
    let Some(first) = labels.first() else {
        return Ok(LabelLayout::default());
    };
    let size = config.chart_size()?;

    let marktype = first.datum.as_ref().map(|datum| datum.marktype);
    let grouptype = match first.datum.as_ref() {
        Some(datum) if datum.marktype == MarkType::Group => datum
            .item
            .items
            .get(config.mark_index)
            .map(|mark| mark.marktype),
        _ => None,
    };
    let group_area = grouptype == Some(MarkType::Area);
    let strategy =
        BoundaryStrategy::select(marktype, grouptype, config.line_anchor, config.mark_index);
    let reuse_original_opacity = first.transformed;

    let mut candidates: Vec<LabelCandidate<'_>> = labels
        .iter()
        .enumerate()
        .map(|(index, input)| LabelCandidate {
            index,
            text: &input.text,
            font: &input.font,
            font_size: input.font_size,
            text_width: input.text_width,
            mark_bound: strategy.extract(input),
            sort_key: input.sort_key,
            original_opacity: if reuse_original_opacity {
                input.original_opacity.unwrap_or(input.opacity)
            } else {
                input.opacity
            },
            datum: input.datum.as_ref(),
            x: 0.0,
            y: 0.0,
            opacity: 0.0,
            align: Align::default(),
            baseline: Baseline::default(),
            transformed: false,
        })
        .collect();

    if let Some(order) = config.sort {
        candidates.sort_by(|a, b| compare_sort_keys(a.sort_key, b.sort_key, order));
    }

    let placements = config.placements();
    let label_inside = placements.iter().any(AnchorOffset::is_inside);

    let request = BitmapRequest {
        inputs: labels,
        candidates: &candidates,
        size,
        padding: config.padding,
        marktype,
        avoid_base_mark: config.avoid_base_mark,
        avoid_marks: &config.avoid_marks,
        label_inside,
        group_area,
    };
    let raster::Bitmaps {
        mut primary,
        border,
        labels: mut label_grid,
    } = prepare_bitmaps(&request, rasterizer)?;

    let (grid_width, grid_height) = primary.dimensions();
    let mut stats = LayoutStats {
        grid_width,
        grid_height,
        pixel_ratio: primary.pixel_ratio(),
        ..Default::default()
    };
    debug!(
        "placing {} label(s) on a {}x{} grid (pixel ratio {:.3}, strategy {:?})",
        candidates.len(),
        grid_width,
        grid_height,
        stats.pixel_ratio,
        strategy
    );

    if group_area {
        let mut visited = BitMap::new(size.0, size.1, config.padding);
        let mut placer = AreaLabelPlacer::new(
            &mut primary,
            border.as_ref(),
            &mut visited,
            size,
            config.avoid_base_mark,
            config.mark_index,
        );
        place_all(&mut candidates, &mut stats, |label| placer.place(label));
    } else {
        let mut placer = LabelPlacer::new(
            &mut primary,
            border.as_ref(),
            &mut label_grid,
            size,
            &placements,
        );
        place_all(&mut candidates, &mut stats, |label| placer.place(label));
    }

    debug!(
        "placed {} label(s), hid {}, skipped {}",
        stats.placed, stats.hidden, stats.skipped
    );

    let mut outputs = vec![LabelOutput::default(); candidates.len()];
    for candidate in &candidates {
        outputs[candidate.index] = candidate.to_output();
    }
    Ok(LabelLayout {
        labels: outputs,
        stats,
    })
}

fn place_all<F>(candidates: &mut [LabelCandidate<'_>], stats: &mut LayoutStats, mut place: F)
where
    F: FnMut(&mut LabelCandidate<'_>) -> bool,
{
    for label in candidates.iter_mut() {
        if label.original_opacity == 0.0 {
            stats.skipped += 1;
        } else if place(label) {
            label.opacity = label.original_opacity;
            stats.placed += 1;
        } else {
            label.opacity = 0.0;
            stats.hidden += 1;
        }
        if label.opacity == 0.0 {
            label.x = 0.0;
            label.y = 0.0;
            label.align = Align::default();
            label.baseline = Baseline::default();
        }
        label.transformed = true;
        trace!(
            "label {} {:?}: opacity {} at ({:.2}, {:.2})",
            label.index, label.text, label.opacity, label.x, label.y
        );
    }
}

/// Keyed labels first, ordered by key; unkeyed labels keep their input order.
fn compare_sort_keys(a: Option<f64>, b: Option<f64>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match order {
            SortOrder::Ascending => a.total_cmp(&b),
            SortOrder::Descending => b.total_cmp(&a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
