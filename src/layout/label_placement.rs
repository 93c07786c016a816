// Anchor/offset label placement for points, rects, symbols and line ends.
// Candidates are tried in configured order and the first collision-free box wins.

use super::bitmap::{BitMap, check_collision};
use super::types::{Align, AnchorOffset, Baseline, LabelCandidate, MarkBound, SIZE_FACTOR};

/// Label box in both real and grid coordinates.
#[derive(Debug, Clone, Copy)]
struct LabelBox {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    sx1: i32,
    sy1: i32,
    sx2: i32,
    sy2: i32,
}

pub(crate) struct LabelPlacer<'a> {
    primary: &'a mut BitMap,
    border: Option<&'a BitMap>,
    /// Boxes of labels placed so far in this run.
    labels: &'a mut BitMap,
    width: f32,
    height: f32,
    placements: &'a [AnchorOffset],
}

impl<'a> LabelPlacer<'a> {
    pub(crate) fn new(
        primary: &'a mut BitMap,
        border: Option<&'a BitMap>,
        labels: &'a mut BitMap,
        size: (f32, f32),
        placements: &'a [AnchorOffset],
    ) -> Self {
        Self {
            primary,
            border,
            labels,
            width: size.0,
            height: size.1,
            placements,
        }
    }

    /// Try every anchor/offset pair in order. On success the label's position
    /// and alignment are set and its box is marked as occupied.
    pub(crate) fn place(&mut self, label: &mut LabelCandidate<'_>) -> bool {
        let mb = label.mark_bound;
        if mb.outside_canvas(self.width, self.height) {
            return false;
        }

        let text_height = label.text_height();
        for placement in self.placements {
            let dx = placement.anchor.dx();
            let dy = placement.anchor.dy();
            let offset = placement.offset;
            let is_inside = placement.is_inside();
            let size_factor = if dx != 0 && dy != 0 { SIZE_FACTOR } else { 1.0 };
            let inside_sign = if offset < 0.0 { -1 } else { 1 };
            let inside_factor = inside_sign as f32;

            let yc = mb.y_at(dy)
                + (inside_factor * text_height * dy as f32) / 2.0
                + offset * dy as f32 * size_factor;
            let x = mb.x_at(dx) + offset * dx as f32 * size_factor;
            let y1 = yc - text_height / 2.0;
            let y2 = yc + text_height / 2.0;
            let sy1 = self.primary.scale_pixel(y1);
            let sy2 = self.primary.scale_pixel(y2);

            if label.text_width.is_none() {
                // A one-pixel-wide probe rejects the candidate before paying for text measurement.
                let sx = self.primary.scale_pixel(x);
                let probe = LabelBox {
                    x1: x,
                    y1,
                    x2: x,
                    y2,
                    sx1: sx,
                    sy1,
                    sx2: sx,
                    sy2,
                };
                if !self.is_placeable(&probe, &mb, is_inside) {
                    continue;
                }
            }

            let text_width = label.text_width();
            let xc = x + (inside_factor * text_width * dx as f32) / 2.0;
            let x1 = xc - text_width / 2.0;
            let x2 = xc + text_width / 2.0;
            let candidate = LabelBox {
                x1,
                y1,
                x2,
                y2,
                sx1: self.primary.scale_pixel(x1),
                sy1,
                sx2: self.primary.scale_pixel(x2),
                sy2,
            };
            if !self.is_placeable(&candidate, &mb, is_inside) {
                continue;
            }

            label.x = match dx * inside_sign {
                0 => xc,
                d if d < 0 => x2,
                _ => x1,
            };
            label.y = match dy * inside_sign {
                0 => yc,
                d if d < 0 => y2,
                _ => y1,
            };
            label.align = Align::from_direction(dx * inside_sign);
            label.baseline = Baseline::from_direction(dy * inside_sign);

            self.primary
                .mark_in_range_scaled(candidate.sx1, candidate.sy1, candidate.sx2, candidate.sy2);
            self.labels
                .mark_in_range_scaled(candidate.sx1, candidate.sy1, candidate.sx2, candidate.sy2);
            return true;
        }
        false
    }

    /// Outside placements must clear every occupied cell. Inside placements sit
    /// on their own mark, so they only have to clear mark outlines and other
    /// labels, and must stay within the mark boundary.
    fn is_placeable(&self, b: &LabelBox, mb: &MarkBound, is_inside: bool) -> bool {
        if self.primary.search_out_of_bound(b.sx1, b.sy1, b.sx2, b.sy2) {
            return false;
        }
        if is_inside {
            let on_border = self
                .border
                .is_some_and(|border| check_collision(b.sx1, b.sy1, b.sx2, b.sy2, border));
            !on_border
                && !check_collision(b.sx1, b.sy1, b.sx2, b.sy2, self.labels)
                && mb.contains(b.x1, b.y1, b.x2, b.y2)
        } else {
            !check_collision(b.sx1, b.sy1, b.sx2, b.sy2, self.primary)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::types::Anchor;

    const W: f32 = 200.0;
    const H: f32 = 200.0;

    fn candidate(mark_bound: MarkBound, text_width: Option<f32>) -> LabelCandidate<'static> {
        LabelCandidate {
            index: 0,
            text: "label",
            font: "sans-serif",
            font_size: 10.0,
            text_width,
            mark_bound,
            sort_key: None,
            original_opacity: 1.0,
            datum: None,
            x: 0.0,
            y: 0.0,
            opacity: 0.0,
            align: Align::default(),
            baseline: Baseline::default(),
            transformed: false,
        }
    }

    fn default_placements() -> Vec<AnchorOffset> {
        Anchor::DEFAULTS
            .iter()
            .map(|anchor| AnchorOffset::new(*anchor, 1.0))
            .collect()
    }

    #[test]
    fn isolated_label_takes_first_candidate() {
        let mut primary = BitMap::new(W, H, 0.0);
        let mut labels = BitMap::new(W, H, 0.0);
        let placements = default_placements();
        let mut placer = LabelPlacer::new(&mut primary, None, &mut labels, (W, H), &placements);
        let mut label = candidate(MarkBound::point(100.0, 100.0), Some(30.0));
        assert!(placer.place(&mut label));
        assert_eq!(label.align, Align::Right);
        assert_eq!(label.baseline, Baseline::Bottom);
        let expected = 100.0 - SIZE_FACTOR;
        assert!((label.x - expected).abs() < 1e-4);
        assert!((label.y - expected).abs() < 1e-4);
        assert!(primary.get(85.0, 95.0));
        assert!(!primary.get(105.0, 95.0));
    }

    #[test]
    fn second_identical_label_moves_to_later_candidate() {
        let mut primary = BitMap::new(W, H, 0.0);
        let mut labels = BitMap::new(W, H, 0.0);
        let placements = default_placements();
        let mut placer = LabelPlacer::new(&mut primary, None, &mut labels, (W, H), &placements);
        let mut first = candidate(MarkBound::point(100.0, 100.0), Some(30.0));
        let mut second = candidate(MarkBound::point(100.0, 100.0), Some(30.0));
        assert!(placer.place(&mut first));
        assert!(placer.place(&mut second));
        // top-left and left collide with the first box; bottom-left is free.
        assert_eq!(second.align, Align::Right);
        assert_eq!(second.baseline, Baseline::Top);
        assert!(second.y > first.y);
    }

    #[test]
    fn label_hidden_when_every_candidate_collides() {
        let mut primary = BitMap::new(W, H, 0.0);
        primary.mark_in_range(50.0, 50.0, 150.0, 150.0);
        let mut labels = BitMap::new(W, H, 0.0);
        let placements = default_placements();
        let mut placer = LabelPlacer::new(&mut primary, None, &mut labels, (W, H), &placements);
        let mut label = candidate(MarkBound::point(100.0, 100.0), None);
        assert!(!placer.place(&mut label));
        // every probe collided, so the text was never measured
        assert!(label.text_width.is_none());
    }

    #[test]
    fn mark_outside_canvas_is_rejected() {
        let mut primary = BitMap::new(W, H, 0.0);
        let mut labels = BitMap::new(W, H, 0.0);
        let placements = default_placements();
        let mut placer = LabelPlacer::new(&mut primary, None, &mut labels, (W, H), &placements);
        let mut label = candidate(MarkBound::point(-5.0, 100.0), Some(10.0));
        assert!(!placer.place(&mut label));
        assert!(primary.is_empty());
    }

    #[test]
    fn labels_stay_within_canvas() {
        let mut primary = BitMap::new(W, H, 0.0);
        let mut labels = BitMap::new(W, H, 0.0);
        let placements = default_placements();
        let mut placer = LabelPlacer::new(&mut primary, None, &mut labels, (W, H), &placements);
        // near the top-left corner only right/bottom candidates fit
        let mut label = candidate(MarkBound::point(2.0, 2.0), Some(30.0));
        assert!(placer.place(&mut label));
        assert_eq!(label.align, Align::Left);
        assert_eq!(label.baseline, Baseline::Top);
    }

    #[test]
    fn inside_placement_centers_in_mark() {
        let mut primary = BitMap::new(W, H, 0.0);
        // the bar itself is occupied, which inside placement ignores
        primary.mark_in_range(40.0, 40.0, 160.0, 80.0);
        let mut border = BitMap::new(W, H, 0.0);
        border.mark_in_range(40.0, 40.0, 160.0, 40.0);
        border.mark_in_range(40.0, 80.0, 160.0, 80.0);
        let mut labels = BitMap::new(W, H, 0.0);
        let placements = vec![AnchorOffset::new(Anchor::Middle, 0.0)];
        let mut placer =
            LabelPlacer::new(&mut primary, Some(&border), &mut labels, (W, H), &placements);
        let mut label = candidate(MarkBound::rect(40.0, 40.0, 160.0, 80.0), Some(30.0));
        assert!(placer.place(&mut label));
        assert_eq!(label.align, Align::Center);
        assert_eq!(label.baseline, Baseline::Middle);
        assert_eq!((label.x, label.y), (100.0, 60.0));

        // a second label on the same bar would overlap the first
        let mut other = candidate(MarkBound::rect(40.0, 40.0, 160.0, 80.0), Some(30.0));
        assert!(!placer.place(&mut other));
    }

    #[test]
    fn negative_offset_places_inside_corner() {
        let mut primary = BitMap::new(W, H, 0.0);
        let mut labels = BitMap::new(W, H, 0.0);
        let placements = vec![AnchorOffset::new(Anchor::Top, -2.0)];
        let mut placer = LabelPlacer::new(&mut primary, None, &mut labels, (W, H), &placements);
        let mut label = candidate(MarkBound::rect(50.0, 50.0, 150.0, 100.0), Some(20.0));
        assert!(placer.place(&mut label));
        // inside the top edge, hanging down from it
        assert_eq!(label.align, Align::Center);
        assert_eq!(label.baseline, Baseline::Top);
        assert!((label.y - 52.0).abs() < 1e-4);
        assert_eq!(label.x, 100.0);
    }

    #[test]
    fn inside_label_too_large_for_mark_fails() {
        let mut primary = BitMap::new(W, H, 0.0);
        let mut labels = BitMap::new(W, H, 0.0);
        let placements = vec![AnchorOffset::new(Anchor::Middle, 0.0)];
        let mut placer = LabelPlacer::new(&mut primary, None, &mut labels, (W, H), &placements);
        let mut label = candidate(MarkBound::rect(90.0, 90.0, 110.0, 95.0), Some(30.0));
        assert!(!placer.place(&mut label));
    }
}
