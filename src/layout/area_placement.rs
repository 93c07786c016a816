// Label placement inside grouped areas: flood-fill the free interior of each
// area and keep the largest label-shaped box that fits around a visited cell.

use crate::ir::SceneItem;

use super::bitmap::{BitMap, check_collision};
use super::types::{Align, Baseline, LabelCandidate};

const NEIGHBORS: [(i32, i32); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

pub(crate) struct AreaLabelPlacer<'a> {
    primary: &'a mut BitMap,
    border: Option<&'a BitMap>,
    visited: &'a mut BitMap,
    width: f32,
    height: f32,
    avoid_base_mark: bool,
    mark_index: usize,
}

impl<'a> AreaLabelPlacer<'a> {
    pub(crate) fn new(
        primary: &'a mut BitMap,
        border: Option<&'a BitMap>,
        visited: &'a mut BitMap,
        size: (f32, f32),
        avoid_base_mark: bool,
        mark_index: usize,
    ) -> Self {
        Self {
            primary,
            border,
            visited,
            width: size.0,
            height: size.1,
            avoid_base_mark,
            mark_index,
        }
    }

    pub(crate) fn place(&mut self, label: &mut LabelCandidate<'_>) -> bool {
        let items: &[SceneItem] = label
            .datum
            .and_then(|datum| datum.item.items.get(self.mark_index))
            .map(|mark| mark.items.as_slice())
            .unwrap_or(&[]);
        let text_height = label.text_height();
        let text_width = label.text_width();

        let placed = self
            .search_interior(items, text_width, text_height)
            .or_else(|| {
                if self.avoid_base_mark {
                    None
                } else {
                    self.widest_segment_center(items, text_width, text_height)
                }
            });

        let Some((x, y)) = placed else {
            label.align = Align::Left;
            label.baseline = Baseline::Top;
            return false;
        };

        let x1 = self.primary.scale_pixel(x - text_width / 2.0);
        let y1 = self.primary.scale_pixel(y - text_height / 2.0);
        let x2 = self.primary.scale_pixel(x + text_width / 2.0);
        let y2 = self.primary.scale_pixel(y + text_height / 2.0);
        self.primary.mark_in_range_scaled(x1, y1, x2, y2);
        label.x = x;
        label.y = y;
        label.align = Align::Center;
        label.baseline = Baseline::Middle;
        true
    }

    /// Flood fill from the middle of every segment. Each newly visited free cell
    /// is scored by the largest label-shaped box centered on it.
    fn search_interior(
        &mut self,
        items: &[SceneItem],
        text_width: f32,
        text_height: f32,
    ) -> Option<(f32, f32)> {
        let pixel_ratio = self.visited.pixel_ratio();
        let padding = self.primary.padding();
        let mut max_size = if self.avoid_base_mark { text_height } else { 0.0 };
        let mut best = None;
        let mut stack: Vec<(i32, i32)> = Vec::new();

        for item in items {
            let (x1, y1, x2, y2) = segment(item);
            stack.push((
                self.primary.scale_pixel((x1 + x2) / 2.0),
                self.primary.scale_pixel((y1 + y2) / 2.0),
            ));

            while let Some((cx, cy)) = stack.pop() {
                if self.is_blocked(cx, cy) {
                    continue;
                }
                self.visited.mark_scaled(cx, cy);
                for (ddx, ddy) in NEIGHBORS {
                    let (nx, ny) = (cx + ddx, cy + ddy);
                    if !self.visited.search_out_of_bound(nx, ny, nx, ny) {
                        stack.push((nx, ny));
                    }
                }

                let x = cx as f32 * pixel_ratio - padding;
                let y = cy as f32 * pixel_ratio - padding;
                if label_out_of_bound(x, y, text_width, text_height, self.width, self.height)
                    || self.collide(x, y, text_height, text_width, max_size, true)
                {
                    continue;
                }
                let mut lo = max_size;
                let mut hi = self.height;
                while hi - lo >= 1.0 {
                    let mid = (lo + hi) / 2.0;
                    if self.collide(x, y, text_height, text_width, mid, true) {
                        hi = mid;
                    } else {
                        lo = mid;
                    }
                }
                if lo > max_size {
                    max_size = lo;
                    best = Some((x, y));
                }
            }
        }
        best
    }

    fn is_blocked(&self, x: i32, y: i32) -> bool {
        self.primary.get_scaled(x, y)
            || self.border.is_some_and(|border| border.get_scaled(x, y))
            || self.visited.get_scaled(x, y)
            || self.visited.search_out_of_bound(x, y, x, y)
    }

    /// Center of the widest segment whose text-sized box is free of other labels
    /// and avoided marks. Later segments win ties.
    fn widest_segment_center(
        &self,
        items: &[SceneItem],
        text_width: f32,
        text_height: f32,
    ) -> Option<(f32, f32)> {
        let mut max_area_width = 0.0f32;
        let mut best = None;
        for item in items {
            let (x1, y1, x2, y2) = segment(item);
            let area_width = (x2 - x1 + y2 - y1).abs();
            let x = (x1 + x2) / 2.0;
            let y = (y1 + y2) / 2.0;
            if area_width >= max_area_width
                && !label_out_of_bound(x, y, text_width, text_height, self.width, self.height)
                && !self.collide(x, y, text_height, text_width, text_height, false)
            {
                max_area_width = area_width;
                best = Some((x, y));
            }
        }
        best
    }

    /// Whether a box of height `h`, with the label's aspect ratio, centered on
    /// `(x, y)` leaves the grid or hits an occupied cell. Monotonic in `h`.
    fn collide(
        &self,
        x: f32,
        y: f32,
        text_height: f32,
        text_width: f32,
        h: f32,
        with_border: bool,
    ) -> bool {
        collide(
            &*self.primary,
            if with_border { self.border } else { None },
            x,
            y,
            text_height,
            text_width,
            h,
        )
    }
}

fn segment(item: &SceneItem) -> (f32, f32, f32, f32) {
    let x1 = item.x;
    let y1 = item.y;
    (x1, y1, item.x2.unwrap_or(x1), item.y2.unwrap_or(y1))
}

fn label_out_of_bound(
    x: f32,
    y: f32,
    text_width: f32,
    text_height: f32,
    width: f32,
    height: f32,
) -> bool {
    x - text_width / 2.0 < 0.0
        || y - text_height / 2.0 < 0.0
        || x + text_width / 2.0 > width
        || y + text_height / 2.0 > height
}

pub(crate) fn collide(
    primary: &BitMap,
    border: Option<&BitMap>,
    x: f32,
    y: f32,
    text_height: f32,
    text_width: f32,
    h: f32,
) -> bool {
    let w = (text_width * h) / (text_height * 2.0);
    let half_h = h / 2.0;
    let x1 = primary.scale_pixel(x - w);
    let x2 = primary.scale_pixel(x + w);
    let y1 = primary.scale_pixel(y - half_h);
    let y2 = primary.scale_pixel(y + half_h);

    primary.search_out_of_bound(x1, y1, x2, y2)
        || check_collision(x1, y1, x2, y2, primary)
        || border.is_some_and(|border| check_collision(x1, y1, x2, y2, border))
}
