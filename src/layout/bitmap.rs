// Bit-packed occupancy grid over chart pixel space.
//
// Real (pixel) coordinates are down-sampled by `pixel_ratio` so that the grid
// never grows much past a million cells, whatever the chart resolution.

const WORD_BITS: usize = 64;
const DIV: usize = 6;
const MOD: usize = WORD_BITS - 1;
const CELL_BUDGET: f32 = 1_000_000.0;

/// Mask with the lowest `n` bits set (`n` in `0..=64`).
fn low_mask(n: usize) -> u64 {
    if n >= WORD_BITS {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

/// Mask with every bit from `n` upward set.
fn high_mask(n: usize) -> u64 {
    !low_mask(n)
}

#[derive(Debug, Clone, PartialEq)]
pub struct BitMap {
    pixel_ratio: f32,
    padding: f32,
    width: i32,
    height: i32,
    words: Vec<u64>,
}

impl BitMap {
    /// One cell wider and taller than the padded chart, so a label may end up
    /// to `pixel_ratio` pixels past the far edges.
    pub fn new(width: f32, height: f32, padding: f32) -> Self {
        let pixel_ratio = ((width * height) / CELL_BUDGET).sqrt().max(1.0);
        let grid_width = ((width + 2.0 * padding + pixel_ratio) / pixel_ratio).max(0.0) as i32;
        let grid_height = ((height + 2.0 * padding + pixel_ratio) / pixel_ratio).max(0.0) as i32;
        let cells = grid_width as usize * grid_height as usize;
        Self {
            pixel_ratio,
            padding,
            width: grid_width,
            height: grid_height,
            words: vec![0; (cells + WORD_BITS) / WORD_BITS],
        }
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    pub fn padding(&self) -> f32 {
        self.padding
    }

    /// Grid dimensions in cells.
    pub fn dimensions(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    /// Scale a real pixel coordinate into grid space.
    pub fn scale_pixel(&self, real: f32) -> i32 {
        ((real + self.padding) / self.pixel_ratio).floor() as i32
    }

    fn bit_index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn mark_scaled(&mut self, x: i32, y: i32) {
        if let Some(idx) = self.bit_index(x, y) {
            self.words[idx >> DIV] |= 1u64 << (idx & MOD);
        }
    }

    pub fn mark(&mut self, x: f32, y: f32) {
        self.mark_scaled(self.scale_pixel(x), self.scale_pixel(y));
    }

    pub fn unmark_scaled(&mut self, x: i32, y: i32) {
        if let Some(idx) = self.bit_index(x, y) {
            self.words[idx >> DIV] &= !(1u64 << (idx & MOD));
        }
    }

    pub fn unmark(&mut self, x: f32, y: f32) {
        self.unmark_scaled(self.scale_pixel(x), self.scale_pixel(y));
    }

    /// Cells outside the grid read as free.
    pub fn get_scaled(&self, x: i32, y: i32) -> bool {
        match self.bit_index(x, y) {
            Some(idx) => self.words[idx >> DIV] & (1u64 << (idx & MOD)) != 0,
            None => false,
        }
    }

    pub fn get(&self, x: f32, y: f32) -> bool {
        self.get_scaled(self.scale_pixel(x), self.scale_pixel(y))
    }

    /// Clip an inclusive cell rectangle to the grid. `None` when nothing is left.
    fn clip(&self, x: i32, y: i32, x2: i32, y2: i32) -> Option<(i32, i32, i32, i32)> {
        let x = x.max(0);
        let y = y.max(0);
        let x2 = x2.min(self.width - 1);
        let y2 = y2.min(self.height - 1);
        if x > x2 || y > y2 {
            None
        } else {
            Some((x, y, x2, y2))
        }
    }

    /// Word span `(first, last, first_mask, last_mask)` covering row `y` from `x` to `x2`.
    fn row_span(&self, x: i32, x2: i32, y: i32) -> (usize, usize, u64, u64) {
        let row = y as usize * self.width as usize;
        let start = row + x as usize;
        let end = row + x2 as usize;
        (
            start >> DIV,
            end >> DIV,
            high_mask(start & MOD),
            low_mask((end & MOD) + 1),
        )
    }

    pub fn mark_in_range_scaled(&mut self, x: i32, y: i32, x2: i32, y2: i32) {
        let Some((x, y, x2, y2)) = self.clip(x, y, x2, y2) else {
            return;
        };
        for row in y..=y2 {
            let (first, last, first_mask, last_mask) = self.row_span(x, x2, row);
            if first == last {
                self.words[first] |= first_mask & last_mask;
            } else {
                self.words[first] |= first_mask;
                self.words[last] |= last_mask;
                for word in &mut self.words[first + 1..last] {
                    *word = u64::MAX;
                }
            }
        }
    }

    pub fn mark_in_range(&mut self, x: f32, y: f32, x2: f32, y2: f32) {
        self.mark_in_range_scaled(
            self.scale_pixel(x),
            self.scale_pixel(y),
            self.scale_pixel(x2),
            self.scale_pixel(y2),
        );
    }

    pub fn unmark_in_range_scaled(&mut self, x: i32, y: i32, x2: i32, y2: i32) {
        let Some((x, y, x2, y2)) = self.clip(x, y, x2, y2) else {
            return;
        };
        for row in y..=y2 {
            let (first, last, first_mask, last_mask) = self.row_span(x, x2, row);
            if first == last {
                self.words[first] &= !(first_mask & last_mask);
            } else {
                self.words[first] &= !first_mask;
                self.words[last] &= !last_mask;
                for word in &mut self.words[first + 1..last] {
                    *word = 0;
                }
            }
        }
    }

    pub fn unmark_in_range(&mut self, x: f32, y: f32, x2: f32, y2: f32) {
        self.unmark_in_range_scaled(
            self.scale_pixel(x),
            self.scale_pixel(y),
            self.scale_pixel(x2),
            self.scale_pixel(y2),
        );
    }

    /// True if any cell of the inclusive rectangle is occupied.
    pub fn get_in_range_scaled(&self, x: i32, y: i32, x2: i32, y2: i32) -> bool {
        let Some((x, y, x2, y2)) = self.clip(x, y, x2, y2) else {
            return false;
        };
        for row in y..=y2 {
            let (first, last, first_mask, last_mask) = self.row_span(x, x2, row);
            if first == last {
                if self.words[first] & first_mask & last_mask != 0 {
                    return true;
                }
                continue;
            }
            if self.words[first] & first_mask != 0 || self.words[last] & last_mask != 0 {
                return true;
            }
            if self.words[first + 1..last].iter().any(|word| *word != 0) {
                return true;
            }
        }
        false
    }

    pub fn get_in_range(&self, x: f32, y: f32, x2: f32, y2: f32) -> bool {
        self.get_in_range_scaled(
            self.scale_pixel(x),
            self.scale_pixel(y),
            self.scale_pixel(x2),
            self.scale_pixel(y2),
        )
    }

    pub fn search_out_of_bound(&self, x: i32, y: i32, x2: i32, y2: i32) -> bool {
        x < 0 || y < 0 || y2 >= self.height || x2 >= self.width
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|word| *word == 0)
    }
}

/// Collision test for a scaled label box. The bottom row is probed first since
/// labels are usually stacked vertically against each other.
pub(crate) fn check_collision(x1: i32, y1: i32, x2: i32, y2: i32, bitmap: &BitMap) -> bool {
    bitmap.get_in_range_scaled(x1, y2, x2, y2) || bitmap.get_in_range_scaled(x1, y1, x2, y2 - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_chart_keeps_unit_pixel_ratio() {
        let bm = BitMap::new(100.0, 100.0, 0.0);
        assert_eq!(bm.pixel_ratio(), 1.0);
        assert_eq!(bm.dimensions(), (101, 101));
    }

    #[test]
    fn large_chart_is_down_sampled() {
        let bm = BitMap::new(2000.0, 2000.0, 5.0);
        assert!((bm.pixel_ratio() - 2.0).abs() < 1e-6);
        assert_eq!(bm.dimensions(), (1006, 1006));
        assert_eq!(bm.scale_pixel(10.0), 7);
    }

    #[test]
    fn range_query_sees_marked_region() {
        let mut bm = BitMap::new(100.0, 100.0, 0.0);
        bm.mark_in_range(10.0, 10.0, 20.0, 20.0);
        assert!(bm.get_in_range(15.0, 15.0, 16.0, 16.0));
        assert!(!bm.get_in_range(30.0, 30.0, 31.0, 31.0));
        assert!(bm.get(10.0, 20.0));
        assert!(!bm.get(21.0, 20.0));
        assert!(!bm.get(9.0, 10.0));
    }

    #[test]
    fn range_crossing_several_words() {
        let mut bm = BitMap::new(400.0, 50.0, 0.0);
        bm.mark_in_range_scaled(3, 2, 250, 4);
        for x in [3, 63, 64, 127, 128, 200, 250] {
            assert!(bm.get_scaled(x, 3), "cell {x} should be marked");
        }
        assert!(!bm.get_scaled(2, 3));
        assert!(!bm.get_scaled(251, 3));
        assert!(!bm.get_scaled(100, 1));
        assert!(!bm.get_scaled(100, 5));
        assert!(bm.get_in_range_scaled(240, 0, 300, 2));
        assert!(!bm.get_in_range_scaled(251, 0, 399, 49));
    }

    #[test]
    fn unmark_range_clears_exactly_what_was_marked() {
        let mut bm = BitMap::new(300.0, 40.0, 0.0);
        bm.mark_in_range_scaled(5, 5, 200, 10);
        bm.mark_scaled(250, 7);
        bm.unmark_in_range_scaled(5, 5, 200, 10);
        assert!(!bm.get_in_range_scaled(0, 0, 249, 39));
        assert!(bm.get_scaled(250, 7));
        bm.unmark(250.0, 7.0);
        assert!(bm.is_empty());
    }

    #[test]
    fn point_mark_and_unmark() {
        let mut bm = BitMap::new(64.0, 64.0, 2.0);
        bm.mark(0.0, 0.0);
        assert!(bm.get_scaled(2, 2));
        bm.unmark_scaled(2, 2);
        assert!(!bm.get(0.0, 0.0));
    }

    #[test]
    fn far_edge_cell_is_in_bounds() {
        let bm = BitMap::new(100.0, 50.0, 0.0);
        assert_eq!(bm.dimensions(), (101, 51));
        let (x, y) = (bm.scale_pixel(100.0), bm.scale_pixel(50.0));
        assert!(!bm.search_out_of_bound(0, 0, x, y));
        assert!(bm.search_out_of_bound(0, 0, x + 1, y));
    }

    #[test]
    fn out_of_bound_search() {
        let bm = BitMap::new(100.0, 100.0, 0.0);
        assert!(!bm.search_out_of_bound(0, 0, 100, 100));
        assert!(bm.search_out_of_bound(-1, 0, 10, 10));
        assert!(bm.search_out_of_bound(0, 0, 101, 10));
        assert!(bm.search_out_of_bound(0, 0, 10, 101));
    }

    #[test]
    fn out_of_grid_access_is_ignored() {
        let mut bm = BitMap::new(20.0, 20.0, 0.0);
        bm.mark_scaled(-3, 4);
        bm.mark_scaled(4, 500);
        assert!(bm.is_empty());
        assert!(!bm.get_scaled(-3, 4));
        bm.mark_in_range_scaled(-10, -10, 2, 2);
        assert!(bm.get_scaled(0, 0));
        assert!(bm.get_scaled(2, 2));
        assert!(!bm.get_scaled(3, 3));
    }

    #[test]
    fn collision_check_covers_all_rows() {
        let mut bm = BitMap::new(50.0, 50.0, 0.0);
        bm.mark_scaled(10, 12);
        assert!(check_collision(5, 10, 15, 20, &bm));
        assert!(check_collision(5, 5, 15, 12, &bm));
        assert!(!check_collision(11, 5, 15, 20, &bm));
    }
}
