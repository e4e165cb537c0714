/// Scroll state of a single scrollable surface, in terminal cells.
#[derive(Clone, Copy, Debug, Default)]
pub struct ViewportState {
    pub x: u32,
    pub y: u32,
    pub viewport_w: u16,
    pub viewport_h: u16,
    pub content_w: u32,
    pub content_h: u32,
}

impl ViewportState {
    pub fn set_viewport(&mut self, w: u16, h: u16) {
        self.viewport_w = w;
        self.viewport_h = h;
        self.clamp();
    }

    pub fn set_content(&mut self, w: u32, h: u32) {
        self.content_w = w;
        self.content_h = h;
        self.clamp();
    }

    pub fn clamp(&mut self) {
        let max_y = self.max_y();
        let max_x = self.max_x();
        self.y = self.y.min(max_y);
        self.x = self.x.min(max_x);
    }

    pub fn scroll_y_by(&mut self, delta: i32) {
        let next = self.y as i64 + delta as i64;
        self.y = next.clamp(0, self.max_y() as i64) as u32;
    }

    pub fn page_down(&mut self) {
        self.scroll_y_by(self.viewport_h.saturating_sub(1) as i32);
    }

    pub fn page_up(&mut self) {
        self.scroll_y_by(-(self.viewport_h.saturating_sub(1) as i32));
    }

    pub fn to_top(&mut self) {
        self.y = 0;
    }

    pub fn to_bottom(&mut self) {
        self.y = self.max_y();
    }

    /// The currently visible rectangle in content coordinates.
    pub fn window(&self) -> Region {
        Region::new(self.x, self.y, self.viewport_w as u32, self.viewport_h as u32)
    }

    fn max_y(&self) -> u32 {
        self.content_h.saturating_sub(self.viewport_h as u32)
    }

    fn max_x(&self) -> u32 {
        self.content_w.saturating_sub(self.viewport_w as u32)
    }
}

/// An axis-aligned rectangle in content coordinates (columns, rows).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A full-width band of `height` rows starting at row `y`.
    pub const fn rows(y: u32, height: u32) -> Self {
        Self::new(0, y, u32::MAX, height)
    }

    fn left(&self) -> i64 {
        self.x as i64
    }

    fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    fn top(&self) -> i64 {
        self.y as i64
    }

    fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }
}

/// `window` grown by `margin_rows` above and below; horizontal extent is unchanged.
#[derive(Clone, Copy, Debug)]
struct PaddedWindow {
    left: i64,
    right: i64,
    top: i64,
    bottom: i64,
}

impl PaddedWindow {
    fn new(window: Region, margin_rows: u32) -> Self {
        Self {
            left: window.left(),
            right: window.right(),
            top: window.top() - margin_rows as i64,
            bottom: window.bottom() + margin_rows as i64,
        }
    }
}

/// Cheap geometric check: does `region` touch `window` padded by `margin_rows`?
pub fn intersects_padded(region: Region, window: Region, margin_rows: u32) -> bool {
    let w = PaddedWindow::new(window, margin_rows);
    region.top() < w.bottom
        && region.bottom() > w.top
        && region.left() < w.right
        && region.right() > w.left
}

/// Does `region` span the whole padded window vertically and overlap it horizontally?
///
/// Blocks far taller than the viewport never reach a meaningful visible fraction, yet they are
/// as visible as anything can be once they fill the screen.
pub fn covers_padded(region: Region, window: Region, margin_rows: u32) -> bool {
    let w = PaddedWindow::new(window, margin_rows);
    region.top() <= w.top
        && region.bottom() >= w.bottom
        && region.left() < w.right
        && region.right() > w.left
}

/// Fraction of `region`'s area inside the padded window, in `0.0..=1.0`.
///
/// Degenerate regions (zero width or height) count as fully visible when they lie within the
/// padded window, and invisible otherwise.
pub fn intersection_ratio(region: Region, window: Region, margin_rows: u32) -> f64 {
    let w = PaddedWindow::new(window, margin_rows);
    if region.width == 0 || region.height == 0 {
        let inside = region.top() >= w.top
            && region.bottom() <= w.bottom
            && region.left() >= w.left
            && region.right() <= w.right;
        return if inside { 1.0 } else { 0.0 };
    }

    let overlap_w = (region.right().min(w.right) - region.left().max(w.left)).max(0);
    let overlap_h = (region.bottom().min(w.bottom) - region.top().max(w.top)).max(0);
    let area = region.width as f64 * region.height as f64;
    ((overlap_w as f64 * overlap_h as f64) / area).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_clamps_both_axes() {
        let mut s = ViewportState::default();
        s.set_viewport(10, 5);
        s.set_content(12, 6);
        s.x = 99;
        s.y = 99;
        s.clamp();
        assert_eq!(s.x, 2);
        assert_eq!(s.y, 1);
    }

    #[test]
    fn window_follows_scroll_position() {
        let mut s = ViewportState::default();
        s.set_viewport(80, 10);
        s.set_content(80, 100);
        s.scroll_y_by(25);
        assert_eq!(s.window(), Region::new(0, 25, 80, 10));
        s.page_down();
        assert_eq!(s.window().y, 34);
    }

    #[test]
    fn padding_extends_only_vertically() {
        let window = Region::new(0, 10, 80, 10);
        assert!(!intersects_padded(Region::rows(22, 3), window, 0));
        assert!(intersects_padded(Region::rows(22, 3), window, 4));
        assert!(intersects_padded(Region::rows(3, 4), window, 4));
        assert!(!intersects_padded(Region::new(80, 12, 5, 1), window, 100));
    }

    #[test]
    fn ratio_is_fraction_of_region_area() {
        let window = Region::new(0, 0, 10, 10);
        let half = Region::new(0, 5, 10, 10);
        assert!((intersection_ratio(half, window, 0) - 0.5).abs() < f64::EPSILON);
        assert_eq!(intersection_ratio(Region::new(0, 40, 10, 2), window, 0), 0.0);
        assert_eq!(intersection_ratio(Region::new(3, 3, 0, 0), window, 0), 1.0);
    }
}
