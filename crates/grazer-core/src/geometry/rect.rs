use super::Vec2;
use serde::{Deserialize, Serialize};

/// Integer pixel coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x as f64, self.y as f64)
    }
}

/// Axis-aligned integer rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle reaching `extents` away from `center` on each side, before any clipping.
    /// Saturates at the `i32` range for centers that do not fit.
    pub fn around(center: Vec2, extents: RoiExtents) -> Self {
        let cx = center.x.floor() as i32;
        let cy = center.y.floor() as i32;
        Self::new(
            cx.saturating_sub(extents.left),
            cy.saturating_sub(extents.up),
            extents.left.saturating_add(extents.right),
            extents.up.saturating_add(extents.down),
        )
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    /// Intersection with `bounds`. The result always lies inside `bounds`: when the two
    /// do not overlap it collapses to a zero-sized rectangle on the nearest edge.
    pub fn clip_to(&self, bounds: Rect) -> Rect {
        let x0 = self.x.clamp(bounds.x, bounds.right());
        let y0 = self.y.clamp(bounds.y, bounds.bottom());
        let x1 = self.right().clamp(bounds.x, bounds.right());
        let y1 = self.bottom().clamp(bounds.y, bounds.bottom());
        Rect::new(x0, y0, (x1 - x0).max(0), (y1 - y0).max(0))
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.width >= 0
            && other.height >= 0
            && other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.x && p.y >= self.y && p.x < self.right() && p.y < self.bottom()
    }

    /// Maps a point local to this rectangle into the parent space.
    pub fn to_parent(&self, local: Point) -> Point {
        Point::new(local.x + self.x, local.y + self.y)
    }

    pub fn to_parent_vec(&self, local: Vec2) -> Vec2 {
        local + self.origin().to_vec2()
    }

    /// Re-expresses a rectangle local to this one in the parent space.
    pub fn rect_to_parent(&self, local: Rect) -> Rect {
        Rect::new(local.x + self.x, local.y + self.y, local.width, local.height)
    }
}

/// How far a region of interest reaches from its center on each side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoiExtents {
    pub left: i32,
    pub right: i32,
    pub up: i32,
    pub down: i32,
}

impl RoiExtents {
    pub const fn square(half: i32) -> Self {
        Self {
            left: half,
            right: half,
            up: half,
            down: half,
        }
    }
}

/// The playfield rectangle inside the captured frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptureBox {
    rect: Rect,
}

impl CaptureBox {
    pub const fn new(rect: Rect) -> Self {
        Self { rect }
    }

    /// The playfield in frame space.
    pub fn frame_rect(&self) -> Rect {
        self.rect
    }

    /// The playfield in game space, anchored at the origin.
    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.rect.width, self.rect.height)
    }

    pub fn width(&self) -> f64 {
        self.rect.width as f64
    }

    pub fn height(&self) -> f64 {
        self.rect.height as f64
    }

    pub fn to_game_space(&self, frame_point: Vec2) -> Vec2 {
        frame_point - self.rect.origin().to_vec2()
    }

    pub fn to_frame_space(&self, game_point: Vec2) -> Vec2 {
        game_point + self.rect.origin().to_vec2()
    }

    /// Region of interest around a game-space point, shrunk to stay inside the playfield.
    ///
    /// Worked in `i64` and clamped before narrowing, so any finite center (and NaN,
    /// which casts to 0) yields a rectangle inside the playfield.
    pub fn roi(&self, center: Vec2, extents: RoiExtents) -> Rect {
        let bounds = self.bounds();
        let clamp_x = |v: i64| v.clamp(bounds.x as i64, bounds.right() as i64) as i32;
        let clamp_y = |v: i64| v.clamp(bounds.y as i64, bounds.bottom() as i64) as i32;

        let cx = center.x.floor() as i64;
        let cy = center.y.floor() as i64;
        let x0 = clamp_x(cx.saturating_sub(extents.left as i64));
        let y0 = clamp_y(cy.saturating_sub(extents.up as i64));
        let x1 = clamp_x(cx.saturating_add(extents.right as i64));
        let y1 = clamp_y(cy.saturating_add(extents.down as i64));
        Rect::new(x0, y0, (x1 - x0).max(0), (y1 - y0).max(0))
    }

    /// Whether a game-space point lies within `margin` playfield sizes of the playfield.
    /// Positions beyond that are torn or stale reads, not a player.
    pub fn is_plausible(&self, point: Vec2, margin: f64) -> bool {
        let (w, h) = (self.width(), self.height());
        point.is_finite()
            && point.x >= -w * margin
            && point.x <= w * (1.0 + margin)
            && point.y >= -h * margin
            && point.y <= h * (1.0 + margin)
    }
}

impl Default for CaptureBox {
    fn default() -> Self {
        Self::new(Rect::new(32, 16, 384, 448))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_roi_shrinks_at_edges() {
        let cbox = CaptureBox::default();
        let roi = cbox.roi(Vec2::new(10.0, 440.0), RoiExtents::square(70));
        assert_eq!(roi, Rect::new(0, 370, 80, 78));
        assert!(cbox.bounds().contains_rect(&roi));
    }

    #[test]
    fn test_roi_far_outside_collapses_on_edge() {
        let cbox = CaptureBox::default();
        let roi = cbox.roi(Vec2::new(-500.0, 1000.0), RoiExtents::square(70));
        assert_eq!(roi.width, 0);
        assert_eq!(roi.height, 0);
        assert!(cbox.bounds().contains_rect(&roi));
    }

    #[test]
    fn test_roi_for_huge_center_stays_inside() {
        let cbox = CaptureBox::default();
        for center in [
            Vec2::new(3.0e9, 3.0e9),
            Vec2::new(-3.0e9, 3.0e9),
            Vec2::new(f64::MAX, f64::MIN),
        ] {
            let roi = cbox.roi(center, RoiExtents::square(70));
            assert!(cbox.bounds().contains_rect(&roi), "{center:?} -> {roi:?}");
            assert_eq!(roi.area(), 0);
        }
    }

    #[test]
    fn test_around_saturates() {
        let rect = Rect::around(Vec2::new(3.0e9, -3.0e9), RoiExtents::square(70));
        assert_eq!(rect.x, i32::MAX - 70);
        assert_eq!(rect.y, i32::MIN);
        assert_eq!(rect.right(), i32::MAX);
    }

    #[test]
    fn test_plausible_positions() {
        let cbox = CaptureBox::default();
        assert!(cbox.is_plausible(Vec2::new(192.0, 400.0), 1.0));
        assert!(cbox.is_plausible(Vec2::new(-300.0, 800.0), 1.0));
        assert!(!cbox.is_plausible(Vec2::new(3.0e9, 100.0), 1.0));
        assert!(!cbox.is_plausible(Vec2::new(100.0, -1.0e6), 1.0));
        assert!(!cbox.is_plausible(Vec2::new(f64::NAN, 100.0), 1.0));
    }

    #[test]
    fn test_space_round_trip() {
        let cbox = CaptureBox::default();
        let frame = Vec2::new(132.0, 216.0);
        let game = cbox.to_game_space(frame);
        assert_eq!(game, Vec2::new(100.0, 200.0));
        assert_eq!(cbox.to_frame_space(game), frame);
    }

    #[test]
    fn test_to_parent() {
        let roi = Rect::new(30, 40, 10, 10);
        assert_eq!(roi.to_parent(Point::new(2, 3)), Point::new(32, 43));
        assert_eq!(
            roi.rect_to_parent(Rect::new(1, 1, 4, 4)),
            Rect::new(31, 41, 4, 4)
        );
    }

    proptest! {
        #[test]
        fn prop_roi_always_inside_capture_box(
            x in -1.0e10f64..1.0e10,
            y in -1.0e10f64..1.0e10,
            left in 0i32..300, right in 0i32..300,
            up in 0i32..300, down in 0i32..300,
        ) {
            let cbox = CaptureBox::default();
            let roi = cbox.roi(Vec2::new(x, y), RoiExtents { left, right, up, down });
            prop_assert!(roi.x >= 0 && roi.y >= 0);
            prop_assert!(roi.width >= 0 && roi.height >= 0);
            prop_assert!(cbox.bounds().contains_rect(&roi));
        }

        #[test]
        fn prop_roi_near_playfield_matches_clip(
            x in -1000.0f64..1500.0,
            y in -1000.0f64..1500.0,
            half in 0i32..300,
        ) {
            let cbox = CaptureBox::default();
            let extents = RoiExtents::square(half);
            prop_assert_eq!(
                cbox.roi(Vec2::new(x, y), extents),
                Rect::around(Vec2::new(x, y), extents).clip_to(cbox.bounds())
            );
        }
    }
}
