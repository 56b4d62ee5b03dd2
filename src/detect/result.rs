/// Axis-aligned box in pixel units, top-left anchored.
///
/// Width and height are never negative; the origin may be (MOT ground truth
/// routinely places pedestrians partly outside the image).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    /// Integer pixel coordinates, truncated toward zero.
    pub fn to_pixels(&self) -> (i32, i32, i32, i32) {
        (
            self.x.trunc() as i32,
            self.y.trunc() as i32,
            self.width.trunc() as i32,
            self.height.trunc() as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_extent_is_clamped() {
        let bbox = BoundingBox::new(-3.0, 4.0, -1.0, 10.0);
        assert_eq!(bbox.width, 0.0);
        assert!(bbox.is_empty());
        assert_eq!(bbox.x, -3.0);
    }

    #[test]
    fn pixels_truncate_toward_zero() {
        let bbox = BoundingBox::new(-2.7, 9.9, 30.5, 80.99);
        assert_eq!(bbox.to_pixels(), (-2, 9, 30, 80));
    }

    #[test]
    fn translation_keeps_extent() {
        let moved = BoundingBox::new(10.0, 10.0, 5.0, 6.0).translated(2.0, -3.0);
        assert_eq!(moved, BoundingBox::new(12.0, 7.0, 5.0, 6.0));
        assert_eq!(moved.right(), 17.0);
        assert_eq!(moved.bottom(), 13.0);
        assert_eq!(moved.area(), 30.0);
    }
}
