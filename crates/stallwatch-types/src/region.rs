use serde::{Deserialize, Serialize};

/// Screen rectangle in virtual-desktop pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaptureRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRegion {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    pub fn center(&self) -> (i32, i32) {
        (
            (self.x as i64 + self.width as i64 / 2) as i32,
            (self.y as i64 + self.height as i64 / 2) as i32,
        )
    }

    /// True when `other` lies entirely inside `self`.
    pub fn contains(&self, other: &CaptureRegion) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Overlapping part of two rectangles, `None` when they do not overlap.
    pub fn intersect(&self, other: &CaptureRegion) -> Option<CaptureRegion> {
        let left = (self.x as i64).max(other.x as i64);
        let top = (self.y as i64).max(other.y as i64);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right <= left || bottom <= top {
            return None;
        }

        Some(CaptureRegion {
            x: left as i32,
            y: top as i32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        })
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &CaptureRegion) -> CaptureRegion {
        let left = (self.x as i64).min(other.x as i64);
        let top = (self.y as i64).min(other.y as i64);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());

        CaptureRegion {
            x: left as i32,
            y: top as i32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        }
    }

    /// Sub-rectangle described by `fraction`, clamped to `self`.
    ///
    /// Returns `None` when the clamped result has no area.
    pub fn fraction(&self, fraction: &RegionFraction) -> Option<CaptureRegion> {
        let w = self.width as f64;
        let h = self.height as f64;

        let left = self.x as i64 + (w * fraction.left).floor() as i64;
        let top = self.y as i64 + (h * fraction.top).floor() as i64;
        let right = self.x as i64 + (w * (fraction.left + fraction.width)).round() as i64;
        let bottom = self.y as i64 + (h * (fraction.top + fraction.height)).round() as i64;

        if right <= left || bottom <= top {
            return None;
        }

        let raw = CaptureRegion {
            x: left as i32,
            y: top as i32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        };

        raw.intersect(self)
    }
}

/// Rectangle expressed as fractions of a parent rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionFraction {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl RegionFraction {
    pub const RIGHT_HALF: RegionFraction = RegionFraction {
        left: 0.5,
        top: 0.0,
        width: 0.5,
        height: 1.0,
    };

    /// Right half, bottom strip of the window: where chat input boxes usually sit.
    pub const INPUT_STRIP: RegionFraction = RegionFraction {
        left: 0.5,
        top: 0.88,
        width: 0.5,
        height: 0.12,
    };

    pub fn is_valid(&self) -> bool {
        let parts = [self.left, self.top, self.width, self.height];
        parts.iter().all(|v| v.is_finite() && (0.0..=1.0).contains(v))
            && self.width > 0.0
            && self.height > 0.0
            && self.left < 1.0
            && self.top < 1.0
    }
}

impl Default for RegionFraction {
    fn default() -> Self {
        Self::RIGHT_HALF
    }
}
