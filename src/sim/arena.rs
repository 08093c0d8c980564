//! Arena bounds and static obstacles
//!
//! Obstacles are axis-aligned rectangles fixed for the whole run. Every other
//! component asks this module point, segment and circle questions.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Smallest extent an obstacle may have on either axis
pub const MIN_OBSTACLE_SIZE: f32 = 1.0;

const OBSTACLE_COUNT: usize = 22;
const OBSTACLE_MIN: Vec2 = Vec2::new(80.0, 60.0);
const OBSTACLE_MAX: Vec2 = Vec2::new(220.0, 180.0);
const OBSTACLE_EDGE_MARGIN: f32 = 80.0;
const OBSTACLE_SPACING: f32 = 20.0;
const SAFE_ZONE: Vec2 = Vec2::new(520.0, 400.0);

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub max: Vec2,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            max: Vec2::new(x + w, y + h),
        }
    }

    pub fn from_center(center: Vec2, size: Vec2) -> Self {
        Self {
            min: center - size * 0.5,
            max: center + size * 0.5,
        }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Grow by `amount` on every side
    pub fn inflate(&self, amount: f32) -> Self {
        Self {
            min: self.min - Vec2::splat(amount),
            max: self.max + Vec2::splat(amount),
        }
    }

    /// Half-open point test, left/top edges inclusive
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x < self.max.x && p.y >= self.min.y && p.y < self.max.y
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }

    pub fn closest_point(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min, self.max)
    }

    /// Clamp a circle's center so the circle stays inside
    pub fn clamp_circle(&self, center: Vec2, radius: f32) -> Vec2 {
        let lo = self.min + Vec2::splat(radius);
        let hi = (self.max - Vec2::splat(radius)).max(lo);
        center.clamp(lo, hi)
    }

    /// Liang-Barsky clip of segment `a..b` against this rect
    pub fn intersects_segment(&self, a: Vec2, b: Vec2) -> bool {
        let d = b - a;
        let mut t0 = 0.0f32;
        let mut t1 = 1.0f32;
        let edges = [
            (-d.x, a.x - self.min.x),
            (d.x, self.max.x - a.x),
            (-d.y, a.y - self.min.y),
            (d.y, self.max.y - a.y),
        ];
        for (p, q) in edges {
            if p.abs() < f32::EPSILON {
                if q < 0.0 {
                    return false;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return false;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return false;
                }
                t1 = t1.min(r);
            }
        }
        true
    }

    fn sanitized(self) -> Self {
        let min = self.min.min(self.max);
        let max = self.min.max(self.max);
        Self {
            min,
            max: max.max(min + Vec2::splat(MIN_OBSTACLE_SIZE)),
        }
    }
}

/// Arena bounds plus static obstacles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arena {
    pub bounds: Rect,
    pub obstacles: Vec<Rect>,
}

impl Arena {
    /// Build from externally supplied geometry. Degenerate rects are widened
    /// to the minimum size, non-finite ones are dropped.
    pub fn new(bounds: Rect, obstacles: Vec<Rect>) -> Self {
        let finite = |r: &Rect| r.min.is_finite() && r.max.is_finite();
        let dropped = obstacles.iter().filter(|r| !finite(r)).count();
        if dropped > 0 {
            log::warn!("Dropped {dropped} non-finite obstacle(s)");
        }
        Self {
            bounds: bounds.sanitized(),
            obstacles: obstacles
                .into_iter()
                .filter(finite)
                .map(Rect::sanitized)
                .collect(),
        }
    }

    /// An arena with no obstacles
    pub fn open(width: f32, height: f32) -> Self {
        Self::new(Rect::new(0.0, 0.0, width, height), Vec::new())
    }

    /// Random obstacle layout with a clear zone around the center
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, width: f32, height: f32) -> Self {
        let bounds = Rect::new(0.0, 0.0, width, height);
        let safe = Rect::from_center(bounds.center(), SAFE_ZONE);
        let mut obstacles: Vec<Rect> = Vec::with_capacity(OBSTACLE_COUNT);

        for _ in 0..OBSTACLE_COUNT {
            let w = rng.random_range(OBSTACLE_MIN.x..=OBSTACLE_MAX.x).round();
            let h = rng.random_range(OBSTACLE_MIN.y..=OBSTACLE_MAX.y).round();
            let x_hi = (width - w - OBSTACLE_EDGE_MARGIN).max(OBSTACLE_EDGE_MARGIN);
            let y_hi = (height - h - OBSTACLE_EDGE_MARGIN).max(OBSTACLE_EDGE_MARGIN);
            let x = rng.random_range(OBSTACLE_EDGE_MARGIN..=x_hi).round();
            let y = rng.random_range(OBSTACLE_EDGE_MARGIN..=y_hi).round();
            let rect = Rect::new(x, y, w, h);
            if rect.intersects(&safe) {
                continue;
            }
            let spaced = rect.inflate(OBSTACLE_SPACING);
            if obstacles.iter().all(|o| !spaced.intersects(o)) {
                obstacles.push(rect);
            }
        }

        log::debug!("Generated {} obstacles", obstacles.len());
        Self::new(bounds, obstacles)
    }

    pub fn center(&self) -> Vec2 {
        self.bounds.center()
    }

    /// True if the point lies inside any obstacle
    pub fn point_blocked(&self, p: Vec2) -> bool {
        self.obstacles.iter().any(|o| o.contains(p))
    }

    /// True if the point lies inside any obstacle grown by `margin`
    pub fn point_blocked_inflated(&self, p: Vec2, margin: f32) -> bool {
        self.obstacles.iter().any(|o| o.inflate(margin).contains(p))
    }

    /// True if the segment touches no obstacle
    pub fn has_line_of_sight(&self, a: Vec2, b: Vec2) -> bool {
        !self.obstacles.iter().any(|o| o.intersects_segment(a, b))
    }

    /// Inclusive bounds check used for projectile culling
    pub fn in_bounds(&self, p: Vec2) -> bool {
        p.x >= self.bounds.min.x
            && p.x <= self.bounds.max.x
            && p.y >= self.bounds.min.y
            && p.y <= self.bounds.max.y
    }

    /// Clamp a circle inside bounds inset by `inset`
    pub fn clamp_inset(&self, p: Vec2, inset: f32) -> Vec2 {
        self.bounds.clamp_circle(p, inset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_degenerate_obstacle_widened() {
        let arena = Arena::new(
            Rect::new(0.0, 0.0, 100.0, 100.0),
            vec![Rect::new(10.0, 10.0, 0.0, -5.0)],
        );
        let o = arena.obstacles[0];
        assert!(o.width() >= MIN_OBSTACLE_SIZE);
        assert!(o.height() >= MIN_OBSTACLE_SIZE);
    }

    #[test]
    fn test_non_finite_obstacle_dropped() {
        let bad = Rect {
            min: Vec2::new(f32::NAN, 0.0),
            max: Vec2::new(10.0, 10.0),
        };
        let arena = Arena::new(Rect::new(0.0, 0.0, 100.0, 100.0), vec![bad]);
        assert!(arena.obstacles.is_empty());
    }

    #[test]
    fn test_line_of_sight() {
        let arena = Arena::new(
            Rect::new(0.0, 0.0, 500.0, 500.0),
            vec![Rect::new(200.0, 200.0, 100.0, 100.0)],
        );
        assert!(!arena.has_line_of_sight(Vec2::new(100.0, 250.0), Vec2::new(400.0, 250.0)));
        assert!(arena.has_line_of_sight(Vec2::new(100.0, 100.0), Vec2::new(400.0, 100.0)));
        // Diagonal that passes the corner
        assert!(arena.has_line_of_sight(Vec2::new(100.0, 150.0), Vec2::new(150.0, 100.0)));
    }

    #[test]
    fn test_point_blocked() {
        let arena = Arena::new(
            Rect::new(0.0, 0.0, 500.0, 500.0),
            vec![Rect::new(200.0, 200.0, 100.0, 100.0)],
        );
        assert!(arena.point_blocked(Vec2::new(250.0, 250.0)));
        assert!(!arena.point_blocked(Vec2::new(190.0, 250.0)));
        assert!(arena.point_blocked_inflated(Vec2::new(190.0, 250.0), 40.0));
    }

    #[test]
    fn test_generate_keeps_center_clear() {
        let mut rng = Pcg32::seed_from_u64(42);
        let arena = Arena::generate(&mut rng, 3000.0, 3000.0);
        assert!(!arena.obstacles.is_empty());
        let safe = Rect::from_center(arena.center(), SAFE_ZONE);
        for o in &arena.obstacles {
            assert!(!o.intersects(&safe));
            assert!(o.min.x >= OBSTACLE_EDGE_MARGIN);
        }
    }
}
