//! Collision detection and response for circles against rectangles
//!
//! Actors are circles; walls are axis-aligned rectangles. Resolution is
//! positional (push out along the separating axis) with optional velocity
//! damping so actors don't jitter along corners.

use glam::Vec2;

use super::arena::{Arena, Rect};

/// Player and enemy circles may overlap by this much before being separated
pub const PLAYER_OVERLAP_SLOP: f32 = 1.0;

/// Result of a collision check
#[derive(Debug, Clone)]
pub struct CollisionResult {
    /// Whether a collision occurred
    pub hit: bool,
    /// Closest point on the rectangle
    pub point: Vec2,
    /// Direction to push the circle out
    pub normal: Vec2,
    /// Push distance along `normal`
    pub penetration: f32,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: Vec2::ZERO,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Check a circle against a rectangle
///
/// When the center sits inside the rectangle the closest-point normal is
/// zero-length, so the circle leaves through the nearest of the four edges.
pub fn circle_rect_collision(center: Vec2, radius: f32, rect: &Rect) -> CollisionResult {
    let point = rect.closest_point(center);
    let delta = center - point;
    let d2 = delta.length_squared();
    if d2 >= radius * radius {
        return CollisionResult::miss();
    }

    if d2 > 1e-8 {
        let d = d2.sqrt();
        return CollisionResult {
            hit: true,
            point,
            normal: delta / d,
            penetration: radius - d,
        };
    }

    // Center inside the rect: exit through the nearest edge
    let left = center.x - rect.min.x;
    let right = rect.max.x - center.x;
    let top = center.y - rect.min.y;
    let bottom = rect.max.y - center.y;
    let m = left.min(right).min(top).min(bottom);
    let (normal, depth) = if m == left {
        (Vec2::NEG_X, left)
    } else if m == right {
        (Vec2::X, right)
    } else if m == top {
        (Vec2::NEG_Y, top)
    } else {
        (Vec2::Y, bottom)
    };
    CollisionResult {
        hit: true,
        point,
        normal,
        penetration: depth + radius,
    }
}

/// Push a circle out of one rectangle and clamp it to the arena bounds.
/// Returns the corrected center, or `None` if there was no overlap.
pub fn resolve_wall_overlap(center: Vec2, radius: f32, rect: &Rect, bounds: &Rect) -> Option<Vec2> {
    let c = circle_rect_collision(center, radius, rect);
    if !c.hit {
        return None;
    }
    Some(bounds.clamp_circle(center + c.normal * c.penetration, radius))
}

/// Resolve a circle against every obstacle and the arena bounds.
///
/// Velocity is damped by `damping` scaled by how far the circle was moved
/// relative to its radius. Returns true if the circle moved.
pub fn resolve_circle_walls(
    pos: &mut Vec2,
    vel: &mut Vec2,
    radius: f32,
    arena: &Arena,
    damping: f32,
) -> bool {
    let before = *pos;
    for rect in &arena.obstacles {
        if let Some(p) = resolve_wall_overlap(*pos, radius, rect, &arena.bounds) {
            *pos = p;
        }
    }
    *pos = arena.bounds.clamp_circle(*pos, radius);

    let moved = pos.distance(before);
    if moved <= 1e-4 {
        return false;
    }
    let scale = (moved / radius.max(1.0)).min(1.0);
    *vel *= 1.0 - damping.clamp(0.0, 1.0) * scale;
    true
}

/// Reproducible pseudo-random unit normal for an exactly coincident overlap
pub fn stable_normal(pos: Vec2) -> Vec2 {
    let hx = (pos.x.floor() as i64).wrapping_mul(73_856_093);
    let hy = (pos.y.floor() as i64).wrapping_mul(19_349_663);
    let degrees = (hx ^ hy).rem_euclid(360) as f32;
    Vec2::from_angle(degrees.to_radians())
}

/// Push an enemy out of the (immovable) player.
///
/// The velocity component pointing into the player is removed. Returns true
/// if the enemy was moved.
pub fn resolve_player_overlap(
    pos: &mut Vec2,
    vel: &mut Vec2,
    radius: f32,
    player_pos: Vec2,
    player_radius: f32,
    bounds: &Rect,
) -> bool {
    let min_dist = (player_radius + radius - PLAYER_OVERLAP_SLOP).max(0.0);
    let delta = *pos - player_pos;
    let d2 = delta.length_squared();
    if d2 >= min_dist * min_dist {
        return false;
    }

    let normal = if d2 > 1e-8 {
        delta / d2.sqrt()
    } else {
        stable_normal(*pos)
    };
    *pos = player_pos + normal * min_dist;

    let inward = vel.dot(normal);
    if inward < 0.0 {
        *vel -= normal * inward;
    }
    *pos = bounds.clamp_circle(*pos, radius);
    true
}

/// Circle-circle overlap test
#[inline]
pub fn circles_overlap(a: Vec2, ra: f32, b: Vec2, rb: f32) -> bool {
    let r = ra + rb;
    a.distance_squared(b) <= r * r
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Rect {
        Rect::new(0.0, 0.0, 1000.0, 1000.0)
    }

    #[test]
    fn test_circle_pushed_out_of_side() {
        let rect = Rect::new(100.0, 100.0, 100.0, 100.0);
        let out = resolve_wall_overlap(Vec2::new(95.0, 150.0), 10.0, &rect, &bounds()).unwrap();
        assert!((out - Vec2::new(90.0, 150.0)).length() < 1e-4);
    }

    #[test]
    fn test_no_overlap_is_none() {
        let rect = Rect::new(100.0, 100.0, 100.0, 100.0);
        assert!(resolve_wall_overlap(Vec2::new(50.0, 50.0), 10.0, &rect, &bounds()).is_none());
    }

    #[test]
    fn test_center_inside_exits_nearest_edge() {
        let rect = Rect::new(100.0, 100.0, 100.0, 100.0);
        // Nearest edge is the top (y = 100)
        let out = resolve_wall_overlap(Vec2::new(150.0, 105.0), 10.0, &rect, &bounds()).unwrap();
        assert!((out - Vec2::new(150.0, 90.0)).length() < 1e-4);
        assert!(out.is_finite());
    }

    #[test]
    fn test_wall_resolution_clamps_to_bounds() {
        let rect = Rect::new(0.0, 400.0, 30.0, 200.0);
        // Pushing left would leave the arena; the clamp keeps the circle inside
        let out = resolve_wall_overlap(Vec2::new(2.0, 500.0), 10.0, &rect, &bounds()).unwrap();
        assert!(out.x >= 10.0);
    }

    #[test]
    fn test_wall_damping_scales_with_push() {
        let arena = Arena::new(bounds(), vec![Rect::new(100.0, 100.0, 100.0, 100.0)]);
        let mut pos = Vec2::new(95.0, 150.0);
        let mut vel = Vec2::new(100.0, 0.0);
        assert!(resolve_circle_walls(&mut pos, &mut vel, 10.0, &arena, 0.2));
        // Moved 5 of radius 10 => half the damping
        assert!((vel.x - 90.0).abs() < 1e-3);

        let mut free_pos = Vec2::new(500.0, 500.0);
        let mut free_vel = Vec2::new(100.0, 0.0);
        assert!(!resolve_circle_walls(&mut free_pos, &mut free_vel, 10.0, &arena, 0.2));
        assert_eq!(free_vel, Vec2::new(100.0, 0.0));
    }

    #[test]
    fn test_player_overlap_removes_inward_velocity() {
        let mut pos = Vec2::new(110.0, 100.0);
        let mut vel = Vec2::new(-50.0, 20.0);
        assert!(resolve_player_overlap(&mut pos, &mut vel, 14.0, Vec2::new(100.0, 100.0), 16.0, &bounds()));
        assert!((pos.distance(Vec2::new(100.0, 100.0)) - 29.0).abs() < 1e-3);
        assert!(vel.x.abs() < 1e-4);
        assert_eq!(vel.y, 20.0);
    }

    #[test]
    fn test_coincident_overlap_is_reproducible() {
        let player = Vec2::new(300.0, 300.0);
        let mut a = player;
        let mut b = player;
        let mut va = Vec2::ZERO;
        let mut vb = Vec2::ZERO;
        resolve_player_overlap(&mut a, &mut va, 14.0, player, 16.0, &bounds());
        resolve_player_overlap(&mut b, &mut vb, 14.0, player, 16.0, &bounds());
        assert_eq!(a, b);
        assert!(a.is_finite());
        assert!((a.distance(player) - 29.0).abs() < 1e-3);
    }
}
