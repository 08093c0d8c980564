//! Uniform spatial grid over live actors
//!
//! Rebuilt every frame. Used only for local separation and proximity checks,
//! never for choosing a target.

use std::collections::HashMap;

use glam::Vec2;

use super::actor::ActorId;

/// Grid bucketing actors by `floor(pos / cell)`
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell: f32,
    buckets: HashMap<(i32, i32), Vec<(ActorId, Vec2)>>,
}

impl SpatialGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell: cell_size.max(1.0),
            buckets: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell
    }

    pub fn cell_of(&self, pos: Vec2) -> (i32, i32) {
        (
            (pos.x / self.cell).floor() as i32,
            (pos.y / self.cell).floor() as i32,
        )
    }

    /// Re-bucket every entry. Empty buckets are kept for reuse.
    pub fn rebuild(&mut self, entries: impl IntoIterator<Item = (ActorId, Vec2)>) {
        for bucket in self.buckets.values_mut() {
            bucket.clear();
        }
        for (id, pos) in entries {
            let key = self.cell_of(pos);
            self.buckets.entry(key).or_default().push((id, pos));
        }
    }

    /// Entries in the 3x3 block of cells around `pos` (includes the caller
    /// itself if it was inserted)
    pub fn neighbors_of(&self, pos: Vec2, out: &mut Vec<(ActorId, Vec2)>) {
        out.clear();
        let (cx, cy) = self.cell_of(pos);
        for ox in -1..=1 {
            for oy in -1..=1 {
                if let Some(bucket) = self.buckets.get(&(cx + ox, cy + oy)) {
                    out.extend_from_slice(bucket);
                }
            }
        }
    }

    /// Number of bucketed entries
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
