//! Hierarchical spatial index over the 64×64 grid.
//!
//! Nodes are never allocated dynamically: a node is identified purely by its
//! depth and normalized coordinate, and the five depths are laid out back to
//! back in a single arena (1 + 4 + 16 + 64 + 256 = 341 nodes). Each instance
//! lives in the deepest node whose square fully contains its bounds, so a
//! region query never reports the same instance twice.

use tacmap_core::{InstanceFlags, InstanceId, ModelKey, TileCoord, TileRect, LOG2_MAP_SIZE, MAP_SIZE};

/// Number of quadtree depths; depth 0 covers the whole grid.
pub(crate) const QUAD_DEPTH: usize = 5;

/// Arena offset of the first node at each depth, plus the total node count.
const DEPTH_BASE: [usize; QUAD_DEPTH + 1] = [0, 1, 5, 21, 85, 341];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SpatialEntry {
    id: InstanceId,
    bounds: TileRect,
    flags: InstanceFlags,
    model: Option<ModelKey>,
}

/// Fixed arena of quadtree nodes, each holding the instances it owns.
#[derive(Clone, Debug)]
pub(crate) struct SpatialIndex {
    nodes: Vec<Vec<SpatialEntry>>,
}

impl SpatialIndex {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![Vec::new(); DEPTH_BASE[QUAD_DEPTH]],
        }
    }

    /// Links the instance into the deepest node containing `bounds` and
    /// returns that node.
    pub(crate) fn insert(&mut self, id: InstanceId, bounds: TileRect, flags: InstanceFlags) -> usize {
        assert!(
            TileRect::full().contains_rect(&bounds),
            "instance bounds {bounds:?} exceed the grid"
        );
        let node = node_for(bounds);
        self.nodes[node].push(SpatialEntry {
            id,
            bounds,
            flags,
            model: None,
        });
        node
    }

    /// Unlinks the instance from the node it was inserted into.
    pub(crate) fn remove(&mut self, id: InstanceId, node: usize) {
        let entries = &mut self.nodes[node];
        if let Some(position) = entries.iter().position(|entry| entry.id == id) {
            let _ = entries.remove(position);
        }
    }

    /// Associates a renderer model with the instance for reverse lookups.
    pub(crate) fn attach_model(&mut self, id: InstanceId, node: usize, model: ModelKey) {
        if let Some(entry) = self.nodes[node].iter_mut().find(|entry| entry.id == id) {
            entry.model = Some(model);
        }
    }

    /// Appends every instance intersecting `region` whose flags include all of
    /// `required` and none of `excluded`.
    pub(crate) fn query(
        &self,
        region: TileRect,
        required: InstanceFlags,
        excluded: InstanceFlags,
        out: &mut Vec<InstanceId>,
    ) {
        self.visit(0, 0, 0, &region, required, excluded, out);
    }

    /// Point form of [`SpatialIndex::query`].
    pub(crate) fn query_point(
        &self,
        tile: TileCoord,
        required: InstanceFlags,
        excluded: InstanceFlags,
        out: &mut Vec<InstanceId>,
    ) {
        self.query(TileRect::single(tile), required, excluded, out);
    }

    /// Instance carrying the renderer model, if any.
    pub(crate) fn find_model(&self, model: ModelKey) -> Option<InstanceId> {
        self.nodes
            .iter()
            .flatten()
            .find(|entry| entry.model == Some(model))
            .map(|entry| entry.id)
    }

    pub(crate) fn clear(&mut self) {
        for node in &mut self.nodes {
            node.clear();
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn visit(
        &self,
        depth: usize,
        nx: u32,
        ny: u32,
        region: &TileRect,
        required: InstanceFlags,
        excluded: InstanceFlags,
        out: &mut Vec<InstanceId>,
    ) {
        if !node_rect(depth, nx, ny).intersects(region) {
            return;
        }
        let index = DEPTH_BASE[depth] + (ny << depth) as usize + nx as usize;
        out.extend(
            self.nodes[index]
                .iter()
                .filter(|entry| entry.bounds.intersects(region) && entry.flags.matches(required, excluded))
                .map(|entry| entry.id),
        );
        if depth + 1 < QUAD_DEPTH {
            for (cx, cy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                self.visit(depth + 1, nx * 2 + cx, ny * 2 + cy, region, required, excluded, out);
            }
        }
    }
}

/// Side length in tiles of a node at `depth`.
const fn node_size(depth: usize) -> u32 {
    MAP_SIZE >> depth
}

fn node_rect(depth: usize, nx: u32, ny: u32) -> TileRect {
    let size = node_size(depth);
    TileRect::from_origin_and_size(TileCoord::new(nx * size, ny * size), size, size)
}

/// Deepest node whose square fully contains `bounds`.
fn node_for(bounds: TileRect) -> usize {
    for depth in (0..QUAD_DEPTH).rev() {
        let shift = LOG2_MAP_SIZE - depth as u32;
        let (min, max) = (bounds.min(), bounds.max());
        let nx = min.x() >> shift;
        let ny = min.y() >> shift;
        if nx == max.x() >> shift && ny == max.y() >> shift {
            return DEPTH_BASE[depth] + (ny << depth) as usize + nx as usize;
        }
    }
    0
}
