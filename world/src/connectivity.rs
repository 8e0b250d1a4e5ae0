//! Derived per-tile traversal and visibility masks.

use tacmap_core::{
    union_into, ConnectionKind, ConnectivityMask, Direction, InstanceFlags, InstanceId, TileBitmap,
    TileCoord, TileRect, MAP_SIZE, TILE_COUNT,
};

use crate::{
    catalog::Catalog,
    instances::{InstanceStore, TileTransform},
    quadtree::SpatialIndex,
};

/// Borrowed world state the masks are derived from.
pub(crate) struct MaskSources<'a> {
    pub(crate) catalog: &'a Catalog,
    pub(crate) instances: &'a InstanceStore,
    pub(crate) spatial: &'a SpatialIndex,
    pub(crate) blocks: &'a TileBitmap,
}

/// Memoized connectivity masks with one pending dirty rectangle per kind.
#[derive(Clone, Debug)]
pub(crate) struct ConnectivityCache {
    traversal: Vec<u8>,
    visibility: Vec<u8>,
    dirty_traversal: Option<TileRect>,
    dirty_visibility: Option<TileRect>,
    rebuilds: u64,
    scratch: Vec<InstanceId>,
}

impl ConnectivityCache {
    /// Creates a cache whose every tile is pending a rebuild.
    pub(crate) fn new() -> Self {
        Self {
            traversal: vec![ConnectivityMask::OPEN.bits(); TILE_COUNT],
            visibility: vec![ConnectivityMask::OPEN.bits(); TILE_COUNT],
            dirty_traversal: Some(TileRect::full()),
            dirty_visibility: Some(TileRect::full()),
            rebuilds: 0,
            scratch: Vec::new(),
        }
    }

    /// Marks both kinds stale over `rect`.
    pub(crate) fn invalidate(&mut self, rect: TileRect) {
        union_into(&mut self.dirty_traversal, rect);
        union_into(&mut self.dirty_visibility, rect);
    }

    /// Marks only traversal stale over `rect`.
    pub(crate) fn invalidate_traversal(&mut self, rect: TileRect) {
        union_into(&mut self.dirty_traversal, rect);
    }

    /// Reports whether any rebuild is pending.
    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty_traversal.is_some() || self.dirty_visibility.is_some()
    }

    /// Number of rectangle rebuilds performed so far.
    pub(crate) fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    /// Rebuilds every pending rectangle.
    pub(crate) fn refresh(&mut self, sources: &MaskSources<'_>) {
        if let Some(rect) = self.dirty_traversal.take() {
            self.rebuild(ConnectionKind::Traversal, rect, sources);
        }
        if let Some(rect) = self.dirty_visibility.take() {
            self.rebuild(ConnectionKind::Visibility, rect, sources);
        }
    }

    fn rebuild(&mut self, kind: ConnectionKind, rect: TileRect, sources: &MaskSources<'_>) {
        self.rebuilds += 1;
        log::debug!("rebuilding {kind:?} connectivity over {rect:?} ({} tiles)", rect.area());

        let layer = match kind {
            ConnectionKind::Traversal => &mut self.traversal,
            ConnectionKind::Visibility => &mut self.visibility,
        };
        for tile in rect.tiles() {
            layer[tile.index()] = ConnectivityMask::OPEN.bits();
        }

        self.scratch.clear();
        sources
            .spatial
            .query(rect, InstanceFlags::NONE, InstanceFlags::IS_LIGHT, &mut self.scratch);
        for id in &self.scratch {
            let Some(instance) = sources.instances.get(*id) else {
                continue;
            };
            let entry = sources.catalog.get(instance.catalog);
            let (traversal, visibility) = entry.masks(instance.open);
            let masks = match kind {
                ConnectionKind::Traversal => traversal,
                ConnectionKind::Visibility => visibility,
            };
            let Some(overlap) = instance.bounds.intersection(&rect) else {
                continue;
            };
            let transform = TileTransform::new(instance.tile, entry.footprint(), instance.rotation);
            for tile in overlap.tiles() {
                let (sx, sy) = transform.sub_cell(tile);
                let mask = masks.get(sx, sy).rotated(instance.rotation);
                layer[tile.index()] &= mask.bits();
            }
        }

        if kind == ConnectionKind::Traversal {
            for tile in rect.tiles() {
                if sources.blocks.get(tile) {
                    layer[tile.index()] = ConnectivityMask::CLOSED.bits();
                }
            }
        }
    }

    /// Mask of a tile as of the last rebuild.
    pub(crate) fn mask(&self, kind: ConnectionKind, tile: TileCoord) -> ConnectivityMask {
        let layer = match kind {
            ConnectionKind::Traversal => &self.traversal,
            ConnectionKind::Visibility => &self.visibility,
        };
        ConnectivityMask::from_bits(layer[tile.index()])
    }

    /// Reports whether the edge from `tile` toward `direction` can be crossed
    /// inside a `width` by `height` play area.
    pub(crate) fn connected(
        &self,
        kind: ConnectionKind,
        tile: TileCoord,
        direction: Direction,
        width: u32,
        height: u32,
    ) -> bool {
        let Some(next) = tile.neighbor(direction) else {
            return false;
        };
        if next.x() >= width || next.y() >= height {
            return false;
        }
        self.mask(kind, tile).allows(direction) && self.mask(kind, next).allows(direction.opposite())
    }
}

impl Default for ConnectivityCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Rectangle covering the active play area.
pub(crate) fn active_area(width: u32, height: u32) -> TileRect {
    debug_assert!(width <= MAP_SIZE && height <= MAP_SIZE);
    TileRect::from_origin_and_size(TileCoord::new(0, 0), width, height)
}
