//! Live object instances and the footprint transform shared by placement and
//! connectivity derivation.

use std::collections::BTreeMap;

use tacmap_core::{CatalogIndex, Health, InstanceFlags, InstanceId, Rotation, TileCoord, TileRect};

use crate::catalog::Footprint;

/// A placed object.
#[derive(Clone, Debug)]
pub(crate) struct Instance {
    pub(crate) catalog: CatalogIndex,
    /// Upper-left tile of the rotated footprint.
    pub(crate) tile: TileCoord,
    pub(crate) rotation: Rotation,
    pub(crate) hit_points: Health,
    pub(crate) flags: InstanceFlags,
    /// Door state; always `false` for non-doors.
    pub(crate) open: bool,
    pub(crate) bounds: TileRect,
    /// Light spawned alongside this instance.
    pub(crate) light: Option<InstanceId>,
    /// Instance that spawned this light.
    pub(crate) owner: Option<InstanceId>,
    /// Entry this rubble was left behind by.
    pub(crate) remains_of: Option<CatalogIndex>,
    /// Spatial index node holding the instance.
    pub(crate) node: usize,
}

/// Registry that owns every instance and allocates identifiers.
#[derive(Debug)]
pub(crate) struct InstanceStore {
    entries: BTreeMap<InstanceId, Instance>,
    next_instance_id: InstanceId,
}

impl InstanceStore {
    /// Creates an empty store with a reset identifier counter.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_instance_id: InstanceId::new(0),
        }
    }

    /// Stores the instance under a freshly allocated identifier.
    pub(crate) fn insert(&mut self, instance: Instance) -> InstanceId {
        let id = self.next_instance_id;
        self.next_instance_id = InstanceId::new(id.get().wrapping_add(1));
        let _ = self.entries.insert(id, instance);
        id
    }

    pub(crate) fn get(&self, id: InstanceId) -> Option<&Instance> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: InstanceId) -> Option<&mut Instance> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: InstanceId) -> Option<Instance> {
        self.entries.remove(&id)
    }

    /// Iterates instances in identifier order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (InstanceId, &Instance)> {
        self.entries.iter().map(|(id, instance)| (*id, instance))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drops every instance. Identifier allocation restarts at zero.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
        self.next_instance_id = InstanceId::new(0);
    }
}

/// Tiles covered by a footprint anchored at `origin` after rotation.
pub(crate) fn rotated_bounds(origin: TileCoord, footprint: Footprint, rotation: Rotation) -> TileRect {
    let (width, height) = if rotation.swaps_axes() {
        (footprint.height(), footprint.width())
    } else {
        (footprint.width(), footprint.height())
    };
    TileRect::from_origin_and_size(origin, width, height)
}

/// Maps world tiles inside a rotated footprint back to unrotated sub-cells.
///
/// With `(dx, dy)` the offset from the footprint origin, the sub-cell is
/// `(a*dx + b*dy + tx, c*dx + d*dy + ty)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TileTransform {
    origin: TileCoord,
    a: i32,
    b: i32,
    c: i32,
    d: i32,
    tx: i32,
    ty: i32,
}

impl TileTransform {
    pub(crate) fn new(origin: TileCoord, footprint: Footprint, rotation: Rotation) -> Self {
        let cx = footprint.width() as i32;
        let cy = footprint.height() as i32;
        let (a, b, c, d, tx, ty) = match rotation {
            Rotation::Deg0 => (1, 0, 0, 1, 0, 0),
            Rotation::Deg90 => (0, 1, -1, 0, 0, cy - 1),
            Rotation::Deg180 => (-1, 0, 0, -1, cx - 1, cy - 1),
            Rotation::Deg270 => (0, -1, 1, 0, cx - 1, 0),
        };
        Self {
            origin,
            a,
            b,
            c,
            d,
            tx,
            ty,
        }
    }

    /// Sub-cell of the unrotated footprint that lands on `tile`.
    pub(crate) fn sub_cell(&self, tile: TileCoord) -> (u32, u32) {
        let dx = tile.x() as i32 - self.origin.x() as i32;
        let dy = tile.y() as i32 - self.origin.y() as i32;
        let sx = self.a * dx + self.b * dy + self.tx;
        let sy = self.c * dx + self.d * dy + self.ty;
        assert!(sx >= 0 && sy >= 0, "tile {tile:?} outside footprint at {:?}", self.origin);
        (sx as u32, sy as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance_at(tile: TileCoord) -> Instance {
        Instance {
            catalog: CatalogIndex::new(1).expect("nonzero"),
            tile,
            rotation: Rotation::Deg0,
            hit_points: Health::INDESTRUCTIBLE,
            flags: InstanceFlags::NONE,
            open: false,
            bounds: TileRect::single(tile),
            light: None,
            owner: None,
            remains_of: None,
            node: 0,
        }
    }

    #[test]
    fn store_allocates_increasing_identifiers() {
        let mut store = InstanceStore::new();
        let first = store.insert(instance_at(TileCoord::new(0, 0)));
        let second = store.insert(instance_at(TileCoord::new(1, 0)));
        assert_eq!(first, InstanceId::new(0));
        assert_eq!(second, InstanceId::new(1));

        assert!(store.remove(first).is_some());
        assert!(store.remove(first).is_none());
        let third = store.insert(instance_at(TileCoord::new(2, 0)));
        assert_eq!(third, InstanceId::new(2));
        assert_eq!(store.len(), 2);

        store.clear();
        assert_eq!(store.insert(instance_at(TileCoord::new(3, 0))), InstanceId::new(0));
    }

    #[test]
    fn rotation_swaps_bounds_for_quarter_turns() {
        let footprint = Footprint::new(3, 1);
        let origin = TileCoord::new(10, 10);
        assert_eq!(rotated_bounds(origin, footprint, Rotation::Deg0).width(), 3);
        let turned = rotated_bounds(origin, footprint, Rotation::Deg90);
        assert_eq!((turned.width(), turned.height()), (1, 3));
        assert_eq!(turned.max(), TileCoord::new(10, 12));
    }

    #[test]
    fn transform_inverts_every_rotation() {
        let footprint = Footprint::new(3, 2);
        let origin = TileCoord::new(5, 5);

        let identity = TileTransform::new(origin, footprint, Rotation::Deg0);
        assert_eq!(identity.sub_cell(TileCoord::new(7, 6)), (2, 1));

        // Clockwise quarter turn: sub-cell (0, 0) lands at the top right.
        let quarter = TileTransform::new(origin, footprint, Rotation::Deg90);
        assert_eq!(quarter.sub_cell(TileCoord::new(6, 5)), (0, 0));
        assert_eq!(quarter.sub_cell(TileCoord::new(5, 7)), (2, 1));

        let half = TileTransform::new(origin, footprint, Rotation::Deg180);
        assert_eq!(half.sub_cell(TileCoord::new(7, 6)), (0, 0));
        assert_eq!(half.sub_cell(TileCoord::new(5, 5)), (2, 1));

        let three_quarters = TileTransform::new(origin, footprint, Rotation::Deg270);
        assert_eq!(three_quarters.sub_cell(TileCoord::new(5, 7)), (0, 0));
        assert_eq!(three_quarters.sub_cell(TileCoord::new(6, 5)), (2, 1));
    }
}
