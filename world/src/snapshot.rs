//! Export and restore of persisted map state.

use tacmap_core::{
    Command, EffectState, Event, InstanceFlags, InstanceId, MapSnapshot, ObjectRecord, TileCoord,
    MAP_SIZE, MAX_SMOKE_DURATION,
};
use thiserror::Error;

use crate::{apply, connectivity::active_area, instances::rotated_bounds, World};

/// Captures every persisted object, door and effect in deterministic order.
pub(crate) fn export(world: &World) -> MapSnapshot {
    let mut snapshot = MapSnapshot {
        width: world.width,
        height: world.height,
        ..MapSnapshot::default()
    };
    for (_, instance) in world.instances.iter() {
        if instance.flags.contains(InstanceFlags::NOT_PERSISTED) {
            continue;
        }
        snapshot.objects.push(ObjectRecord {
            catalog: instance.catalog,
            tile: instance.tile,
            rotation: instance.rotation,
            hit_points: instance.hit_points,
            flags: instance.flags,
        });
    }
    snapshot.doors = crate::query::doors(world);
    snapshot.effects = world.effects.active().collect();
    snapshot
}

/// Reasons a snapshot may be rejected before any state is touched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RestoreError {
    /// The recorded play area is empty or larger than the grid.
    #[error("snapshot map size {width}x{height} outside 1..=64")]
    Dimensions {
        /// Recorded width.
        width: u32,
        /// Recorded height.
        height: u32,
    },
    /// An object references a catalog entry the world does not define.
    #[error("object at {tile:?} references undefined catalog entry {index}")]
    UnknownCatalog {
        /// Referenced index.
        index: u8,
        /// Recorded origin tile.
        tile: TileCoord,
    },
    /// An object's footprint does not fit the recorded play area.
    #[error("catalog entry {index} at {tile:?} does not fit the map")]
    ObjectOutOfBounds {
        /// Catalog entry of the object.
        index: u8,
        /// Recorded origin tile.
        tile: TileCoord,
    },
    /// An effect lies outside the recorded play area.
    #[error("effect at {tile:?} lies outside the map")]
    EffectOutOfBounds {
        /// Recorded tile.
        tile: TileCoord,
    },
    /// A smoke duration cannot be encoded.
    #[error("effect at {tile:?} has an invalid smoke duration")]
    InvalidEffect {
        /// Recorded tile.
        tile: TileCoord,
    },
}

/// Replaces the world's contents with the snapshot.
///
/// The snapshot is validated as a whole first; on error the world is left
/// untouched. Automatically spawned lights are regenerated by placement.
pub fn restore(world: &mut World, snapshot: &MapSnapshot, out_events: &mut Vec<Event>) -> Result<(), RestoreError> {
    validate(world, snapshot)?;
    log::debug!(
        "restoring {} objects, {} doors and {} effects",
        snapshot.objects.len(),
        snapshot.doors.len(),
        snapshot.effects.len()
    );

    apply(world, Command::Clear, out_events);
    apply(
        world,
        Command::ConfigureMap {
            width: snapshot.width,
            height: snapshot.height,
        },
        out_events,
    );

    for record in &snapshot.objects {
        if record.flags.contains(InstanceFlags::NOT_PERSISTED) {
            log::warn!("skipping generated object {} at {:?}", record.catalog.get(), record.tile);
            continue;
        }
        apply(
            world,
            Command::PlaceObject {
                catalog: record.catalog,
                tile: record.tile,
                rotation: record.rotation,
                hit_points: Some(record.hit_points.get()),
            },
            out_events,
        );
    }

    // Door records follow identifier order, so doors sharing an origin are
    // matched one record at a time.
    let mut unmatched: Vec<(InstanceId, TileCoord)> = world
        .instances
        .iter()
        .filter(|(_, instance)| instance.flags.contains(InstanceFlags::DOOR))
        .map(|(id, instance)| (id, instance.tile))
        .collect();
    for door in &snapshot.doors {
        match unmatched.iter().position(|(_, tile)| *tile == door.tile) {
            Some(slot) => {
                let (id, _) = unmatched.remove(slot);
                world.set_door_state(id, door.open, out_events);
            }
            None => log::warn!("no door at {:?} to restore", door.tile),
        }
    }

    for effect in &snapshot.effects {
        let _ = world.set_effect(effect.tile, effect.state, out_events);
    }
    Ok(())
}

fn validate(world: &World, snapshot: &MapSnapshot) -> Result<(), RestoreError> {
    let (width, height) = (snapshot.width, snapshot.height);
    if !(1..=MAP_SIZE).contains(&width) || !(1..=MAP_SIZE).contains(&height) {
        return Err(RestoreError::Dimensions { width, height });
    }
    let area = active_area(width, height);

    for record in &snapshot.objects {
        let index = record.catalog.get();
        let Some(entry) = world.catalog.entry(record.catalog) else {
            return Err(RestoreError::UnknownCatalog {
                index,
                tile: record.tile,
            });
        };
        let bounds = rotated_bounds(record.tile, entry.footprint(), record.rotation);
        if !area.contains_rect(&bounds) {
            return Err(RestoreError::ObjectOutOfBounds {
                index,
                tile: record.tile,
            });
        }
    }

    for effect in &snapshot.effects {
        if !area.contains(effect.tile) {
            return Err(RestoreError::EffectOutOfBounds { tile: effect.tile });
        }
        if let EffectState::Smoke(duration) = effect.state {
            if duration == 0 || duration > MAX_SMOKE_DURATION {
                return Err(RestoreError::InvalidEffect { tile: effect.tile });
            }
        }
    }
    Ok(())
}
