//! Per-tile fire and smoke simulation.

use rand::Rng;
use tacmap_core::{
    union_into, Direction, EffectRecord, EffectState, Event, InstanceId, TileCoord, TileRect,
    MAX_SMOKE_DURATION, TILE_COUNT,
};

use crate::{LightLayer, World};

/// One effect byte per tile: bit 7 fire, bits 0-6 remaining smoke.
#[derive(Clone, Debug)]
pub(crate) struct EffectGrid {
    bytes: Vec<u8>,
}

impl EffectGrid {
    pub(crate) fn new() -> Self {
        Self {
            bytes: vec![0; TILE_COUNT],
        }
    }

    pub(crate) fn get(&self, tile: TileCoord) -> EffectState {
        EffectState::from_byte(self.bytes[tile.index()])
    }

    /// Stores the state and reports whether it differed.
    pub(crate) fn set(&mut self, tile: TileCoord, state: EffectState) -> bool {
        let byte = state.to_byte();
        let slot = &mut self.bytes[tile.index()];
        if *slot == byte {
            return false;
        }
        *slot = byte;
        true
    }

    /// Every tile carrying an effect, in row-major order.
    pub(crate) fn active(&self) -> impl Iterator<Item = EffectRecord> + '_ {
        self.bytes
            .iter()
            .enumerate()
            .filter(|(_, byte)| **byte != 0)
            .map(|(index, byte)| EffectRecord {
                tile: TileCoord::from_index(index),
                state: EffectState::from_byte(*byte),
            })
    }

    pub(crate) fn clear(&mut self) {
        self.bytes.fill(0);
    }
}

impl World {
    /// Changes a tile's effect, emitting [`Event::EffectChanged`] when it
    /// differs. Fire transitions invalidate connectivity and lighting over the
    /// footprints of the tile's occupants.
    pub(crate) fn set_effect(&mut self, tile: TileCoord, state: EffectState, out_events: &mut Vec<Event>) -> bool {
        let previous = self.effects.get(tile);
        if !self.effects.set(tile, state) {
            return false;
        }
        if previous == EffectState::Fire || state == EffectState::Fire {
            let mut footprint = TileRect::single(tile);
            for id in self.occupants(tile) {
                if let Some(instance) = self.instances.get(id) {
                    footprint = footprint.union(&instance.bounds);
                }
            }
            log::trace!("tile {tile:?} fire {previous:?} -> {state:?}");
            self.connectivity.invalidate(footprint);
            self.lighting.invalidate(LightLayer::Lit, footprint);
        }
        out_events.push(Event::EffectChanged { tile, state });
        true
    }

    /// Applies smoke unless fire or longer-lasting smoke is already present.
    pub(crate) fn add_smoke(&mut self, tile: TileCoord, sub_turns: u8, out_events: &mut Vec<Event>) {
        assert!(
            sub_turns > 0 && sub_turns <= MAX_SMOKE_DURATION,
            "smoke duration {sub_turns} outside 1..=127"
        );
        match self.effects.get(tile) {
            EffectState::Fire => {}
            EffectState::Smoke(remaining) if remaining >= sub_turns => {}
            _ => {
                let _ = self.set_effect(tile, EffectState::Smoke(sub_turns), out_events);
            }
        }
    }

    /// Sets every tile of the instance's footprint on fire.
    pub(crate) fn ignite_instance(&mut self, id: InstanceId, out_events: &mut Vec<Event>) {
        let Some(bounds) = self.instances.get(id).map(|instance| instance.bounds) else {
            return;
        };
        log::trace!("instance {} ignites over {bounds:?}", id.get());
        for tile in bounds.tiles() {
            let _ = self.set_effect(tile, EffectState::Fire, out_events);
        }
    }

    /// Rolls whether incendiary damage sets the instance alight.
    pub(crate) fn roll_incendiary(&mut self, id: InstanceId, incendiary: f32, out_events: &mut Vec<Event>) {
        if incendiary <= 0.0 {
            return;
        }
        let flammability = self.flammability(id);
        if flammability == 0 {
            return;
        }
        let chance = (self.config.ignition.probability(flammability)
            * self.config.incendiary_ignition_scale
            * incendiary)
            .clamp(0.0, 1.0);
        if self.rng.gen::<f32>() < chance {
            self.ignite_instance(id, out_events);
        }
    }

    /// Advances every burning or smoking tile by one sub-turn.
    ///
    /// Tiles are visited in row-major order from a snapshot taken before the
    /// step; a tile whose state changed earlier in the same step is skipped,
    /// so freshly ignited fires burn from the next sub-turn on.
    pub(crate) fn advance_sub_turn(&mut self, out_events: &mut Vec<Event>) {
        let first = out_events.len();
        let snapshot: Vec<EffectRecord> = self.effects.active().collect();

        for EffectRecord { tile, state } in snapshot {
            if self.effects.get(tile) != state {
                continue;
            }
            match state {
                EffectState::None => {}
                EffectState::Smoke(remaining) => {
                    let next = if remaining > 1 {
                        EffectState::Smoke(remaining - 1)
                    } else {
                        EffectState::None
                    };
                    let _ = self.set_effect(tile, next, out_events);
                }
                EffectState::Fire => self.burn(tile, out_events),
            }
        }

        let mut changed = None;
        for event in &out_events[first..] {
            match event {
                Event::EffectChanged { tile, .. } => union_into(&mut changed, TileRect::single(*tile)),
                Event::ObjectPlaced { bounds, .. }
                | Event::ObjectRemoved { bounds, .. }
                | Event::ObjectDestroyed { bounds, .. } => union_into(&mut changed, *bounds),
                _ => {}
            }
        }
        log::trace!("sub-turn advanced, changed {changed:?}");
        out_events.push(Event::SubTurnAdvanced { changed });
    }

    fn burn(&mut self, tile: TileCoord, out_events: &mut Vec<Event>) {
        let fire_damage = self.config.fire_damage;
        for id in self.occupants(tile) {
            self.wound(id, fire_damage, out_events);
        }

        for direction in Direction::ALL {
            let Some(next) = tile.neighbor(direction) else {
                continue;
            };
            if !self.in_area(next) || self.effects.get(next) == EffectState::Fire {
                continue;
            }
            for id in self.occupants(next) {
                let flammability = self.flammability(id);
                if flammability == 0 {
                    continue;
                }
                let chance = self.config.ignition.probability(flammability);
                if self.rng.gen::<f32>() < chance {
                    self.ignite_instance(id, out_events);
                    break;
                }
            }
        }

        let fueled = self
            .occupants(tile)
            .into_iter()
            .any(|id| self.flammability(id) > 0);
        if !fueled {
            let smoke = EffectState::Smoke(self.config.smoke_after_fire);
            let _ = self.set_effect(tile, smoke, out_events);
        }
    }
}
