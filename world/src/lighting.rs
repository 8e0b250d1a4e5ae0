//! Fog-of-war storage and the three-layer light-map compositor.
//!
//! Layer 0 holds the selected day or night base map, layer 1 adds every point
//! light and burning tile, and layer 2 forces tiles hidden by the fog-of-war
//! bitmap to the ambient colour. All three layers cover the full grid at one
//! pixel per tile. Each layer keeps its own pending rectangle and is
//! regenerated lazily; staleness cascades from a layer to the layers
//! composited from it, never backwards.

use std::ops::{Deref, DerefMut};

use tacmap_core::{
    union_into, EffectState, InstanceFlags, InstanceId, Rgb, Surface, TileBitmap, TileRect, MAP_SIZE,
};

use crate::{
    catalog::Catalog,
    config::WorldConfig,
    instances::{InstanceStore, TileTransform},
    pyro::EffectGrid,
    quadtree::SpatialIndex,
};

const LAYERS: usize = 3;

/// Selects one of the composited light-map surfaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LightLayer {
    /// Day or night base map only.
    Base,
    /// Base map plus point lights and fire.
    Lit,
    /// Lit map with unseen tiles forced to the ambient colour.
    Fogged,
}

impl LightLayer {
    const fn slot(self) -> usize {
        match self {
            Self::Base => 0,
            Self::Lit => 1,
            Self::Fogged => 2,
        }
    }
}

/// Borrowed world state the light maps are composited from.
pub(crate) struct LightSources<'a> {
    pub(crate) catalog: &'a Catalog,
    pub(crate) instances: &'a InstanceStore,
    pub(crate) spatial: &'a SpatialIndex,
    pub(crate) effects: &'a EffectGrid,
    pub(crate) config: &'a WorldConfig,
}

#[derive(Clone, Debug)]
pub(crate) struct LightCompositor {
    day_map: Option<Surface>,
    night_map: Option<Surface>,
    atlas: Option<Surface>,
    day: bool,
    layers: [Surface; LAYERS],
    invalid: [Option<TileRect>; LAYERS],
    fog: TileBitmap,
    generations: [u64; LAYERS],
    scratch: Vec<InstanceId>,
}

impl LightCompositor {
    pub(crate) fn new() -> Self {
        let blank = || Surface::filled(MAP_SIZE, MAP_SIZE, Rgb::BLACK);
        Self {
            day_map: None,
            night_map: None,
            atlas: None,
            day: true,
            layers: [blank(), blank(), blank()],
            invalid: [Some(TileRect::full()); LAYERS],
            fog: TileBitmap::new(),
            generations: [0; LAYERS],
            scratch: Vec::new(),
        }
    }

    /// Marks `from` and every layer composited from it stale over `rect`.
    pub(crate) fn invalidate(&mut self, from: LightLayer, rect: TileRect) {
        for pending in &mut self.invalid[from.slot()..] {
            union_into(pending, rect);
        }
    }

    /// Selects the base map; returns whether the selection changed.
    pub(crate) fn set_day_time(&mut self, day: bool) -> bool {
        if self.day == day {
            return false;
        }
        self.day = day;
        self.invalidate(LightLayer::Base, TileRect::full());
        true
    }

    pub(crate) fn day_time(&self) -> bool {
        self.day
    }

    pub(crate) fn set_base_maps(&mut self, day: Surface, night: Surface) {
        self.day_map = Some(day);
        self.night_map = Some(night);
        self.invalidate(LightLayer::Base, TileRect::full());
    }

    pub(crate) fn set_atlas(&mut self, atlas: Surface) {
        self.atlas = Some(atlas);
        self.invalidate(LightLayer::Lit, TileRect::full());
    }

    pub(crate) fn fog(&self) -> &TileBitmap {
        &self.fog
    }

    /// Union of every layer's pending rectangle, if any.
    pub(crate) fn pending(&self) -> Option<TileRect> {
        let mut union = None;
        for rect in self.invalid.iter().flatten() {
            union_into(&mut union, *rect);
        }
        union
    }

    /// Number of times the layer has been regenerated.
    pub(crate) fn generations(&self, layer: LightLayer) -> u64 {
        self.generations[layer.slot()]
    }

    pub(crate) fn layer(&self, layer: LightLayer) -> &Surface {
        &self.layers[layer.slot()]
    }

    /// Regenerates each stale layer over its pending rectangle, in
    /// composition order.
    pub(crate) fn refresh(&mut self, sources: &LightSources<'_>) {
        if let Some(rect) = self.invalid[0].take() {
            self.generations[0] += 1;
            log::debug!("regenerating base light map over {rect:?}");
            self.compose_base(rect);
        }
        if let Some(rect) = self.invalid[1].take() {
            self.generations[1] += 1;
            log::debug!("regenerating lit light map over {rect:?}");
            self.compose_lit(rect, sources);
        }
        if let Some(rect) = self.invalid[2].take() {
            self.generations[2] += 1;
            log::debug!("regenerating fogged light map over {rect:?}");
            self.compose_fogged(rect, sources.config.fog_ambient);
        }
    }

    fn compose_base(&mut self, rect: TileRect) {
        let base_map = if self.day { &self.day_map } else { &self.night_map };
        for tile in rect.tiles() {
            let base = base_map
                .as_ref()
                .map_or(Some(Rgb::WHITE), |map| map.pixel(tile.x(), tile.y()))
                .unwrap_or(Rgb::WHITE);
            self.layers[0].set_pixel(tile.x(), tile.y(), base);
        }
    }

    fn compose_lit(&mut self, rect: TileRect, sources: &LightSources<'_>) {
        for tile in rect.tiles() {
            let base = self.layers[0].pixel(tile.x(), tile.y()).unwrap_or(Rgb::BLACK);
            let glow = if sources.effects.get(tile) == EffectState::Fire {
                sources.config.fire_glow
            } else {
                Rgb::BLACK
            };
            self.layers[1].set_pixel(tile.x(), tile.y(), base.saturating_add(glow));
        }

        let Some(atlas) = &self.atlas else {
            return;
        };
        self.scratch.clear();
        sources
            .spatial
            .query(rect, InstanceFlags::IS_LIGHT, InstanceFlags::NONE, &mut self.scratch);
        for id in &self.scratch {
            let Some(instance) = sources.instances.get(*id) else {
                continue;
            };
            let entry = sources.catalog.get(instance.catalog);
            let (Some(region), Some(overlap)) = (entry.light_texture(), instance.bounds.intersection(&rect))
            else {
                continue;
            };
            let transform = TileTransform::new(instance.tile, entry.footprint(), instance.rotation);
            for tile in overlap.tiles() {
                let (sx, sy) = transform.sub_cell(tile);
                let light = atlas.pixel(region.x + sx, region.y + sy).unwrap_or(Rgb::BLACK);
                let lit = self.layers[1]
                    .pixel(tile.x(), tile.y())
                    .unwrap_or(Rgb::BLACK)
                    .saturating_add(light);
                self.layers[1].set_pixel(tile.x(), tile.y(), lit);
            }
        }
    }

    fn compose_fogged(&mut self, rect: TileRect, ambient: Rgb) {
        for tile in rect.tiles() {
            let color = if self.fog.get(tile) {
                self.layers[1].pixel(tile.x(), tile.y()).unwrap_or(Rgb::BLACK)
            } else {
                ambient
            };
            self.layers[2].set_pixel(tile.x(), tile.y(), color);
        }
    }
}

/// Exclusive write access to the fog-of-war bitmap.
///
/// A set bit marks a tile as currently visible. Dropping the guard marks the
/// whole fogged layer stale because the compositor does not track which bits
/// were touched. The base and lit layers do not depend on the fog.
#[derive(Debug)]
pub struct FogOfWarGuard<'a> {
    lighting: &'a mut LightCompositor,
}

impl<'a> FogOfWarGuard<'a> {
    pub(crate) fn new(lighting: &'a mut LightCompositor) -> Self {
        Self { lighting }
    }
}

impl Deref for FogOfWarGuard<'_> {
    type Target = TileBitmap;

    fn deref(&self) -> &TileBitmap {
        &self.lighting.fog
    }
}

impl DerefMut for FogOfWarGuard<'_> {
    fn deref_mut(&mut self) -> &mut TileBitmap {
        &mut self.lighting.fog
    }
}

impl Drop for FogOfWarGuard<'_> {
    fn drop(&mut self) {
        self.lighting.invalidate(LightLayer::Fogged, TileRect::full());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tacmap_core::TileCoord;

    fn refresh(compositor: &mut LightCompositor, effects: &EffectGrid, config: &WorldConfig) {
        let catalog = Catalog::new();
        let instances = InstanceStore::new();
        let spatial = SpatialIndex::new();
        compositor.refresh(&LightSources {
            catalog: &catalog,
            instances: &instances,
            spatial: &spatial,
            effects,
            config,
        });
    }

    #[test]
    fn day_and_night_maps_feed_the_base_layer() {
        let config = WorldConfig::default();
        let effects = EffectGrid::new();
        let mut compositor = LightCompositor::new();
        compositor.set_base_maps(
            Surface::filled(MAP_SIZE, MAP_SIZE, Rgb::new(200, 200, 180)),
            Surface::filled(MAP_SIZE, MAP_SIZE, Rgb::new(20, 20, 60)),
        );
        refresh(&mut compositor, &effects, &config);
        assert_eq!(
            compositor.layer(LightLayer::Base).pixel(5, 5),
            Some(Rgb::new(200, 200, 180))
        );

        assert!(compositor.set_day_time(false));
        assert!(!compositor.set_day_time(false));
        refresh(&mut compositor, &effects, &config);
        assert_eq!(compositor.layer(LightLayer::Base).pixel(5, 5), Some(Rgb::new(20, 20, 60)));
        assert_eq!(compositor.generations(LightLayer::Base), 2);
        assert_eq!(compositor.generations(LightLayer::Lit), 2);
    }

    #[test]
    fn fire_glows_and_fog_hides() {
        let config = WorldConfig::default();
        let mut effects = EffectGrid::new();
        let burning = TileCoord::new(3, 3);
        let _ = effects.set(burning, EffectState::Fire);
        let mut compositor = LightCompositor::new();
        compositor.set_base_maps(
            Surface::filled(MAP_SIZE, MAP_SIZE, Rgb::new(10, 10, 10)),
            Surface::filled(MAP_SIZE, MAP_SIZE, Rgb::BLACK),
        );
        {
            let mut fog = FogOfWarGuard::new(&mut compositor);
            fog.set(burning, true);
        }
        refresh(&mut compositor, &effects, &config);

        let lit = Rgb::new(10, 10, 10).saturating_add(config.fire_glow);
        assert_eq!(compositor.layer(LightLayer::Lit).pixel(3, 3), Some(lit));
        assert_eq!(compositor.layer(LightLayer::Fogged).pixel(3, 3), Some(lit));
        assert_eq!(
            compositor.layer(LightLayer::Fogged).pixel(4, 3),
            Some(config.fog_ambient)
        );
        assert!(compositor.pending().is_none());
    }

    #[test]
    fn fog_release_regenerates_only_the_fogged_layer() {
        let config = WorldConfig::default();
        let effects = EffectGrid::new();
        let mut compositor = LightCompositor::new();
        refresh(&mut compositor, &effects, &config);
        let counts = |compositor: &LightCompositor| {
            [LightLayer::Base, LightLayer::Lit, LightLayer::Fogged].map(|layer| compositor.generations(layer))
        };
        assert_eq!(counts(&compositor), [1, 1, 1]);

        {
            let mut fog = FogOfWarGuard::new(&mut compositor);
            fog.set(TileCoord::new(7, 7), true);
        }
        assert_eq!(compositor.pending(), Some(TileRect::full()));
        refresh(&mut compositor, &effects, &config);
        assert_eq!(counts(&compositor), [1, 1, 2]);
        assert_eq!(compositor.layer(LightLayer::Fogged).pixel(7, 7), Some(Rgb::WHITE));

        let _ = compositor.set_day_time(false);
        refresh(&mut compositor, &effects, &config);
        assert_eq!(counts(&compositor), [2, 2, 3]);

        compositor.invalidate(LightLayer::Lit, TileRect::single(TileCoord::new(1, 1)));
        refresh(&mut compositor, &effects, &config);
        assert_eq!(counts(&compositor), [2, 3, 4]);
    }
}
