#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative tile world for the tactical battle map.
//!
//! The [`World`] owns every placed object, the spatial index over them, the
//! derived connectivity masks, the fire/smoke grid and the light maps. It is
//! mutated only through [`apply`], which reports what changed as
//! [`Event`] values, and read through the [`query`] module. Derived caches are
//! rebuilt lazily: queries that depend on them take `&mut World` and refresh
//! whatever is stale before answering.

mod catalog;
mod config;
mod connectivity;
mod graph;
mod instances;
mod lighting;
mod pyro;
mod quadtree;
mod snapshot;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tacmap_core::{
    CatalogIndex, Command, Damage, EffectState, Event, Health, InstanceFlags, InstanceId, Rotation, TileBitmap,
    TileCoord, TileRect, MAP_SIZE,
};
use tacmap_pather::Pather;

pub use catalog::{
    Catalog, CatalogEntry, CatalogError, Footprint, LightAttachment, ModelNames, SubCellMasks,
    TextureRegion,
};
pub use config::{ConfigError, IgnitionCurve, WorldConfig};
pub use graph::{PathBlocker, TileVertex};
pub use lighting::{FogOfWarGuard, LightLayer};
pub use snapshot::{restore, RestoreError};

use connectivity::{active_area, ConnectivityCache, MaskSources};
use instances::{rotated_bounds, Instance, InstanceStore};
use lighting::{LightCompositor, LightSources};
use pyro::EffectGrid;
use quadtree::SpatialIndex;

/// Represents the authoritative tile world.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    catalog: Catalog,
    width: u32,
    height: u32,
    instances: InstanceStore,
    spatial: SpatialIndex,
    connectivity: ConnectivityCache,
    path_blocks: TileBitmap,
    effects: EffectGrid,
    lighting: LightCompositor,
    rng: ChaCha8Rng,
    pather: Pather<TileVertex>,
}

impl World {
    /// Creates an empty full-size world over the provided catalog.
    ///
    /// The catalog is expected to have passed [`Catalog::validate`]. A config
    /// rejected by [`WorldConfig::validate`] is a programming error.
    #[must_use]
    pub fn new(catalog: Catalog, config: WorldConfig) -> Self {
        if let Err(error) = config.validate() {
            panic!("invalid world config: {error}");
        }
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let pather = Pather::new(config.solver_node_budget);
        Self {
            config,
            catalog,
            width: MAP_SIZE,
            height: MAP_SIZE,
            instances: InstanceStore::new(),
            spatial: SpatialIndex::new(),
            connectivity: ConnectivityCache::new(),
            path_blocks: TileBitmap::new(),
            effects: EffectGrid::new(),
            lighting: LightCompositor::new(),
            rng,
            pather,
        }
    }

    fn area(&self) -> TileRect {
        active_area(self.width, self.height)
    }

    fn in_area(&self, tile: TileCoord) -> bool {
        tile.x() < self.width && tile.y() < self.height
    }

    fn assert_in_area(&self, tile: TileCoord) {
        assert!(
            self.in_area(tile),
            "tile {tile:?} outside the {}x{} map",
            self.width,
            self.height
        );
    }

    /// Non-light instances covering the tile.
    fn occupants(&self, tile: TileCoord) -> Vec<InstanceId> {
        let mut found = Vec::new();
        self.spatial
            .query_point(tile, InstanceFlags::NONE, InstanceFlags::IS_LIGHT, &mut found);
        found
    }

    fn flammability(&self, id: InstanceId) -> u8 {
        self.instances
            .get(id)
            .map_or(0, |instance| self.catalog.get(instance.catalog).flammability())
    }

    fn invalidate_for(&mut self, flags: InstanceFlags, bounds: TileRect) {
        if flags.contains(InstanceFlags::IS_LIGHT) {
            self.lighting.invalidate(LightLayer::Lit, bounds);
        } else {
            self.connectivity.invalidate(bounds);
        }
    }

    fn place(
        &mut self,
        catalog: CatalogIndex,
        tile: TileCoord,
        rotation: Rotation,
        hit_points: Option<u16>,
        out_events: &mut Vec<Event>,
    ) -> Option<InstanceId> {
        let entry = self.catalog.get(catalog);
        let (footprint, default_hit_points) = (entry.footprint(), entry.hit_points());
        let (rubble, light) = (entry.rubble(), entry.light());
        let (is_door, is_light) = (entry.is_door(), entry.is_light());
        if hit_points == Some(0) {
            let remains = self.place(rubble?, tile, rotation, None, out_events)?;
            if let Some(instance) = self.instances.get_mut(remains) {
                instance.remains_of = Some(catalog);
            }
            return Some(remains);
        }

        let bounds = rotated_bounds(tile, footprint, rotation);
        assert!(
            self.area().contains_rect(&bounds),
            "catalog entry {} at {tile:?} exceeds the {}x{} map",
            catalog.get(),
            self.width,
            self.height
        );
        let mut flags = InstanceFlags::NONE;
        if is_door {
            flags = flags.union(InstanceFlags::DOOR);
        }
        if is_light {
            flags = flags.union(InstanceFlags::IS_LIGHT);
        }
        let hit_points = hit_points.map_or(default_hit_points, Health::new);

        let id = self.spawn(
            Instance {
                catalog,
                tile,
                rotation,
                hit_points,
                flags,
                open: false,
                bounds,
                light: None,
                owner: None,
                remains_of: None,
                node: 0,
            },
            out_events,
        );

        if let Some(attachment) = light {
            self.attach_light(id, tile, attachment, out_events);
        }
        Some(id)
    }

    fn spawn(&mut self, instance: Instance, out_events: &mut Vec<Event>) -> InstanceId {
        let (catalog, bounds, flags) = (instance.catalog, instance.bounds, instance.flags);
        let id = self.instances.insert(instance);
        let node = self.spatial.insert(id, bounds, flags);
        if let Some(instance) = self.instances.get_mut(id) {
            instance.node = node;
        }
        self.invalidate_for(flags, bounds);
        out_events.push(Event::ObjectPlaced {
            instance: id,
            catalog,
            bounds,
        });
        id
    }

    fn attach_light(
        &mut self,
        owner: InstanceId,
        owner_tile: TileCoord,
        attachment: LightAttachment,
        out_events: &mut Vec<Event>,
    ) {
        let entry = self.catalog.get(attachment.entry);
        let (footprint, hit_points) = (entry.footprint(), entry.hit_points());
        let Some(origin) = owner_tile.offset(attachment.offset_x.into(), attachment.offset_y.into()) else {
            log::debug!("light for instance {} falls off the grid", owner.get());
            return;
        };
        let bounds = rotated_bounds(origin, footprint, Rotation::Deg0);
        if !self.area().contains_rect(&bounds) {
            log::debug!("light for instance {} falls outside the map at {bounds:?}", owner.get());
            return;
        }

        let light = self.spawn(
            Instance {
                catalog: attachment.entry,
                tile: origin,
                rotation: Rotation::Deg0,
                hit_points,
                flags: InstanceFlags::IS_LIGHT.union(InstanceFlags::NOT_PERSISTED),
                open: false,
                bounds,
                light: None,
                owner: Some(owner),
                remains_of: None,
                node: 0,
            },
            out_events,
        );
        if let Some(instance) = self.instances.get_mut(owner) {
            instance.light = Some(light);
        }
    }

    /// Unlinks the instance and any light it owns.
    fn remove_instance(
        &mut self,
        id: InstanceId,
        destroyed: bool,
        out_events: &mut Vec<Event>,
    ) -> Option<Instance> {
        let instance = self.instances.remove(id)?;
        self.spatial.remove(id, instance.node);
        self.invalidate_for(instance.flags, instance.bounds);
        out_events.push(if destroyed {
            Event::ObjectDestroyed {
                instance: id,
                bounds: instance.bounds,
            }
        } else {
            Event::ObjectRemoved {
                instance: id,
                bounds: instance.bounds,
            }
        });

        if let Some(light) = instance.light {
            let _ = self.remove_instance(light, false, out_events);
        }
        if let Some(owner) = instance.owner.and_then(|owner| self.instances.get_mut(owner)) {
            owner.light = None;
        }
        Some(instance)
    }

    fn damage_instance(&mut self, id: InstanceId, damage: Damage, out_events: &mut Vec<Event>) {
        if self.instances.get(id).is_none() {
            return;
        }
        self.roll_incendiary(id, damage.incendiary, out_events);
        self.wound(id, damage.total(), out_events);
    }

    /// Removes hit points, destroying the instance when none remain.
    fn wound(&mut self, id: InstanceId, amount: u16, out_events: &mut Vec<Event>) {
        let Some(instance) = self.instances.get_mut(id) else {
            return;
        };
        if amount == 0 || instance.hit_points.is_indestructible() {
            return;
        }
        instance.hit_points = instance.hit_points.damaged(amount);
        let hit_points = instance.hit_points;
        if hit_points.is_depleted() {
            self.destroy(id, out_events);
        } else {
            out_events.push(Event::ObjectDamaged {
                instance: id,
                hit_points: hit_points.get(),
            });
        }
    }

    fn destroy(&mut self, id: InstanceId, out_events: &mut Vec<Event>) {
        let Some(instance) = self.remove_instance(id, true, out_events) else {
            return;
        };
        let Some(rubble) = self.catalog.get(instance.catalog).rubble() else {
            return;
        };
        let Some(footprint) = self.catalog.entry(rubble).map(CatalogEntry::footprint) else {
            log::warn!("rubble entry {} is not defined", rubble.get());
            return;
        };
        let bounds = rotated_bounds(instance.tile, footprint, instance.rotation);
        if !self.area().contains_rect(&bounds) {
            log::warn!("rubble entry {} does not fit at {:?}", rubble.get(), instance.tile);
            return;
        }
        let remains = self.place(rubble, instance.tile, instance.rotation, None, out_events);
        if let Some(remains) = remains.and_then(|remains| self.instances.get_mut(remains)) {
            remains.remains_of = Some(instance.catalog);
        }
    }

    fn set_door_state(&mut self, id: InstanceId, open: bool, out_events: &mut Vec<Event>) {
        let Some(instance) = self.instances.get_mut(id) else {
            return;
        };
        if !instance.flags.contains(InstanceFlags::DOOR) || instance.open == open {
            return;
        }
        instance.open = open;
        let bounds = instance.bounds;
        self.connectivity.invalidate(bounds);
        out_events.push(Event::DoorChanged { instance: id, open });
    }

    fn configure(&mut self, width: u32, height: u32, out_events: &mut Vec<Event>) {
        assert!(
            (1..=MAP_SIZE).contains(&width) && (1..=MAP_SIZE).contains(&height),
            "map size {width}x{height} outside 1..=64"
        );
        if (width, height) == (self.width, self.height) {
            return;
        }
        self.width = width;
        self.height = height;

        let area = self.area();
        let outside: Vec<InstanceId> = self
            .instances
            .iter()
            .filter(|(_, instance)| !area.contains_rect(&instance.bounds))
            .map(|(id, _)| id)
            .collect();
        for id in outside {
            let _ = self.remove_instance(id, false, out_events);
        }
        let stranded: Vec<TileCoord> = self
            .effects
            .active()
            .map(|record| record.tile)
            .filter(|tile| !area.contains(*tile))
            .collect();
        for tile in stranded {
            let _ = self.set_effect(tile, EffectState::None, out_events);
        }

        self.connectivity.invalidate(TileRect::full());
        self.lighting.invalidate(LightLayer::Lit, TileRect::full());
        out_events.push(Event::MapConfigured { width, height });
    }

    fn clear(&mut self, out_events: &mut Vec<Event>) {
        self.instances.clear();
        self.spatial.clear();
        self.effects.clear();
        self.path_blocks.clear_all();
        self.connectivity.invalidate(TileRect::full());
        self.lighting.invalidate(LightLayer::Lit, TileRect::full());
        out_events.push(Event::MapCleared);
    }

    fn refresh_connectivity(&mut self) {
        if !self.connectivity.is_dirty() {
            return;
        }
        self.connectivity.refresh(&MaskSources {
            catalog: &self.catalog,
            instances: &self.instances,
            spatial: &self.spatial,
            blocks: &self.path_blocks,
        });
    }

    fn refresh_lighting(&mut self) {
        self.lighting.refresh(&LightSources {
            catalog: &self.catalog,
            instances: &self.instances,
            spatial: &self.spatial,
            effects: &self.effects,
            config: &self.config,
        });
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureMap { width, height } => world.configure(width, height, out_events),
        Command::Clear => world.clear(out_events),
        Command::PlaceObject {
            catalog,
            tile,
            rotation,
            hit_points,
        } => {
            let _ = world.place(catalog, tile, rotation, hit_points, out_events);
        }
        Command::RemoveObject { instance } => {
            let _ = world.remove_instance(instance, false, out_events);
        }
        Command::DeleteAt { tile } => {
            world.assert_in_area(tile);
            for id in world.occupants(tile) {
                let _ = world.remove_instance(id, false, out_events);
            }
        }
        Command::SetDoor { tile, open } => {
            world.assert_in_area(tile);
            let mut doors = Vec::new();
            world
                .spatial
                .query_point(tile, InstanceFlags::DOOR, InstanceFlags::NONE, &mut doors);
            for id in doors {
                world.set_door_state(id, open, out_events);
            }
        }
        Command::AttachModel { instance, model } => {
            if let Some(node) = world.instances.get(instance).map(|instance| instance.node) {
                world.spatial.attach_model(instance, node, model);
            }
        }
        Command::DamageTile { tile, damage } => {
            world.assert_in_area(tile);
            for id in world.occupants(tile) {
                world.damage_instance(id, damage, out_events);
            }
        }
        Command::DamageObject { instance, damage } => {
            world.damage_instance(instance, damage, out_events);
        }
        Command::DamageModel { model, damage } => {
            if let Some(id) = world.spatial.find_model(model) {
                world.damage_instance(id, damage, out_events);
            }
        }
        Command::AddSmoke { tile, sub_turns } => {
            world.assert_in_area(tile);
            world.add_smoke(tile, sub_turns, out_events);
        }
        Command::Ignite { tile } => {
            world.assert_in_area(tile);
            let _ = world.set_effect(tile, EffectState::Fire, out_events);
        }
        Command::ClearEffect { tile } => {
            world.assert_in_area(tile);
            let _ = world.set_effect(tile, EffectState::None, out_events);
        }
        Command::AdvanceSubTurn => world.advance_sub_turn(out_events),
        Command::SetPathBlocks { blocks } => {
            if *blocks != world.path_blocks {
                world.path_blocks = *blocks;
                world.connectivity.invalidate_traversal(TileRect::full());
                out_events.push(Event::PathBlocksChanged);
            }
        }
        Command::ClearPathBlocks => {
            if world.path_blocks.count() > 0 {
                world.path_blocks.clear_all();
                world.connectivity.invalidate_traversal(TileRect::full());
                out_events.push(Event::PathBlocksChanged);
            }
        }
        Command::SetDayTime { day } => {
            if world.lighting.set_day_time(day) {
                out_events.push(Event::DayTimeChanged { day });
            }
        }
        Command::SetLightMaps { day, night } => world.lighting.set_base_maps(day, night),
        Command::SetLightAtlas { atlas } => world.lighting.set_atlas(atlas),
    }
}

/// Grants exclusive write access to the fog-of-war bitmap.
///
/// The light maps are marked stale when the guard is dropped.
pub fn lock_fog_of_war(world: &mut World) -> FogOfWarGuard<'_> {
    FogOfWarGuard::new(&mut world.lighting)
}

/// Pulls a fresh blocker bitmap from the collaborator and applies it.
///
/// Nothing is invalidated when the bitmap matches the current one.
pub fn sync_path_blocks<B>(world: &mut World, blocker: &B, mover: Option<u64>, out_events: &mut Vec<Event>)
where
    B: PathBlocker + ?Sized,
{
    let mut blocks = Box::new(TileBitmap::new());
    blocker.write_blocks(mover, &mut blocks);
    apply(world, Command::SetPathBlocks { blocks }, out_events);
}

/// Query functions that provide access to the world state.
///
/// Functions taking `&mut World` refresh stale derived caches first; they
/// never change observable state.
pub mod query {
    use tacmap_core::{
        CatalogIndex, ConnectionKind, ConnectivityMask, DoorRecord, EffectRecord, EffectState, Health,
        InstanceFlags, InstanceId, MapSnapshot, ModelKey, PathOutcome, ReachableTile, Rotation,
        Surface, TileBitmap, TileCoord, TileRect,
    };
    use tacmap_pather::{SolveOutcome, StateCost};

    use super::{
        graph::{self, TileGraph},
        snapshot, Catalog, LightLayer, TileVertex, World,
    };

    /// Read-only description of a placed object.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ObjectSnapshot {
        /// Identifier of the instance.
        pub id: InstanceId,
        /// Catalog entry describing the object.
        pub catalog: CatalogIndex,
        /// Upper-left tile of the rotated footprint.
        pub tile: TileCoord,
        /// Orientation of the object.
        pub rotation: Rotation,
        /// Remaining hit points.
        pub hit_points: Health,
        /// Flag bits.
        pub flags: InstanceFlags,
        /// Door state; `false` for non-doors.
        pub open: bool,
        /// Tiles covered.
        pub bounds: TileRect,
        /// Light spawned alongside the object.
        pub light: Option<InstanceId>,
        /// Object that spawned this light.
        pub owner: Option<InstanceId>,
    }

    /// Active play area as `(width, height)`.
    #[must_use]
    pub fn dimensions(world: &World) -> (u32, u32) {
        (world.width, world.height)
    }

    /// Catalog the world was created with.
    #[must_use]
    pub fn catalog(world: &World) -> &Catalog {
        &world.catalog
    }

    /// Describes the identified instance.
    #[must_use]
    pub fn object(world: &World, id: InstanceId) -> Option<ObjectSnapshot> {
        world.instances.get(id).map(|instance| ObjectSnapshot {
            id,
            catalog: instance.catalog,
            tile: instance.tile,
            rotation: instance.rotation,
            hit_points: instance.hit_points,
            flags: instance.flags,
            open: instance.open,
            bounds: instance.bounds,
            light: instance.light,
            owner: instance.owner,
        })
    }

    /// Number of live instances, lights included.
    #[must_use]
    pub fn object_count(world: &World) -> usize {
        world.instances.len()
    }

    /// Instances intersecting `region` whose flags include every `required`
    /// bit and no `excluded` bit.
    #[must_use]
    pub fn objects_in(
        world: &World,
        region: TileRect,
        required: InstanceFlags,
        excluded: InstanceFlags,
    ) -> Vec<InstanceId> {
        let mut found = Vec::new();
        world.spatial.query(region, required, excluded, &mut found);
        found
    }

    /// Point form of [`objects_in`].
    #[must_use]
    pub fn objects_at(
        world: &World,
        tile: TileCoord,
        required: InstanceFlags,
        excluded: InstanceFlags,
    ) -> Vec<InstanceId> {
        let mut found = Vec::new();
        world.spatial.query_point(tile, required, excluded, &mut found);
        found
    }

    /// Instance the renderer attached the model to.
    #[must_use]
    pub fn instance_for_model(world: &World, model: ModelKey) -> Option<InstanceId> {
        world.spatial.find_model(model)
    }

    /// Catalog model name matching the instance's current door state.
    ///
    /// Rubble reports the destroyed model of the object it replaced, when that
    /// object names one.
    #[must_use]
    pub fn model_name(world: &World, id: InstanceId) -> Option<&str> {
        let instance = world.instances.get(id)?;
        if let Some(source) = instance.remains_of {
            let destroyed = world.catalog.get(source).models().destroyed.as_ref();
            if let Some(name) = destroyed {
                return Some(name.as_str());
            }
        }
        let models = world.catalog.get(instance.catalog).models();
        let name = if instance.open {
            models.open.as_ref().or(models.closed.as_ref())
        } else {
            models.closed.as_ref()
        };
        name.map(String::as_str)
    }

    /// Every door with its state, in identifier order.
    #[must_use]
    pub fn doors(world: &World) -> Vec<DoorRecord> {
        world
            .instances
            .iter()
            .filter(|(_, instance)| instance.flags.contains(InstanceFlags::DOOR))
            .map(|(_, instance)| DoorRecord {
                tile: instance.tile,
                open: instance.open,
            })
            .collect()
    }

    /// Fire or smoke on the tile.
    #[must_use]
    pub fn effect(world: &World, tile: TileCoord) -> EffectState {
        world.effects.get(tile)
    }

    /// Every tile carrying fire or smoke, in row-major order.
    #[must_use]
    pub fn active_effects(world: &World) -> Vec<EffectRecord> {
        world.effects.active().collect()
    }

    /// Reports whether smoke or fire obscures the tile.
    #[must_use]
    pub fn obscured(world: &World, tile: TileCoord) -> bool {
        world.effects.get(tile).is_active()
    }

    /// Current fog-of-war bitmap; a set bit is a visible tile.
    #[must_use]
    pub fn fog_of_war(world: &World) -> &TileBitmap {
        world.lighting.fog()
    }

    /// Current dynamic blocker bitmap.
    #[must_use]
    pub fn path_blocks(world: &World) -> &TileBitmap {
        &world.path_blocks
    }

    /// Captures every persisted object, door and effect.
    #[must_use]
    pub fn snapshot(world: &World) -> MapSnapshot {
        snapshot::export(world)
    }

    /// Reports whether the day base map is selected.
    #[must_use]
    pub fn day_time(world: &World) -> bool {
        world.lighting.day_time()
    }

    /// Number of times the layer has been regenerated.
    #[must_use]
    pub fn light_generations(world: &World, layer: LightLayer) -> u64 {
        world.lighting.generations(layer)
    }

    /// Union of the light-map rectangles awaiting regeneration.
    #[must_use]
    pub fn light_invalidation(world: &World) -> Option<TileRect> {
        world.lighting.pending()
    }

    /// Number of connectivity rectangle rebuilds so far.
    #[must_use]
    pub fn connectivity_rebuilds(world: &World) -> u64 {
        world.connectivity.rebuilds()
    }

    /// Derived connectivity mask of the tile.
    pub fn connectivity(world: &mut World, kind: ConnectionKind, tile: TileCoord) -> ConnectivityMask {
        world.assert_in_area(tile);
        world.refresh_connectivity();
        world.connectivity.mask(kind, tile)
    }

    /// Least-cost path between two tiles.
    pub fn solve_path(world: &mut World, start: TileCoord, goal: TileCoord) -> PathOutcome {
        world.assert_in_area(start);
        world.assert_in_area(goal);
        world.refresh_connectivity();
        let graph = TileGraph::new(&world.connectivity, world.width, world.height);
        match world
            .pather
            .solve(&graph, TileVertex::encode(start), TileVertex::encode(goal))
        {
            SolveOutcome::Solved { path, cost } => PathOutcome::Solved {
                path: path.into_iter().map(TileVertex::decode).collect(),
                cost,
            },
            SolveOutcome::NoSolution => PathOutcome::NoSolution,
            SolveOutcome::StartEndSame => PathOutcome::StartEndSame,
            SolveOutcome::OutOfMemory => PathOutcome::OutOfMemory,
        }
    }

    /// Every tile reachable from `start` within `budget`, cheapest first.
    pub fn reachable_tiles(world: &mut World, start: TileCoord, budget: f32) -> Vec<ReachableTile> {
        world.assert_in_area(start);
        world.refresh_connectivity();
        let graph = TileGraph::new(&world.connectivity, world.width, world.height);
        let mut near: Vec<StateCost<TileVertex>> = Vec::new();
        world
            .pather
            .solve_for_near_states(&graph, TileVertex::encode(start), budget, &mut near);
        near.into_iter()
            .map(|StateCost { state, cost }| ReachableTile {
                tile: state.decode(),
                remaining: budget - cost,
            })
            .collect()
    }

    /// Reports whether an unobstructed sight line joins the tiles.
    pub fn can_see(world: &mut World, from: TileCoord, to: TileCoord) -> bool {
        line_clear(world, ConnectionKind::Visibility, from, to)
    }

    /// Reports whether a unit could walk the straight line between the tiles.
    pub fn can_walk(world: &mut World, from: TileCoord, to: TileCoord) -> bool {
        line_clear(world, ConnectionKind::Traversal, from, to)
    }

    fn line_clear(world: &mut World, kind: ConnectionKind, from: TileCoord, to: TileCoord) -> bool {
        world.assert_in_area(from);
        world.assert_in_area(to);
        world.refresh_connectivity();
        TileGraph::new(&world.connectivity, world.width, world.height).line_clear(kind, from, to)
    }

    /// Tiles within `range` of `from` that `from` can see, in row-major order.
    pub fn visible_tiles(world: &mut World, from: TileCoord, range: u32) -> Vec<TileCoord> {
        world.assert_in_area(from);
        world.refresh_connectivity();
        let graph = TileGraph::new(&world.connectivity, world.width, world.height);
        let mut seen = Vec::new();
        graph::visible_tiles(&graph, from, range, &mut seen);
        seen
    }

    /// [`visible_tiles`] using the configured eyesight range.
    pub fn observable_tiles(world: &mut World, from: TileCoord) -> Vec<TileCoord> {
        let range = world.config.eyesight_range;
        visible_tiles(world, from, range)
    }

    /// Composited light-map layer, regenerated first if stale.
    pub fn light_map(world: &mut World, layer: LightLayer) -> &Surface {
        world.refresh_lighting();
        world.lighting.layer(layer)
    }
}
