use std::collections::BTreeSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tacmap_core::{
    CatalogIndex, Command, ConnectionKind, Damage, EffectState, Event, InstanceFlags, InstanceId,
    MapSnapshot, PathOutcome, Rgb, Rotation, Surface, TileCoord, TileRect, MAP_SIZE,
};
use tacmap_world::{self as world, query, Catalog, LightLayer, World, WorldConfig};

const CATALOG: &str = r#"
    [[entry]]
    index = 1
    name = "wall"
    traversal = [[0]]
    visibility = [[0]]

    [[entry]]
    index = 2
    name = "wooden_door"
    hit_points = 30
    flammability = 180
    traversal = [[0]]
    visibility = [[0]]
    door = { traversal = [[15]], visibility = [[15]] }
    rubble = 3
    model = "door"
    model_open = "door_open"

    [[entry]]
    index = 3
    name = "charred_rubble"
    traversal = [[0]]
    model = "rubble"

    [[entry]]
    index = 4
    name = "barrel"
    hit_points = 30
    flammability = 200
    traversal = [[0]]

    [[entry]]
    index = 5
    name = "lamp"
    light = { entry = 6, offset = [-1, -1] }

    [[entry]]
    index = 6
    name = "lamp_glow"
    size = [3, 3]
    light_texture = { x = 0, y = 0 }

    [[entry]]
    index = 7
    name = "table"
    size = [3, 1]
    hit_points = 40
    flammability = 120
    traversal = [[14, 10, 11]]

    [[entry]]
    index = 8
    name = "railing"
    traversal = [[7]]

    [[entry]]
    index = 9
    name = "powder_keg"
    hit_points = 30
    flammability = 255
    traversal = [[0]]

    [[entry]]
    index = 10
    name = "crate_stack"
    size = [2, 2]
    hit_points = 60
    flammability = 255
"#;

const WALL: u8 = 1;
const DOOR: u8 = 2;
const BARREL: u8 = 4;
const LAMP: u8 = 5;
const TABLE: u8 = 7;
const RAILING: u8 = 8;
const KEG: u8 = 9;
const CRATE_STACK: u8 = 10;

const EAGER_FIRE: &str = r#"
    seed = 3
    incendiary_ignition_scale = 1.0

    [ignition]
    scale = 1.0
"#;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn new_world() -> anyhow::Result<World> {
    init_logging();
    let catalog = Catalog::from_toml_str(CATALOG)?;
    let config = WorldConfig::from_toml_str("seed = 11")?;
    Ok(World::new(catalog, config))
}

fn place(world: &mut World, entry: u8, x: u32, y: u32, rotation: Rotation) -> Option<InstanceId> {
    let mut events = Vec::new();
    world::apply(
        world,
        Command::PlaceObject {
            catalog: CatalogIndex::new(entry).expect("nonzero catalog index"),
            tile: TileCoord::new(x, y),
            rotation,
            hit_points: None,
        },
        &mut events,
    );
    events.into_iter().find_map(|event| match event {
        Event::ObjectPlaced { instance, .. } => Some(instance),
        _ => None,
    })
}

fn advance(world: &mut World) -> Vec<Event> {
    let mut events = Vec::new();
    world::apply(world, Command::AdvanceSubTurn, &mut events);
    events
}

fn connectivity_grid(world: &mut World) -> Vec<u8> {
    let mut grid = Vec::new();
    for kind in [ConnectionKind::Traversal, ConnectionKind::Visibility] {
        for tile in TileRect::full().tiles() {
            grid.push(query::connectivity(world, kind, tile).bits());
        }
    }
    grid
}

#[test]
fn region_queries_match_brute_force() -> anyhow::Result<()> {
    let mut world = new_world()?;
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
    let mut live = BTreeSet::new();

    for _ in 0..200 {
        let (entry, width) = match rng.gen_range(0..3) {
            0 => (WALL, 1),
            1 => (BARREL, 1),
            _ => (TABLE, 3),
        };
        let rotation = Rotation::from_quarter_turns(rng.gen_range(0..4));
        let (span_x, span_y) = if rotation.swaps_axes() { (1, width) } else { (width, 1) };
        let x = rng.gen_range(0..=MAP_SIZE - span_x);
        let y = rng.gen_range(0..=MAP_SIZE - span_y);
        if let Some(id) = place(&mut world, entry, x, y, rotation) {
            let _ = live.insert(id);
        }
    }

    let removed: Vec<InstanceId> = live.iter().copied().step_by(3).collect();
    for id in removed {
        let mut events = Vec::new();
        world::apply(&mut world, Command::RemoveObject { instance: id }, &mut events);
        assert_eq!(events.len(), 1);
        let _ = live.remove(&id);
    }

    for _ in 0..50 {
        let x = rng.gen_range(0..MAP_SIZE);
        let y = rng.gen_range(0..MAP_SIZE);
        let w = rng.gen_range(1..=MAP_SIZE - x);
        let h = rng.gen_range(1..=MAP_SIZE - y);
        let region = TileRect::from_origin_and_size(TileCoord::new(x, y), w, h);

        let found = query::objects_in(&world, region, InstanceFlags::NONE, InstanceFlags::NONE);
        let unique: BTreeSet<InstanceId> = found.iter().copied().collect();
        assert_eq!(unique.len(), found.len(), "duplicate instances in {region:?}");

        let expected: BTreeSet<InstanceId> = live
            .iter()
            .copied()
            .filter(|id| {
                query::object(&world, *id).is_some_and(|object| object.bounds.intersects(&region))
            })
            .collect();
        assert_eq!(unique, expected, "mismatch in {region:?}");
    }
    Ok(())
}

#[test]
fn snapshot_round_trip_reproduces_objects_and_connectivity() -> anyhow::Result<()> {
    let mut world = new_world()?;
    let mut events = Vec::new();
    for y in 4..12 {
        let _ = place(&mut world, WALL, 8, y, Rotation::Deg0);
    }
    let _ = place(&mut world, DOOR, 8, 12, Rotation::Deg0);
    let _ = place(&mut world, TABLE, 14, 3, Rotation::Deg90);
    let _ = place(&mut world, LAMP, 20, 20, Rotation::Deg0);
    let barrel = place(&mut world, BARREL, 30, 30, Rotation::Deg0).expect("barrel placed");
    world::apply(
        &mut world,
        Command::DamageObject {
            instance: barrel,
            damage: Damage::new(12.0, 0.0, 0.0),
        },
        &mut events,
    );
    world::apply(
        &mut world,
        Command::SetDoor {
            tile: TileCoord::new(8, 12),
            open: true,
        },
        &mut events,
    );
    world::apply(
        &mut world,
        Command::AddSmoke {
            tile: TileCoord::new(2, 2),
            sub_turns: 9,
        },
        &mut events,
    );

    let snapshot = query::snapshot(&world);
    assert_eq!(snapshot.objects.len(), 12, "the lamp's glow is not persisted");
    assert_eq!(snapshot.doors.len(), 1);
    let encoded = bincode::serialize(&snapshot)?;
    let decoded: MapSnapshot = bincode::deserialize(&encoded)?;
    let before = connectivity_grid(&mut world);
    let objects_before = query::object_count(&world);

    world::apply(&mut world, Command::Clear, &mut events);
    assert_eq!(query::object_count(&world), 0);
    world::restore(&mut world, &decoded, &mut events)?;

    assert_eq!(query::snapshot(&world), snapshot);
    assert_eq!(query::object_count(&world), objects_before);
    assert_eq!(
        query::object(&world, barrel).map(|object| object.hit_points.get()),
        Some(18)
    );
    assert_eq!(connectivity_grid(&mut world), before);

    let mut fresh = new_world()?;
    world::restore(&mut fresh, &decoded, &mut events)?;
    assert_eq!(connectivity_grid(&mut fresh), before);
    Ok(())
}

#[test]
fn path_queries_are_deterministic() -> anyhow::Result<()> {
    let mut world = new_world()?;
    for y in 0..40 {
        let _ = place(&mut world, WALL, 20, y, Rotation::Deg0);
    }
    let start = TileCoord::new(5, 5);
    let goal = TileCoord::new(35, 5);

    let same = query::solve_path(&mut world, start, start);
    assert_eq!(same, PathOutcome::StartEndSame);
    assert_eq!(same.cost(), 0.0);

    let first = query::solve_path(&mut world, start, goal);
    let second = query::solve_path(&mut world, start, goal);
    assert_eq!(first, second);
    let PathOutcome::Solved { path, cost } = first else {
        panic!("expected a path, got {first:?}");
    };
    assert_eq!(path.first(), Some(&start));
    assert_eq!(path.last(), Some(&goal));
    assert!(path.iter().all(|tile| tile.x() != 20 || tile.y() >= 40));
    assert!(cost > 30.0);

    let reachable = query::reachable_tiles(&mut world, start, 2.0);
    assert_eq!(reachable[0].tile, start);
    assert_eq!(reachable[0].remaining, 2.0);
    assert!(reachable.iter().all(|entry| entry.remaining >= 0.0));
    assert!(reachable.iter().any(|entry| entry.tile == TileCoord::new(7, 5)));
    assert!(!reachable.iter().any(|entry| entry.tile == TileCoord::new(8, 5)));
    assert!(query::reachable_tiles(&mut world, start, -1.0).is_empty());
    assert!(query::reachable_tiles(&mut world, start, f32::NAN).is_empty());
    Ok(())
}

#[test]
fn solver_budget_exhaustion_is_reported() -> anyhow::Result<()> {
    init_logging();
    let catalog = Catalog::from_toml_str(CATALOG)?;
    let config = WorldConfig::from_toml_str("solver_node_budget = 16")?;
    let mut world = World::new(catalog, config);
    let outcome = query::solve_path(&mut world, TileCoord::new(0, 0), TileCoord::new(60, 60));
    assert_eq!(outcome, PathOutcome::OutOfMemory);
    Ok(())
}

#[test]
fn diagonal_moves_need_both_flanks_open() -> anyhow::Result<()> {
    let mut world = new_world()?;
    // The railing closes only its west edge; its corner still blocks the
    // south-east diagonal out of (10, 10).
    let _ = place(&mut world, RAILING, 11, 10, Rotation::Deg0);
    let outcome = query::solve_path(&mut world, TileCoord::new(10, 10), TileCoord::new(11, 11));
    let PathOutcome::Solved { path, cost } = outcome else {
        panic!("expected a path, got {outcome:?}");
    };
    assert_eq!(path.len(), 3);
    assert_eq!(cost, 2.0);

    let open = query::solve_path(&mut world, TileCoord::new(10, 10), TileCoord::new(9, 11));
    assert!((open.cost() - std::f32::consts::SQRT_2).abs() < 1e-6);
    assert!(!query::can_walk(&mut world, TileCoord::new(10, 10), TileCoord::new(11, 11)));
    assert!(query::can_see(&mut world, TileCoord::new(10, 10), TileCoord::new(11, 11)));
    Ok(())
}

#[test]
fn smoke_clears_after_its_duration() -> anyhow::Result<()> {
    let mut world = new_world()?;
    let tile = TileCoord::new(6, 6);
    let mut events = Vec::new();
    world::apply(&mut world, Command::AddSmoke { tile, sub_turns: 5 }, &mut events);

    for _ in 0..4 {
        let events = advance(&mut world);
        assert_eq!(
            events.last(),
            Some(&Event::SubTurnAdvanced {
                changed: Some(TileRect::single(tile))
            })
        );
    }
    assert_eq!(query::effect(&world, tile), EffectState::Smoke(1));
    let _ = advance(&mut world);
    assert_eq!(query::effect(&world, tile), EffectState::None);
    assert_eq!(
        advance(&mut world),
        vec![Event::SubTurnAdvanced { changed: None }]
    );
    Ok(())
}

#[test]
fn fire_burns_until_its_fuel_is_gone() -> anyhow::Result<()> {
    let mut world = new_world()?;
    let barrel = place(&mut world, BARREL, 40, 40, Rotation::Deg0).expect("barrel placed");
    let tile = TileCoord::new(40, 40);
    let mut events = Vec::new();
    world::apply(&mut world, Command::Ignite { tile }, &mut events);

    let _ = advance(&mut world);
    let _ = advance(&mut world);
    assert_eq!(query::effect(&world, tile), EffectState::Fire);
    assert_eq!(
        query::object(&world, barrel).map(|object| object.hit_points.get()),
        Some(10)
    );

    let events = advance(&mut world);
    assert!(events
        .iter()
        .any(|event| matches!(event, Event::ObjectDestroyed { instance, .. } if *instance == barrel)));
    assert_eq!(query::effect(&world, tile), EffectState::Smoke(4));
    assert!(query::obscured(&world, tile));
    Ok(())
}

#[test]
fn fire_spreads_to_flammable_neighbours_only() -> anyhow::Result<()> {
    init_logging();
    let mut world = World::new(
        Catalog::from_toml_str(CATALOG)?,
        WorldConfig::from_toml_str(EAGER_FIRE)?,
    );
    let _ = place(&mut world, KEG, 10, 10, Rotation::Deg0);
    let _ = place(&mut world, KEG, 11, 10, Rotation::Deg0);
    let _ = place(&mut world, WALL, 9, 10, Rotation::Deg0);
    let _ = place(&mut world, WALL, 10, 9, Rotation::Deg0);
    let mut events = Vec::new();
    world::apply(&mut world, Command::Ignite { tile: TileCoord::new(10, 10) }, &mut events);

    let _ = advance(&mut world);
    assert_eq!(query::effect(&world, TileCoord::new(11, 10)), EffectState::Fire);

    for _ in 0..6 {
        assert_eq!(query::effect(&world, TileCoord::new(9, 10)), EffectState::None);
        assert_eq!(query::effect(&world, TileCoord::new(10, 9)), EffectState::None);
        let _ = advance(&mut world);
    }
    assert_eq!(
        query::objects_at(&world, TileCoord::new(11, 10), InstanceFlags::NONE, InstanceFlags::NONE),
        Vec::new(),
        "the second keg burns down too"
    );
    Ok(())
}

#[test]
fn incendiary_damage_ignites_the_whole_footprint() -> anyhow::Result<()> {
    init_logging();
    let mut world = World::new(
        Catalog::from_toml_str(CATALOG)?,
        WorldConfig::from_toml_str(EAGER_FIRE)?,
    );
    let stack = place(&mut world, CRATE_STACK, 20, 20, Rotation::Deg0).expect("stack placed");
    let wall = place(&mut world, WALL, 30, 30, Rotation::Deg0).expect("wall placed");
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::DamageObject {
            instance: stack,
            damage: Damage::new(0.0, 0.0, 2.0),
        },
        &mut events,
    );

    let footprint = TileRect::from_origin_and_size(TileCoord::new(20, 20), 2, 2);
    assert!(footprint
        .tiles()
        .all(|tile| query::effect(&world, tile) == EffectState::Fire));
    assert_eq!(query::effect(&world, TileCoord::new(22, 20)), EffectState::None);
    assert_eq!(
        events.last(),
        Some(&Event::ObjectDamaged {
            instance: stack,
            hit_points: 58
        })
    );

    world::apply(
        &mut world,
        Command::DamageObject {
            instance: wall,
            damage: Damage::new(0.0, 0.0, 2.0),
        },
        &mut events,
    );
    assert_eq!(query::effect(&world, TileCoord::new(30, 30)), EffectState::None);
    Ok(())
}

#[test]
fn cleared_fire_spares_its_fuel() -> anyhow::Result<()> {
    let mut world = new_world()?;
    let barrel = place(&mut world, BARREL, 3, 40, Rotation::Deg0).expect("barrel placed");
    let tile = TileCoord::new(3, 40);
    let mut events = Vec::new();
    world::apply(&mut world, Command::Ignite { tile }, &mut events);
    let _ = advance(&mut world);
    world::apply(&mut world, Command::ClearEffect { tile }, &mut events);
    let _ = advance(&mut world);
    let _ = advance(&mut world);

    assert_eq!(query::effect(&world, tile), EffectState::None);
    assert_eq!(
        query::object(&world, barrel).map(|object| object.hit_points.get()),
        Some(20)
    );
    Ok(())
}

#[test]
fn burned_door_becomes_impassable_rubble() -> anyhow::Result<()> {
    let mut world = new_world()?;
    let door_tile = TileCoord::new(30, 10);
    let door = place(&mut world, DOOR, 30, 10, Rotation::Deg0).expect("door placed");
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::SetDoor {
            tile: door_tile,
            open: true,
        },
        &mut events,
    );
    assert!(query::can_walk(&mut world, TileCoord::new(29, 10), TileCoord::new(31, 10)));
    assert_eq!(query::model_name(&world, door), Some("door_open"));

    world::apply(&mut world, Command::Ignite { tile: door_tile }, &mut events);
    for _ in 0..3 {
        let _ = advance(&mut world);
    }
    assert!(query::object(&world, door).is_none());
    let rubble = query::objects_at(&world, door_tile, InstanceFlags::NONE, InstanceFlags::NONE);
    assert_eq!(rubble.len(), 1);
    assert_eq!(query::model_name(&world, rubble[0]), Some("rubble"));
    assert!(!query::can_walk(&mut world, TileCoord::new(29, 10), TileCoord::new(31, 10)));
    Ok(())
}

#[test]
fn light_maps_regenerate_only_when_stale() -> anyhow::Result<()> {
    let mut world = new_world()?;
    let mut events = Vec::new();
    let glow = Rgb::new(40, 30, 10);
    let mut atlas = Surface::filled(3, 3, Rgb::BLACK);
    atlas.set_pixel(1, 1, glow);
    world::apply(
        &mut world,
        Command::SetLightMaps {
            day: Surface::filled(MAP_SIZE, MAP_SIZE, Rgb::new(100, 100, 100)),
            night: Surface::filled(MAP_SIZE, MAP_SIZE, Rgb::new(10, 10, 30)),
        },
        &mut events,
    );
    world::apply(&mut world, Command::SetLightAtlas { atlas }, &mut events);
    let _ = place(&mut world, LAMP, 12, 12, Rotation::Deg0);

    let lit = query::light_map(&mut world, LightLayer::Lit).clone();
    assert_eq!(lit.pixel(12, 12), Some(Rgb::new(140, 130, 110)));
    assert_eq!(lit.pixel(13, 13), Some(Rgb::new(100, 100, 100)));
    assert_eq!(generations(&world), [1, 1, 1]);
    assert_eq!(query::light_invalidation(&world), None);

    let _ = query::light_map(&mut world, LightLayer::Fogged);
    assert_eq!(generations(&world), [1, 1, 1], "clean reads reuse the cache");

    let ambient = WorldConfig::default().fog_ambient;
    assert_eq!(query::light_map(&mut world, LightLayer::Fogged).pixel(12, 12), Some(ambient));
    {
        let mut fog = world::lock_fog_of_war(&mut world);
        fog.set(TileCoord::new(12, 12), true);
    }
    assert_eq!(query::light_invalidation(&world), Some(TileRect::full()));
    assert!(query::fog_of_war(&world).get(TileCoord::new(12, 12)));

    let fogged = query::light_map(&mut world, LightLayer::Fogged);
    assert_eq!(fogged.pixel(12, 12), Some(Rgb::new(140, 130, 110)));
    assert_eq!(fogged.pixel(11, 12), Some(ambient));
    assert_eq!(generations(&world), [1, 1, 2], "fog only feeds the fogged layer");
    assert_eq!(query::light_invalidation(&world), None);

    world::apply(&mut world, Command::Ignite { tile: TileCoord::new(40, 40) }, &mut events);
    assert_eq!(
        query::light_invalidation(&world),
        Some(TileRect::single(TileCoord::new(40, 40)))
    );
    let _ = query::light_map(&mut world, LightLayer::Base);
    assert_eq!(generations(&world), [1, 2, 3], "fire leaves the base map alone");

    world::apply(&mut world, Command::SetDayTime { day: false }, &mut events);
    assert_eq!(events.last(), Some(&Event::DayTimeChanged { day: false }));
    assert_eq!(
        query::light_map(&mut world, LightLayer::Base).pixel(0, 0),
        Some(Rgb::new(10, 10, 30))
    );
    assert!(!query::day_time(&world));
    assert_eq!(generations(&world), [2, 3, 4]);
    Ok(())
}

fn generations(world: &World) -> [u64; 3] {
    [LightLayer::Base, LightLayer::Lit, LightLayer::Fogged].map(|layer| query::light_generations(world, layer))
}

#[test]
fn visibility_stops_at_walls() -> anyhow::Result<()> {
    let mut world = new_world()?;
    for y in 0..MAP_SIZE {
        let _ = place(&mut world, WALL, 32, y, Rotation::Deg0);
    }
    let from = TileCoord::new(28, 30);
    let seen = query::observable_tiles(&mut world, from);
    assert!(seen.contains(&from));
    assert!(seen.contains(&TileCoord::new(31, 30)));
    assert!(seen.iter().all(|tile| tile.x() < 32));
    assert!(!query::can_see(&mut world, from, TileCoord::new(34, 30)));

    let near = query::visible_tiles(&mut world, from, 2);
    assert!(near.iter().all(|tile| tile.x().abs_diff(28) <= 2 && tile.y().abs_diff(30) <= 2));
    assert_eq!(near.len(), 13);
    Ok(())
}
