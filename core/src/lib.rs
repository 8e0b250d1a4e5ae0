#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the tactical map engine.
//!
//! This crate defines the message surface that connects collaborators with the
//! authoritative tile world. Callers submit [`Command`] values describing
//! desired mutations, the world executes those commands via its `apply` entry
//! point, and then reports [`Event`] values describing what changed. Read-only
//! collaborators (renderers, persistence, actor AI) consume the value types
//! defined here and never touch world internals.

use serde::{Deserialize, Serialize};

/// Side length of the square tile grid backing every map.
pub const MAP_SIZE: u32 = 64;

/// Base-two logarithm of [`MAP_SIZE`].
pub const LOG2_MAP_SIZE: u32 = 6;

/// Number of tiles stored by every per-tile array.
pub const TILE_COUNT: usize = (MAP_SIZE * MAP_SIZE) as usize;

/// Largest number of tiles an object footprint may span along either axis.
pub const MAX_FOOTPRINT: u32 = 6;

/// Exclusive upper bound for catalog indices.
pub const MAX_CATALOG: usize = 256;

/// Longest smoke duration representable by an [`EffectState`].
pub const MAX_SMOKE_DURATION: u8 = 0x7f;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Resizes the active play area. Both dimensions must lie in `1..=MAP_SIZE`.
    ConfigureMap {
        /// Number of tile columns in the active area.
        width: u32,
        /// Number of tile rows in the active area.
        height: u32,
    },
    /// Removes every object, effect and path block from the map.
    Clear,
    /// Places a new object instance anchored at the provided tile.
    PlaceObject {
        /// Catalog entry describing the object.
        catalog: CatalogIndex,
        /// Upper-left tile of the rotated footprint.
        tile: TileCoord,
        /// Orientation of the object.
        rotation: Rotation,
        /// Starting hit points; `None` uses the catalog default.
        hit_points: Option<u16>,
    },
    /// Removes the identified instance. Unknown identifiers are ignored.
    RemoveObject {
        /// Instance targeted for removal.
        instance: InstanceId,
    },
    /// Removes every non-light object whose footprint covers the tile.
    DeleteAt {
        /// Tile whose occupants are removed.
        tile: TileCoord,
    },
    /// Opens or closes every door covering the tile.
    SetDoor {
        /// Tile covered by the door.
        tile: TileCoord,
        /// Desired door state.
        open: bool,
    },
    /// Associates a renderer-owned model handle with an instance.
    AttachModel {
        /// Instance receiving the handle.
        instance: InstanceId,
        /// Opaque renderer handle.
        model: ModelKey,
    },
    /// Damages every object covering the tile.
    DamageTile {
        /// Tile receiving the damage.
        tile: TileCoord,
        /// Damage applied to each occupant.
        damage: Damage,
    },
    /// Damages a single object.
    DamageObject {
        /// Instance receiving the damage.
        instance: InstanceId,
        /// Damage applied to the instance.
        damage: Damage,
    },
    /// Damages the object attached to a renderer model.
    DamageModel {
        /// Renderer handle previously attached with [`Command::AttachModel`].
        model: ModelKey,
        /// Damage applied to the instance.
        damage: Damage,
    },
    /// Fills the tile with smoke for the given number of sub-turns.
    AddSmoke {
        /// Tile receiving smoke.
        tile: TileCoord,
        /// Number of sub-turns the smoke persists, `1..=127`.
        sub_turns: u8,
    },
    /// Sets the tile on fire.
    Ignite {
        /// Tile set alight.
        tile: TileCoord,
    },
    /// Removes any fire or smoke from the tile.
    ClearEffect {
        /// Tile returned to the no-effect state.
        tile: TileCoord,
    },
    /// Advances the fire and smoke simulation by one sub-turn.
    AdvanceSubTurn,
    /// Replaces the dynamic path-block bitmap supplied by the actor layer.
    SetPathBlocks {
        /// Tiles currently occupied by mobile actors.
        blocks: Box<TileBitmap>,
    },
    /// Clears every dynamic path block.
    ClearPathBlocks,
    /// Selects the day or night base light map.
    SetDayTime {
        /// `true` selects the day map.
        day: bool,
    },
    /// Installs the base light maps blended into layer zero.
    SetLightMaps {
        /// Base light map used during the day.
        day: Surface,
        /// Base light map used during the night.
        night: Surface,
    },
    /// Installs the atlas from which point lights are blitted.
    SetLightAtlas {
        /// Texture holding every light footprint image.
        atlas: Surface,
    },
}

/// Events reported by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that the active play area changed size.
    MapConfigured {
        /// Number of tile columns in the active area.
        width: u32,
        /// Number of tile rows in the active area.
        height: u32,
    },
    /// Confirms that every object and effect was removed.
    MapCleared,
    /// Confirms that an object was placed.
    ObjectPlaced {
        /// Identifier allocated to the instance.
        instance: InstanceId,
        /// Catalog entry describing the instance.
        catalog: CatalogIndex,
        /// Tiles covered by the instance.
        bounds: TileRect,
    },
    /// Confirms that an object was removed without being destroyed.
    ObjectRemoved {
        /// Identifier of the removed instance.
        instance: InstanceId,
        /// Tiles previously covered by the instance.
        bounds: TileRect,
    },
    /// Reports that an object lost its remaining hit points.
    ObjectDestroyed {
        /// Identifier of the destroyed instance.
        instance: InstanceId,
        /// Tiles previously covered by the instance.
        bounds: TileRect,
    },
    /// Reports that an object took damage and survived.
    ObjectDamaged {
        /// Identifier of the damaged instance.
        instance: InstanceId,
        /// Hit points remaining after the damage.
        hit_points: u16,
    },
    /// Reports that a door changed state.
    DoorChanged {
        /// Identifier of the door instance.
        instance: InstanceId,
        /// State of the door after the change.
        open: bool,
    },
    /// Reports that a tile's fire or smoke state changed.
    EffectChanged {
        /// Tile whose effect changed.
        tile: TileCoord,
        /// Effect now present on the tile.
        state: EffectState,
    },
    /// Reports that the effect simulation advanced.
    SubTurnAdvanced {
        /// Union of every tile whose effect or occupancy changed.
        changed: Option<TileRect>,
    },
    /// Reports that the dynamic path-block bitmap changed.
    PathBlocksChanged,
    /// Reports that the base light map selection changed.
    DayTimeChanged {
        /// `true` when the day map is active.
        day: bool,
    },
}

/// Location of a single tile expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    x: u32,
    y: u32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column of the tile.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row of the tile.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Row-major offset of the tile inside a [`MAP_SIZE`]-wide array.
    ///
    /// Callers must ensure the tile lies inside the backing grid.
    #[must_use]
    pub const fn index(&self) -> usize {
        (self.y * MAP_SIZE + self.x) as usize
    }

    /// Inverse of [`TileCoord::index`].
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        Self {
            x: (index as u32) % MAP_SIZE,
            y: (index as u32) / MAP_SIZE,
        }
    }

    /// Returns the tile shifted by the provided offset if it stays on the grid.
    #[must_use]
    pub fn offset(self, dx: i32, dy: i32) -> Option<Self> {
        let x = self.x.checked_add_signed(dx)?;
        let y = self.y.checked_add_signed(dy)?;
        if x < MAP_SIZE && y < MAP_SIZE {
            Some(Self { x, y })
        } else {
            None
        }
    }

    /// Returns the orthogonal neighbour in the given direction.
    #[must_use]
    pub fn neighbor(self, direction: Direction) -> Option<Self> {
        let (dx, dy) = direction.offset();
        self.offset(dx, dy)
    }

    /// Computes the Manhattan distance between two tiles.
    #[must_use]
    pub fn manhattan_distance(self, other: TileCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Computes the Chebyshev (king move) distance between two tiles.
    #[must_use]
    pub fn chebyshev_distance(self, other: TileCoord) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }
}

/// Inclusive axis-aligned rectangle expressed in tile coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileRect {
    min: TileCoord,
    max: TileCoord,
}

impl TileRect {
    /// Creates a rectangle spanning `min..=max` on both axes.
    #[must_use]
    pub fn new(min: TileCoord, max: TileCoord) -> Self {
        assert!(
            min.x <= max.x && min.y <= max.y,
            "rectangle corners inverted: {min:?} > {max:?}"
        );
        Self { min, max }
    }

    /// Rectangle covering a single tile.
    #[must_use]
    pub const fn single(tile: TileCoord) -> Self {
        Self {
            min: tile,
            max: tile,
        }
    }

    /// Rectangle anchored at `origin` spanning `width` by `height` tiles.
    #[must_use]
    pub fn from_origin_and_size(origin: TileCoord, width: u32, height: u32) -> Self {
        assert!(width > 0 && height > 0, "rectangle must not be empty");
        Self {
            min: origin,
            max: TileCoord::new(origin.x + width - 1, origin.y + height - 1),
        }
    }

    /// Rectangle covering the entire backing grid.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            min: TileCoord::new(0, 0),
            max: TileCoord::new(MAP_SIZE - 1, MAP_SIZE - 1),
        }
    }

    /// Upper-left corner.
    #[must_use]
    pub const fn min(&self) -> TileCoord {
        self.min
    }

    /// Lower-right corner.
    #[must_use]
    pub const fn max(&self) -> TileCoord {
        self.max
    }

    /// Number of columns spanned.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.max.x - self.min.x + 1
    }

    /// Number of rows spanned.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.max.y - self.min.y + 1
    }

    /// Number of tiles covered.
    #[must_use]
    pub const fn area(&self) -> u32 {
        self.width() * self.height()
    }

    /// Reports whether the tile lies inside the rectangle.
    #[must_use]
    pub const fn contains(&self, tile: TileCoord) -> bool {
        tile.x >= self.min.x && tile.x <= self.max.x && tile.y >= self.min.y && tile.y <= self.max.y
    }

    /// Reports whether `other` lies entirely inside the rectangle.
    #[must_use]
    pub const fn contains_rect(&self, other: &TileRect) -> bool {
        self.contains(other.min) && self.contains(other.max)
    }

    /// Reports whether the rectangles share at least one tile.
    #[must_use]
    pub const fn intersects(&self, other: &TileRect) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    /// Tiles shared by both rectangles, if any.
    #[must_use]
    pub fn intersection(&self, other: &TileRect) -> Option<TileRect> {
        if !self.intersects(other) {
            return None;
        }
        Some(Self {
            min: TileCoord::new(self.min.x.max(other.min.x), self.min.y.max(other.min.y)),
            max: TileCoord::new(self.max.x.min(other.max.x), self.max.y.min(other.max.y)),
        })
    }

    /// Smallest rectangle covering both rectangles.
    #[must_use]
    pub fn union(&self, other: &TileRect) -> TileRect {
        Self {
            min: TileCoord::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: TileCoord::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Iterates the covered tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = TileCoord> {
        let (min, max) = (self.min, self.max);
        (min.y..=max.y).flat_map(move |y| (min.x..=max.x).map(move |x| TileCoord::new(x, y)))
    }
}

/// Grows an optional dirty rectangle so it also covers `rect`.
pub fn union_into(target: &mut Option<TileRect>, rect: TileRect) {
    *target = Some(match target {
        Some(existing) => existing.union(&rect),
        None => rect,
    });
}

/// Cardinal directions across tile edges. Rows grow southward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Toward decreasing row indices.
    North,
    /// Toward increasing column indices.
    East,
    /// Toward increasing row indices.
    South,
    /// Toward decreasing column indices.
    West,
}

impl Direction {
    /// Every direction in clockwise order starting at north.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Connectivity bit representing the direction.
    #[must_use]
    pub const fn bit(self) -> u8 {
        match self {
            Self::North => 0x1,
            Self::East => 0x2,
            Self::South => 0x4,
            Self::West => 0x8,
        }
    }

    /// Direction pointing the other way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }

    /// Column and row delta of a single step.
    #[must_use]
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }
}

/// Four-bit mask of tile edges that may be crossed.
///
/// A set bit means the edge in that [`Direction`] is open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ConnectivityMask(u8);

impl ConnectivityMask {
    /// Every edge open.
    pub const OPEN: Self = Self(0xf);
    /// Every edge closed.
    pub const CLOSED: Self = Self(0);

    /// Creates a mask from raw bits; bits above the low nibble are discarded.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0xf)
    }

    /// Raw four-bit representation.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Reports whether the edge in `direction` is open.
    #[must_use]
    pub const fn allows(self, direction: Direction) -> bool {
        self.0 & direction.bit() != 0
    }

    /// Edges open in both masks.
    #[must_use]
    pub const fn intersect(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Rotates the mask clockwise by the provided rotation.
    #[must_use]
    pub const fn rotated(self, rotation: Rotation) -> Self {
        let turns = rotation.quarter_turns() as u32;
        if turns == 0 {
            return self;
        }
        let bits = self.0 as u32;
        Self((((bits << turns) | (bits >> (4 - turns))) & 0xf) as u8)
    }
}

/// The two derived connectivity layers kept per tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionKind {
    /// Edges that units may walk across.
    Traversal,
    /// Edges that line of sight may pass through.
    Visibility,
}

/// Orientation of a placed object in quarter turns clockwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    /// No rotation.
    #[default]
    Deg0,
    /// One quarter turn clockwise.
    Deg90,
    /// Half turn.
    Deg180,
    /// Three quarter turns clockwise.
    Deg270,
}

impl Rotation {
    /// Builds a rotation from a quarter-turn count, wrapping past a full turn.
    #[must_use]
    pub const fn from_quarter_turns(turns: u8) -> Self {
        match turns % 4 {
            0 => Self::Deg0,
            1 => Self::Deg90,
            2 => Self::Deg180,
            _ => Self::Deg270,
        }
    }

    /// Number of clockwise quarter turns.
    #[must_use]
    pub const fn quarter_turns(self) -> u8 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 1,
            Self::Deg180 => 2,
            Self::Deg270 => 3,
        }
    }

    /// Reports whether the rotation swaps the footprint's width and height.
    #[must_use]
    pub const fn swaps_axes(self) -> bool {
        matches!(self, Self::Deg90 | Self::Deg270)
    }
}

/// Index of an entry inside the object catalog. Zero is reserved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CatalogIndex(u8);

impl CatalogIndex {
    /// Creates a catalog index, rejecting the reserved value zero.
    #[must_use]
    pub const fn new(value: u8) -> Option<Self> {
        if value == 0 {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Retrieves the numeric index.
    #[must_use]
    pub const fn get(&self) -> u8 {
        self.0
    }
}

/// Unique identifier assigned to a placed object instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(u32);

impl InstanceId {
    /// Creates a new instance identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Opaque handle to a renderer-owned model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelKey(u64);

impl ModelKey {
    /// Wraps a renderer handle.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the raw handle.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Flag bits carried by every instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct InstanceFlags(u16);

impl InstanceFlags {
    /// No flags set.
    pub const NONE: Self = Self(0);
    /// The instance is a point light.
    pub const IS_LIGHT: Self = Self(0x01);
    /// The instance is regenerated automatically and never persisted.
    pub const NOT_PERSISTED: Self = Self(0x02);
    /// The instance is a door.
    pub const DOOR: Self = Self(0x04);

    /// Creates flags from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Raw bit representation.
    #[must_use]
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Flags set in either operand.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Reports whether every flag in `other` is set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Applies a spatial query filter: all `required` set, no `excluded` set.
    #[must_use]
    pub const fn matches(self, required: Self, excluded: Self) -> bool {
        self.0 & required.0 == required.0 && self.0 & excluded.0 == 0
    }
}

/// Hit points of a placed object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Health(u16);

impl Health {
    /// Sentinel marking an object that cannot be damaged.
    pub const INDESTRUCTIBLE: Self = Self(0xffff);

    /// Creates a health value.
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Retrieves the raw hit points.
    #[must_use]
    pub const fn get(&self) -> u16 {
        self.0
    }

    /// Reports whether the object ignores damage.
    #[must_use]
    pub const fn is_indestructible(&self) -> bool {
        self.0 == Self::INDESTRUCTIBLE.0
    }

    /// Reports whether no hit points remain.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.0 == 0
    }

    /// Subtracts damage, saturating at zero. Indestructible values never change.
    #[must_use]
    pub const fn damaged(self, amount: u16) -> Self {
        if self.is_indestructible() {
            self
        } else {
            Self(self.0.saturating_sub(amount))
        }
    }
}

/// Damage delivered to map objects by weapons, explosions and fire.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Damage {
    /// Physical impact damage.
    pub kinetic: f32,
    /// Energy weapon damage.
    pub energy: f32,
    /// Fire damage; may also ignite flammable objects.
    pub incendiary: f32,
}

impl Damage {
    /// Creates damage from its three components.
    #[must_use]
    pub const fn new(kinetic: f32, energy: f32, incendiary: f32) -> Self {
        Self {
            kinetic,
            energy,
            incendiary,
        }
    }

    /// Whole hit points removed by the damage.
    #[must_use]
    pub fn total(&self) -> u16 {
        let sum = (self.kinetic + self.energy + self.incendiary).max(0.0);
        sum.round().min(f32::from(u16::MAX - 1)) as u16
    }
}

/// Fire or smoke present on a single tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EffectState {
    /// Nothing burning or smoking.
    #[default]
    None,
    /// Smoke with the given number of sub-turns remaining (`1..=127`).
    Smoke(u8),
    /// Fire, which persists until its fuel is gone or it is cleared.
    Fire,
}

impl EffectState {
    const FIRE_BIT: u8 = 0x80;

    /// Packs the state into its byte encoding: bit 7 fire, bits 0-6 duration.
    #[must_use]
    pub fn to_byte(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Smoke(duration) => {
                assert!(
                    duration > 0 && duration <= MAX_SMOKE_DURATION,
                    "smoke duration {duration} outside 1..=127"
                );
                duration
            }
            Self::Fire => Self::FIRE_BIT,
        }
    }

    /// Unpacks the byte encoding.
    ///
    /// A fire bit combined with a nonzero duration is not a valid encoding.
    #[must_use]
    pub fn from_byte(byte: u8) -> Self {
        let duration = byte & MAX_SMOKE_DURATION;
        if byte & Self::FIRE_BIT != 0 {
            assert!(duration == 0, "fire encoded with duration {duration}");
            Self::Fire
        } else if duration == 0 {
            Self::None
        } else {
            Self::Smoke(duration)
        }
    }

    /// Reports whether any effect is present.
    #[must_use]
    pub const fn is_active(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Persisted description of a single placed object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    /// Catalog entry describing the object.
    pub catalog: CatalogIndex,
    /// Upper-left tile of the rotated footprint.
    pub tile: TileCoord,
    /// Orientation of the object.
    pub rotation: Rotation,
    /// Remaining hit points.
    pub hit_points: Health,
    /// Flag bits at the time of capture.
    pub flags: InstanceFlags,
}

/// Persisted open/closed state of a door.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorRecord {
    /// Upper-left tile of the door's footprint.
    pub tile: TileCoord,
    /// Whether the door stands open.
    pub open: bool,
}

/// Persisted fire or smoke on a tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectRecord {
    /// Tile carrying the effect.
    pub tile: TileCoord,
    /// Effect present on the tile.
    pub state: EffectState,
}

/// Structured snapshot exchanged with the persistence collaborator.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapSnapshot {
    /// Active play area width in tiles.
    pub width: u32,
    /// Active play area height in tiles.
    pub height: u32,
    /// Every persisted object in deterministic order.
    pub objects: Vec<ObjectRecord>,
    /// Open/closed state for every door.
    pub doors: Vec<DoorRecord>,
    /// Every tile with fire or smoke.
    pub effects: Vec<EffectRecord>,
}

/// Result of a least-cost path request between two tiles.
#[derive(Clone, Debug, PartialEq)]
pub enum PathOutcome {
    /// A path was found.
    Solved {
        /// Tiles visited from start to goal, both inclusive.
        path: Vec<TileCoord>,
        /// Accumulated movement cost.
        cost: f32,
    },
    /// The goal cannot be reached from the start.
    NoSolution,
    /// The start and goal are the same tile.
    StartEndSame,
    /// The search exhausted its node budget before finishing.
    OutOfMemory,
}

impl PathOutcome {
    /// Cost of the outcome; zero when no movement is needed or possible.
    #[must_use]
    pub fn cost(&self) -> f32 {
        match self {
            Self::Solved { cost, .. } => *cost,
            _ => 0.0,
        }
    }
}

/// Tile reachable from a start within a movement budget.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReachableTile {
    /// Reachable tile.
    pub tile: TileCoord,
    /// Budget left after arriving at the tile.
    pub remaining: f32,
}

/// 24-bit light colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    /// Red channel.
    pub red: u8,
    /// Green channel.
    pub green: u8,
    /// Blue channel.
    pub blue: u8,
}

impl Rgb {
    /// Full brightness.
    pub const WHITE: Self = Self::new(0xff, 0xff, 0xff);
    /// No light.
    pub const BLACK: Self = Self::new(0, 0, 0);

    /// Creates a colour from byte channels.
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Channel-wise saturating sum, used to accumulate light.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self {
            red: self.red.saturating_add(other.red),
            green: self.green.saturating_add(other.green),
            blue: self.blue.saturating_add(other.blue),
        }
    }
}

/// Raster of light colours, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surface {
    width: u32,
    height: u32,
    pixels: Vec<Rgb>,
}

impl Surface {
    /// Creates a surface filled with a single colour.
    #[must_use]
    pub fn filled(width: u32, height: u32, color: Rgb) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; (width * height) as usize],
        }
    }

    /// Creates a surface from row-major pixels.
    #[must_use]
    pub fn from_pixels(width: u32, height: u32, pixels: Vec<Rgb>) -> Self {
        assert_eq!(
            pixels.len(),
            (width * height) as usize,
            "pixel count does not match {width}x{height}"
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Colour at the given pixel, if it lies inside the surface.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb> {
        if x < self.width && y < self.height {
            self.pixels.get((y * self.width + x) as usize).copied()
        } else {
            None
        }
    }

    /// Overwrites a pixel; writes outside the surface are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgb) {
        if x < self.width && y < self.height {
            if let Some(slot) = self.pixels.get_mut((y * self.width + x) as usize) {
                *slot = color;
            }
        }
    }

    /// Row-major pixel data.
    #[must_use]
    pub fn pixels(&self) -> &[Rgb] {
        &self.pixels
    }
}

/// One bit per tile over the full backing grid.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TileBitmap {
    rows: [u64; MAP_SIZE as usize],
}

impl Default for TileBitmap {
    fn default() -> Self {
        Self::new()
    }
}

impl TileBitmap {
    /// Creates a bitmap with every bit clear.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rows: [0; MAP_SIZE as usize],
        }
    }

    /// Reads the bit for a tile.
    #[must_use]
    pub fn get(&self, tile: TileCoord) -> bool {
        self.rows[tile.y() as usize] & (1u64 << tile.x()) != 0
    }

    /// Writes the bit for a tile.
    pub fn set(&mut self, tile: TileCoord, value: bool) {
        let row = &mut self.rows[tile.y() as usize];
        if value {
            *row |= 1u64 << tile.x();
        } else {
            *row &= !(1u64 << tile.x());
        }
    }

    /// Sets every bit inside the rectangle.
    pub fn fill_rect(&mut self, rect: TileRect, value: bool) {
        for tile in rect.tiles() {
            self.set(tile, value);
        }
    }

    /// Clears every bit.
    pub fn clear_all(&mut self) {
        self.rows = [0; MAP_SIZE as usize];
    }

    /// Sets every bit.
    pub fn set_all(&mut self) {
        self.rows = [u64::MAX; MAP_SIZE as usize];
    }

    /// Number of set bits.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.rows.iter().map(|row| row.count_ones()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn snapshot_round_trips_through_bincode() {
        let snapshot = MapSnapshot {
            width: 32,
            height: 48,
            objects: vec![ObjectRecord {
                catalog: CatalogIndex::new(7).expect("nonzero"),
                tile: TileCoord::new(3, 9),
                rotation: Rotation::Deg270,
                hit_points: Health::new(40),
                flags: InstanceFlags::DOOR,
            }],
            doors: vec![DoorRecord {
                tile: TileCoord::new(3, 9),
                open: true,
            }],
            effects: vec![EffectRecord {
                tile: TileCoord::new(1, 1),
                state: EffectState::Smoke(5),
            }],
        };
        assert_round_trip(&snapshot);
    }

    #[test]
    fn catalog_index_rejects_reserved_zero() {
        assert!(CatalogIndex::new(0).is_none());
        assert_eq!(CatalogIndex::new(12).map(|index| index.get()), Some(12));
    }

    #[test]
    fn mask_rotation_moves_north_clockwise() {
        let north = ConnectivityMask::from_bits(Direction::North.bit());
        assert_eq!(
            north.rotated(Rotation::Deg90).bits(),
            Direction::East.bit()
        );
        assert_eq!(
            north.rotated(Rotation::Deg180).bits(),
            Direction::South.bit()
        );
        assert_eq!(
            north.rotated(Rotation::Deg270).bits(),
            Direction::West.bit()
        );
        assert_eq!(ConnectivityMask::OPEN.rotated(Rotation::Deg90), ConnectivityMask::OPEN);
    }

    #[test]
    fn effect_byte_encoding_is_exclusive() {
        assert_eq!(EffectState::Fire.to_byte(), 0x80);
        assert_eq!(EffectState::Smoke(5).to_byte(), 5);
        assert_eq!(EffectState::from_byte(0x80), EffectState::Fire);
        assert_eq!(EffectState::from_byte(0x7f), EffectState::Smoke(127));
        assert_eq!(EffectState::from_byte(0), EffectState::None);
    }

    #[test]
    #[should_panic(expected = "fire encoded with duration")]
    fn fire_with_duration_is_rejected() {
        let _ = EffectState::from_byte(0x83);
    }

    #[test]
    fn rect_union_and_intersection() {
        let a = TileRect::from_origin_and_size(TileCoord::new(2, 2), 3, 3);
        let b = TileRect::from_origin_and_size(TileCoord::new(4, 0), 2, 4);
        assert_eq!(
            a.intersection(&b),
            Some(TileRect::new(TileCoord::new(4, 2), TileCoord::new(4, 3)))
        );
        assert_eq!(
            a.union(&b),
            TileRect::new(TileCoord::new(2, 0), TileCoord::new(5, 4))
        );
        let far = TileRect::single(TileCoord::new(40, 40));
        assert!(a.intersection(&far).is_none());
        assert_eq!(a.tiles().count(), 9);
    }

    #[test]
    fn tile_offset_stays_on_grid() {
        let corner = TileCoord::new(0, MAP_SIZE - 1);
        assert_eq!(corner.offset(-1, 0), None);
        assert_eq!(corner.offset(0, 1), None);
        assert_eq!(corner.neighbor(Direction::North), Some(TileCoord::new(0, 62)));
        assert_eq!(TileCoord::from_index(corner.index()), corner);
    }

    #[test]
    fn bitmap_tracks_individual_tiles() {
        let mut bitmap = TileBitmap::new();
        bitmap.set(TileCoord::new(63, 63), true);
        bitmap.set(TileCoord::new(0, 5), true);
        assert!(bitmap.get(TileCoord::new(63, 63)));
        assert!(!bitmap.get(TileCoord::new(62, 63)));
        assert_eq!(bitmap.count(), 2);
        bitmap.set(TileCoord::new(0, 5), false);
        assert_eq!(bitmap.count(), 1);
    }

    #[test]
    fn health_damage_saturates_and_respects_sentinel() {
        assert_eq!(Health::new(5).damaged(9), Health::new(0));
        assert_eq!(Health::INDESTRUCTIBLE.damaged(9), Health::INDESTRUCTIBLE);
        assert_eq!(Damage::new(2.0, 1.0, 0.4).total(), 3);
    }
}
