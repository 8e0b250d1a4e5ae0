//! Static object catalog loaded once per map.
//!
//! Every placeable object kind is described by a [`CatalogEntry`]: its
//! footprint, the per-sub-cell traversal and visibility masks, hit points,
//! flammability, the alternate masks used while a door stands open, and the
//! light it spawns or represents. Index zero is reserved to mean "no object".

use serde::Deserialize;
use tacmap_core::{CatalogIndex, ConnectivityMask, Health, MAX_CATALOG, MAX_FOOTPRINT};
use thiserror::Error;

const MAX_CELLS: usize = MAX_FOOTPRINT as usize;

/// Footprint of an object measured in tiles before rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Footprint {
    width: u8,
    height: u8,
}

impl Footprint {
    /// Creates a footprint; both dimensions must lie in `1..=6`.
    #[must_use]
    pub fn new(width: u8, height: u8) -> Self {
        assert!(
            (1..=MAX_FOOTPRINT as u8).contains(&width) && (1..=MAX_FOOTPRINT as u8).contains(&height),
            "footprint {width}x{height} outside 1..=6"
        );
        Self { width, height }
    }

    /// Columns covered before rotation.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width as u32
    }

    /// Rows covered before rotation.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height as u32
    }
}

/// Connectivity masks for every sub-cell of a footprint, indexed `[row][column]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubCellMasks {
    cells: [[ConnectivityMask; MAX_CELLS]; MAX_CELLS],
}

impl Default for SubCellMasks {
    fn default() -> Self {
        Self::uniform(ConnectivityMask::OPEN)
    }
}

impl SubCellMasks {
    /// Uses the same mask for every sub-cell.
    #[must_use]
    pub const fn uniform(mask: ConnectivityMask) -> Self {
        Self {
            cells: [[mask; MAX_CELLS]; MAX_CELLS],
        }
    }

    /// Builds masks from rows of raw four-bit values. Missing cells stay open.
    #[must_use]
    pub fn from_rows(rows: &[&[u8]]) -> Self {
        let mut masks = Self::default();
        for (y, row) in rows.iter().enumerate().take(MAX_CELLS) {
            for (x, bits) in row.iter().enumerate().take(MAX_CELLS) {
                masks.cells[y][x] = ConnectivityMask::from_bits(*bits);
            }
        }
        masks
    }

    /// Mask of the sub-cell at `(x, y)` in unrotated footprint space.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> ConnectivityMask {
        self.cells[y as usize][x as usize]
    }
}

/// Region of the light atlas holding a light's image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextureRegion {
    /// Left edge in atlas pixels.
    pub x: u32,
    /// Top edge in atlas pixels.
    pub y: u32,
}

/// Light automatically spawned alongside an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LightAttachment {
    /// Catalog entry of the light.
    pub entry: CatalogIndex,
    /// Column offset of the light's origin from the owner's origin.
    pub offset_x: i8,
    /// Row offset of the light's origin from the owner's origin.
    pub offset_y: i8,
}

/// Model names handed to the renderer for each object state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ModelNames {
    /// Model shown while intact (and closed, for doors).
    pub closed: Option<String>,
    /// Model shown while a door stands open.
    pub open: Option<String>,
    /// Model shown by rubble left after destruction.
    pub destroyed: Option<String>,
}

/// Static description of one placeable object kind.
#[derive(Clone, Debug, PartialEq)]
pub struct CatalogEntry {
    name: String,
    footprint: Footprint,
    traversal: SubCellMasks,
    visibility: SubCellMasks,
    open_masks: Option<(SubCellMasks, SubCellMasks)>,
    hit_points: Health,
    flammability: u8,
    models: ModelNames,
    rubble: Option<CatalogIndex>,
    light: Option<LightAttachment>,
    light_texture: Option<TextureRegion>,
}

impl CatalogEntry {
    /// Creates an indestructible, non-flammable, fully open entry.
    #[must_use]
    pub fn new(name: impl Into<String>, footprint: Footprint) -> Self {
        Self {
            name: name.into(),
            footprint,
            traversal: SubCellMasks::default(),
            visibility: SubCellMasks::default(),
            open_masks: None,
            hit_points: Health::INDESTRUCTIBLE,
            flammability: 0,
            models: ModelNames::default(),
            rubble: None,
            light: None,
            light_texture: None,
        }
    }

    /// Sets the closed-state traversal masks.
    #[must_use]
    pub fn with_traversal(mut self, masks: SubCellMasks) -> Self {
        self.traversal = masks;
        self
    }

    /// Sets the closed-state visibility masks.
    #[must_use]
    pub fn with_visibility(mut self, masks: SubCellMasks) -> Self {
        self.visibility = masks;
        self
    }

    /// Marks the entry as a door using the provided open-state masks.
    #[must_use]
    pub fn with_door(mut self, traversal: SubCellMasks, visibility: SubCellMasks) -> Self {
        self.open_masks = Some((traversal, visibility));
        self
    }

    /// Sets the starting hit points.
    #[must_use]
    pub fn with_hit_points(mut self, hit_points: Health) -> Self {
        self.hit_points = hit_points;
        self
    }

    /// Sets the flammability (0 never burns, 255 burns most readily).
    #[must_use]
    pub fn with_flammability(mut self, flammability: u8) -> Self {
        self.flammability = flammability;
        self
    }

    /// Sets the renderer model names.
    #[must_use]
    pub fn with_models(mut self, models: ModelNames) -> Self {
        self.models = models;
        self
    }

    /// Names the entry placed in this object's footprint once it is destroyed.
    #[must_use]
    pub fn with_rubble(mut self, rubble: CatalogIndex) -> Self {
        self.rubble = Some(rubble);
        self
    }

    /// Attaches a light spawned whenever the entry is placed.
    #[must_use]
    pub fn with_light(mut self, light: LightAttachment) -> Self {
        self.light = Some(light);
        self
    }

    /// Marks the entry itself as a light drawn from the given atlas region.
    #[must_use]
    pub fn with_light_texture(mut self, region: TextureRegion) -> Self {
        self.light_texture = Some(region);
        self
    }

    /// Human-readable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unrotated footprint.
    #[must_use]
    pub const fn footprint(&self) -> Footprint {
        self.footprint
    }

    /// Starting hit points.
    #[must_use]
    pub const fn hit_points(&self) -> Health {
        self.hit_points
    }

    /// Flammability in `0..=255`.
    #[must_use]
    pub const fn flammability(&self) -> u8 {
        self.flammability
    }

    /// Renderer model names.
    #[must_use]
    pub fn models(&self) -> &ModelNames {
        &self.models
    }

    /// Entry left behind after destruction.
    #[must_use]
    pub const fn rubble(&self) -> Option<CatalogIndex> {
        self.rubble
    }

    /// Light spawned alongside the object.
    #[must_use]
    pub const fn light(&self) -> Option<LightAttachment> {
        self.light
    }

    /// Atlas region drawn when the entry is a light.
    #[must_use]
    pub const fn light_texture(&self) -> Option<TextureRegion> {
        self.light_texture
    }

    /// Reports whether the object can take damage.
    #[must_use]
    pub const fn can_damage(&self) -> bool {
        !self.hit_points.is_indestructible()
    }

    /// Reports whether the object is a door.
    #[must_use]
    pub const fn is_door(&self) -> bool {
        self.open_masks.is_some()
    }

    /// Reports whether the object is a light.
    #[must_use]
    pub const fn is_light(&self) -> bool {
        self.light_texture.is_some()
    }

    /// Traversal and visibility masks for the requested door state.
    #[must_use]
    pub fn masks(&self, open: bool) -> (&SubCellMasks, &SubCellMasks) {
        match (&self.open_masks, open) {
            (Some((traversal, visibility)), true) => (traversal, visibility),
            _ => (&self.traversal, &self.visibility),
        }
    }
}

/// Catalog of every object kind available to a map.
#[derive(Clone, Debug)]
pub struct Catalog {
    entries: Vec<Option<CatalogEntry>>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: vec![None; MAX_CATALOG],
        }
    }

    /// Installs an entry, replacing any previous definition at that index.
    pub fn insert(&mut self, index: CatalogIndex, entry: CatalogEntry) {
        self.entries[usize::from(index.get())] = Some(entry);
    }

    /// Entry at the provided index, if defined.
    #[must_use]
    pub fn entry(&self, index: CatalogIndex) -> Option<&CatalogEntry> {
        self.entries[usize::from(index.get())].as_ref()
    }

    /// Entry at the provided index.
    ///
    /// Referencing an undefined entry is a programming error.
    #[must_use]
    pub fn get(&self, index: CatalogIndex) -> &CatalogEntry {
        match self.entry(index) {
            Some(entry) => entry,
            None => panic!("catalog index {} is not defined", index.get()),
        }
    }

    /// Reports whether an entry is defined at the index.
    #[must_use]
    pub fn contains(&self, index: CatalogIndex) -> bool {
        self.entry(index).is_some()
    }

    /// Iterates the defined entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = (CatalogIndex, &CatalogEntry)> {
        self.entries.iter().enumerate().filter_map(|(index, entry)| {
            let index = CatalogIndex::new(u8::try_from(index).ok()?)?;
            entry.as_ref().map(|entry| (index, entry))
        })
    }

    /// Parses a catalog from its TOML description and validates cross references.
    pub fn from_toml_str(contents: &str) -> Result<Self, CatalogError> {
        let manifest: Manifest = toml::from_str(contents)?;
        let mut catalog = Self::new();
        for raw in manifest.entry {
            let index = CatalogIndex::new(raw.index).ok_or(CatalogError::ReservedIndex)?;
            if catalog.contains(index) {
                return Err(CatalogError::DuplicateIndex(raw.index));
            }
            let entry = raw.into_entry()?;
            catalog.insert(index, entry);
        }
        catalog.validate()?;
        Ok(catalog)
    }

    /// Checks that every rubble and light reference points at a compatible entry.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for (index, entry) in self.iter() {
            if let Some(rubble) = entry.rubble() {
                let target = self.entry(rubble).ok_or(CatalogError::UnknownReference {
                    index: index.get(),
                    referenced: rubble.get(),
                })?;
                if target.footprint() != entry.footprint() {
                    return Err(CatalogError::RubbleFootprint {
                        index: index.get(),
                        rubble: rubble.get(),
                    });
                }
            }
            if let Some(light) = entry.light() {
                let target = self.entry(light.entry).ok_or(CatalogError::UnknownReference {
                    index: index.get(),
                    referenced: light.entry.get(),
                })?;
                if !target.is_light() {
                    return Err(CatalogError::NotALight {
                        index: index.get(),
                        light: light.entry.get(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Reasons a catalog description may be rejected.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The TOML could not be parsed into the catalog shape.
    #[error("could not parse catalog: {0}")]
    Parse(#[from] toml::de::Error),
    /// An entry used the reserved index zero.
    #[error("catalog index 0 is reserved")]
    ReservedIndex,
    /// Two entries share an index.
    #[error("catalog index {0} defined twice")]
    DuplicateIndex(u8),
    /// A footprint exceeds the supported size.
    #[error("entry {index} footprint {width}x{height} outside 1..=6")]
    Footprint {
        /// Offending entry.
        index: u8,
        /// Declared width.
        width: u8,
        /// Declared height.
        height: u8,
    },
    /// A mask table has more rows or columns than the footprint.
    #[error("entry {index} {table} masks do not fit its footprint")]
    MaskShape {
        /// Offending entry.
        index: u8,
        /// Name of the mask table.
        table: &'static str,
    },
    /// An entry references an index with no definition.
    #[error("entry {index} references undefined entry {referenced}")]
    UnknownReference {
        /// Referencing entry.
        index: u8,
        /// Undefined index.
        referenced: u8,
    },
    /// Rubble must cover exactly the footprint it replaces.
    #[error("entry {index} rubble {rubble} has a different footprint")]
    RubbleFootprint {
        /// Destroyed entry.
        index: u8,
        /// Rubble entry.
        rubble: u8,
    },
    /// An attached light points at an entry without a light texture.
    #[error("entry {index} attaches entry {light}, which is not a light")]
    NotALight {
        /// Owning entry.
        index: u8,
        /// Referenced entry.
        light: u8,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    #[serde(default)]
    entry: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntry {
    index: u8,
    name: String,
    #[serde(default = "unit_size")]
    size: [u8; 2],
    #[serde(default)]
    traversal: Option<Vec<Vec<u8>>>,
    #[serde(default)]
    visibility: Option<Vec<Vec<u8>>>,
    #[serde(default)]
    door: Option<RawDoor>,
    #[serde(default)]
    hit_points: Option<u16>,
    #[serde(default)]
    flammability: u8,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    model_open: Option<String>,
    #[serde(default)]
    model_destroyed: Option<String>,
    #[serde(default)]
    rubble: Option<u8>,
    #[serde(default)]
    light: Option<RawLight>,
    #[serde(default)]
    light_texture: Option<TextureRegion>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDoor {
    #[serde(default)]
    traversal: Option<Vec<Vec<u8>>>,
    #[serde(default)]
    visibility: Option<Vec<Vec<u8>>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLight {
    entry: u8,
    #[serde(default)]
    offset: [i8; 2],
}

fn unit_size() -> [u8; 2] {
    [1, 1]
}

impl RawEntry {
    fn into_entry(self) -> Result<CatalogEntry, CatalogError> {
        let [width, height] = self.size;
        let max = MAX_FOOTPRINT as u8;
        if !(1..=max).contains(&width) || !(1..=max).contains(&height) {
            return Err(CatalogError::Footprint {
                index: self.index,
                width,
                height,
            });
        }
        let footprint = Footprint::new(width, height);
        let index = self.index;
        let table = |rows: Option<Vec<Vec<u8>>>, name| masks_from_rows(index, footprint, rows, name);

        let mut entry = CatalogEntry::new(self.name, footprint)
            .with_traversal(table(self.traversal, "traversal")?)
            .with_visibility(table(self.visibility, "visibility")?)
            .with_flammability(self.flammability)
            .with_models(ModelNames {
                closed: self.model,
                open: self.model_open,
                destroyed: self.model_destroyed,
            });

        if let Some(hit_points) = self.hit_points {
            entry = entry.with_hit_points(Health::new(hit_points));
        }
        if let Some(door) = self.door {
            entry = entry.with_door(
                table(door.traversal, "door traversal")?,
                table(door.visibility, "door visibility")?,
            );
        }
        if let Some(rubble) = self.rubble {
            let rubble = CatalogIndex::new(rubble).ok_or(CatalogError::ReservedIndex)?;
            entry = entry.with_rubble(rubble);
        }
        if let Some(light) = self.light {
            let light_entry = CatalogIndex::new(light.entry).ok_or(CatalogError::ReservedIndex)?;
            entry = entry.with_light(LightAttachment {
                entry: light_entry,
                offset_x: light.offset[0],
                offset_y: light.offset[1],
            });
        }
        if let Some(region) = self.light_texture {
            entry = entry.with_light_texture(region);
        }
        Ok(entry)
    }
}

fn masks_from_rows(
    index: u8,
    footprint: Footprint,
    rows: Option<Vec<Vec<u8>>>,
    table: &'static str,
) -> Result<SubCellMasks, CatalogError> {
    let Some(rows) = rows else {
        return Ok(SubCellMasks::default());
    };
    let too_tall = rows.len() > footprint.height() as usize;
    let too_wide = rows.iter().any(|row| row.len() > footprint.width() as usize);
    if too_tall || too_wide {
        return Err(CatalogError::MaskShape { index, table });
    }
    let borrowed: Vec<&[u8]> = rows.iter().map(Vec::as_slice).collect();
    Ok(SubCellMasks::from_rows(&borrowed))
}
