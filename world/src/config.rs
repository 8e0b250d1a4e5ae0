//! Tuning knobs for the fire simulation, the solver and the light compositor.

use serde::Deserialize;
use tacmap_core::{Rgb, MAX_SMOKE_DURATION};
use thiserror::Error;

/// Aggregated tuning applied when constructing a [`crate::World`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    /// Seed for the fire-spread random stream.
    pub seed: u64,
    /// Hit points a burning tile removes from each damageable occupant per sub-turn.
    pub fire_damage: u16,
    /// Sub-turns of smoke left behind when a fire runs out of fuel.
    pub smoke_after_fire: u8,
    /// Maps an object's flammability to its chance of catching fire.
    pub ignition: IgnitionCurve,
    /// Scales the ignition chance per point of incendiary damage.
    pub incendiary_ignition_scale: f32,
    /// Vertices a single path search may expand before giving up.
    pub solver_node_budget: usize,
    /// Colour forced onto unseen tiles in the fogged light map.
    pub fog_ambient: Rgb,
    /// Light added to every burning tile.
    pub fire_glow: Rgb,
    /// Radius used by `query::observable_tiles`.
    pub eyesight_range: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 0x0f1e_5eed_2b79_f5d1,
            fire_damage: 10,
            smoke_after_fire: 4,
            ignition: IgnitionCurve::default(),
            incendiary_ignition_scale: 0.02,
            solver_node_budget: tacmap_pather::DEFAULT_NODE_BUDGET,
            fog_ambient: Rgb::new(0x30, 0x30, 0x40),
            fire_glow: Rgb::new(0x60, 0x30, 0x00),
            eyesight_range: 13,
        }
    }
}

impl WorldConfig {
    /// Parses and validates a TOML configuration. Missing keys keep their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every field against the ranges the simulation can represent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.smoke_after_fire == 0 || self.smoke_after_fire > MAX_SMOKE_DURATION {
            return Err(ConfigError::SmokeDuration(self.smoke_after_fire));
        }
        if !(self.ignition.scale >= 0.0 && self.ignition.scale <= 1.0) {
            return Err(ConfigError::IgnitionScale(self.ignition.scale));
        }
        if !(self.ignition.exponent > 0.0) {
            return Err(ConfigError::IgnitionExponent(self.ignition.exponent));
        }
        if self.solver_node_budget == 0 {
            return Err(ConfigError::NodeBudget);
        }
        Ok(())
    }
}

/// Flammability-to-probability curve: `scale * (flammability / 255) ^ exponent`.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IgnitionCurve {
    /// Probability assigned to a maximally flammable object.
    pub scale: f32,
    /// Curve shape; values above one favour highly flammable objects.
    pub exponent: f32,
}

impl Default for IgnitionCurve {
    fn default() -> Self {
        Self {
            scale: 0.5,
            exponent: 1.0,
        }
    }
}

impl IgnitionCurve {
    /// Chance in `0.0..=1.0` that an object with the given flammability ignites.
    #[must_use]
    pub fn probability(&self, flammability: u8) -> f32 {
        if flammability == 0 {
            return 0.0;
        }
        let normalized = f32::from(flammability) / 255.0;
        (self.scale * normalized.powf(self.exponent)).clamp(0.0, 1.0)
    }
}

/// Reasons a configuration file may be rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The TOML could not be parsed into the configuration shape.
    #[error("could not parse world config: {0}")]
    Parse(#[from] toml::de::Error),
    /// The smoke duration cannot be encoded.
    #[error("smoke_after_fire must lie in 1..=127, got {0}")]
    SmokeDuration(u8),
    /// The ignition scale is not a probability.
    #[error("ignition scale must lie in 0.0..=1.0, got {0}")]
    IgnitionScale(f32),
    /// The ignition exponent is not positive.
    #[error("ignition exponent must be positive, got {0}")]
    IgnitionExponent(f32),
    /// The solver would not be allowed to expand any vertex.
    #[error("solver_node_budget must be positive")]
    NodeBudget,
}
