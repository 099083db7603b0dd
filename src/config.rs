use std::f32::consts::PI;
use std::fs;
use std::path::Path;

use bevy::log::info;
use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::pheromones::CellMapping;

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub world_width: u32,
    pub world_height: u32,
    pub agent_count: usize,

    // Landmarks
    pub food_count: usize,
    pub nest_radius: f32,
    pub food_radius_min: f32,
    pub food_radius_max: f32,

    // Pheromone parameters
    pub decay_rate: f32,
    pub deposit_amount: f32,
    pub deposit_mapping: CellMapping,

    // Ant behavior parameters
    pub step_speed: f32,
    pub significance_threshold: f32,
    /// Chance of jittering a direction picked from the scent field.
    pub follow_turn_probability: f32,
    /// Half-width in radians of that jitter.
    pub follow_turn_angle: f32,
    /// Chance of turning when no scent is present.
    pub wander_turn_probability: f32,
    pub wander_turn_angle: f32,

    pub rng_seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            world_width: 1000,
            world_height: 1000,
            agent_count: 1000,

            food_count: 10,
            nest_radius: 200.0,
            food_radius_min: 100.0,
            food_radius_max: 250.0,

            decay_rate: 0.99,
            deposit_amount: 0.1,
            deposit_mapping: CellMapping::Round,

            step_speed: 3.0,
            significance_threshold: 0.01,
            follow_turn_probability: 0.3,
            follow_turn_angle: 0.5 * PI * 0.2,
            wander_turn_probability: 0.8,
            wander_turn_angle: 0.5 * PI * 0.7,

            rng_seed: None,
        }
    }
}

impl SimConfig {
    /// Parses a JSON document; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Rejects out-of-range values. Nothing is clamped.
    pub fn validate(&self) -> Result<()> {
        if self.world_width == 0 || self.world_height == 0 {
            return Err(SimError::InvalidConfig("world dimensions must be non-zero"));
        }
        if self.agent_count == 0 {
            return Err(SimError::InvalidConfig("agent_count must be non-zero"));
        }
        validate_rates(self.decay_rate, self.deposit_amount)?;
        if !(self.nest_radius.is_finite() && self.nest_radius > 0.0) {
            return Err(SimError::InvalidConfig("nest_radius must be positive"));
        }
        if !(self.food_radius_min.is_finite() && self.food_radius_max.is_finite())
            || self.food_radius_min < 0.0
            || self.food_radius_min > self.food_radius_max
        {
            return Err(SimError::InvalidConfig(
                "food radius range must be non-negative with min <= max",
            ));
        }
        if !(self.step_speed.is_finite() && self.step_speed > 0.0) {
            return Err(SimError::InvalidConfig("step_speed must be positive"));
        }
        if !(self.significance_threshold.is_finite() && self.significance_threshold >= 0.0) {
            return Err(SimError::InvalidConfig(
                "significance_threshold must be non-negative",
            ));
        }
        if !is_probability(self.follow_turn_probability)
            || !is_probability(self.wander_turn_probability)
        {
            return Err(SimError::InvalidConfig(
                "turn probabilities must lie in [0, 1]",
            ));
        }
        if !(self.follow_turn_angle.is_finite() && self.follow_turn_angle >= 0.0)
            || !(self.wander_turn_angle.is_finite() && self.wander_turn_angle >= 0.0)
        {
            return Err(SimError::InvalidConfig("turn angles must be non-negative"));
        }
        Ok(())
    }

    /// Returns the configured RNG, drawing a fresh seed when none is set.
    pub fn seeded_rng(&self) -> (StdRng, u64) {
        let seed = self.rng_seed.unwrap_or_else(rand::random);
        (StdRng::seed_from_u64(seed), seed)
    }

    pub fn log_summary(&self, seed: u64) {
        info!(
            width = self.world_width,
            height = self.world_height,
            ants = self.agent_count,
            food_sources = self.food_count,
            seed,
            "Initialising ant colony"
        );
    }
}

/// Shared by config validation and per-step overrides.
pub(crate) fn validate_rates(decay_rate: f32, deposit_amount: f32) -> Result<()> {
    if !(decay_rate > 0.0 && decay_rate <= 1.0) {
        return Err(SimError::InvalidConfig("decay_rate must lie in (0, 1]"));
    }
    if !(deposit_amount > 0.0 && deposit_amount <= 1.0) {
        return Err(SimError::InvalidConfig("deposit_amount must lie in (0, 1]"));
    }
    Ok(())
}

fn is_probability(value: f32) -> bool {
    (0.0..=1.0).contains(&value)
}
