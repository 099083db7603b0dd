use bevy::prelude::*;
use rand::Rng;

use crate::config::SimConfig;

/// Static, inexhaustible food patch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoodSource {
    pub position: Vec2,
    pub radius: f32,
}

impl FoodSource {
    pub fn contains(&self, point: Vec2) -> bool {
        point.distance(self.position) <= self.radius
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nest {
    pub position: Vec2,
    pub radius: f32,
}

impl Nest {
    pub fn contains(&self, point: Vec2) -> bool {
        point.distance(self.position) <= self.radius
    }
}

/// Food sources and the nest. Fixed for the lifetime of a simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct Landmarks {
    food_sources: Vec<FoodSource>,
    nest: Nest,
}

impl Landmarks {
    pub fn new(food_sources: Vec<FoodSource>, nest: Nest) -> Self {
        Self { food_sources, nest }
    }

    /// Scatters the nest and every food source uniformly over the world.
    pub fn generate<R: Rng + ?Sized>(config: &SimConfig, rng: &mut R) -> Self {
        let width = config.world_width as f32;
        let height = config.world_height as f32;

        let nest = Nest {
            position: Vec2::new(rng.gen::<f32>() * width, rng.gen::<f32>() * height),
            radius: config.nest_radius,
        };

        let radius_span = config.food_radius_max - config.food_radius_min;
        let food_sources = (0..config.food_count)
            .map(|_| FoodSource {
                position: Vec2::new(rng.gen::<f32>() * width, rng.gen::<f32>() * height),
                radius: config.food_radius_min + rng.gen::<f32>() * radius_span,
            })
            .collect();

        Self { food_sources, nest }
    }

    pub fn food_sources(&self) -> &[FoodSource] {
        &self.food_sources
    }

    pub fn nest(&self) -> Nest {
        self.nest
    }

    pub fn is_on_food(&self, position: Vec2) -> bool {
        self.food_sources.iter().any(|food| food.contains(position))
    }

    pub fn is_on_nest(&self, position: Vec2) -> bool {
        self.nest.contains(position)
    }
}
