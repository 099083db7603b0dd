use bevy::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AntBehavior {
    Searching, // looking for food
    Returning, // carrying food home
}

/// Per-ant state kept by the simulation. Positions live with the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AntState {
    pub direction: Vec2,
    pub carrying_food: bool,
}

impl AntState {
    pub fn searching(direction: Vec2) -> Self {
        Self {
            direction,
            carrying_food: false,
        }
    }

    pub fn behavior(&self) -> AntBehavior {
        if self.carrying_food {
            AntBehavior::Returning
        } else {
            AntBehavior::Searching
        }
    }
}

/// What one step decided for a single ant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AntUpdate {
    pub direction: Vec2,
    /// Add this to the ant's position.
    pub displacement: Vec2,
    pub carrying_food: bool,
}

/// Links an entity to its slot in the simulation's ant array.
#[derive(Component, Debug, Clone, Copy)]
pub struct Ant {
    pub index: usize,
}

#[derive(Component, Default, Debug, Clone, Copy)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

impl From<Vec2> for Velocity {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}
