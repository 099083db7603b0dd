//! Stigmergic ant foraging on a toroidal grid.
//!
//! Ants lay two decaying scents, one marking the way to food and one the way
//! home, and steer by sampling whichever scent leads to their current goal.
//! The host owns ant positions; [`SimulationState::step`] takes them in and
//! hands back a heading and displacement per ant.

pub mod colony;
pub mod components;
pub mod config;
pub mod error;
pub mod landmarks;
pub mod pheromones;
pub mod systems;

pub use colony::{ForagingStats, SimulationState, FALLBACK_DIRECTION};
pub use components::{Ant, AntBehavior, AntState, AntUpdate, Velocity};
pub use config::SimConfig;
pub use error::{Result, SimError};
pub use landmarks::{FoodSource, Landmarks, Nest};
pub use pheromones::{CellMapping, Field, PheromoneCell, PheromoneFields, PheromoneGrid};
pub use systems::{ForagingPlugin, RunLimit};
