use bevy::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Neighbor offsets visited by [`PheromoneGrid::sample_neighborhood`].
/// Roulette selection indexes into this order, so it must not change.
pub const NEIGHBOR_OFFSETS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Scent laid by returning ants (points toward food) or by searching ants
/// (points toward the nest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    ToFood,
    ToNest,
}

impl Field {
    /// The field an ant writes to: carriers mark the way to food.
    pub fn deposited_by(carrying_food: bool) -> Self {
        if carrying_food {
            Field::ToFood
        } else {
            Field::ToNest
        }
    }

    /// The field an ant reads from: carriers look for the way home.
    pub fn followed_by(carrying_food: bool) -> Self {
        Self::deposited_by(carrying_food).opposite()
    }

    pub fn opposite(self) -> Self {
        match self {
            Field::ToFood => Field::ToNest,
            Field::ToNest => Field::ToFood,
        }
    }
}

/// How a continuous position picks its grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CellMapping {
    #[default]
    Round,
    Floor,
}

impl CellMapping {
    fn apply(self, coord: f32) -> i64 {
        match self {
            CellMapping::Round => coord.round() as i64,
            CellMapping::Floor => coord.floor() as i64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PheromoneCell {
    pub direction: Vec2,
    /// Always within `[0, 1]`.
    pub intensity: f32,
}

/// The eight cells around a sampled position, in [`NEIGHBOR_OFFSETS`] order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Neighborhood {
    pub intensities: [f32; 8],
    pub directions: [Vec2; 8],
}

impl Neighborhood {
    pub fn total_intensity(&self) -> f32 {
        self.intensities.iter().sum()
    }
}

/// Toroidal grid of scent cells, one cell per world unit.
#[derive(Debug, Clone)]
pub struct PheromoneGrid {
    width: u32,
    height: u32,
    cells: Vec<PheromoneCell>,
}

impl PheromoneGrid {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(SimError::InvalidConfig(
                "pheromone grid dimensions must be non-zero",
            ));
        }
        Ok(Self {
            width,
            height,
            cells: vec![PheromoneCell::default(); width as usize * height as usize],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major cells, for renderers.
    pub fn cells(&self) -> &[PheromoneCell] {
        &self.cells
    }

    /// Cell at integer coordinates; any coordinate wraps around the torus.
    pub fn get(&self, x: i64, y: i64) -> PheromoneCell {
        self.cells[self.wrapped_index(x, y)]
    }

    /// Grid coordinates of the cell `position` resolves to under `mapping`.
    pub fn cell_at(&self, position: Vec2, mapping: CellMapping) -> (u32, u32) {
        let x = mapping.apply(position.x).rem_euclid(self.width as i64);
        let y = mapping.apply(position.y).rem_euclid(self.height as i64);
        (x as u32, y as u32)
    }

    fn wrapped_index(&self, x: i64, y: i64) -> usize {
        let x = x.rem_euclid(self.width as i64) as usize;
        let y = y.rem_euclid(self.height as i64) as usize;
        y * self.width as usize + x
    }

    /// Scales every intensity by `rate`. Directions are untouched.
    pub fn decay(&mut self, rate: f32) {
        self.cells
            .par_iter_mut()
            .for_each(|cell| cell.intensity *= rate);
    }

    /// Reads the eight cells surrounding the floored position.
    pub fn sample_neighborhood(&self, position: Vec2) -> Neighborhood {
        // Wrap before offsetting; huge coordinates saturate the cast.
        let cx = (position.x.floor() as i64).rem_euclid(self.width as i64);
        let cy = (position.y.floor() as i64).rem_euclid(self.height as i64);
        let mut sample = Neighborhood::default();
        for (i, &(dx, dy)) in NEIGHBOR_OFFSETS.iter().enumerate() {
            let cell = self.get(cx + dx, cy + dy);
            sample.intensities[i] = cell.intensity;
            sample.directions[i] = cell.direction;
        }
        sample
    }

    /// Lays `amount` of scent at `position`, pointing back along `incoming`.
    ///
    /// The stored direction is the intensity-weighted blend of the existing
    /// direction and the new one. The weights use the unclamped sum, so a
    /// saturated cell still turns toward fresh deposits.
    pub fn deposit(&mut self, position: Vec2, incoming: Vec2, amount: f32, mapping: CellMapping) {
        let (x, y) = self.cell_at(position, mapping);
        let idx = y as usize * self.width as usize + x as usize;
        let cell = &mut self.cells[idx];

        let pher_direction = -incoming;
        let blend_total = cell.intensity + amount;
        let direction = if blend_total > 0.0 {
            let blended = cell.direction * (cell.intensity / blend_total)
                + pher_direction * (amount / blend_total);
            // Opposing deposits of equal weight cancel out.
            blended.try_normalize().unwrap_or(pher_direction)
        } else {
            pher_direction
        };

        cell.intensity = (cell.intensity + amount).min(1.0);
        cell.direction = direction;
    }

    pub fn total_intensity(&self) -> f32 {
        self.cells.par_iter().map(|cell| cell.intensity).sum()
    }

    pub fn clear(&mut self) {
        self.cells.fill(PheromoneCell::default());
    }
}

/// The to-food and to-nest fields, always the same size.
#[derive(Debug, Clone)]
pub struct PheromoneFields {
    to_food: PheromoneGrid,
    to_nest: PheromoneGrid,
}

impl PheromoneFields {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        Ok(Self {
            to_food: PheromoneGrid::new(width, height)?,
            to_nest: PheromoneGrid::new(width, height)?,
        })
    }

    pub fn get(&self, field: Field) -> &PheromoneGrid {
        match field {
            Field::ToFood => &self.to_food,
            Field::ToNest => &self.to_nest,
        }
    }

    pub fn get_mut(&mut self, field: Field) -> &mut PheromoneGrid {
        match field {
            Field::ToFood => &mut self.to_food,
            Field::ToNest => &mut self.to_nest,
        }
    }

    pub fn decay(&mut self, rate: f32) {
        self.to_food.decay(rate);
        self.to_nest.decay(rate);
    }

    pub fn clear(&mut self) {
        self.to_food.clear();
        self.to_nest.clear();
    }
}
