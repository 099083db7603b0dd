//! The foraging loop: decay both scent fields, then move every ant in turn.
//!
//! Each ant checks for a pickup or delivery, picks a heading from the scent
//! around it (or wanders when there is none), lays scent where it is about
//! to step, and reports the heading and displacement back to the host.

use std::f32::consts::TAU;

use bevy::log::{debug, trace};
use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::Rng;

use crate::components::{AntState, AntUpdate};
use crate::config::{validate_rates, SimConfig};
use crate::error::{Result, SimError};
use crate::landmarks::Landmarks;
use crate::pheromones::{Field, PheromoneFields, PheromoneGrid};

/// Heading used whenever a direction would otherwise be zero-length.
pub const FALLBACK_DIRECTION: Vec2 = Vec2::X;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForagingStats {
    pub steps: u64,
    pub pickups: u64,
    pub deliveries: u64,
}

/// Outcome of the landmark check that precedes direction selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub carrying_food: bool,
    /// Unnormalised heading the ant would like to take.
    pub desired_direction: Vec2,
    pub picked_up: bool,
    pub delivered: bool,
}

/// Checks for food, then for the nest, against the updated state. Where a
/// food source overlaps the nest a searching ant picks up and delivers in
/// the same step.
pub fn transition<R: Rng + ?Sized>(
    landmarks: &Landmarks,
    ant: &AntState,
    position: Vec2,
    rng: &mut R,
) -> Transition {
    let mut next = Transition {
        carrying_food: ant.carrying_food,
        desired_direction: ant.direction,
        picked_up: false,
        delivered: false,
    };

    if !next.carrying_food && landmarks.is_on_food(position) {
        next.carrying_food = true;
        next.desired_direction = landmarks.nest().position - position;
        next.picked_up = true;
    }
    if next.carrying_food && landmarks.is_on_nest(position) {
        next.carrying_food = false;
        next.desired_direction = random_unit(rng);
        next.delivered = true;
    }
    next
}

/// Picks a new unit heading from the scent in `grid` around `position`.
///
/// With enough scent nearby, one neighbor is drawn with probability
/// proportional to its intensity and its stored direction is taken, with an
/// occasional small turn. Otherwise `desired` is kept, usually with a larger
/// random turn.
pub fn choose_direction<R: Rng + ?Sized>(
    grid: &PheromoneGrid,
    config: &SimConfig,
    rng: &mut R,
    position: Vec2,
    desired: Vec2,
) -> Vec2 {
    let sample = grid.sample_neighborhood(position);
    let total = sample.total_intensity();

    let chosen = if total > config.significance_threshold {
        let r = rng.gen::<f32>();
        let candidate = sample.directions[roulette_select(&sample.intensities, total, r)];
        if rng.gen::<f32>() < config.follow_turn_probability {
            rotate(candidate, random_turn(rng, config.follow_turn_angle))
        } else {
            candidate
        }
    } else if rng.gen::<f32>() < config.wander_turn_probability {
        rotate(desired, random_turn(rng, config.wander_turn_angle))
    } else {
        desired
    };

    chosen.try_normalize().unwrap_or(FALLBACK_DIRECTION)
}

/// Inverse-CDF draw over eight weights: the first index whose cumulative
/// probability exceeds `r`, or the last index if rounding leaves none.
pub fn roulette_select(intensities: &[f32; 8], total: f32, r: f32) -> usize {
    let mut cumulative = 0.0;
    for (i, &intensity) in intensities.iter().enumerate() {
        cumulative += intensity / total;
        if cumulative > r {
            return i;
        }
    }
    intensities.len() - 1
}

fn random_turn<R: Rng + ?Sized>(rng: &mut R, half_width: f32) -> f32 {
    (rng.gen::<f32>() - 0.5) * 2.0 * half_width
}

fn rotate(v: Vec2, angle: f32) -> Vec2 {
    Vec2::from_angle(angle).rotate(v)
}

fn random_unit<R: Rng + ?Sized>(rng: &mut R) -> Vec2 {
    Vec2::from_angle(rng.gen::<f32>() * TAU)
}

/// Everything one colony owns: both scent fields, the landmarks and the
/// state of every ant. Positions are supplied by the caller on each step.
#[derive(Resource, Debug, Clone)]
pub struct SimulationState {
    config: SimConfig,
    fields: PheromoneFields,
    landmarks: Landmarks,
    ants: Vec<AntState>,
    rng: StdRng,
    seed: u64,
    stats: ForagingStats,
}

impl SimulationState {
    /// Builds zeroed fields, scatters the landmarks and points every ant in
    /// a random direction away from the nest.
    pub fn initialize(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let (mut rng, seed) = config.seeded_rng();
        config.log_summary(seed);

        let fields = PheromoneFields::new(config.world_width, config.world_height)?;
        let landmarks = Landmarks::generate(&config, &mut rng);
        let ants = (0..config.agent_count)
            .map(|_| AntState::searching(random_unit(&mut rng)))
            .collect();

        Ok(Self {
            config,
            fields,
            landmarks,
            ants,
            rng,
            seed,
            stats: ForagingStats::default(),
        })
    }

    /// Replaces the generated landmarks.
    pub fn with_landmarks(mut self, landmarks: Landmarks) -> Self {
        self.landmarks = landmarks;
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn stats(&self) -> ForagingStats {
        self.stats
    }

    pub fn landmarks(&self) -> &Landmarks {
        &self.landmarks
    }

    pub fn fields(&self) -> &PheromoneFields {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut PheromoneFields {
        &mut self.fields
    }

    pub fn field(&self, field: Field) -> &PheromoneGrid {
        self.fields.get(field)
    }

    pub fn ants(&self) -> &[AntState] {
        &self.ants
    }

    pub fn ant_mut(&mut self, index: usize) -> Option<&mut AntState> {
        self.ants.get_mut(index)
    }

    pub fn carrier_count(&self) -> usize {
        self.ants.iter().filter(|ant| ant.carrying_food).count()
    }

    /// Where the host should place each ant before the first step.
    pub fn spawn_positions(&self) -> Vec<Vec2> {
        vec![self.landmarks.nest().position; self.ants.len()]
    }

    /// Clears the scent and sends every ant out again. Landmarks are kept.
    pub fn reset(&mut self) {
        self.fields.clear();
        for ant in &mut self.ants {
            *ant = AntState::searching(random_unit(&mut self.rng));
        }
        self.stats = ForagingStats::default();
        debug!(ants = self.ants.len(), "Colony reset");
    }

    /// Advances one step using the configured decay rate and deposit amount.
    pub fn step(&mut self, positions: &[Vec2]) -> Result<Vec<AntUpdate>> {
        self.step_with(positions, self.config.decay_rate, self.config.deposit_amount)
    }

    /// Advances one step. `positions[i]` is the current position of ant `i`;
    /// the returned updates are in the same order.
    pub fn step_with(
        &mut self,
        positions: &[Vec2],
        decay_rate: f32,
        deposit_amount: f32,
    ) -> Result<Vec<AntUpdate>> {
        validate_rates(decay_rate, deposit_amount)?;
        if positions.len() != self.ants.len() {
            return Err(SimError::PositionCountMismatch {
                expected: self.ants.len(),
                actual: positions.len(),
            });
        }
        if let Some(index) = positions.iter().position(|p| !p.is_finite()) {
            return Err(SimError::NonFinitePosition { index });
        }

        // Decay first so this step's deposits are never decayed.
        self.fields.decay(decay_rate);

        let updates: Vec<AntUpdate> = positions
            .iter()
            .enumerate()
            .map(|(index, &position)| self.advance_ant(index, position, deposit_amount))
            .collect();

        self.stats.steps += 1;
        debug!(
            step = self.stats.steps,
            carriers = self.carrier_count(),
            pickups = self.stats.pickups,
            deliveries = self.stats.deliveries,
            "Foraging step complete"
        );
        Ok(updates)
    }

    fn advance_ant(&mut self, index: usize, position: Vec2, deposit_amount: f32) -> AntUpdate {
        let ant = self.ants[index];
        let next = transition(&self.landmarks, &ant, position, &mut self.rng);
        if next.picked_up {
            self.stats.pickups += 1;
            trace!(ant = index, x = position.x, y = position.y, "Picked up food");
        }
        if next.delivered {
            self.stats.deliveries += 1;
            trace!(ant = index, "Delivered food to nest");
        }

        let direction = choose_direction(
            self.fields.get(Field::followed_by(next.carrying_food)),
            &self.config,
            &mut self.rng,
            position,
            next.desired_direction,
        );
        let displacement = direction * self.config.step_speed;

        self.fields
            .get_mut(Field::deposited_by(next.carrying_food))
            .deposit(
                position + displacement,
                direction,
                deposit_amount,
                self.config.deposit_mapping,
            );

        self.ants[index] = AntState {
            direction,
            carrying_food: next.carrying_food,
        };
        AntUpdate {
            direction,
            displacement,
            carrying_food: next.carrying_food,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::AntBehavior;
    use crate::landmarks::{FoodSource, Nest};
    use crate::pheromones::CellMapping;
    use rand::SeedableRng;

    fn small_config(agent_count: usize) -> SimConfig {
        SimConfig {
            world_width: 100,
            world_height: 100,
            agent_count,
            food_count: 1,
            nest_radius: 10.0,
            food_radius_min: 10.0,
            food_radius_max: 10.0,
            rng_seed: Some(11),
            ..SimConfig::default()
        }
    }

    fn fixed_landmarks() -> Landmarks {
        Landmarks::new(
            vec![FoodSource {
                position: Vec2::new(50.0, 50.0),
                radius: 10.0,
            }],
            Nest {
                position: Vec2::ZERO,
                radius: 10.0,
            },
        )
    }

    #[test]
    fn roulette_picks_first_index_past_draw() {
        let weights = [0.0, 0.2, 0.0, 0.3, 0.0, 0.0, 0.5, 0.0];
        assert_eq!(roulette_select(&weights, 1.0, 0.0), 1);
        assert_eq!(roulette_select(&weights, 1.0, 0.19), 1);
        assert_eq!(roulette_select(&weights, 1.0, 0.2), 3);
        assert_eq!(roulette_select(&weights, 1.0, 0.49), 3);
        assert_eq!(roulette_select(&weights, 1.0, 0.51), 6);
    }

    #[test]
    fn roulette_falls_back_to_last_index() {
        let weights = [0.1; 8];
        // Cumulative sum tops out at 0.8 of the stated total.
        assert_eq!(roulette_select(&weights, 1.0, 0.95), 7);
    }

    #[test]
    fn scentless_neighborhood_keeps_desired_heading_within_wander_cone() {
        let grid = PheromoneGrid::new(20, 20).expect("grid");
        let config = SimConfig::default();
        let mut rng = StdRng::seed_from_u64(5);
        let desired = Vec2::new(0.0, 4.0);
        for _ in 0..200 {
            let chosen = choose_direction(&grid, &config, &mut rng, Vec2::splat(10.0), desired);
            assert!((chosen.length() - 1.0).abs() < 1e-5);
            let angle = chosen.angle_between(Vec2::Y).abs();
            assert!(angle <= config.wander_turn_angle + 1e-4);
        }
    }

    #[test]
    fn wander_disabled_returns_normalised_desired() {
        let grid = PheromoneGrid::new(20, 20).expect("grid");
        let config = SimConfig {
            wander_turn_probability: 0.0,
            ..SimConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(5);
        let chosen = choose_direction(&grid, &config, &mut rng, Vec2::ZERO, Vec2::new(3.0, 4.0));
        assert!((chosen - Vec2::new(0.6, 0.8)).length() < 1e-6);
    }

    #[test]
    fn zero_desired_direction_uses_fallback() {
        let grid = PheromoneGrid::new(20, 20).expect("grid");
        let config = SimConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            let chosen = choose_direction(&grid, &config, &mut rng, Vec2::ONE, Vec2::ZERO);
            assert_eq!(chosen, FALLBACK_DIRECTION);
        }
    }

    #[test]
    fn strong_scent_is_followed() {
        let mut grid = PheromoneGrid::new(20, 20).expect("grid");
        // Single scented neighbor to the right of (10, 10), pointing up.
        grid.deposit(Vec2::new(11.0, 10.0), -Vec2::Y, 0.5, CellMapping::Round);
        let config = SimConfig {
            follow_turn_probability: 0.0,
            ..SimConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(9);
        let chosen = choose_direction(&grid, &config, &mut rng, Vec2::new(10.2, 10.2), -Vec2::X);
        assert!((chosen - Vec2::Y).length() < 1e-6);
    }

    #[test]
    fn followed_scent_turns_stay_small() {
        let mut grid = PheromoneGrid::new(20, 20).expect("grid");
        grid.deposit(Vec2::new(9.0, 9.0), -Vec2::X, 0.5, CellMapping::Round);
        let config = SimConfig {
            follow_turn_probability: 1.0,
            ..SimConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..100 {
            let chosen = choose_direction(&grid, &config, &mut rng, Vec2::splat(10.0), Vec2::Y);
            assert!(chosen.angle_between(Vec2::X).abs() <= config.follow_turn_angle + 1e-4);
        }
    }

    #[test]
    fn pickup_proposes_heading_home() {
        let mut rng = StdRng::seed_from_u64(0);
        let ant = AntState::searching(Vec2::X);
        let next = transition(&fixed_landmarks(), &ant, Vec2::new(50.0, 50.0), &mut rng);
        assert!(next.carrying_food);
        assert!(next.picked_up && !next.delivered);
        assert_eq!(next.desired_direction, Vec2::new(-50.0, -50.0));
    }

    #[test]
    fn delivery_proposes_random_unit_heading() {
        let mut rng = StdRng::seed_from_u64(0);
        let ant = AntState {
            direction: Vec2::X,
            carrying_food: true,
        };
        let next = transition(&fixed_landmarks(), &ant, Vec2::new(3.0, 3.0), &mut rng);
        assert!(!next.carrying_food);
        assert!(next.delivered && !next.picked_up);
        assert!((next.desired_direction.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn overlapping_food_and_nest_picks_up_and_delivers_at_once() {
        let mut rng = StdRng::seed_from_u64(4);
        let landmarks = Landmarks::new(
            vec![FoodSource {
                position: Vec2::new(50.0, 50.0),
                radius: 10.0,
            }],
            Nest {
                position: Vec2::new(50.0, 50.0),
                radius: 10.0,
            },
        );
        let ant = AntState::searching(Vec2::X);
        let next = transition(&landmarks, &ant, Vec2::new(50.0, 50.0), &mut rng);
        assert!(next.picked_up && next.delivered);
        assert!(!next.carrying_food);
        assert!((next.desired_direction.length() - 1.0).abs() < 1e-5);

        let carrier = AntState {
            direction: Vec2::X,
            carrying_food: true,
        };
        assert_eq!(carrier.behavior(), AntBehavior::Returning);
        let next = transition(&landmarks, &carrier, Vec2::new(52.0, 50.0), &mut rng);
        assert!(next.delivered && !next.picked_up);
        assert!(!next.carrying_food);
    }

    #[test]
    fn no_transition_keeps_heading() {
        let mut rng = StdRng::seed_from_u64(0);
        let carrier = AntState {
            direction: Vec2::Y,
            carrying_food: true,
        };
        // Carriers ignore food, searchers ignore the nest.
        let next = transition(&fixed_landmarks(), &carrier, Vec2::new(50.0, 50.0), &mut rng);
        assert!(next.carrying_food);
        assert!(!next.picked_up && !next.delivered);
        assert_eq!(next.desired_direction, Vec2::Y);

        let searcher = AntState::searching(Vec2::Y);
        let next = transition(&fixed_landmarks(), &searcher, Vec2::ZERO, &mut rng);
        assert!(!next.carrying_food);
        assert!(!next.picked_up && !next.delivered);
    }

    #[test]
    fn initialize_places_unit_ants_at_nest() {
        let state = SimulationState::initialize(small_config(16)).expect("state");
        assert_eq!(state.ants().len(), 16);
        assert_eq!(state.seed(), 11);
        let nest = state.landmarks().nest().position;
        assert!(state.spawn_positions().iter().all(|&p| p == nest));
        for ant in state.ants() {
            assert!(!ant.carrying_food);
            assert!((ant.direction.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn initialize_rejects_bad_config() {
        let err = SimulationState::initialize(small_config(0)).unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig(_)));
    }

    #[test]
    fn same_seed_same_trajectory() {
        let mut a = SimulationState::initialize(small_config(8)).expect("state");
        let mut b = SimulationState::initialize(small_config(8)).expect("state");
        let mut positions = a.spawn_positions();
        for _ in 0..30 {
            let ua = a.step(&positions).expect("step");
            let ub = b.step(&positions).expect("step");
            assert_eq!(ua, ub);
            for (p, u) in positions.iter_mut().zip(&ua) {
                *p += u.displacement;
            }
        }
    }

    #[test]
    fn step_rejects_mismatched_positions() {
        let mut state = SimulationState::initialize(small_config(3)).expect("state");
        let err = state.step(&[Vec2::ZERO; 2]).unwrap_err();
        assert!(matches!(
            err,
            SimError::PositionCountMismatch {
                expected: 3,
                actual: 2
            }
        ));
        let err = state
            .step(&[Vec2::ZERO, Vec2::new(f32::NAN, 0.0), Vec2::ZERO])
            .unwrap_err();
        assert!(matches!(err, SimError::NonFinitePosition { index: 1 }));
        assert_eq!(state.stats().steps, 0);
    }

    #[test]
    fn step_rejects_bad_overrides() {
        let mut state = SimulationState::initialize(small_config(1)).expect("state");
        let positions = state.spawn_positions();
        assert!(state.step_with(&positions, 0.0, 0.1).is_err());
        assert!(state.step_with(&positions, 0.9, 0.0).is_err());
        assert!(state.step_with(&positions, 0.9, 0.2).is_ok());
    }

    #[test]
    fn step_deposits_where_the_ant_is_heading() {
        let config = SimConfig {
            wander_turn_probability: 0.0,
            ..small_config(1)
        };
        let mut state = SimulationState::initialize(config)
            .expect("state")
            .with_landmarks(fixed_landmarks());
        *state.ant_mut(0).expect("ant") = AntState::searching(Vec2::X);

        let updates = state.step(&[Vec2::new(30.0, 30.0)]).expect("step");
        assert_eq!(updates[0].direction, Vec2::X);
        assert_eq!(updates[0].displacement, Vec2::new(3.0, 0.0));

        let cell = state.field(Field::ToNest).get(33, 30);
        assert!((cell.intensity - 0.1).abs() < 1e-6);
        assert!((cell.direction + Vec2::X).length() < 1e-6);
        assert_eq!(state.field(Field::ToFood).total_intensity(), 0.0);
    }

    #[test]
    fn reset_clears_scent_and_cargo() {
        let mut state = SimulationState::initialize(small_config(4))
            .expect("state")
            .with_landmarks(fixed_landmarks());
        state.step(&[Vec2::new(50.0, 50.0); 4]).expect("step");
        assert_eq!(state.carrier_count(), 4);
        assert_eq!(state.stats().pickups, 4);

        state.reset();
        assert_eq!(state.carrier_count(), 0);
        assert_eq!(state.stats(), ForagingStats::default());
        assert_eq!(state.field(Field::ToFood).total_intensity(), 0.0);
        assert_eq!(state.landmarks(), &fixed_landmarks());
    }
}
