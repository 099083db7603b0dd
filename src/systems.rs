use bevy::log::{error, info, warn};
use bevy::prelude::*;

use crate::colony::SimulationState;
use crate::components::*;
use crate::pheromones::Field;

/// Stop condition and report cadence for a headless run.
#[derive(Resource, Debug, Clone, Copy)]
pub struct RunLimit {
    /// `None` runs until the app is closed.
    pub max_steps: Option<u64>,
    /// Steps between progress reports; 0 disables them.
    pub report_interval: u64,
}

impl Default for RunLimit {
    fn default() -> Self {
        Self {
            max_steps: None,
            report_interval: 100,
        }
    }
}

/// Drives a [`SimulationState`] resource from bevy's schedule, using ant
/// entities' transforms as the particle store.
pub struct ForagingPlugin;

impl Plugin for ForagingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RunLimit>()
            .add_systems(Startup, spawn_colony)
            .add_systems(
                Update,
                (
                    foraging_step_system,
                    movement_system,
                    colony_report_system,
                    run_limit_system,
                )
                    .chain(),
            );
    }
}

pub fn spawn_colony(mut commands: Commands, state: Res<SimulationState>) {
    let positions = state.spawn_positions();
    let count = positions.len();
    for (index, position) in positions.into_iter().enumerate() {
        commands.spawn((
            Transform::from_xyz(position.x, position.y, 0.0),
            Ant { index },
            Velocity::default(),
        ));
    }
    info!(ants = count, "Spawned colony at nest");
}

pub fn foraging_step_system(
    mut state: ResMut<SimulationState>,
    mut ants: Query<(&Ant, &Transform, &mut Velocity)>,
) {
    let mut slots = vec![None; state.ants().len()];
    for (ant, transform, _) in ants.iter() {
        if let Some(slot) = slots.get_mut(ant.index) {
            *slot = Some(transform.translation.truncate());
        }
    }
    let Some(positions) = slots.into_iter().collect::<Option<Vec<Vec2>>>() else {
        warn!("Ant entities out of step with colony state, skipping step");
        return;
    };

    match state.step(&positions) {
        Ok(updates) => {
            for (ant, _, mut velocity) in ants.iter_mut() {
                if let Some(update) = updates.get(ant.index) {
                    *velocity = update.displacement.into();
                }
            }
        }
        Err(err) => error!("Foraging step failed: {err}"),
    }
}

/// Applies each ant's displacement, wrapping around the world edges.
pub fn movement_system(
    mut ants: Query<(&mut Transform, &Velocity), With<Ant>>,
    state: Res<SimulationState>,
) {
    let width = state.config().world_width as f32;
    let height = state.config().world_height as f32;

    for (mut transform, velocity) in ants.iter_mut() {
        transform.translation.x = (transform.translation.x + velocity.x).rem_euclid(width);
        transform.translation.y = (transform.translation.y + velocity.y).rem_euclid(height);
    }
}

pub fn colony_report_system(state: Res<SimulationState>, limit: Res<RunLimit>) {
    let stats = state.stats();
    if limit.report_interval == 0 || stats.steps % limit.report_interval != 0 {
        return;
    }
    info!(
        step = stats.steps,
        carriers = state.carrier_count(),
        pickups = stats.pickups,
        deliveries = stats.deliveries,
        food_scent = state.field(Field::ToFood).total_intensity(),
        nest_scent = state.field(Field::ToNest).total_intensity(),
        "Colony report"
    );
}

pub fn run_limit_system(
    state: Res<SimulationState>,
    limit: Res<RunLimit>,
    mut exit: EventWriter<AppExit>,
) {
    if let Some(max_steps) = limit.max_steps {
        if state.stats().steps >= max_steps {
            info!(steps = max_steps, "Step limit reached");
            exit.send(AppExit::Success);
        }
    }
}
