use std::env;
use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::{error, LogPlugin};
use bevy::prelude::*;

use antsim::{ForagingPlugin, Result, RunLimit, SimConfig, SimError, SimulationState};

const DEFAULT_STEPS: u64 = 5_000;

/// Usage: `antsim [config.json] [steps]`
fn main() -> AppExit {
    let mut app = App::new();
    app.add_plugins((
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::ZERO)),
        LogPlugin::default(),
    ));

    let args: Vec<String> = env::args().skip(1).collect();
    match bootstrap(&args) {
        Ok((state, limit)) => {
            app.insert_resource(state)
                .insert_resource(limit)
                .add_plugins(ForagingPlugin);
            app.run()
        }
        Err(err) => {
            error!("Failed to start colony: {err}");
            AppExit::error()
        }
    }
}

fn bootstrap(args: &[String]) -> Result<(SimulationState, RunLimit)> {
    let config = match args.first() {
        Some(path) => SimConfig::from_json_file(path)?,
        None => SimConfig::default(),
    };
    let max_steps = match args.get(1) {
        Some(raw) => raw
            .parse()
            .map_err(|_| SimError::InvalidConfig("step count must be a non-negative integer"))?,
        None => DEFAULT_STEPS,
    };

    let state = SimulationState::initialize(config)?;
    let limit = RunLimit {
        max_steps: Some(max_steps),
        ..RunLimit::default()
    };
    Ok((state, limit))
}
