//! Headless generation runner.
//!
//! Runs one generation pass and exits; useful for profiling and for
//! checking a seed's layout counts without a renderer attached.

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;

use gridtown::procgen::ProcgenPlugin;

fn main() {
    App::new()
        .add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_once()))
        .add_plugins(LogPlugin::default())
        .add_plugins(ProcgenPlugin)
        .run();
}
