//! Headless entry, descent and landing story.
//!
//! Runs the story engine against a stand-in scene for a fixed amount of frame
//! time, logging phase changes, route pushes and readouts.

mod demo;
mod launch_params;

use std::process::ExitCode;
use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use demo::DemoScenePlugin;
use edl_core::{MissionConfig, Timeline, UnitSystem};
use edl_viewer::{
    DEFAULT_STORY, EdlPlugin,
    clock::Clock,
    guided_camera::GuidedModeToggled,
    narration::UnitsChanged,
    route::{LoggingNavigator, Route, RouteChanged},
};
use launch_params::LaunchParams;

/// Frame time advanced per update.
const FRAME_TIME: Duration = Duration::from_millis(50);

/// Load the story named by the launch parameters, or the bundled one.
fn load_story(params: &LaunchParams, config: &MissionConfig) -> Result<Timeline, String> {
    let Some(path) = &params.timeline else {
        return Timeline::from_json(DEFAULT_STORY, config.epoch).map_err(|e| e.to_string());
    };
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    Timeline::from_json(&json, config.epoch).map_err(|e| format!("{}: {e}", path.display()))
}

fn main() -> ExitCode {
    // Initialize tracing for native platforms.
    #[cfg(not(target_family = "wasm"))]
    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    // Initialize tracing for WASM (logs to browser console).
    #[cfg(target_family = "wasm")]
    {
        console_error_panic_hook::set_once();
        tracing_wasm::set_as_global_default();
    }

    let params = launch_params::parse();
    let config = MissionConfig::default();
    let timeline = match load_story(&params, &config) {
        Ok(timeline) => timeline,
        Err(e) => {
            tracing::error!("Failed to load story: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .insert_resource(TimeUpdateStrategy::ManualDuration(FRAME_TIME))
        .add_plugins((EdlPlugin::new(timeline, config), DemoScenePlugin))
        .insert_resource(Route::new(LoggingNavigator));

    let world = app.world_mut();
    if params.metric {
        world.write_message(UnitsChanged {
            units: UnitSystem::Metric,
        });
    }
    if !params.guided {
        world.write_message(GuidedModeToggled { enabled: false });
    }
    world.write_message(RouteChanged::new(params.route));

    app.finish();
    app.cleanup();

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let frames = (params.duration / FRAME_TIME.as_secs_f64()).ceil() as u64;
    for _ in 0..frames {
        app.update();
    }

    let clock = &app.world().resource::<Clock>().0;
    tracing::info!(
        "Finished after {frames} frames at time {:.3}, rate {}",
        clock.time(),
        clock.rate()
    );
    ExitCode::SUCCESS
}
