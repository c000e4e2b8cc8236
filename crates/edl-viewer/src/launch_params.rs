//! Launch parameter parsing for the demo.
//!
//! On native, parameters are parsed from command-line arguments using clap.
//! On WASM, defaults are used (CLI argument parsing is not available).

use std::path::PathBuf;

/// Default seconds of frame time to run.
const DEFAULT_DURATION: f64 = 30.0;

/// Launch parameters for the demo.
#[derive(Debug, Clone)]
pub struct LaunchParams {
    /// Initial route query, e.g. `id=entry&rate=10`.
    pub route: String,
    /// Story file to load instead of the bundled story.
    pub timeline: Option<PathBuf>,
    /// Seconds of frame time to run.
    pub duration: f64,
    /// Show readouts in metric units.
    pub metric: bool,
    /// Whether the guided camera starts enabled.
    pub guided: bool,
}

impl Default for LaunchParams {
    fn default() -> Self {
        Self {
            route: String::new(),
            timeline: None,
            duration: DEFAULT_DURATION,
            metric: false,
            guided: true,
        }
    }
}

#[cfg(not(target_family = "wasm"))]
mod native {
    use clap::Parser;

    use super::*;

    /// Parse a non-negative, finite number of seconds.
    fn parse_duration(s: &str) -> Result<f64, String> {
        let seconds = s
            .parse::<f64>()
            .map_err(|e| format!("invalid duration: {e}"))?;
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(format!("duration out of range: {seconds}"));
        }
        Ok(seconds)
    }

    #[derive(Parser)]
    #[command(about = "Headless entry, descent and landing story")]
    struct CliArgs {
        /// Initial route query (format: id=<phase>&time=<UTC>&rate=<rate>).
        #[arg(long, default_value = "")]
        route: String,

        /// Story JSON file to load instead of the bundled story.
        #[arg(long)]
        timeline: Option<PathBuf>,

        /// Seconds of frame time to run.
        #[arg(long, default_value_t = DEFAULT_DURATION, value_parser = parse_duration)]
        duration: f64,

        /// Show readouts in metric units.
        #[arg(long)]
        metric: bool,

        /// Start with the guided camera disabled.
        #[arg(long)]
        no_guided: bool,
    }

    pub fn parse() -> LaunchParams {
        let args = CliArgs::parse();
        LaunchParams {
            route: args.route,
            timeline: args.timeline,
            duration: args.duration,
            metric: args.metric,
            guided: !args.no_guided,
        }
    }
}

/// Parse launch parameters from CLI args (native) or use defaults (WASM).
pub fn parse() -> LaunchParams {
    #[cfg(not(target_family = "wasm"))]
    {
        native::parse()
    }
    #[cfg(target_family = "wasm")]
    {
        LaunchParams::default()
    }
}
