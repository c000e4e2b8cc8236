//! Telemetry readout formatting for the story panel.
//!
//! Scene distances are kilometers and speeds kilometers per second.

const KM_PER_MILE: f64 = 1.609_344;
const FEET_PER_KM: f64 = 3_280.839_895;
const SECONDS_PER_HOUR: f64 = 3600.0;

/// Unit system for displayed readouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnitSystem {
    Metric,
    #[default]
    Imperial,
}

/// Format a distance, switching to the minor unit below one major unit.
#[must_use]
pub fn format_distance(km: f64, units: UnitSystem) -> String {
    match units {
        UnitSystem::Metric => {
            if km.abs() < 1.0 {
                format!("{:.0} m", km * 1000.0)
            } else {
                format!("{} km", group_thousands(km, 1))
            }
        }
        UnitSystem::Imperial => {
            let miles = km / KM_PER_MILE;
            if miles.abs() < 1.0 {
                format!("{:.0} ft", km * FEET_PER_KM)
            } else {
                format!("{} mi", group_thousands(miles, 1))
            }
        }
    }
}

/// Format a speed given in kilometers per second.
#[must_use]
pub fn format_speed(km_per_s: f64, units: UnitSystem) -> String {
    let km_per_h = km_per_s * SECONDS_PER_HOUR;
    match units {
        UnitSystem::Metric => format!("{} km/h", group_thousands(km_per_h, 0)),
        UnitSystem::Imperial => format!("{} mph", group_thousands(km_per_h / KM_PER_MILE, 0)),
    }
}

/// Format a time delta as `HH:MM:SS`, floored. Negative deltas show zero.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_countdown(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Format `value` with `decimals` places and comma-separated thousands.
fn group_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (integer, fraction) = match formatted.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(formatted.len() + integer.len() / 3 + 1);
    if value.is_sign_negative() && formatted.chars().any(|c| c.is_ascii_digit() && c != '0') {
        grouped.push('-');
    }
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    grouped
}
