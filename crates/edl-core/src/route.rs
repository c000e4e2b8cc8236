//! Shareable route queries and the binding that keeps them in sync with the
//! clock.
//!
//! A route query carries `id` (phase id), `time` (UTC string or raw epoch
//! seconds) and `rate`. The binding only navigates when the serialized query
//! actually changes, which is what stops a clock update from bouncing back
//! through the router as a new clock update.

use std::{
    fmt,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, NaiveDateTime, SecondsFormat};

use crate::{
    clock::{DEFAULT_RATE, validate_rate},
    config::MissionConfig,
    error::{Error, Result},
    timeline::Timeline,
};

/// Naive formats accepted for `time`, interpreted as UTC.
const NAIVE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Route query values, as they appear in the URL (decoded).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteQuery {
    pub id: Option<String>,
    pub time: Option<String>,
    pub rate: Option<String>,
}

impl RouteQuery {
    /// Build a query from typed state. `time` is omitted when `None`.
    #[must_use]
    pub fn from_state(id: &str, time: Option<f64>, rate: f64) -> Self {
        Self {
            id: Some(id.to_string()),
            time: time.map(format_route_time),
            rate: Some(format_rate(rate)),
        }
    }

    /// Parse a query string such as `?id=entry&rate=5`. Unknown keys and
    /// undecodable values are ignored.
    #[must_use]
    pub fn parse(query: &str) -> Self {
        let mut parsed = Self::default();
        let query = query.trim().trim_start_matches('?');
        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = match urlencoding::decode(value) {
                Ok(value) => value.into_owned(),
                Err(e) => {
                    tracing::warn!("Ignoring undecodable route value for '{key}': {e}");
                    continue;
                }
            };
            if value.is_empty() {
                continue;
            }
            match key {
                "id" => parsed.id = Some(value),
                "time" => parsed.time = Some(value),
                "rate" => parsed.rate = Some(value),
                _ => {}
            }
        }
        parsed
    }

    /// Serialize as `id=..&time=..&rate=..`, skipping absent values.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        [("id", &self.id), ("time", &self.time), ("rate", &self.rate)]
            .into_iter()
            .filter_map(|(key, value)| {
                value
                    .as_ref()
                    .map(|value| format!("{key}={}", urlencoding::encode(value)))
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl fmt::Display for RouteQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query_string())
    }
}

/// Format a time as RFC 3339 UTC, rounded to the millisecond.
///
/// Falls back to raw epoch seconds for times chrono cannot represent.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn format_route_time(time: f64) -> String {
    let millis = (time * 1000.0).round() as i64;
    match DateTime::from_timestamp_millis(millis) {
        Some(datetime) => datetime.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => format!("{time}"),
    }
}

/// Parse a route `time` value: raw epoch seconds, an RFC 3339 string, or a
/// naive date-time assumed to be UTC.
#[allow(clippy::cast_precision_loss)]
pub fn parse_route_time(raw: &str) -> Result<f64> {
    let raw = raw.trim();
    if let Ok(seconds) = raw.parse::<f64>() {
        if seconds.is_finite() {
            return Ok(seconds);
        }
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Ok(datetime.timestamp() as f64 + f64::from(datetime.timestamp_subsec_nanos()) / 1e9);
    }
    for format in NAIVE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            let datetime = naive.and_utc();
            return Ok(
                datetime.timestamp() as f64 + f64::from(datetime.timestamp_subsec_nanos()) / 1e9
            );
        }
    }
    Err(Error::InvalidTime {
        input: raw.to_string(),
    })
}

/// Format a rate for the route. Integral rates print without a fraction.
#[must_use]
pub fn format_rate(rate: f64) -> String {
    let rate = if rate == 0.0 { 0.0 } else { rate };
    format!("{rate}")
}

/// Parse a route `rate`, accepting only the allowed playback rates.
#[must_use]
pub fn parse_rate(raw: Option<&str>) -> f64 {
    raw.and_then(|raw| raw.trim().parse::<f64>().ok())
        .map_or(DEFAULT_RATE, validate_rate)
}

/// Clock and narration state an incoming route resolves to.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteTarget {
    /// Simulated time to jump to.
    pub time: f64,
    /// Playback rate.
    pub rate: f64,
    /// Phase index named by the route, if any.
    pub phase: Option<usize>,
    /// True when the route navigates to a phase without a usable time.
    pub explicit: bool,
}

/// Resolve an incoming query against the timeline.
///
/// Unknown phase ids fall back to the first phase, as an explicit navigation
/// to it. Without a usable time, a named phase resolves to its start; otherwise "now" if it lies within
/// the clock bounds, else the configured default start.
#[must_use]
pub fn resolve_route(
    query: &RouteQuery,
    timeline: &Timeline,
    config: &MissionConfig,
    now: f64,
) -> RouteTarget {
    let phase = query.id.as_deref().map(|id| {
        timeline.index_of(id).unwrap_or_else(|| {
            tracing::warn!("Unknown phase id '{id}' in route, using the first phase");
            0
        })
    });

    let time = query
        .time
        .as_deref()
        .and_then(|raw| match parse_route_time(raw) {
            Ok(time) => Some(time),
            Err(e) => {
                tracing::warn!("Ignoring route time: {e}");
                None
            }
        });

    let rate = parse_rate(query.rate.as_deref());

    match (time, phase) {
        (Some(time), _) => RouteTarget {
            time,
            rate,
            phase,
            explicit: false,
        },
        (None, Some(index)) => RouteTarget {
            time: timeline.display_phase(index).start,
            rate,
            phase,
            explicit: true,
        },
        (None, None) => RouteTarget {
            time: if config.bounds.contains(now) {
                now
            } else {
                config.default_start
            },
            rate,
            phase,
            explicit: false,
        },
    }
}

/// A failed navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationError {
    pub message: String,
}

impl fmt::Display for NavigationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "navigation failed: {}", self.message)
    }
}

impl std::error::Error for NavigationError {}

/// Host router the binding pushes serialized queries to.
pub trait Navigator: Send + Sync {
    /// Replace the current route query.
    fn navigate(&mut self, query: &str) -> std::result::Result<(), NavigationError>;
}

/// A navigator that records every query it is given.
///
/// Clones share the same history.
#[derive(Debug, Clone, Default)]
pub struct MemoryNavigator {
    history: Arc<Mutex<Vec<String>>>,
}

impl MemoryNavigator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All queries navigated to so far, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.history
            .lock()
            .map(|history| history.clone())
            .unwrap_or_default()
    }
}

impl Navigator for MemoryNavigator {
    fn navigate(&mut self, query: &str) -> std::result::Result<(), NavigationError> {
        let mut history = self.history.lock().map_err(|e| NavigationError {
            message: e.to_string(),
        })?;
        history.push(query.to_string());
        Ok(())
    }
}

/// What a push did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The route already matched; nothing was sent.
    Unchanged,
    /// The navigator accepted the new route.
    Navigated,
    /// The navigator failed; only local state is current.
    Failed,
}

/// Tracks the current route and pushes changes to a [`Navigator`].
pub struct RouteBinding {
    current: Option<String>,
    navigator: Box<dyn Navigator>,
}

impl RouteBinding {
    #[must_use]
    pub fn new(navigator: Box<dyn Navigator>) -> Self {
        Self {
            current: None,
            navigator,
        }
    }

    /// The last route pushed or accepted, serialized.
    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Whether `query` serializes to the current route.
    #[must_use]
    pub fn is_current(&self, query: &RouteQuery) -> bool {
        self.current.as_deref() == Some(query.to_query_string().as_str())
    }

    /// Record an incoming route as current without navigating.
    pub fn accept(&mut self, query: &RouteQuery) {
        self.current = Some(query.to_query_string());
    }

    /// Push `query` unless it matches the current route.
    pub fn push(&mut self, query: &RouteQuery) -> PushOutcome {
        let serialized = query.to_query_string();
        if self.current.as_deref() == Some(serialized.as_str()) {
            tracing::debug!("Route unchanged, skipping navigation: {serialized}");
            return PushOutcome::Unchanged;
        }

        match self.navigator.navigate(&serialized) {
            Ok(()) => {
                tracing::debug!("Navigated to route: {serialized}");
                self.current = Some(serialized);
                PushOutcome::Navigated
            }
            Err(e) => {
                tracing::warn!("Keeping local state only: {e}");
                PushOutcome::Failed
            }
        }
    }
}

impl fmt::Debug for RouteBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteBinding")
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::TimeBounds, resolver::resolve_phase_index};

    const STORY: &str = r#"[
        { "id": "separation", "title": "Cruise Stage Separation", "timestamp": -67 },
        { "id": "entry", "title": "Entry", "timestamp": 0 },
        { "id": "parachute", "title": "Parachute Deploy", "timestamp": 240 },
        { "id": "touchdown", "title": "Touchdown", "timestamp": 945 }
    ]"#;

    fn fixture() -> (Timeline, MissionConfig) {
        let config = MissionConfig::default();
        let timeline = Timeline::from_json(STORY, config.epoch).unwrap();
        (timeline, config)
    }

    struct FailingNavigator;

    impl Navigator for FailingNavigator {
        fn navigate(&mut self, _query: &str) -> std::result::Result<(), NavigationError> {
            Err(NavigationError {
                message: "router offline".to_string(),
            })
        }
    }

    #[test]
    fn test_parse_query_string() {
        let query = RouteQuery::parse("?id=entry&time=2021-02-18T20%3A27%3A52.816Z&rate=5&x=1");
        assert_eq!(query.id.as_deref(), Some("entry"));
        assert_eq!(query.time.as_deref(), Some("2021-02-18T20:27:52.816Z"));
        assert_eq!(query.rate.as_deref(), Some("5"));
        assert_eq!(RouteQuery::parse(""), RouteQuery::default());
    }

    #[test]
    fn test_serialize_skips_missing_values() {
        let query = RouteQuery::from_state("entry", None, 1.0);
        assert_eq!(query.to_query_string(), "id=entry&rate=1");

        let query = RouteQuery::from_state("entry", Some(1_613_680_072.816), -60.0);
        assert_eq!(
            query.to_query_string(),
            "id=entry&time=2021-02-18T20%3A27%3A52.816Z&rate=-60"
        );
    }

    #[test]
    fn test_parse_route_time_forms() {
        let expected = 1_613_680_072.816;
        for raw in [
            "2021-02-18T20:27:52.816Z",
            "2021-02-18T21:27:52.816+01:00",
            "2021-02-18T20:27:52.816",
            "2021-02-18 20:27:52.816",
            "1613680072.816",
        ] {
            let parsed = parse_route_time(raw).unwrap();
            assert!((parsed - expected).abs() < 1e-3, "{raw} parsed to {parsed}");
        }
        assert!(matches!(
            parse_route_time("yesterday"),
            Err(Error::InvalidTime { .. })
        ));
        assert!(parse_route_time("inf").is_err());
    }

    #[test]
    fn test_parse_rate_allow_list() {
        assert_eq!(parse_rate(Some("60")), 60.0);
        assert_eq!(parse_rate(Some("-5")), -5.0);
        assert_eq!(parse_rate(Some("7")), DEFAULT_RATE);
        assert_eq!(parse_rate(Some("fast")), DEFAULT_RATE);
        assert_eq!(parse_rate(None), DEFAULT_RATE);
    }

    #[test]
    fn test_resolve_id_without_time_is_explicit() {
        let (timeline, config) = fixture();
        let query = RouteQuery::parse("id=parachute");
        let target = resolve_route(&query, &timeline, &config, 0.0);
        assert!(target.explicit);
        assert_eq!(target.phase, Some(2));
        assert_eq!(target.time, timeline.get(2).unwrap().start);
    }

    #[test]
    fn test_resolve_unknown_id_falls_back_to_first_phase() {
        let (timeline, config) = fixture();
        let query = RouteQuery::parse("id=nonexistent");
        let target = resolve_route(&query, &timeline, &config, 0.0);
        assert_eq!(target.phase, Some(0));
        assert_eq!(target.time, timeline.first_start());
        assert!(target.explicit);
    }

    #[test]
    fn test_resolve_invalid_time_uses_phase_start() {
        let (timeline, config) = fixture();
        let query = RouteQuery::parse("id=entry&time=garbage");
        let target = resolve_route(&query, &timeline, &config, 0.0);
        assert_eq!(target.time, config.epoch);
        assert!(target.explicit);
    }

    #[test]
    fn test_resolve_empty_query_uses_now_or_default() {
        let (timeline, config) = fixture();
        let inside = config.epoch + 10.0;
        let target = resolve_route(&RouteQuery::default(), &timeline, &config, inside);
        assert_eq!(target.time, inside);
        assert!(!target.explicit);

        let target = resolve_route(&RouteQuery::default(), &timeline, &config, 0.0);
        assert_eq!(target.time, config.default_start);
    }

    #[test]
    fn test_round_trip_preserves_phase_and_time() {
        let (timeline, config) = fixture();
        let bounds: TimeBounds = config.bounds;
        let time = config.epoch + 300.123_456;
        let index = resolve_phase_index(time, 5.0, 0, timeline.starts(), bounds);
        let phase = timeline.display_phase(index);

        let navigator = MemoryNavigator::new();
        let mut binding = RouteBinding::new(Box::new(navigator.clone()));
        binding.push(&RouteQuery::from_state(&phase.id, Some(time), 5.0));

        let pushed = navigator.history().pop().unwrap();
        let target = resolve_route(&RouteQuery::parse(&pushed), &timeline, &config, 0.0);
        assert!((target.time - time).abs() < 1.0);
        assert_eq!(target.rate, 5.0);
        assert_eq!(
            resolve_phase_index(target.time, target.rate, 0, timeline.starts(), bounds),
            index
        );
    }

    #[test]
    fn test_identical_push_is_noop() {
        let navigator = MemoryNavigator::new();
        let mut binding = RouteBinding::new(Box::new(navigator.clone()));
        let query = RouteQuery::from_state("entry", None, 1.0);

        assert_eq!(binding.push(&query), PushOutcome::Navigated);
        assert_eq!(binding.push(&query.clone()), PushOutcome::Unchanged);
        assert_eq!(navigator.history().len(), 1);
        assert!(binding.is_current(&RouteQuery::parse("id=entry&rate=1")));
    }

    #[test]
    fn test_failed_push_keeps_previous_route() {
        let mut binding = RouteBinding::new(Box::new(FailingNavigator));
        let query = RouteQuery::from_state("entry", None, 1.0);
        assert_eq!(binding.push(&query), PushOutcome::Failed);
        assert_eq!(binding.current(), None);
    }

    #[test]
    fn test_accept_marks_incoming_as_current() {
        let navigator = MemoryNavigator::new();
        let mut binding = RouteBinding::new(Box::new(navigator.clone()));
        let incoming = RouteQuery::parse("id=entry&rate=5");
        binding.accept(&incoming);
        assert_eq!(binding.push(&incoming), PushOutcome::Unchanged);
        assert!(navigator.history().is_empty());
    }
}
