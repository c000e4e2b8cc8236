//! Route synchronization with the host.
//!
//! The host reports route changes with [`RouteChanged`]; the story pushes its
//! own changes through the [`Route`] resource. Our own pushes come back from
//! the host as echoes and are ignored.

use bevy::ecs::message::{Message, MessageReader, MessageWriter};
use bevy::prelude::*;
use edl_core::{NavigationError, Navigator, PushOutcome, RouteBinding, RouteQuery, resolve_route};

use crate::{Mission, Story, clock::Clock, clock::WallClock};

/// The host's route query changed (initial load or history navigation).
#[derive(Message, Debug, Clone, PartialEq, Eq)]
pub struct RouteChanged {
    /// Query string, with or without a leading `?`.
    pub query: String,
}

impl RouteChanged {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }
}

/// A route or carousel request named a phase without a usable time.
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplicitNavigation {
    pub index: usize,
}

/// Binding between story state and the host route.
#[derive(Resource, Debug)]
pub struct Route {
    binding: RouteBinding,
}

impl Route {
    pub fn new(navigator: impl Navigator + 'static) -> Self {
        Self {
            binding: RouteBinding::new(Box::new(navigator)),
        }
    }

    /// The current route, serialized.
    pub fn current(&self) -> Option<&str> {
        self.binding.current()
    }

    /// Push `query` to the host unless it is already current.
    pub fn push(&mut self, query: &RouteQuery) -> PushOutcome {
        self.binding.push(query)
    }
}

/// A navigator that only logs, for hosts without a router.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn navigate(&mut self, query: &str) -> Result<(), NavigationError> {
        tracing::info!("Route: ?{query}");
        Ok(())
    }
}

/// Apply incoming routes to the clock.
pub(crate) fn apply_route_changes(
    mut changes: MessageReader<RouteChanged>,
    mut explicit: MessageWriter<ExplicitNavigation>,
    mut route: ResMut<Route>,
    mut clock: ResMut<Clock>,
    story: Res<Story>,
    mission: Res<Mission>,
    wall_clock: Res<WallClock>,
) {
    for change in changes.read() {
        let query = RouteQuery::parse(&change.query);
        if route.binding.is_current(&query) {
            tracing::debug!("Ignoring echoed route: {}", change.query);
            continue;
        }

        let target = resolve_route(&query, &story.0, &mission.0, wall_clock.now());
        clock.0.set_time(target.time);
        clock.0.set_rate(target.rate);
        route.binding.accept(&query);
        tracing::info!(
            "Route applied: time {:.3}, rate {}",
            clock.0.time(),
            clock.0.rate()
        );

        if target.explicit {
            if let Some(index) = target.phase {
                explicit.write(ExplicitNavigation { index });
            }
        }
    }
}
