//! Agent state and movement along its route

use std::collections::HashSet;

use log::debug;

use super::error::SimError;
use super::replan::constrained_bfs;
use super::road_network::RoadNetwork;
use super::types::{AgentId, Coord, GatePair, LocationId};

/// Stall bookkeeping for agents that replan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmartState {
    pub stalled: u32,
    pub threshold: u32,
}

/// Result of a replanning attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplanOutcome {
    /// A new route was committed, starting at the current cell
    Rerouted,
    /// The destination is cut off for now; the old route is kept
    Unreachable,
}

/// An agent walking a fixed route from one location to another
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: AgentId,
    pub src: LocationId,
    pub dst: LocationId,
    /// Cell the trip started from
    pub origin: Coord,
    destination: Coord,
    route: Vec<Coord>,
    index: usize,
    pub spawned_at: u64,
    smart: Option<SmartState>,
}

impl Agent {
    /// Create an agent on the composed route between two locations
    pub fn new(
        id: AgentId,
        src: LocationId,
        dst: LocationId,
        network: &RoadNetwork,
        spawned_at: u64,
    ) -> Result<Self, SimError> {
        let route = network.route(src, dst)?.to_vec();
        let destination = network.location(dst)?.destination;
        Ok(Self {
            id,
            src,
            dst,
            origin: route[0],
            destination,
            route,
            index: 0,
            spawned_at,
            smart: None,
        })
    }

    /// Create an agent on a hand-written route.
    ///
    /// The route must be non-empty and step between edge-sharing cells; it
    /// ends at the agent's destination.
    pub fn with_route(
        id: AgentId,
        src: LocationId,
        dst: LocationId,
        route: Vec<Coord>,
        spawned_at: u64,
    ) -> Result<Self, SimError> {
        if src == dst {
            return Err(SimError::SameLocation(src));
        }
        let (Some(origin), Some(destination)) = (route.first().copied(), route.last().copied())
        else {
            return Err(SimError::NoLaneRoute { src, dst });
        };
        if let Some(pair) = route.windows(2).find(|pair| !pair[0].is_adjacent(&pair[1])) {
            return Err(SimError::RouteNotContiguous {
                from: pair[0],
                to: pair[1],
            });
        }
        Ok(Self {
            id,
            src,
            dst,
            origin,
            destination,
            route,
            index: 0,
            spawned_at,
            smart: None,
        })
    }

    /// Turn on replanning after `threshold` blocked ticks
    pub fn smart(mut self, threshold: u32) -> Self {
        self.smart = Some(SmartState {
            stalled: 0,
            threshold,
        });
        self
    }

    pub fn is_smart(&self) -> bool {
        self.smart.is_some()
    }

    pub fn smart_state(&self) -> Option<SmartState> {
        self.smart
    }

    pub fn current(&self) -> Coord {
        self.route[self.index]
    }

    pub fn next_coord(&self) -> Option<Coord> {
        self.route.get(self.index + 1).copied()
    }

    pub fn destination(&self) -> Coord {
        self.destination
    }

    pub fn route(&self) -> &[Coord] {
        &self.route
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn at_destination(&self) -> bool {
        self.current() == self.destination
    }

    /// Step onto the next cell of the route
    pub fn advance(&mut self) {
        if self.index + 1 < self.route.len() {
            self.index += 1;
        }
        if let Some(state) = &mut self.smart {
            state.stalled = 0;
        }
    }

    /// Count one blocked tick. Returns true once the stall count exceeds the
    /// threshold and a replan is due.
    pub fn record_stall(&mut self) -> bool {
        match &mut self.smart {
            Some(state) => {
                state.stalled += 1;
                state.stalled > state.threshold
            }
            None => false,
        }
    }

    /// Search for a way around the closed gates in `blocked`.
    ///
    /// On success the route restarts at the current cell. Either way the
    /// stall count starts over.
    pub fn replan(
        &mut self,
        network: &RoadNetwork,
        blocked: &HashSet<GatePair>,
    ) -> Result<ReplanOutcome, SimError> {
        let through = network.through_transit_for(self.dst);
        let found = constrained_bfs(network, self.current(), self.destination, blocked, through)?;

        if let Some(state) = &mut self.smart {
            state.stalled = 0;
        }

        match found {
            Some(route) => {
                debug!(
                    "Agent {:?} rerouted from {} ({} cells)",
                    self.id,
                    self.current(),
                    route.len()
                );
                self.route = route;
                self.index = 0;
                Ok(ReplanOutcome::Rerouted)
            }
            None => {
                debug!("Agent {:?} cannot reach {} for now", self.id, self.destination);
                Ok(ReplanOutcome::Unreachable)
            }
        }
    }
}
