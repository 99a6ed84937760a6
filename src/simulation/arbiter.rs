//! Per-tick gate arbitration
//!
//! One token per intersection: while anyone is inside, every entry gate is
//! closed; once it empties, the oldest waiting entry crossing gets the only
//! open entry gate and keeps it until its walker is inside.

use anyhow::{Context, Result};
use log::debug;

use super::intersection::Intersection;
use super::road_network::RoadNetwork;
use super::sensing::OccupancyGrid;
use super::types::{Gate, GatePair, GateState, IntersectionId};

#[derive(Debug, Clone)]
pub struct IntersectionArbiter {
    intersections: Vec<Intersection>,
}

impl IntersectionArbiter {
    pub fn new(network: &RoadNetwork) -> Self {
        Self {
            intersections: network.intersections().map(Intersection::new).collect(),
        }
    }

    pub fn intersection(&self, id: IntersectionId) -> Option<&Intersection> {
        self.intersections.iter().find(|intersection| intersection.id == id)
    }

    pub fn intersections(&self) -> &[Intersection] {
        &self.intersections
    }

    /// Recompute every gate from this tick's occupancy and return the full
    /// gate list
    pub fn arbitrate(&mut self, grid: &OccupancyGrid) -> Result<Vec<Gate>> {
        for intersection in &mut self.intersections {
            let updates = plan_gates(intersection, grid);
            intersection
                .controller_mut()
                .apply(&updates)
                .with_context(|| format!("Switching gates of {:?}", intersection.id))?;
        }
        Ok(self.gates())
    }

    /// Current state of every gate, intersection by intersection
    pub fn gates(&self) -> Vec<Gate> {
        self.intersections
            .iter()
            .flat_map(|intersection| intersection.gates().iter().copied())
            .collect()
    }
}

fn plan_gates(intersection: &mut Intersection, grid: &OccupancyGrid) -> Vec<(GatePair, GateState)> {
    let occupied = intersection.interior().any(|cell| grid.is_occupied(*cell));

    // Only the granted entry was open, so whoever is inside now is its walker.
    // Settle that before queueing so a follower on the same cell goes to the back.
    if occupied {
        if let Some(admitted) = intersection.admit() {
            debug!("{:?}: {} stepped in", intersection.id, admitted);
        }
    }

    let waiting: Vec<_> = intersection
        .entries()
        .iter()
        .filter(|entry| grid.is_occupied(entry.coord))
        .map(|entry| entry.coord)
        .collect();
    for coord in waiting {
        if intersection.enqueue(coord) {
            debug!("{:?}: {} queued", intersection.id, coord);
        }
    }

    let mut updates = Vec::with_capacity(intersection.entries().len() + intersection.exits().len());

    if occupied {
        for entry in intersection.entries() {
            updates.push((entry.gate, GateState::Closed));
        }
        for exit in intersection.exits() {
            let state = if grid.is_occupied(exit.coord) {
                GateState::Closed
            } else {
                GateState::Open
            };
            updates.push((exit.gate, state));
        }
        return updates;
    }

    for exit in intersection.exits() {
        updates.push((exit.gate, GateState::Closed));
    }

    // Nobody left on the crossing cell any more
    while let Some(front) = intersection.front() {
        if grid.is_occupied(front) {
            break;
        }
        intersection.dequeue();
        debug!("{:?}: {} no longer waiting", intersection.id, front);
    }

    match intersection.grant_front() {
        None => {
            for entry in intersection.entries() {
                updates.push((entry.gate, GateState::Open));
            }
        }
        Some(granted) => {
            debug!("{:?}: granted entry at {}", intersection.id, granted);
            for entry in intersection.entries() {
                let state = if entry.coord == granted {
                    GateState::Open
                } else {
                    GateState::Closed
                };
                updates.push((entry.gate, state));
            }
        }
    }
    updates
}
