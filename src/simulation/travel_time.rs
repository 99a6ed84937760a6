//! Ideal travel times over the empty floor plan
//!
//! An 8-connected grid of walkable cells with no lanes, gates or other
//! agents. Computed once, then used as the baseline observed trip durations
//! are compared against.

use anyhow::{bail, Result};
use log::{debug, info};
use petgraph::algo::astar;
use petgraph::graphmap::UnGraphMap;
use std::collections::HashMap;

use super::error::SimError;
use super::road_network::RoadNetwork;
use super::types::Coord;

/// Diagonal distance with unit straight and diagonal steps
fn diagonal_distance(a: Coord, b: Coord) -> u32 {
    let dx = (a.x - b.x).unsigned_abs();
    let dy = (a.y - b.y).unsigned_abs();
    dx + dy - dx.min(dy)
}

/// Unobstructed walking grid
fn floor_graph(network: &RoadNetwork) -> UnGraphMap<Coord, ()> {
    let mut graph = UnGraphMap::new();
    for y in 0..network.height() {
        for x in 0..network.width() {
            let cell = Coord::new(x, y);
            if !network.is_walkable(cell) {
                continue;
            }
            graph.add_node(cell);
            for neighbour in cell.neighbors8() {
                if network.is_walkable(neighbour) && !network.is_illegal_move(cell, neighbour) {
                    graph.add_edge(cell, neighbour, ());
                }
            }
        }
    }
    graph
}

/// Cached hop counts from every spawn cell to every destination cell
#[derive(Debug, Clone)]
pub struct IdealTravelTimes {
    times: HashMap<(Coord, Coord), u32>,
}

impl IdealTravelTimes {
    pub fn new(network: &RoadNetwork) -> Result<Self> {
        let graph = floor_graph(network);
        let mut times = HashMap::new();

        for origin in network.locations().filter_map(|location| location.source) {
            for target in network.locations().map(|location| location.destination) {
                // A doorway whose source and destination coincide has no trip to itself
                if origin == target {
                    continue;
                }
                let (hops, _) = astar(
                    &graph,
                    origin,
                    |cell| cell == target,
                    |_| 1u32,
                    |cell| diagonal_distance(cell, target),
                )
                .ok_or(SimError::NoIdealRoute {
                    from: origin,
                    to: target,
                })?;
                debug!("Ideal time {} -> {}: {}", origin, target, hops);
                times.insert((origin, target), hops);
            }
        }

        info!("Computed {} ideal travel times", times.len());
        Ok(Self { times })
    }

    pub fn get(&self, origin: Coord, target: Coord) -> Option<u32> {
        self.times.get(&(origin, target)).copied()
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(Coord, Coord), &u32)> {
        self.times.iter()
    }

    /// Observed mean trip time as a percentage of the ideal mean over the
    /// same pairs. `None` when nothing was observed.
    pub fn response_ratio(&self, observed: &HashMap<(Coord, Coord), f64>) -> Result<Option<f64>> {
        if observed.is_empty() {
            return Ok(None);
        }

        // Fixed summation order keeps seeded runs bit-identical
        let mut pairs: Vec<_> = observed.iter().collect();
        pairs.sort_by_key(|(pair, _)| **pair);

        let mut ideal_total = 0.0;
        let mut observed_total = 0.0;
        for (pair, ticks) in pairs {
            let Some(ideal) = self.get(pair.0, pair.1) else {
                bail!("No ideal travel time for {} -> {}", pair.0, pair.1);
            };
            ideal_total += ideal as f64;
            observed_total += ticks;
        }

        let count = observed.len() as f64;
        let ideal_mean = ideal_total / count;
        if ideal_mean == 0.0 {
            return Ok(None);
        }
        Ok(Some(observed_total / count / ideal_mean * 100.0))
    }
}
