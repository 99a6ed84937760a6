//! Local replanning by breadth-first search over legal moves.
//!
//! The search walks lanes only forwards, enters an intersection only through
//! the lane's entry gate and leaves only through an exit gate. Moves out of
//! the intersection the agent is standing in are refused while their gate is
//! closed.

use std::collections::{HashSet, VecDeque};

use super::error::SimError;
use super::road_network::RoadNetwork;
use super::types::{Coord, GatePair, IntersectionId};

/// Search node; parents are arena indices
#[derive(Debug, Clone, Copy)]
struct SearchNode {
    coord: Coord,
    parent: Option<usize>,
}

/// Cells reachable in one step from `coord`
pub fn legal_moves(network: &RoadNetwork, coord: Coord) -> Result<Vec<Coord>, SimError> {
    if let Some(lane_id) = network.lane_id_for(coord) {
        let lane = network.lane(lane_id)?;
        if let Some(next) = lane.next_after(coord) {
            return Ok(vec![next]);
        }
        return Ok(lane.entry_gate.map(|gate| gate.interior_side).into_iter().collect());
    }

    if let Some(intersection_id) = network.intersection_id_for(coord) {
        let intersection = network.intersection(intersection_id)?;
        let mut moves: Vec<Coord> = coord
            .neighbors4()
            .into_iter()
            .filter(|cell| intersection.contains(*cell))
            .collect();
        moves.extend(
            intersection
                .exits
                .iter()
                .filter(|exit| exit.gate.interior_side == coord)
                .map(|exit| exit.coord),
        );
        return Ok(moves);
    }

    Err(SimError::UnmappedCell(coord))
}

/// Whether the path ending at `index` has stepped outside `region`
fn has_left(
    arena: &[SearchNode],
    mut index: usize,
    network: &RoadNetwork,
    region: IntersectionId,
) -> bool {
    loop {
        let node = arena[index];
        if network.intersection_id_for(node.coord) != Some(region) {
            return true;
        }
        match node.parent {
            Some(parent) => index = parent,
            None => return false,
        }
    }
}

fn reconstruct(arena: &[SearchNode], mut index: usize) -> Vec<Coord> {
    let mut path = vec![arena[index].coord];
    while let Some(parent) = arena[index].parent {
        path.push(arena[parent].coord);
        index = parent;
    }
    path.reverse();
    path
}

/// Find a route from `start` to `goal` that respects lane direction and the
/// closed gates in `blocked`.
///
/// `through` names an intersection whose closed gates are ignored until the
/// path has left it once. Returns `Ok(None)` when the goal is unreachable.
pub fn constrained_bfs(
    network: &RoadNetwork,
    start: Coord,
    goal: Coord,
    blocked: &HashSet<GatePair>,
    through: Option<IntersectionId>,
) -> Result<Option<Vec<Coord>>, SimError> {
    let start_region = network.intersection_id_for(start);

    let mut arena = vec![SearchNode {
        coord: start,
        parent: None,
    }];
    let mut frontier = VecDeque::from([0usize]);
    let mut edges: HashSet<(Coord, Coord)> = HashSet::new();

    while let Some(index) = frontier.pop_front() {
        let coord = arena[index].coord;
        if coord == goal {
            return Ok(Some(reconstruct(&arena, index)));
        }

        let guarded = match start_region {
            Some(region) if network.intersection_id_for(coord) == Some(region) => {
                through != Some(region) || has_left(&arena, index, network, region)
            }
            _ => false,
        };

        for next in legal_moves(network, coord)? {
            if guarded && blocked.contains(&GatePair::new(next, coord)) {
                continue;
            }
            if !edges.insert((coord, next)) {
                continue;
            }
            arena.push(SearchNode {
                coord: next,
                parent: Some(index),
            });
            frontier.push_back(arena.len() - 1);
        }
    }

    Ok(None)
}
