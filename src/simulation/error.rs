//! Error taxonomy for the simulation.
//!
//! Configuration errors abort construction, invariant violations halt a run.
//! Planning failures and spawn contention are ordinary outcomes and never
//! show up here.

use thiserror::Error;

use super::types::{AgentId, Coord, GatePair, IntersectionId, LaneId, LocationId};

#[derive(Debug, Error)]
pub enum SimError {
    #[error("lane {0:?} is not defined")]
    UnknownLane(LaneId),

    #[error("intersection {0:?} is not defined")]
    UnknownIntersection(IntersectionId),

    #[error("location {0:?} is not defined")]
    UnknownLocation(LocationId),

    #[error("gate {pair:?} is not owned by the controller of {intersection:?}")]
    GateNotOwned {
        intersection: IntersectionId,
        pair: GatePair,
    },

    #[error("route {src:?} -> {dst:?} runs {first} .. {last}, expected {expected_first} .. {expected_last}")]
    RouteMismatch {
        src: LocationId,
        dst: LocationId,
        first: Coord,
        last: Coord,
        expected_first: Coord,
        expected_last: Coord,
    },

    #[error("path jumps from {from} to {to}")]
    RouteNotContiguous { from: Coord, to: Coord },

    #[error("cell {0} belongs to neither a lane nor an intersection")]
    UnmappedCell(Coord),

    #[error("cell {0} is claimed twice")]
    OverlappingCell(Coord),

    #[error("cell {0} is not walkable terrain")]
    BlockedCell(Coord),

    #[error("no lane sequence leads from {src:?} to {dst:?}")]
    NoLaneRoute { src: LocationId, dst: LocationId },

    #[error("trip from {0:?} to itself")]
    SameLocation(LocationId),

    #[error("location {0:?} has no source cell")]
    NoSource(LocationId),

    #[error("crossing {from} -> {to} has no gate")]
    MissingGate { from: Coord, to: Coord },

    #[error("no ideal route from {from} to {to}")]
    NoIdealRoute { from: Coord, to: Coord },

    #[error("agent {0:?} ran off the end of its route")]
    RouteExhausted(AgentId),

    #[error("population bookkeeping mismatch: {live} live agents, {entered} entered, {exited} exited")]
    Bookkeeping { live: usize, entered: u64, exited: u64 },

    #[error("{0} stage disconnected")]
    ChannelClosed(&'static str),
}
