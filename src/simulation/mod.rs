//! Gated pedestrian flow simulation
//!
//! Static network model, per-intersection admission control, the agent
//! engine and the pipeline that ties them together. Everything here runs
//! headless and can be driven tick by tick from tests.

mod agent;
mod arbiter;
mod error;
mod intersection;
mod layout;
mod pipeline;
mod replan;
mod road_network;
mod sensing;
mod travel_time;
mod types;
mod world;

pub use agent::{Agent, ReplanOutcome, SmartState};
pub use arbiter::IntersectionArbiter;
pub use error::SimError;
pub use intersection::{Intersection, LocalController};
pub use layout::{
    IntersectionSpec, LaneSpec, LocationSpec, NetworkLayout, RouteSplice, SpawnExclusion,
    ThroughTransit,
};
pub use pipeline::Pipeline;
pub use replan::{constrained_bfs, legal_moves};
pub use road_network::{IntersectionLayout, Lane, Location, RoadNetwork};
pub use sensing::OccupancyGrid;
pub use travel_time::IdealTravelTimes;
pub use types::{
    AgentId, CellKind, Coord, CrossingKind, Gate, GatePair, GateState, IntersectionId, LaneCrossing,
    LaneId, LocationId, Orientation, OCCUPIED_CODE,
};
pub use world::{
    draw_map, AgentView, Frame, SimConfig, SimWorld, SpawnOutcome, SpawnRejection, TickOutcome,
    TripLog, TripRecord, WorldStats,
};
