//! Static road network: lanes, intersections, gates and location routes.
//!
//! Built once from a [`NetworkLayout`]; every lookup afterwards is read-only.
//! Configuration problems surface from [`RoadNetwork::new`] and nowhere else.

use anyhow::{Context, Result};
use log::debug;
use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use super::error::SimError;
use super::layout::{NetworkLayout, RouteSplice, SpawnExclusion, ThroughTransit};
use super::types::{
    CellKind, Coord, CrossingKind, GatePair, IntersectionId, LaneCrossing, LaneId, LocationId,
};

/// A validated, directional lane
#[derive(Debug, Clone)]
pub struct Lane {
    pub id: LaneId,
    pub cells: Vec<Coord>,
    pub leaves: Option<IntersectionId>,
    pub enters: Option<IntersectionId>,
    /// Gate crossed when the lane runs into its intersection
    pub entry_gate: Option<GatePair>,
}

impl Lane {
    pub fn first(&self) -> Coord {
        self.cells[0]
    }

    pub fn last(&self) -> Coord {
        self.cells[self.cells.len() - 1]
    }

    /// The cell after `coord` on this lane, if `coord` is not the last one
    pub fn next_after(&self, coord: Coord) -> Option<Coord> {
        let index = self.cells.iter().position(|cell| *cell == coord)?;
        self.cells.get(index + 1).copied()
    }
}

/// Static part of an intersection: footprint and crossings
#[derive(Debug, Clone)]
pub struct IntersectionLayout {
    pub id: IntersectionId,
    pub footprint: Vec<Coord>,
    pub entries: Vec<LaneCrossing>,
    pub exits: Vec<LaneCrossing>,
    interior: HashSet<Coord>,
}

impl IntersectionLayout {
    pub fn contains(&self, coord: Coord) -> bool {
        self.interior.contains(&coord)
    }

    /// Every gate bounding this intersection, entries first
    pub fn gate_pairs(&self) -> Vec<GatePair> {
        self.entries
            .iter()
            .chain(self.exits.iter())
            .map(|crossing| crossing.gate)
            .collect()
    }
}

/// A validated boundary location
#[derive(Debug, Clone, Copy)]
pub struct Location {
    pub id: LocationId,
    pub source: Option<Coord>,
    pub destination: Coord,
}

/// The whole static map
#[derive(Debug)]
pub struct RoadNetwork {
    width: i32,
    height: i32,
    terrain: Vec<CellKind>,
    illegal_moves: HashSet<(Coord, Coord)>,
    lanes: BTreeMap<LaneId, Lane>,
    intersections: BTreeMap<IntersectionId, IntersectionLayout>,
    locations: BTreeMap<LocationId, Location>,
    transitions: HashMap<(LaneId, LaneId), Vec<Coord>>,
    lane_by_coord: HashMap<Coord, LaneId>,
    intersection_by_coord: HashMap<Coord, IntersectionId>,
    crossings: HashMap<(Coord, CrossingKind), LaneCrossing>,
    gate_pairs: HashSet<GatePair>,

    /// Lane adjacency through intersections, weighted by cells travelled
    lane_graph: DiGraph<LaneId, u32>,
    lane_to_node: HashMap<LaneId, NodeIndex>,

    routes: HashMap<(LocationId, LocationId), Vec<Coord>>,
    through_transits: Vec<ThroughTransit>,
    spawn_exclusions: Vec<SpawnExclusion>,
}

impl RoadNetwork {
    /// The default campus map
    pub fn campus() -> Result<Self> {
        Self::new(&NetworkLayout::campus())
    }

    /// Validate a layout and build every lookup table and location route
    pub fn new(layout: &NetworkLayout) -> Result<Self> {
        let height = layout.terrain.len() as i32;
        let width = layout
            .terrain
            .iter()
            .map(|row| row.len())
            .max()
            .unwrap_or(0) as i32;

        let mut terrain = vec![CellKind::Unreachable; (width * height) as usize];
        for (y, row) in layout.terrain.iter().enumerate() {
            for (x, symbol) in row.chars().enumerate() {
                if symbol != '#' {
                    terrain[y * width as usize + x] = CellKind::Walkable;
                }
            }
        }

        let mut network = Self {
            width,
            height,
            terrain,
            illegal_moves: HashSet::new(),
            lanes: BTreeMap::new(),
            intersections: BTreeMap::new(),
            locations: BTreeMap::new(),
            transitions: HashMap::new(),
            lane_by_coord: HashMap::new(),
            intersection_by_coord: HashMap::new(),
            crossings: HashMap::new(),
            gate_pairs: HashSet::new(),
            lane_graph: DiGraph::new(),
            lane_to_node: HashMap::new(),
            routes: HashMap::new(),
            through_transits: layout.through_transits.clone(),
            spawn_exclusions: layout.spawn_exclusions.clone(),
        };

        for (a, b) in &layout.illegal_moves {
            network.illegal_moves.insert((*a, *b));
            network.illegal_moves.insert((*b, *a));
        }

        network.add_lanes(layout)?;
        network.add_intersections(layout)?;
        network.connect_crossings(layout)?;
        network.derive_transitions()?;
        network.add_locations(layout)?;
        network.check_references()?;
        network.compose_routes(&layout.splices)?;

        debug!(
            "Road network ready: {} lanes, {} intersections, {} transitions, {} routes",
            network.lanes.len(),
            network.intersections.len(),
            network.transitions.len(),
            network.routes.len()
        );

        Ok(network)
    }

    fn claim(&mut self, coord: Coord, kind: CellKind) -> Result<(), SimError> {
        let index = self.index_of(coord).ok_or(SimError::BlockedCell(coord))?;
        match self.terrain[index] {
            CellKind::Walkable => {
                self.terrain[index] = kind;
                Ok(())
            }
            CellKind::Unreachable => Err(SimError::BlockedCell(coord)),
            _ => Err(SimError::OverlappingCell(coord)),
        }
    }

    fn add_lanes(&mut self, layout: &NetworkLayout) -> Result<()> {
        for spec in &layout.lanes {
            let cells = spec
                .cells()
                .with_context(|| format!("Invalid waypoints for lane {:?}", spec.id))?;

            for cell in &cells {
                self.claim(*cell, CellKind::Lane)?;
                self.lane_by_coord.insert(*cell, spec.id);
            }

            let lane = Lane {
                id: spec.id,
                cells,
                leaves: spec.leaves.map(|(id, _)| id),
                enters: spec.enters.map(|(id, _)| id),
                entry_gate: None,
            };
            let node = self.lane_graph.add_node(spec.id);
            self.lane_to_node.insert(spec.id, node);
            self.lanes.insert(spec.id, lane);
        }
        Ok(())
    }

    fn add_intersections(&mut self, layout: &NetworkLayout) -> Result<()> {
        for spec in &layout.intersections {
            for cell in &spec.footprint {
                self.claim(*cell, CellKind::Interior)?;
                self.intersection_by_coord.insert(*cell, spec.id);
            }
            self.intersections.insert(
                spec.id,
                IntersectionLayout {
                    id: spec.id,
                    footprint: spec.footprint.clone(),
                    entries: Vec::new(),
                    exits: Vec::new(),
                    interior: spec.footprint.iter().copied().collect(),
                },
            );
        }
        Ok(())
    }

    fn connect_crossings(&mut self, layout: &NetworkLayout) -> Result<()> {
        for spec in &layout.lanes {
            let lane = self.lane(spec.id)?.clone();

            if let Some((intersection_id, interior)) = spec.enters {
                let gate = self.gate_for(&lane, lane.last(), intersection_id, interior)?;
                let crossing = LaneCrossing {
                    coord: lane.last(),
                    gate,
                    lane: lane.id,
                    intersection: intersection_id,
                    kind: CrossingKind::Entry,
                };
                self.register_crossing(crossing)?;
                if let Some(stored) = self.lanes.get_mut(&lane.id) {
                    stored.entry_gate = Some(gate);
                }
            }

            if let Some((intersection_id, interior)) = spec.leaves {
                let gate = self.gate_for(&lane, lane.first(), intersection_id, interior)?;
                let crossing = LaneCrossing {
                    coord: lane.first(),
                    gate,
                    lane: lane.id,
                    intersection: intersection_id,
                    kind: CrossingKind::Exit,
                };
                self.register_crossing(crossing)?;
            }
        }
        Ok(())
    }

    fn gate_for(
        &self,
        lane: &Lane,
        lane_side: Coord,
        intersection_id: IntersectionId,
        interior: Coord,
    ) -> Result<GatePair, SimError> {
        let intersection = self
            .intersections
            .get(&intersection_id)
            .ok_or(SimError::UnknownIntersection(intersection_id))?;
        if !intersection.contains(interior) {
            return Err(SimError::UnmappedCell(interior));
        }
        if !lane_side.is_adjacent(&interior) {
            debug!("Lane {:?} does not touch {:?}", lane.id, intersection_id);
            return Err(SimError::RouteNotContiguous {
                from: lane_side,
                to: interior,
            });
        }
        Ok(GatePair::new(lane_side, interior))
    }

    fn register_crossing(&mut self, crossing: LaneCrossing) -> Result<(), SimError> {
        if !self.gate_pairs.insert(crossing.gate) {
            return Err(SimError::OverlappingCell(crossing.coord));
        }
        self.crossings.insert((crossing.coord, crossing.kind), crossing);
        let intersection = self
            .intersections
            .get_mut(&crossing.intersection)
            .ok_or(SimError::UnknownIntersection(crossing.intersection))?;
        match crossing.kind {
            CrossingKind::Entry => intersection.entries.push(crossing),
            CrossingKind::Exit => intersection.exits.push(crossing),
        }
        Ok(())
    }

    /// Connect every entry to every exit of the same intersection, except
    /// turning straight back the way the agent came.
    fn derive_transitions(&mut self) -> Result<()> {
        let mut derived = Vec::new();

        for intersection in self.intersections.values() {
            for entry in &intersection.entries {
                let heading = entry.coord.heading_to(&entry.gate.interior_side);
                for exit in &intersection.exits {
                    let exit_heading = exit.gate.interior_side.heading_to(&exit.coord);
                    if exit_heading == (-heading.0, -heading.1) {
                        continue;
                    }
                    let path = interior_path(
                        intersection,
                        entry.gate.interior_side,
                        exit.gate.interior_side,
                        heading,
                    )
                    .ok_or(SimError::UnmappedCell(exit.gate.interior_side))?;
                    derived.push((entry.lane, exit.lane, path));
                }
            }
        }

        for (src, dst, path) in derived {
            let weight = (path.len() + self.lane(dst)?.cells.len()) as u32;
            let src_node = self.lane_to_node[&src];
            let dst_node = self.lane_to_node[&dst];
            self.lane_graph.add_edge(src_node, dst_node, weight);
            self.transitions.insert((src, dst), path);
        }
        Ok(())
    }

    fn add_locations(&mut self, layout: &NetworkLayout) -> Result<()> {
        for spec in &layout.locations {
            for cell in spec.source.iter().chain(std::iter::once(&spec.destination)) {
                if !self.lane_by_coord.contains_key(cell) {
                    return Err(SimError::UnmappedCell(*cell))
                        .with_context(|| format!("Location {:?} is off the lanes", spec.id));
                }
                if let Some(index) = self.index_of(*cell) {
                    self.terrain[index] = CellKind::Endpoint;
                }
            }
            self.locations.insert(
                spec.id,
                Location {
                    id: spec.id,
                    source: spec.source,
                    destination: spec.destination,
                },
            );
        }
        Ok(())
    }

    fn check_references(&self) -> Result<(), SimError> {
        for transit in &self.through_transits {
            self.location(transit.destination)?;
            self.intersection(transit.intersection)?;
        }
        for exclusion in &self.spawn_exclusions {
            for source in &exclusion.sources {
                self.location(*source)?;
            }
        }
        Ok(())
    }

    fn compose_routes(&mut self, splices: &[RouteSplice]) -> Result<()> {
        let sources: Vec<Location> = self
            .locations
            .values()
            .filter(|location| location.source.is_some())
            .copied()
            .collect();
        let destinations: Vec<Location> = self.locations.values().copied().collect();

        for src in &sources {
            for dst in &destinations {
                if src.id == dst.id {
                    continue;
                }
                let splice = splices
                    .iter()
                    .find(|splice| splice.src == src.id && splice.dst == dst.id);
                let route = self
                    .compose_route(src, dst, splice)
                    .with_context(|| format!("Composing route {:?} -> {:?}", src.id, dst.id))?;
                self.routes.insert((src.id, dst.id), route);
            }
        }

        for splice in splices {
            if !self.routes.contains_key(&(splice.src, splice.dst)) {
                return Err(SimError::UnknownLocation(splice.dst).into());
            }
        }
        Ok(())
    }

    fn compose_route(
        &self,
        src: &Location,
        dst: &Location,
        splice: Option<&RouteSplice>,
    ) -> Result<Vec<Coord>> {
        let source = src.source.ok_or(SimError::NoSource(src.id))?;
        let no_route = SimError::NoLaneRoute {
            src: src.id,
            dst: dst.id,
        };

        let (start_lane, start_cell, head) = match splice {
            Some(splice) => {
                self.lane(splice.join_lane)?;
                (splice.join_lane, splice.join, splice.head.clone())
            }
            None => (
                self.lane_id_for(source).ok_or(SimError::UnmappedCell(source))?,
                source,
                Vec::new(),
            ),
        };
        let end_lane = self
            .lane_id_for(dst.destination)
            .ok_or(SimError::UnmappedCell(dst.destination))?;

        let plan = self.plan_lanes(start_lane, end_lane).ok_or(no_route)?;

        let mut path = Vec::new();
        for (i, lane_id) in plan.iter().enumerate() {
            path.extend_from_slice(self.lane_path(*lane_id)?);
            if let Some(next) = plan.get(i + 1) {
                let transition = self
                    .transition_path(*lane_id, *next)
                    .ok_or(SimError::UnknownLane(*next))?;
                path.extend_from_slice(transition);
            }
        }

        let start = path
            .iter()
            .position(|cell| *cell == start_cell)
            .ok_or(SimError::UnmappedCell(start_cell))?;
        let end = path
            .iter()
            .rposition(|cell| *cell == dst.destination)
            .filter(|end| *end >= start)
            .ok_or(SimError::NoLaneRoute {
                src: src.id,
                dst: dst.id,
            })?;

        let mut route = head;
        route.extend_from_slice(&path[start..=end]);
        self.validate_route(src.id, dst.id, source, dst.destination, &route)?;
        Ok(route)
    }

    fn validate_route(
        &self,
        src: LocationId,
        dst: LocationId,
        expected_first: Coord,
        expected_last: Coord,
        route: &[Coord],
    ) -> Result<(), SimError> {
        let (Some(first), Some(last)) = (route.first(), route.last()) else {
            return Err(SimError::NoLaneRoute { src, dst });
        };
        if *first != expected_first || *last != expected_last {
            return Err(SimError::RouteMismatch {
                src,
                dst,
                first: *first,
                last: *last,
                expected_first,
                expected_last,
            });
        }
        for pair in route.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            if !from.is_adjacent(&to) {
                return Err(SimError::RouteNotContiguous { from, to });
            }
            let pair = match (self.intersection_id_for(from), self.intersection_id_for(to)) {
                (None, Some(_)) => Some(GatePair::new(from, to)),
                (Some(_), None) => Some(GatePair::new(to, from)),
                _ => None,
            };
            if let Some(pair) = pair {
                if !self.gate_pairs.contains(&pair) {
                    return Err(SimError::MissingGate { from, to });
                }
            }
        }
        Ok(())
    }

    /// Shortest lane sequence using A* (Dijkstra with null heuristic)
    fn plan_lanes(&self, start: LaneId, end: LaneId) -> Option<Vec<LaneId>> {
        let start_node = self.lane_to_node.get(&start)?;
        let end_node = self.lane_to_node.get(&end)?;

        let (_, node_path) = astar(
            &self.lane_graph,
            *start_node,
            |node| node == *end_node,
            |edge| *edge.weight(),
            |_| 0,
        )?;

        Some(
            node_path
                .iter()
                .map(|node| self.lane_graph[*node])
                .collect(),
        )
    }

    fn index_of(&self, coord: Coord) -> Option<usize> {
        if coord.x < 0 || coord.y < 0 || coord.x >= self.width || coord.y >= self.height {
            return None;
        }
        Some((coord.y * self.width + coord.x) as usize)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Terrain classification of a cell; anything off the map is unreachable
    pub fn cell_kind(&self, coord: Coord) -> CellKind {
        self.index_of(coord)
            .map(|index| self.terrain[index])
            .unwrap_or(CellKind::Unreachable)
    }

    pub fn is_walkable(&self, coord: Coord) -> bool {
        self.cell_kind(coord) != CellKind::Unreachable
    }

    /// Empty-map colour codes, indexed `[y][x]`
    pub fn terrain_codes(&self) -> Vec<Vec<i8>> {
        (0..self.height)
            .map(|y| {
                (0..self.width)
                    .map(|x| self.cell_kind(Coord::new(x, y)).code())
                    .collect()
            })
            .collect()
    }

    /// True when a wall separates the two cells
    pub fn is_illegal_move(&self, from: Coord, to: Coord) -> bool {
        self.illegal_moves.contains(&(from, to))
    }

    pub fn lane(&self, id: LaneId) -> Result<&Lane, SimError> {
        self.lanes.get(&id).ok_or(SimError::UnknownLane(id))
    }

    pub fn lanes(&self) -> impl Iterator<Item = &Lane> {
        self.lanes.values()
    }

    pub fn lane_path(&self, id: LaneId) -> Result<&[Coord], SimError> {
        self.lane(id).map(|lane| lane.cells.as_slice())
    }

    /// Interior cells linking the end of `src` to the start of `dst`
    pub fn transition_path(&self, src: LaneId, dst: LaneId) -> Option<&[Coord]> {
        self.transitions.get(&(src, dst)).map(|path| path.as_slice())
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    pub fn lane_id_for(&self, coord: Coord) -> Option<LaneId> {
        self.lane_by_coord.get(&coord).copied()
    }

    pub fn intersection_id_for(&self, coord: Coord) -> Option<IntersectionId> {
        self.intersection_by_coord.get(&coord).copied()
    }

    pub fn lane_intersection_for(&self, coord: Coord, kind: CrossingKind) -> Option<&LaneCrossing> {
        self.crossings.get(&(coord, kind))
    }

    pub fn intersection(&self, id: IntersectionId) -> Result<&IntersectionLayout, SimError> {
        self.intersections
            .get(&id)
            .ok_or(SimError::UnknownIntersection(id))
    }

    pub fn intersections(&self) -> impl Iterator<Item = &IntersectionLayout> {
        self.intersections.values()
    }

    pub fn is_gate(&self, pair: &GatePair) -> bool {
        self.gate_pairs.contains(pair)
    }

    pub fn gate_count(&self) -> usize {
        self.gate_pairs.len()
    }

    pub fn location(&self, id: LocationId) -> Result<&Location, SimError> {
        self.locations.get(&id).ok_or(SimError::UnknownLocation(id))
    }

    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.values()
    }

    /// Locations agents can be spawned at
    pub fn source_locations(&self) -> Vec<LocationId> {
        self.locations
            .values()
            .filter(|location| location.source.is_some())
            .map(|location| location.id)
            .collect()
    }

    /// The composed route for a trip
    pub fn route(&self, src: LocationId, dst: LocationId) -> Result<&[Coord], SimError> {
        if src == dst {
            return Err(SimError::SameLocation(src));
        }
        let source = self.location(src)?;
        self.location(dst)?;
        if source.source.is_none() {
            return Err(SimError::NoSource(src));
        }
        self.routes
            .get(&(src, dst))
            .map(|route| route.as_slice())
            .ok_or(SimError::NoLaneRoute { src, dst })
    }

    /// Intersection whose closed gates a trip to `destination` may ignore
    /// until it has left that intersection once
    pub fn through_transit_for(&self, destination: LocationId) -> Option<IntersectionId> {
        self.through_transits
            .iter()
            .find(|transit| transit.destination == destination)
            .map(|transit| transit.intersection)
    }

    pub fn spawn_exclusions(&self) -> &[SpawnExclusion] {
        &self.spawn_exclusions
    }
}

/// Shortest path between two interior cells that stays inside the
/// footprint. Ties go straight on before turning.
fn interior_path(
    intersection: &IntersectionLayout,
    from: Coord,
    to: Coord,
    heading: (i32, i32),
) -> Option<Vec<Coord>> {
    let mut parents: HashMap<Coord, Coord> = HashMap::new();
    let mut frontier = VecDeque::from([from]);
    let mut seen = HashSet::from([from]);

    while let Some(cell) = frontier.pop_front() {
        if cell == to {
            let mut path = vec![cell];
            let mut cursor = cell;
            while let Some(parent) = parents.get(&cursor) {
                path.push(*parent);
                cursor = *parent;
            }
            path.reverse();
            return Some(path);
        }

        let straight = cell.offset(heading.0, heading.1);
        let candidates = std::iter::once(straight).chain(cell.neighbors4());
        for next in candidates {
            if intersection.contains(next) && seen.insert(next) {
                parents.insert(next, cell);
                frontier.push_back(next);
            }
        }
    }
    None
}
