//! Static description of a road network before validation.
//!
//! A layout is plain data. [`super::RoadNetwork::new`] turns it into lookup
//! tables and rejects anything inconsistent.

use super::error::SimError;
use super::types::{Coord, IntersectionId, LaneId, LocationId};

/// One directional lane, given as axis-aligned waypoints
#[derive(Debug, Clone)]
pub struct LaneSpec {
    pub id: LaneId,
    pub waypoints: Vec<Coord>,
    /// Intersection this lane starts from, and the interior cell it leaves through
    pub leaves: Option<(IntersectionId, Coord)>,
    /// Intersection this lane runs into, and the interior cell it enters
    pub enters: Option<(IntersectionId, Coord)>,
}

impl LaneSpec {
    /// Expand the waypoints into every cell the lane covers, in travel order
    pub fn cells(&self) -> Result<Vec<Coord>, SimError> {
        let mut cells = Vec::new();
        let Some(first) = self.waypoints.first() else {
            return Err(SimError::UnknownLane(self.id));
        };
        cells.push(*first);

        for pair in self.waypoints.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            if from.x != to.x && from.y != to.y {
                return Err(SimError::RouteNotContiguous { from, to });
            }
            let (dx, dy) = from.heading_to(&to);
            let mut cursor = from;
            while cursor != to {
                cursor = cursor.offset(dx, dy);
                cells.push(cursor);
            }
        }

        Ok(cells)
    }
}

/// Footprint of one intersection
#[derive(Debug, Clone)]
pub struct IntersectionSpec {
    pub id: IntersectionId,
    pub footprint: Vec<Coord>,
}

/// A boundary location where trips start and end
#[derive(Debug, Clone, Copy)]
pub struct LocationSpec {
    pub id: LocationId,
    /// `None` for destination-only locations
    pub source: Option<Coord>,
    pub destination: Coord,
}

/// Hand-placed hop for a location pair that leaves the lane graph.
///
/// The composed route is the lane route from `join_lane` onwards, cut to
/// start at `join`, with `head` prepended.
#[derive(Debug, Clone)]
pub struct RouteSplice {
    pub src: LocationId,
    pub dst: LocationId,
    pub head: Vec<Coord>,
    pub join_lane: LaneId,
    pub join: Coord,
}

/// Replanning waiver for trips that pass straight through one intersection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThroughTransit {
    pub destination: LocationId,
    pub intersection: IntersectionId,
}

/// Sources that may not spawn while a shared cell is occupied
#[derive(Debug, Clone)]
pub struct SpawnExclusion {
    pub sources: Vec<LocationId>,
    pub cell: Coord,
}

/// Complete, unvalidated network definition
#[derive(Debug, Clone)]
pub struct NetworkLayout {
    /// Rows of the floor plan, `#` marks unreachable cells
    pub terrain: Vec<String>,
    /// Adjacent cell pairs separated by a wall
    pub illegal_moves: Vec<(Coord, Coord)>,
    pub lanes: Vec<LaneSpec>,
    pub intersections: Vec<IntersectionSpec>,
    pub locations: Vec<LocationSpec>,
    pub splices: Vec<RouteSplice>,
    pub through_transits: Vec<ThroughTransit>,
    pub spawn_exclusions: Vec<SpawnExclusion>,
}

const CAMPUS_TERRAIN: [&str; 21] = [
    "....##...........##.",
    "....................",
    "....................",
    "......##...###......",
    "......##.#######....",
    ".........########...",
    ".......###########..",
    ".......###########..",
    ".......###########..",
    "......############..",
    "......############..",
    "......############..",
    "......############..",
    ".......###########..",
    "........##########..",
    ".........########...",
    "..............##....",
    "....................",
    "....................",
    "....................",
    "....##...........##.",
];

fn c(x: i32, y: i32) -> Coord {
    Coord::new(x, y)
}

fn lane(
    id: usize,
    waypoints: &[(i32, i32)],
    leaves: Option<(usize, (i32, i32))>,
    enters: Option<(usize, (i32, i32))>,
) -> LaneSpec {
    LaneSpec {
        id: LaneId(id),
        waypoints: waypoints.iter().copied().map(Coord::from).collect(),
        leaves: leaves.map(|(i, cell)| (IntersectionId(i), Coord::from(cell))),
        enters: enters.map(|(i, cell)| (IntersectionId(i), Coord::from(cell))),
    }
}

/// 2x2 footprint with its top-left corner at `(x, y)`
fn square(id: usize, x: i32, y: i32) -> IntersectionSpec {
    IntersectionSpec {
        id: IntersectionId(id),
        footprint: vec![c(x, y), c(x + 1, y), c(x, y + 1), c(x + 1, y + 1)],
    }
}

fn location(id: usize, source: Option<(i32, i32)>, destination: (i32, i32)) -> LocationSpec {
    LocationSpec {
        id: LocationId(id),
        source: source.map(Coord::from),
        destination: Coord::from(destination),
    }
}

impl NetworkLayout {
    /// The campus floor: a two-lane ring around a central block with seven
    /// gated junctions and eight boundary locations.
    pub fn campus() -> Self {
        let lanes = vec![
            // outer ring, clockwise
            lane(1, &[(5, 1), (8, 1)], Some((4, (4, 1))), Some((2, (9, 1)))),
            lane(2, &[(11, 1), (17, 1)], Some((2, (10, 1))), Some((7, (18, 1)))),
            lane(3, &[(19, 3), (19, 16)], Some((7, (19, 2))), Some((6, (19, 17)))),
            lane(4, &[(17, 18), (11, 18)], Some((6, (18, 18))), Some((3, (10, 18)))),
            lane(5, &[(8, 18), (5, 18)], Some((3, (9, 18))), Some((5, (4, 18)))),
            lane(6, &[(3, 16), (3, 11)], Some((5, (3, 17))), Some((1, (3, 10)))),
            lane(7, &[(3, 8), (3, 3)], Some((1, (3, 9))), Some((4, (3, 2)))),
            // inner ring, counter-clockwise
            lane(8, &[(8, 2), (5, 2)], Some((2, (9, 2))), Some((4, (4, 2)))),
            lane(9, &[(4, 3), (4, 8)], Some((4, (4, 2))), Some((1, (4, 9)))),
            lane(10, &[(4, 11), (4, 16)], Some((1, (4, 10))), Some((5, (4, 17)))),
            lane(11, &[(5, 17), (8, 17)], Some((5, (4, 17))), Some((3, (9, 17)))),
            lane(12, &[(11, 17), (17, 17)], Some((3, (10, 17))), Some((6, (18, 17)))),
            lane(13, &[(18, 16), (18, 3)], Some((6, (18, 17))), Some((7, (18, 2)))),
            lane(14, &[(17, 2), (11, 2)], Some((7, (18, 2))), Some((2, (10, 2)))),
            // spurs to the boundary locations
            lane(15, &[(2, 9), (0, 9)], Some((1, (3, 9))), None),
            lane(16, &[(0, 10), (2, 10)], None, Some((1, (3, 10)))),
            lane(17, &[(9, 0)], Some((2, (9, 1))), None),
            lane(18, &[(10, 0)], None, Some((2, (10, 1)))),
            lane(19, &[(2, 1), (0, 1)], Some((4, (3, 1))), None),
            lane(20, &[(0, 2), (2, 2)], None, Some((4, (3, 2)))),
            lane(21, &[(2, 18), (0, 18)], Some((5, (3, 18))), None),
            lane(22, &[(0, 17), (2, 17)], None, Some((5, (3, 17)))),
            lane(23, &[(9, 19), (9, 20)], Some((3, (9, 18))), None),
            lane(24, &[(10, 20), (10, 19)], None, Some((3, (10, 18)))),
            lane(25, &[(18, 19)], Some((6, (18, 18))), None),
            lane(26, &[(19, 20), (19, 19)], None, Some((6, (19, 18)))),
            lane(27, &[(19, 0)], Some((7, (19, 1))), None),
        ];

        let intersections = vec![
            square(1, 3, 9),
            square(2, 9, 1),
            square(3, 9, 17),
            square(4, 3, 1),
            square(5, 3, 17),
            square(6, 18, 17),
            square(7, 18, 1),
        ];

        let locations = vec![
            location(1, Some((0, 10)), (0, 9)),
            location(2, Some((10, 0)), (9, 0)),
            location(3, Some((0, 2)), (0, 1)),
            location(4, Some((0, 17)), (0, 18)),
            location(5, Some((10, 20)), (9, 20)),
            location(6, Some((19, 20)), (18, 19)),
            location(7, None, (19, 0)),
            location(8, Some((19, 8)), (19, 8)),
        ];

        // The east doorway opens onto both ring lanes; northbound trips step
        // across to the inner ring instead of circling the block.
        let splices = [2, 7]
            .into_iter()
            .map(|dst| RouteSplice {
                src: LocationId(8),
                dst: LocationId(dst),
                head: vec![c(19, 8)],
                join_lane: LaneId(13),
                join: c(18, 8),
            })
            .collect();

        let mut illegal_moves = vec![(c(2, 0), c(3, 0))];
        for x in 0..=2 {
            illegal_moves.push((c(x, 2), c(x, 3)));
            illegal_moves.push((c(x, 17), c(x, 18)));
        }

        Self {
            terrain: CAMPUS_TERRAIN.iter().map(|row| row.to_string()).collect(),
            illegal_moves,
            lanes,
            intersections,
            locations,
            splices,
            through_transits: vec![
                ThroughTransit {
                    destination: LocationId(2),
                    intersection: IntersectionId(2),
                },
                ThroughTransit {
                    destination: LocationId(6),
                    intersection: IntersectionId(6),
                },
            ],
            spawn_exclusions: vec![SpawnExclusion {
                sources: vec![LocationId(6), LocationId(8)],
                cell: c(19, 16),
            }],
        }
    }
}
