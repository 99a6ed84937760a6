//! Core types for the gated traffic simulation
//!
//! Plain value types shared by every stage of the pipeline.

use std::fmt;

/// A wrapper type for lane IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LaneId(pub usize);

/// A wrapper type for intersection IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntersectionId(pub usize);

/// A wrapper type for boundary location IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationId(pub usize);

/// A wrapper type for agent IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub usize);

/// An integer grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn manhattan(&self, other: &Coord) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// True when the two cells share an edge
    pub fn is_adjacent(&self, other: &Coord) -> bool {
        self.manhattan(other) == 1
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Coord {
        Coord::new(self.x + dx, self.y + dy)
    }

    /// Unit step from `self` towards `other`, per axis
    pub fn heading_to(&self, other: &Coord) -> (i32, i32) {
        ((other.x - self.x).signum(), (other.y - self.y).signum())
    }

    /// The four edge-sharing neighbours
    pub fn neighbors4(&self) -> [Coord; 4] {
        [
            self.offset(1, 0),
            self.offset(-1, 0),
            self.offset(0, 1),
            self.offset(0, -1),
        ]
    }

    /// The eight neighbours including diagonals
    pub fn neighbors8(&self) -> [Coord; 8] {
        [
            self.offset(-1, -1),
            self.offset(0, -1),
            self.offset(1, -1),
            self.offset(1, 0),
            self.offset(1, 1),
            self.offset(0, 1),
            self.offset(-1, 1),
            self.offset(-1, 0),
        ]
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for Coord {
    fn from((x, y): (i32, i32)) -> Self {
        Coord::new(x, y)
    }
}

/// The ordered pair of cells a gate sits between.
///
/// The first cell is always on the lane side, the second inside the
/// intersection. Entering an intersection crosses `lane_side -> interior_side`,
/// leaving it crosses `interior_side -> lane_side`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GatePair {
    pub lane_side: Coord,
    pub interior_side: Coord,
}

impl GatePair {
    pub fn new(lane_side: Coord, interior_side: Coord) -> Self {
        Self {
            lane_side,
            interior_side,
        }
    }
}

/// Orientation of the gate bar as it would be drawn between the two cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Vertical,
    Horizontal,
}

/// Signal state of a gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateState {
    Open,
    Closed,
}

/// A binary signal guarding one lane/interior crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    pub pair: GatePair,
    pub state: GateState,
}

impl Gate {
    /// Gates start closed until the first arbitration
    pub fn new(pair: GatePair) -> Self {
        Self {
            pair,
            state: GateState::Closed,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state == GateState::Closed
    }

    /// Cells side by side on a row are separated by a vertical bar
    pub fn orientation(&self) -> Orientation {
        if self.pair.lane_side.y == self.pair.interior_side.y {
            Orientation::Vertical
        } else {
            Orientation::Horizontal
        }
    }
}

/// Whether a lane crossing leads into or out of its intersection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrossingKind {
    Entry,
    Exit,
}

/// A lane's junction with an intersection.
///
/// `coord` is the lane-side cell: the last cell of the lane for an entry,
/// the first cell for an exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaneCrossing {
    pub coord: Coord,
    pub gate: GatePair,
    pub lane: LaneId,
    pub intersection: IntersectionId,
    pub kind: CrossingKind,
}

/// Static terrain classification published to renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Unreachable,
    Walkable,
    Lane,
    Interior,
    Endpoint,
}

impl CellKind {
    pub fn code(self) -> i8 {
        match self {
            CellKind::Unreachable => -1,
            CellKind::Walkable => 0,
            CellKind::Lane => 1,
            CellKind::Interior => 2,
            CellKind::Endpoint => 3,
        }
    }
}

/// Marker written into the occupancy grid for cells holding an agent
pub const OCCUPIED_CODE: i8 = 5;
