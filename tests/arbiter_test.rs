use gated_traffic::simulation::{
    Coord, Gate, GatePair, GateState, IntersectionArbiter, IntersectionId, OccupancyGrid,
    RoadNetwork, OCCUPIED_CODE,
};

fn c(x: i32, y: i32) -> Coord {
    Coord::new(x, y)
}

fn state_of(gates: &[Gate], pair: GatePair) -> GateState {
    gates
        .iter()
        .find(|gate| gate.pair == pair)
        .map(|gate| gate.state)
        .unwrap_or_else(|| panic!("no gate {:?}", pair))
}

// Intersection 2 covers (9..=10, 1..=2)
const NORTH: IntersectionId = IntersectionId(2);

fn west_entry() -> GatePair {
    GatePair::new(c(8, 1), c(9, 1))
}

fn east_entry() -> GatePair {
    GatePair::new(c(11, 2), c(10, 2))
}

fn north_entry() -> GatePair {
    GatePair::new(c(10, 0), c(10, 1))
}

fn east_exit() -> GatePair {
    GatePair::new(c(11, 1), c(10, 1))
}

fn west_exit() -> GatePair {
    GatePair::new(c(8, 2), c(9, 2))
}

fn arbitrate(
    arbiter: &mut IntersectionArbiter,
    grid: &mut OccupancyGrid,
    positions: &[Coord],
) -> Vec<Gate> {
    grid.update(positions);
    arbiter.arbitrate(grid).expect("arbitration should succeed")
}

#[test]
fn test_all_gates_start_closed() {
    let network = RoadNetwork::campus().unwrap();
    let arbiter = IntersectionArbiter::new(&network);

    let gates = arbiter.gates();
    assert_eq!(gates.len(), network.gate_count());
    assert!(gates.iter().all(|gate| gate.is_closed()));
}

/// With nobody around every entry opens and every exit closes
#[test]
fn test_empty_intersection_opens_all_entries() {
    let network = RoadNetwork::campus().unwrap();
    let mut arbiter = IntersectionArbiter::new(&network);
    let mut grid = OccupancyGrid::new(&network);

    let gates = arbitrate(&mut arbiter, &mut grid, &[]);

    for intersection in arbiter.intersections() {
        for entry in intersection.entries() {
            assert_eq!(state_of(&gates, entry.gate), GateState::Open);
        }
        for exit in intersection.exits() {
            assert_eq!(state_of(&gates, exit.gate), GateState::Closed);
        }
    }

    // Same inputs, same answer
    let again = arbitrate(&mut arbiter, &mut grid, &[]);
    assert_eq!(gates, again);
}

/// Two walkers reach the same intersection on the same tick: the first
/// queued gets in, the other waits until the interior is empty again
#[test]
fn test_simultaneous_arrivals_are_admitted_one_at_a_time() {
    let network = RoadNetwork::campus().unwrap();
    let mut arbiter = IntersectionArbiter::new(&network);
    let mut grid = OccupancyGrid::new(&network);

    // Both arrive
    let gates = arbitrate(&mut arbiter, &mut grid, &[c(8, 1), c(11, 2)]);
    assert_eq!(state_of(&gates, west_entry()), GateState::Open);
    assert_eq!(state_of(&gates, east_entry()), GateState::Closed);
    assert_eq!(state_of(&gates, north_entry()), GateState::Closed);
    let north = arbiter.intersection(NORTH).unwrap();
    assert_eq!(north.granted(), Some(c(8, 1)));
    let queued: Vec<Coord> = north.queued().copied().collect();
    assert_eq!(queued, vec![c(8, 1), c(11, 2)]);

    // West walker is inside
    let gates = arbitrate(&mut arbiter, &mut grid, &[c(9, 1), c(11, 2)]);
    assert_eq!(state_of(&gates, west_entry()), GateState::Closed);
    assert_eq!(state_of(&gates, east_entry()), GateState::Closed);
    assert_eq!(state_of(&gates, north_entry()), GateState::Closed);

    // Still inside, one step further
    let gates = arbitrate(&mut arbiter, &mut grid, &[c(10, 1), c(11, 2)]);
    assert_eq!(state_of(&gates, east_entry()), GateState::Closed);
    assert_eq!(state_of(&gates, east_exit()), GateState::Open);

    // Gone; the east walker is next
    let gates = arbitrate(&mut arbiter, &mut grid, &[c(11, 1), c(11, 2)]);
    assert_eq!(state_of(&gates, east_entry()), GateState::Open);
    assert_eq!(state_of(&gates, west_entry()), GateState::Closed);
    assert_eq!(state_of(&gates, east_exit()), GateState::Closed);
    let north = arbiter.intersection(NORTH).unwrap();
    assert_eq!(north.granted(), Some(c(11, 2)));
    assert_eq!(north.queued().copied().collect::<Vec<_>>(), vec![c(11, 2)]);
}

/// Arrival order decides who enters, not entry position
#[test]
fn test_entries_are_served_in_arrival_order() {
    let network = RoadNetwork::campus().unwrap();
    let mut arbiter = IntersectionArbiter::new(&network);
    let mut grid = OccupancyGrid::new(&network);

    // Occupied; north arrives first, west a tick later
    arbitrate(&mut arbiter, &mut grid, &[c(9, 2), c(10, 0)]);
    arbitrate(&mut arbiter, &mut grid, &[c(9, 2), c(10, 0), c(8, 1)]);
    let queued: Vec<Coord> = arbiter.intersection(NORTH).unwrap().queued().copied().collect();
    assert_eq!(queued, vec![c(10, 0), c(8, 1)]);

    // Interior clears: north goes first even though west is listed first
    let gates = arbitrate(&mut arbiter, &mut grid, &[c(8, 2), c(10, 0), c(8, 1)]);
    assert_eq!(state_of(&gates, north_entry()), GateState::Open);
    assert_eq!(state_of(&gates, west_entry()), GateState::Closed);

    // North inside, then out
    arbitrate(&mut arbiter, &mut grid, &[c(10, 1), c(8, 1)]);
    let gates = arbitrate(&mut arbiter, &mut grid, &[c(11, 1), c(8, 1)]);
    assert_eq!(state_of(&gates, west_entry()), GateState::Open);
    assert_eq!(state_of(&gates, north_entry()), GateState::Closed);
}

/// A walker that was let in but did not step forward keeps its turn
#[test]
fn test_granted_walker_keeps_open_gate_until_inside() {
    let network = RoadNetwork::campus().unwrap();
    let mut arbiter = IntersectionArbiter::new(&network);
    let mut grid = OccupancyGrid::new(&network);

    // North queues first, west second, while someone is inside
    arbitrate(&mut arbiter, &mut grid, &[c(9, 2), c(10, 0)]);
    arbitrate(&mut arbiter, &mut grid, &[c(9, 2), c(10, 0), c(8, 1)]);

    // Interior clears and north is let in
    let gates = arbitrate(&mut arbiter, &mut grid, &[c(8, 2), c(10, 0), c(8, 1)]);
    assert_eq!(state_of(&gates, north_entry()), GateState::Open);
    assert_eq!(state_of(&gates, west_entry()), GateState::Closed);

    // North hesitates for a couple of ticks; the gate stays its own
    for _ in 0..2 {
        let gates = arbitrate(&mut arbiter, &mut grid, &[c(10, 0), c(8, 1)]);
        assert_eq!(state_of(&gates, north_entry()), GateState::Open);
        assert_eq!(state_of(&gates, west_entry()), GateState::Closed);
        let queued: Vec<Coord> = arbiter.intersection(NORTH).unwrap().queued().copied().collect();
        assert_eq!(queued, vec![c(10, 0), c(8, 1)]);
    }

    // North steps in and gives up its place; a newcomer behind it queues last
    let gates = arbitrate(&mut arbiter, &mut grid, &[c(10, 1), c(10, 0), c(8, 1)]);
    assert_eq!(state_of(&gates, north_entry()), GateState::Closed);
    assert_eq!(state_of(&gates, west_entry()), GateState::Closed);
    let north = arbiter.intersection(NORTH).unwrap();
    assert_eq!(north.granted(), None);
    assert_eq!(north.queued().copied().collect::<Vec<_>>(), vec![c(8, 1), c(10, 0)]);

    // Out again: west is next, not the newcomer
    let gates = arbitrate(&mut arbiter, &mut grid, &[c(11, 1), c(10, 0), c(8, 1)]);
    assert_eq!(state_of(&gates, west_entry()), GateState::Open);
    assert_eq!(state_of(&gates, north_entry()), GateState::Closed);
}

/// A queued crossing whose walker is gone is skipped
#[test]
fn test_vacated_crossing_leaves_queue() {
    let network = RoadNetwork::campus().unwrap();
    let mut arbiter = IntersectionArbiter::new(&network);
    let mut grid = OccupancyGrid::new(&network);

    arbitrate(&mut arbiter, &mut grid, &[c(9, 2), c(10, 0)]);
    arbitrate(&mut arbiter, &mut grid, &[c(9, 2), c(10, 0), c(8, 1)]);

    // North walked off before its turn came
    let gates = arbitrate(&mut arbiter, &mut grid, &[c(8, 1)]);
    assert_eq!(state_of(&gates, west_entry()), GateState::Open);
    assert_eq!(state_of(&gates, north_entry()), GateState::Closed);
    let north = arbiter.intersection(NORTH).unwrap();
    assert_eq!(north.granted(), Some(c(8, 1)));
    assert_eq!(north.queued().copied().collect::<Vec<_>>(), vec![c(8, 1)]);
}

/// An occupied exit cell keeps its exit gate shut
#[test]
fn test_occupied_exit_cell_closes_exit_gate() {
    let network = RoadNetwork::campus().unwrap();
    let mut arbiter = IntersectionArbiter::new(&network);
    let mut grid = OccupancyGrid::new(&network);

    let gates = arbitrate(&mut arbiter, &mut grid, &[c(10, 1), c(11, 1)]);
    assert_eq!(state_of(&gates, east_exit()), GateState::Closed);
    assert_eq!(state_of(&gates, west_exit()), GateState::Open);
    assert_eq!(state_of(&gates, west_entry()), GateState::Closed);
}

/// While anyone is inside, no entry gate of that intersection is open
#[test]
fn test_occupied_intersection_never_has_open_entry() {
    let network = RoadNetwork::campus().unwrap();
    let mut arbiter = IntersectionArbiter::new(&network);
    let mut grid = OccupancyGrid::new(&network);

    // Someone in every intersection, someone waiting at every entry
    let mut positions: Vec<Coord> = network
        .intersections()
        .map(|intersection| intersection.footprint[0])
        .collect();
    for intersection in network.intersections() {
        positions.extend(intersection.entries.iter().map(|entry| entry.coord));
    }

    let gates = arbitrate(&mut arbiter, &mut grid, &positions);
    for intersection in arbiter.intersections() {
        for entry in intersection.entries() {
            assert!(state_of(&gates, entry.gate) == GateState::Closed);
        }
    }
}

/// Identical state and grid produce identical gates
#[test]
fn test_arbitration_is_deterministic() {
    let network = RoadNetwork::campus().unwrap();
    let mut arbiter = IntersectionArbiter::new(&network);
    let mut grid = OccupancyGrid::new(&network);
    arbitrate(&mut arbiter, &mut grid, &[c(9, 2), c(10, 0), c(8, 1)]);

    grid.update(&[c(10, 0), c(8, 1), c(2, 10)]);
    let mut twin = arbiter.clone();
    let first = arbiter.arbitrate(&grid).unwrap();
    let second = twin.arbitrate(&grid).unwrap();
    assert_eq!(first, second);
}

/// Only last tick's marks are cleared
#[test]
fn test_occupancy_grid_clears_previous_marks() {
    let network = RoadNetwork::campus().unwrap();
    let mut grid = OccupancyGrid::new(&network);

    grid.update(&[c(8, 1), c(9, 1)]);
    assert!(grid.is_occupied(c(8, 1)));
    assert_eq!(grid.code(c(9, 1)), Some(OCCUPIED_CODE));
    assert_eq!(grid.occupied_count(), 2);

    grid.update(&[c(10, 1)]);
    assert!(!grid.is_occupied(c(8, 1)));
    assert_eq!(grid.code(c(8, 1)), Some(1));
    assert_eq!(grid.code(c(9, 1)), Some(2));
    assert!(grid.is_occupied(c(10, 1)));
    assert_eq!(grid.occupied_count(), 1);
    assert_eq!(grid.code(c(-1, 3)), None);
}
