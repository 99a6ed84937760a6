use gated_traffic::simulation::{
    Agent, AgentId, CellKind, Coord, CrossingKind, Gate, GatePair, GateState, IntersectionId,
    LaneId, LaneSpec, LocalController, LocationId, LocationSpec, NetworkLayout, Orientation,
    RoadNetwork, SimError,
};

fn c(x: i32, y: i32) -> Coord {
    Coord::new(x, y)
}

/// Every composed route starts at the source cell, ends at the destination
/// cell and only ever steps to an edge-sharing neighbour
#[test]
fn test_campus_routes_are_contiguous() {
    let network = RoadNetwork::campus().expect("campus network should build");

    let mut checked = 0;
    for src in network.source_locations() {
        for dst in network.locations() {
            if dst.id == src {
                continue;
            }
            let route = network.route(src, dst.id).expect("route should exist");
            let source = network.location(src).unwrap().source.unwrap();

            assert_eq!(route[0], source, "route {:?} -> {:?} starts elsewhere", src, dst.id);
            assert_eq!(
                *route.last().unwrap(),
                dst.destination,
                "route {:?} -> {:?} ends elsewhere",
                src,
                dst.id
            );
            for pair in route.windows(2) {
                assert_eq!(
                    pair[0].manhattan(&pair[1]),
                    1,
                    "route {:?} -> {:?} jumps from {} to {}",
                    src,
                    dst.id,
                    pair[0],
                    pair[1]
                );
            }
            checked += 1;
        }
    }

    // 7 sources times 7 other locations
    assert_eq!(checked, 49);
}

/// Routes only cross between lanes and interiors through real gates
#[test]
fn test_campus_routes_cross_through_gates() {
    let network = RoadNetwork::campus().unwrap();

    for src in network.source_locations() {
        for dst in network.locations().filter(|location| location.id != src) {
            let route = network.route(src, dst.id).unwrap();
            for pair in route.windows(2) {
                let (from, to) = (pair[0], pair[1]);
                let gate = match (
                    network.intersection_id_for(from),
                    network.intersection_id_for(to),
                ) {
                    (None, Some(_)) => Some(GatePair::new(from, to)),
                    (Some(_), None) => Some(GatePair::new(to, from)),
                    _ => None,
                };
                if let Some(gate) = gate {
                    assert!(network.is_gate(&gate), "no gate between {} and {}", from, to);
                }
            }
        }
    }
}

/// The east doorway steps across onto the inner ring for northbound trips
#[test]
fn test_doorway_route_to_north_east() {
    let network = RoadNetwork::campus().unwrap();
    let route = network.route(LocationId(8), LocationId(7)).unwrap();

    assert_eq!(route[0], c(19, 8));
    assert_eq!(route[1], c(18, 8));
    assert_eq!(*route.last().unwrap(), c(19, 0));
    assert_eq!(route.len(), 11);
}

/// A trip from a location to itself is refused everywhere
#[test]
fn test_same_location_trip_rejected() {
    let network = RoadNetwork::campus().unwrap();

    assert!(matches!(
        network.route(LocationId(2), LocationId(2)),
        Err(SimError::SameLocation(LocationId(2)))
    ));
    assert!(matches!(
        Agent::new(AgentId(0), LocationId(2), LocationId(2), &network, 0),
        Err(SimError::SameLocation(LocationId(2)))
    ));
}

/// Location 7 is destination only
#[test]
fn test_destination_only_location_cannot_spawn() {
    let network = RoadNetwork::campus().unwrap();

    assert!(!network.source_locations().contains(&LocationId(7)));
    assert!(matches!(
        network.route(LocationId(7), LocationId(1)),
        Err(SimError::NoSource(LocationId(7)))
    ));
    assert!(network.route(LocationId(1), LocationId(7)).is_ok());
}

#[test]
fn test_unknown_location_rejected() {
    let network = RoadNetwork::campus().unwrap();
    assert!(matches!(
        network.route(LocationId(1), LocationId(42)),
        Err(SimError::UnknownLocation(LocationId(42)))
    ));
}

/// Membership lookups for lanes, interiors and crossings
#[test]
fn test_lookup_tables() {
    let network = RoadNetwork::campus().unwrap();

    assert_eq!(network.lane_id_for(c(19, 8)), Some(LaneId(3)));
    assert_eq!(network.lane_id_for(c(9, 1)), None);
    assert_eq!(network.intersection_id_for(c(9, 1)), Some(IntersectionId(2)));
    assert_eq!(network.intersection_id_for(c(8, 1)), None);

    let entry = network
        .lane_intersection_for(c(8, 1), CrossingKind::Entry)
        .expect("lane 1 runs into intersection 2");
    assert_eq!(entry.lane, LaneId(1));
    assert_eq!(entry.intersection, IntersectionId(2));
    assert_eq!(entry.gate, GatePair::new(c(8, 1), c(9, 1)));

    let exit = network
        .lane_intersection_for(c(11, 1), CrossingKind::Exit)
        .expect("lane 2 leaves intersection 2");
    assert_eq!(exit.gate, GatePair::new(c(11, 1), c(10, 1)));
    assert!(network.lane_intersection_for(c(11, 1), CrossingKind::Entry).is_none());

    assert_eq!(network.lanes().count(), 27);
    assert_eq!(network.intersections().count(), 7);
    assert_eq!(network.gate_count(), 41);
    assert_eq!(network.transition_count(), 40);
}

/// U-turns through an intersection are never derived
#[test]
fn test_no_u_turn_transitions() {
    let network = RoadNetwork::campus().unwrap();

    // Lane 1 runs east into intersection 2, lane 8 leaves it westbound
    assert!(network.transition_path(LaneId(1), LaneId(8)).is_none());
    let straight = network
        .transition_path(LaneId(1), LaneId(2))
        .expect("straight on is allowed");
    assert_eq!(straight, &[c(9, 1), c(10, 1)]);
}

#[test]
fn test_terrain_codes() {
    let network = RoadNetwork::campus().unwrap();
    let codes = network.terrain_codes();

    assert_eq!(codes.len(), 21);
    assert!(codes.iter().all(|row| row.len() == 20));
    assert_eq!(codes[0][4], CellKind::Unreachable.code());
    assert_eq!(codes[0][0], CellKind::Walkable.code());
    assert_eq!(codes[10][19], CellKind::Lane.code());
    assert_eq!(codes[1][9], CellKind::Interior.code());
    assert_eq!(codes[8][19], CellKind::Endpoint.code());
    assert_eq!(network.cell_kind(c(-1, 0)), CellKind::Unreachable);
}

#[test]
fn test_walls_between_cells() {
    let network = RoadNetwork::campus().unwrap();

    assert!(network.is_illegal_move(c(2, 0), c(3, 0)));
    assert!(network.is_illegal_move(c(3, 0), c(2, 0)));
    assert!(network.is_illegal_move(c(1, 17), c(1, 18)));
    assert!(!network.is_illegal_move(c(1, 17), c(2, 17)));
}

#[test]
fn test_through_transits_and_exclusions() {
    let network = RoadNetwork::campus().unwrap();

    assert_eq!(
        network.through_transit_for(LocationId(2)),
        Some(IntersectionId(2))
    );
    assert_eq!(
        network.through_transit_for(LocationId(6)),
        Some(IntersectionId(6))
    );
    assert_eq!(network.through_transit_for(LocationId(1)), None);

    let exclusion = &network.spawn_exclusions()[0];
    assert_eq!(exclusion.cell, c(19, 16));
    assert!(exclusion.sources.contains(&LocationId(6)));
    assert!(exclusion.sources.contains(&LocationId(8)));
}

/// Two lanes claiming the same cell abort construction
#[test]
fn test_overlapping_lane_rejected() {
    let mut layout = NetworkLayout::campus();
    layout.lanes.push(LaneSpec {
        id: LaneId(99),
        waypoints: vec![c(19, 5)],
        leaves: None,
        enters: None,
    });

    let err = RoadNetwork::new(&layout).expect_err("overlap should be rejected");
    assert!(
        matches!(err.downcast_ref::<SimError>(), Some(SimError::OverlappingCell(cell)) if *cell == c(19, 5)),
        "unexpected error: {:#}",
        err
    );
}

/// A hand-placed hop that does not start at the source cell aborts
/// construction
#[test]
fn test_splice_off_source_rejected() {
    let mut layout = NetworkLayout::campus();
    assert!(!layout.splices.is_empty());
    for splice in &mut layout.splices {
        splice.head = vec![c(19, 7)];
    }

    let err = RoadNetwork::new(&layout).expect_err("splice head should be rejected");
    assert!(
        matches!(
            err.downcast_ref::<SimError>(),
            Some(SimError::RouteMismatch { src: LocationId(8), first, expected_first, .. })
                if *first == c(19, 7) && *expected_first == c(19, 8)
        ),
        "unexpected error: {:#}",
        err
    );
}

/// A location must sit on a lane
#[test]
fn test_location_off_lanes_rejected() {
    let mut layout = NetworkLayout::campus();
    layout.locations.push(LocationSpec {
        id: LocationId(9),
        source: Some(c(0, 0)),
        destination: c(0, 0),
    });

    let err = RoadNetwork::new(&layout).expect_err("location off the lanes");
    assert!(matches!(
        err.downcast_ref::<SimError>(),
        Some(SimError::UnmappedCell(cell)) if *cell == c(0, 0)
    ));
}

/// Lanes may not be laid over walls
#[test]
fn test_lane_on_unreachable_cell_rejected() {
    let mut layout = NetworkLayout::campus();
    layout.lanes.push(LaneSpec {
        id: LaneId(99),
        waypoints: vec![c(4, 0)],
        leaves: None,
        enters: None,
    });

    let err = RoadNetwork::new(&layout).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SimError>(),
        Some(SimError::BlockedCell(cell)) if *cell == c(4, 0)
    ));
}

/// Controllers refuse gates they do not own and change nothing
#[test]
fn test_controller_rejects_foreign_gate() {
    let owned = GatePair::new(c(8, 1), c(9, 1));
    let foreign = GatePair::new(c(2, 9), c(3, 9));
    let mut controller = LocalController::new(IntersectionId(2), &[owned]);

    let result = controller.apply(&[(owned, GateState::Open), (foreign, GateState::Open)]);
    assert!(matches!(
        result,
        Err(SimError::GateNotOwned { intersection: IntersectionId(2), pair }) if pair == foreign
    ));
    assert_eq!(controller.state(&owned), Some(GateState::Closed));

    controller.apply(&[(owned, GateState::Open)]).unwrap();
    assert_eq!(controller.state(&owned), Some(GateState::Open));
    assert_eq!(controller.state(&foreign), None);
}

#[test]
fn test_gate_orientation() {
    let horizontal_step = Gate::new(GatePair::new(c(8, 1), c(9, 1)));
    let vertical_step = Gate::new(GatePair::new(c(9, 0), c(9, 1)));

    assert!(horizontal_step.is_closed());
    assert_eq!(horizontal_step.orientation(), Orientation::Vertical);
    assert_eq!(vertical_step.orientation(), Orientation::Horizontal);
}
