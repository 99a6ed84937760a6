use std::collections::HashMap;

use gated_traffic::simulation::{Coord, IdealTravelTimes, RoadNetwork};

fn c(x: i32, y: i32) -> Coord {
    Coord::new(x, y)
}

/// Every spawn cell reaches every destination cell, except the doorway
/// that is both
#[test]
fn test_ideal_times_cover_every_pair() {
    let network = RoadNetwork::campus().unwrap();
    let ideal = IdealTravelTimes::new(&network).expect("every pair should be reachable");

    // 7 spawn cells times 8 destinations, minus the doorway to itself
    assert_eq!(ideal.len(), 55);
    assert_eq!(ideal.get(c(19, 8), c(19, 8)), None);

    for src in network.locations().filter_map(|location| location.source) {
        for dst in network.locations().map(|location| location.destination) {
            if src == dst {
                continue;
            }
            let hops = ideal.get(src, dst).expect("pair should be cached");
            assert!(hops > 0);
        }
    }
}

/// Diagonal steps cost the same as straight ones, walls are respected
#[test]
fn test_ideal_time_values() {
    let network = RoadNetwork::campus().unwrap();
    let ideal = IdealTravelTimes::new(&network).unwrap();

    assert_eq!(ideal.get(c(0, 2), c(0, 1)), Some(1));
    assert_eq!(ideal.get(c(19, 8), c(19, 0)), Some(8));
    // The wall between (0,17) and (0,18) forces a detour
    assert_eq!(ideal.get(c(0, 17), c(0, 18)), Some(2));
}

#[test]
fn test_response_ratio() {
    let network = RoadNetwork::campus().unwrap();
    let ideal = IdealTravelTimes::new(&network).unwrap();

    assert_eq!(ideal.response_ratio(&HashMap::new()).unwrap(), None);

    let observed = HashMap::from([((c(0, 2), c(0, 1)), 3.0), ((c(19, 8), c(19, 0)), 15.0)]);
    // (3 + 15) / 2 over (1 + 8) / 2
    let ratio = ideal.response_ratio(&observed).unwrap().unwrap();
    assert!((ratio - 200.0).abs() < 1e-9);

    let unknown = HashMap::from([((c(19, 8), c(19, 8)), 4.0)]);
    assert!(ideal.response_ratio(&unknown).is_err());
}
