//! Position sensing: folds agent coordinates into an occupancy grid.

use super::road_network::RoadNetwork;
use super::types::{Coord, OCCUPIED_CODE};

/// Terrain codes overlaid with the cells agents stand on this tick
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    width: i32,
    height: i32,
    empty: Vec<i8>,
    cells: Vec<i8>,
    previous: Vec<Coord>,
}

impl OccupancyGrid {
    pub fn new(network: &RoadNetwork) -> Self {
        let empty: Vec<i8> = network.terrain_codes().into_iter().flatten().collect();
        Self {
            width: network.width(),
            height: network.height(),
            cells: empty.clone(),
            empty,
            previous: Vec::new(),
        }
    }

    fn index_of(&self, coord: Coord) -> Option<usize> {
        if coord.x < 0 || coord.y < 0 || coord.x >= self.width || coord.y >= self.height {
            return None;
        }
        Some((coord.y * self.width + coord.x) as usize)
    }

    /// Clear last tick's marks and mark the new positions.
    ///
    /// Only the previously marked cells are restored, the rest of the grid
    /// is left alone.
    pub fn update(&mut self, positions: &[Coord]) {
        for coord in std::mem::take(&mut self.previous) {
            if let Some(i) = self.index_of(coord) {
                self.cells[i] = self.empty[i];
            }
        }
        for coord in positions {
            if let Some(i) = self.index_of(*coord) {
                self.cells[i] = OCCUPIED_CODE;
            }
        }
        self.previous = positions.to_vec();
    }

    pub fn is_occupied(&self, coord: Coord) -> bool {
        self.index_of(coord)
            .map(|i| self.cells[i] == OCCUPIED_CODE)
            .unwrap_or(false)
    }

    pub fn code(&self, coord: Coord) -> Option<i8> {
        self.index_of(coord).map(|i| self.cells[i])
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|code| **code == OCCUPIED_CODE).count()
    }
}
