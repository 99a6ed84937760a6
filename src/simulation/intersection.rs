//! Intersection admission state
//!
//! Each intersection owns its FIFO admission queue and a local controller
//! that is the only thing allowed to switch its gates.

use std::collections::{HashMap, HashSet, VecDeque};

use super::error::SimError;
use super::road_network::IntersectionLayout;
use super::types::{Coord, Gate, GatePair, GateState, IntersectionId, LaneCrossing};

/// Powers the gates of exactly one intersection
#[derive(Debug, Clone)]
pub struct LocalController {
    intersection: IntersectionId,
    gates: Vec<Gate>,
    index: HashMap<GatePair, usize>,
}

impl LocalController {
    pub fn new(intersection: IntersectionId, pairs: &[GatePair]) -> Self {
        let gates: Vec<Gate> = pairs.iter().copied().map(Gate::new).collect();
        let index = gates
            .iter()
            .enumerate()
            .map(|(i, gate)| (gate.pair, i))
            .collect();
        Self {
            intersection,
            gates,
            index,
        }
    }

    pub fn owns(&self, pair: &GatePair) -> bool {
        self.index.contains_key(pair)
    }

    pub fn state(&self, pair: &GatePair) -> Option<GateState> {
        self.index.get(pair).map(|i| self.gates[*i].state)
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    /// Apply a batch of gate changes. Nothing changes unless every gate in
    /// the batch belongs to this controller.
    pub fn apply(&mut self, updates: &[(GatePair, GateState)]) -> Result<(), SimError> {
        if let Some((pair, _)) = updates.iter().find(|(pair, _)| !self.owns(pair)) {
            return Err(SimError::GateNotOwned {
                intersection: self.intersection,
                pair: *pair,
            });
        }
        for (pair, state) in updates {
            let i = self.index[pair];
            self.gates[i].state = *state;
        }
        Ok(())
    }
}

/// An intersection with its live admission state
#[derive(Debug, Clone)]
pub struct Intersection {
    pub id: IntersectionId,
    interior: HashSet<Coord>,
    entries: Vec<LaneCrossing>,
    exits: Vec<LaneCrossing>,
    controller: LocalController,
    /// Entry crossings waiting for access, by the lane-side cell
    queue: VecDeque<Coord>,
    /// Front crossing holding the open entry gate, kept queued until its
    /// walker is seen inside
    granted: Option<Coord>,
}

impl Intersection {
    pub fn new(layout: &IntersectionLayout) -> Self {
        Self {
            id: layout.id,
            interior: layout.footprint.iter().copied().collect(),
            entries: layout.entries.clone(),
            exits: layout.exits.clone(),
            controller: LocalController::new(layout.id, &layout.gate_pairs()),
            queue: VecDeque::new(),
            granted: None,
        }
    }

    pub fn contains(&self, coord: Coord) -> bool {
        self.interior.contains(&coord)
    }

    pub fn entries(&self) -> &[LaneCrossing] {
        &self.entries
    }

    pub fn exits(&self) -> &[LaneCrossing] {
        &self.exits
    }

    pub fn interior(&self) -> impl Iterator<Item = &Coord> {
        self.interior.iter()
    }

    /// Queue an entry crossing unless it is already waiting
    pub fn enqueue(&mut self, crossing: Coord) -> bool {
        if self.queue.contains(&crossing) {
            return false;
        }
        self.queue.push_back(crossing);
        true
    }

    /// Drop the front crossing, along with its grant if it held one
    pub fn dequeue(&mut self) -> Option<Coord> {
        let front = self.queue.pop_front();
        if front.is_some() && front == self.granted {
            self.granted = None;
        }
        front
    }

    pub fn front(&self) -> Option<Coord> {
        self.queue.front().copied()
    }

    /// Hand the open entry gate to the front crossing
    pub fn grant_front(&mut self) -> Option<Coord> {
        self.granted = self.front();
        self.granted
    }

    pub fn granted(&self) -> Option<Coord> {
        self.granted
    }

    /// The granted walker made it inside; its place in the queue is spent
    pub fn admit(&mut self) -> Option<Coord> {
        let admitted = self.granted.take()?;
        if self.front() == Some(admitted) {
            self.queue.pop_front();
        }
        Some(admitted)
    }

    pub fn queued(&self) -> impl Iterator<Item = &Coord> {
        self.queue.iter()
    }

    pub fn controller_mut(&mut self) -> &mut LocalController {
        &mut self.controller
    }

    pub fn gates(&self) -> &[Gate] {
        self.controller.gates()
    }
}
