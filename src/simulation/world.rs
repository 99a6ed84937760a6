//! Simulation engine: moves, removes and spawns agents once per tick
//!
//! The world only reads gate states; it never switches them. Everything it
//! publishes downstream is a snapshot.

use anyhow::{bail, Context, Result};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::Arc;

use super::agent::{Agent, ReplanOutcome};
use super::error::SimError;
use super::road_network::RoadNetwork;
use super::types::{AgentId, CellKind, Coord, Gate, GatePair, GateState, LocationId};

/// Tunables for a run
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Seed for reproducible runs; `None` draws from the thread RNG
    pub seed: Option<u64>,
    /// No spawns once the population reaches this size
    pub max_population: usize,
    /// Spawn probability with nobody on the map
    pub spawn_base_probability: f64,
    /// How fast the spawn probability drops with population
    pub spawn_falloff: f64,
    /// Chance that an agent allowed to move actually moves
    pub advance_probability: f64,
    /// Spawn agents that replan when stalled
    pub smart_agents: bool,
    pub stall_threshold: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: None,
            max_population: 30,
            spawn_base_probability: 0.8,
            spawn_falloff: 0.01,
            advance_probability: 0.8,
            smart_agents: true,
            stall_threshold: 4,
        }
    }
}

impl SimConfig {
    /// Spawn probability at population `population`
    pub fn spawn_probability(&self, population: usize) -> f64 {
        if population >= self.max_population {
            return 0.0;
        }
        let x = population as f64;
        self.spawn_base_probability / (1.0 + self.spawn_falloff * x * x)
    }
}

/// Why a spawn candidate was turned away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnRejection {
    /// Someone already stands on the spawn cell
    Occupied(Coord),
    /// The source shares a congested approach cell that is taken
    Congested(Coord),
}

/// What the spawn step did this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnOutcome {
    Spawned(AgentId),
    /// The probability roll failed or the population is at its cap
    Skipped,
    Rejected(SpawnRejection),
}

/// Per-tick summary returned by [`SimWorld::step`]
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub tick: u64,
    pub moved: usize,
    pub stalled: usize,
    pub completed: Vec<AgentId>,
    pub spawn: SpawnOutcome,
}

/// Running counters for the whole simulation
#[derive(Debug, Clone, Default)]
pub struct WorldStats {
    pub spawned: u64,
    pub completed: u64,
    pub spawn_rejections: u64,
    pub stalls: u64,
    pub replans_attempted: u64,
    pub replans_succeeded: u64,
    pub replans_unreachable: u64,
}

/// One finished trip
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TripRecord {
    pub origin: Coord,
    pub destination: Coord,
    pub ticks: u64,
}

/// Every completed trip in completion order
#[derive(Debug, Clone, Default)]
pub struct TripLog {
    records: Vec<TripRecord>,
}

impl TripLog {
    pub fn record(&mut self, record: TripRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[TripRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Mean trip duration in ticks per (origin, destination) cell pair
    pub fn mean_durations(&self) -> HashMap<(Coord, Coord), f64> {
        let mut sums: HashMap<(Coord, Coord), (u64, u64)> = HashMap::new();
        for record in &self.records {
            let entry = sums.entry((record.origin, record.destination)).or_default();
            entry.0 += record.ticks;
            entry.1 += 1;
        }
        sums.into_iter()
            .map(|(pair, (total, count))| (pair, total as f64 / count as f64))
            .collect()
    }
}

/// Read-only view of one agent for renderers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentView {
    pub id: AgentId,
    pub coord: Coord,
    pub destination: LocationId,
    pub smart: bool,
}

/// Snapshot published after every tick
#[derive(Debug, Clone)]
pub struct Frame {
    pub tick: u64,
    pub agents: Vec<AgentView>,
    pub gates: Vec<Gate>,
}

/// The simulation engine
pub struct SimWorld {
    network: Arc<RoadNetwork>,
    config: SimConfig,

    /// Live agents in iteration order
    agents: Vec<Agent>,

    /// Next ID to assign
    next_id: usize,

    tick: u64,
    entered: u64,
    exited: u64,

    /// Optional seeded RNG for reproducible simulations
    rng: Option<StdRng>,

    pub stats: WorldStats,
    trips: TripLog,
}

impl SimWorld {
    pub fn new(network: Arc<RoadNetwork>) -> Self {
        Self::with_config(network, SimConfig::default())
    }

    /// Create a new SimWorld with a seeded RNG for reproducible simulations
    pub fn new_with_seed(network: Arc<RoadNetwork>, seed: u64) -> Self {
        Self::with_config(
            network,
            SimConfig {
                seed: Some(seed),
                ..SimConfig::default()
            },
        )
    }

    pub fn with_config(network: Arc<RoadNetwork>, config: SimConfig) -> Self {
        Self {
            network,
            rng: config.seed.map(StdRng::seed_from_u64),
            config,
            agents: Vec::new(),
            next_id: 0,
            tick: 0,
            entered: 0,
            exited: 0,
            stats: WorldStats::default(),
            trips: TripLog::default(),
        }
    }

    /// Uniform value in `[0, 1)`, using seeded RNG if available
    fn random_unit(&mut self) -> f64 {
        match &mut self.rng {
            Some(rng) => rng.random_range(0.0..1.0),
            None => rand::rng().random_range(0.0..1.0),
        }
    }

    /// Choose a random element from a slice, using seeded RNG if available
    fn choose_random<T: Copy>(&mut self, slice: &[T]) -> Option<T> {
        match &mut self.rng {
            Some(rng) => slice.choose(rng).copied(),
            None => slice.choose(&mut rand::rng()).copied(),
        }
    }

    fn shuffle_agents(&mut self) {
        match &mut self.rng {
            Some(rng) => self.agents.shuffle(rng),
            None => self.agents.shuffle(&mut rand::rng()),
        }
    }

    /// Hand out the next agent id
    pub fn next_agent_id(&mut self) -> AgentId {
        let id = AgentId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn network(&self) -> &RoadNetwork {
        &self.network
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn population(&self) -> usize {
        self.agents.len()
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|agent| agent.id == id)
    }

    pub fn trip_log(&self) -> &TripLog {
        &self.trips
    }

    /// Cells occupied right now, in iteration order
    pub fn positions(&self) -> Vec<Coord> {
        self.agents.iter().map(|agent| agent.current()).collect()
    }

    /// Place an agent on the map. Fails if its first cell is taken.
    pub fn insert_agent(&mut self, agent: Agent) -> Result<AgentId> {
        let start = agent.current();
        if self.agents.iter().any(|other| other.current() == start) {
            bail!("Cannot place agent {:?}: {} is occupied", agent.id, start);
        }
        let id = agent.id;
        self.agents.push(agent);
        self.entered += 1;
        self.stats.spawned += 1;
        Ok(id)
    }

    /// Spawn an agent on the composed route between two locations
    pub fn spawn_agent(&mut self, src: LocationId, dst: LocationId) -> Result<AgentId> {
        let id = self.next_agent_id();
        let mut agent = Agent::new(id, src, dst, &self.network, self.tick)
            .with_context(|| format!("Spawning agent {:?} -> {:?}", src, dst))?;
        if self.config.smart_agents {
            agent = agent.smart(self.config.stall_threshold);
        }
        self.insert_agent(agent)
    }

    /// Whether `current -> next` may happen under the given gates
    fn move_allowed(
        &self,
        current: Coord,
        next: Coord,
        gates: &HashMap<GatePair, GateState>,
        occupied: &HashSet<Coord>,
    ) -> Result<bool, SimError> {
        if occupied.contains(&next) {
            return Ok(false);
        }
        let pair = match (
            self.network.intersection_id_for(current),
            self.network.intersection_id_for(next),
        ) {
            (None, Some(_)) => GatePair::new(current, next),
            (Some(_), None) => GatePair::new(next, current),
            _ => return Ok(true),
        };
        let state = gates
            .get(&pair)
            .ok_or(SimError::MissingGate { from: current, to: next })?;
        Ok(*state == GateState::Open)
    }

    /// Run one tick against the gate states from the arbiter
    pub fn step(&mut self, gates: &[Gate]) -> Result<TickOutcome> {
        self.tick += 1;

        let states: HashMap<GatePair, GateState> =
            gates.iter().map(|gate| (gate.pair, gate.state)).collect();
        let blocked: HashSet<GatePair> = gates
            .iter()
            .filter(|gate| gate.is_closed())
            .map(|gate| gate.pair)
            .collect();
        let mut occupied: HashSet<Coord> = self.positions().into_iter().collect();

        let mut finished: HashSet<AgentId> = HashSet::new();
        let mut moved = 0;
        let mut stalled = 0;

        // Order is reshuffled every tick so no agent always moves first;
        // removals are applied after the pass
        for i in (0..self.agents.len()).rev() {
            let agent = &self.agents[i];
            let current = agent.current();

            if agent.at_destination() {
                finished.insert(agent.id);
                occupied.remove(&current);
                self.exited += 1;
                self.stats.completed += 1;
                self.trips.record(TripRecord {
                    origin: agent.origin,
                    destination: agent.destination(),
                    ticks: self.tick - agent.spawned_at,
                });
                continue;
            }

            let id = agent.id;
            let next = agent.next_coord().ok_or(SimError::RouteExhausted(id))?;

            if self
                .move_allowed(current, next, &states, &occupied)
                .with_context(|| format!("Moving agent {:?}", id))?
            {
                if self.random_unit() < self.config.advance_probability {
                    occupied.remove(&current);
                    occupied.insert(next);
                    self.agents[i].advance();
                    moved += 1;
                }
                continue;
            }

            stalled += 1;
            self.stats.stalls += 1;
            if self.agents[i].record_stall() {
                self.stats.replans_attempted += 1;
                match self.agents[i].replan(&self.network, &blocked)? {
                    ReplanOutcome::Rerouted => self.stats.replans_succeeded += 1,
                    ReplanOutcome::Unreachable => self.stats.replans_unreachable += 1,
                }
            }
        }

        if !finished.is_empty() {
            self.agents.retain(|agent| !finished.contains(&agent.id));
        }

        let spawn = self.try_spawn(&occupied)?;
        if let SpawnOutcome::Rejected(reason) = spawn {
            self.stats.spawn_rejections += 1;
            debug!("Tick {}: spawn rejected ({:?})", self.tick, reason);
        }

        self.verify_population()?;
        self.shuffle_agents();

        let mut completed: Vec<AgentId> = finished.into_iter().collect();
        completed.sort();
        Ok(TickOutcome {
            tick: self.tick,
            moved,
            stalled,
            completed,
            spawn,
        })
    }

    /// Roll for a new agent at a random source
    fn try_spawn(&mut self, occupied: &HashSet<Coord>) -> Result<SpawnOutcome> {
        let probability = self.config.spawn_probability(self.agents.len());
        if probability <= 0.0 || self.random_unit() >= probability {
            return Ok(SpawnOutcome::Skipped);
        }

        let sources = self.network.source_locations();
        let Some(src) = self.choose_random(&sources) else {
            warn!("No location can spawn agents");
            return Ok(SpawnOutcome::Skipped);
        };
        let destinations: Vec<LocationId> = self
            .network
            .locations()
            .map(|location| location.id)
            .filter(|id| *id != src)
            .collect();
        let Some(dst) = self.choose_random(&destinations) else {
            return Ok(SpawnOutcome::Skipped);
        };

        if let Some(exclusion) = self
            .network
            .spawn_exclusions()
            .iter()
            .find(|exclusion| exclusion.sources.contains(&src) && occupied.contains(&exclusion.cell))
        {
            return Ok(SpawnOutcome::Rejected(SpawnRejection::Congested(exclusion.cell)));
        }

        let start = self
            .network
            .location(src)?
            .source
            .ok_or(SimError::NoSource(src))?;
        if occupied.contains(&start) {
            return Ok(SpawnOutcome::Rejected(SpawnRejection::Occupied(start)));
        }

        let id = self.spawn_agent(src, dst)?;
        debug!("Tick {}: spawned {:?} {:?} -> {:?}", self.tick, id, src, dst);
        Ok(SpawnOutcome::Spawned(id))
    }

    /// Live agents must equal entered minus exited
    pub fn verify_population(&self) -> Result<(), SimError> {
        let live = self.agents.len();
        if live as u64 + self.exited != self.entered {
            return Err(SimError::Bookkeeping {
                live,
                entered: self.entered,
                exited: self.exited,
            });
        }
        Ok(())
    }

    /// Snapshot for renderers
    pub fn frame(&self, gates: &[Gate]) -> Frame {
        Frame {
            tick: self.tick,
            agents: self
                .agents
                .iter()
                .map(|agent| AgentView {
                    id: agent.id,
                    coord: agent.current(),
                    destination: agent.dst,
                    smart: agent.is_smart(),
                })
                .collect(),
            gates: gates.to_vec(),
        }
    }
}

/// ASCII map of a frame.
///
/// `#` unreachable, `.` lane, `+` intersection, `*` location cell, digits are
/// agents labelled with their destination id. The last line counts open gates.
pub fn draw_map(network: &RoadNetwork, frame: &Frame) -> String {
    let agents: HashMap<Coord, LocationId> = frame
        .agents
        .iter()
        .map(|view| (view.coord, view.destination))
        .collect();

    let mut out = String::new();
    let _ = writeln!(out, "Tick {}", frame.tick);
    for y in 0..network.height() {
        for x in 0..network.width() {
            let coord = Coord::new(x, y);
            let symbol = match agents.get(&coord) {
                Some(destination) => char::from_digit((destination.0 % 10) as u32, 10).unwrap_or('@'),
                None => match network.cell_kind(coord) {
                    CellKind::Unreachable => '#',
                    CellKind::Walkable => ' ',
                    CellKind::Lane => '.',
                    CellKind::Interior => '+',
                    CellKind::Endpoint => '*',
                },
            };
            out.push(symbol);
        }
        out.push('\n');
    }

    let open = frame.gates.iter().filter(|gate| !gate.is_closed()).count();
    let _ = writeln!(out, "Gates open: {}/{}", open, frame.gates.len());
    out
}
