//! Three-stage tick pipeline
//!
//! Sensing and arbitration each run on their own thread; the engine runs on
//! the caller's. Stages only talk through single-slot channels, so no stage
//! can start tick N+1 before its tick-N output has been taken. Dropping the
//! engine's ends of the channels shuts the other two stages down.

use anyhow::{bail, Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, info};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::arbiter::IntersectionArbiter;
use super::error::SimError;
use super::road_network::RoadNetwork;
use super::sensing::OccupancyGrid;
use super::travel_time::IdealTravelTimes;
use super::types::{Coord, Gate};
use super::world::{Frame, SimConfig, SimWorld};
use crate::stats::RunReport;

fn spawn_sensing(
    network: Arc<RoadNetwork>,
    positions_rx: Receiver<Vec<Coord>>,
    grid_tx: Sender<OccupancyGrid>,
) -> Result<JoinHandle<Result<()>>> {
    let handle = thread::Builder::new()
        .name("sensing".into())
        .spawn(move || -> Result<()> {
            let mut grid = OccupancyGrid::new(&network);
            for positions in positions_rx.iter() {
                grid.update(&positions);
                if grid_tx.send(grid.clone()).is_err() {
                    break;
                }
            }
            debug!("Sensing stage stopped");
            Ok(())
        })
        .context("Starting sensing stage")?;
    Ok(handle)
}

fn spawn_arbiter(
    mut arbiter: IntersectionArbiter,
    grid_rx: Receiver<OccupancyGrid>,
    gates_tx: Sender<Vec<Gate>>,
) -> Result<JoinHandle<Result<()>>> {
    let handle = thread::Builder::new()
        .name("arbiter".into())
        .spawn(move || -> Result<()> {
            for grid in grid_rx.iter() {
                let gates = arbiter.arbitrate(&grid)?;
                if gates_tx.send(gates).is_err() {
                    break;
                }
            }
            debug!("Arbiter stage stopped");
            Ok(())
        })
        .context("Starting arbiter stage")?;
    Ok(handle)
}

fn join_stage(handle: JoinHandle<Result<()>>, name: &str) -> Result<()> {
    match handle.join() {
        Ok(result) => result.with_context(|| format!("{} stage failed", name)),
        Err(_) => bail!("{} stage panicked", name),
    }
}

/// Owns everything needed for one run
pub struct Pipeline {
    network: Arc<RoadNetwork>,
    config: SimConfig,
    ideal: IdealTravelTimes,
}

impl Pipeline {
    /// Computes the ideal travel times up front
    pub fn new(network: Arc<RoadNetwork>, config: SimConfig) -> Result<Self> {
        let ideal = IdealTravelTimes::new(&network).context("Computing ideal travel times")?;
        Ok(Self {
            network,
            config,
            ideal,
        })
    }

    pub fn ideal_times(&self) -> &IdealTravelTimes {
        &self.ideal
    }

    /// Run `ticks` ticks, handing every frame to `observer`
    pub fn run<F>(&self, ticks: u64, mut observer: F) -> Result<RunReport>
    where
        F: FnMut(&Frame),
    {
        let (positions_tx, positions_rx) = bounded::<Vec<Coord>>(1);
        let (grid_tx, grid_rx) = bounded::<OccupancyGrid>(1);
        let (gates_tx, gates_rx) = bounded::<Vec<Gate>>(1);

        let sensing = spawn_sensing(Arc::clone(&self.network), positions_rx, grid_tx)?;
        let arbiter = spawn_arbiter(IntersectionArbiter::new(&self.network), grid_rx, gates_tx)?;

        let mut world = SimWorld::with_config(Arc::clone(&self.network), self.config.clone());
        info!(
            "Running {} ticks ({} gates, {} locations)",
            ticks,
            self.network.gate_count(),
            self.network.locations().count()
        );

        let outcome = drive(&mut world, ticks, &positions_tx, &gates_rx, &mut observer);

        drop(positions_tx);
        drop(gates_rx);
        let stages = join_stage(sensing, "sensing").and(join_stage(arbiter, "arbiter"));

        // A stage failure explains a closed channel better than the channel does
        match (outcome, stages) {
            (Ok(()), Ok(())) => {}
            (_, Err(stage_error)) => return Err(stage_error),
            (Err(error), Ok(())) => return Err(error),
        }

        let response = self
            .ideal
            .response_ratio(&world.trip_log().mean_durations())
            .context("Comparing against ideal travel times")?;
        Ok(RunReport::new(&world, response))
    }
}

/// Engine side of the loop: publish positions, wait for gates, step
fn drive<F>(
    world: &mut SimWorld,
    ticks: u64,
    positions_tx: &Sender<Vec<Coord>>,
    gates_rx: &Receiver<Vec<Gate>>,
    observer: &mut F,
) -> Result<()>
where
    F: FnMut(&Frame),
{
    for _ in 0..ticks {
        positions_tx
            .send(world.positions())
            .map_err(|_| SimError::ChannelClosed("sensing"))?;
        let gates = gates_rx
            .recv()
            .map_err(|_| SimError::ChannelClosed("arbiter"))?;
        world.step(&gates)?;
        observer(&world.frame(&gates));
    }
    Ok(())
}
