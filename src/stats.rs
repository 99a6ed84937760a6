use log::info;

use crate::simulation::SimWorld;

/// End-of-run statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub ticks: u64,
    pub total_agents_spawned: u64,
    pub total_trips_completed: u64,
    pub active_agents: usize,
    pub spawn_rejections: u64,
    pub stalls: u64,
    pub replans_succeeded: u64,
    pub replans_unreachable: u64,
    /// Observed over ideal mean trip time, in percent
    pub response_time: Option<f64>,
}

impl RunReport {
    pub fn new(world: &SimWorld, response_time: Option<f64>) -> Self {
        Self {
            ticks: world.tick(),
            total_agents_spawned: world.stats.spawned,
            total_trips_completed: world.stats.completed,
            active_agents: world.population(),
            spawn_rejections: world.stats.spawn_rejections,
            stalls: world.stats.stalls,
            replans_succeeded: world.stats.replans_succeeded,
            replans_unreachable: world.stats.replans_unreachable,
            response_time,
        }
    }

    /// Share of spawned agents that finished their trip
    pub fn completion_rate(&self) -> f64 {
        if self.total_agents_spawned == 0 {
            return 0.0;
        }
        self.total_trips_completed as f64 / self.total_agents_spawned as f64 * 100.0
    }

    pub fn log(&self) {
        info!("=== SIMULATION COMPLETE ===");
        info!("Ticks: {}", self.ticks);
        info!("Total agents spawned: {}", self.total_agents_spawned);
        info!("Total trips completed: {}", self.total_trips_completed);
        info!("Active agents: {}", self.active_agents);
        info!("Spawn rejections: {}", self.spawn_rejections);
        info!("Stalled moves: {}", self.stalls);
        info!(
            "Replans: {} rerouted, {} unreachable",
            self.replans_succeeded, self.replans_unreachable
        );
        info!("Completion rate: {:.1}%", self.completion_rate());
        match self.response_time {
            Some(percent) => info!("Response time: {:.1}%", percent),
            None => info!("Response time: n/a"),
        }
    }
}
