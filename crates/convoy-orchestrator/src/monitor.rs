//! Progress monitor
//!
//! A cooperative polling loop: on every tick, each agent's status file is
//! freshly read from the channel and folded into a fleet view. Per-agent
//! state is monotonic (waiting → running → complete, no regression). The
//! loop exits on full completion or at the tick cap; the cap is a
//! first-class outcome, not an error, and the run proceeds to
//! verification either way.

use convoy_core::{AgentState, AgentStatus};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, warn};

use crate::channel::CommunicationChannel;

/// Monitor cadence
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Interval between ticks
    pub tick: Duration,
    /// Maximum ticks before timing out
    pub max_ticks: u32,
    /// Emit status lines every N ticks
    pub report_every: u32,
}

impl MonitorConfig {
    pub fn new(tick: Duration, max_ticks: u32, report_every: u32) -> Self {
        Self {
            tick,
            max_ticks,
            report_every: report_every.max(1),
        }
    }
}

/// How the monitoring loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// Every agent reached `complete` at the given tick
    Completed { ticks: u32 },
    /// The tick cap was reached first
    TimedOut { ticks: u32, incomplete: Vec<String> },
}

impl MonitorOutcome {
    pub fn all_complete(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Aggregated fleet state with the no-regression rule applied
///
/// Pure; all I/O stays in [`ProgressMonitor`].
#[derive(Debug, Clone)]
pub struct FleetView {
    statuses: BTreeMap<String, AgentStatus>,
    order: Vec<String>,
}

impl FleetView {
    pub fn new(agent_ids: &[String]) -> Self {
        Self {
            statuses: agent_ids
                .iter()
                .map(|id| (id.clone(), AgentStatus::waiting()))
                .collect(),
            order: agent_ids.to_vec(),
        }
    }

    /// Fold one observation in, ignoring state regressions
    pub fn observe(&mut self, agent_id: &str, status: AgentStatus) {
        if let Some(current) = self.statuses.get_mut(agent_id) {
            if status.status >= current.status {
                *current = status;
            }
        }
    }

    pub fn get(&self, agent_id: &str) -> Option<&AgentStatus> {
        self.statuses.get(agent_id)
    }

    pub fn all_complete(&self) -> bool {
        self.statuses.values().all(|s| s.is_complete())
    }

    /// Ids of agents not yet complete, in registry order
    pub fn incomplete(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|id| !self.statuses[*id].is_complete())
            .cloned()
            .collect()
    }

    pub fn complete_count(&self) -> usize {
        self.statuses.values().filter(|s| s.is_complete()).count()
    }

    /// Statuses in registry order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AgentStatus)> {
        self.order.iter().map(|id| (id, &self.statuses[id]))
    }
}

/// Polling progress monitor over the communication channel
pub struct ProgressMonitor {
    channel: CommunicationChannel,
    agent_ids: Vec<String>,
    config: MonitorConfig,
}

impl ProgressMonitor {
    pub fn new(channel: CommunicationChannel, agent_ids: Vec<String>, config: MonitorConfig) -> Self {
        Self {
            channel,
            agent_ids,
            config,
        }
    }

    /// Run the polling loop to completion or the tick cap
    ///
    /// Returns the final fleet view alongside the outcome so verification
    /// can report the residual gap.
    pub async fn run(&self) -> (MonitorOutcome, FleetView) {
        let mut view = FleetView::new(&self.agent_ids);

        for tick in 1..=self.config.max_ticks {
            for id in &self.agent_ids {
                let status = self.channel.read_status(id);
                view.observe(id, status);
            }

            if tick % self.config.report_every == 0 {
                self.report(tick, &view);
            }

            if view.all_complete() {
                info!("Fleet complete after {} tick(s)", tick);
                return (MonitorOutcome::Completed { ticks: tick }, view);
            }

            tokio::time::sleep(self.config.tick).await;
        }

        let incomplete = view.incomplete();
        warn!(
            "Monitor timed out after {} ticks; incomplete: {}",
            self.config.max_ticks,
            incomplete.join(", ")
        );
        (
            MonitorOutcome::TimedOut {
                ticks: self.config.max_ticks,
                incomplete,
            },
            view,
        )
    }

    fn report(&self, tick: u32, view: &FleetView) {
        info!("--- tick {} ---", tick);
        for (id, status) in view.iter() {
            info!(
                "  {} {:<10} {:>3}% {}",
                indicator(status.status),
                id,
                status.completion,
                status.status
            );
        }
    }
}

/// State-specific status line indicator
fn indicator(state: AgentState) -> &'static str {
    match state {
        AgentState::Waiting => "[ ]",
        AgentState::Running => "[~]",
        AgentState::Complete => "[x]",
    }
}
