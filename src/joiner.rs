// Overlay network join, manager nodes only. The network may legitimately
// not exist yet during cluster bootstrap, so "not found" retries forever;
// a non-attachable network is a terminal give-up, never a process failure.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::docker_client::{DockerClientError, SwarmApi};

pub const RETRY_DELAY: Duration = Duration::from_millis(2500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinState {
    Searching,
    /// Connected to the overlay network.
    Joined,
    /// The network exists but is not attachable; this node will not be
    /// reachable for maintenance/metrics calls.
    GivenUp,
}

impl JoinState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JoinState::Joined | JoinState::GivenUp)
    }
}

pub struct NetworkJoiner {
    swarm: Arc<dyn SwarmApi>,
    network: String,
    container: String,
    state: JoinState,
}

impl NetworkJoiner {
    pub fn new(swarm: Arc<dyn SwarmApi>, network: String, container: String) -> Self {
        Self {
            swarm,
            network,
            container,
            state: JoinState::Searching,
        }
    }

    pub fn state(&self) -> JoinState {
        self.state
    }

    /// One inspect-and-maybe-connect attempt. Transient errors and "not
    /// found" both leave the machine in `Searching` (the original conflates
    /// the two on purpose; retrying is harmless either way).
    pub async fn step(&mut self) -> JoinState {
        if self.state.is_terminal() {
            return self.state;
        }
        match self.swarm.inspect_network(&self.network).await {
            Ok(net) if !net.attachable => {
                warn!(network = %self.network, "overlay network is not attachable, giving up");
                self.state = JoinState::GivenUp;
            }
            Ok(net) => match self.swarm.connect_network(&net.id, &self.container).await {
                Ok(()) => {
                    info!(network = %self.network, container = %self.container, "joined overlay network");
                    self.state = JoinState::Joined;
                }
                Err(e) => {
                    warn!(network = %self.network, error = %e, "connect failed, will retry");
                }
            },
            Err(DockerClientError::NotFound) => {
                info!(network = %self.network, "overlay network not found yet, will retry");
            }
            Err(e) => {
                warn!(network = %self.network, error = %e, "network inspect failed, will retry");
            }
        }
        self.state
    }

    /// Run to a terminal state with a fixed retry cadence. There is no
    /// failure timeout; the caller owns the task's lifetime.
    pub async fn run(mut self) -> JoinState {
        loop {
            if self.step().await.is_terminal() {
                return self.state;
            }
            tokio::time::sleep(RETRY_DELAY).await;
        }
    }
}
