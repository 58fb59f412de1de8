//! The supervisor's view of the machine it runs on.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::SupervisorError;
use super::launcher;
use super::probe::{self, PortStatus};
use crate::backend::BackendClient;
use crate::endpoint::Endpoint;

/// Health, port and process primitives the supervisor's state machine runs on.
pub trait BackendHost: Send + Sync {
    /// Whether the backend reports itself healthy. Never fails: transport
    /// errors, non-2xx replies and malformed bodies all count as `false`.
    fn is_healthy(&self) -> impl Future<Output = bool> + Send;

    /// Probe whether anything listens on `endpoint`.
    fn check_port(&self, endpoint: &Endpoint) -> impl Future<Output = PortStatus> + Send;

    /// Launch the backend detached, returning its pid.
    fn start_process(
        &self,
        endpoint: &Endpoint,
        log_path: Option<&Path>,
    ) -> impl Future<Output = Result<u32, SupervisorError>> + Send;
}

/// The real host: HTTP health checks, TCP probes, OS processes.
#[derive(Debug, Clone)]
pub struct SystemHost {
    client: Arc<BackendClient>,
    command: Vec<String>,
    probe_timeout: Duration,
}

impl SystemHost {
    pub const fn new(
        client: Arc<BackendClient>,
        command: Vec<String>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            client,
            command,
            probe_timeout,
        }
    }
}

impl BackendHost for SystemHost {
    async fn is_healthy(&self) -> bool {
        match self.client.health().await {
            Ok(health) => health.healthy,
            Err(e) => {
                debug!(error = %e, "Backend health check failed");
                false
            }
        }
    }

    async fn check_port(&self, endpoint: &Endpoint) -> PortStatus {
        probe::check_port(&endpoint.host, endpoint.port, self.probe_timeout).await
    }

    async fn start_process(
        &self,
        endpoint: &Endpoint,
        log_path: Option<&Path>,
    ) -> Result<u32, SupervisorError> {
        launcher::start_process(&self.command, endpoint, log_path).await
    }
}
