//! Backend readiness state machine.
//!
//! `Unknown -> Healthy | Unhealthy`; from `Unhealthy` the port is probed.
//! An occupied port is re-checked for health and otherwise left alone
//! (`OccupiedByOther`); a free port gets a spawn followed by a bounded,
//! fixed-interval health poll (`Started` or `StartTimedOut`).

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use ocrelay_core::Config;
use ocrelay_core::config::SupervisorConfig;

use super::SupervisorError;
use super::host::{BackendHost, SystemHost};
use super::probe::PortStatus;
use crate::backend::BackendClient;
use crate::endpoint::Endpoint;

/// Readiness-poll and launch settings.
#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    pub poll_attempts: u32,
    pub poll_interval: Duration,
    /// Default log file for the spawned backend.
    pub log_path: Option<PathBuf>,
}

impl SupervisorSettings {
    pub fn from_config(config: &SupervisorConfig) -> Self {
        Self {
            poll_attempts: config.poll_attempts,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            log_path: config.log_path.clone(),
        }
    }
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self::from_config(&SupervisorConfig::default())
    }
}

/// Snapshot of the backend's port and health, computed fresh on every query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessStatus {
    pub port: u16,
    pub in_use: bool,
    pub owner_pid: Option<u32>,
    pub owner_cmd: Option<String>,
    pub healthy: bool,
}

const fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Backend status:")?;
        writeln!(f, "Port: {}", self.port)?;
        writeln!(f, "In use: {}", yes_no(self.in_use))?;
        write!(f, "Healthy: {}", yes_no(self.healthy))?;
        if let Some(pid) = self.owner_pid {
            write!(f, "\nProcess: pid={pid}")?;
        }
        if let Some(cmd) = &self.owner_cmd {
            write!(f, "\nCommand: {cmd}")?;
        }
        Ok(())
    }
}

/// Outcome of [`Supervisor::ensure_running`].
#[derive(Debug, Clone)]
pub enum Readiness {
    /// A healthy backend was already answering; nothing was spawned.
    AlreadyRunning,
    /// The backend was spawned and passed a health check.
    Started { pid: u32, endpoint: Endpoint },
    /// Something that is not a healthy backend holds the port. Left alone.
    OccupiedByOther {
        port: u16,
        owner_pid: Option<u32>,
        owner_cmd: Option<String>,
    },
    /// The backend could not be launched.
    SpawnFailed(SupervisorError),
    /// Spawned, but not healthy within the poll window. The process is left
    /// running and may still come up.
    StartTimedOut { pid: u32 },
}

impl Readiness {
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::AlreadyRunning | Self::Started { .. })
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "Backend is already running"),
            Self::Started { pid, endpoint } => {
                write!(f, "Started backend (pid={pid}, {endpoint})")
            }
            Self::OccupiedByOther {
                port,
                owner_pid,
                owner_cmd,
            } => {
                let pid = owner_pid.map_or_else(|| "?".to_string(), |p| p.to_string());
                write!(
                    f,
                    "Port {port} is in use by another process (pid={pid}, {}), not the backend",
                    owner_cmd.as_deref().unwrap_or("?")
                )
            }
            Self::SpawnFailed(e) => write!(f, "{e}"),
            Self::StartTimedOut { pid } => write!(
                f,
                "Backend started (pid={pid}) but did not pass its health check yet; try again shortly"
            ),
        }
    }
}

/// Keeps the backend process running and healthy.
#[derive(Debug)]
pub struct Supervisor<H = SystemHost> {
    host: H,
    endpoint: Endpoint,
    settings: SupervisorSettings,
}

impl Supervisor<SystemHost> {
    /// Supervisor over the real system, with the endpoint resolved from the
    /// configured base URL.
    pub fn from_config(client: Arc<BackendClient>, config: &Config) -> Self {
        let endpoint = Endpoint::resolve(&config.backend.base_url, config.supervisor.default_port);
        let host = SystemHost::new(
            client,
            config.supervisor.command.clone(),
            Duration::from_millis(config.supervisor.probe_timeout_ms),
        );
        Self::new(host, endpoint, SupervisorSettings::from_config(&config.supervisor))
    }
}

impl<H: BackendHost> Supervisor<H> {
    pub const fn new(host: H, endpoint: Endpoint, settings: SupervisorSettings) -> Self {
        Self {
            host,
            endpoint,
            settings,
        }
    }

    /// Whether the backend currently reports healthy.
    pub async fn is_healthy(&self) -> bool {
        self.host.is_healthy().await
    }

    /// Probe `port` on the backend's host.
    pub async fn check_port(&self, port: u16) -> PortStatus {
        self.host.check_port(&self.endpoint.with_port(port)).await
    }

    /// Launch the backend on `hostname:port`.
    pub async fn start_process(
        &self,
        port: u16,
        hostname: &str,
        log_path: Option<&Path>,
    ) -> Result<u32, SupervisorError> {
        let endpoint = Endpoint {
            host: hostname.to_string(),
            port,
        };
        self.host.start_process(&endpoint, log_path).await
    }

    /// Current port occupancy and health.
    pub async fn status(&self) -> ProcessStatus {
        let port = self.host.check_port(&self.endpoint).await;
        let healthy = self.host.is_healthy().await;
        ProcessStatus {
            port: self.endpoint.port,
            in_use: port.in_use,
            owner_pid: port.owner_pid,
            owner_cmd: port.owner_cmd,
            healthy,
        }
    }

    /// Make sure a healthy backend is answering, starting one if the port is free.
    ///
    /// Idempotent: a healthy backend short-circuits before any probe or spawn.
    /// `port` and `log_path` override the configured values for this attempt.
    pub async fn ensure_running(&self, port: Option<u16>, log_path: Option<&Path>) -> Readiness {
        if self.host.is_healthy().await {
            debug!("Backend already healthy");
            return Readiness::AlreadyRunning;
        }

        let endpoint = port.map_or_else(|| self.endpoint.clone(), |p| self.endpoint.with_port(p));
        let port_status = self.host.check_port(&endpoint).await;
        if port_status.in_use {
            // Another instance may have just come up on the port.
            if self.host.is_healthy().await {
                debug!(port = endpoint.port, "Backend became healthy while probing");
                return Readiness::AlreadyRunning;
            }
            warn!(
                port = endpoint.port,
                owner_pid = ?port_status.owner_pid,
                owner_cmd = ?port_status.owner_cmd,
                "Port occupied by a process that is not a healthy backend"
            );
            return Readiness::OccupiedByOther {
                port: endpoint.port,
                owner_pid: port_status.owner_pid,
                owner_cmd: port_status.owner_cmd,
            };
        }

        let log_path = log_path.or(self.settings.log_path.as_deref());
        let pid = match self.host.start_process(&endpoint, log_path).await {
            Ok(pid) => pid,
            Err(e) => {
                warn!(error = %e, "Failed to start backend");
                return Readiness::SpawnFailed(e);
            }
        };

        for attempt in 1..=self.settings.poll_attempts {
            tokio::time::sleep(self.settings.poll_interval).await;
            if self.host.is_healthy().await {
                info!(pid, attempt, endpoint = %endpoint, "Backend is healthy");
                return Readiness::Started { pid, endpoint };
            }
            debug!(pid, attempt, "Backend not healthy yet");
        }

        warn!(
            pid,
            attempts = self.settings.poll_attempts,
            "Backend did not become healthy in time"
        );
        Readiness::StartTimedOut { pid }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Host whose health answers and port state are scripted up front.
    #[derive(Default)]
    struct ScriptedHost {
        /// Successive health answers; `false` once exhausted.
        health: Mutex<VecDeque<bool>>,
        port: PortStatus,
        spawn_error: Option<SupervisorError>,
        health_calls: AtomicUsize,
        port_probes: AtomicUsize,
        probed: Mutex<Vec<Endpoint>>,
        spawns: Mutex<Vec<(Endpoint, Option<PathBuf>)>>,
    }

    impl ScriptedHost {
        fn with_health(answers: &[bool]) -> Self {
            Self {
                health: Mutex::new(answers.iter().copied().collect()),
                ..Self::default()
            }
        }

        fn spawn_count(&self) -> usize {
            self.spawns.lock().unwrap().len()
        }
    }

    impl BackendHost for ScriptedHost {
        async fn is_healthy(&self) -> bool {
            self.health_calls.fetch_add(1, Ordering::SeqCst);
            self.health.lock().unwrap().pop_front().unwrap_or(false)
        }

        async fn check_port(&self, endpoint: &Endpoint) -> PortStatus {
            self.port_probes.fetch_add(1, Ordering::SeqCst);
            self.probed.lock().unwrap().push(endpoint.clone());
            self.port.clone()
        }

        async fn start_process(
            &self,
            endpoint: &Endpoint,
            log_path: Option<&Path>,
        ) -> Result<u32, SupervisorError> {
            self.spawns
                .lock()
                .unwrap()
                .push((endpoint.clone(), log_path.map(Path::to_path_buf)));
            match &self.spawn_error {
                Some(e) => Err(e.clone()),
                None => Ok(4242),
            }
        }
    }

    fn supervisor(host: ScriptedHost) -> Supervisor<ScriptedHost> {
        Supervisor::new(
            host,
            Endpoint {
                host: "127.0.0.1".into(),
                port: 4096,
            },
            SupervisorSettings {
                poll_attempts: 10,
                poll_interval: Duration::from_millis(1),
                log_path: None,
            },
        )
    }

    fn occupied() -> PortStatus {
        PortStatus {
            in_use: true,
            owner_pid: Some(777),
            owner_cmd: Some("python3 -m http.server 4096".into()),
        }
    }

    #[tokio::test]
    async fn healthy_backend_short_circuits() {
        let sup = supervisor(ScriptedHost::with_health(&[true, true]));

        assert!(matches!(sup.ensure_running(None, None).await, Readiness::AlreadyRunning));
        assert!(matches!(sup.ensure_running(None, None).await, Readiness::AlreadyRunning));

        assert_eq!(sup.host.spawn_count(), 0);
        assert_eq!(sup.host.port_probes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn foreign_occupant_is_reported_not_evicted() {
        let host = ScriptedHost {
            port: occupied(),
            ..ScriptedHost::with_health(&[false, false])
        };
        let sup = supervisor(host);

        let outcome = sup.ensure_running(None, None).await;
        assert!(!outcome.is_ready());
        assert!(matches!(
            outcome,
            Readiness::OccupiedByOther {
                port: 4096,
                owner_pid: Some(777),
                ..
            }
        ));
        let message = outcome.to_string();
        assert!(message.contains("pid=777"), "{message}");
        assert!(message.contains("python3 -m http.server"), "{message}");
        assert_eq!(sup.host.spawn_count(), 0);
    }

    #[tokio::test]
    async fn unknown_occupant_renders_placeholders() {
        let host = ScriptedHost {
            port: PortStatus {
                in_use: true,
                owner_pid: None,
                owner_cmd: None,
            },
            ..ScriptedHost::default()
        };
        let outcome = supervisor(host).ensure_running(None, None).await;
        assert_eq!(
            outcome.to_string(),
            "Port 4096 is in use by another process (pid=?, ?), not the backend"
        );
    }

    #[tokio::test]
    async fn occupied_port_that_turns_healthy_is_ready() {
        let host = ScriptedHost {
            port: occupied(),
            ..ScriptedHost::with_health(&[false, true])
        };
        let sup = supervisor(host);

        assert!(matches!(sup.ensure_running(None, None).await, Readiness::AlreadyRunning));
        assert_eq!(sup.host.spawn_count(), 0);
    }

    #[tokio::test]
    async fn ready_after_fifth_poll_not_earlier() {
        // Initial check, then four failed polls before the healthy one.
        let sup = supervisor(ScriptedHost::with_health(&[
            false, false, false, false, false, true,
        ]));

        let outcome = sup.ensure_running(None, None).await;
        assert!(outcome.is_ready());
        assert!(matches!(outcome, Readiness::Started { pid: 4242, .. }));
        assert_eq!(sup.host.health_calls.load(Ordering::SeqCst), 6);
        assert_eq!(sup.host.spawn_count(), 1);
    }

    #[tokio::test]
    async fn never_healthy_times_out_after_bounded_polls() {
        let sup = supervisor(ScriptedHost::default());

        let outcome = sup.ensure_running(None, None).await;
        assert!(matches!(outcome, Readiness::StartTimedOut { pid: 4242 }));
        assert!(!outcome.is_ready());
        assert_eq!(sup.host.health_calls.load(Ordering::SeqCst), 11);
        assert_eq!(sup.host.spawn_count(), 1);
    }

    #[tokio::test]
    async fn spawn_failure_is_reported() {
        let host = ScriptedHost {
            spawn_error: Some(SupervisorError::SpawnFailed {
                program: "opencode".into(),
            }),
            ..ScriptedHost::default()
        };
        let sup = supervisor(host);

        let outcome = sup.ensure_running(None, None).await;
        assert!(matches!(
            outcome,
            Readiness::SpawnFailed(SupervisorError::SpawnFailed { .. })
        ));
        assert!(outcome.to_string().contains("opencode"));
        // No polling after a failed spawn.
        assert_eq!(sup.host.health_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn port_and_log_path_overrides_reach_the_launcher() {
        let mut sup = supervisor(ScriptedHost::with_health(&[false, true]));
        sup.settings.log_path = Some(PathBuf::from("/var/log/default.log"));

        sup.ensure_running(Some(5000), Some(Path::new("/tmp/override.log")))
            .await;
        sup.ensure_running(None, None).await;

        let spawns = sup.host.spawns.lock().unwrap();
        assert_eq!(spawns[0].0.port, 5000);
        assert_eq!(spawns[0].1.as_deref(), Some(Path::new("/tmp/override.log")));
        assert_eq!(spawns[1].0.port, 4096);
        assert_eq!(spawns[1].1.as_deref(), Some(Path::new("/var/log/default.log")));
    }

    #[tokio::test]
    async fn is_healthy_delegates_to_host() {
        let sup = supervisor(ScriptedHost::with_health(&[true, false]));
        assert!(sup.is_healthy().await);
        assert!(!sup.is_healthy().await);
        assert_eq!(sup.host.health_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn check_port_probes_requested_port_on_backend_host() {
        let host = ScriptedHost {
            port: occupied(),
            ..ScriptedHost::default()
        };
        let sup = supervisor(host);

        assert_eq!(sup.check_port(8080).await, occupied());
        let probed = sup.host.probed.lock().unwrap();
        assert_eq!(
            *probed,
            [Endpoint {
                host: "127.0.0.1".into(),
                port: 8080,
            }]
        );
    }

    #[tokio::test]
    async fn start_process_launches_on_given_host_and_port() {
        let sup = supervisor(ScriptedHost::default());

        let pid = sup
            .start_process(5001, "0.0.0.0", Some(Path::new("/tmp/backend.log")))
            .await
            .unwrap();
        assert_eq!(pid, 4242);

        let spawns = sup.host.spawns.lock().unwrap();
        assert_eq!(spawns.len(), 1);
        assert_eq!(spawns[0].0.host, "0.0.0.0");
        assert_eq!(spawns[0].0.port, 5001);
        assert_eq!(spawns[0].1.as_deref(), Some(Path::new("/tmp/backend.log")));
        // Direct launches skip the health check entirely.
        assert_eq!(sup.host.health_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn start_process_surfaces_spawn_errors() {
        let host = ScriptedHost {
            spawn_error: Some(SupervisorError::SpawnFailed {
                program: "opencode".into(),
            }),
            ..ScriptedHost::default()
        };
        let err = supervisor(host)
            .start_process(4096, "127.0.0.1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, SupervisorError::SpawnFailed { .. }));
    }

    #[tokio::test]
    async fn status_reports_port_and_health() {
        let host = ScriptedHost {
            port: occupied(),
            ..ScriptedHost::with_health(&[true])
        };
        let status = supervisor(host).status().await;
        assert_eq!(status.port, 4096);
        assert!(status.in_use);
        assert!(status.healthy);
        assert_eq!(
            status.to_string(),
            "Backend status:\nPort: 4096\nIn use: yes\nHealthy: yes\nProcess: pid=777\nCommand: python3 -m http.server 4096"
        );
    }

    #[tokio::test]
    async fn status_of_idle_port() {
        let status = supervisor(ScriptedHost::default()).status().await;
        assert_eq!(
            status.to_string(),
            "Backend status:\nPort: 4096\nIn use: no\nHealthy: no"
        );
    }
}
