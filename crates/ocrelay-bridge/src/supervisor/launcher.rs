//! Backend process launching.
//!
//! The backend runs detached in its own session so it outlives the relay and
//! is untouched by signals aimed at the relay's process group.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{info, warn};

use super::SupervisorError;
use crate::endpoint::Endpoint;

/// Spawn `command --port <port> --hostname <host>` in the background.
///
/// Output is appended to `log_path` when given and discarded otherwise. The
/// child is reaped on a background task; it is never killed by the relay.
/// Must be called inside a Tokio runtime.
pub async fn start_process(
    command: &[String],
    endpoint: &Endpoint,
    log_path: Option<&Path>,
) -> Result<u32, SupervisorError> {
    let Some((program, base_args)) = command.split_first() else {
        return Err(SupervisorError::Spawn {
            reason: "backend command is empty".to_string(),
        });
    };

    let (stdout, stderr) = match log_path {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| SupervisorError::Spawn {
                    reason: format!("cannot open log file {}: {e}", path.display()),
                })?;
            let err_file = file.try_clone().map_err(|e| SupervisorError::Spawn {
                reason: format!("cannot open log file {}: {e}", path.display()),
            })?;
            (Stdio::from(file), Stdio::from(err_file))
        }
        None => (Stdio::null(), Stdio::null()),
    };

    let working_dir = dirs::home_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(std::env::temp_dir);

    let mut cmd = Command::new(program);
    cmd.args(base_args)
        .arg("--port")
        .arg(endpoint.port.to_string())
        .arg("--hostname")
        .arg(&endpoint.host)
        .current_dir(&working_dir)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .kill_on_drop(false);

    #[cfg(unix)]
    {
        // SAFETY: setsid(2) is async-signal-safe and touches no parent state;
        // it only detaches the forked child into a new session.
        #[allow(unsafe_code)]
        unsafe {
            cmd.pre_exec(|| {
                if libc::setsid() == -1 {
                    return Err(std::io::Error::last_os_error());
                }
                Ok(())
            });
        }
    }

    info!(
        program = %program,
        endpoint = %endpoint,
        log_path = ?log_path.map(Path::display),
        working_dir = %working_dir.display(),
        "Spawning backend process"
    );

    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            SupervisorError::SpawnFailed {
                program: program.clone(),
            }
        } else {
            SupervisorError::Spawn {
                reason: e.to_string(),
            }
        }
    })?;

    let Some(pid) = child.id() else {
        return Err(SupervisorError::Spawn {
            reason: "backend exited before its pid could be read".to_string(),
        });
    };

    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => info!(pid, %status, "Backend process exited"),
            Err(e) => warn!(pid, error = %e, "Failed to wait for backend process"),
        }
    });

    Ok(pid)
}
