//! Port occupancy probing.
//!
//! A raw TCP connect decides whether the port is taken. Identifying the
//! owning process is advisory: it is tried via procfs first, then via
//! `lsof`, `fuser` and `ss`, and any failure just leaves the owner unknown.

use std::time::Duration;

use tokio::net::TcpStream;
use tokio::process::Command;
use tracing::debug;

/// Longest owner command line reported.
pub const MAX_OWNER_CMD_CHARS: usize = 80;

const TOOL_TIMEOUT: Duration = Duration::from_secs(2);

/// Result of probing one port.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortStatus {
    pub in_use: bool,
    pub owner_pid: Option<u32>,
    pub owner_cmd: Option<String>,
}

/// Probe `host:port` with a raw connection, then try to name the owner.
pub async fn check_port(host: &str, port: u16, connect_timeout: Duration) -> PortStatus {
    let connected = matches!(
        tokio::time::timeout(connect_timeout, TcpStream::connect((host, port))).await,
        Ok(Ok(_))
    );
    if !connected {
        return PortStatus::default();
    }

    let owner_pid = identify_owner(port).await;
    let owner_cmd = owner_pid.and_then(read_cmdline);
    debug!(port, ?owner_pid, ?owner_cmd, "Port is in use");
    PortStatus {
        in_use: true,
        owner_pid,
        owner_cmd,
    }
}

async fn identify_owner(port: u16) -> Option<u32> {
    if let Ok(Some(pid)) = tokio::task::spawn_blocking(move || owner_from_procfs(port)).await {
        return Some(pid);
    }
    owner_from_tools(port).await
}

#[cfg(target_os = "linux")]
fn owner_from_procfs(port: u16) -> Option<u32> {
    let mut inodes = Vec::new();
    for table in ["/proc/net/tcp", "/proc/net/tcp6"] {
        if let Ok(contents) = std::fs::read_to_string(table) {
            inodes.extend(listening_inodes(&contents, port));
        }
    }
    if inodes.is_empty() {
        return None;
    }
    let targets: Vec<String> = inodes.iter().map(|i| format!("socket:[{i}]")).collect();

    for entry in std::fs::read_dir("/proc").ok()?.flatten() {
        let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else {
            continue;
        };
        let Ok(fds) = std::fs::read_dir(entry.path().join("fd")) else {
            continue;
        };
        for fd in fds.flatten() {
            if let Ok(link) = std::fs::read_link(fd.path()) {
                if targets.iter().any(|t| link.as_os_str() == t.as_str()) {
                    return Some(pid);
                }
            }
        }
    }
    None
}

#[cfg(not(target_os = "linux"))]
const fn owner_from_procfs(_port: u16) -> Option<u32> {
    None
}

/// Socket inodes in a `/proc/net/tcp`-format table listening on `port`.
pub(crate) fn listening_inodes(table: &str, port: u16) -> Vec<u64> {
    const TCP_LISTEN: &str = "0A";
    table
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let local = fields.get(1)?;
            let state = fields.get(3)?;
            let inode = fields.get(9)?;
            let (_, port_hex) = local.rsplit_once(':')?;
            let local_port = u16::from_str_radix(port_hex, 16).ok()?;
            if local_port != port || *state != TCP_LISTEN {
                return None;
            }
            inode.parse().ok().filter(|&i| i != 0)
        })
        .collect()
}

async fn owner_from_tools(port: u16) -> Option<u32> {
    let port_arg = format!(":{port}");
    let fuser_arg = format!("{port}/tcp");
    for (program, args) in [
        ("lsof", vec!["-i", port_arg.as_str(), "-t"]),
        ("fuser", vec![fuser_arg.as_str()]),
    ] {
        if let Some(output) = run_tool(program, &args).await {
            if let Some(pid) = first_pid(&output) {
                return Some(pid);
            }
        }
    }

    let output = run_tool("ss", &["-tlnp"]).await?;
    pid_from_ss(&output, port)
}

/// Run a diagnostic tool, returning stdout (or stderr when stdout is empty)
/// on success. Missing tools, failures and timeouts all yield `None`.
async fn run_tool(program: &str, args: &[&str]) -> Option<String> {
    let output = tokio::time::timeout(
        TOOL_TIMEOUT,
        Command::new(program).args(args).kill_on_drop(true).output(),
    )
    .await
    .ok()?
    .ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return (!stderr.is_empty()).then_some(stderr);
    }
    Some(stdout)
}

fn first_pid(output: &str) -> Option<u32> {
    output.split_whitespace().next()?.parse().ok()
}

/// Find `pid=N` on the `ss -tlnp` line whose local address ends in `:port`.
pub(crate) fn pid_from_ss(output: &str, port: u16) -> Option<u32> {
    let suffix = format!(":{port}");
    output
        .lines()
        .filter(|line| line.split_whitespace().any(|field| field.ends_with(&suffix)))
        .find_map(|line| {
            let (_, rest) = line.split_once("pid=")?;
            let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
            digits.parse().ok()
        })
}

fn read_cmdline(pid: u32) -> Option<String> {
    let raw = std::fs::read(format!("/proc/{pid}/cmdline")).ok()?;
    let cmd = String::from_utf8_lossy(&raw).replace('\0', " ");
    let cmd = cmd.trim();
    if cmd.is_empty() {
        return None;
    }
    Some(cmd.chars().take(MAX_OWNER_CMD_CHARS).collect())
}
