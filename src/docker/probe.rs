use std::{fmt, process::Stdio, time::Duration};

use bollard::Docker;
use tokio::{process::Command, time::timeout};
use tokio_util::sync::CancellationToken;

use crate::log::logger::Logger;

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonInfo {
    pub server_version: String,
    pub operating_system: Option<String>,
    pub containers: i64,
    pub containers_running: i64,
    pub images: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DaemonStatus {
    Running(DaemonInfo),
    Down { reason: String },
}

impl DaemonStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, DaemonStatus::Running(_))
    }
}

impl fmt::Display for DaemonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaemonStatus::Running(info) => write!(
                f,
                "Docker is running (server {}{}, {} container(s), {} running, {} image(s))",
                info.server_version,
                info.operating_system
                    .as_deref()
                    .map(|os| format!(" on {os}"))
                    .unwrap_or_default(),
                info.containers,
                info.containers_running,
                info.images
            ),
            DaemonStatus::Down { reason } => write!(f, "Docker is not running: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuilderStatus {
    Running { name: String, driver: Option<String> },
    Inactive { name: String, status: String },
    /// `docker buildx` knows no builder under that name.
    Missing { name: Option<String> },
    /// buildx could not be queried at all.
    Unavailable { reason: String },
}

impl BuilderStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, BuilderStatus::Running { .. })
    }
}

impl fmt::Display for BuilderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuilderStatus::Running { name, driver } => match driver {
                Some(d) => write!(f, "builder `{name}` is running ({d})"),
                None => write!(f, "builder `{name}` is running"),
            },
            BuilderStatus::Inactive { name, status } => {
                write!(f, "builder `{name}` is not running (status: {status})")
            }
            BuilderStatus::Missing { name: Some(name) } => {
                write!(f, "no builder instance named `{name}`")
            }
            BuilderStatus::Missing { name: None } => write!(f, "no buildx builder instance"),
            BuilderStatus::Unavailable { reason } => write!(f, "buildx unavailable: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerStatus {
    pub daemon: DaemonStatus,
    pub builder: BuilderStatus,
}

/// Reads `docker buildx inspect` output.
///
/// buildx offers no structured status query, so this leans on its text:
/// it breaks if the wording changes.
pub fn parse_buildx_inspect(
    success: bool,
    stdout: &str,
    stderr: &str,
    requested: Option<&str>,
) -> BuilderStatus {
    if stdout.contains("No such builder instance") || stderr.contains("No such builder instance")
    {
        return BuilderStatus::Missing {
            name: requested.map(str::to_string),
        };
    }
    if !success {
        let reason = stderr.trim();
        return BuilderStatus::Unavailable {
            reason: if reason.is_empty() {
                "docker buildx inspect failed".to_string()
            } else {
                reason.lines().next().unwrap_or(reason).to_string()
            },
        };
    }

    let field = |key: &str| {
        stdout.lines().find_map(|line| {
            line.trim()
                .strip_prefix(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        })
    };

    let name = field("Name:")
        .or_else(|| requested.map(str::to_string))
        .unwrap_or_else(|| "default".to_string());
    let driver = field("Driver:");

    match field("Status:") {
        Some(status) if status.eq_ignore_ascii_case("running") => {
            BuilderStatus::Running { name, driver }
        }
        Some(status) => BuilderStatus::Inactive { name, status },
        None => BuilderStatus::Inactive {
            name,
            status: "unknown".to_string(),
        },
    }
}

/// On-demand replacement for timer-driven Docker polling.
#[derive(Debug, Clone)]
pub struct DockerProbe {
    logger: Logger,
    timeout: Duration,
    builder: Option<String>,
}

impl DockerProbe {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            timeout: DEFAULT_PROBE_TIMEOUT,
            builder: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_builder(mut self, builder: Option<String>) -> Self {
        self.builder = builder;
        self
    }

    /// Waits `delay` then checks daemon and builder.
    ///
    /// Returns `None` if `cancel` fires before the answer is in.
    pub async fn probe(&self, delay: Duration, cancel: &CancellationToken) -> Option<DockerStatus> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.logger.info("[docker] probe cancelled before it started").await;
                return None;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.logger.info("[docker] probe cancelled").await;
                None
            }
            status = self.status() => Some(status),
        }
    }

    pub async fn status(&self) -> DockerStatus {
        let (daemon, builder) = tokio::join!(self.daemon_status(), self.builder_status());
        self.logger.info(&format!("[docker] {daemon}")).await;
        self.logger.info(&format!("[docker] {builder}")).await;
        DockerStatus { daemon, builder }
    }

    /// Asks the Engine API directly instead of scraping `docker info`.
    ///
    /// Only `DOCKER_HOST` and the default socket are tried: unlike the
    /// `docker` CLI, the active docker context is not followed.
    pub async fn daemon_status(&self) -> DaemonStatus {
        let docker_host = std::env::var("DOCKER_HOST").ok();
        let down = |reason: String| DaemonStatus::Down {
            reason: down_reason(reason, docker_host.as_deref()),
        };

        let docker = match Docker::connect_with_local_defaults() {
            Ok(d) => d,
            Err(e) => return down(e.to_string()),
        };

        match timeout(self.timeout, docker.info()).await {
            Err(_) => DaemonStatus::Down {
                reason: format!(
                    "no answer from the daemon within {}s",
                    self.timeout.as_secs()
                ),
            },
            Ok(Err(e)) => down(e.to_string()),
            Ok(Ok(info)) => match info.server_version.filter(|v| !v.is_empty()) {
                Some(server_version) => DaemonStatus::Running(DaemonInfo {
                    server_version,
                    operating_system: info.operating_system,
                    containers: info.containers.unwrap_or_default(),
                    containers_running: info.containers_running.unwrap_or_default(),
                    images: info.images.unwrap_or_default(),
                }),
                None => DaemonStatus::Down {
                    reason: "daemon did not report a server version".to_string(),
                },
            },
        }
    }

    pub async fn builder_status(&self) -> BuilderStatus {
        let mut cmd = Command::new("docker");
        cmd.args(["buildx", "inspect"]);
        if let Some(name) = &self.builder {
            cmd.arg(name);
        }
        cmd.stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match timeout(self.timeout, cmd.output()).await {
            Err(_) => BuilderStatus::Unavailable {
                reason: format!(
                    "docker buildx inspect timed out after {}s",
                    self.timeout.as_secs()
                ),
            },
            Ok(Err(e)) => BuilderStatus::Unavailable {
                reason: format!("failed to run docker: {e}"),
            },
            Ok(Ok(output)) => parse_buildx_inspect(
                output.status.success(),
                &String::from_utf8_lossy(&output.stdout),
                &String::from_utf8_lossy(&output.stderr),
                self.builder.as_deref(),
            ),
        }
    }
}

/// Connection failure text, with a hint when only the default socket was
/// tried while the CLI may be using another docker context.
pub fn down_reason(error: String, docker_host: Option<&str>) -> String {
    match docker_host.filter(|h| !h.trim().is_empty()) {
        Some(_) => error,
        None => format!(
            "{error} (default socket only, the active docker context is not followed: \
             set DOCKER_HOST to its endpoint)"
        ),
    }
}

/// Raw `docker info` text for display.
pub async fn docker_info_text() -> anyhow::Result<String> {
    let output = Command::new("docker")
        .arg("info")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run `docker info`: {e}"))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        return Ok(stdout.into_owned());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Ok(format!("Error output:\n{stderr}"))
}
