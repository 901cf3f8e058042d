use std::time::Duration;

use core_lib::{
    docker::probe::{
        BuilderStatus, DaemonInfo, DaemonStatus, DockerProbe, down_reason,
        parse_buildx_inspect,
    },
    log::logger::Logger,
};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

const RUNNING: &str = "Name:          default
Driver:        docker
Last Activity: 2024-05-02 10:11:12 +0000 UTC

Nodes:
Name:      default
Endpoint:  default
Status:    running
BuildKit:  v0.12.5
Platforms: linux/amd64, linux/386
";

#[test]
fn test_buildx_running() {
    assert_eq!(
        parse_buildx_inspect(true, RUNNING, "", None),
        BuilderStatus::Running {
            name: "default".to_string(),
            driver: Some("docker".to_string()),
        }
    );
}

#[test]
fn test_buildx_status_is_case_insensitive() {
    let out = "Name: ci\nDriver: docker-container\nStatus: RUNNING\n";
    assert!(parse_buildx_inspect(true, out, "", Some("ci")).is_running());
}

#[test]
fn test_buildx_inactive() {
    let out = "Name:   ci\nDriver: docker-container\n\nNodes:\nName: ci0\nStatus: inactive\n";
    assert_eq!(
        parse_buildx_inspect(true, out, "", Some("ci")),
        BuilderStatus::Inactive {
            name: "ci".to_string(),
            status: "inactive".to_string(),
        }
    );
}

#[test]
fn test_buildx_without_status_line() {
    let status = parse_buildx_inspect(true, "Driver: docker\n", "", Some("mine"));
    assert_eq!(
        status,
        BuilderStatus::Inactive {
            name: "mine".to_string(),
            status: "unknown".to_string(),
        }
    );
}

#[test]
fn test_buildx_missing_builder() {
    let status = parse_buildx_inspect(
        false,
        "",
        "ERROR: no builder \"ghost\" found\nNo such builder instance: ghost\n",
        Some("ghost"),
    );
    assert_eq!(
        status,
        BuilderStatus::Missing {
            name: Some("ghost".to_string())
        }
    );
    assert!(!status.is_running());
}

#[test]
fn test_buildx_command_failure() {
    let status = parse_buildx_inspect(
        false,
        "",
        "docker: 'buildx' is not a docker command.\nSee 'docker --help'\n",
        None,
    );
    assert_eq!(
        status,
        BuilderStatus::Unavailable {
            reason: "docker: 'buildx' is not a docker command.".to_string()
        }
    );

    let silent = parse_buildx_inspect(false, "", "", None);
    assert!(matches!(silent, BuilderStatus::Unavailable { ref reason } if !reason.is_empty()));
}

#[test]
fn test_status_display() {
    let up = DaemonStatus::Running(DaemonInfo {
        server_version: "24.0.7".to_string(),
        operating_system: Some("Docker Desktop".to_string()),
        containers: 3,
        containers_running: 1,
        images: 12,
    });
    assert!(up.is_running());
    assert!(up.to_string().contains("24.0.7 on Docker Desktop"));

    let down = DaemonStatus::Down {
        reason: "connection refused".to_string(),
    };
    assert!(!down.is_running());
    assert_eq!(down.to_string(), "Docker is not running: connection refused");
}

#[test]
fn test_down_reason_mentions_context_without_docker_host() {
    let reason = down_reason("socket not found".to_string(), None);
    assert!(reason.starts_with("socket not found"));
    assert!(reason.contains("docker context"));
    assert!(reason.contains("DOCKER_HOST"));

    assert!(down_reason("refused".to_string(), Some("  ")).contains("docker context"));
    assert_eq!(
        down_reason("refused".to_string(), Some("tcp://10.0.0.2:2375")),
        "refused"
    );
}

#[tokio::test]
async fn test_probe_cancelled_before_start() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let probe = DockerProbe::new(Logger::placeholder());
    assert_eq!(probe.probe(Duration::from_secs(60), &cancel).await, None);
}

#[tokio::test]
async fn test_probe_cancelled_during_delay() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let probe = DockerProbe::new(Logger::placeholder()).with_timeout(Duration::from_millis(500));
    let started = std::time::Instant::now();
    assert_eq!(probe.probe(Duration::from_secs(60), &cancel).await, None);
    assert!(started.elapsed() < Duration::from_secs(10));
}
