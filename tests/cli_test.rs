use std::time::Duration;

use clap::Parser;
use core_lib::{
    app::{App, handle_config, handle_push},
    cli::{Cli, Commands, ConfigCommands, DockerCommands},
    config::{RepositoryConfig, settings::Settings},
    log::logger::Logger,
};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn app_in(dir: &std::path::Path) -> App {
    App::new(Settings::new(dir.to_path_buf()), Logger::placeholder())
}

#[test]
fn test_parse_push_paths() -> anyhow::Result<()> {
    let cli = Cli::try_parse_from(["jrocket", "push", "prod", "a.txt", "docs/b.md"])?;
    match cli.command {
        Commands::Push {
            name, paths, all, commits,
        } => {
            assert_eq!(name, "prod");
            assert_eq!(paths, vec!["a.txt", "docs/b.md"]);
            assert!(!all);
            assert_eq!(commits, 1);
        }
        other => panic!("unexpected command {other:?}"),
    }
    Ok(())
}

#[test]
fn test_parse_push_requires_paths_or_all() {
    assert!(Cli::try_parse_from(["jrocket", "push", "prod"]).is_err());
    assert!(Cli::try_parse_from(["jrocket", "push", "prod", "--all"]).is_ok());
    assert!(Cli::try_parse_from(["jrocket", "push", "prod", "a.txt", "--all"]).is_err());
}

#[test]
fn test_parse_commit_range() {
    assert!(Cli::try_parse_from(["jrocket", "changes", "prod", "-n", "100"]).is_ok());
    assert!(Cli::try_parse_from(["jrocket", "changes", "prod", "-n", "0"]).is_err());
    assert!(Cli::try_parse_from(["jrocket", "changes", "prod", "-n", "101"]).is_err());
}

#[test]
fn test_parse_global_flags() -> anyhow::Result<()> {
    let cli = Cli::try_parse_from([
        "jrocket", "config", "list", "--home", "/tmp/jr", "--timeout", "3", "--workers", "2",
    ])?;
    assert_eq!(cli.home.as_deref(), Some(std::path::Path::new("/tmp/jr")));
    assert!(matches!(cli.command, Commands::Config(ConfigCommands::List)));

    let settings = Settings::new("/tmp/jr".into())
        .with_timeout(cli.timeout)
        .with_workers(cli.workers);
    assert_eq!(settings.request_timeout, Duration::from_secs(3));
    assert_eq!(settings.workers, 2);
    assert_eq!(settings.cache_dir(), std::path::Path::new("/tmp/jr/tmp_repo"));
    Ok(())
}

#[test]
fn test_parse_rejects_zero_timeout_and_workers() {
    assert!(Cli::try_parse_from(["jrocket", "config", "list", "--timeout", "0"]).is_err());
    assert!(Cli::try_parse_from(["jrocket", "config", "list", "--workers", "0"]).is_err());
    assert!(Cli::try_parse_from(["jrocket", "config", "list", "--timeout", "1"]).is_ok());

    let defaults = Cli::try_parse_from(["jrocket", "logs"]).unwrap();
    assert_eq!(defaults.timeout, 10);
    assert_eq!(defaults.workers, 8);
}

#[test]
fn test_parse_docker_status() -> anyhow::Result<()> {
    let cli = Cli::try_parse_from([
        "jrocket", "docker", "status", "--delay-ms", "250", "--builder", "ci",
    ])?;
    match cli.command {
        Commands::Docker(DockerCommands::Status { delay_ms, builder }) => {
            assert_eq!(delay_ms, 250);
            assert_eq!(builder.as_deref(), Some("ci"));
        }
        other => panic!("unexpected command {other:?}"),
    }
    Ok(())
}

#[test]
fn test_settings_clamp_zero() {
    let settings = Settings::new("/x".into()).with_timeout(0).with_workers(0);
    assert_eq!(settings.request_timeout, Duration::from_secs(1));
    assert_eq!(settings.workers, 1);
}

#[tokio::test]
async fn test_config_commands_flow() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let app = app_in(dir.path());

    handle_config(&app, ConfigCommands::New { name: "prod".into() }).await?;
    assert!(handle_config(&app, ConfigCommands::New { name: "prod".into() }).await.is_err());

    handle_config(
        &app,
        ConfigCommands::Set {
            name: "prod".into(),
            url: Some("https://github.com/acme/site.git".into()),
            branch: Some("main".into()),
            cycle: None,
        },
    )
    .await?;
    handle_config(
        &app,
        ConfigCommands::Map {
            name: "prod".into(),
            path: "a.txt".into(),
            webhook: "http://hooks.local/a".into(),
        },
    )
    .await?;
    handle_config(&app, ConfigCommands::List).await?;
    handle_config(&app, ConfigCommands::Show { name: "prod".into() }).await?;

    let saved = app.store.load("prod").await?;
    let mut expected = RepositoryConfig::new("https://github.com/acme/site.git", "main");
    expected.path_webhook_map.insert("a.txt", "http://hooks.local/a");
    assert_eq!(saved, expected);

    handle_config(
        &app,
        ConfigCommands::Unmap {
            name: "prod".into(),
            path: "a.txt".into(),
        },
    )
    .await?;
    assert!(app.store.load("prod").await?.path_webhook_map.is_empty());
    assert!(
        handle_config(
            &app,
            ConfigCommands::Unmap {
                name: "prod".into(),
                path: "a.txt".into(),
            },
        )
        .await
        .is_err()
    );

    handle_config(&app, ConfigCommands::Delete { name: "prod".into() }).await?;
    assert!(app.store.list().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_map_rejects_empty_sides() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let app = app_in(dir.path());
    handle_config(&app, ConfigCommands::New { name: "c".into() }).await?;

    let result = handle_config(
        &app,
        ConfigCommands::Map {
            name: "c".into(),
            path: "a.txt".into(),
            webhook: String::new(),
        },
    )
    .await;
    assert!(result.is_err());
    assert!(app.store.load("c").await?.path_webhook_map.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_push_unmapped_path_fails_without_git() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let app = app_in(dir.path());
    handle_config(&app, ConfigCommands::New { name: "c".into() }).await?;

    let publisher = app.publisher()?;
    let result = handle_push(&app, &publisher, "c", vec!["nowhere.txt".into()], false, 1).await;
    assert!(result.is_err());
    assert!(!app.settings.cache_dir().exists());
    Ok(())
}
