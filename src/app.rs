use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::{
    cli::{Cli, Commands, ConfigCommands, DockerCommands},
    config::{settings::Settings, store::ConfigStore},
    docker::probe::{DockerProbe, docker_info_text},
    git::remote::repo_slug,
    log::logger::Logger,
    publish::{ChangePublisher, ChangeReport, outcome::DispatchResult},
};

/// Everything a command needs, built once from the CLI flags.
#[derive(Debug, Clone)]
pub struct App {
    pub settings: Settings,
    pub logger: Logger,
    pub store: ConfigStore,
}

impl App {
    pub fn new(settings: Settings, logger: Logger) -> Self {
        let store = ConfigStore::new(settings.base_dir.clone(), logger.clone());
        Self {
            settings,
            logger,
            store,
        }
    }

    pub async fn from_cli(cli: &Cli) -> Result<Self> {
        let settings = Settings::resolve(cli.home.clone())?
            .with_timeout(cli.timeout)
            .with_workers(cli.workers);
        let logger = Logger::file_or_console(&settings.log_path()).await;
        Ok(Self::new(settings, logger))
    }

    pub fn publisher(&self) -> Result<ChangePublisher> {
        ChangePublisher::from_settings(&self.settings, self.logger.clone())
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let app = App::from_cli(&cli).await?;
    match cli.command {
        Commands::Config(cmd) => handle_config(&app, cmd).await,
        Commands::Changes { name, commits } => {
            let publisher = app.publisher()?;
            let report = load_changes(&app, &publisher, &name, commits as usize).await?;
            print_report(&report);
            Ok(())
        }
        Commands::Push {
            name,
            paths,
            all,
            commits,
        } => {
            let publisher = app.publisher()?;
            handle_push(&app, &publisher, &name, paths, all, commits as usize).await
        }
        Commands::Docker(cmd) => handle_docker(&app, cmd).await,
        Commands::Logs { lines } => handle_logs(&app, lines).await,
    }
}

pub async fn handle_config(app: &App, cmd: ConfigCommands) -> Result<()> {
    let store = &app.store;
    match cmd {
        ConfigCommands::List => {
            let names = store.list().await?;
            if names.is_empty() {
                println!("No configuration in {}", store.dir().display());
                return Ok(());
            }
            println!("{:<24} {:<32} {:<16} {}", "NAME", "REPOSITORY", "BRANCH", "PATHS");
            for name in names {
                match store.load(&name).await {
                    Ok(c) => println!(
                        "{:<24} {:<32} {:<16} {}",
                        name,
                        repo_slug(&c.git_url).unwrap_or_else(|_| c.git_url.clone()),
                        c.git_branch,
                        c.path_webhook_map.paths().len()
                    ),
                    Err(e) => println!("{name:<24} ❌ {e}"),
                }
            }
        }
        ConfigCommands::New { name } => {
            let file = store.create(&name).await?;
            println!("✅ Configuration {file} created");
        }
        ConfigCommands::Show { name } => {
            let c = store.load(&name).await?;
            println!("git url      : {}", c.git_url);
            println!("git branch   : {}", c.git_branch);
            println!("update cycle : {}", c.update_cycle);
            println!("webhooks     :");
            for e in c.path_webhook_map.entries() {
                println!("  {} -> {}", e.path, e.webhook);
            }
        }
        ConfigCommands::Delete { name } => {
            store.delete(&name).await?;
            println!("✅ Configuration {name} deleted");
        }
        ConfigCommands::Set {
            name,
            url,
            branch,
            cycle,
        } => {
            let mut c = store.load(&name).await?;
            if let Some(url) = url {
                c.git_url = url;
            }
            if let Some(branch) = branch {
                c.git_branch = branch;
            }
            if let Some(cycle) = cycle {
                c.update_cycle = cycle;
            }
            store.save(&name, &c).await?;
            println!("✅ Configuration {name} saved");
        }
        ConfigCommands::Map {
            name,
            path,
            webhook,
        } => {
            if path.is_empty() || webhook.is_empty() {
                anyhow::bail!("both a path and a webhook url are required");
            }
            let mut c = store.load(&name).await?;
            c.path_webhook_map.insert(path.clone(), webhook.clone());
            store.save(&name, &c).await?;
            println!("✅ {path} -> {webhook}");
        }
        ConfigCommands::Unmap { name, path } => {
            let mut c = store.load(&name).await?;
            let removed = c.path_webhook_map.remove(&path);
            if removed == 0 {
                anyhow::bail!("no row for `{path}` in {name}");
            }
            store.save(&name, &c).await?;
            println!("✅ {removed} row(s) removed for {path}");
        }
    }
    Ok(())
}

pub async fn load_changes(
    app: &App,
    publisher: &ChangePublisher,
    name: &str,
    commits: usize,
) -> Result<ChangeReport> {
    let config = app
        .store
        .load(name)
        .await
        .with_context(|| format!("Failed to load configuration {name}"))?;
    let report = publisher.load_changed_files(&config, commits).await?;
    Ok(report)
}

fn print_report(report: &ChangeReport) {
    println!(
        "{} file(s) changed in the last {} commit(s)",
        report.changes.len(),
        report.commits.len()
    );
    for t in &report.matched {
        println!("  🔗 {} -> {}", t.path, t.url);
    }
    for p in &report.unmatched {
        println!("  ·  {p}");
    }
}

/// Explicit paths are dispatched against the configuration as saved now,
/// without syncing. `--all` syncs first and sends every matched change.
pub async fn handle_push(
    app: &App,
    publisher: &ChangePublisher,
    name: &str,
    paths: Vec<String>,
    all: bool,
    commits: usize,
) -> Result<()> {
    let paths = if all {
        let report = load_changes(app, publisher, name, commits).await?;
        print_report(&report);
        report.matched_paths()
    } else {
        paths
    };

    if paths.is_empty() {
        println!("Nothing to push");
        return Ok(());
    }

    // re-read so edits made since the load are honoured
    let config = app.store.load(name).await?;
    let mapping = &config.path_webhook_map;

    let mut failed = 0usize;
    let mut unmapped = 0usize;
    for p in paths.iter().filter(|p| !mapping.contains(p)) {
        eprintln!("❌ {p}: no webhook configured");
        unmapped += 1;
    }

    let mut rx = publisher.dispatch_all(mapping, &paths);
    while let Some(result) = rx.recv().await {
        print_result(&result);
        if !result.succeeded {
            failed += 1;
        }
    }

    if failed + unmapped > 0 {
        anyhow::bail!("{failed} webhook(s) failed, {unmapped} path(s) unmapped");
    }
    Ok(())
}

fn print_result(result: &DispatchResult) {
    if result.succeeded {
        println!("✅ {} ({})", result.path, result.status_description());
    } else {
        eprintln!("❌ {} ({})", result.path, result.status_description());
    }
}

pub async fn handle_docker(app: &App, cmd: DockerCommands) -> Result<()> {
    match cmd {
        DockerCommands::Status { delay_ms, builder } => {
            let probe = DockerProbe::new(app.logger.clone()).with_builder(builder);
            let cancel = CancellationToken::new();

            let ctrl_c = cancel.clone();
            let watcher = tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    ctrl_c.cancel();
                }
            });

            let status = probe
                .probe(Duration::from_millis(delay_ms), &cancel)
                .await;
            watcher.abort();

            let Some(status) = status else {
                println!("Probe cancelled");
                return Ok(());
            };
            let mark = |ok: bool| if ok { "✅" } else { "❌" };
            println!("{} {}", mark(status.daemon.is_running()), status.daemon);
            println!("{} {}", mark(status.builder.is_running()), status.builder);
        }
        DockerCommands::Info => {
            print!("{}", docker_info_text().await?);
        }
    }
    Ok(())
}

pub async fn handle_logs(app: &App, lines: usize) -> Result<()> {
    let path = app.settings.log_path();
    for line in Logger::tail(&path, lines).await? {
        println!("{line}");
    }
    Ok(())
}
