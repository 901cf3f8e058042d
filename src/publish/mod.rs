//! Change detection and webhook dispatch.
//!
//! A "load" syncs the working copy, collects the paths touched by the last
//! N commits and keeps those that have a webhook. Each matched path can
//! then be dispatched on its own or all together through the pool.

pub mod outcome;
pub mod pool;
pub mod transport;

use std::{collections::HashSet, sync::Arc};

use serde_json::json;
use tokio::sync::mpsc;

use crate::{
    config::{RepositoryConfig, WebhookMapping, settings::Settings},
    error::PublishError,
    git::repo::{ChangeSet, Collected, CommitSummary, SyncKind, WorkingCopy},
    log::logger::Logger,
    publish::{
        outcome::{DispatchResult, WebhookTarget, classify},
        pool::DispatchPool,
        transport::{HttpTransport, WebhookTransport},
    },
};

pub const MAX_COMMITS: usize = 100;

/// Everything a single "load changed files" produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeReport {
    pub changes: ChangeSet,
    pub commits: Vec<CommitSummary>,
    /// Change-set paths that have a webhook, one entry per path.
    pub matched: Vec<WebhookTarget>,
    /// Change-set paths without a webhook, shown but never dispatched.
    pub unmatched: Vec<String>,
}

impl ChangeReport {
    pub fn build(collected: Collected, mapping: &WebhookMapping) -> Self {
        let mut matched = Vec::new();
        let mut unmatched = Vec::new();
        for path in &collected.changes {
            match mapping.lookup(path) {
                Some(url) => matched.push(WebhookTarget {
                    path: path.clone(),
                    url: url.to_string(),
                }),
                None => unmatched.push(path.clone()),
            }
        }
        Self {
            changes: collected.changes,
            commits: collected.commits,
            matched,
            unmatched,
        }
    }

    pub fn matched_paths(&self) -> Vec<String> {
        self.matched.iter().map(|t| t.path.clone()).collect()
    }
}

#[derive(Clone)]
pub struct ChangePublisher {
    working_copy: WorkingCopy,
    transport: Arc<dyn WebhookTransport>,
    pool: DispatchPool,
    logger: Logger,
}

impl ChangePublisher {
    pub fn new(
        working_copy: WorkingCopy,
        transport: Arc<dyn WebhookTransport>,
        workers: usize,
        logger: Logger,
    ) -> Self {
        Self {
            working_copy,
            transport,
            pool: DispatchPool::new(workers),
            logger,
        }
    }

    pub fn from_settings(settings: &Settings, logger: Logger) -> anyhow::Result<Self> {
        let transport = HttpTransport::new(settings.request_timeout)?;
        Ok(Self::new(
            WorkingCopy::new(settings.cache_dir()),
            Arc::new(transport),
            settings.workers,
            logger,
        ))
    }

    pub fn working_copy(&self) -> &WorkingCopy {
        &self.working_copy
    }

    pub fn pool(&self) -> &DispatchPool {
        &self.pool
    }

    /// Validate, sync, collect, match. Nothing is cached between calls.
    pub async fn load_changed_files(
        &self,
        config: &RepositoryConfig,
        commits: usize,
    ) -> Result<ChangeReport, PublishError> {
        let (url, branch) = config
            .require_coordinates()
            .map_err(PublishError::InvalidConfig)?;
        if !(1..=MAX_COMMITS).contains(&commits) {
            return Err(PublishError::InvalidConfig(format!(
                "commit count must be between 1 and {MAX_COMMITS}, got {commits}"
            )));
        }
        let (url, branch) = (url.to_string(), branch.to_string());

        self.logger
            .info(&format!(
                "[load] repo: {url} branch: {branch} last commits: {commits}"
            ))
            .await;

        let collected = self.sync_and_collect(url, branch, commits).await?;

        for c in &collected.commits {
            self.logger
                .info(&format!("[commit] {} {}", c.short_id, c.summary))
                .await;
        }
        self.logger
            .info(&format!(
                "[changes] {} file(s) changed",
                collected.changes.len()
            ))
            .await;

        let report = ChangeReport::build(collected, &config.path_webhook_map);
        for t in &report.matched {
            self.logger
                .info(&format!("[matched] {} -> {}", t.path, t.url))
                .await;
        }
        for p in &report.unmatched {
            self.logger.info(&format!("[unmapped] skipping {p}")).await;
        }
        Ok(report)
    }

    async fn sync_and_collect(
        &self,
        url: String,
        branch: String,
        commits: usize,
    ) -> Result<Collected, PublishError> {
        let wc = self.working_copy.clone();
        if wc.exists() {
            self.logger
                .info(&format!(
                    "[git] using local copy {}, fetch + hard reset",
                    wc.path().display()
                ))
                .await;
        } else {
            self.logger
                .info(&format!("[git] cloning into {}", wc.path().display()))
                .await;
        }

        let sync_branch = branch.clone();
        let sync_wc = wc.clone();
        let synced =
            tokio::task::spawn_blocking(move || sync_wc.sync(&url, &sync_branch)).await?;
        match synced {
            Ok(SyncKind::Cloned) => self.logger.info("[git] clone done").await,
            Ok(SyncKind::Updated) => self.logger.info("[git] working copy reset").await,
            Err(e) => {
                self.logger.error(&format!("[git] {e}")).await;
                return Err(PublishError::Sync(e));
            }
        }

        tokio::task::spawn_blocking(move || wc.changed_files(&branch, commits))
            .await?
            .map_err(PublishError::Collect)
    }

    /// Resolves `path` against the mapping as it is right now.
    pub fn resolve(mapping: &WebhookMapping, path: &str) -> Result<WebhookTarget, PublishError> {
        mapping
            .lookup(path)
            .map(|url| WebhookTarget {
                path: path.to_string(),
                url: url.to_string(),
            })
            .ok_or_else(|| PublishError::Unmapped(path.to_string()))
    }

    /// One POST for one path. Unmapped paths fail before any network call.
    pub async fn dispatch(
        &self,
        mapping: &WebhookMapping,
        path: &str,
    ) -> Result<DispatchResult, PublishError> {
        let target = match Self::resolve(mapping, path) {
            Ok(t) => t,
            Err(e) => {
                self.logger
                    .warning(&format!("[skip] no webhook for {path}"))
                    .await;
                return Err(e);
            }
        };
        Ok(send_one(Arc::clone(&self.transport), self.logger.clone(), target).await)
    }

    /// Fires every mapped path concurrently through the pool.
    ///
    /// Results arrive on the returned channel in completion order, one per
    /// dispatched path; the channel closes once all of them are in. Paths
    /// with no webhook are skipped.
    pub fn dispatch_all(
        &self,
        mapping: &WebhookMapping,
        paths: &[String],
    ) -> mpsc::UnboundedReceiver<DispatchResult> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut batch = self.pool.batch::<DispatchResult>();
        let mut skipped = Vec::new();
        let mut seen = HashSet::new();

        for path in paths {
            if !seen.insert(path.as_str()) {
                continue;
            }
            match Self::resolve(mapping, path) {
                Ok(target) => batch.submit(send_one(
                    Arc::clone(&self.transport),
                    self.logger.clone(),
                    target,
                )),
                Err(_) => skipped.push(path.clone()),
            }
        }

        let logger = self.logger.clone();
        tokio::spawn(async move {
            logger
                .info(&format!("[batch] {} dispatch(es) started", batch.len()))
                .await;
            for path in skipped {
                logger.warning(&format!("[skip] no webhook for {path}")).await;
            }

            let (mut ok, mut failed) = (0usize, 0usize);
            while let Some(done) = batch.next().await {
                match done {
                    Ok(result) => {
                        if result.succeeded {
                            ok += 1;
                        } else {
                            failed += 1;
                        }
                        // a dropped receiver only stops the reporting
                        let _ = tx.send(result);
                    }
                    Err(e) => logger.error(&format!("[batch] dispatch task died: {e}")).await,
                }
            }
            logger
                .info(&format!("[batch] done: {ok} ok, {failed} failed"))
                .await;
        });

        rx
    }

    /// [`dispatch_all`](Self::dispatch_all), collected.
    pub async fn dispatch_all_collect(
        &self,
        mapping: &WebhookMapping,
        paths: &[String],
    ) -> Vec<DispatchResult> {
        let mut rx = self.dispatch_all(mapping, paths);
        let mut out = Vec::new();
        while let Some(result) = rx.recv().await {
            out.push(result);
        }
        out
    }
}

async fn send_one(
    transport: Arc<dyn WebhookTransport>,
    logger: Logger,
    target: WebhookTarget,
) -> DispatchResult {
    logger
        .info(&format!("[push] {} -> {}", target.path, target.url))
        .await;

    let body = json!({ "file": target.path });
    let result = classify(&target, transport.post_json(&target.url, &body).await);

    if result.succeeded {
        logger
            .push_ok(&format!("{} ({})", result.path, result.status_description()))
            .await;
    } else {
        logger
            .push_fail(&format!("{} ({})", result.path, result.status_description()))
            .await;
    }
    result
}
