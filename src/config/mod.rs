pub mod settings;
pub mod store;

use serde::{Deserialize, Serialize};

/// One row of the path -> webhook table.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct WebhookEntry {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub webhook: String,
}

impl WebhookEntry {
    pub fn new(path: impl Into<String>, webhook: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            webhook: webhook.into(),
        }
    }

    /// Rows with an empty side are kept in memory but never matched or saved.
    pub fn is_active(&self) -> bool {
        !self.path.is_empty() && !self.webhook.is_empty()
    }
}

/// Ordered path -> webhook table. Duplicate paths are allowed, only the
/// first active row for a path is ever reachable through [`lookup`](Self::lookup).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct WebhookMapping {
    entries: Vec<WebhookEntry>,
}

impl WebhookMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[WebhookEntry] {
        &self.entries
    }

    pub fn active(&self) -> impl Iterator<Item = &WebhookEntry> {
        self.entries.iter().filter(|e| e.is_active())
    }

    /// Distinct active paths, in row order.
    pub fn paths(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for e in self.active() {
            if !out.contains(&e.path.as_str()) {
                out.push(&e.path);
            }
        }
        out
    }

    pub fn insert(&mut self, path: impl Into<String>, webhook: impl Into<String>) {
        self.entries.push(WebhookEntry::new(path, webhook));
    }

    /// Drops every row for `path`, returns how many were removed.
    pub fn remove(&mut self, path: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.path != path);
        before - self.entries.len()
    }

    /// Exact string match, first active row wins.
    pub fn lookup(&self, path: &str) -> Option<&str> {
        self.active()
            .find(|e| e.path == path)
            .map(|e| e.webhook.as_str())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn retain_active(&mut self) {
        self.entries.retain(|e| e.is_active());
    }
}

impl From<Vec<WebhookEntry>> for WebhookMapping {
    fn from(entries: Vec<WebhookEntry>) -> Self {
        Self { entries }
    }
}

impl FromIterator<(String, String)> for WebhookMapping {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        iter.into_iter()
            .map(|(path, webhook)| WebhookEntry { path, webhook })
            .collect::<Vec<_>>()
            .into()
    }
}

/// A named configuration as persisted on disk.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RepositoryConfig {
    pub git_url: String,
    pub git_branch: String,
    /// Kept for round-tripping only, nothing is scheduled from it.
    pub update_cycle: String,
    pub path_webhook_map: WebhookMapping,
}

impl RepositoryConfig {
    pub fn new(git_url: impl Into<String>, git_branch: impl Into<String>) -> Self {
        Self {
            git_url: git_url.into(),
            git_branch: git_branch.into(),
            ..Default::default()
        }
    }

    /// Checks the repository coordinates needed before any git work.
    pub fn require_coordinates(&self) -> Result<(&str, &str), String> {
        let url = self.git_url.trim();
        let branch = self.git_branch.trim();
        match (url.is_empty(), branch.is_empty()) {
            (true, true) => Err("git url and branch are not set".to_string()),
            (true, false) => Err("git url is not set".to_string()),
            (false, true) => Err("git branch is not set".to_string()),
            (false, false) => Ok((url, branch)),
        }
    }
}
