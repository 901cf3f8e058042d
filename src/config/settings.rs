use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use dirs::home_dir;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_WORKERS: usize = 8;

/// Where everything lives on disk and how hard the network is pushed.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Directory holding one `<name>.json` per configuration.
    pub base_dir: PathBuf,
    pub request_timeout: Duration,
    pub workers: usize,
}

impl Settings {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            workers: DEFAULT_WORKERS,
        }
    }

    /// `~/JRocket`, unless `home` overrides it.
    pub fn resolve(home: Option<PathBuf>) -> Result<Self> {
        let base_dir = match home {
            Some(dir) => dir,
            None => home_dir()
                .ok_or_else(|| anyhow::anyhow!("Failed to find HOME directory"))?
                .join("JRocket"),
        };
        Ok(Self::new(base_dir))
    }

    /// The CLI rejects 0; library callers get a 1s floor.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.request_timeout = Duration::from_secs(secs.max(1));
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Single working-copy slot shared by every configuration.
    pub fn cache_dir(&self) -> PathBuf {
        self.base_dir.join("tmp_repo")
    }

    pub fn log_path(&self) -> PathBuf {
        self.base_dir.join("logs").join("jrocket.log")
    }
}
