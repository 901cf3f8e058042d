use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tokio::{fs, io::AsyncWriteExt};

use crate::{config::RepositoryConfig, error::StoreError, log::logger::Logger};

const EXTENSION: &str = ".json";

/// Named configurations, one JSON document per file in a single directory.
///
/// There is no locking: two writers on the same name race and the last
/// write wins.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
    logger: Logger,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>, logger: Logger) -> Self {
        Self {
            dir: dir.into(),
            logger,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `name` with the storage extension appended when missing.
    pub fn normalize_name(name: &str) -> Result<String, StoreError> {
        let name = name.trim();
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\')
        {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        if name.to_lowercase().ends_with(EXTENSION) {
            Ok(name.to_string())
        } else {
            Ok(format!("{name}{EXTENSION}"))
        }
    }

    pub fn path_of(&self, name: &str) -> Result<PathBuf, StoreError> {
        Ok(self.dir.join(Self::normalize_name(name)?))
    }

    /// Sorted file names of every stored configuration.
    pub async fn list(&self) -> Result<Vec<String>, StoreError> {
        if !fs::try_exists(&self.dir).await? {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.to_lowercase().ends_with(EXTENSION) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    pub async fn load(&self, name: &str) -> Result<RepositoryConfig, StoreError> {
        let path = self.path_of(name)?;
        if !fs::try_exists(&path).await? {
            return Err(StoreError::NotFound(name.to_string()));
        }

        let data = fs::read_to_string(&path).await?;
        serde_json::from_str(&data).map_err(|source| StoreError::Malformed {
            name: name.to_string(),
            source,
        })
    }

    /// Overwrites unconditionally. Rows missing a path or a webhook are dropped.
    pub async fn save(&self, name: &str, config: &RepositoryConfig) -> Result<(), StoreError> {
        let path = self.path_of(name)?;
        let mut config = config.clone();
        config.path_webhook_map.retain_active();

        fs::create_dir_all(&self.dir).await?;
        fs::write(&path, to_pretty_json(&config)?).await?;
        self.logger
            .info(&format!("[config] saved {}", path.display()))
            .await;
        Ok(())
    }

    /// Creates an empty `{}` document. Never touches an existing file.
    pub async fn create(&self, name: &str) -> Result<String, StoreError> {
        let file_name = Self::normalize_name(name)?;
        let path = self.dir.join(&file_name);

        fs::create_dir_all(&self.dir).await?;
        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await;
        let mut file = match file {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists(file_name));
            }
            Err(e) => return Err(e.into()),
        };

        file.write_all(b"{}").await?;
        file.flush().await?;

        self.logger
            .info(&format!("[config] created {}", path.display()))
            .await;
        Ok(file_name)
    }

    /// Removing an absent configuration is a no-op.
    pub async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let path = self.path_of(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                self.logger
                    .info(&format!("[config] deleted {}", path.display()))
                    .await;
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Four-space indented JSON, non-ASCII written as is.
fn to_pretty_json<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    Ok(buf)
}
