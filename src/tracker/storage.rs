use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::debug;

/// Interface for durable string storage. Values survive process restarts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    /// Retrieves a value. Missing keys aren't an error.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}

/// The main realization of [KeyValueStorage]. Each key is kept in its own file.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&dir)?;

        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(anyhow!("Illegal storage key {key:?}"));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }

    async fn read(path: &Path) -> std::result::Result<String, std::io::Error> {
        debug!("Reading {path:?}");
        let mut file = File::open(path).await?;
        file.lock_shared()?;
        let mut content = String::new();
        let result = file.read_to_string(&mut content).await;
        file.unlock_async().await?;
        result.map(|_| content)
    }

    async fn write(path: &Path, value: &[u8]) -> std::result::Result<(), std::io::Error> {
        debug!("Writing {path:?}");
        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .await?;
        // Truncate only after acquiring the lock, so that readers never see a half empty file
        file.lock_exclusive()?;
        let result = async {
            file.set_len(0).await?;
            file.write_all(value).await?;
            file.flush().await?;
            file.sync_data().await
        }
        .await;
        file.unlock_async().await?;
        result
    }
}

#[async_trait]
impl KeyValueStorage for FileStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match Self::read(&path).await {
            Ok(v) => Ok(Some(v)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e)?,
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let path = self.path_for(key)?;
        Self::write(&path, value.as_bytes()).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)?,
        }
    }
}
