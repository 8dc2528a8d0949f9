use anyhow::{Result, bail};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Where a stored object ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub name: String,
    pub path: String,
    pub url: String,
}

/// Flat on-disk storage for uploaded files.
///
/// Each object lives at `{dir}/{name}` and is served publicly under
/// `{public_url}/uploads/{name}`.
pub struct Storage {
    dir: PathBuf,
    public_url: String,
}

impl Storage {
    pub async fn new(dir: PathBuf, public_url: &str) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Upload storage directory: {}", dir.display());
        Ok(Self {
            dir,
            public_url: public_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path to the file for a given object name.
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn public_url(&self, name: &str) -> String {
        format!("{}/uploads/{}", self.public_url, name)
    }

    /// Writes and syncs an object. Names are generated server-side, but are
    /// still refused if they could leave the storage directory.
    pub async fn put(&self, name: &str, data: &[u8]) -> Result<StoredObject> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            bail!("refusing object name '{}'", name);
        }

        let path = self.file_path(name);
        let mut file = fs::File::create(&path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;

        Ok(StoredObject {
            name: name.to_string(),
            path: path.display().to_string(),
            url: self.public_url(name),
        })
    }

    /// Delete an object; a missing file is not an error.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let path = self.file_path(name);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Stored object {} already gone", name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
