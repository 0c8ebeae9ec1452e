use anyhow::Result;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

/// On-disk blob store for photo uploads.
///
/// Each blob is a single flat file at `{dir}/{storage_id}`. The storage id is
/// the only handle a photo row keeps; ids are typed as UUIDs so no
/// client-supplied string ever reaches the filesystem as a path component.
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Blob storage directory: {}", dir.display());
        Ok(Self { dir })
    }

    fn blob_path(&self, storage_id: Uuid) -> PathBuf {
        self.dir.join(storage_id.to_string())
    }

    /// Writes a new blob and returns the storage id naming it.
    pub async fn put(&self, data: &[u8]) -> Result<Uuid> {
        let storage_id = Uuid::new_v4();
        fs::write(self.blob_path(storage_id), data).await?;
        Ok(storage_id)
    }

    pub async fn get(&self, storage_id: Uuid) -> Result<Vec<u8>> {
        Ok(fs::read(self.blob_path(storage_id)).await?)
    }

    /// Deletes a blob from disk; a missing file is logged and ignored.
    pub async fn delete(&self, storage_id: Uuid) -> Result<()> {
        match fs::remove_file(self.blob_path(storage_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Blob {} already gone", storage_id);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_fetches_and_deletes_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().join("blobs")).await.unwrap();

        let id = storage.put(b"paw print").await.unwrap();
        assert_eq!(storage.get(id).await.unwrap(), b"paw print");

        storage.delete(id).await.unwrap();
        assert!(storage.get(id).await.is_err());

        // Deleting an already-gone blob is not an error.
        storage.delete(id).await.unwrap();
    }
}
