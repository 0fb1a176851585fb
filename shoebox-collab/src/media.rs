use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use shoebox_core::MediaKind;
use thiserror::Error;

use crate::util::random_string;

#[derive(Debug, Error)]
pub enum MediaStoreError {
    /// The storage backend rejected or lost the upload
    #[error("Upload failed: {0}")]
    Upload(String),
}

/// Represents a type that can persist uploaded media bytes and hand back
/// a retrievable url
#[async_trait]
pub trait MediaStore {
    async fn upload(&self, bytes: Vec<u8>, kind: MediaKind) -> Result<String, MediaStoreError>;
}

/// Keeps uploads in memory. Useful for tests and local development
#[derive(Default)]
pub struct MemoryMediaStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn upload(&self, bytes: Vec<u8>, kind: MediaKind) -> Result<String, MediaStoreError> {
        let url = format!("memory://{}/{}", kind.as_str(), random_string(16));

        self.objects.lock().insert(url.clone(), bytes);

        Ok(url)
    }
}
