//! Attachment storage with public download URLs.
//!
//! Uploaded attachment bytes are written under a flat directory, one file
//! per attachment, named `<uuid>.<ext>` with the extension derived from the
//! declared MIME type. The public URL handed back to clients resolves to
//! the `GET /media/{file}` route.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ServerError;

/// Verify that a resolved path stays within the expected base directory.
/// Prevents path traversal attacks.
fn ensure_within(base: &Path, target: &Path) -> Result<PathBuf, ServerError> {
    // Canonicalize base; target may not exist yet so normalize manually
    let canonical_base = base.canonicalize().unwrap_or_else(|_| base.to_path_buf());
    // Build the full path and strip out any `..` components
    let mut resolved = canonical_base.clone();
    for component in target
        .strip_prefix(&canonical_base)
        .unwrap_or(target)
        .components()
    {
        match component {
            std::path::Component::Normal(c) => resolved.push(c),
            std::path::Component::ParentDir => {
                return Err(ServerError::BadRequest(
                    "Path traversal detected".to_string(),
                ));
            }
            _ => {} // RootDir, CurDir, Prefix — skip
        }
    }
    if !resolved.starts_with(&canonical_base) {
        return Err(ServerError::BadRequest(
            "Path traversal detected".to_string(),
        ));
    }
    Ok(resolved)
}

/// A stored attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaObject {
    /// File name under the media directory (`<uuid>.<ext>`).
    pub file_name: String,
    /// Public URL clients can fetch the attachment from.
    pub url: String,
    pub content_type: String,
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    base_path: PathBuf,
    max_size: usize,
    public_base_url: String,
}

impl MediaStore {
    pub async fn new(
        base_path: PathBuf,
        max_size: usize,
        public_base_url: String,
    ) -> Result<Self, ServerError> {
        fs::create_dir_all(&base_path).await.map_err(|e| {
            ServerError::MediaStorage(format!(
                "Failed to create media directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), "Media store initialized");

        Ok(Self {
            base_path,
            max_size,
            public_base_url,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Store attachment bytes and return the public object.
    pub async fn save(&self, data: &[u8], content_type: &str) -> Result<MediaObject, ServerError> {
        if data.is_empty() {
            return Err(ServerError::MediaStorage("Empty attachment".to_string()));
        }
        if data.len() > self.max_size {
            return Err(ServerError::MediaTooLarge {
                size: data.len(),
                max: self.max_size,
            });
        }

        let file_name = format!("{}{}", Uuid::new_v4(), extension_for(content_type));
        let path = self.safe_media_path(&file_name)?;

        fs::write(&path, data).await.map_err(|e| {
            ServerError::MediaStorage(format!("Failed to write attachment {}: {}", file_name, e))
        })?;

        debug!(file = %file_name, size = data.len(), "Stored attachment");

        Ok(MediaObject {
            url: format!("{}/media/{}", self.public_base_url, file_name),
            file_name,
            content_type: content_type.to_string(),
        })
    }

    /// Read a stored attachment back (download route).
    pub async fn open(&self, file_name: &str) -> Result<Vec<u8>, ServerError> {
        let path = self.safe_media_path(file_name)?;

        if !path.exists() {
            return Err(ServerError::MediaNotFound(file_name.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            ServerError::MediaStorage(format!("Failed to read attachment {}: {}", file_name, e))
        })?;

        debug!(file = %file_name, size = data.len(), "Retrieved attachment");
        Ok(data)
    }

    pub async fn delete(&self, file_name: &str) -> Result<(), ServerError> {
        let path = self.safe_media_path(file_name)?;

        if !path.exists() {
            return Err(ServerError::MediaNotFound(file_name.to_string()));
        }

        fs::remove_file(&path).await.map_err(|e| {
            ServerError::MediaStorage(format!("Failed to delete attachment {}: {}", file_name, e))
        })?;

        debug!(file = %file_name, "Deleted attachment");
        Ok(())
    }

    /// Safe file path that validates against traversal.
    fn safe_media_path(&self, file_name: &str) -> Result<PathBuf, ServerError> {
        if file_name.contains('/') || file_name.contains('\\') || file_name.contains("..") {
            return Err(ServerError::BadRequest(
                "Path traversal detected".to_string(),
            ));
        }
        let raw = self.base_path.join(file_name);
        ensure_within(&self.base_path, &raw)
    }
}

/// File extension for a declared MIME type.
fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/webp" => ".webp",
        "image/gif" => ".gif",
        _ => ".bin",
    }
}

/// MIME type served for a stored file, derived from its extension.
pub fn content_type_for(file_name: &str) -> &'static str {
    match file_name.rsplit('.').next() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}
