//! Image uploads on local disk
//!
//! Files land in `<upload_dir>/<kind>/<uuid>-<original name>` and are served
//! back under `<public_base_url>/uploads/<kind>/<file>`.

use std::path::{Path, PathBuf};

use axum::extract::{Multipart, multipart::MultipartError};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Largest accepted image
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Most images accepted by one gallery upload
pub const MAX_FILES: usize = 10;

const ALLOWED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "gif", "webp"];

/// Subdirectory an upload belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Tourism,
    Business,
    Events,
    Profiles,
    General,
}

impl UploadKind {
    pub const ALL: [UploadKind; 5] = [
        UploadKind::Tourism,
        UploadKind::Business,
        UploadKind::Events,
        UploadKind::Profiles,
        UploadKind::General,
    ];

    pub fn dir(&self) -> &'static str {
        match self {
            UploadKind::Tourism => "tourism",
            UploadKind::Business => "business",
            UploadKind::Events => "events",
            UploadKind::Profiles => "profiles",
            UploadKind::General => "general",
        }
    }
}

/// A file written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub file_name: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    public_base_url: String,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the upload directory and one subdirectory per kind
    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        for kind in UploadKind::ALL {
            fs::create_dir_all(self.root.join(kind.dir())).await?;
        }
        debug!("Upload directories ready under {}", self.root.display());
        Ok(())
    }

    pub fn url_for(&self, kind: UploadKind, file_name: &str) -> String {
        format!("{}/uploads/{}/{}", self.public_base_url, kind.dir(), file_name)
    }

    /// Validate and write one image
    pub async fn save(
        &self,
        kind: UploadKind,
        original_name: &str,
        bytes: &[u8],
    ) -> ApiResult<StoredFile> {
        check_extension(original_name)?;
        if bytes.len() > MAX_FILE_SIZE {
            return Err(file_too_large());
        }

        let file_name = stored_name(original_name);
        let dir = self.root.join(kind.dir());
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| anyhow::Error::new(e).context("failed to create upload directory"))?;
        fs::write(dir.join(&file_name), bytes)
            .await
            .map_err(|e| anyhow::Error::new(e).context("failed to write upload"))?;

        info!("Stored upload {}/{} ({} bytes)", kind.dir(), file_name, bytes.len());
        Ok(StoredFile {
            url: self.url_for(kind, &file_name),
            file_name,
        })
    }

    /// Store every file sent under `field`, up to `max_files`.
    ///
    /// Nothing is kept when any file is rejected.
    pub async fn save_multipart(
        &self,
        kind: UploadKind,
        mut multipart: Multipart,
        field: &str,
        max_files: usize,
    ) -> ApiResult<Vec<StoredFile>> {
        let mut stored = Vec::new();

        let outcome = async {
            while let Some(part) = multipart.next_field().await.map_err(multipart_error)? {
                if part.name() != Some(field) {
                    continue;
                }
                let Some(original_name) = part.file_name().map(str::to_string) else {
                    continue;
                };
                if stored.len() == max_files {
                    return Err(ApiError::BadRequest(format!(
                        "Too many files. Maximum is {max_files}"
                    )));
                }
                let declared_image = part
                    .content_type()
                    .is_none_or(|content_type| content_type.starts_with("image/"));
                if !declared_image {
                    return Err(not_an_image());
                }

                let bytes = part.bytes().await.map_err(multipart_error)?;
                stored.push(self.save(kind, &original_name, &bytes).await?);
            }
            Ok::<(), ApiError>(())
        }
        .await;

        if let Err(err) = outcome {
            for file in &stored {
                self.remove(&file.url).await;
            }
            return Err(err);
        }

        Ok(stored)
    }

    /// Store the single file sent under `field`
    pub async fn save_single(
        &self,
        kind: UploadKind,
        multipart: Multipart,
        field: &str,
    ) -> ApiResult<StoredFile> {
        self.save_multipart(kind, multipart, field, 1)
            .await?
            .pop()
            .ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))
    }

    /// Read back a stored file, `None` for anything outside the upload tree
    pub async fn read(&self, kind: &str, file_name: &str) -> Option<Vec<u8>> {
        let relative = upload_path(&format!("/uploads/{kind}/{file_name}"))?;
        fs::read(self.root.join(relative)).await.ok()
    }

    /// Remove the file behind a public upload URL.
    ///
    /// Failures are logged, never returned. URLs that do not point into the
    /// upload directory are ignored.
    pub async fn remove(&self, url: &str) {
        let Some(relative) = upload_path(url) else {
            return;
        };

        match fs::remove_file(self.root.join(&relative)).await {
            Ok(()) => info!("Removed upload {}", relative.display()),
            Err(e) => warn!("Could not remove upload {}: {}", relative.display(), e),
        }
    }
}

/// `<uuid>-<name>` with whitespace runs replaced by `-` and any directory
/// part of the client-supplied name dropped
pub fn stored_name(original_name: &str) -> String {
    let base = original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name);
    let cleaned = base.split_whitespace().collect::<Vec<_>>().join("-");

    format!("{}-{}", Uuid::new_v4(), cleaned)
}

pub fn check_extension(file_name: &str) -> ApiResult<()> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(not_an_image()),
    }
}

// "<base>/uploads/<kind>/<file>" -> "<kind>/<file>", for known kinds only
fn upload_path(url: &str) -> Option<PathBuf> {
    let (_, relative) = url.split_once("/uploads/")?;
    let (dir, file) = relative.split_once('/')?;

    let known = UploadKind::ALL.iter().any(|kind| kind.dir() == dir);
    let plain = !file.is_empty() && !file.contains(['/', '\\']) && file != ".." && file != ".";
    (known && plain).then(|| Path::new(dir).join(file))
}

/// MIME type served for a stored image
pub fn content_type(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

fn not_an_image() -> ApiError {
    ApiError::BadRequest("Only image files (jpg, jpeg, png, gif, webp) are allowed".to_string())
}

fn file_too_large() -> ApiError {
    ApiError::PayloadTooLarge("File too large. Maximum size is 5MB".to_string())
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
        file_too_large()
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> UploadStore {
        let root = std::env::temp_dir().join(format!("uploads-test-{}", Uuid::new_v4()));
        UploadStore::new(root, "http://localhost:3000/")
    }

    #[test]
    fn stored_names_are_unique_and_flattened() {
        let name = stored_name("../../etc/My  Lake View.JPG");
        assert!(name.ends_with("-My-Lake-View.JPG"));
        assert!(!name.contains('/'));
        assert_ne!(stored_name("a.png"), stored_name("a.png"));
    }

    #[test]
    fn only_image_extensions_pass() {
        assert!(check_extension("harbour.webp").is_ok());
        assert!(check_extension("HARBOUR.JPEG").is_ok());
        assert!(check_extension("notes.txt").is_err());
        assert!(check_extension("no-extension").is_err());
    }

    #[test]
    fn upload_urls_map_back_to_files() {
        assert_eq!(
            upload_path("http://localhost:3000/uploads/tourism/abc-lake.png"),
            Some(Path::new("tourism").join("abc-lake.png"))
        );
        assert_eq!(upload_path("http://localhost:3000/uploads/secrets/x.png"), None);
        assert_eq!(upload_path("http://localhost:3000/uploads/tourism/.."), None);
        assert_eq!(upload_path("https://cdn.example.org/lake.png"), None);
    }

    #[test]
    fn content_types_follow_the_extension() {
        assert_eq!(content_type("a.JPG"), "image/jpeg");
        assert_eq!(content_type("a.webp"), "image/webp");
        assert_eq!(content_type("a"), "application/octet-stream");
    }

    #[test]
    fn public_urls_drop_the_trailing_slash() {
        let store = temp_store();
        assert_eq!(
            store.url_for(UploadKind::Events, "x.gif"),
            "http://localhost:3000/uploads/events/x.gif"
        );
    }

    #[tokio::test]
    async fn save_then_remove() {
        let store = temp_store();
        store.ensure_dirs().await.unwrap();

        let stored = store
            .save(UploadKind::Business, "shop front.png", b"\x89PNG")
            .await
            .unwrap();
        let path = store.root().join("business").join(&stored.file_name);
        assert!(path.exists());
        assert!(stored.url.starts_with("http://localhost:3000/uploads/business/"));

        assert_eq!(
            store.read("business", &stored.file_name).await.as_deref(),
            Some(&b"\x89PNG"[..])
        );
        assert_eq!(store.read("business", "..").await, None);

        store.remove(&stored.url).await;
        assert!(!path.exists());

        let _ = std::fs::remove_dir_all(store.root());
    }

    #[tokio::test]
    async fn oversized_files_are_rejected() {
        let store = temp_store();
        let big = vec![0u8; MAX_FILE_SIZE + 1];

        let err = store
            .save(UploadKind::General, "big.png", &big)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::PayloadTooLarge(_)));
    }
}
