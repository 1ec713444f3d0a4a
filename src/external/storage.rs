use crate::common::errors::BusinessError;
use crate::validation_error;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Prefix, relative to the media root, under which delivery attachments live.
pub const DELIVERY_MEDIA_PREFIX: &str = "deliveries/media";

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["pdf", "jpg", "jpeg", "png"];

/// Attachment files on the local filesystem, one file per delivery.
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
    public_url: String,
}

/// Lower-cased extension of an uploaded filename, if it is on the allow-list.
pub fn allowed_extension(file_name: &str) -> Result<String, BusinessError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_lowercase();

    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(validation_error!(
            "media_file",
            format!(
                "File extension '{extension}' is not allowed. Allowed extensions are: {}.",
                ALLOWED_EXTENSIONS.join(", ")
            )
        ))
    }
}

impl AttachmentStore {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into(),
        }
    }

    /// Writes the file under a fresh name and returns its relative path.
    pub async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<String, BusinessError> {
        let extension = allowed_extension(file_name)?;
        let relative = format!("{DELIVERY_MEDIA_PREFIX}/{}.{extension}", Uuid::new_v4());
        let target = self.root.join(&relative);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| storage_error(&e))?;
        }
        fs::write(&target, bytes)
            .await
            .map_err(|e| storage_error(&e))?;

        tracing::debug!("Stored attachment {relative} ({} bytes)", bytes.len());
        Ok(relative)
    }

    /// Removes a stored attachment. Failures are logged and otherwise ignored.
    pub async fn remove(&self, relative: &str) {
        if let Err(e) = fs::remove_file(self.root.join(relative)).await {
            tracing::warn!("Could not remove attachment {relative}: {e}");
        }
    }

    pub fn path_of(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Public URL of a stored attachment
    pub fn url_of(&self, relative: &str) -> String {
        format!("{}/{}", self.public_url.trim_end_matches('/'), relative)
    }
}

fn storage_error(e: &std::io::Error) -> BusinessError {
    BusinessError::ExternalServiceError {
        service: "attachment storage".to_string(),
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("waybill.pdf", "pdf")]
    #[case("photo.JPG", "jpg")]
    #[case("scan.final.jpeg", "jpeg")]
    #[case("Plan.Png", "png")]
    fn accepts_allowed_extensions(#[case] file_name: &str, #[case] expected: &str) {
        assert_eq!(allowed_extension(file_name).unwrap(), expected);
    }

    #[rstest]
    #[case("notes.txt")]
    #[case("archive.pdf.zip")]
    #[case("no_extension")]
    fn rejects_other_extensions(#[case] file_name: &str) {
        assert!(matches!(
            allowed_extension(file_name),
            Err(BusinessError::ValidationError { .. })
        ));
    }

    #[tokio::test]
    async fn save_then_remove_under_media_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = AttachmentStore::new(dir.path(), "/media/");

        let relative = store.save("waybill.PDF", b"%PDF-1.4 test").await.unwrap();
        assert!(relative.starts_with("deliveries/media/"));
        assert!(relative.ends_with(".pdf"));
        assert_eq!(
            tokio::fs::read(store.path_of(&relative)).await.unwrap(),
            b"%PDF-1.4 test"
        );
        assert_eq!(store.url_of(&relative), format!("/media/{relative}"));

        store.remove(&relative).await;
        assert!(!store.path_of(&relative).exists());
    }

    #[tokio::test]
    async fn save_rejects_disallowed_extension_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let store = AttachmentStore::new(dir.path(), "/media/");

        assert!(store.save("payload.exe", b"MZ").await.is_err());
        assert!(!dir.path().join(DELIVERY_MEDIA_PREFIX).exists());
    }
}
