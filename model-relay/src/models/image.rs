use crate::config::UploadConfig;
use crate::error::RelayError;
use axum::extract::multipart::Field;
use std::path::Path;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Owner read/write, everyone else read.
#[cfg(unix)]
const SPOOL_FILE_MODE: u32 = 0o644;

/// An uploaded image spooled to a request-scoped temporary file.
///
/// The file is deleted when the value is dropped.
#[derive(Debug)]
pub struct UploadedImage {
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
    file: NamedTempFile,
}

impl UploadedImage {
    /// Stream a multipart field to disk, enforcing the per-file size limit.
    pub async fn spool(mut field: Field<'_>, config: &UploadConfig) -> Result<Self, RelayError> {
        let file_name = field.file_name().unwrap_or("unnamed").to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let file = tempfile::Builder::new()
            .prefix("upload-")
            .tempfile_in(&config.temp_dir)?;
        // Path contracts hand the generator a path; it may run as another user.
        #[cfg(unix)]
        file.as_file()
            .set_permissions(std::fs::Permissions::from_mode(SPOOL_FILE_MODE))?;
        let mut writer = tokio::fs::File::from_std(file.reopen()?);

        let mut size = 0usize;
        while let Some(chunk) = field.chunk().await? {
            size += chunk.len();
            if size > config.max_file_size_bytes {
                return Err(RelayError::FileTooLarge {
                    file_name,
                    limit: config.max_file_size_bytes,
                });
            }
            writer.write_all(&chunk).await?;
        }
        writer.flush().await?;

        tracing::debug!(
            file_name = %file_name,
            content_type = %content_type,
            size = size,
            path = %file.path().display(),
            "Spooled uploaded image"
        );

        Ok(Self {
            file_name,
            content_type,
            size,
            file,
        })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(self.path()).await
    }
}

/// The two images a generation is made from.
#[derive(Debug)]
pub struct ImagePair {
    pub first: UploadedImage,
    pub second: UploadedImage,
}

impl ImagePair {
    pub fn total_size(&self) -> usize {
        self.first.size + self.second.size
    }
}

impl TryFrom<Vec<UploadedImage>> for ImagePair {
    type Error = RelayError;

    /// Takes the first two images; anything after them is dropped.
    fn try_from(images: Vec<UploadedImage>) -> Result<Self, Self::Error> {
        let received = images.len();
        let mut images = images.into_iter();
        match (images.next(), images.next()) {
            (Some(first), Some(second)) => Ok(ImagePair { first, second }),
            _ => Err(RelayError::MissingImages { received }),
        }
    }
}
