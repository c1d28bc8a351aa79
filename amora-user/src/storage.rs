use async_trait::async_trait;
use uuid::Uuid;

use amora_shared::clients::minio::MinioClient;
use amora_shared::errors::{AppError, AppResult, ErrorCode};

#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PhotoUpload {
    pub fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/png" => "png",
            _ => "jpg",
        }
    }
}

/// Object storage for profile photos.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Drops every stored photo of the profile and stores `photos` in its
    /// place, returning their public URLs in upload order.
    async fn replace_all(&self, profile_id: Uuid, photos: Vec<PhotoUpload>) -> AppResult<Vec<String>>;
}

pub fn profile_prefix(profile_id: Uuid) -> String {
    format!("profiles/{profile_id}/")
}

#[async_trait]
impl PhotoStore for MinioClient {
    async fn replace_all(&self, profile_id: Uuid, photos: Vec<PhotoUpload>) -> AppResult<Vec<String>> {
        let prefix = profile_prefix(profile_id);
        let removed = self
            .delete_prefix(&prefix)
            .await
            .map_err(|e| AppError::new(ErrorCode::PhotoUploadFailed, e.to_string()))?;

        let mut urls = Vec::with_capacity(photos.len());
        for photo in photos {
            let key = format!("{prefix}{}.{}", Uuid::now_v7(), photo.extension());
            let url = self
                .upload(&key, photo.bytes, &photo.content_type)
                .await
                .map_err(|e| AppError::new(ErrorCode::PhotoUploadFailed, e.to_string()))?;
            urls.push(url);
        }

        tracing::debug!(profile_id = %profile_id, removed, stored = urls.len(), "profile photos replaced");
        Ok(urls)
    }
}
