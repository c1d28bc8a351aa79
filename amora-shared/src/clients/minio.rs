use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::Client as S3Client;

/// Connection settings for an S3-compatible store.
#[derive(Debug, Clone)]
pub struct MinioSettings<'a> {
    pub endpoint: &'a str,
    pub access_key: &'a str,
    pub secret_key: &'a str,
    pub bucket: &'a str,
    pub public_url: &'a str,
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("upload of {key} failed: {reason}")]
    Upload { key: String, reason: String },
    #[error("listing {prefix} failed: {reason}")]
    List { prefix: String, reason: String },
    #[error("delete of {key} failed: {reason}")]
    Delete { key: String, reason: String },
}

#[derive(Clone)]
pub struct MinioClient {
    client: S3Client,
    bucket: String,
    public_url: String,
}

impl MinioClient {
    pub async fn new(settings: MinioSettings<'_>) -> Self {
        let credentials = Credentials::new(settings.access_key, settings.secret_key, None, None, "minio");
        let config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(settings.endpoint)
            .region(Region::new("us-east-1"))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();
        let client = S3Client::from_conf(config);

        // Fails harmlessly when the bucket already exists.
        if let Err(e) = client.create_bucket().bucket(settings.bucket).send().await {
            tracing::debug!(bucket = settings.bucket, error = %e, "create_bucket skipped");
        }
        tracing::info!(endpoint = settings.endpoint, bucket = settings.bucket, "object storage ready");

        Self {
            client,
            bucket: settings.bucket.to_owned(),
            public_url: settings.public_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Stores the object and returns its public URL.
    pub async fn upload(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body.into())
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::Upload { key: key.to_owned(), reason: e.to_string() })?;

        Ok(self.public_url_for(key))
    }

    /// Deletes every object under `prefix`, following list pagination.
    /// Returns how many objects were removed.
    pub async fn delete_prefix(&self, prefix: &str) -> Result<usize, StorageError> {
        let mut removed = 0;
        let mut continuation: Option<String> = None;

        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(|e| StorageError::List { prefix: prefix.to_owned(), reason: e.to_string() })?;

            for key in page.contents().iter().filter_map(|o| o.key()) {
                self.client
                    .delete_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .send()
                    .await
                    .map_err(|e| StorageError::Delete { key: key.to_owned(), reason: e.to_string() })?;
                removed += 1;
            }

            match page.next_continuation_token() {
                Some(token) if page.is_truncated().unwrap_or(false) => continuation = Some(token.to_owned()),
                _ => break,
            }
        }

        Ok(removed)
    }

    pub fn public_url_for(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_url, self.bucket, key)
    }
}
