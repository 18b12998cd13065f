use crate::config::toml_config::PublishConfig;
use crate::core::Storage;
use crate::utils::error::{FeedError, Result};
use crate::utils::validation;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;

#[derive(Debug, Clone)]
pub struct S3Storage {
    client: S3Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    /// Builds a client from the publish settings. Explicit access keys win over
    /// the default AWS credential chain.
    pub async fn connect(publish: &PublishConfig) -> Result<Self> {
        let bucket =
            validation::validate_required_field("publish.bucket", &publish.bucket)?.clone();

        let shared = aws_config::load_defaults(BehaviorVersion::latest()).await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared)
            .region(Region::new(publish.region.clone()))
            .force_path_style(publish.force_path_style);

        if let (Some(access_key), Some(secret_key)) = (&publish.access_key, &publish.secret_key) {
            tracing::debug!("Using access keys from configuration");
            builder = builder.credentials_provider(Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "timetable-feed",
            ));
        }

        if let Some(endpoint) = &publish.endpoint_url {
            builder = builder.endpoint_url(endpoint.clone());
        }

        Ok(Self::new(S3Client::from_conf(builder.build()), bucket))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

impl Storage for S3Storage {
    async fn write_file(&self, path: &str, data: &[u8], content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .content_type(content_type)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|err| FeedError::StorageError {
                key: format!("s3://{}/{}", self.bucket, path),
                message: DisplayErrorContext(&err).to_string(),
            })?;

        tracing::debug!("PutObject s3://{}/{} ({} bytes)", self.bucket, path, data.len());
        Ok(())
    }
}
