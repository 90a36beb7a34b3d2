use anyhow::{Context as _, anyhow};
use s3::creds::Credentials;
use s3::{Bucket, Region};

use crate::domain::repository::ObjectStorage;
use crate::error::ApiError;

pub struct S3Settings {
    pub endpoint: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    /// Base for returned object URLs; `{endpoint}/{bucket}` when unset.
    pub public_url: Option<String>,
}

/// Path-style S3 client (MinIO compatible).
#[derive(Clone)]
pub struct S3Storage {
    bucket: Box<Bucket>,
    public_url: String,
}

impl S3Storage {
    pub fn new(settings: S3Settings) -> anyhow::Result<Self> {
        let region = Region::Custom {
            region: settings.region,
            endpoint: settings.endpoint.clone(),
        };
        let credentials = Credentials::new(
            Some(&settings.access_key),
            Some(&settings.secret_key),
            None,
            None,
            None,
        )
        .context("s3 credentials")?;
        let bucket = Bucket::new(&settings.bucket, region, credentials)
            .context("s3 bucket")?
            .with_path_style();

        let public_url = settings
            .public_url
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| {
                format!(
                    "{}/{}",
                    settings.endpoint.trim_end_matches('/'),
                    settings.bucket
                )
            });

        Ok(Self {
            bucket,
            public_url: public_url.trim_end_matches('/').to_owned(),
        })
    }

    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key.trim_start_matches('/'))
    }
}

impl ObjectStorage for S3Storage {
    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<String, ApiError> {
        let response = self
            .bucket
            .put_object_with_content_type(key, &body, content_type)
            .await
            .context("s3 put object")?;
        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(ApiError::Internal(anyhow!(
                "s3 put object {key} returned {status}"
            )));
        }
        Ok(self.object_url(key))
    }
}
