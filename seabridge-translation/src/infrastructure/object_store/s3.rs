use std::collections::HashMap;
use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::config::{Builder as S3ConfigBuilder, Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;

use seabridge_core::config::ObjectStoreConfig;
use seabridge_core::{Result, SeaBridgeError};

use crate::domain::repository::ObjectStorage;

/// 预签名链接最长有效期（7 天）
const MAX_PRESIGN_SECONDS: u64 = 7 * 24 * 3600;

#[derive(Clone)]
pub struct S3ObjectStorage {
    client: S3Client,
}

impl S3ObjectStorage {
    pub async fn from_config(cfg: &ObjectStoreConfig) -> Result<Self> {
        let region_name = cfg
            .region
            .clone()
            .unwrap_or_else(|| "us-east-1".to_string());
        let region = Region::new(region_name);

        let region_provider = RegionProviderChain::first_try(region.clone());
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region_provider);

        // 配置了 endpoint 时通常是 S3 兼容存储（如 MinIO）
        let endpoint = cfg.endpoint.clone();
        let force_path_style = cfg.force_path_style.unwrap_or(endpoint.is_some());

        if let (Some(access_key), Some(secret_key)) =
            (cfg.access_key.clone(), cfg.secret_key.clone())
        {
            let credentials =
                Credentials::new(access_key, secret_key, None, None, "static-credentials");
            loader = loader.credentials_provider(credentials);
        }
        let aws_cfg = loader.load().await;

        let mut s3_builder = S3ConfigBuilder::from(&aws_cfg).region(region);
        if let Some(ep) = endpoint {
            s3_builder = s3_builder.endpoint_url(ep);
        }
        if force_path_style {
            s3_builder = s3_builder.force_path_style(true);
        }
        let client = S3Client::from_conf(s3_builder.build());

        Ok(Self { client })
    }

    pub fn from_client(client: S3Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ObjectStorage for S3ObjectStorage {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<()> {
        let size = body.len();
        let mut request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body));
        for (name, value) in metadata {
            request = request.metadata(name, value);
        }

        request.send().await.map_err(|err| {
            SeaBridgeError::storage(format!(
                "failed to upload s3://{}/{}: {}",
                bucket, key, err
            ))
        })?;

        tracing::debug!(bucket, key, size, "Uploaded object");
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                SeaBridgeError::storage(format!(
                    "failed to download s3://{}/{}: {}",
                    bucket, key, err
                ))
            })?;

        let data = output.body.collect().await.map_err(|err| {
            SeaBridgeError::storage(format!(
                "failed to read body of s3://{}/{}: {}",
                bucket, key, err
            ))
        })?;
        Ok(data.into_bytes())
    }

    async fn head_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_error = err.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(SeaBridgeError::storage(format!(
                        "failed to check s3://{}/{}: {}",
                        bucket, key, service_error
                    )))
                }
            }
        }
    }

    async fn signed_url(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String> {
        let expires_in = Duration::from_secs(ttl.as_secs().clamp(1, MAX_PRESIGN_SECONDS));
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|err| SeaBridgeError::storage(format!("invalid presign config: {}", err)))?;

        let presigned = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|err| {
                SeaBridgeError::storage(format!(
                    "failed to presign s3://{}/{}: {}",
                    bucket, key, err
                ))
            })?;

        tracing::debug!(
            bucket,
            key,
            expires_in = expires_in.as_secs(),
            "Generated presigned GET url"
        );
        Ok(presigned.uri().to_string())
    }
}
