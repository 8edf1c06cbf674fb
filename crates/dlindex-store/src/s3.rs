//! S3 backend built on aws-sdk-s3.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use dlindex_core::credentials::AwsCredentials;
use dlindex_core::manifest::StorageConfig;
use dlindex_util::errors::DlIndexError;
use dlindex_util::hash::normalize_etag;

use crate::traits::{dir_prefix, ObjectInfo, ObjectStore, PutOptions};

const PROVIDER_NAME: &str = "dlindex-binding";

pub struct S3Store {
    client: Client,
    bucket: String,
}

fn storage_err(op: &str, target: &str, err: impl std::error::Error) -> DlIndexError {
    DlIndexError::Storage {
        message: format!("{op} {target} failed: {}", DisplayErrorContext(err)),
    }
}

impl S3Store {
    /// Build a client for `storage`.
    ///
    /// Bound credentials take precedence; without them the SDK's default
    /// provider chain applies (environment, profile, instance role).
    pub async fn connect(
        storage: &StorageConfig,
        credentials: Option<AwsCredentials<'_>>,
    ) -> miette::Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .retry_config(RetryConfig::standard().with_max_attempts(storage.max_attempts));

        if let Some(region) = &storage.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &storage.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        match credentials {
            Some(creds) => {
                tracing::debug!("Using bound AWS credentials");
                loader = loader.credentials_provider(Credentials::new(
                    creds.access_key_id.expose(),
                    creds.secret_access_key.expose(),
                    creds.session_token.map(|t| t.expose().to_string()),
                    None,
                    PROVIDER_NAME,
                ));
            }
            None => tracing::debug!("No bound AWS credentials; using the default provider chain"),
        }

        let sdk_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(storage.path_style)
            .build();

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: storage.bucket.clone(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn describe(&self) -> String {
        format!("s3://{}", self.bucket)
    }

    async fn list(&self, prefix: &str) -> miette::Result<Vec<ObjectInfo>> {
        let prefix = dir_prefix(prefix);
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(&prefix)
            .into_paginator()
            .send();

        let mut objects = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| storage_err("Listing", &self.describe(), e))?;
            for obj in page.contents() {
                let Some(key) = obj.key() else {
                    continue;
                };
                objects.push(ObjectInfo {
                    key: key.to_string(),
                    size: obj.size().unwrap_or(0).max(0) as u64,
                    last_modified: obj.last_modified().map(|t| t.secs()),
                    etag: obj.e_tag().map(|e| normalize_etag(e).to_string()),
                });
            }
        }
        tracing::debug!("Listed {} object(s) under s3://{}/{prefix}", objects.len(), self.bucket);
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    async fn head(&self, key: &str) -> miette::Result<Option<ObjectInfo>> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;
        match result {
            Ok(out) => Ok(Some(ObjectInfo {
                key: key.to_string(),
                size: out.content_length().unwrap_or(0).max(0) as u64,
                last_modified: out.last_modified().map(|t| t.secs()),
                etag: out.e_tag().map(|e| normalize_etag(e).to_string()),
            })),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(None),
            Err(e) => Err(storage_err("HEAD", key, e).into()),
        }
    }

    async fn get(&self, key: &str) -> miette::Result<Option<Vec<u8>>> {
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;
        let out = match result {
            Ok(out) => out,
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => {
                return Ok(None)
            }
            Err(e) => return Err(storage_err("GET", key, e).into()),
        };
        let data = out
            .body
            .collect()
            .await
            .map_err(|e| storage_err("Reading", key, e))?;
        Ok(Some(data.into_bytes().to_vec()))
    }

    async fn put(&self, key: &str, data: &[u8], options: &PutOptions) -> miette::Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data.to_vec()))
            .set_content_type(options.content_type.clone())
            .set_cache_control(options.cache_control.clone())
            .send()
            .await
            .map_err(|e| storage_err("PUT", key, e))?;
        tracing::debug!("Uploaded s3://{}/{key} ({} bytes)", self.bucket, data.len());
        Ok(())
    }
}
