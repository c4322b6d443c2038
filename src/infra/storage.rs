use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use url::Url;
use uuid::Uuid;

use crate::config::S3Config;

/// Where uploaded images live. Entities only hold the returned URLs.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn put(&self, owner_id: Uuid, content_type: &str, body: Bytes) -> Result<String>;
    async fn delete(&self, url: &str) -> Result<()>;
}

pub fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

#[derive(Clone)]
pub struct ObjectStorage {
    client: Client,
    bucket: String,
    public_base: Url,
}

impl ObjectStorage {
    pub async fn new(config: &S3Config) -> Result<Self> {
        let region_provider = RegionProviderChain::first_try(Region::new(config.region.clone()));
        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        let mut s3_builder = aws_sdk_s3::config::Builder::from(&shared_config)
            .region(shared_config.region().cloned())
            .endpoint_url(config.endpoint.clone())
            .force_path_style(true);
        if let Some(provider) = shared_config.credentials_provider() {
            s3_builder = s3_builder.credentials_provider(provider);
        }
        let client = Client::from_conf(s3_builder.build());

        let base = config
            .public_endpoint
            .clone()
            .unwrap_or_else(|| config.endpoint.clone());
        let public_base = Url::parse(&format!(
            "{}/{}/",
            base.trim_end_matches('/'),
            config.bucket
        ))
        .map_err(|err| anyhow!("invalid media endpoint: {}", err))?;

        Ok(Self {
            client,
            bucket: config.bucket.clone(),
            public_base,
        })
    }

    fn key_for_url(&self, url: &str) -> Option<String> {
        url.strip_prefix(self.public_base.as_str())
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }
}

#[async_trait]
impl MediaStore for ObjectStorage {
    async fn put(&self, owner_id: Uuid, content_type: &str, body: Bytes) -> Result<String> {
        let extension = extension_for(content_type)
            .ok_or_else(|| anyhow!("unsupported content type: {}", content_type))?;
        let key = format!("media/{}/{}.{}", owner_id, Uuid::new_v4(), extension);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await?;

        Ok(self.public_base.join(&key)?.to_string())
    }

    async fn delete(&self, url: &str) -> Result<()> {
        let key = self
            .key_for_url(url)
            .ok_or_else(|| anyhow!("url is not in the media bucket: {}", url))?;

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await?;

        Ok(())
    }
}

/// Keeps uploads in process memory. Used when no bucket is configured and by
/// the test suite, which can make deletes fail to exercise best-effort cleanup.
#[derive(Default)]
pub struct InMemoryMediaStore {
    objects: Mutex<HashMap<String, (String, Bytes)>>,
    deleted: Mutex<HashSet<String>>,
    fail_deletes: AtomicBool,
}

impl InMemoryMediaStore {
    pub const BASE_URL: &'static str = "memory://media/";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, url: &str) -> bool {
        self.objects
            .lock()
            .map(|objects| objects.contains_key(url))
            .unwrap_or(false)
    }

    pub fn was_deleted(&self, url: &str) -> bool {
        self.deleted
            .lock()
            .map(|deleted| deleted.contains(url))
            .unwrap_or(false)
    }
}

#[async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn put(&self, owner_id: Uuid, content_type: &str, body: Bytes) -> Result<String> {
        let extension = extension_for(content_type)
            .ok_or_else(|| anyhow!("unsupported content type: {}", content_type))?;
        let url = format!(
            "{}{}/{}.{}",
            Self::BASE_URL,
            owner_id,
            Uuid::new_v4(),
            extension
        );
        self.objects
            .lock()
            .map_err(|_| anyhow!("media store lock poisoned"))?
            .insert(url.clone(), (content_type.to_string(), body));
        Ok(url)
    }

    async fn delete(&self, url: &str) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(anyhow!("media store unavailable"));
        }
        self.objects
            .lock()
            .map_err(|_| anyhow!("media store lock poisoned"))?
            .remove(url);
        self.deleted
            .lock()
            .map_err(|_| anyhow!("media store lock poisoned"))?
            .insert(url.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_put_then_delete() {
        let store = InMemoryMediaStore::new();
        let url = store
            .put(Uuid::new_v4(), "image/png", Bytes::from_static(b"png"))
            .await
            .unwrap();
        assert!(url.starts_with(InMemoryMediaStore::BASE_URL));
        assert!(url.ends_with(".png"));
        assert!(store.contains(&url));

        store.delete(&url).await.unwrap();
        assert!(!store.contains(&url));
        assert!(store.was_deleted(&url));
    }

    #[tokio::test]
    async fn rejects_unknown_content_type() {
        let store = InMemoryMediaStore::new();
        let result = store
            .put(Uuid::new_v4(), "image/gif", Bytes::from_static(b"gif"))
            .await;
        assert!(result.is_err());
    }
}
