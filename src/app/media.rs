use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::app::error::{CoreError, CoreResult};
use crate::infra::storage::{extension_for, MediaStore};

#[derive(Clone)]
pub struct MediaService {
    media: Arc<dyn MediaStore>,
    max_bytes: usize,
}

#[derive(Debug, Serialize)]
pub struct UploadedMedia {
    pub url: String,
}

impl MediaService {
    pub fn new(media: Arc<dyn MediaStore>, max_bytes: usize) -> Self {
        Self { media, max_bytes }
    }

    pub async fn upload(
        &self,
        owner_id: Uuid,
        content_type: &str,
        body: Bytes,
    ) -> CoreResult<UploadedMedia> {
        if extension_for(content_type).is_none() {
            return Err(CoreError::invalid(
                "content type must be image/jpeg, image/png or image/webp",
            ));
        }
        if body.is_empty() {
            return Err(CoreError::invalid("upload body is empty"));
        }
        if body.len() > self.max_bytes {
            return Err(CoreError::invalid(format!(
                "upload exceeds {} bytes",
                self.max_bytes
            )));
        }

        let url = self.media.put(owner_id, content_type, body).await?;
        tracing::info!(owner_id = %owner_id, url = %url, "media uploaded");
        Ok(UploadedMedia { url })
    }

    /// Deletes media no entity references any more. Failures leave orphans in
    /// the bucket and are only logged.
    pub async fn discard(&self, urls: &[String]) {
        for url in urls {
            if let Err(err) = self.media.delete(url).await {
                tracing::warn!(error = ?err, url = %url, "failed to delete media");
            }
        }
    }

    /// Discards the URLs present in `before` but missing from `after`.
    pub async fn discard_replaced(&self, before: &[String], after: &[String]) {
        let replaced: Vec<String> = before
            .iter()
            .filter(|url| !after.contains(url))
            .cloned()
            .collect();
        self.discard(&replaced).await;
    }
}
