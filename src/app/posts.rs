use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::app::authz::ensure_owner;
use crate::app::error::{CoreError, CoreResult};
use crate::app::feed::FeedService;
use crate::app::ledger::InteractionLedger;
use crate::app::media::MediaService;
use crate::domain::interaction::{InteractionKind, InteractionRecord, TargetType};
use crate::domain::post::{NewPost, Post, PostChanges, PostVisibility};
use crate::infra::store::{PostStore, Store, UserStore};

pub const MAX_CAPTION_CHARS: usize = 2200;
pub const MAX_MEDIA_PER_POST: usize = 10;

#[derive(Debug, Clone)]
pub struct CreatePost {
    pub caption: Option<String>,
    pub media_urls: Vec<String>,
    pub visibility: PostVisibility,
    pub is_story: bool,
}

#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn Store>,
    feed: FeedService,
    ledger: InteractionLedger,
    media: MediaService,
    story_ttl: Duration,
}

impl PostService {
    pub fn new(store: Arc<dyn Store>, media: MediaService, story_ttl: Duration) -> Self {
        Self {
            feed: FeedService::new(store.clone()),
            ledger: InteractionLedger::new(store.clone()),
            store,
            media,
            story_ttl,
        }
    }

    pub async fn create_post(&self, owner_id: Uuid, input: CreatePost) -> CoreResult<Post> {
        if self.store.get_user(owner_id).await?.is_none() {
            return Err(CoreError::forbidden("create a profile before posting"));
        }
        let caption = normalize_caption(input.caption)?;
        validate_media(&input.media_urls)?;
        if caption.is_none() && input.media_urls.is_empty() {
            return Err(CoreError::invalid("post needs a caption or media"));
        }
        if input.is_story && input.media_urls.is_empty() {
            return Err(CoreError::invalid("a story needs media"));
        }

        let expires_at = input
            .is_story
            .then(|| OffsetDateTime::now_utc() + self.story_ttl);

        let post = self
            .store
            .insert_post(NewPost {
                owner_id,
                caption,
                media_urls: input.media_urls,
                visibility: input.visibility,
                is_story: input.is_story,
                expires_at,
            })
            .await?;

        tracing::info!(post_id = %post.id, owner_id = %owner_id, is_story = post.is_story, "post created");
        Ok(post)
    }

    pub async fn update_post(
        &self,
        caller_id: Uuid,
        post_id: Uuid,
        mut changes: PostChanges,
    ) -> CoreResult<Post> {
        let existing = self.load(post_id).await?;
        ensure_owner(&existing, caller_id, "edit this post")?;

        if let Some(caption) = changes.caption.take() {
            changes.caption = Some(normalize_caption(caption)?);
        }
        if let Some(media_urls) = &changes.media_urls {
            validate_media(media_urls)?;
        }

        let has_caption = match &changes.caption {
            Some(caption) => caption.is_some(),
            None => existing.caption.is_some(),
        };
        let has_media = match &changes.media_urls {
            Some(media_urls) => !media_urls.is_empty(),
            None => !existing.media_urls.is_empty(),
        };
        if existing.is_story && !has_media {
            return Err(CoreError::invalid("a story needs media"));
        }
        if !has_caption && !has_media {
            return Err(CoreError::invalid("post needs a caption or media"));
        }

        let updated = self
            .store
            .update_post(post_id, changes)
            .await?
            .ok_or_else(|| CoreError::not_found("post not found"))?;

        self.media
            .discard_replaced(&existing.media_urls, &updated.media_urls)
            .await;
        Ok(updated)
    }

    pub async fn delete_post(&self, caller_id: Uuid, post_id: Uuid) -> CoreResult<()> {
        let existing = self.load(post_id).await?;
        ensure_owner(&existing, caller_id, "delete this post")?;

        let deleted = self
            .store
            .delete_post(post_id)
            .await?
            .ok_or_else(|| CoreError::not_found("post not found"))?;

        self.media.discard(&deleted.media_urls).await;
        tracing::info!(post_id = %post_id, "post deleted");
        Ok(())
    }

    pub async fn like(&self, caller_id: Uuid, post_id: Uuid) -> CoreResult<InteractionRecord> {
        self.feed.visible_post(Some(caller_id), post_id).await?;
        self.ledger
            .record(caller_id, InteractionKind::Like, post_id, TargetType::Post)
            .await
    }

    pub async fn unlike(&self, caller_id: Uuid, post_id: Uuid) -> CoreResult<()> {
        self.ledger
            .remove(caller_id, InteractionKind::Like, post_id, TargetType::Post)
            .await
    }

    pub async fn save(&self, caller_id: Uuid, post_id: Uuid) -> CoreResult<InteractionRecord> {
        self.feed.visible_post(Some(caller_id), post_id).await?;
        self.ledger
            .record(caller_id, InteractionKind::Save, post_id, TargetType::Post)
            .await
    }

    pub async fn unsave(&self, caller_id: Uuid, post_id: Uuid) -> CoreResult<()> {
        self.ledger
            .remove(caller_id, InteractionKind::Save, post_id, TargetType::Post)
            .await
    }

    async fn load(&self, post_id: Uuid) -> CoreResult<Post> {
        self.store
            .get_post(post_id)
            .await?
            .ok_or_else(|| CoreError::not_found("post not found"))
    }
}

fn normalize_caption(caption: Option<String>) -> CoreResult<Option<String>> {
    let Some(caption) = caption else {
        return Ok(None);
    };
    let caption = caption.trim().to_string();
    if caption.chars().count() > MAX_CAPTION_CHARS {
        return Err(CoreError::invalid(format!(
            "caption must be at most {} characters",
            MAX_CAPTION_CHARS
        )));
    }
    Ok((!caption.is_empty()).then_some(caption))
}

fn validate_media(media_urls: &[String]) -> CoreResult<()> {
    if media_urls.len() > MAX_MEDIA_PER_POST {
        return Err(CoreError::invalid(format!(
            "a post holds at most {} media items",
            MAX_MEDIA_PER_POST
        )));
    }
    if media_urls.iter().any(|url| url.trim().is_empty()) {
        return Err(CoreError::invalid("media urls cannot be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caption_is_trimmed_and_bounded() {
        assert_eq!(
            normalize_caption(Some("  hi  ".into())).unwrap(),
            Some("hi".to_string())
        );
        assert_eq!(normalize_caption(Some("   ".into())).unwrap(), None);
        assert!(normalize_caption(Some("a".repeat(MAX_CAPTION_CHARS + 1))).is_err());
        assert!(normalize_caption(Some("é".repeat(MAX_CAPTION_CHARS))).is_ok());
    }
}
