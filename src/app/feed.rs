use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::error::{CoreError, CoreResult};
use crate::app::ledger::InteractionLedger;
use crate::domain::interaction::{InteractionKey, InteractionKind, TargetType};
use crate::domain::page::{PageRequest, Paged};
use crate::domain::post::{Post, PostVisibility};
use crate::infra::store::{FeedQuery, FeedSource, LedgerStore, PostStore, Store, UserStore};

/// A post annotated with the caller's own interaction state. The flags are
/// omitted for anonymous callers.
#[derive(Debug, Clone, Serialize)]
pub struct FeedItem {
    #[serde(flatten)]
    pub post: Post,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_liked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_saved: Option<bool>,
}

#[derive(Clone)]
pub struct FeedService {
    store: Arc<dyn Store>,
    ledger: InteractionLedger,
}

impl FeedService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            ledger: InteractionLedger::new(store.clone()),
            store,
        }
    }

    pub async fn home_feed(
        &self,
        viewer_id: Option<Uuid>,
        page: PageRequest,
    ) -> CoreResult<Paged<FeedItem>> {
        self.compose(viewer_id, FeedSource::All, page).await
    }

    pub async fn user_posts(
        &self,
        viewer_id: Option<Uuid>,
        owner_id: Uuid,
        page: PageRequest,
    ) -> CoreResult<Paged<FeedItem>> {
        if self.store.get_user(owner_id).await?.is_none() {
            return Err(CoreError::not_found("user not found"));
        }
        self.compose(viewer_id, FeedSource::Owner(owner_id), page)
            .await
    }

    /// The caller's saved posts, newest save first, still visibility-filtered.
    pub async fn saved_posts(
        &self,
        viewer_id: Uuid,
        page: PageRequest,
    ) -> CoreResult<Paged<FeedItem>> {
        self.compose(Some(viewer_id), FeedSource::Saved, page).await
    }

    pub async fn get_post(&self, viewer_id: Option<Uuid>, post_id: Uuid) -> CoreResult<FeedItem> {
        let post = self.visible_post(viewer_id, post_id).await?;
        let mut items = self.annotate(viewer_id, vec![post]).await?;
        items
            .pop()
            .ok_or_else(|| CoreError::not_found("post not found"))
    }

    /// Loads a post and applies the visibility predicate: `NotFound` when it
    /// does not exist, `Forbidden` when the caller may not see it.
    pub async fn visible_post(&self, viewer_id: Option<Uuid>, post_id: Uuid) -> CoreResult<Post> {
        let post = self
            .store
            .get_post(post_id)
            .await?
            .ok_or_else(|| CoreError::not_found("post not found"))?;

        let follows_owner = match viewer_id {
            Some(viewer_id)
                if post.visibility == PostVisibility::Followers && viewer_id != post.owner_id =>
            {
                self.store
                    .interaction_exists(InteractionKey::new(
                        viewer_id,
                        InteractionKind::Follow,
                        post.owner_id,
                        TargetType::User,
                    ))
                    .await?
            }
            _ => false,
        };

        if post.visible_to(viewer_id, follows_owner, OffsetDateTime::now_utc()) {
            Ok(post)
        } else {
            Err(CoreError::forbidden("post is not visible"))
        }
    }

    async fn compose(
        &self,
        viewer_id: Option<Uuid>,
        source: FeedSource,
        page: PageRequest,
    ) -> CoreResult<Paged<FeedItem>> {
        let query = FeedQuery {
            viewer_id,
            now: OffsetDateTime::now_utc(),
            source,
        };
        let (posts, total) = self.store.list_visible_posts(query, page).await?;
        let items = self.annotate(viewer_id, posts).await?;
        Ok(Paged::new(items, page, total))
    }

    async fn annotate(&self, viewer_id: Option<Uuid>, posts: Vec<Post>) -> CoreResult<Vec<FeedItem>> {
        let Some(viewer_id) = viewer_id else {
            return Ok(posts
                .into_iter()
                .map(|post| FeedItem {
                    post,
                    is_liked: None,
                    is_saved: None,
                })
                .collect());
        };

        let ids: Vec<Uuid> = posts.iter().map(|post| post.id).collect();
        let liked: HashSet<Uuid> = self
            .ledger
            .interacted(viewer_id, InteractionKind::Like, TargetType::Post, &ids)
            .await?;
        let saved: HashSet<Uuid> = self
            .ledger
            .interacted(viewer_id, InteractionKind::Save, TargetType::Post, &ids)
            .await?;

        Ok(posts
            .into_iter()
            .map(|post| FeedItem {
                is_liked: Some(liked.contains(&post.id)),
                is_saved: Some(saved.contains(&post.id)),
                post,
            })
            .collect())
    }
}
