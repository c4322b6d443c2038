use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::app::authz::ensure_owner;
use crate::app::counters::CounterSynchronizer;
use crate::app::error::{CoreError, CoreResult};
use crate::app::feed::FeedService;
use crate::app::ledger::InteractionLedger;
use crate::domain::engagement::Comment;
use crate::domain::interaction::{InteractionKind, InteractionRecord, TargetType};
use crate::domain::page::{PageRequest, Paged};
use crate::infra::store::{CommentStore, Store, UserStore};

pub const MAX_COMMENT_CHARS: usize = 1000;

#[derive(Debug, Clone, Serialize)]
pub struct CommentItem {
    #[serde(flatten)]
    pub comment: Comment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_liked: Option<bool>,
}

#[derive(Clone)]
pub struct CommentService {
    store: Arc<dyn Store>,
    feed: FeedService,
    ledger: InteractionLedger,
    counters: CounterSynchronizer,
}

impl CommentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            feed: FeedService::new(store.clone()),
            ledger: InteractionLedger::new(store.clone()),
            counters: CounterSynchronizer::new(store.clone()),
            store,
        }
    }

    pub async fn create_comment(
        &self,
        user_id: Uuid,
        post_id: Uuid,
        body: String,
    ) -> CoreResult<Comment> {
        let body = validate_body(body)?;
        if self.store.get_user(user_id).await?.is_none() {
            return Err(CoreError::forbidden("create a profile before commenting"));
        }
        self.feed.visible_post(Some(user_id), post_id).await?;

        let comment = self.store.insert_comment(post_id, user_id, body).await?;
        self.counters.on_comment(post_id, 1).await;
        Ok(comment)
    }

    pub async fn list_comments(
        &self,
        viewer_id: Option<Uuid>,
        post_id: Uuid,
        page: PageRequest,
    ) -> CoreResult<Paged<CommentItem>> {
        self.feed.visible_post(viewer_id, post_id).await?;
        let (comments, total) = self.store.list_comments(post_id, page).await?;

        let liked = match viewer_id {
            Some(viewer_id) => {
                let ids: Vec<Uuid> = comments.iter().map(|comment| comment.id).collect();
                Some(
                    self.ledger
                        .interacted(viewer_id, InteractionKind::Like, TargetType::Comment, &ids)
                        .await?,
                )
            }
            None => None,
        };

        let items = comments
            .into_iter()
            .map(|comment| CommentItem {
                is_liked: liked.as_ref().map(|liked| liked.contains(&comment.id)),
                comment,
            })
            .collect();
        Ok(Paged::new(items, page, total))
    }

    pub async fn update_comment(
        &self,
        caller_id: Uuid,
        comment_id: Uuid,
        body: String,
    ) -> CoreResult<Comment> {
        let body = validate_body(body)?;
        let existing = self.load(comment_id).await?;
        ensure_owner(&existing, caller_id, "edit this comment")?;

        self.store
            .update_comment(comment_id, body)
            .await?
            .ok_or_else(|| CoreError::not_found("comment not found"))
    }

    pub async fn delete_comment(&self, caller_id: Uuid, comment_id: Uuid) -> CoreResult<()> {
        let existing = self.load(comment_id).await?;
        ensure_owner(&existing, caller_id, "delete this comment")?;
        self.remove_comment(comment_id).await
    }

    /// Deletes a comment and its likes, then decrements the post's counter.
    pub(crate) async fn remove_comment(&self, comment_id: Uuid) -> CoreResult<()> {
        let deleted = self
            .store
            .delete_comment(comment_id)
            .await?
            .ok_or_else(|| CoreError::not_found("comment not found"))?;

        self.counters.on_comment(deleted.post_id, -1).await;
        Ok(())
    }

    pub async fn like(&self, caller_id: Uuid, comment_id: Uuid) -> CoreResult<InteractionRecord> {
        let comment = self.load(comment_id).await?;
        self.feed.visible_post(Some(caller_id), comment.post_id).await?;
        self.ledger
            .record(caller_id, InteractionKind::Like, comment_id, TargetType::Comment)
            .await
    }

    pub async fn unlike(&self, caller_id: Uuid, comment_id: Uuid) -> CoreResult<()> {
        self.ledger
            .remove(caller_id, InteractionKind::Like, comment_id, TargetType::Comment)
            .await
    }

    async fn load(&self, comment_id: Uuid) -> CoreResult<Comment> {
        self.store
            .get_comment(comment_id)
            .await?
            .ok_or_else(|| CoreError::not_found("comment not found"))
    }
}

fn validate_body(body: String) -> CoreResult<String> {
    let body = body.trim().to_string();
    if body.is_empty() {
        return Err(CoreError::invalid("comment cannot be empty"));
    }
    if body.chars().count() > MAX_COMMENT_CHARS {
        return Err(CoreError::invalid(format!(
            "comment must be at most {} characters",
            MAX_COMMENT_CHARS
        )));
    }
    Ok(body)
}
