use std::sync::Arc;

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::error::{CoreError, CoreResult};
use crate::app::ledger::InteractionLedger;
use crate::domain::interaction::{InteractionKind, InteractionRecord, TargetType};
use crate::domain::page::{PageRequest, Paged};
use crate::domain::user::User;
use crate::infra::store::{Store, UserStore};

#[derive(Clone)]
pub struct SocialService {
    store: Arc<dyn Store>,
    ledger: InteractionLedger,
}

#[derive(Debug, Serialize)]
pub struct RelationshipStatus {
    pub is_following: bool,
    pub is_followed_by: bool,
}

#[derive(Debug, Serialize)]
pub struct FollowEdge {
    pub user: User,
    #[serde(with = "time::serde::rfc3339")]
    pub followed_at: OffsetDateTime,
}

impl SocialService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            ledger: InteractionLedger::new(store.clone()),
            store,
        }
    }

    pub async fn follow(&self, follower_id: Uuid, followee_id: Uuid) -> CoreResult<InteractionRecord> {
        if follower_id != followee_id && self.store.get_user(follower_id).await?.is_none() {
            return Err(CoreError::forbidden("create a profile before following"));
        }
        self.ledger
            .record(follower_id, InteractionKind::Follow, followee_id, TargetType::User)
            .await
    }

    pub async fn unfollow(&self, follower_id: Uuid, followee_id: Uuid) -> CoreResult<()> {
        self.ledger
            .remove(follower_id, InteractionKind::Follow, followee_id, TargetType::User)
            .await
    }

    pub async fn list_followers(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> CoreResult<Paged<FollowEdge>> {
        self.ensure_user(user_id).await?;
        let records = self
            .ledger
            .list_by_target(InteractionKind::Follow, TargetType::User, user_id, page)
            .await?;
        self.resolve(records, |record| record.actor_id).await
    }

    pub async fn list_following(
        &self,
        user_id: Uuid,
        page: PageRequest,
    ) -> CoreResult<Paged<FollowEdge>> {
        self.ensure_user(user_id).await?;
        let records = self
            .ledger
            .list_by_actor(user_id, InteractionKind::Follow, TargetType::User, page)
            .await?;
        self.resolve(records, |record| record.target_id).await
    }

    pub async fn relationship_status(
        &self,
        viewer_id: Uuid,
        other_id: Uuid,
    ) -> CoreResult<RelationshipStatus> {
        self.ensure_user(other_id).await?;
        let is_following = self
            .ledger
            .exists(viewer_id, InteractionKind::Follow, other_id, TargetType::User)
            .await?;
        let is_followed_by = self
            .ledger
            .exists(other_id, InteractionKind::Follow, viewer_id, TargetType::User)
            .await?;

        Ok(RelationshipStatus {
            is_following,
            is_followed_by,
        })
    }

    async fn ensure_user(&self, user_id: Uuid) -> CoreResult<()> {
        match self.store.get_user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(CoreError::not_found("user not found")),
        }
    }

    async fn resolve(
        &self,
        records: Paged<InteractionRecord>,
        other: fn(&InteractionRecord) -> Uuid,
    ) -> CoreResult<Paged<FollowEdge>> {
        let mut edges = Vec::with_capacity(records.items.len());
        for record in &records.items {
            // rows for deleted users are purged with the user; skip any stragglers
            if let Some(user) = self.store.get_user(other(record)).await? {
                edges.push(FollowEdge {
                    user,
                    followed_at: record.created_at,
                });
            }
        }

        Ok(Paged {
            items: edges,
            page: records.page,
            limit: records.limit,
            total: records.total,
            pages: records.pages,
        })
    }
}
