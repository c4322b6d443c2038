use std::collections::HashSet;
use std::sync::Arc;

use uuid::Uuid;

use crate::app::counters::CounterSynchronizer;
use crate::app::error::{CoreError, CoreResult};
use crate::domain::interaction::{InteractionKey, InteractionKind, InteractionRecord, TargetType};
use crate::domain::page::{PageRequest, Paged};
use crate::infra::store::{InteractionInsert, LedgerStore, Store};

/// Append/remove-only record of who liked, saved, or followed what. Every
/// successful write moves the matching counter before returning.
#[derive(Clone)]
pub struct InteractionLedger {
    store: Arc<dyn Store>,
    counters: CounterSynchronizer,
}

impl InteractionLedger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            counters: CounterSynchronizer::new(store.clone()),
            store,
        }
    }

    pub async fn record(
        &self,
        actor_id: Uuid,
        kind: InteractionKind,
        target_id: Uuid,
        target_type: TargetType,
    ) -> CoreResult<InteractionRecord> {
        let key = normalize(actor_id, kind, target_id, target_type)?;
        if key.kind == InteractionKind::Follow && key.actor_id == key.target_id {
            return Err(CoreError::invalid("cannot follow yourself"));
        }
        let record = match self.store.insert_interaction(key).await? {
            InteractionInsert::Recorded(record) => record,
            InteractionInsert::Duplicate => {
                return Err(CoreError::conflict(format!("already {}", past_tense(key.kind))))
            }
            InteractionInsert::MissingTarget => {
                return Err(CoreError::not_found(format!(
                    "{} not found",
                    key.target_type.as_db()
                )))
            }
        };

        self.counters.on_interaction(key, 1).await;
        tracing::debug!(
            actor_id = %key.actor_id,
            kind = key.kind.as_db(),
            target_id = %key.target_id,
            "interaction recorded"
        );
        Ok(record)
    }

    pub async fn remove(
        &self,
        actor_id: Uuid,
        kind: InteractionKind,
        target_id: Uuid,
        target_type: TargetType,
    ) -> CoreResult<()> {
        let key = normalize(actor_id, kind, target_id, target_type)?;
        if !self.store.delete_interaction(key).await? {
            return Err(CoreError::not_found(format!(
                "not {}",
                past_tense(key.kind)
            )));
        }

        self.counters.on_interaction(key, -1).await;
        Ok(())
    }

    pub async fn exists(
        &self,
        actor_id: Uuid,
        kind: InteractionKind,
        target_id: Uuid,
        target_type: TargetType,
    ) -> CoreResult<bool> {
        let key = normalize(actor_id, kind, target_id, target_type)?;
        Ok(self.store.interaction_exists(key).await?)
    }

    /// Batch existence check over one page of targets.
    pub async fn interacted(
        &self,
        actor_id: Uuid,
        kind: InteractionKind,
        target_type: TargetType,
        target_ids: &[Uuid],
    ) -> CoreResult<HashSet<Uuid>> {
        let key = normalize(actor_id, kind, Uuid::nil(), target_type)?;
        Ok(self
            .store
            .interacted_targets(actor_id, key.kind, key.target_type, target_ids)
            .await?)
    }

    pub async fn list_by_actor(
        &self,
        actor_id: Uuid,
        kind: InteractionKind,
        target_type: TargetType,
        page: PageRequest,
    ) -> CoreResult<Paged<InteractionRecord>> {
        let key = normalize(actor_id, kind, Uuid::nil(), target_type)?;
        let (records, total) = self
            .store
            .list_by_actor(actor_id, key.kind, key.target_type, page)
            .await?;
        Ok(Paged::new(records, page, total))
    }

    pub async fn list_by_target(
        &self,
        kind: InteractionKind,
        target_type: TargetType,
        target_id: Uuid,
        page: PageRequest,
    ) -> CoreResult<Paged<InteractionRecord>> {
        let key = normalize(Uuid::nil(), kind, target_id, target_type)?;
        let (records, total) = self
            .store
            .list_by_target(key.kind, key.target_type, target_id, page)
            .await?;
        Ok(Paged::new(records, page, total))
    }

    pub async fn count_by_target(
        &self,
        kind: InteractionKind,
        target_type: TargetType,
        target_id: Uuid,
    ) -> CoreResult<i64> {
        let key = normalize(Uuid::nil(), kind, target_id, target_type)?;
        Ok(self
            .store
            .count_by_target(key.kind, key.target_type, target_id)
            .await?)
    }

    pub async fn count_by_actor(
        &self,
        actor_id: Uuid,
        kind: InteractionKind,
        target_type: TargetType,
    ) -> CoreResult<i64> {
        let key = normalize(actor_id, kind, Uuid::nil(), target_type)?;
        Ok(self
            .store
            .count_by_actor(actor_id, key.kind, key.target_type)
            .await?)
    }
}

fn normalize(
    actor_id: Uuid,
    kind: InteractionKind,
    target_id: Uuid,
    target_type: TargetType,
) -> CoreResult<InteractionKey> {
    InteractionKey::new(actor_id, kind, target_id, target_type)
        .normalized()
        .ok_or_else(|| {
            CoreError::invalid(format!(
                "{} cannot target a {}",
                kind.as_db(),
                target_type.as_db()
            ))
        })
}

fn past_tense(kind: InteractionKind) -> &'static str {
    match kind {
        InteractionKind::Like | InteractionKind::CommentLike => "liked",
        InteractionKind::Save => "saved",
        InteractionKind::Follow => "following",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::post::{NewPost, PostVisibility};
    use crate::domain::user::NewUser;
    use crate::infra::store::{CommentStore, MemoryStore, PostStore, UserStore};

    async fn seeded() -> (Arc<MemoryStore>, InteractionLedger, Uuid, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let owner = Uuid::new_v4();
        store
            .insert_user(NewUser {
                id: owner,
                handle: "ledger_owner".to_string(),
                display_name: "Owner".to_string(),
                bio: None,
                avatar_url: None,
            })
            .await
            .unwrap();
        let post = store
            .insert_post(NewPost {
                owner_id: owner,
                caption: Some("hi".to_string()),
                media_urls: Vec::new(),
                visibility: PostVisibility::Public,
                is_story: false,
                expires_at: None,
            })
            .await
            .unwrap();
        let ledger = InteractionLedger::new(store.clone());
        (store, ledger, owner, post.id)
    }

    async fn likes(store: &MemoryStore, post_id: Uuid) -> i64 {
        store.get_post(post_id).await.unwrap().unwrap().likes_count
    }

    #[tokio::test]
    async fn record_then_remove_moves_counter() {
        let (store, ledger, _, post_id) = seeded().await;
        let actor = Uuid::new_v4();

        ledger
            .record(actor, InteractionKind::Like, post_id, TargetType::Post)
            .await
            .unwrap();
        assert!(ledger
            .exists(actor, InteractionKind::Like, post_id, TargetType::Post)
            .await
            .unwrap());
        assert_eq!(likes(&store, post_id).await, 1);

        let duplicate = ledger
            .record(actor, InteractionKind::Like, post_id, TargetType::Post)
            .await;
        assert!(matches!(duplicate, Err(CoreError::Conflict(_))));
        assert_eq!(likes(&store, post_id).await, 1);

        ledger
            .remove(actor, InteractionKind::Like, post_id, TargetType::Post)
            .await
            .unwrap();
        assert_eq!(likes(&store, post_id).await, 0);

        let absent = ledger
            .remove(actor, InteractionKind::Like, post_id, TargetType::Post)
            .await;
        assert!(matches!(absent, Err(CoreError::NotFound(_))));
        assert_eq!(likes(&store, post_id).await, 0);
    }

    #[tokio::test]
    async fn invalid_pairs_and_self_follow_are_rejected() {
        let (_, ledger, owner, post_id) = seeded().await;

        let save_user = ledger
            .record(owner, InteractionKind::Save, owner, TargetType::User)
            .await;
        assert!(matches!(save_user, Err(CoreError::InvalidInput(_))));

        let follow_post = ledger
            .record(owner, InteractionKind::Follow, post_id, TargetType::Post)
            .await;
        assert!(matches!(follow_post, Err(CoreError::InvalidInput(_))));

        let self_follow = ledger
            .record(owner, InteractionKind::Follow, owner, TargetType::User)
            .await;
        assert!(matches!(self_follow, Err(CoreError::InvalidInput(_))));

        let missing = ledger
            .record(owner, InteractionKind::Like, Uuid::new_v4(), TargetType::Post)
            .await;
        assert!(matches!(missing, Err(CoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn comment_like_shares_the_like_slot() {
        let (store, ledger, owner, post_id) = seeded().await;
        let comment = store
            .insert_comment(post_id, owner, "nice".to_string())
            .await
            .unwrap();
        let actor = Uuid::new_v4();

        ledger
            .record(actor, InteractionKind::CommentLike, comment.id, TargetType::Comment)
            .await
            .unwrap();
        let again = ledger
            .record(actor, InteractionKind::Like, comment.id, TargetType::Comment)
            .await;
        assert!(matches!(again, Err(CoreError::Conflict(_))));

        let liked = ledger
            .interacted(actor, InteractionKind::Like, TargetType::Comment, &[comment.id])
            .await
            .unwrap();
        assert!(liked.contains(&comment.id));

        let stored = store.get_comment(comment.id).await.unwrap().unwrap();
        assert_eq!(stored.likes_count, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn likes_racing_a_delete_leave_no_records_behind() {
        let (store, ledger, _, post_id) = seeded().await;

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let ledger = ledger.clone();
            tasks.push(tokio::spawn(async move {
                ledger
                    .record(Uuid::new_v4(), InteractionKind::Like, post_id, TargetType::Post)
                    .await
            }));
        }
        store.delete_post(post_id).await.unwrap();

        for task in tasks {
            match task.await.unwrap() {
                Ok(_) | Err(CoreError::NotFound(_)) => {}
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        let left = store
            .count_by_target(InteractionKind::Like, TargetType::Post, post_id)
            .await
            .unwrap();
        assert_eq!(left, 0);

        let late = ledger
            .record(Uuid::new_v4(), InteractionKind::Like, post_id, TargetType::Post)
            .await;
        assert!(matches!(late, Err(CoreError::NotFound(_))));
    }
}
