use std::sync::Arc;

use uuid::Uuid;

use crate::app::comments::CommentService;
use crate::app::error::{CoreError, CoreResult};
use crate::app::ledger::InteractionLedger;
use crate::app::media::MediaService;
use crate::domain::interaction::{InteractionKind, TargetType};
use crate::domain::page::{PageRequest, MAX_PAGE_LIMIT};
use crate::domain::user::{NewUser, PublicUser, User, UserChanges};
use crate::infra::store::{CommentStore, PostStore, Store, UserStore};

pub const MIN_HANDLE_CHARS: usize = 3;
pub const MAX_HANDLE_CHARS: usize = 30;

/// Interactions an account can author, removed one by one on deletion so the
/// counters on other people's content follow.
const AUTHORED: [(InteractionKind, TargetType); 4] = [
    (InteractionKind::Like, TargetType::Post),
    (InteractionKind::Like, TargetType::Comment),
    (InteractionKind::Save, TargetType::Post),
    (InteractionKind::Follow, TargetType::User),
];

#[derive(Debug, Clone)]
pub struct CreateProfile {
    pub handle: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn Store>,
    ledger: InteractionLedger,
    media: MediaService,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>, media: MediaService) -> Self {
        Self {
            ledger: InteractionLedger::new(store.clone()),
            store,
            media,
        }
    }

    /// Creates the profile for an identity the provider already knows.
    pub async fn create_profile(&self, user_id: Uuid, input: CreateProfile) -> CoreResult<User> {
        let handle = validate_handle(&input.handle)?;
        let display_name = input.display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(CoreError::invalid("display_name cannot be empty"));
        }
        if self.store.get_user(user_id).await?.is_some() {
            return Err(CoreError::conflict("profile already exists"));
        }

        let user = self
            .store
            .insert_user(NewUser {
                id: user_id,
                handle,
                display_name,
                bio: input.bio,
                avatar_url: input.avatar_url,
            })
            .await?
            .ok_or_else(|| CoreError::conflict("handle already taken"))?;

        tracing::info!(user_id = %user.id, handle = %user.handle, "profile created");
        Ok(user)
    }

    pub async fn get_profile(&self, user_id: Uuid) -> CoreResult<PublicUser> {
        let user = self.load(user_id).await?;
        let followers_count = self
            .ledger
            .count_by_target(InteractionKind::Follow, TargetType::User, user_id)
            .await?;
        let following_count = self
            .ledger
            .count_by_actor(user_id, InteractionKind::Follow, TargetType::User)
            .await?;
        let posts_count = self.store.count_posts_by_owner(user_id).await?;

        Ok(PublicUser {
            followers_count,
            following_count,
            posts_count,
            ..PublicUser::from(user)
        })
    }

    pub async fn update_profile(
        &self,
        caller_id: Uuid,
        user_id: Uuid,
        mut changes: UserChanges,
    ) -> CoreResult<User> {
        if caller_id != user_id {
            return Err(CoreError::forbidden("cannot update other users"));
        }
        if let Some(display_name) = changes.display_name.take() {
            let display_name = display_name.trim().to_string();
            if display_name.is_empty() {
                return Err(CoreError::invalid("display_name cannot be empty"));
            }
            changes.display_name = Some(display_name);
        }

        let existing = self.load(user_id).await?;
        let updated = self
            .store
            .update_user(user_id, changes)
            .await?
            .ok_or_else(|| CoreError::not_found("user not found"))?;

        if let Some(old_avatar) = existing.avatar_url {
            if updated.avatar_url.as_deref() != Some(old_avatar.as_str()) {
                self.media.discard(&[old_avatar]).await;
            }
        }
        Ok(updated)
    }

    /// Removes the account and everything it owns. Authored interactions and
    /// comments go through the normal removal paths so counters elsewhere are
    /// decremented.
    pub async fn delete_account(&self, user_id: Uuid) -> CoreResult<()> {
        let user = self.load(user_id).await?;

        for (kind, target_type) in AUTHORED {
            self.remove_authored(user_id, kind, target_type).await?;
        }

        let comments = CommentService::new(self.store.clone());
        for comment_id in self.store.list_comment_ids_by_user(user_id).await? {
            match comments.remove_comment(comment_id).await {
                Ok(()) | Err(CoreError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }

        let mut media_urls = Vec::new();
        for post_id in self.store.list_post_ids_by_owner(user_id).await? {
            if let Some(post) = self.store.delete_post(post_id).await? {
                media_urls.extend(post.media_urls);
            }
        }

        let listing_media = self
            .store
            .delete_user(user_id)
            .await?
            .ok_or_else(|| CoreError::not_found("user not found"))?;
        media_urls.extend(listing_media);
        media_urls.extend(user.avatar_url);
        self.media.discard(&media_urls).await;

        tracing::info!(user_id = %user_id, "account deleted");
        Ok(())
    }

    async fn remove_authored(
        &self,
        user_id: Uuid,
        kind: InteractionKind,
        target_type: TargetType,
    ) -> CoreResult<()> {
        let window = PageRequest::new(1, MAX_PAGE_LIMIT);
        loop {
            let records = self
                .ledger
                .list_by_actor(user_id, kind, target_type, window)
                .await?;
            if records.items.is_empty() {
                return Ok(());
            }
            let mut removed = 0;
            for record in records.items {
                match self
                    .ledger
                    .remove(user_id, record.kind, record.target_id, record.target_type)
                    .await
                {
                    Ok(()) => removed += 1,
                    Err(CoreError::NotFound(_)) => {}
                    Err(err) => return Err(err),
                }
            }
            if removed == 0 {
                return Ok(());
            }
        }
    }

    async fn load(&self, user_id: Uuid) -> CoreResult<User> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| CoreError::not_found("user not found"))
    }
}

/// Handles are stored lowercase: 3 to 30 of `[a-z0-9_]`.
pub fn validate_handle(handle: &str) -> CoreResult<String> {
    let handle = handle.trim().to_lowercase();
    let length = handle.chars().count();
    if !(MIN_HANDLE_CHARS..=MAX_HANDLE_CHARS).contains(&length) {
        return Err(CoreError::invalid(format!(
            "handle must be {} to {} characters",
            MIN_HANDLE_CHARS, MAX_HANDLE_CHARS
        )));
    }
    if !handle
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_')
    {
        return Err(CoreError::invalid(
            "handle may only contain letters, digits and underscores",
        ));
    }
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_lowercased_and_checked() {
        assert_eq!(validate_handle(" Rex_99 ").unwrap(), "rex_99");
        assert!(validate_handle("ab").is_err());
        assert!(validate_handle(&"a".repeat(31)).is_err());
        assert!(validate_handle("rex-99").is_err());
        assert!(validate_handle("réx").is_err());
    }
}
