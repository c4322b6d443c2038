use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub seq: i64,
    pub owner_id: Uuid,
    pub caption: Option<String>,
    pub media_urls: Vec<String>,
    pub visibility: PostVisibility,
    pub is_story: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    pub likes_count: i64,
    pub comments_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostVisibility {
    Public,
    Followers,
    Private,
}

impl PostVisibility {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "public" => Some(Self::Public),
            "followers" => Some(Self::Followers),
            "private" => Some(Self::Private),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Followers => "followers",
            Self::Private => "private",
        }
    }
}

impl Post {
    /// A story stays live until `expires_at`; a story without one never expires.
    pub fn is_live(&self, now: OffsetDateTime) -> bool {
        if !self.is_story {
            return true;
        }
        match self.expires_at {
            Some(expires_at) => now < expires_at,
            None => true,
        }
    }

    /// The post visibility predicate. `follows_owner` must say whether the viewer
    /// holds a follow record on the post owner. The SQL in the Postgres store
    /// mirrors this function and must be kept in step with it.
    pub fn visible_to(
        &self,
        viewer_id: Option<Uuid>,
        follows_owner: bool,
        now: OffsetDateTime,
    ) -> bool {
        if self.visibility == PostVisibility::Public && self.is_live(now) {
            return true;
        }
        let Some(viewer_id) = viewer_id else {
            return false;
        };
        if viewer_id == self.owner_id {
            return true;
        }
        self.visibility == PostVisibility::Followers && follows_owner
    }
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub owner_id: Uuid,
    pub caption: Option<String>,
    pub media_urls: Vec<String>,
    pub visibility: PostVisibility,
    pub is_story: bool,
    pub expires_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    /// `Some(None)` clears the caption.
    pub caption: Option<Option<String>>,
    pub media_urls: Option<Vec<String>>,
    pub visibility: Option<PostVisibility>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn post(visibility: PostVisibility) -> Post {
        let now = OffsetDateTime::now_utc();
        Post {
            id: Uuid::new_v4(),
            seq: 1,
            owner_id: Uuid::new_v4(),
            caption: None,
            media_urls: vec![],
            visibility,
            is_story: false,
            expires_at: None,
            likes_count: 0,
            comments_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn public_post_is_visible_to_everyone() {
        let p = post(PostVisibility::Public);
        let now = OffsetDateTime::now_utc();
        assert!(p.visible_to(None, false, now));
        assert!(p.visible_to(Some(Uuid::new_v4()), false, now));
    }

    #[test]
    fn private_post_is_owner_only() {
        let p = post(PostVisibility::Private);
        let now = OffsetDateTime::now_utc();
        assert!(!p.visible_to(None, false, now));
        assert!(!p.visible_to(Some(Uuid::new_v4()), true, now));
        assert!(p.visible_to(Some(p.owner_id), false, now));
    }

    #[test]
    fn followers_post_needs_follow() {
        let p = post(PostVisibility::Followers);
        let now = OffsetDateTime::now_utc();
        let viewer = Some(Uuid::new_v4());
        assert!(!p.visible_to(viewer, false, now));
        assert!(p.visible_to(viewer, true, now));
        assert!(!p.visible_to(None, true, now));
    }

    #[test]
    fn expired_story_is_hidden_except_from_owner() {
        let now = OffsetDateTime::now_utc();
        let mut p = post(PostVisibility::Public);
        p.is_story = true;
        p.expires_at = Some(now - Duration::minutes(1));
        assert!(!p.visible_to(None, false, now));
        assert!(!p.visible_to(Some(Uuid::new_v4()), false, now));
        assert!(p.visible_to(Some(p.owner_id), false, now));

        p.expires_at = Some(now + Duration::minutes(1));
        assert!(p.visible_to(None, false, now));
    }
}
