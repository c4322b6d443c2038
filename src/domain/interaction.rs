use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Like,
    Save,
    Follow,
    CommentLike,
}

impl InteractionKind {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "like" => Some(Self::Like),
            "save" => Some(Self::Save),
            "follow" => Some(Self::Follow),
            "comment_like" => Some(Self::CommentLike),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Save => "save",
            Self::Follow => "follow",
            Self::CommentLike => "comment_like",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Post,
    Comment,
    User,
}

impl TargetType {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "post" => Some(Self::Post),
            "comment" => Some(Self::Comment),
            "user" => Some(Self::User),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
            Self::User => "user",
        }
    }
}

/// The unique slot an actor may occupy at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InteractionKey {
    pub actor_id: Uuid,
    pub kind: InteractionKind,
    pub target_id: Uuid,
    pub target_type: TargetType,
}

impl InteractionKey {
    pub fn new(
        actor_id: Uuid,
        kind: InteractionKind,
        target_id: Uuid,
        target_type: TargetType,
    ) -> Self {
        Self {
            actor_id,
            kind,
            target_id,
            target_type,
        }
    }

    /// Returns the key with `comment_like` folded into `like` on a comment, or
    /// `None` when the kind cannot point at the target type.
    pub fn normalized(self) -> Option<Self> {
        let kind = match (self.kind, self.target_type) {
            (InteractionKind::Like, TargetType::Post) => InteractionKind::Like,
            (InteractionKind::Like, TargetType::Comment) => InteractionKind::Like,
            (InteractionKind::CommentLike, TargetType::Comment) => InteractionKind::Like,
            (InteractionKind::Save, TargetType::Post) => InteractionKind::Save,
            (InteractionKind::Follow, TargetType::User) => InteractionKind::Follow,
            _ => return None,
        };
        Some(Self { kind, ..self })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub seq: i64,
    pub actor_id: Uuid,
    pub kind: InteractionKind,
    pub target_id: Uuid,
    pub target_type: TargetType,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl InteractionRecord {
    pub fn key(&self) -> InteractionKey {
        InteractionKey::new(self.actor_id, self.kind, self.target_id, self.target_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_like_folds_into_like() {
        let key = InteractionKey::new(
            Uuid::new_v4(),
            InteractionKind::CommentLike,
            Uuid::new_v4(),
            TargetType::Comment,
        );
        let normalized = key.normalized().unwrap();
        assert_eq!(normalized.kind, InteractionKind::Like);
        assert_eq!(normalized.target_id, key.target_id);
    }

    #[test]
    fn mismatched_pairs_are_rejected() {
        let actor = Uuid::new_v4();
        let target = Uuid::new_v4();
        for (kind, target_type) in [
            (InteractionKind::Follow, TargetType::Post),
            (InteractionKind::Save, TargetType::Comment),
            (InteractionKind::Like, TargetType::User),
            (InteractionKind::CommentLike, TargetType::Post),
        ] {
            let key = InteractionKey::new(actor, kind, target, target_type);
            assert!(key.normalized().is_none(), "{:?} on {:?}", kind, target_type);
        }
    }
}
