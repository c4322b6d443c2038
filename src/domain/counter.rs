use uuid::Uuid;

/// A denormalized counter stored on an entity row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterField {
    PostLikes,
    PostComments,
    CommentLikes,
}

impl CounterField {
    pub const ALL: [CounterField; 3] = [
        CounterField::PostLikes,
        CounterField::PostComments,
        CounterField::CommentLikes,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::PostLikes => "posts.likes_count",
            Self::PostComments => "posts.comments_count",
            Self::CommentLikes => "comments.likes_count",
        }
    }
}

/// A signed adjustment to one counter on one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterDelta {
    pub field: CounterField,
    pub target_id: Uuid,
    pub delta: i64,
}
