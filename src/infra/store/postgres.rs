use std::collections::{HashMap, HashSet};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::counter::CounterField;
use crate::domain::donation::{Donation, DonationChanges, DonationStatus, NewDonation};
use crate::domain::engagement::Comment;
use crate::domain::interaction::{InteractionKey, InteractionKind, InteractionRecord, TargetType};
use crate::domain::page::PageRequest;
use crate::domain::pet::{NewPet, Pet, PetChanges, PetStatus};
use crate::domain::post::{NewPost, Post, PostChanges, PostVisibility};
use crate::domain::user::{NewUser, User, UserChanges};
use crate::domain::vet_help::{
    Fundraiser, FundraiserChanges, FundraiserDonation, FundraiserStatus, NewFundraiser,
};
use crate::infra::db::Db;
use crate::infra::store::{
    CommentStore, CounterStore, FeedQuery, FeedSource, InteractionInsert, LedgerStore,
    ListingFilter, ListingStore, PaymentApplied, PostStore, Store, UserStore,
};

const USER_COLUMNS: &str = "u.id, u.handle, u.display_name, u.bio, u.avatar_url, u.created_at";

const POST_COLUMNS: &str = "p.id, p.seq, p.owner_id, p.caption, p.media_urls, p.visibility, \
     p.is_story, p.expires_at, p.likes_count, p.comments_count, p.created_at, p.updated_at";

const COMMENT_COLUMNS: &str =
    "c.id, c.seq, c.post_id, c.user_id, c.body, c.likes_count, c.created_at, c.updated_at";

const INTERACTION_COLUMNS: &str =
    "i.id, i.seq, i.actor_id, i.kind, i.target_id, i.target_type, i.created_at";

const PET_COLUMNS: &str = "id, seq, owner_id, name, category, description, location, status, \
     image_urls, found_by_id, created_at, updated_at";

const DONATION_COLUMNS: &str = "id, seq, owner_id, title, category, description, location, \
     status, image_urls, reserved_by_id, created_at, updated_at";

const FUNDRAISER_COLUMNS: &str = "id, seq, owner_id, pet_name, title, description, image_urls, \
     target_amount, current_amount, status, created_at, updated_at";

/// Post visibility predicate; `$1` is the viewer (nullable), `$2` is now.
/// Mirrors `Post::visible_to`. The feed page and its total both embed this
/// fragment so they always count the same set.
const VISIBLE_POST: &str = "((p.visibility = 'public' \
       AND (NOT p.is_story OR p.expires_at IS NULL OR p.expires_at > $2)) \
     OR p.owner_id = $1 \
     OR (p.visibility = 'followers' AND EXISTS ( \
         SELECT 1 FROM interactions f \
         WHERE f.actor_id = $1 AND f.kind = 'follow' \
           AND f.target_type = 'user' AND f.target_id = p.owner_id)))";

/// Shared filter for listing tables; `$1` status, `$2` category.
const LISTING_FILTER: &str =
    "($1::text IS NULL OR status = $1) AND ($2::text IS NULL OR lower(category) = lower($2))";

#[derive(Clone)]
pub struct PgStore {
    db: Db,
}

impl PgStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    async fn load_donations(
        &self,
        fundraiser_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<FundraiserDonation>>> {
        let rows = sqlx::query(
            "SELECT fundraiser_id, user_id, amount, payment_ref, created_at \
             FROM fundraiser_donations \
             WHERE fundraiser_id = ANY($1) \
             ORDER BY id ASC",
        )
        .bind(fundraiser_ids.to_vec())
        .fetch_all(self.db.pool())
        .await?;

        let mut grouped: HashMap<Uuid, Vec<FundraiserDonation>> = HashMap::new();
        for row in rows {
            let fundraiser_id: Uuid = row.try_get("fundraiser_id")?;
            grouped
                .entry(fundraiser_id)
                .or_default()
                .push(FundraiserDonation {
                    user_id: row.try_get("user_id")?,
                    amount: row.try_get("amount")?,
                    payment_ref: row.try_get("payment_ref")?,
                    created_at: row.try_get("created_at")?,
                });
        }
        Ok(grouped)
    }

    async fn with_donations(&self, mut fundraisers: Vec<Fundraiser>) -> Result<Vec<Fundraiser>> {
        if fundraisers.is_empty() {
            return Ok(fundraisers);
        }
        let ids: Vec<Uuid> = fundraisers.iter().map(|fundraiser| fundraiser.id).collect();
        let mut donations = self.load_donations(&ids).await?;
        for fundraiser in &mut fundraisers {
            fundraiser.donations = donations.remove(&fundraiser.id).unwrap_or_default();
        }
        Ok(fundraisers)
    }
}

fn counter_column(field: CounterField) -> (&'static str, &'static str) {
    match field {
        CounterField::PostLikes => ("posts", "likes_count"),
        CounterField::PostComments => ("posts", "comments_count"),
        CounterField::CommentLikes => ("comments", "likes_count"),
    }
}

fn target_table(target_type: TargetType) -> &'static str {
    match target_type {
        TargetType::Post => "posts",
        TargetType::Comment => "comments",
        TargetType::User => "users",
    }
}

fn row_to_user(row: &PgRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        handle: row.try_get("handle")?,
        display_name: row.try_get("display_name")?,
        bio: row.try_get("bio")?,
        avatar_url: row.try_get("avatar_url")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_post(row: &PgRow) -> Result<Post> {
    let visibility: String = row.try_get("visibility")?;
    let visibility = PostVisibility::from_db(&visibility)
        .ok_or_else(|| anyhow!("unknown post visibility: {}", visibility))?;
    Ok(Post {
        id: row.try_get("id")?,
        seq: row.try_get("seq")?,
        owner_id: row.try_get("owner_id")?,
        caption: row.try_get("caption")?,
        media_urls: row.try_get("media_urls")?,
        visibility,
        is_story: row.try_get("is_story")?,
        expires_at: row.try_get("expires_at")?,
        likes_count: row.try_get("likes_count")?,
        comments_count: row.try_get("comments_count")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_comment(row: &PgRow) -> Result<Comment> {
    Ok(Comment {
        id: row.try_get("id")?,
        seq: row.try_get("seq")?,
        post_id: row.try_get("post_id")?,
        user_id: row.try_get("user_id")?,
        body: row.try_get("body")?,
        likes_count: row.try_get("likes_count")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_interaction(row: &PgRow) -> Result<InteractionRecord> {
    let kind: String = row.try_get("kind")?;
    let kind = InteractionKind::from_db(&kind)
        .ok_or_else(|| anyhow!("unknown interaction kind: {}", kind))?;
    let target_type: String = row.try_get("target_type")?;
    let target_type = TargetType::from_db(&target_type)
        .ok_or_else(|| anyhow!("unknown target type: {}", target_type))?;
    Ok(InteractionRecord {
        id: row.try_get("id")?,
        seq: row.try_get("seq")?,
        actor_id: row.try_get("actor_id")?,
        kind,
        target_id: row.try_get("target_id")?,
        target_type,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_pet(row: &PgRow) -> Result<Pet> {
    let status: String = row.try_get("status")?;
    let status =
        PetStatus::from_db(&status).ok_or_else(|| anyhow!("unknown pet status: {}", status))?;
    Ok(Pet {
        id: row.try_get("id")?,
        seq: row.try_get("seq")?,
        owner_id: row.try_get("owner_id")?,
        name: row.try_get("name")?,
        category: row.try_get("category")?,
        description: row.try_get("description")?,
        location: row.try_get("location")?,
        status,
        image_urls: row.try_get("image_urls")?,
        found_by_id: row.try_get("found_by_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_donation(row: &PgRow) -> Result<Donation> {
    let status: String = row.try_get("status")?;
    let status = DonationStatus::from_db(&status)
        .ok_or_else(|| anyhow!("unknown donation status: {}", status))?;
    Ok(Donation {
        id: row.try_get("id")?,
        seq: row.try_get("seq")?,
        owner_id: row.try_get("owner_id")?,
        title: row.try_get("title")?,
        category: row.try_get("category")?,
        description: row.try_get("description")?,
        location: row.try_get("location")?,
        status,
        image_urls: row.try_get("image_urls")?,
        reserved_by_id: row.try_get("reserved_by_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_fundraiser(row: &PgRow) -> Result<Fundraiser> {
    let status: String = row.try_get("status")?;
    let status = FundraiserStatus::from_db(&status)
        .ok_or_else(|| anyhow!("unknown fundraiser status: {}", status))?;
    Ok(Fundraiser {
        id: row.try_get("id")?,
        seq: row.try_get("seq")?,
        owner_id: row.try_get("owner_id")?,
        pet_name: row.try_get("pet_name")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        image_urls: row.try_get("image_urls")?,
        target_amount: row.try_get("target_amount")?,
        current_amount: row.try_get("current_amount")?,
        status,
        donations: Vec::new(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn collect<T>(rows: Vec<PgRow>, map: fn(&PgRow) -> Result<T>) -> Result<Vec<T>> {
    rows.iter().map(map).collect()
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: NewUser) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "INSERT INTO users AS u (id, handle, display_name, bio, avatar_url) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT DO NOTHING \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(user.handle)
        .bind(user.display_name)
        .bind(user.bio)
        .bind(user.avatar_url)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1"))
            .bind(user_id)
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn update_user(&self, user_id: Uuid, changes: UserChanges) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "UPDATE users AS u \
             SET display_name = COALESCE($2, u.display_name), \
                 bio = COALESCE($3, u.bio), \
                 avatar_url = COALESCE($4, u.avatar_url) \
             WHERE u.id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(changes.display_name)
        .bind(changes.bio)
        .bind(changes.avatar_url)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<Option<Vec<String>>> {
        let mut tx = self.db.pool().begin().await?;

        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM users WHERE id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        // ledger inserts take a key-share lock on their target, so these wait
        sqlx::query("SELECT id FROM posts WHERE owner_id = $1 FOR UPDATE")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "SELECT id FROM comments \
             WHERE user_id = $1 \
                OR post_id IN (SELECT id FROM posts WHERE owner_id = $1) \
             FOR UPDATE",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM interactions \
             WHERE target_type = 'comment' AND target_id IN ( \
                 SELECT id FROM comments \
                 WHERE user_id = $1 \
                    OR post_id IN (SELECT id FROM posts WHERE owner_id = $1))",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM interactions \
             WHERE (target_type = 'post' AND target_id IN (SELECT id FROM posts WHERE owner_id = $1)) \
                OR (target_type = 'user' AND target_id = $1) \
                OR actor_id = $1",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let mut media_urls = Vec::new();
        for table in ["pets", "donations", "fundraisers"] {
            let urls: Vec<Vec<String>> = sqlx::query_scalar(&format!(
                "DELETE FROM {table} WHERE owner_id = $1 RETURNING image_urls"
            ))
            .bind(user_id)
            .fetch_all(&mut *tx)
            .await?;
            media_urls.extend(urls.into_iter().flatten());
        }

        // posts and comments go with the user row through ON DELETE CASCADE
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(media_urls))
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn insert_post(&self, post: NewPost) -> Result<Post> {
        let row = sqlx::query(&format!(
            "INSERT INTO posts AS p (owner_id, caption, media_urls, visibility, is_story, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(post.owner_id)
        .bind(post.caption)
        .bind(post.media_urls)
        .bind(post.visibility.as_db())
        .bind(post.is_story)
        .bind(post.expires_at)
        .fetch_one(self.db.pool())
        .await?;

        row_to_post(&row)
    }

    async fn get_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        let row = sqlx::query(&format!("SELECT {POST_COLUMNS} FROM posts p WHERE p.id = $1"))
            .bind(post_id)
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(row_to_post).transpose()
    }

    async fn update_post(&self, post_id: Uuid, changes: PostChanges) -> Result<Option<Post>> {
        let set_caption = changes.caption.is_some();
        let row = sqlx::query(&format!(
            "UPDATE posts AS p \
             SET caption = CASE WHEN $5 THEN $2 ELSE p.caption END, \
                 media_urls = COALESCE($3, p.media_urls), \
                 visibility = COALESCE($4, p.visibility), \
                 updated_at = now() \
             WHERE p.id = $1 \
             RETURNING {POST_COLUMNS}"
        ))
        .bind(post_id)
        .bind(changes.caption.flatten())
        .bind(changes.media_urls)
        .bind(changes.visibility.map(|visibility| visibility.as_db()))
        .bind(set_caption)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(row_to_post).transpose()
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        let mut tx = self.db.pool().begin().await?;

        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM posts WHERE id = $1 FOR UPDATE")
                .bind(post_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }
        sqlx::query("SELECT id FROM comments WHERE post_id = $1 FOR UPDATE")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "DELETE FROM interactions \
             WHERE target_type = 'comment' \
               AND target_id IN (SELECT id FROM comments WHERE post_id = $1)",
        )
        .bind(post_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM interactions WHERE target_type = 'post' AND target_id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM comments WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query(&format!(
            "DELETE FROM posts AS p WHERE p.id = $1 RETURNING {POST_COLUMNS}"
        ))
        .bind(post_id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        row.as_ref().map(row_to_post).transpose()
    }

    async fn list_visible_posts(
        &self,
        query: FeedQuery,
        page: PageRequest,
    ) -> Result<(Vec<Post>, i64)> {
        let (from, scope, order, next_param) = match query.source {
            FeedSource::All => ("posts p", "", "p.created_at DESC, p.seq DESC", 3),
            FeedSource::Owner(_) => (
                "posts p",
                " AND p.owner_id = $3",
                "p.created_at DESC, p.seq DESC",
                4,
            ),
            FeedSource::Saved => {
                if query.viewer_id.is_none() {
                    return Ok((Vec::new(), 0));
                }
                (
                    "interactions s JOIN posts p ON p.id = s.target_id",
                    " AND s.actor_id = $1 AND s.kind = 'save' AND s.target_type = 'post'",
                    "s.created_at DESC, s.seq DESC",
                    3,
                )
            }
        };

        let count_sql = format!("SELECT COUNT(*) FROM {from} WHERE {VISIBLE_POST}{scope}");
        let page_sql = format!(
            "SELECT {POST_COLUMNS} FROM {from} WHERE {VISIBLE_POST}{scope} \
             ORDER BY {order} LIMIT ${} OFFSET ${}",
            next_param,
            next_param + 1
        );

        let mut count = sqlx::query_scalar::<_, i64>(&count_sql)
            .bind(query.viewer_id)
            .bind(query.now);
        let mut rows = sqlx::query(&page_sql).bind(query.viewer_id).bind(query.now);
        if let FeedSource::Owner(owner_id) = query.source {
            count = count.bind(owner_id);
            rows = rows.bind(owner_id);
        }

        let total = count.fetch_one(self.db.pool()).await?;
        let rows = rows
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.db.pool())
            .await?;

        Ok((collect(rows, row_to_post)?, total))
    }

    async fn count_posts_by_owner(&self, owner_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    async fn list_post_ids_by_owner(&self, owner_id: Uuid) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar("SELECT id FROM posts WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_all(self.db.pool())
            .await?;
        Ok(ids)
    }
}

#[async_trait]
impl CommentStore for PgStore {
    async fn insert_comment(&self, post_id: Uuid, user_id: Uuid, body: String) -> Result<Comment> {
        let row = sqlx::query(&format!(
            "INSERT INTO comments AS c (post_id, user_id, body) VALUES ($1, $2, $3) \
             RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(post_id)
        .bind(user_id)
        .bind(body)
        .fetch_one(self.db.pool())
        .await?;

        row_to_comment(&row)
    }

    async fn get_comment(&self, comment_id: Uuid) -> Result<Option<Comment>> {
        let row = sqlx::query(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c WHERE c.id = $1"
        ))
        .bind(comment_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(row_to_comment).transpose()
    }

    async fn update_comment(&self, comment_id: Uuid, body: String) -> Result<Option<Comment>> {
        let row = sqlx::query(&format!(
            "UPDATE comments AS c SET body = $2, updated_at = now() \
             WHERE c.id = $1 \
             RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(comment_id)
        .bind(body)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(row_to_comment).transpose()
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<Option<Comment>> {
        let mut tx = self.db.pool().begin().await?;

        let locked: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM comments WHERE id = $1 FOR UPDATE")
                .bind(comment_id)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        sqlx::query("DELETE FROM interactions WHERE target_type = 'comment' AND target_id = $1")
            .bind(comment_id)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query(&format!(
            "DELETE FROM comments AS c WHERE c.id = $1 RETURNING {COMMENT_COLUMNS}"
        ))
        .bind(comment_id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        row.as_ref().map(row_to_comment).transpose()
    }

    async fn list_comments(&self, post_id: Uuid, page: PageRequest) -> Result<(Vec<Comment>, i64)> {
        let total = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(self.db.pool())
            .await?;

        let rows = sqlx::query(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments c \
             WHERE c.post_id = $1 \
             ORDER BY c.created_at DESC, c.seq DESC \
             LIMIT $2 OFFSET $3"
        ))
        .bind(post_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.db.pool())
        .await?;

        Ok((collect(rows, row_to_comment)?, total))
    }

    async fn count_comments(&self, post_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    async fn list_comment_ids_by_user(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar("SELECT id FROM comments WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(self.db.pool())
            .await?;
        Ok(ids)
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn insert_interaction(&self, key: InteractionKey) -> Result<InteractionInsert> {
        let table = target_table(key.target_type);
        // the key-share lock holds off a concurrent delete of the target until
        // this insert commits; the delete then removes the new row with the rest
        let row = sqlx::query(&format!(
            "WITH target AS (SELECT id FROM {table} WHERE id = $3 FOR KEY SHARE) \
             INSERT INTO interactions AS i (actor_id, kind, target_id, target_type) \
             SELECT $1::uuid, $2::text, target.id, $4::text FROM target \
             ON CONFLICT ON CONSTRAINT interactions_unique_key DO NOTHING \
             RETURNING {INTERACTION_COLUMNS}"
        ))
        .bind(key.actor_id)
        .bind(key.kind.as_db())
        .bind(key.target_id)
        .bind(key.target_type.as_db())
        .fetch_optional(self.db.pool())
        .await?;

        if let Some(row) = row {
            return Ok(InteractionInsert::Recorded(row_to_interaction(&row)?));
        }

        let target_exists: bool =
            sqlx::query_scalar(&format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE id = $1)"))
                .bind(key.target_id)
                .fetch_one(self.db.pool())
                .await?;
        Ok(if target_exists {
            InteractionInsert::Duplicate
        } else {
            InteractionInsert::MissingTarget
        })
    }

    async fn delete_interaction(&self, key: InteractionKey) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM interactions \
             WHERE actor_id = $1 AND kind = $2 AND target_id = $3 AND target_type = $4",
        )
        .bind(key.actor_id)
        .bind(key.kind.as_db())
        .bind(key.target_id)
        .bind(key.target_type.as_db())
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn interaction_exists(&self, key: InteractionKey) -> Result<bool> {
        let exists = sqlx::query_scalar(
            "SELECT EXISTS ( \
                 SELECT 1 FROM interactions \
                 WHERE actor_id = $1 AND kind = $2 AND target_id = $3 AND target_type = $4)",
        )
        .bind(key.actor_id)
        .bind(key.kind.as_db())
        .bind(key.target_id)
        .bind(key.target_type.as_db())
        .fetch_one(self.db.pool())
        .await?;
        Ok(exists)
    }

    async fn interacted_targets(
        &self,
        actor_id: Uuid,
        kind: InteractionKind,
        target_type: TargetType,
        target_ids: &[Uuid],
    ) -> Result<HashSet<Uuid>> {
        if target_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT target_id FROM interactions \
             WHERE actor_id = $1 AND kind = $2 AND target_type = $3 AND target_id = ANY($4)",
        )
        .bind(actor_id)
        .bind(kind.as_db())
        .bind(target_type.as_db())
        .bind(target_ids.to_vec())
        .fetch_all(self.db.pool())
        .await?;
        Ok(ids.into_iter().collect())
    }

    async fn list_by_actor(
        &self,
        actor_id: Uuid,
        kind: InteractionKind,
        target_type: TargetType,
        page: PageRequest,
    ) -> Result<(Vec<InteractionRecord>, i64)> {
        let total = self.count_by_actor(actor_id, kind, target_type).await?;
        let rows = sqlx::query(&format!(
            "SELECT {INTERACTION_COLUMNS} FROM interactions i \
             WHERE i.actor_id = $1 AND i.kind = $2 AND i.target_type = $3 \
             ORDER BY i.created_at DESC, i.seq DESC \
             LIMIT $4 OFFSET $5"
        ))
        .bind(actor_id)
        .bind(kind.as_db())
        .bind(target_type.as_db())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.db.pool())
        .await?;

        Ok((collect(rows, row_to_interaction)?, total))
    }

    async fn list_by_target(
        &self,
        kind: InteractionKind,
        target_type: TargetType,
        target_id: Uuid,
        page: PageRequest,
    ) -> Result<(Vec<InteractionRecord>, i64)> {
        let total = self.count_by_target(kind, target_type, target_id).await?;
        let rows = sqlx::query(&format!(
            "SELECT {INTERACTION_COLUMNS} FROM interactions i \
             WHERE i.target_id = $1 AND i.kind = $2 AND i.target_type = $3 \
             ORDER BY i.created_at DESC, i.seq DESC \
             LIMIT $4 OFFSET $5"
        ))
        .bind(target_id)
        .bind(kind.as_db())
        .bind(target_type.as_db())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.db.pool())
        .await?;

        Ok((collect(rows, row_to_interaction)?, total))
    }

    async fn count_by_target(
        &self,
        kind: InteractionKind,
        target_type: TargetType,
        target_id: Uuid,
    ) -> Result<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM interactions \
             WHERE target_id = $1 AND kind = $2 AND target_type = $3",
        )
        .bind(target_id)
        .bind(kind.as_db())
        .bind(target_type.as_db())
        .fetch_one(self.db.pool())
        .await?;
        Ok(count)
    }

    async fn count_by_actor(
        &self,
        actor_id: Uuid,
        kind: InteractionKind,
        target_type: TargetType,
    ) -> Result<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM interactions \
             WHERE actor_id = $1 AND kind = $2 AND target_type = $3",
        )
        .bind(actor_id)
        .bind(kind.as_db())
        .bind(target_type.as_db())
        .fetch_one(self.db.pool())
        .await?;
        Ok(count)
    }
}

#[async_trait]
impl CounterStore for PgStore {
    async fn adjust_counter(
        &self,
        field: CounterField,
        target_id: Uuid,
        delta: i64,
    ) -> Result<Option<i64>> {
        let (table, column) = counter_column(field);
        let value = sqlx::query_scalar(&format!(
            "UPDATE {table} SET {column} = GREATEST({column} + $2, 0) \
             WHERE id = $1 \
             RETURNING {column}"
        ))
        .bind(target_id)
        .bind(delta)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(value)
    }

    async fn set_counter(&self, field: CounterField, target_id: Uuid, value: i64) -> Result<()> {
        let (table, column) = counter_column(field);
        sqlx::query(&format!("UPDATE {table} SET {column} = $2 WHERE id = $1"))
            .bind(target_id)
            .bind(value.max(0))
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    async fn scan_counters(
        &self,
        field: CounterField,
        after: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<(Uuid, i64)>> {
        let (table, column) = counter_column(field);
        let rows = sqlx::query_as::<_, (Uuid, i64)>(&format!(
            "SELECT id, {column} FROM {table} \
             WHERE ($1::uuid IS NULL OR id > $1) \
             ORDER BY id \
             LIMIT $2"
        ))
        .bind(after)
        .bind(limit)
        .fetch_all(self.db.pool())
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl ListingStore for PgStore {
    async fn insert_pet(&self, pet: NewPet) -> Result<Pet> {
        let row = sqlx::query(&format!(
            "INSERT INTO pets (owner_id, name, category, description, location, status, image_urls) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {PET_COLUMNS}"
        ))
        .bind(pet.owner_id)
        .bind(pet.name)
        .bind(pet.category)
        .bind(pet.description)
        .bind(pet.location)
        .bind(pet.status.as_db())
        .bind(pet.image_urls)
        .fetch_one(self.db.pool())
        .await?;

        row_to_pet(&row)
    }

    async fn get_pet(&self, pet_id: Uuid) -> Result<Option<Pet>> {
        let row = sqlx::query(&format!("SELECT {PET_COLUMNS} FROM pets WHERE id = $1"))
            .bind(pet_id)
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(row_to_pet).transpose()
    }

    async fn update_pet(&self, pet_id: Uuid, changes: PetChanges) -> Result<Option<Pet>> {
        let row = sqlx::query(&format!(
            "UPDATE pets \
             SET name = COALESCE($2, name), \
                 category = COALESCE($3, category), \
                 description = COALESCE($4, description), \
                 location = COALESCE($5, location), \
                 image_urls = COALESCE($6, image_urls), \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING {PET_COLUMNS}"
        ))
        .bind(pet_id)
        .bind(changes.name)
        .bind(changes.category)
        .bind(changes.description)
        .bind(changes.location)
        .bind(changes.image_urls)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(row_to_pet).transpose()
    }

    async fn delete_pet(&self, pet_id: Uuid) -> Result<Option<Pet>> {
        let row = sqlx::query(&format!(
            "DELETE FROM pets WHERE id = $1 RETURNING {PET_COLUMNS}"
        ))
        .bind(pet_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(row_to_pet).transpose()
    }

    async fn list_pets(
        &self,
        filter: ListingFilter<PetStatus>,
        page: PageRequest,
    ) -> Result<(Vec<Pet>, i64)> {
        let status = filter.status.map(|status| status.as_db());
        let total = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM pets WHERE {LISTING_FILTER}"
        ))
        .bind(status)
        .bind(filter.category.as_deref())
        .fetch_one(self.db.pool())
        .await?;

        let rows = sqlx::query(&format!(
            "SELECT {PET_COLUMNS} FROM pets WHERE {LISTING_FILTER} \
             ORDER BY created_at DESC, seq DESC \
             LIMIT $3 OFFSET $4"
        ))
        .bind(status)
        .bind(filter.category.as_deref())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.db.pool())
        .await?;

        Ok((collect(rows, row_to_pet)?, total))
    }

    async fn mark_pet_found(&self, pet_id: Uuid, finder_id: Uuid) -> Result<Option<Pet>> {
        let row = sqlx::query(&format!(
            "UPDATE pets \
             SET status = 'found', found_by_id = $2, updated_at = now() \
             WHERE id = $1 AND status = 'lost' \
             RETURNING {PET_COLUMNS}"
        ))
        .bind(pet_id)
        .bind(finder_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(row_to_pet).transpose()
    }

    async fn insert_donation(&self, donation: NewDonation) -> Result<Donation> {
        let row = sqlx::query(&format!(
            "INSERT INTO donations (owner_id, title, category, description, location, image_urls) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {DONATION_COLUMNS}"
        ))
        .bind(donation.owner_id)
        .bind(donation.title)
        .bind(donation.category)
        .bind(donation.description)
        .bind(donation.location)
        .bind(donation.image_urls)
        .fetch_one(self.db.pool())
        .await?;

        row_to_donation(&row)
    }

    async fn get_donation(&self, donation_id: Uuid) -> Result<Option<Donation>> {
        let row = sqlx::query(&format!(
            "SELECT {DONATION_COLUMNS} FROM donations WHERE id = $1"
        ))
        .bind(donation_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(row_to_donation).transpose()
    }

    async fn update_donation(
        &self,
        donation_id: Uuid,
        changes: DonationChanges,
    ) -> Result<Option<Donation>> {
        let row = sqlx::query(&format!(
            "UPDATE donations \
             SET title = COALESCE($2, title), \
                 category = COALESCE($3, category), \
                 description = COALESCE($4, description), \
                 location = COALESCE($5, location), \
                 image_urls = COALESCE($6, image_urls), \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING {DONATION_COLUMNS}"
        ))
        .bind(donation_id)
        .bind(changes.title)
        .bind(changes.category)
        .bind(changes.description)
        .bind(changes.location)
        .bind(changes.image_urls)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(row_to_donation).transpose()
    }

    async fn delete_donation(&self, donation_id: Uuid) -> Result<Option<Donation>> {
        let row = sqlx::query(&format!(
            "DELETE FROM donations WHERE id = $1 RETURNING {DONATION_COLUMNS}"
        ))
        .bind(donation_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(row_to_donation).transpose()
    }

    async fn list_donations(
        &self,
        filter: ListingFilter<DonationStatus>,
        page: PageRequest,
    ) -> Result<(Vec<Donation>, i64)> {
        let status = filter.status.map(|status| status.as_db());
        let total = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM donations WHERE {LISTING_FILTER}"
        ))
        .bind(status)
        .bind(filter.category.as_deref())
        .fetch_one(self.db.pool())
        .await?;

        let rows = sqlx::query(&format!(
            "SELECT {DONATION_COLUMNS} FROM donations WHERE {LISTING_FILTER} \
             ORDER BY created_at DESC, seq DESC \
             LIMIT $3 OFFSET $4"
        ))
        .bind(status)
        .bind(filter.category.as_deref())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.db.pool())
        .await?;

        Ok((collect(rows, row_to_donation)?, total))
    }

    async fn reserve_donation(&self, donation_id: Uuid, user_id: Uuid) -> Result<Option<Donation>> {
        let row = sqlx::query(&format!(
            "UPDATE donations \
             SET status = 'reserved', reserved_by_id = $2, updated_at = now() \
             WHERE id = $1 AND status = 'available' \
             RETURNING {DONATION_COLUMNS}"
        ))
        .bind(donation_id)
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(row_to_donation).transpose()
    }

    async fn insert_fundraiser(&self, fundraiser: NewFundraiser) -> Result<Fundraiser> {
        let row = sqlx::query(&format!(
            "INSERT INTO fundraisers (owner_id, pet_name, title, description, image_urls, target_amount) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {FUNDRAISER_COLUMNS}"
        ))
        .bind(fundraiser.owner_id)
        .bind(fundraiser.pet_name)
        .bind(fundraiser.title)
        .bind(fundraiser.description)
        .bind(fundraiser.image_urls)
        .bind(fundraiser.target_amount)
        .fetch_one(self.db.pool())
        .await?;

        row_to_fundraiser(&row)
    }

    async fn get_fundraiser(&self, fundraiser_id: Uuid) -> Result<Option<Fundraiser>> {
        let row = sqlx::query(&format!(
            "SELECT {FUNDRAISER_COLUMNS} FROM fundraisers WHERE id = $1"
        ))
        .bind(fundraiser_id)
        .fetch_optional(self.db.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let fundraiser = row_to_fundraiser(&row)?;
        Ok(self.with_donations(vec![fundraiser]).await?.pop())
    }

    async fn update_fundraiser(
        &self,
        fundraiser_id: Uuid,
        changes: FundraiserChanges,
    ) -> Result<Option<Fundraiser>> {
        let row = sqlx::query(&format!(
            "UPDATE fundraisers \
             SET pet_name = COALESCE($2, pet_name), \
                 title = COALESCE($3, title), \
                 description = COALESCE($4, description), \
                 image_urls = COALESCE($5, image_urls), \
                 updated_at = now() \
             WHERE id = $1 \
             RETURNING {FUNDRAISER_COLUMNS}"
        ))
        .bind(fundraiser_id)
        .bind(changes.pet_name)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.image_urls)
        .fetch_optional(self.db.pool())
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let fundraiser = row_to_fundraiser(&row)?;
        Ok(self.with_donations(vec![fundraiser]).await?.pop())
    }

    async fn delete_fundraiser(&self, fundraiser_id: Uuid) -> Result<Option<Fundraiser>> {
        let row = sqlx::query(&format!(
            "DELETE FROM fundraisers WHERE id = $1 RETURNING {FUNDRAISER_COLUMNS}"
        ))
        .bind(fundraiser_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(row_to_fundraiser).transpose()
    }

    async fn list_fundraisers(
        &self,
        filter: ListingFilter<FundraiserStatus>,
        page: PageRequest,
    ) -> Result<(Vec<Fundraiser>, i64)> {
        let status = filter.status.map(|status| status.as_db());
        let total = sqlx::query_scalar(
            "SELECT COUNT(*) FROM fundraisers WHERE ($1::text IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(self.db.pool())
        .await?;

        let rows = sqlx::query(&format!(
            "SELECT {FUNDRAISER_COLUMNS} FROM fundraisers \
             WHERE ($1::text IS NULL OR status = $1) \
             ORDER BY created_at DESC, seq DESC \
             LIMIT $2 OFFSET $3"
        ))
        .bind(status)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.db.pool())
        .await?;

        let fundraisers = self.with_donations(collect(rows, row_to_fundraiser)?).await?;
        Ok((fundraisers, total))
    }

    async fn apply_payment(
        &self,
        fundraiser_id: Uuid,
        donation: FundraiserDonation,
    ) -> Result<PaymentApplied> {
        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query(
            "SELECT current_amount, target_amount, status \
             FROM fundraisers WHERE id = $1 FOR UPDATE",
        )
        .bind(fundraiser_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(PaymentApplied::MissingFundraiser);
        };
        let current_amount: i64 = row.try_get("current_amount")?;
        let target_amount: i64 = row.try_get("target_amount")?;
        let status: String = row.try_get("status")?;

        let inserted = sqlx::query(
            "INSERT INTO fundraiser_donations (fundraiser_id, user_id, amount, payment_ref, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT ON CONSTRAINT fundraiser_donations_payment_key DO NOTHING",
        )
        .bind(fundraiser_id)
        .bind(donation.user_id)
        .bind(donation.amount)
        .bind(&donation.payment_ref)
        .bind(donation.created_at)
        .execute(&mut *tx)
        .await?;
        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(PaymentApplied::Duplicate);
        }

        let Some(current_amount) = current_amount.checked_add(donation.amount) else {
            tx.rollback().await?;
            return Ok(PaymentApplied::Overflow);
        };
        let status = FundraiserStatus::from_db(&status)
            .ok_or_else(|| anyhow!("unknown fundraiser status: {}", status))?
            .after_payment(current_amount, target_amount);

        sqlx::query(
            "UPDATE fundraisers \
             SET current_amount = $2, status = $3, updated_at = now() \
             WHERE id = $1",
        )
        .bind(fundraiser_id)
        .bind(current_amount)
        .bind(status.as_db())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let fundraiser = self
            .get_fundraiser(fundraiser_id)
            .await?
            .ok_or_else(|| anyhow!("fundraiser vanished after payment"))?;
        Ok(PaymentApplied::Applied(fundraiser))
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<()> {
        self.db.ping().await
    }
}
