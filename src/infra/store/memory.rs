use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::counter::CounterField;
use crate::domain::donation::{Donation, DonationChanges, DonationStatus, NewDonation};
use crate::domain::engagement::Comment;
use crate::domain::interaction::{InteractionKey, InteractionKind, InteractionRecord, TargetType};
use crate::domain::page::PageRequest;
use crate::domain::pet::{NewPet, Pet, PetChanges, PetStatus};
use crate::domain::post::{NewPost, Post, PostChanges};
use crate::domain::user::{NewUser, User, UserChanges};
use crate::domain::vet_help::{
    Fundraiser, FundraiserChanges, FundraiserDonation, FundraiserStatus, NewFundraiser,
};
use crate::infra::store::{
    CommentStore, CounterStore, FeedQuery, FeedSource, InteractionInsert, LedgerStore,
    ListingFilter, ListingStore, PaymentApplied, PostStore, Store, UserStore,
};

#[derive(Default)]
struct MemoryState {
    seq: i64,
    users: HashMap<Uuid, User>,
    posts: HashMap<Uuid, Post>,
    comments: HashMap<Uuid, Comment>,
    interactions: HashMap<InteractionKey, InteractionRecord>,
    pets: HashMap<Uuid, Pet>,
    donations: HashMap<Uuid, Donation>,
    fundraisers: HashMap<Uuid, Fundraiser>,
}

impl MemoryState {
    fn next_seq(&mut self) -> i64 {
        self.seq += 1;
        self.seq
    }

    fn followed_by(&self, actor_id: Uuid) -> HashSet<Uuid> {
        self.interactions
            .keys()
            .filter(|key| {
                key.actor_id == actor_id
                    && key.kind == InteractionKind::Follow
                    && key.target_type == TargetType::User
            })
            .map(|key| key.target_id)
            .collect()
    }

    fn target_exists(&self, target_type: TargetType, target_id: Uuid) -> bool {
        match target_type {
            TargetType::Post => self.posts.contains_key(&target_id),
            TargetType::Comment => self.comments.contains_key(&target_id),
            TargetType::User => self.users.contains_key(&target_id),
        }
    }

    fn drop_interactions_targeting(&mut self, target_type: TargetType, target_id: Uuid) {
        self.interactions
            .retain(|key, _| !(key.target_type == target_type && key.target_id == target_id));
    }

    fn drop_post(&mut self, post_id: Uuid) -> Option<Post> {
        let post = self.posts.remove(&post_id)?;
        let comment_ids: Vec<Uuid> = self
            .comments
            .values()
            .filter(|comment| comment.post_id == post_id)
            .map(|comment| comment.id)
            .collect();
        for comment_id in comment_ids {
            self.comments.remove(&comment_id);
            self.drop_interactions_targeting(TargetType::Comment, comment_id);
        }
        self.drop_interactions_targeting(TargetType::Post, post_id);
        Some(post)
    }
}

/// Process-local store guarded by a single mutex. Every method runs as one
/// critical section, which makes counter adjustments atomic.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (OffsetDateTime, i64)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

fn paginate<T>(items: Vec<T>, page: PageRequest) -> (Vec<T>, i64) {
    let total = items.len() as i64;
    let items = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect();
    (items, total)
}

fn category_matches(category: &str, wanted: &Option<String>) -> bool {
    match wanted {
        Some(wanted) => category.eq_ignore_ascii_case(wanted),
        None => true,
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<Option<User>> {
        let mut state = self.lock()?;
        let taken = state.users.contains_key(&user.id)
            || state
                .users
                .values()
                .any(|existing| existing.handle.eq_ignore_ascii_case(&user.handle));
        if taken {
            return Ok(None);
        }

        let created = User {
            id: user.id,
            handle: user.handle,
            display_name: user.display_name,
            bio: user.bio,
            avatar_url: user.avatar_url,
            created_at: OffsetDateTime::now_utc(),
        };
        state.users.insert(created.id, created.clone());
        Ok(Some(created))
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(self.lock()?.users.get(&user_id).cloned())
    }

    async fn update_user(&self, user_id: Uuid, changes: UserChanges) -> Result<Option<User>> {
        let mut state = self.lock()?;
        let Some(user) = state.users.get_mut(&user_id) else {
            return Ok(None);
        };
        if let Some(display_name) = changes.display_name {
            user.display_name = display_name;
        }
        if let Some(bio) = changes.bio {
            user.bio = Some(bio);
        }
        if let Some(avatar_url) = changes.avatar_url {
            user.avatar_url = Some(avatar_url);
        }
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, user_id: Uuid) -> Result<Option<Vec<String>>> {
        let mut state = self.lock()?;
        if state.users.remove(&user_id).is_none() {
            return Ok(None);
        }

        let post_ids: Vec<Uuid> = state
            .posts
            .values()
            .filter(|post| post.owner_id == user_id)
            .map(|post| post.id)
            .collect();
        for post_id in post_ids {
            state.drop_post(post_id);
        }
        let comment_ids: Vec<Uuid> = state
            .comments
            .values()
            .filter(|comment| comment.user_id == user_id)
            .map(|comment| comment.id)
            .collect();
        for comment_id in comment_ids {
            state.comments.remove(&comment_id);
            state.drop_interactions_targeting(TargetType::Comment, comment_id);
        }
        state.interactions.retain(|key, _| {
            key.actor_id != user_id
                && !(key.target_type == TargetType::User && key.target_id == user_id)
        });

        let mut media_urls = Vec::new();
        state.pets.retain(|_, pet| {
            if pet.owner_id == user_id {
                media_urls.extend(pet.image_urls.drain(..));
                return false;
            }
            true
        });
        state.donations.retain(|_, donation| {
            if donation.owner_id == user_id {
                media_urls.extend(donation.image_urls.drain(..));
                return false;
            }
            true
        });
        state.fundraisers.retain(|_, fundraiser| {
            if fundraiser.owner_id == user_id {
                media_urls.extend(fundraiser.image_urls.drain(..));
                return false;
            }
            true
        });

        Ok(Some(media_urls))
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn insert_post(&self, post: NewPost) -> Result<Post> {
        let mut state = self.lock()?;
        let now = OffsetDateTime::now_utc();
        let created = Post {
            id: Uuid::new_v4(),
            seq: state.next_seq(),
            owner_id: post.owner_id,
            caption: post.caption,
            media_urls: post.media_urls,
            visibility: post.visibility,
            is_story: post.is_story,
            expires_at: post.expires_at,
            likes_count: 0,
            comments_count: 0,
            created_at: now,
            updated_at: now,
        };
        state.posts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        Ok(self.lock()?.posts.get(&post_id).cloned())
    }

    async fn update_post(&self, post_id: Uuid, changes: PostChanges) -> Result<Option<Post>> {
        let mut state = self.lock()?;
        let Some(post) = state.posts.get_mut(&post_id) else {
            return Ok(None);
        };
        if let Some(caption) = changes.caption {
            post.caption = caption;
        }
        if let Some(media_urls) = changes.media_urls {
            post.media_urls = media_urls;
        }
        if let Some(visibility) = changes.visibility {
            post.visibility = visibility;
        }
        post.updated_at = OffsetDateTime::now_utc();
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        Ok(self.lock()?.drop_post(post_id))
    }

    async fn list_visible_posts(
        &self,
        query: FeedQuery,
        page: PageRequest,
    ) -> Result<(Vec<Post>, i64)> {
        let state = self.lock()?;
        let follows = query
            .viewer_id
            .map(|viewer_id| state.followed_by(viewer_id))
            .unwrap_or_default();
        let visible = |post: &Post| {
            post.visible_to(query.viewer_id, follows.contains(&post.owner_id), query.now)
        };

        let posts = match query.source {
            FeedSource::All | FeedSource::Owner(_) => {
                let mut posts: Vec<Post> = state
                    .posts
                    .values()
                    .filter(|post| match query.source {
                        FeedSource::Owner(owner_id) => post.owner_id == owner_id,
                        _ => true,
                    })
                    .filter(|post| visible(post))
                    .cloned()
                    .collect();
                newest_first(&mut posts, |post| (post.created_at, post.seq));
                posts
            }
            FeedSource::Saved => {
                let Some(viewer_id) = query.viewer_id else {
                    return Ok((Vec::new(), 0));
                };
                let mut saves: Vec<&InteractionRecord> = state
                    .interactions
                    .values()
                    .filter(|record| {
                        record.actor_id == viewer_id
                            && record.kind == InteractionKind::Save
                            && record.target_type == TargetType::Post
                    })
                    .collect();
                newest_first(&mut saves, |record| (record.created_at, record.seq));
                saves
                    .into_iter()
                    .filter_map(|record| state.posts.get(&record.target_id))
                    .filter(|post| visible(post))
                    .cloned()
                    .collect()
            }
        };

        Ok(paginate(posts, page))
    }

    async fn count_posts_by_owner(&self, owner_id: Uuid) -> Result<i64> {
        let state = self.lock()?;
        Ok(state
            .posts
            .values()
            .filter(|post| post.owner_id == owner_id)
            .count() as i64)
    }

    async fn list_post_ids_by_owner(&self, owner_id: Uuid) -> Result<Vec<Uuid>> {
        let state = self.lock()?;
        Ok(state
            .posts
            .values()
            .filter(|post| post.owner_id == owner_id)
            .map(|post| post.id)
            .collect())
    }
}

#[async_trait]
impl CommentStore for MemoryStore {
    async fn insert_comment(&self, post_id: Uuid, user_id: Uuid, body: String) -> Result<Comment> {
        let mut state = self.lock()?;
        let now = OffsetDateTime::now_utc();
        let comment = Comment {
            id: Uuid::new_v4(),
            seq: state.next_seq(),
            post_id,
            user_id,
            body,
            likes_count: 0,
            created_at: now,
            updated_at: now,
        };
        state.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn get_comment(&self, comment_id: Uuid) -> Result<Option<Comment>> {
        Ok(self.lock()?.comments.get(&comment_id).cloned())
    }

    async fn update_comment(&self, comment_id: Uuid, body: String) -> Result<Option<Comment>> {
        let mut state = self.lock()?;
        let Some(comment) = state.comments.get_mut(&comment_id) else {
            return Ok(None);
        };
        comment.body = body;
        comment.updated_at = OffsetDateTime::now_utc();
        Ok(Some(comment.clone()))
    }

    async fn delete_comment(&self, comment_id: Uuid) -> Result<Option<Comment>> {
        let mut state = self.lock()?;
        let comment = state.comments.remove(&comment_id);
        if comment.is_some() {
            state.drop_interactions_targeting(TargetType::Comment, comment_id);
        }
        Ok(comment)
    }

    async fn list_comments(&self, post_id: Uuid, page: PageRequest) -> Result<(Vec<Comment>, i64)> {
        let state = self.lock()?;
        let mut comments: Vec<Comment> = state
            .comments
            .values()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect();
        newest_first(&mut comments, |comment| (comment.created_at, comment.seq));
        Ok(paginate(comments, page))
    }

    async fn count_comments(&self, post_id: Uuid) -> Result<i64> {
        let state = self.lock()?;
        Ok(state
            .comments
            .values()
            .filter(|comment| comment.post_id == post_id)
            .count() as i64)
    }

    async fn list_comment_ids_by_user(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let state = self.lock()?;
        Ok(state
            .comments
            .values()
            .filter(|comment| comment.user_id == user_id)
            .map(|comment| comment.id)
            .collect())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn insert_interaction(&self, key: InteractionKey) -> Result<InteractionInsert> {
        let mut state = self.lock()?;
        if !state.target_exists(key.target_type, key.target_id) {
            return Ok(InteractionInsert::MissingTarget);
        }
        if state.interactions.contains_key(&key) {
            return Ok(InteractionInsert::Duplicate);
        }
        let record = InteractionRecord {
            id: Uuid::new_v4(),
            seq: state.next_seq(),
            actor_id: key.actor_id,
            kind: key.kind,
            target_id: key.target_id,
            target_type: key.target_type,
            created_at: OffsetDateTime::now_utc(),
        };
        state.interactions.insert(key, record.clone());
        Ok(InteractionInsert::Recorded(record))
    }

    async fn delete_interaction(&self, key: InteractionKey) -> Result<bool> {
        Ok(self.lock()?.interactions.remove(&key).is_some())
    }

    async fn interaction_exists(&self, key: InteractionKey) -> Result<bool> {
        Ok(self.lock()?.interactions.contains_key(&key))
    }

    async fn interacted_targets(
        &self,
        actor_id: Uuid,
        kind: InteractionKind,
        target_type: TargetType,
        target_ids: &[Uuid],
    ) -> Result<HashSet<Uuid>> {
        let state = self.lock()?;
        Ok(target_ids
            .iter()
            .copied()
            .filter(|target_id| {
                state.interactions.contains_key(&InteractionKey::new(
                    actor_id,
                    kind,
                    *target_id,
                    target_type,
                ))
            })
            .collect())
    }

    async fn list_by_actor(
        &self,
        actor_id: Uuid,
        kind: InteractionKind,
        target_type: TargetType,
        page: PageRequest,
    ) -> Result<(Vec<InteractionRecord>, i64)> {
        let state = self.lock()?;
        let mut records: Vec<InteractionRecord> = state
            .interactions
            .values()
            .filter(|record| {
                record.actor_id == actor_id
                    && record.kind == kind
                    && record.target_type == target_type
            })
            .cloned()
            .collect();
        newest_first(&mut records, |record| (record.created_at, record.seq));
        Ok(paginate(records, page))
    }

    async fn list_by_target(
        &self,
        kind: InteractionKind,
        target_type: TargetType,
        target_id: Uuid,
        page: PageRequest,
    ) -> Result<(Vec<InteractionRecord>, i64)> {
        let state = self.lock()?;
        let mut records: Vec<InteractionRecord> = state
            .interactions
            .values()
            .filter(|record| {
                record.target_id == target_id
                    && record.kind == kind
                    && record.target_type == target_type
            })
            .cloned()
            .collect();
        newest_first(&mut records, |record| (record.created_at, record.seq));
        Ok(paginate(records, page))
    }

    async fn count_by_target(
        &self,
        kind: InteractionKind,
        target_type: TargetType,
        target_id: Uuid,
    ) -> Result<i64> {
        let state = self.lock()?;
        Ok(state
            .interactions
            .keys()
            .filter(|key| {
                key.target_id == target_id && key.kind == kind && key.target_type == target_type
            })
            .count() as i64)
    }

    async fn count_by_actor(
        &self,
        actor_id: Uuid,
        kind: InteractionKind,
        target_type: TargetType,
    ) -> Result<i64> {
        let state = self.lock()?;
        Ok(state
            .interactions
            .keys()
            .filter(|key| {
                key.actor_id == actor_id && key.kind == kind && key.target_type == target_type
            })
            .count() as i64)
    }
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn adjust_counter(
        &self,
        field: CounterField,
        target_id: Uuid,
        delta: i64,
    ) -> Result<Option<i64>> {
        let mut state = self.lock()?;
        let slot = match field {
            CounterField::PostLikes => state.posts.get_mut(&target_id).map(|p| &mut p.likes_count),
            CounterField::PostComments => {
                state.posts.get_mut(&target_id).map(|p| &mut p.comments_count)
            }
            CounterField::CommentLikes => {
                state.comments.get_mut(&target_id).map(|c| &mut c.likes_count)
            }
        };
        Ok(slot.map(|value| {
            *value = (*value + delta).max(0);
            *value
        }))
    }

    async fn set_counter(&self, field: CounterField, target_id: Uuid, value: i64) -> Result<()> {
        let mut state = self.lock()?;
        match field {
            CounterField::PostLikes => {
                if let Some(post) = state.posts.get_mut(&target_id) {
                    post.likes_count = value;
                }
            }
            CounterField::PostComments => {
                if let Some(post) = state.posts.get_mut(&target_id) {
                    post.comments_count = value;
                }
            }
            CounterField::CommentLikes => {
                if let Some(comment) = state.comments.get_mut(&target_id) {
                    comment.likes_count = value;
                }
            }
        }
        Ok(())
    }

    async fn scan_counters(
        &self,
        field: CounterField,
        after: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<(Uuid, i64)>> {
        let state = self.lock()?;
        let mut rows: Vec<(Uuid, i64)> = match field {
            CounterField::PostLikes => state
                .posts
                .values()
                .map(|post| (post.id, post.likes_count))
                .collect(),
            CounterField::PostComments => state
                .posts
                .values()
                .map(|post| (post.id, post.comments_count))
                .collect(),
            CounterField::CommentLikes => state
                .comments
                .values()
                .map(|comment| (comment.id, comment.likes_count))
                .collect(),
        };
        rows.sort_by_key(|(id, _)| *id);
        Ok(rows
            .into_iter()
            .filter(|(id, _)| after.map_or(true, |after| *id > after))
            .take(limit.max(0) as usize)
            .collect())
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn insert_pet(&self, pet: NewPet) -> Result<Pet> {
        let mut state = self.lock()?;
        let now = OffsetDateTime::now_utc();
        let created = Pet {
            id: Uuid::new_v4(),
            seq: state.next_seq(),
            owner_id: pet.owner_id,
            name: pet.name,
            category: pet.category,
            description: pet.description,
            location: pet.location,
            status: pet.status,
            image_urls: pet.image_urls,
            found_by_id: None,
            created_at: now,
            updated_at: now,
        };
        state.pets.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_pet(&self, pet_id: Uuid) -> Result<Option<Pet>> {
        Ok(self.lock()?.pets.get(&pet_id).cloned())
    }

    async fn update_pet(&self, pet_id: Uuid, changes: PetChanges) -> Result<Option<Pet>> {
        let mut state = self.lock()?;
        let Some(pet) = state.pets.get_mut(&pet_id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            pet.name = name;
        }
        if let Some(category) = changes.category {
            pet.category = category;
        }
        if let Some(description) = changes.description {
            pet.description = Some(description);
        }
        if let Some(location) = changes.location {
            pet.location = Some(location);
        }
        if let Some(image_urls) = changes.image_urls {
            pet.image_urls = image_urls;
        }
        pet.updated_at = OffsetDateTime::now_utc();
        Ok(Some(pet.clone()))
    }

    async fn delete_pet(&self, pet_id: Uuid) -> Result<Option<Pet>> {
        Ok(self.lock()?.pets.remove(&pet_id))
    }

    async fn list_pets(
        &self,
        filter: ListingFilter<PetStatus>,
        page: PageRequest,
    ) -> Result<(Vec<Pet>, i64)> {
        let state = self.lock()?;
        let mut pets: Vec<Pet> = state
            .pets
            .values()
            .filter(|pet| filter.status.map_or(true, |status| pet.status == status))
            .filter(|pet| category_matches(&pet.category, &filter.category))
            .cloned()
            .collect();
        newest_first(&mut pets, |pet| (pet.created_at, pet.seq));
        Ok(paginate(pets, page))
    }

    async fn mark_pet_found(&self, pet_id: Uuid, finder_id: Uuid) -> Result<Option<Pet>> {
        let mut state = self.lock()?;
        let Some(pet) = state.pets.get_mut(&pet_id) else {
            return Ok(None);
        };
        if pet.status != PetStatus::Lost {
            return Ok(None);
        }
        pet.status = PetStatus::Found;
        pet.found_by_id = Some(finder_id);
        pet.updated_at = OffsetDateTime::now_utc();
        Ok(Some(pet.clone()))
    }

    async fn insert_donation(&self, donation: NewDonation) -> Result<Donation> {
        let mut state = self.lock()?;
        let now = OffsetDateTime::now_utc();
        let created = Donation {
            id: Uuid::new_v4(),
            seq: state.next_seq(),
            owner_id: donation.owner_id,
            title: donation.title,
            category: donation.category,
            description: donation.description,
            location: donation.location,
            status: DonationStatus::Available,
            image_urls: donation.image_urls,
            reserved_by_id: None,
            created_at: now,
            updated_at: now,
        };
        state.donations.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_donation(&self, donation_id: Uuid) -> Result<Option<Donation>> {
        Ok(self.lock()?.donations.get(&donation_id).cloned())
    }

    async fn update_donation(
        &self,
        donation_id: Uuid,
        changes: DonationChanges,
    ) -> Result<Option<Donation>> {
        let mut state = self.lock()?;
        let Some(donation) = state.donations.get_mut(&donation_id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            donation.title = title;
        }
        if let Some(category) = changes.category {
            donation.category = category;
        }
        if let Some(description) = changes.description {
            donation.description = Some(description);
        }
        if let Some(location) = changes.location {
            donation.location = Some(location);
        }
        if let Some(image_urls) = changes.image_urls {
            donation.image_urls = image_urls;
        }
        donation.updated_at = OffsetDateTime::now_utc();
        Ok(Some(donation.clone()))
    }

    async fn delete_donation(&self, donation_id: Uuid) -> Result<Option<Donation>> {
        Ok(self.lock()?.donations.remove(&donation_id))
    }

    async fn list_donations(
        &self,
        filter: ListingFilter<DonationStatus>,
        page: PageRequest,
    ) -> Result<(Vec<Donation>, i64)> {
        let state = self.lock()?;
        let mut donations: Vec<Donation> = state
            .donations
            .values()
            .filter(|donation| filter.status.map_or(true, |status| donation.status == status))
            .filter(|donation| category_matches(&donation.category, &filter.category))
            .cloned()
            .collect();
        newest_first(&mut donations, |donation| (donation.created_at, donation.seq));
        Ok(paginate(donations, page))
    }

    async fn reserve_donation(&self, donation_id: Uuid, user_id: Uuid) -> Result<Option<Donation>> {
        let mut state = self.lock()?;
        let Some(donation) = state.donations.get_mut(&donation_id) else {
            return Ok(None);
        };
        if donation.status != DonationStatus::Available {
            return Ok(None);
        }
        donation.status = DonationStatus::Reserved;
        donation.reserved_by_id = Some(user_id);
        donation.updated_at = OffsetDateTime::now_utc();
        Ok(Some(donation.clone()))
    }

    async fn insert_fundraiser(&self, fundraiser: NewFundraiser) -> Result<Fundraiser> {
        let mut state = self.lock()?;
        let now = OffsetDateTime::now_utc();
        let created = Fundraiser {
            id: Uuid::new_v4(),
            seq: state.next_seq(),
            owner_id: fundraiser.owner_id,
            pet_name: fundraiser.pet_name,
            title: fundraiser.title,
            description: fundraiser.description,
            image_urls: fundraiser.image_urls,
            target_amount: fundraiser.target_amount,
            current_amount: 0,
            status: FundraiserStatus::Active,
            donations: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        state.fundraisers.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_fundraiser(&self, fundraiser_id: Uuid) -> Result<Option<Fundraiser>> {
        Ok(self.lock()?.fundraisers.get(&fundraiser_id).cloned())
    }

    async fn update_fundraiser(
        &self,
        fundraiser_id: Uuid,
        changes: FundraiserChanges,
    ) -> Result<Option<Fundraiser>> {
        let mut state = self.lock()?;
        let Some(fundraiser) = state.fundraisers.get_mut(&fundraiser_id) else {
            return Ok(None);
        };
        if let Some(pet_name) = changes.pet_name {
            fundraiser.pet_name = pet_name;
        }
        if let Some(title) = changes.title {
            fundraiser.title = title;
        }
        if let Some(description) = changes.description {
            fundraiser.description = Some(description);
        }
        if let Some(image_urls) = changes.image_urls {
            fundraiser.image_urls = image_urls;
        }
        fundraiser.updated_at = OffsetDateTime::now_utc();
        Ok(Some(fundraiser.clone()))
    }

    async fn delete_fundraiser(&self, fundraiser_id: Uuid) -> Result<Option<Fundraiser>> {
        Ok(self.lock()?.fundraisers.remove(&fundraiser_id))
    }

    async fn list_fundraisers(
        &self,
        filter: ListingFilter<FundraiserStatus>,
        page: PageRequest,
    ) -> Result<(Vec<Fundraiser>, i64)> {
        let state = self.lock()?;
        let mut fundraisers: Vec<Fundraiser> = state
            .fundraisers
            .values()
            .filter(|fundraiser| {
                filter
                    .status
                    .map_or(true, |status| fundraiser.status == status)
            })
            .cloned()
            .collect();
        newest_first(&mut fundraisers, |fundraiser| {
            (fundraiser.created_at, fundraiser.seq)
        });
        Ok(paginate(fundraisers, page))
    }

    async fn apply_payment(
        &self,
        fundraiser_id: Uuid,
        donation: FundraiserDonation,
    ) -> Result<PaymentApplied> {
        let mut state = self.lock()?;
        let Some(fundraiser) = state.fundraisers.get_mut(&fundraiser_id) else {
            return Ok(PaymentApplied::MissingFundraiser);
        };
        if fundraiser
            .donations
            .iter()
            .any(|existing| existing.payment_ref == donation.payment_ref)
        {
            return Ok(PaymentApplied::Duplicate);
        }

        let Some(current_amount) = fundraiser.current_amount.checked_add(donation.amount) else {
            return Ok(PaymentApplied::Overflow);
        };
        fundraiser.current_amount = current_amount;
        fundraiser.status = fundraiser
            .status
            .after_payment(fundraiser.current_amount, fundraiser.target_amount);
        fundraiser.donations.push(donation);
        fundraiser.updated_at = OffsetDateTime::now_utc();
        Ok(PaymentApplied::Applied(fundraiser.clone()))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        self.lock().map(|_| ())
    }
}
