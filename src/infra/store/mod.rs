//! Persistence seams.
//!
//! Every service talks to a `Store` handle passed in through `AppState`. The
//! Postgres implementation is used in production; the in-memory one backs the
//! test suite and local runs without a database.

use std::collections::HashSet;

use anyhow::Result;
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

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Which posts a feed query draws from before the visibility predicate applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSource {
    All,
    Owner(Uuid),
    /// Posts the viewer saved, ordered by save time.
    Saved,
}

#[derive(Debug, Clone, Copy)]
pub struct FeedQuery {
    pub viewer_id: Option<Uuid>,
    pub now: OffsetDateTime,
    pub source: FeedSource,
}

#[derive(Debug, Clone)]
pub struct ListingFilter<S> {
    pub status: Option<S>,
    pub category: Option<String>,
}

/// Result of applying a confirmed payment to a fundraiser.
#[derive(Debug, Clone)]
pub enum PaymentApplied {
    Applied(Fundraiser),
    Duplicate,
    MissingFundraiser,
    /// The running total would leave the `i64` range; nothing was written.
    Overflow,
}

/// Result of writing one ledger record.
#[derive(Debug, Clone)]
pub enum InteractionInsert {
    Recorded(InteractionRecord),
    /// The key is already present.
    Duplicate,
    /// The target row is gone or was never there.
    MissingTarget,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns `None` when the id or handle is already taken.
    async fn insert_user(&self, user: NewUser) -> Result<Option<User>>;
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>>;
    async fn update_user(&self, user_id: Uuid, changes: UserChanges) -> Result<Option<User>>;
    /// Deletes the user row, every interaction by or on the user, and the
    /// user's listings. Returns the listings' media URLs, or `None` when the user
    /// did not exist.
    async fn delete_user(&self, user_id: Uuid) -> Result<Option<Vec<String>>>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn insert_post(&self, post: NewPost) -> Result<Post>;
    async fn get_post(&self, post_id: Uuid) -> Result<Option<Post>>;
    async fn update_post(&self, post_id: Uuid, changes: PostChanges) -> Result<Option<Post>>;
    /// Deletes the post, its comments, and every interaction targeting either.
    async fn delete_post(&self, post_id: Uuid) -> Result<Option<Post>>;
    /// One page of visible posts plus the size of the whole visible set. Both
    /// halves must use the same predicate.
    async fn list_visible_posts(
        &self,
        query: FeedQuery,
        page: PageRequest,
    ) -> Result<(Vec<Post>, i64)>;
    async fn count_posts_by_owner(&self, owner_id: Uuid) -> Result<i64>;
    async fn list_post_ids_by_owner(&self, owner_id: Uuid) -> Result<Vec<Uuid>>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn insert_comment(&self, post_id: Uuid, user_id: Uuid, body: String) -> Result<Comment>;
    async fn get_comment(&self, comment_id: Uuid) -> Result<Option<Comment>>;
    async fn update_comment(&self, comment_id: Uuid, body: String) -> Result<Option<Comment>>;
    /// Deletes the comment and every interaction targeting it.
    async fn delete_comment(&self, comment_id: Uuid) -> Result<Option<Comment>>;
    async fn list_comments(&self, post_id: Uuid, page: PageRequest) -> Result<(Vec<Comment>, i64)>;
    async fn count_comments(&self, post_id: Uuid) -> Result<i64>;
    async fn list_comment_ids_by_user(&self, user_id: Uuid) -> Result<Vec<Uuid>>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Checks the target and writes the record in one step, so a record can
    /// never outlive a target deleted concurrently.
    async fn insert_interaction(&self, key: InteractionKey) -> Result<InteractionInsert>;
    async fn delete_interaction(&self, key: InteractionKey) -> Result<bool>;
    async fn interaction_exists(&self, key: InteractionKey) -> Result<bool>;
    /// Subset of `target_ids` the actor holds a record against.
    async fn interacted_targets(
        &self,
        actor_id: Uuid,
        kind: InteractionKind,
        target_type: TargetType,
        target_ids: &[Uuid],
    ) -> Result<HashSet<Uuid>>;
    async fn list_by_actor(
        &self,
        actor_id: Uuid,
        kind: InteractionKind,
        target_type: TargetType,
        page: PageRequest,
    ) -> Result<(Vec<InteractionRecord>, i64)>;
    async fn list_by_target(
        &self,
        kind: InteractionKind,
        target_type: TargetType,
        target_id: Uuid,
        page: PageRequest,
    ) -> Result<(Vec<InteractionRecord>, i64)>;
    async fn count_by_target(
        &self,
        kind: InteractionKind,
        target_type: TargetType,
        target_id: Uuid,
    ) -> Result<i64>;
    async fn count_by_actor(
        &self,
        actor_id: Uuid,
        kind: InteractionKind,
        target_type: TargetType,
    ) -> Result<i64>;
}

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically adds `delta`, clamping at zero. Returns the new value, or
    /// `None` when the target row no longer exists.
    async fn adjust_counter(
        &self,
        field: CounterField,
        target_id: Uuid,
        delta: i64,
    ) -> Result<Option<i64>>;
    async fn set_counter(&self, field: CounterField, target_id: Uuid, value: i64) -> Result<()>;
    /// Keyset scan over `(id, current value)` for every row carrying `field`.
    async fn scan_counters(
        &self,
        field: CounterField,
        after: Option<Uuid>,
        limit: i64,
    ) -> Result<Vec<(Uuid, i64)>>;
}

#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn insert_pet(&self, pet: NewPet) -> Result<Pet>;
    async fn get_pet(&self, pet_id: Uuid) -> Result<Option<Pet>>;
    async fn update_pet(&self, pet_id: Uuid, changes: PetChanges) -> Result<Option<Pet>>;
    async fn delete_pet(&self, pet_id: Uuid) -> Result<Option<Pet>>;
    async fn list_pets(
        &self,
        filter: ListingFilter<PetStatus>,
        page: PageRequest,
    ) -> Result<(Vec<Pet>, i64)>;
    /// `lost -> found`; `None` when the pet is missing or not lost.
    async fn mark_pet_found(&self, pet_id: Uuid, finder_id: Uuid) -> Result<Option<Pet>>;

    async fn insert_donation(&self, donation: NewDonation) -> Result<Donation>;
    async fn get_donation(&self, donation_id: Uuid) -> Result<Option<Donation>>;
    async fn update_donation(
        &self,
        donation_id: Uuid,
        changes: DonationChanges,
    ) -> Result<Option<Donation>>;
    async fn delete_donation(&self, donation_id: Uuid) -> Result<Option<Donation>>;
    async fn list_donations(
        &self,
        filter: ListingFilter<DonationStatus>,
        page: PageRequest,
    ) -> Result<(Vec<Donation>, i64)>;
    /// `available -> reserved`; `None` when missing or not available.
    async fn reserve_donation(&self, donation_id: Uuid, user_id: Uuid) -> Result<Option<Donation>>;

    async fn insert_fundraiser(&self, fundraiser: NewFundraiser) -> Result<Fundraiser>;
    async fn get_fundraiser(&self, fundraiser_id: Uuid) -> Result<Option<Fundraiser>>;
    async fn update_fundraiser(
        &self,
        fundraiser_id: Uuid,
        changes: FundraiserChanges,
    ) -> Result<Option<Fundraiser>>;
    async fn delete_fundraiser(&self, fundraiser_id: Uuid) -> Result<Option<Fundraiser>>;
    async fn list_fundraisers(
        &self,
        filter: ListingFilter<FundraiserStatus>,
        page: PageRequest,
    ) -> Result<(Vec<Fundraiser>, i64)>;
    /// Appends the donation, raises `current_amount`, and completes an active
    /// campaign that reaches its target, all in one step.
    async fn apply_payment(
        &self,
        fundraiser_id: Uuid,
        donation: FundraiserDonation,
    ) -> Result<PaymentApplied>;
}

#[async_trait]
pub trait Store:
    UserStore + PostStore + CommentStore + LedgerStore + CounterStore + ListingStore
{
    async fn ping(&self) -> Result<()>;
}
