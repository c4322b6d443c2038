use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::comments::{CommentItem, CommentService};
use crate::app::counters::{CounterSynchronizer, ReconcileReport};
use crate::app::donations::{CreateDonation, DonationService};
use crate::app::error::CoreError;
use crate::app::feed::{FeedItem, FeedService};
use crate::app::media::UploadedMedia;
use crate::app::payments::PaymentService;
use crate::app::pets::{CreatePet, PetService};
use crate::app::posts::CreatePost;
use crate::app::social::{FollowEdge, RelationshipStatus, SocialService};
use crate::app::users::{CreateProfile, UserService};
use crate::app::vet_help::{CreateFundraiser, VetHelpService};
use crate::domain::donation::{Donation, DonationChanges, DonationStatus};
use crate::domain::engagement::Comment;
use crate::domain::interaction::InteractionRecord;
use crate::domain::page::{PageRequest, Paged, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::domain::pet::{Pet, PetChanges, PetStatus};
use crate::domain::post::{Post, PostChanges, PostVisibility};
use crate::domain::user::{PublicUser, User, UserChanges};
use crate::domain::vet_help::{DonationConfirmed, Fundraiser, FundraiserChanges, FundraiserStatus};
use crate::http::{AdminToken, AppError, AuthUser, MaybeAuthUser};
use crate::infra::store::{ListingFilter, Store};
use crate::AppState;

/// Maps a service error, logging the cause when the store or media host failed.
fn failed(action: &'static str) -> impl FnOnce(CoreError) -> AppError {
    move |err| {
        if let CoreError::Unavailable(cause) = &err {
            tracing::error!(error = ?cause, "failed to {}", action);
        }
        AppError::from(err)
    }
}

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

fn page_request(page: Option<u32>, limit: Option<u32>) -> Result<PageRequest, AppError> {
    let page = page.unwrap_or(1);
    if page == 0 {
        return Err(AppError::bad_request("page must be at least 1"));
    }
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(AppError::bad_request(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_LIMIT
        )));
    }
    Ok(PageRequest::new(page, limit))
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = match state.store.ping().await {
        Ok(()) => "ok",
        Err(err) => {
            tracing::warn!(error = ?err, "store ping failed");
            "degraded"
        }
    };

    Json(HealthResponse { status })
}

// Users

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub handle: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

pub async fn create_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let service = UserService::new(state.store.clone(), state.media_service());
    let user = service
        .create_profile(
            auth.user_id,
            CreateProfile {
                handle: payload.handle,
                display_name: payload.display_name,
                bio: payload.bio,
                avatar_url: payload.avatar_url,
            },
        )
        .await
        .map_err(failed("create user"))?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<PublicUser>, AppError> {
    let service = UserService::new(state.store.clone(), state.media_service());
    let user = service.get_profile(id).await.map_err(failed("fetch user"))?;
    Ok(Json(user))
}

#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

pub async fn update_profile(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<User>, AppError> {
    let service = UserService::new(state.store.clone(), state.media_service());
    let user = service
        .update_profile(
            auth.user_id,
            id,
            UserChanges {
                display_name: payload.display_name,
                bio: payload.bio,
                avatar_url: payload.avatar_url,
            },
        )
        .await
        .map_err(failed("update profile"))?;

    Ok(Json(user))
}

/// Delete the caller's account and everything it owns.
pub async fn delete_account(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = UserService::new(state.store.clone(), state.media_service());
    service
        .delete_account(auth.user_id)
        .await
        .map_err(failed("delete account"))?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_user_posts(
    Path(id): Path<Uuid>,
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paged<FeedItem>>, AppError> {
    let page = page_request(query.page, query.limit)?;
    let service = FeedService::new(state.store.clone());
    let posts = service
        .user_posts(auth.user_id(), id, page)
        .await
        .map_err(failed("list user posts"))?;

    Ok(Json(posts))
}

pub async fn follow_user(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<InteractionRecord>), AppError> {
    let service = SocialService::new(state.store.clone());
    let record = service
        .follow(auth.user_id, id)
        .await
        .map_err(failed("follow user"))?;

    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn unfollow_user(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = SocialService::new(state.store.clone());
    service
        .unfollow(auth.user_id, id)
        .await
        .map_err(failed("unfollow user"))?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_followers(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paged<FollowEdge>>, AppError> {
    let page = page_request(query.page, query.limit)?;
    let service = SocialService::new(state.store.clone());
    let followers = service
        .list_followers(id, page)
        .await
        .map_err(failed("list followers"))?;

    Ok(Json(followers))
}

pub async fn list_following(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paged<FollowEdge>>, AppError> {
    let page = page_request(query.page, query.limit)?;
    let service = SocialService::new(state.store.clone());
    let following = service
        .list_following(id, page)
        .await
        .map_err(failed("list following"))?;

    Ok(Json(following))
}

pub async fn relationship_status(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<RelationshipStatus>, AppError> {
    let service = SocialService::new(state.store.clone());
    let status = service
        .relationship_status(auth.user_id, id)
        .await
        .map_err(failed("fetch relationship status"))?;

    Ok(Json(status))
}

// Posts

#[derive(Deserialize)]
pub struct CreatePostRequest {
    pub caption: Option<String>,
    #[serde(default)]
    pub media_urls: Vec<String>,
    pub visibility: Option<PostVisibility>,
    #[serde(default)]
    pub is_story: bool,
}

pub async fn create_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let service = state.post_service();
    let post = service
        .create_post(
            auth.user_id,
            CreatePost {
                caption: payload.caption,
                media_urls: payload.media_urls,
                visibility: payload.visibility.unwrap_or(PostVisibility::Public),
                is_story: payload.is_story,
            },
        )
        .await
        .map_err(failed("create post"))?;

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_post(
    Path(id): Path<Uuid>,
    auth: MaybeAuthUser,
    State(state): State<AppState>,
) -> Result<Json<FeedItem>, AppError> {
    let service = FeedService::new(state.store.clone());
    let post = service
        .get_post(auth.user_id(), id)
        .await
        .map_err(failed("fetch post"))?;

    Ok(Json(post))
}

#[derive(Deserialize)]
pub struct UpdatePostRequest {
    pub caption: Option<String>,
    pub media_urls: Option<Vec<String>>,
    pub visibility: Option<PostVisibility>,
}

pub async fn update_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdatePostRequest>,
) -> Result<Json<Post>, AppError> {
    let service = state.post_service();
    let post = service
        .update_post(
            auth.user_id,
            id,
            PostChanges {
                caption: payload.caption.map(Some),
                media_urls: payload.media_urls,
                visibility: payload.visibility,
            },
        )
        .await
        .map_err(failed("update post"))?;

    Ok(Json(post))
}

pub async fn delete_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = state.post_service();
    service
        .delete_post(auth.user_id, id)
        .await
        .map_err(failed("delete post"))?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn like_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<InteractionRecord>), AppError> {
    let record = state
        .post_service()
        .like(auth.user_id, id)
        .await
        .map_err(failed("like post"))?;

    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn unlike_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state
        .post_service()
        .unlike(auth.user_id, id)
        .await
        .map_err(failed("unlike post"))?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn save_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<InteractionRecord>), AppError> {
    let record = state
        .post_service()
        .save(auth.user_id, id)
        .await
        .map_err(failed("save post"))?;

    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn unsave_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state
        .post_service()
        .unsave(auth.user_id, id)
        .await
        .map_err(failed("unsave post"))?;

    Ok(StatusCode::NO_CONTENT)
}

// Comments

#[derive(Deserialize)]
pub struct CommentRequest {
    pub body: String,
}

pub async fn create_comment(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CommentRequest>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let service = CommentService::new(state.store.clone());
    let comment = service
        .create_comment(auth.user_id, id, payload.body)
        .await
        .map_err(failed("comment on post"))?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn list_comments(
    Path(id): Path<Uuid>,
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paged<CommentItem>>, AppError> {
    let page = page_request(query.page, query.limit)?;
    let service = CommentService::new(state.store.clone());
    let comments = service
        .list_comments(auth.user_id(), id, page)
        .await
        .map_err(failed("list comments"))?;

    Ok(Json(comments))
}

pub async fn update_comment(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CommentRequest>,
) -> Result<Json<Comment>, AppError> {
    let service = CommentService::new(state.store.clone());
    let comment = service
        .update_comment(auth.user_id, id, payload.body)
        .await
        .map_err(failed("update comment"))?;

    Ok(Json(comment))
}

pub async fn delete_comment(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = CommentService::new(state.store.clone());
    service
        .delete_comment(auth.user_id, id)
        .await
        .map_err(failed("delete comment"))?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn like_comment(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<InteractionRecord>), AppError> {
    let service = CommentService::new(state.store.clone());
    let record = service
        .like(auth.user_id, id)
        .await
        .map_err(failed("like comment"))?;

    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn unlike_comment(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = CommentService::new(state.store.clone());
    service
        .unlike(auth.user_id, id)
        .await
        .map_err(failed("unlike comment"))?;

    Ok(StatusCode::NO_CONTENT)
}

// Feed

pub async fn home_feed(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paged<FeedItem>>, AppError> {
    let page = page_request(query.page, query.limit)?;
    let service = FeedService::new(state.store.clone());
    let feed = service
        .home_feed(auth.user_id(), page)
        .await
        .map_err(failed("fetch feed"))?;

    Ok(Json(feed))
}

pub async fn saved_posts(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paged<FeedItem>>, AppError> {
    let page = page_request(query.page, query.limit)?;
    let service = FeedService::new(state.store.clone());
    let saved = service
        .saved_posts(auth.user_id, page)
        .await
        .map_err(failed("list saved posts"))?;

    Ok(Json(saved))
}

// Media

pub async fn upload_media(
    auth: AuthUser,
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadedMedia>), AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::bad_request("Content-Type header is required"))?;

    let uploaded = state
        .media_service()
        .upload(auth.user_id, content_type, body)
        .await
        .map_err(failed("upload media"))?;

    Ok((StatusCode::CREATED, Json(uploaded)))
}

// Pets

#[derive(Deserialize)]
pub struct CreatePetRequest {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: Option<PetStatus>,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

#[derive(Deserialize)]
pub struct UpdatePetRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: Option<PetStatus>,
    pub image_urls: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct PetQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<PetStatus>,
    pub category: Option<String>,
}

pub async fn create_pet(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreatePetRequest>,
) -> Result<(StatusCode, Json<Pet>), AppError> {
    let service = PetService::new(state.store.clone(), state.media_service());
    let pet = service
        .create_pet(
            auth.user_id,
            CreatePet {
                name: payload.name,
                category: payload.category,
                description: payload.description,
                location: payload.location,
                status: payload.status.unwrap_or(PetStatus::Adoption),
                image_urls: payload.image_urls,
            },
        )
        .await
        .map_err(failed("create pet"))?;

    Ok((StatusCode::CREATED, Json(pet)))
}

pub async fn list_pets(
    State(state): State<AppState>,
    Query(query): Query<PetQuery>,
) -> Result<Json<Paged<Pet>>, AppError> {
    let page = page_request(query.page, query.limit)?;
    let filter = ListingFilter {
        status: query.status,
        category: query.category,
    };
    let service = PetService::new(state.store.clone(), state.media_service());
    let pets = service
        .list_pets(filter, page)
        .await
        .map_err(failed("list pets"))?;

    Ok(Json(pets))
}

pub async fn get_pet(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Pet>, AppError> {
    let service = PetService::new(state.store.clone(), state.media_service());
    let pet = service.get_pet(id).await.map_err(failed("fetch pet"))?;
    Ok(Json(pet))
}

pub async fn update_pet(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdatePetRequest>,
) -> Result<Json<Pet>, AppError> {
    let service = PetService::new(state.store.clone(), state.media_service());
    let pet = service
        .update_pet(
            auth.user_id,
            id,
            PetChanges {
                name: payload.name,
                category: payload.category,
                description: payload.description,
                location: payload.location,
                image_urls: payload.image_urls,
            },
            payload.status,
        )
        .await
        .map_err(failed("update pet"))?;

    Ok(Json(pet))
}

pub async fn delete_pet(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = PetService::new(state.store.clone(), state.media_service());
    service
        .delete_pet(auth.user_id, id)
        .await
        .map_err(failed("delete pet"))?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_pet_found(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Pet>, AppError> {
    let service = PetService::new(state.store.clone(), state.media_service());
    let pet = service
        .mark_found(auth.user_id, id)
        .await
        .map_err(failed("mark pet found"))?;

    Ok(Json(pet))
}

// Donations

#[derive(Deserialize)]
pub struct CreateDonationRequest {
    pub title: String,
    pub category: String,
    pub description: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

#[derive(Deserialize)]
pub struct UpdateDonationRequest {
    pub title: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: Option<DonationStatus>,
    pub image_urls: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct DonationQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<DonationStatus>,
    pub category: Option<String>,
}

pub async fn create_donation(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateDonationRequest>,
) -> Result<(StatusCode, Json<Donation>), AppError> {
    let service = DonationService::new(state.store.clone(), state.media_service());
    let donation = service
        .create_donation(
            auth.user_id,
            CreateDonation {
                title: payload.title,
                category: payload.category,
                description: payload.description,
                location: payload.location,
                image_urls: payload.image_urls,
            },
        )
        .await
        .map_err(failed("create donation"))?;

    Ok((StatusCode::CREATED, Json(donation)))
}

pub async fn list_donations(
    State(state): State<AppState>,
    Query(query): Query<DonationQuery>,
) -> Result<Json<Paged<Donation>>, AppError> {
    let page = page_request(query.page, query.limit)?;
    let filter = ListingFilter {
        status: query.status,
        category: query.category,
    };
    let service = DonationService::new(state.store.clone(), state.media_service());
    let donations = service
        .list_donations(filter, page)
        .await
        .map_err(failed("list donations"))?;

    Ok(Json(donations))
}

pub async fn get_donation(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Donation>, AppError> {
    let service = DonationService::new(state.store.clone(), state.media_service());
    let donation = service
        .get_donation(id)
        .await
        .map_err(failed("fetch donation"))?;
    Ok(Json(donation))
}

pub async fn update_donation(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateDonationRequest>,
) -> Result<Json<Donation>, AppError> {
    let service = DonationService::new(state.store.clone(), state.media_service());
    let donation = service
        .update_donation(
            auth.user_id,
            id,
            DonationChanges {
                title: payload.title,
                category: payload.category,
                description: payload.description,
                location: payload.location,
                image_urls: payload.image_urls,
            },
            payload.status,
        )
        .await
        .map_err(failed("update donation"))?;

    Ok(Json(donation))
}

pub async fn delete_donation(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = DonationService::new(state.store.clone(), state.media_service());
    service
        .delete_donation(auth.user_id, id)
        .await
        .map_err(failed("delete donation"))?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn reserve_donation(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Donation>, AppError> {
    let service = DonationService::new(state.store.clone(), state.media_service());
    let donation = service
        .reserve(auth.user_id, id)
        .await
        .map_err(failed("reserve donation"))?;

    Ok(Json(donation))
}

// Vet help

#[derive(Deserialize)]
pub struct CreateFundraiserRequest {
    pub pet_name: String,
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    pub target_amount: i64,
}

#[derive(Deserialize)]
pub struct UpdateFundraiserRequest {
    pub pet_name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_urls: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct FundraiserQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<FundraiserStatus>,
}

pub async fn create_fundraiser(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateFundraiserRequest>,
) -> Result<(StatusCode, Json<Fundraiser>), AppError> {
    let service = VetHelpService::new(state.store.clone(), state.media_service());
    let fundraiser = service
        .create_fundraiser(
            auth.user_id,
            CreateFundraiser {
                pet_name: payload.pet_name,
                title: payload.title,
                description: payload.description,
                image_urls: payload.image_urls,
                target_amount: payload.target_amount,
            },
        )
        .await
        .map_err(failed("create fundraiser"))?;

    Ok((StatusCode::CREATED, Json(fundraiser)))
}

pub async fn list_fundraisers(
    State(state): State<AppState>,
    Query(query): Query<FundraiserQuery>,
) -> Result<Json<Paged<Fundraiser>>, AppError> {
    let page = page_request(query.page, query.limit)?;
    let service = VetHelpService::new(state.store.clone(), state.media_service());
    let fundraisers = service
        .list_fundraisers(query.status, page)
        .await
        .map_err(failed("list fundraisers"))?;

    Ok(Json(fundraisers))
}

pub async fn get_fundraiser(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Fundraiser>, AppError> {
    let service = VetHelpService::new(state.store.clone(), state.media_service());
    let fundraiser = service
        .get_fundraiser(id)
        .await
        .map_err(failed("fetch fundraiser"))?;
    Ok(Json(fundraiser))
}

pub async fn update_fundraiser(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<UpdateFundraiserRequest>,
) -> Result<Json<Fundraiser>, AppError> {
    let service = VetHelpService::new(state.store.clone(), state.media_service());
    let fundraiser = service
        .update_fundraiser(
            auth.user_id,
            id,
            FundraiserChanges {
                pet_name: payload.pet_name,
                title: payload.title,
                description: payload.description,
                image_urls: payload.image_urls,
            },
        )
        .await
        .map_err(failed("update fundraiser"))?;

    Ok(Json(fundraiser))
}

pub async fn delete_fundraiser(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = VetHelpService::new(state.store.clone(), state.media_service());
    service
        .delete_fundraiser(auth.user_id, id)
        .await
        .map_err(failed("delete fundraiser"))?;

    Ok(StatusCode::NO_CONTENT)
}

// Admin

pub async fn confirm_payment(
    _admin: AdminToken,
    State(state): State<AppState>,
    Json(payload): Json<DonationConfirmed>,
) -> Result<Json<Fundraiser>, AppError> {
    let service = PaymentService::new(state.store.clone());
    let fundraiser = service
        .apply_confirmed(payload)
        .await
        .map_err(failed("apply payment"))?;

    Ok(Json(fundraiser))
}

pub async fn reconcile_counters(
    _admin: AdminToken,
    State(state): State<AppState>,
) -> Result<Json<ReconcileReport>, AppError> {
    let synchronizer = CounterSynchronizer::new(state.store.clone());
    let report = synchronizer
        .reconcile()
        .await
        .map_err(failed("reconcile counters"))?;

    Ok(Json(report))
}
