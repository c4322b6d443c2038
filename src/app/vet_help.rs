use std::sync::Arc;

use uuid::Uuid;

use crate::app::authz::ensure_owner;
use crate::app::error::{CoreError, CoreResult};
use crate::app::media::MediaService;
use crate::app::pets::required;
use crate::domain::page::{PageRequest, Paged};
use crate::domain::vet_help::{
    Fundraiser, FundraiserChanges, FundraiserStatus, NewFundraiser,
};
use crate::infra::store::{ListingFilter, ListingStore, Store, UserStore};

#[derive(Debug, Clone)]
pub struct CreateFundraiser {
    pub pet_name: String,
    pub title: String,
    pub description: Option<String>,
    pub image_urls: Vec<String>,
    pub target_amount: i64,
}

#[derive(Clone)]
pub struct VetHelpService {
    store: Arc<dyn Store>,
    media: MediaService,
}

impl VetHelpService {
    pub fn new(store: Arc<dyn Store>, media: MediaService) -> Self {
        Self { store, media }
    }

    pub async fn create_fundraiser(
        &self,
        owner_id: Uuid,
        input: CreateFundraiser,
    ) -> CoreResult<Fundraiser> {
        if self.store.get_user(owner_id).await?.is_none() {
            return Err(CoreError::forbidden("create a profile before starting a fundraiser"));
        }
        if input.target_amount <= 0 {
            return Err(CoreError::invalid("target_amount must be positive"));
        }
        let pet_name = required(input.pet_name, "pet_name")?;
        let title = required(input.title, "title")?;

        let fundraiser = self
            .store
            .insert_fundraiser(NewFundraiser {
                owner_id,
                pet_name,
                title,
                description: input.description,
                image_urls: input.image_urls,
                target_amount: input.target_amount,
            })
            .await?;
        tracing::info!(
            fundraiser_id = %fundraiser.id,
            target_amount = fundraiser.target_amount,
            "fundraiser created"
        );
        Ok(fundraiser)
    }

    pub async fn get_fundraiser(&self, fundraiser_id: Uuid) -> CoreResult<Fundraiser> {
        self.store
            .get_fundraiser(fundraiser_id)
            .await?
            .ok_or_else(|| CoreError::not_found("fundraiser not found"))
    }

    pub async fn list_fundraisers(
        &self,
        status: Option<FundraiserStatus>,
        page: PageRequest,
    ) -> CoreResult<Paged<Fundraiser>> {
        let filter = ListingFilter {
            status,
            category: None,
        };
        let (fundraisers, total) = self.store.list_fundraisers(filter, page).await?;
        Ok(Paged::new(fundraisers, page, total))
    }

    /// Owner edits to the description. Amounts and status only move through
    /// confirmed payments.
    pub async fn update_fundraiser(
        &self,
        caller_id: Uuid,
        fundraiser_id: Uuid,
        mut changes: FundraiserChanges,
    ) -> CoreResult<Fundraiser> {
        let existing = self.get_fundraiser(fundraiser_id).await?;
        ensure_owner(&existing, caller_id, "edit this fundraiser")?;
        if let Some(pet_name) = changes.pet_name.take() {
            changes.pet_name = Some(required(pet_name, "pet_name")?);
        }
        if let Some(title) = changes.title.take() {
            changes.title = Some(required(title, "title")?);
        }

        let updated = self
            .store
            .update_fundraiser(fundraiser_id, changes)
            .await?
            .ok_or_else(|| CoreError::not_found("fundraiser not found"))?;
        self.media
            .discard_replaced(&existing.image_urls, &updated.image_urls)
            .await;
        Ok(updated)
    }

    pub async fn delete_fundraiser(&self, caller_id: Uuid, fundraiser_id: Uuid) -> CoreResult<()> {
        let existing = self.get_fundraiser(fundraiser_id).await?;
        ensure_owner(&existing, caller_id, "delete this fundraiser")?;

        let deleted = self
            .store
            .delete_fundraiser(fundraiser_id)
            .await?
            .ok_or_else(|| CoreError::not_found("fundraiser not found"))?;
        self.media.discard(&deleted.image_urls).await;
        Ok(())
    }
}
