use std::sync::Arc;

use uuid::Uuid;

use crate::app::authz::ensure_owner;
use crate::app::error::{CoreError, CoreResult};
use crate::app::media::MediaService;
use crate::app::pets::required;
use crate::domain::donation::{Donation, DonationChanges, DonationStatus, NewDonation};
use crate::domain::page::{PageRequest, Paged};
use crate::infra::store::{ListingFilter, ListingStore, Store, UserStore};

#[derive(Debug, Clone)]
pub struct CreateDonation {
    pub title: String,
    pub category: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub image_urls: Vec<String>,
}

#[derive(Clone)]
pub struct DonationService {
    store: Arc<dyn Store>,
    media: MediaService,
}

impl DonationService {
    pub fn new(store: Arc<dyn Store>, media: MediaService) -> Self {
        Self { store, media }
    }

    pub async fn create_donation(
        &self,
        owner_id: Uuid,
        input: CreateDonation,
    ) -> CoreResult<Donation> {
        if self.store.get_user(owner_id).await?.is_none() {
            return Err(CoreError::forbidden("create a profile before offering an item"));
        }
        let title = required(input.title, "title")?;
        let category = required(input.category, "category")?;

        let donation = self
            .store
            .insert_donation(NewDonation {
                owner_id,
                title,
                category,
                description: input.description,
                location: input.location,
                image_urls: input.image_urls,
            })
            .await?;
        tracing::info!(donation_id = %donation.id, "donation listed");
        Ok(donation)
    }

    pub async fn get_donation(&self, donation_id: Uuid) -> CoreResult<Donation> {
        self.store
            .get_donation(donation_id)
            .await?
            .ok_or_else(|| CoreError::not_found("donation not found"))
    }

    pub async fn list_donations(
        &self,
        filter: ListingFilter<DonationStatus>,
        page: PageRequest,
    ) -> CoreResult<Paged<Donation>> {
        let (donations, total) = self.store.list_donations(filter, page).await?;
        Ok(Paged::new(donations, page, total))
    }

    pub async fn update_donation(
        &self,
        caller_id: Uuid,
        donation_id: Uuid,
        mut changes: DonationChanges,
        status: Option<DonationStatus>,
    ) -> CoreResult<Donation> {
        let existing = self.get_donation(donation_id).await?;
        ensure_owner(&existing, caller_id, "edit this donation")?;
        if status.is_some_and(|status| status != existing.status) {
            return Err(CoreError::invalid(
                "donation status only changes when someone reserves it",
            ));
        }
        if let Some(title) = changes.title.take() {
            changes.title = Some(required(title, "title")?);
        }
        if let Some(category) = changes.category.take() {
            changes.category = Some(required(category, "category")?);
        }

        let updated = self
            .store
            .update_donation(donation_id, changes)
            .await?
            .ok_or_else(|| CoreError::not_found("donation not found"))?;
        self.media
            .discard_replaced(&existing.image_urls, &updated.image_urls)
            .await;
        Ok(updated)
    }

    pub async fn delete_donation(&self, caller_id: Uuid, donation_id: Uuid) -> CoreResult<()> {
        let existing = self.get_donation(donation_id).await?;
        ensure_owner(&existing, caller_id, "delete this donation")?;

        let deleted = self
            .store
            .delete_donation(donation_id)
            .await?
            .ok_or_else(|| CoreError::not_found("donation not found"))?;
        self.media.discard(&deleted.image_urls).await;
        Ok(())
    }

    /// `available -> reserved` for someone other than the owner.
    pub async fn reserve(&self, caller_id: Uuid, donation_id: Uuid) -> CoreResult<Donation> {
        let existing = self.get_donation(donation_id).await?;
        if existing.owner_id == caller_id {
            return Err(CoreError::forbidden("the owner cannot reserve their own item"));
        }
        if existing.status != DonationStatus::Available {
            return Err(CoreError::conflict("donation is not available"));
        }

        let donation = self
            .store
            .reserve_donation(donation_id, caller_id)
            .await?
            .ok_or_else(|| CoreError::conflict("donation is not available"))?;
        tracing::info!(donation_id = %donation_id, reserved_by = %caller_id, "donation reserved");
        Ok(donation)
    }
}
