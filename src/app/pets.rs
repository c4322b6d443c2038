use std::sync::Arc;

use uuid::Uuid;

use crate::app::authz::ensure_owner;
use crate::app::error::{CoreError, CoreResult};
use crate::app::media::MediaService;
use crate::domain::page::{PageRequest, Paged};
use crate::domain::pet::{NewPet, Pet, PetChanges, PetStatus};
use crate::infra::store::{ListingFilter, ListingStore, Store, UserStore};

#[derive(Debug, Clone)]
pub struct CreatePet {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: PetStatus,
    pub image_urls: Vec<String>,
}

#[derive(Clone)]
pub struct PetService {
    store: Arc<dyn Store>,
    media: MediaService,
}

impl PetService {
    pub fn new(store: Arc<dyn Store>, media: MediaService) -> Self {
        Self { store, media }
    }

    pub async fn create_pet(&self, owner_id: Uuid, input: CreatePet) -> CoreResult<Pet> {
        if self.store.get_user(owner_id).await?.is_none() {
            return Err(CoreError::forbidden("create a profile before listing a pet"));
        }
        if input.status == PetStatus::Found {
            return Err(CoreError::invalid("a pet is listed for adoption or as lost"));
        }
        let name = required(input.name, "name")?;
        let category = required(input.category, "category")?;

        let pet = self
            .store
            .insert_pet(NewPet {
                owner_id,
                name,
                category,
                description: input.description,
                location: input.location,
                status: input.status,
                image_urls: input.image_urls,
            })
            .await?;
        tracing::info!(pet_id = %pet.id, status = pet.status.as_db(), "pet listed");
        Ok(pet)
    }

    pub async fn get_pet(&self, pet_id: Uuid) -> CoreResult<Pet> {
        self.store
            .get_pet(pet_id)
            .await?
            .ok_or_else(|| CoreError::not_found("pet not found"))
    }

    pub async fn list_pets(
        &self,
        filter: ListingFilter<PetStatus>,
        page: PageRequest,
    ) -> CoreResult<Paged<Pet>> {
        let (pets, total) = self.store.list_pets(filter, page).await?;
        Ok(Paged::new(pets, page, total))
    }

    /// Owner edits. Status is not editable here; `lost -> found` goes through
    /// `mark_found`.
    pub async fn update_pet(
        &self,
        caller_id: Uuid,
        pet_id: Uuid,
        mut changes: PetChanges,
        status: Option<PetStatus>,
    ) -> CoreResult<Pet> {
        let existing = self.get_pet(pet_id).await?;
        ensure_owner(&existing, caller_id, "edit this pet")?;
        if status.is_some_and(|status| status != existing.status) {
            return Err(CoreError::invalid(
                "pet status only changes when someone else marks a lost pet found",
            ));
        }
        if let Some(name) = changes.name.take() {
            changes.name = Some(required(name, "name")?);
        }
        if let Some(category) = changes.category.take() {
            changes.category = Some(required(category, "category")?);
        }

        let updated = self
            .store
            .update_pet(pet_id, changes)
            .await?
            .ok_or_else(|| CoreError::not_found("pet not found"))?;
        self.media
            .discard_replaced(&existing.image_urls, &updated.image_urls)
            .await;
        Ok(updated)
    }

    pub async fn delete_pet(&self, caller_id: Uuid, pet_id: Uuid) -> CoreResult<()> {
        let existing = self.get_pet(pet_id).await?;
        ensure_owner(&existing, caller_id, "delete this pet")?;

        let deleted = self
            .store
            .delete_pet(pet_id)
            .await?
            .ok_or_else(|| CoreError::not_found("pet not found"))?;
        self.media.discard(&deleted.image_urls).await;
        Ok(())
    }

    /// `lost -> found`, performed by someone other than the owner.
    pub async fn mark_found(&self, finder_id: Uuid, pet_id: Uuid) -> CoreResult<Pet> {
        let existing = self.get_pet(pet_id).await?;
        if existing.owner_id == finder_id {
            return Err(CoreError::forbidden("the owner cannot mark their own pet found"));
        }
        if existing.status != PetStatus::Lost {
            return Err(CoreError::conflict("pet is not lost"));
        }

        let pet = self
            .store
            .mark_pet_found(pet_id, finder_id)
            .await?
            .ok_or_else(|| CoreError::conflict("pet is not lost"))?;
        tracing::info!(pet_id = %pet_id, finder_id = %finder_id, "pet marked found");
        Ok(pet)
    }
}

pub(crate) fn required(value: String, field: &str) -> CoreResult<String> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(CoreError::invalid(format!("{} cannot be empty", field)));
    }
    Ok(value)
}
