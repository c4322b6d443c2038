use uuid::Uuid;

use crate::app::error::{CoreError, CoreResult};
use crate::domain::donation::Donation;
use crate::domain::engagement::Comment;
use crate::domain::pet::Pet;
use crate::domain::post::Post;
use crate::domain::vet_help::Fundraiser;

/// Anything with a single owner allowed to mutate it.
pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

pub fn ensure_owner<T: Owned>(entity: &T, caller_id: Uuid, action: &str) -> CoreResult<()> {
    if entity.owner_id() == caller_id {
        Ok(())
    } else {
        Err(CoreError::forbidden(format!("only the owner can {}", action)))
    }
}

impl Owned for Post {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

impl Owned for Comment {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

impl Owned for Pet {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

impl Owned for Donation {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

impl Owned for Fundraiser {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}
