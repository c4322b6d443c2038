use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pet {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub seq: i64,
    pub owner_id: Uuid,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: PetStatus,
    pub image_urls: Vec<String>,
    pub found_by_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PetStatus {
    Adoption,
    Lost,
    Found,
}

impl PetStatus {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "adoption" => Some(Self::Adoption),
            "lost" => Some(Self::Lost),
            "found" => Some(Self::Found),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Adoption => "adoption",
            Self::Lost => "lost",
            Self::Found => "found",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewPet {
    pub owner_id: Uuid,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: PetStatus,
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PetChanges {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub image_urls: Option<Vec<String>>,
}
