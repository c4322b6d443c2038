use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// An item offered for free by its owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donation {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub seq: i64,
    pub owner_id: Uuid,
    pub title: String,
    pub category: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: DonationStatus,
    pub image_urls: Vec<String>,
    pub reserved_by_id: Option<Uuid>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonationStatus {
    Available,
    Reserved,
    // Nothing moves a donation here yet; who confirms the hand-over is undecided.
    Donated,
}

impl DonationStatus {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "available" => Some(Self::Available),
            "reserved" => Some(Self::Reserved),
            "donated" => Some(Self::Donated),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Reserved => "reserved",
            Self::Donated => "donated",
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewDonation {
    pub owner_id: Uuid,
    pub title: String,
    pub category: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DonationChanges {
    pub title: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub image_urls: Option<Vec<String>>,
}
