use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A crowdfunding campaign for a pet's veterinary bill. Amounts are in minor
/// currency units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fundraiser {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub seq: i64,
    pub owner_id: Uuid,
    pub pet_name: String,
    pub title: String,
    pub description: Option<String>,
    pub image_urls: Vec<String>,
    pub target_amount: i64,
    pub current_amount: i64,
    pub status: FundraiserStatus,
    pub donations: Vec<FundraiserDonation>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundraiserStatus {
    Active,
    Completed,
    Cancelled,
}

impl FundraiserStatus {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Status once a confirmed payment brings the raised total to `current_amount`.
    /// Only an active campaign completes; other states are left alone.
    pub fn after_payment(self, current_amount: i64, target_amount: i64) -> Self {
        match self {
            Self::Active if current_amount >= target_amount => Self::Completed,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundraiserDonation {
    pub user_id: Uuid,
    pub amount: i64,
    pub payment_ref: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Emitted by the payment collaborator once a charge has succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationConfirmed {
    pub user_id: Uuid,
    pub fundraiser_id: Uuid,
    pub amount_minor_units: i64,
    pub payment_ref: String,
}

#[derive(Debug, Clone)]
pub struct NewFundraiser {
    pub owner_id: Uuid,
    pub pet_name: String,
    pub title: String,
    pub description: Option<String>,
    pub image_urls: Vec<String>,
    pub target_amount: i64,
}

#[derive(Debug, Clone, Default)]
pub struct FundraiserChanges {
    pub pet_name: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_urls: Option<Vec<String>>,
}
