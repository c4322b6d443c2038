use std::sync::Arc;

use time::OffsetDateTime;

use crate::app::error::{CoreError, CoreResult};
use crate::domain::vet_help::{DonationConfirmed, Fundraiser, FundraiserDonation};
use crate::infra::store::{ListingStore, PaymentApplied, Store};

/// Applies "charge succeeded" events from the payment collaborator to
/// fundraisers. `payment_ref` makes delivery idempotent.
#[derive(Clone)]
pub struct PaymentService {
    store: Arc<dyn Store>,
}

impl PaymentService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn apply_confirmed(&self, event: DonationConfirmed) -> CoreResult<Fundraiser> {
        if event.amount_minor_units <= 0 {
            return Err(CoreError::invalid("amount_minor_units must be positive"));
        }
        let payment_ref = event.payment_ref.trim().to_string();
        if payment_ref.is_empty() {
            return Err(CoreError::invalid("payment_ref cannot be empty"));
        }

        let donation = FundraiserDonation {
            user_id: event.user_id,
            amount: event.amount_minor_units,
            payment_ref: payment_ref.clone(),
            created_at: OffsetDateTime::now_utc(),
        };

        match self
            .store
            .apply_payment(event.fundraiser_id, donation)
            .await?
        {
            PaymentApplied::Applied(fundraiser) => {
                tracing::info!(
                    fundraiser_id = %fundraiser.id,
                    payment_ref = %payment_ref,
                    amount = event.amount_minor_units,
                    current_amount = fundraiser.current_amount,
                    status = fundraiser.status.as_db(),
                    "payment applied"
                );
                Ok(fundraiser)
            }
            PaymentApplied::Duplicate => Err(CoreError::conflict("payment already applied")),
            PaymentApplied::MissingFundraiser => {
                Err(CoreError::not_found("fundraiser not found"))
            }
            PaymentApplied::Overflow => Err(CoreError::invalid(
                "payment would overflow the fundraiser total",
            )),
        }
    }
}
