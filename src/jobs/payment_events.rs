use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::app::error::CoreError;
use crate::app::payments::PaymentService;
use crate::domain::vet_help::DonationConfirmed;
use crate::infra::queue::QueueClient;
use crate::infra::store::Store;

const POLL_WAIT_SECONDS: i32 = 10;
const IDLE_SLEEP_MS: u64 = 200;
const ERROR_BACKOFF_MS: u64 = 1000;

#[derive(Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Applied, or rejected for good; the message can go.
    Done,
    /// The store was unavailable; leave the message for redelivery.
    RetryLater,
}

pub async fn run(store: Arc<dyn Store>, queue: QueueClient) -> Result<()> {
    info!(queue = %queue.queue_name(), "payment event consumer started");
    let payments = PaymentService::new(store);
    loop {
        match queue.receive_payment_event(POLL_WAIT_SECONDS).await {
            Ok(Some(message)) => {
                if handle_event(&payments, message.event).await == Disposition::Done {
                    if let Err(err) = queue.delete_message(&message.receipt_handle).await {
                        warn!(error = ?err, "failed to delete queue message");
                    }
                }
            }
            Ok(None) => {
                tokio::time::sleep(Duration::from_millis(IDLE_SLEEP_MS)).await;
            }
            Err(err) => {
                warn!(error = ?err, "queue receive failed, backing off");
                tokio::time::sleep(Duration::from_millis(ERROR_BACKOFF_MS)).await;
            }
        }
    }
}

pub async fn handle_event(payments: &PaymentService, event: DonationConfirmed) -> Disposition {
    let payment_ref = event.payment_ref.clone();
    let fundraiser_id = event.fundraiser_id;
    match payments.apply_confirmed(event).await {
        Ok(_) => Disposition::Done,
        Err(CoreError::Conflict(_)) => {
            info!(%fundraiser_id, %payment_ref, "payment already applied");
            Disposition::Done
        }
        Err(CoreError::Unavailable(err)) => {
            error!(error = ?err, %fundraiser_id, %payment_ref, "failed to apply payment");
            Disposition::RetryLater
        }
        Err(err) => {
            warn!(error = %err, %fundraiser_id, %payment_ref, "dropping payment event");
            Disposition::Done
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vet_help::NewFundraiser;
    use crate::infra::store::{ListingStore, MemoryStore};
    use uuid::Uuid;

    fn confirmed(fundraiser_id: Uuid, payment_ref: &str, amount: i64) -> DonationConfirmed {
        DonationConfirmed {
            user_id: Uuid::new_v4(),
            fundraiser_id,
            amount_minor_units: amount,
            payment_ref: payment_ref.to_string(),
        }
    }

    #[tokio::test]
    async fn duplicate_and_unknown_events_are_acknowledged() {
        let store = Arc::new(MemoryStore::new());
        let fundraiser = store
            .insert_fundraiser(NewFundraiser {
                owner_id: Uuid::new_v4(),
                pet_name: "Biscuit".to_string(),
                title: "Surgery".to_string(),
                description: None,
                image_urls: Vec::new(),
                target_amount: 10_000,
            })
            .await
            .expect("insert fundraiser");
        let payments = PaymentService::new(store.clone());

        let first = handle_event(&payments, confirmed(fundraiser.id, "pay_1", 2500)).await;
        let repeat = handle_event(&payments, confirmed(fundraiser.id, "pay_1", 2500)).await;
        let missing = handle_event(&payments, confirmed(Uuid::new_v4(), "pay_2", 100)).await;
        let invalid = handle_event(&payments, confirmed(fundraiser.id, "pay_3", 0)).await;

        assert_eq!(first, Disposition::Done);
        assert_eq!(repeat, Disposition::Done);
        assert_eq!(missing, Disposition::Done);
        assert_eq!(invalid, Disposition::Done);

        let stored = store
            .get_fundraiser(fundraiser.id)
            .await
            .expect("get fundraiser")
            .expect("fundraiser exists");
        assert_eq!(stored.current_amount, 2500);
        assert_eq!(stored.donations.len(), 1);
    }

    #[tokio::test]
    async fn overflowing_payment_is_acknowledged_and_leaves_total_intact() {
        let store = Arc::new(MemoryStore::new());
        let fundraiser = store
            .insert_fundraiser(NewFundraiser {
                owner_id: Uuid::new_v4(),
                pet_name: "Pepper".to_string(),
                title: "Dental work".to_string(),
                description: None,
                image_urls: Vec::new(),
                target_amount: 10_000,
            })
            .await
            .expect("insert fundraiser");
        let payments = PaymentService::new(store.clone());

        let first = handle_event(&payments, confirmed(fundraiser.id, "pay_max_1", i64::MAX)).await;
        let second = handle_event(&payments, confirmed(fundraiser.id, "pay_max_2", i64::MAX)).await;
        assert_eq!(first, Disposition::Done);
        assert_eq!(second, Disposition::Done);

        let stored = store
            .get_fundraiser(fundraiser.id)
            .await
            .expect("store still usable")
            .expect("fundraiser exists");
        assert_eq!(stored.current_amount, i64::MAX);
        assert_eq!(stored.donations.len(), 1);

        let rejected = payments
            .apply_confirmed(confirmed(fundraiser.id, "pay_max_3", 1))
            .await;
        assert!(matches!(rejected, Err(CoreError::InvalidInput(_))));
    }
}
