use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::error::CoreResult;
use crate::domain::counter::{CounterDelta, CounterField};
use crate::domain::interaction::{InteractionKey, InteractionKind, TargetType};
use crate::infra::store::{CommentStore, CounterStore, LedgerStore, Store};

const RECONCILE_BATCH: i64 = 500;

/// The counter an interaction moves, if any. Saves and follows have none;
/// follower counts are read straight off the ledger.
pub fn counter_for(kind: InteractionKind, target_type: TargetType) -> Option<CounterField> {
    match (kind, target_type) {
        (InteractionKind::Like, TargetType::Post) => Some(CounterField::PostLikes),
        (InteractionKind::Like | InteractionKind::CommentLike, TargetType::Comment) => {
            Some(CounterField::CommentLikes)
        }
        _ => None,
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    pub scanned: u64,
    pub corrected: u64,
}

#[derive(Clone)]
pub struct CounterSynchronizer {
    store: Arc<dyn Store>,
}

impl CounterSynchronizer {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Best effort: the caller's primary write already happened, so failures
    /// are logged and left for `reconcile`.
    pub async fn apply(&self, delta: CounterDelta) {
        match self
            .store
            .adjust_counter(delta.field, delta.target_id, delta.delta)
            .await
        {
            Ok(Some(_)) => {}
            Ok(None) => {
                warn!(
                    counter = delta.field.name(),
                    target_id = %delta.target_id,
                    "counter target disappeared before adjustment"
                );
            }
            Err(err) => {
                warn!(
                    error = ?err,
                    counter = delta.field.name(),
                    target_id = %delta.target_id,
                    delta = delta.delta,
                    "failed to adjust counter"
                );
            }
        }
    }

    pub async fn on_interaction(&self, key: InteractionKey, delta: i64) {
        if let Some(field) = counter_for(key.kind, key.target_type) {
            self.apply(CounterDelta {
                field,
                target_id: key.target_id,
                delta,
            })
            .await;
        }
    }

    pub async fn on_comment(&self, post_id: Uuid, delta: i64) {
        self.apply(CounterDelta {
            field: CounterField::PostComments,
            target_id: post_id,
            delta,
        })
        .await;
    }

    /// Recomputes every stored counter from ledger and comment rows.
    pub async fn reconcile(&self) -> CoreResult<ReconcileReport> {
        let mut report = ReconcileReport::default();

        for field in CounterField::ALL {
            let mut after = None;
            loop {
                let batch = self
                    .store
                    .scan_counters(field, after, RECONCILE_BATCH)
                    .await?;
                let Some(&(last_id, _)) = batch.last() else {
                    break;
                };

                for (target_id, stored) in &batch {
                    report.scanned += 1;
                    let expected = self.expected(field, *target_id).await?;
                    if expected != *stored {
                        self.store.set_counter(field, *target_id, expected).await?;
                        report.corrected += 1;
                        info!(
                            counter = field.name(),
                            target_id = %target_id,
                            stored = *stored,
                            expected,
                            "corrected counter drift"
                        );
                    }
                }

                if (batch.len() as i64) < RECONCILE_BATCH {
                    break;
                }
                after = Some(last_id);
            }
        }

        info!(
            scanned = report.scanned,
            corrected = report.corrected,
            "counter reconciliation finished"
        );
        Ok(report)
    }

    async fn expected(&self, field: CounterField, target_id: Uuid) -> anyhow::Result<i64> {
        match field {
            CounterField::PostLikes => {
                self.store
                    .count_by_target(InteractionKind::Like, TargetType::Post, target_id)
                    .await
            }
            CounterField::PostComments => self.store.count_comments(target_id).await,
            CounterField::CommentLikes => {
                self.store
                    .count_by_target(InteractionKind::Like, TargetType::Comment, target_id)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn likes_map_to_counters() {
        assert_eq!(
            counter_for(InteractionKind::Like, TargetType::Post),
            Some(CounterField::PostLikes)
        );
        assert_eq!(
            counter_for(InteractionKind::Like, TargetType::Comment),
            Some(CounterField::CommentLikes)
        );
        assert_eq!(
            counter_for(InteractionKind::CommentLike, TargetType::Comment),
            Some(CounterField::CommentLikes)
        );
    }

    #[test]
    fn saves_and_follows_have_no_counter() {
        assert_eq!(counter_for(InteractionKind::Save, TargetType::Post), None);
        assert_eq!(counter_for(InteractionKind::Follow, TargetType::User), None);
        assert_eq!(counter_for(InteractionKind::Like, TargetType::User), None);
    }
}
