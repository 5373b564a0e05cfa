/*
 * Responsibility
 * - Resolve the account's current subscription (newest active row)
 * - Cancel it without touching older history rows
 */
use chrono::Utc;

use crate::error::AppError;
use crate::models::{Subscription, SubscriptionStatus, Tier};
use crate::repos::SubscriptionStore;

/// Bounds for the backward scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionLookup {
    pub page_size: u32,
    pub max_pages: u32,
}

impl Default for SubscriptionLookup {
    fn default() -> Self {
        Self {
            page_size: 25,
            max_pages: 20,
        }
    }
}

/// Newest row with `status = active`, scanning newest-first page by page.
///
/// Stops at the first active row, when pages run out, or after `max_pages`;
/// the last two mean "no active subscription", not an error.
pub async fn resolve_current(
    store: &dyn SubscriptionStore,
    lookup: SubscriptionLookup,
    user_id: &str,
) -> Result<Option<Subscription>, AppError> {
    let mut page_token: Option<String> = None;

    for _ in 0..lookup.max_pages {
        let page = store
            .query_newest_first(user_id, page_token.as_deref(), lookup.page_size)
            .await?;

        if let Some(active) = page.rows.into_iter().find(Subscription::is_active) {
            return Ok(Some(active));
        }

        match page.next_page_token {
            Some(next) => page_token = Some(next),
            None => return Ok(None),
        }
    }

    tracing::warn!(
        %user_id,
        max_pages = lookup.max_pages,
        "subscription scan hit page cap; treating as no active subscription"
    );
    Ok(None)
}

pub async fn resolve_tier(
    store: &dyn SubscriptionStore,
    lookup: SubscriptionLookup,
    user_id: &str,
) -> Result<Tier, AppError> {
    let current = resolve_current(store, lookup, user_id).await?;
    Ok(Tier::from_current(current.as_ref()))
}

/// Cancel the current subscription. `NotFound` when nothing is active.
pub async fn cancel_current(
    store: &dyn SubscriptionStore,
    lookup: SubscriptionLookup,
    user_id: &str,
) -> Result<Subscription, AppError> {
    let current = resolve_current(store, lookup, user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let canceled_at = Utc::now();
    let updated = store
        .mark_canceled(user_id, current.created_at, canceled_at)
        .await?;
    if !updated {
        // Row vanished between read and write.
        return Err(AppError::NotFound);
    }

    Ok(Subscription {
        status: SubscriptionStatus::Canceled,
        canceled_at: Some(canceled_at),
        ..current
    })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone};

    use super::*;
    use crate::repos::MemoryStore;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    async fn seeded(rows: &[(i64, SubscriptionStatus)]) -> MemoryStore {
        let store = MemoryStore::new();
        for (millis, status) in rows {
            store
                .insert_subscription(Subscription {
                    user_id: "u1".into(),
                    created_at: at(*millis),
                    status: *status,
                    canceled_at: None,
                })
                .await;
        }
        store
    }

    #[tokio::test]
    async fn newest_active_row_wins() {
        use SubscriptionStatus::*;
        let store = seeded(&[(1, Active), (2, Canceled), (3, Active)]).await;

        let current = resolve_current(&store, SubscriptionLookup::default(), "u1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.created_at, at(3));
    }

    #[tokio::test]
    async fn cancel_flips_only_the_current_row() {
        use SubscriptionStatus::*;
        let store = seeded(&[(1, Active), (2, Canceled), (3, Active)]).await;

        let canceled = cancel_current(&store, SubscriptionLookup::default(), "u1")
            .await
            .unwrap();
        assert_eq!(canceled.created_at, at(3));
        assert_eq!(canceled.status, Canceled);

        let rows = store.subscriptions_of("u1").await;
        let statuses: Vec<(i64, SubscriptionStatus, bool)> = rows
            .iter()
            .map(|r| (r.created_at.timestamp_millis(), r.status, r.canceled_at.is_some()))
            .collect();
        assert_eq!(
            statuses,
            vec![(1, Active, false), (2, Canceled, false), (3, Canceled, true)]
        );

        // The older active row becomes current again.
        let current = resolve_current(&store, SubscriptionLookup::default(), "u1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.created_at, at(1));
    }

    #[tokio::test]
    async fn scans_across_pages() {
        use SubscriptionStatus::*;
        let mut rows = vec![(1, Active)];
        rows.extend((2..=7).map(|m| (m, Canceled)));
        let store = seeded(&rows).await;

        let lookup = SubscriptionLookup {
            page_size: 2,
            max_pages: 10,
        };
        let current = resolve_current(&store, lookup, "u1").await.unwrap();
        assert_eq!(current.map(|s| s.created_at), Some(at(1)));
    }

    #[tokio::test]
    async fn page_cap_means_no_active_subscription() {
        use SubscriptionStatus::*;
        let mut rows = vec![(1, Active)];
        rows.extend((2..=7).map(|m| (m, Canceled)));
        let store = seeded(&rows).await;

        let lookup = SubscriptionLookup {
            page_size: 2,
            max_pages: 2,
        };
        assert_eq!(resolve_current(&store, lookup, "u1").await.unwrap(), None);
        assert_eq!(resolve_tier(&store, lookup, "u1").await.unwrap(), Tier::Free);
    }

    #[tokio::test]
    async fn nothing_to_cancel() {
        let store = seeded(&[(1, SubscriptionStatus::Canceled)]).await;
        assert!(matches!(
            cancel_current(&store, SubscriptionLookup::default(), "u1").await,
            Err(AppError::NotFound)
        ));
        assert_eq!(
            resolve_tier(&store, SubscriptionLookup::default(), "nobody")
                .await
                .unwrap(),
            Tier::Free
        );
    }
}
