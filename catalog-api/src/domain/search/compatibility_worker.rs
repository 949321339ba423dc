//! Batch regeneration of stored compatibility lists.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::compatibility::{merge_compatibility, CompatibilityGenerator};
use super::service::CatalogSearchService;
use super::traits::{CatalogStore, Result};
use super::types::{CatalogItem, ItemId, RefreshStats};

/// Walks the catalog, merging generated descriptors into each item's list.
///
/// Existing descriptors are never removed; an item is written back only if
/// generation added something.
pub struct CompatibilityRefresher<S: CatalogStore> {
    store: S,
    generator: CompatibilityGenerator,
    batch_size: i64,
}

impl<S: CatalogStore> CompatibilityRefresher<S> {
    pub fn new(store: S, generator: CompatibilityGenerator, batch_size: i64) -> Self {
        Self {
            store,
            generator,
            batch_size: batch_size.max(1),
        }
    }

    /// Refresh every item.
    ///
    /// Failures on single items are logged and counted; only a failure to
    /// list a page aborts the run.
    pub async fn refresh(&self) -> Result<RefreshStats> {
        let mut stats = RefreshStats::default();
        let mut offset = 0;

        info!(batch_size = self.batch_size, "Starting compatibility refresh");

        loop {
            let page = self.store.list_items(offset, self.batch_size).await?;
            let page_len = page.len() as i64;

            for item in page {
                stats.scanned += 1;
                match self.refresh_one(&item).await {
                    Ok(true) => stats.updated += 1,
                    Ok(false) => stats.unchanged += 1,
                    Err(e) => {
                        warn!(item_id = %item.id, error = %e, "Failed to refresh compatibility");
                        stats.failed += 1;
                    }
                }
            }

            if page_len < self.batch_size {
                break;
            }
            offset += page_len;
        }

        info!(
            scanned = stats.scanned,
            updated = stats.updated,
            unchanged = stats.unchanged,
            failed = stats.failed,
            "Compatibility refresh completed"
        );

        Ok(stats)
    }

    /// Refresh a single item. Returns whether its list changed.
    pub async fn refresh_item(&self, id: ItemId) -> Result<bool> {
        match self.store.get_item(id).await? {
            Some(item) => self.refresh_one(&item).await,
            None => {
                debug!(item_id = %id, "Item not found for compatibility refresh");
                Ok(false)
            }
        }
    }

    async fn refresh_one(&self, item: &CatalogItem) -> Result<bool> {
        let generated = self
            .generator
            .generate(&item.name, item.description.as_deref().unwrap_or_default());
        let merged = merge_compatibility(&item.compatibility, &generated);

        if merged.len() == item.compatibility.len() {
            return Ok(false);
        }

        self.store.update_compatibility(item.id, &merged).await
    }
}

/// Periodically refresh compatibility across the whole catalog.
pub async fn run_compatibility_worker<S>(service: Arc<CatalogSearchService<S>>, interval: Duration)
where
    S: CatalogStore + Clone + 'static,
{
    info!(
        interval_secs = interval.as_secs(),
        "Compatibility refresh background task started"
    );

    let mut ticker = tokio::time::interval(interval);

    // Skip the first immediate tick to let the app fully start
    ticker.tick().await;

    loop {
        ticker.tick().await;

        if let Err(e) = service.refresh_compatibility().await {
            error!(error = %e, "Compatibility refresh failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::search::repository::MockCatalogStore;
    use crate::domain::search::test_util::item;
    use crate::domain::search::types::{MatchType, VehicleDescriptor};
    use crate::domain::search::vehicle::Make;

    fn refresher(store: MockCatalogStore, batch_size: i64) -> CompatibilityRefresher<MockCatalogStore> {
        CompatibilityRefresher::new(store, CompatibilityGenerator::new(2025), batch_size)
    }

    #[tokio::test]
    async fn refresh_updates_items_with_new_descriptors() {
        let store = MockCatalogStore::new().with_items(vec![
            item(1, "2019 Honda Civic brake pads"),
            item(2, "Chrome valve caps"),
            CatalogItem {
                description: Some("Fits Toyota RAV4".to_string()),
                ..item(3, "Floor liners")
            },
        ]);

        let stats = refresher(store.clone(), 2).refresh().await.unwrap();

        assert_eq!(
            stats,
            RefreshStats {
                scanned: 3,
                updated: 2,
                unchanged: 1,
                failed: 0,
            }
        );
        let civic = store.item(ItemId::new(1)).unwrap();
        assert!(civic.compatibility.contains(&VehicleDescriptor::new(
            Some(2019),
            Some(Make::Honda),
            Some("civic"),
            MatchType::Specific,
        )));
        assert!(store.item(ItemId::new(2)).unwrap().compatibility.is_empty());
    }

    #[tokio::test]
    async fn second_refresh_changes_nothing() {
        let store = MockCatalogStore::new().with_items(vec![item(1, "Toyota RAV4 liners")]);
        let refresher = refresher(store.clone(), 10);

        refresher.refresh().await.unwrap();
        let stats = refresher.refresh().await.unwrap();

        assert_eq!(stats.updated, 0);
        assert_eq!(stats.unchanged, 1);
        assert_eq!(store.update_calls(), 1);
    }

    #[tokio::test]
    async fn existing_descriptors_are_kept() {
        let mut existing = item(1, "2019 Honda Civic mats");
        let manual = VehicleDescriptor::new(None, Some(Make::Acura), None, MatchType::Make);
        existing.compatibility = vec![manual.clone()];
        let store = MockCatalogStore::new().with_items(vec![existing]);

        refresher(store.clone(), 10).refresh().await.unwrap();

        let refreshed = store.item(ItemId::new(1)).unwrap();
        assert_eq!(refreshed.compatibility[0], manual);
        assert_eq!(refreshed.compatibility.len(), 2);
    }

    #[tokio::test]
    async fn single_failures_are_skipped() {
        let store = MockCatalogStore::new()
            .with_items(vec![
                item(1, "2019 Honda Civic pads"),
                item(2, "2020 Ford F-150 mats"),
            ])
            .with_failing_update(ItemId::new(1));

        let stats = refresher(store.clone(), 10).refresh().await.unwrap();

        assert_eq!(stats.failed, 1);
        assert_eq!(stats.updated, 1);
        assert!(!store.item(ItemId::new(2)).unwrap().compatibility.is_empty());
    }

    #[tokio::test]
    async fn refresh_single_item() {
        let store = MockCatalogStore::new().with_items(vec![item(1, "Subaru 2020 mud flaps")]);
        let refresher = refresher(store.clone(), 10);

        assert!(refresher.refresh_item(ItemId::new(1)).await.unwrap());
        assert!(!refresher.refresh_item(ItemId::new(1)).await.unwrap());
        assert!(!refresher.refresh_item(ItemId::new(42)).await.unwrap());
    }
}
