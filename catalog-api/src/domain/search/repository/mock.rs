//! In-memory catalog store for testing.
//!
//! Evaluates predicates directly against items, mirroring the SQL the
//! Postgres store generates closely enough for orchestration tests.

use async_trait::async_trait;
use std::cmp::Ordering as CmpOrdering;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::Value as JsonValue;

use crate::domain::search::predicate::{
    CatalogQuery, Direction, Field, Predicate, PredicateSet, Value,
};
use crate::domain::search::traits::{CatalogStore, Result, SearchError};
use crate::domain::search::types::{CatalogItem, ItemId, VehicleDescriptor};

type FetchFailure = Arc<dyn Fn(&CatalogQuery) -> bool + Send + Sync>;

/// Mock catalog store backed by an in-memory map.
///
/// ```ignore
/// let store = MockCatalogStore::new()
///     .with_items(vec![item])
///     .fail_fetch_if(|query| query.pagination.offset > 0);
/// ```
#[derive(Clone, Default)]
pub struct MockCatalogStore {
    items: Arc<RwLock<BTreeMap<ItemId, CatalogItem>>>,
    fetch_failure: Arc<RwLock<Option<FetchFailure>>>,
    fail_counts: Arc<RwLock<bool>>,
    failing_updates: Arc<RwLock<HashSet<ItemId>>>,
    fetch_calls: Arc<AtomicUsize>,
    count_calls: Arc<AtomicUsize>,
    update_calls: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl MockCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add initial items to the store.
    pub fn with_items(self, items: Vec<CatalogItem>) -> Self {
        {
            let mut stored = self.items.write().unwrap();
            for item in items {
                stored.insert(item.id, item);
            }
        }
        self
    }

    /// Fail every fetch.
    pub fn with_failing_fetch(self) -> Self {
        self.fail_fetch_if(|_| true)
    }

    /// Fail fetches for which `predicate` holds.
    pub fn fail_fetch_if<F>(self, predicate: F) -> Self
    where
        F: Fn(&CatalogQuery) -> bool + Send + Sync + 'static,
    {
        *self.fetch_failure.write().unwrap() = Some(Arc::new(predicate));
        self
    }

    /// Fail every count.
    pub fn with_failing_count(self) -> Self {
        *self.fail_counts.write().unwrap() = true;
        self
    }

    /// Fail compatibility updates for one item.
    pub fn with_failing_update(self, id: ItemId) -> Self {
        self.failing_updates.write().unwrap().insert(id);
        self
    }

    pub fn item(&self, id: ItemId) -> Option<CatalogItem> {
        self.items.read().unwrap().get(&id).cloned()
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn count_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    fn matching(&self, predicates: &PredicateSet) -> Vec<CatalogItem> {
        self.items
            .read()
            .unwrap()
            .values()
            .filter(|item| predicates.predicates().iter().all(|p| matches(p, item)))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CatalogStore for MockCatalogStore {
    async fn fetch_items(&self, query: &CatalogQuery) -> Result<Vec<CatalogItem>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let failure = self.fetch_failure.read().unwrap().clone();
        if failure.is_some_and(|fails| fails(query)) {
            return Err(SearchError::Fetch("mock fetch failure".to_string()));
        }

        let mut items = self.matching(&query.predicates);
        items.sort_by(|a, b| {
            let ordering = compare_field(a, b, query.sort.field);
            let ordering = match query.sort.direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            };
            ordering.then_with(|| b.id.cmp(&a.id))
        });

        Ok(items
            .into_iter()
            .skip(query.pagination.offset.max(0) as usize)
            .take(query.pagination.limit.max(0) as usize)
            .collect())
    }

    async fn count_items(&self, predicates: &PredicateSet) -> Result<i64> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);

        if *self.fail_counts.read().unwrap() {
            return Err(SearchError::Fetch("mock count failure".to_string()));
        }
        Ok(self.matching(predicates).len() as i64)
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<CatalogItem>> {
        Ok(self.item(id))
    }

    async fn list_items(&self, offset: i64, limit: i64) -> Result<Vec<CatalogItem>> {
        Ok(self
            .items
            .read()
            .unwrap()
            .values()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn update_compatibility(
        &self,
        id: ItemId,
        compatibility: &[VehicleDescriptor],
    ) -> Result<bool> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_updates.read().unwrap().contains(&id) {
            return Err(SearchError::Database(format!("mock update failure for {id}")));
        }

        let mut items = self.items.write().unwrap();
        match items.get_mut(&id) {
            Some(item) => {
                item.compatibility = compatibility.to_vec();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn text(item: &CatalogItem, field: Field) -> Option<&str> {
    match field {
        Field::Name => Some(&item.name),
        Field::Description => item.description.as_deref(),
        Field::ShortDescription => item.short_description.as_deref(),
        Field::Sku => item.sku.as_deref(),
        Field::PartNumber => item.part_number.as_deref(),
        Field::Category => item.category.as_deref(),
        Field::Brand => item.brand.as_deref(),
        Field::DealerId => item.dealer_id.as_deref(),
        Field::SupplierId => item.supplier_id.as_deref(),
        Field::Condition => item.condition.as_deref(),
        Field::ApprovalStatus => Some(&item.approval_status),
        _ => None,
    }
}

fn number(item: &CatalogItem, field: Field) -> Option<f64> {
    match field {
        Field::Price => Some(item.price),
        Field::StockQuantity => Some(f64::from(item.stock_quantity)),
        _ => None,
    }
}

fn value_number(value: &Value) -> Option<f64> {
    match value {
        Value::Float(v) => Some(*v),
        Value::Int(v) => Some(*v as f64),
        _ => None,
    }
}

fn matches(predicate: &Predicate, item: &CatalogItem) -> bool {
    match predicate {
        Predicate::Eq(Field::IsActive, Value::Bool(expected)) => item.is_active == *expected,
        Predicate::Eq(field, Value::Text(expected)) => text(item, *field) == Some(expected.as_str()),
        Predicate::Eq(field, value) => number(item, *field) == value_number(value),
        Predicate::Range { field, min, max } => {
            let Some(actual) = number(item, *field) else {
                return false;
            };
            let above = min
                .as_ref()
                .and_then(value_number)
                .map_or(true, |min| actual >= min);
            let below = max
                .as_ref()
                .and_then(value_number)
                .map_or(true, |max| actual <= max);
            above && below
        }
        Predicate::Pattern(field, needle) => text(item, *field)
            .is_some_and(|haystack| haystack.to_lowercase().contains(&needle.to_lowercase())),
        Predicate::Contains(Field::Compatibility, needle) => serde_json::to_value(&item.compatibility)
            .is_ok_and(|haystack| json_contains(&haystack, needle)),
        Predicate::Contains(..) => false,
        Predicate::Or(alternatives) => alternatives.iter().any(|p| matches(p, item)),
        Predicate::And(all) => all.iter().all(|p| matches(p, item)),
    }
}

/// Postgres `@>` semantics for objects and arrays.
fn json_contains(container: &JsonValue, contained: &JsonValue) -> bool {
    match (container, contained) {
        (JsonValue::Object(container), JsonValue::Object(contained)) => contained
            .iter()
            .all(|(key, value)| container.get(key).is_some_and(|v| json_contains(v, value))),
        (JsonValue::Array(container), JsonValue::Array(contained)) => contained
            .iter()
            .all(|wanted| container.iter().any(|have| json_contains(have, wanted))),
        _ => container == contained,
    }
}

fn compare_field(a: &CatalogItem, b: &CatalogItem, field: Field) -> CmpOrdering {
    match field {
        Field::CreatedAt => a.created_at.cmp(&b.created_at),
        Field::Price => a.price.total_cmp(&b.price),
        Field::StockQuantity => a.stock_quantity.cmp(&b.stock_quantity),
        other => text(a, other).cmp(&text(b, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::search::predicate::{Pagination, SortOrder};
    use crate::domain::search::test_util::item;
    use crate::domain::search::types::{MatchType, SortBy};
    use crate::domain::search::vehicle::Make;
    use serde_json::json;

    fn query(predicates: Vec<Predicate>, sort_by: SortBy) -> CatalogQuery {
        let mut set = PredicateSet::default();
        for predicate in predicates {
            set.push(predicate);
        }
        CatalogQuery {
            predicates: set,
            sort: SortOrder::for_sort(sort_by),
            pagination: Pagination::new(None, 50),
        }
    }

    #[tokio::test]
    async fn pattern_is_case_insensitive() {
        let store = MockCatalogStore::new().with_items(vec![item(1, "Brake Pads"), item(2, "Mats")]);

        let found = store
            .fetch_items(&query(
                vec![Predicate::Pattern(Field::Name, "PADS".to_string())],
                SortBy::Newest,
            ))
            .await
            .unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, ItemId::new(1));
    }

    #[tokio::test]
    async fn compatibility_containment() {
        let mut fits = item(1, "Liner");
        fits.compatibility = vec![VehicleDescriptor::new(
            Some(2019),
            Some(Make::Honda),
            Some("civic"),
            MatchType::Specific,
        )];
        let store = MockCatalogStore::new().with_items(vec![fits, item(2, "Other")]);

        let hit = query(
            vec![Predicate::Contains(
                Field::Compatibility,
                json!([{ "make": "honda", "year": "2019" }]),
            )],
            SortBy::Newest,
        );
        let miss = query(
            vec![Predicate::Contains(
                Field::Compatibility,
                json!([{ "make": "honda", "year": "2020" }]),
            )],
            SortBy::Newest,
        );

        assert_eq!(store.fetch_items(&hit).await.unwrap().len(), 1);
        assert!(store.fetch_items(&miss).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sorts_and_counts() {
        let store = MockCatalogStore::new().with_items(vec![item(1, "b"), item(2, "a"), item(3, "c")]);

        let by_price = store
            .fetch_items(&query(Vec::new(), SortBy::PriceDesc))
            .await
            .unwrap();
        let ids: Vec<i64> = by_price.iter().map(|i| i.id.as_i64()).collect();
        assert_eq!(ids, vec![3, 2, 1]);

        let count = store
            .count_items(&query(
                vec![Predicate::Range {
                    field: Field::Price,
                    min: Some(Value::Float(20.0)),
                    max: None,
                }],
                SortBy::Newest,
            )
            .predicates)
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(store.fetch_calls(), 1);
        assert_eq!(store.count_calls(), 1);
    }

    #[tokio::test]
    async fn injected_failures() {
        let store = MockCatalogStore::new()
            .with_items(vec![item(1, "a")])
            .with_failing_fetch()
            .with_failing_update(ItemId::new(1));

        assert!(store.fetch_items(&query(Vec::new(), SortBy::Newest)).await.is_err());
        assert!(store.update_compatibility(ItemId::new(1), &[]).await.is_err());
        assert!(!store.update_compatibility(ItemId::new(9), &[]).await.unwrap());
    }
}
