//! Trait definitions for search domain abstractions.
//!
//! The Catalog Store is the only external collaborator; everything above it
//! is tested against the in-memory implementation.

use async_trait::async_trait;

use super::predicate::{CatalogQuery, PredicateSet};
use super::types::{CatalogItem, ItemId, VehicleDescriptor};

/// Error type for search operations.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Catalog fetch failed: {0}")]
    Fetch(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
}

impl From<sqlx::Error> for SearchError {
    fn from(e: sqlx::Error) -> Self {
        SearchError::Database(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SearchError>;

/// Tabular store holding catalog items and their compatibility lists.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Rows matching the query, in the query's sort order and page.
    async fn fetch_items(&self, query: &CatalogQuery) -> Result<Vec<CatalogItem>>;

    /// Number of rows matching the predicates, ignoring pagination.
    async fn count_items(&self, predicates: &PredicateSet) -> Result<i64>;

    async fn get_item(&self, id: ItemId) -> Result<Option<CatalogItem>>;

    /// Page through every item by ascending id, regardless of status.
    async fn list_items(&self, offset: i64, limit: i64) -> Result<Vec<CatalogItem>>;

    /// Replace an item's compatibility list.
    ///
    /// Returns false if the item does not exist.
    async fn update_compatibility(
        &self,
        id: ItemId,
        compatibility: &[VehicleDescriptor],
    ) -> Result<bool>;
}
