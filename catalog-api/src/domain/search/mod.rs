//! Auto-parts search over the catalog.
//!
//! Free-text queries such as `"2016 toyota rav4 brake pads"` are parsed into
//! vehicle info, part numbers and product terms, matched against the Catalog
//! Store, and ranked by a weighted relevance score.
//!
//! # Architecture
//!
//! - `parser` - Raw text to a parsed query (year, make, model, part numbers, terms)
//! - `compatibility` - Item text to heuristic vehicle descriptors
//! - `scoring` - Relevance score and ranking
//! - `cache` - TTL memoization of responses
//! - [`CatalogSearchService`] - Filter bag to ranked, paginated, cached results
//! - [`CatalogStore`] - Database operations (PostgreSQL, mocks)
//!
//! # Example
//!
//! ```ignore
//! let service = CatalogSearchService::new(PgCatalogStore::new(pool), clock, config);
//! let response = service
//!     .search(SearchFilters {
//!         search: Some("2016 toyota rav4 brake pads".to_string()),
//!         ..Default::default()
//!     })
//!     .await?;
//! ```
//!
//! # Query Syntax
//!
//! - `"2016 toyota rav4"` → year 2016, make toyota, model rav-4
//! - `"ABC-1234"` → part number `abc-1234`
//! - `"chevy silverado floor mats"` → make chevrolet, model silverado,
//!   product terms `floor`, `mats`

mod cache;
mod compatibility;
mod compatibility_worker;
mod parser;
mod predicate;
mod scoring;
mod service;
mod suggestions;
#[cfg(test)]
pub(crate) mod test_util;
mod traits;
mod types;
mod vehicle;

pub mod repository;

pub use cache::CacheStats;
pub use compatibility_worker::run_compatibility_worker;
pub use service::{CatalogSearchService, SearchConfig};
pub use suggestions::DEFAULT_SUGGESTION_LIMIT;
pub use traits::{CatalogStore, SearchError};
pub use types::{ItemId, RefreshStats, SearchFilters, SearchResponse, SortBy, VehicleFilter};
