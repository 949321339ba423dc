//! Catalog store implementations.

#[cfg(test)]
mod mock;
mod postgres;

#[cfg(test)]
pub use mock::MockCatalogStore;
pub use postgres::PgCatalogStore;
