use std::sync::Arc;

use crate::domain::search::{repository::PgCatalogStore, CatalogSearchService, CatalogStore};

pub struct AppState<S: CatalogStore = PgCatalogStore> {
    pub search_service: Arc<CatalogSearchService<S>>,
}

impl<S: CatalogStore> AppState<S> {
    pub fn new(search_service: CatalogSearchService<S>) -> Self {
        Self {
            search_service: Arc::new(search_service),
        }
    }
}

impl<S: CatalogStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            search_service: Arc::clone(&self.search_service),
        }
    }
}
