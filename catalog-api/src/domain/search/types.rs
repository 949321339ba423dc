//! Core types for the search domain.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, skip_serializing_none, DisplayFromStr};
use time::OffsetDateTime;

use super::vehicle::Make;

/// Catalog item identifier.
///
/// Wraps i64 to match the database BIGSERIAL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(i64);

impl ItemId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// How a query should be treated, derived from what the parser found.
///
/// Precedence when several apply: part number, vehicle with product,
/// vehicle only, product name, general.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    PartNumber,
    VehicleWithProduct,
    VehicleCompatibility,
    ProductName,
    General,
}

/// Year/make/model extracted from a query.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VehicleInfo {
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub year: Option<u16>,
    pub make: Option<Make>,
    pub model: Option<String>,
}

impl VehicleInfo {
    pub fn is_empty(&self) -> bool {
        self.year.is_none() && self.make.is_none() && self.model.is_none()
    }

    /// "2016 toyota rav-4" style rendering of whatever is known.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(year) = self.year {
            parts.push(year.to_string());
        }
        if let Some(make) = self.make {
            parts.push(make.to_string());
        }
        if let Some(ref model) = self.model {
            parts.push(model.clone());
        }
        parts.join(" ")
    }
}

/// Structured view of a free-text shopper query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedQuery {
    pub vehicle_info: VehicleInfo,
    pub product_terms: Vec<String>,
    pub part_numbers: Vec<String>,
    pub original_query: String,
    pub has_vehicle_info: bool,
    pub has_part_number: bool,
    pub search_type: SearchType,
}

impl ParsedQuery {
    /// The canonical result for empty or unusable input.
    pub fn empty(original_query: impl Into<String>) -> Self {
        Self {
            vehicle_info: VehicleInfo::default(),
            product_terms: Vec::new(),
            part_numbers: Vec::new(),
            original_query: original_query.into(),
            has_vehicle_info: false,
            has_part_number: false,
            search_type: SearchType::General,
        }
    }

    /// True when nothing structured was extracted.
    pub fn is_unstructured(&self) -> bool {
        self.part_numbers.is_empty() && !self.has_vehicle_info && self.product_terms.is_empty()
    }
}

/// Specificity of a compatibility record, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Specific,
    Model,
    MakeYear,
    Make,
    Year,
}

/// One heuristic compatibility record attached to a catalog item.
///
/// Two descriptors are the same record when their `(year, make, model)`
/// triples are equal; a missing field never equals a present one.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDescriptor {
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub year: Option<u16>,
    pub make: Option<Make>,
    pub model: Option<String>,
    pub match_type: MatchType,
}

impl VehicleDescriptor {
    pub fn new(
        year: Option<u16>,
        make: Option<Make>,
        model: Option<&str>,
        match_type: MatchType,
    ) -> Self {
        Self {
            year,
            make,
            model: model.map(str::to_string),
            match_type,
        }
    }

    /// De-duplication key.
    pub fn key(&self) -> (Option<u16>, Option<Make>, Option<&str>) {
        (self.year, self.make, self.model.as_deref())
    }
}

/// A product row from the Catalog Store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: ItemId,
    pub name: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub sku: Option<String>,
    pub part_number: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub dealer_id: Option<String>,
    pub supplier_id: Option<String>,
    pub condition: Option<String>,
    pub price: f64,
    pub stock_quantity: i32,
    pub is_active: bool,
    /// 'pending', 'approved' or 'rejected'
    pub approval_status: String,
    pub compatibility: Vec<VehicleDescriptor>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Item paired with its relevance for one search.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredItem {
    #[serde(flatten)]
    pub item: CatalogItem,
    pub relevance_score: f64,
}

/// Vehicle constraint in a filter bag. Values are as typed by the caller.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleFilter {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<String>,
}

impl VehicleFilter {
    pub fn is_empty(&self) -> bool {
        [&self.make, &self.model, &self.year]
            .iter()
            .all(|v| v.as_deref().map_or(true, |s| s.trim().is_empty()))
    }
}

/// Requested ordering of search results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    Relevance,
    Newest,
    Oldest,
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
    Stock,
}

/// Filter bag accepted by the search orchestrator.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    pub search: Option<String>,
    pub vehicle: Option<VehicleFilter>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub dealer: Option<String>,
    pub supplier: Option<String>,
    pub condition: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub in_stock: Option<bool>,
    pub sort_by: Option<SortBy>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl SearchFilters {
    /// Search text, if any non-blank text was given.
    pub fn search_text(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Vehicle constraint, if any field of it is set.
    pub fn vehicle_filter(&self) -> Option<&VehicleFilter> {
        self.vehicle.as_ref().filter(|v| !v.is_empty())
    }

    /// Copy of these filters with the vehicle constraint dropped.
    pub fn without_vehicle(&self) -> Self {
        Self {
            vehicle: None,
            ..self.clone()
        }
    }
}

/// What a search returned, plus how it was produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub items: Vec<ScoredItem>,
    pub total_count: i64,
    pub applied_filters: SearchFilters,
    pub parsed_query: Option<ParsedQuery>,
    /// Results came from the retry without the vehicle constraint.
    pub fallback_applied: bool,
    /// The primary fetch failed and fallback results were served instead.
    pub degraded: bool,
}

impl SearchResponse {
    pub fn contains_item(&self, id: ItemId) -> bool {
        self.items.iter().any(|scored| scored.item.id == id)
    }
}

/// Statistics from a compatibility refresh run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshStats {
    pub scanned: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failed: usize,
}
