//! Store-agnostic query description built from a filter bag.
//!
//! The Postgres store renders these into SQL; the in-memory store evaluates
//! them directly against items.

use serde_json::{json, Map, Value as JsonValue};

use super::parser::normalize_query;
use super::traits::{Result, SearchError};
use super::types::{ParsedQuery, SearchFilters, SortBy, VehicleFilter, VehicleInfo};
use super::vehicle::{model_variants, normalize_model, Make};

/// Approval status every searchable item must have.
pub const APPROVED: &str = "approved";

/// Catalog item columns a predicate can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Description,
    ShortDescription,
    Sku,
    PartNumber,
    Category,
    Brand,
    DealerId,
    SupplierId,
    Condition,
    Price,
    StockQuantity,
    IsActive,
    ApprovalStatus,
    Compatibility,
    CreatedAt,
}

impl Field {
    pub fn column(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Description => "description",
            Field::ShortDescription => "short_description",
            Field::Sku => "sku",
            Field::PartNumber => "part_number",
            Field::Category => "category",
            Field::Brand => "brand",
            Field::DealerId => "dealer_id",
            Field::SupplierId => "supplier_id",
            Field::Condition => "item_condition",
            Field::Price => "price",
            Field::StockQuantity => "stock_quantity",
            Field::IsActive => "is_active",
            Field::ApprovalStatus => "approval_status",
            Field::Compatibility => "compatibility",
            Field::CreatedAt => "created_at",
        }
    }
}

/// Text fields a free-text search looks at.
pub const SEARCHABLE_FIELDS: [Field; 5] = [
    Field::Name,
    Field::Description,
    Field::ShortDescription,
    Field::Sku,
    Field::PartNumber,
];

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Float(f64),
    Int(i64),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(Field, Value),
    /// Inclusive on both ends; a missing bound is open.
    Range {
        field: Field,
        min: Option<Value>,
        max: Option<Value>,
    },
    /// Case-insensitive substring match.
    Pattern(Field, String),
    /// JSON containment, as Postgres `@>`.
    Contains(Field, JsonValue),
    Or(Vec<Predicate>),
    And(Vec<Predicate>),
}

/// Predicates that must all hold.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredicateSet(Vec<Predicate>);

impl PredicateSet {
    pub fn push(&mut self, predicate: Predicate) {
        self.0.push(predicate);
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.0
    }

    /// Build the predicates for a filter bag.
    ///
    /// Active and approved status is always required. `parsed` is the parsed
    /// form of the search text, if any.
    pub fn from_filters(filters: &SearchFilters, parsed: Option<&ParsedQuery>) -> Result<Self> {
        let mut set = PredicateSet::default();
        set.push(Predicate::Eq(Field::IsActive, Value::Bool(true)));
        set.push(Predicate::Eq(
            Field::ApprovalStatus,
            Value::Text(APPROVED.to_string()),
        ));

        if let Some(predicate) = parsed.and_then(search_predicate) {
            set.push(predicate);
        }

        if let Some(vehicle) = filters.vehicle_filter() {
            set.push(vehicle_predicate(vehicle)?);
        }

        let equalities = [
            (Field::Category, &filters.category),
            (Field::Brand, &filters.brand),
            (Field::DealerId, &filters.dealer),
            (Field::SupplierId, &filters.supplier),
            (Field::Condition, &filters.condition),
        ];
        for (field, value) in equalities {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                set.push(Predicate::Eq(field, Value::Text(value.to_string())));
            }
        }

        if let Some(predicate) = price_predicate(filters.min_price, filters.max_price)? {
            set.push(predicate);
        }

        if filters.in_stock == Some(true) {
            set.push(Predicate::Range {
                field: Field::StockQuantity,
                min: Some(Value::Int(1)),
                max: None,
            });
        }

        Ok(set)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub field: Field,
    pub direction: Direction,
}

impl SortOrder {
    /// Store-side order for a requested sort.
    ///
    /// Relevance is ranked after the fetch, so the store returns newest first.
    pub fn for_sort(sort_by: SortBy) -> Self {
        let (field, direction) = match sort_by {
            SortBy::Relevance | SortBy::Newest => (Field::CreatedAt, Direction::Desc),
            SortBy::Oldest => (Field::CreatedAt, Direction::Asc),
            SortBy::PriceAsc => (Field::Price, Direction::Asc),
            SortBy::PriceDesc => (Field::Price, Direction::Desc),
            SortBy::NameAsc => (Field::Name, Direction::Asc),
            SortBy::NameDesc => (Field::Name, Direction::Desc),
            SortBy::Stock => (Field::StockQuantity, Direction::Desc),
        };
        Self { field, direction }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub offset: i64,
    pub limit: i64,
}

impl Pagination {
    /// Offset/limit for a 1-based page, or the first `limit` rows.
    pub fn new(page: Option<u32>, limit: u32) -> Self {
        let limit = i64::from(limit);
        let offset = page
            .map(|page| i64::from(page.max(1) - 1) * limit)
            .unwrap_or(0);
        Self { offset, limit }
    }
}

/// Everything a store needs to fetch one page of results.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogQuery {
    pub predicates: PredicateSet,
    pub sort: SortOrder,
    pub pagination: Pagination,
}

/// Any searchable text field containing `term`.
fn any_field_contains(term: &str) -> Vec<Predicate> {
    SEARCHABLE_FIELDS
        .iter()
        .map(|field| Predicate::Pattern(*field, term.to_string()))
        .collect()
}

/// Items matching any extracted term, or compatible with the parsed vehicle.
fn search_predicate(parsed: &ParsedQuery) -> Option<Predicate> {
    let mut terms: Vec<String> = Vec::new();
    terms.extend(parsed.part_numbers.iter().cloned());
    terms.extend(parsed.product_terms.iter().cloned());

    let vehicle = &parsed.vehicle_info;
    if let Some(year) = vehicle.year {
        terms.push(year.to_string());
    }
    if let Some(make) = vehicle.make {
        terms.extend(make.spellings());
    }
    if let Some(ref model) = vehicle.model {
        terms.extend(model_variants(model));
    }

    if parsed.is_unstructured() {
        let raw = normalize_query(&parsed.original_query);
        if !raw.is_empty() {
            terms.push(raw);
        }
    }

    let mut alternatives: Vec<Predicate> = terms
        .iter()
        .flat_map(|term| any_field_contains(term))
        .collect();

    if parsed.has_vehicle_info {
        alternatives.push(Predicate::Contains(
            Field::Compatibility,
            compatibility_needle(vehicle),
        ));
    }

    (!alternatives.is_empty()).then_some(Predicate::Or(alternatives))
}

/// Single-element JSON array matching descriptors that agree on every known
/// field of `vehicle`.
pub fn compatibility_needle(vehicle: &VehicleInfo) -> JsonValue {
    let mut descriptor = Map::new();
    if let Some(year) = vehicle.year {
        descriptor.insert("year".to_string(), json!(year.to_string()));
    }
    if let Some(make) = vehicle.make {
        descriptor.insert("make".to_string(), json!(make.to_string()));
    }
    if let Some(ref model) = vehicle.model {
        descriptor.insert("model".to_string(), json!(model));
    }
    JsonValue::Array(vec![JsonValue::Object(descriptor)])
}

/// Compatible per the stored list, or naming the vehicle in the item name.
fn vehicle_predicate(filter: &VehicleFilter) -> Result<Predicate> {
    let clean = |value: &Option<String>| {
        value
            .as_deref()
            .map(|v| v.trim().to_lowercase())
            .filter(|v| !v.is_empty())
    };

    let year = clean(&filter.year)
        .map(|year| {
            year.parse::<u16>().map_err(|_| {
                SearchError::InvalidFilter(format!("vehicle year '{year}' is not a number"))
            })
        })
        .transpose()?;
    let make_text = clean(&filter.make);
    let make = make_text.as_deref().and_then(Make::from_token);
    let model = clean(&filter.model).map(|model| normalize_model(&model));

    let mut needle = Map::new();
    let mut name_patterns = Vec::new();

    if let Some(year) = year {
        needle.insert("year".to_string(), json!(year.to_string()));
        name_patterns.push(Predicate::Pattern(Field::Name, year.to_string()));
    }
    if let Some(make_text) = make_text {
        let canonical = make.map_or(make_text, |make| make.to_string());
        needle.insert("make".to_string(), json!(canonical));
        name_patterns.push(Predicate::Pattern(Field::Name, canonical));
    }
    if let Some(model) = model {
        needle.insert("model".to_string(), json!(model));
        let spellings = model_variants(&model)
            .into_iter()
            .map(|variant| Predicate::Pattern(Field::Name, variant))
            .collect();
        name_patterns.push(Predicate::Or(spellings));
    }

    Ok(Predicate::Or(vec![
        Predicate::Contains(
            Field::Compatibility,
            JsonValue::Array(vec![JsonValue::Object(needle)]),
        ),
        Predicate::And(name_patterns),
    ]))
}

fn price_predicate(min: Option<f64>, max: Option<f64>) -> Result<Option<Predicate>> {
    for price in [min, max].into_iter().flatten() {
        if !price.is_finite() || price < 0.0 {
            return Err(SearchError::InvalidFilter(format!(
                "price {price} must be a non-negative number"
            )));
        }
    }
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(SearchError::InvalidFilter(format!(
                "minPrice {min} is greater than maxPrice {max}"
            )));
        }
    }
    if min.is_none() && max.is_none() {
        return Ok(None);
    }

    Ok(Some(Predicate::Range {
        field: Field::Price,
        min: min.map(Value::Float),
        max: max.map(Value::Float),
    }))
}
