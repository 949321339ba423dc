//! PostgreSQL catalog store.
//!
//! Predicates are rendered with `QueryBuilder` because their shape depends on
//! the filter bag; every value is bound, never interpolated.

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::domain::search::predicate::{
    CatalogQuery, Direction, Predicate, PredicateSet, Value,
};
use crate::domain::search::traits::{CatalogStore, Result, SearchError};
use crate::domain::search::types::{CatalogItem, ItemId, VehicleDescriptor};

const SELECT_ITEMS: &str = r#"
    SELECT
        id,
        name,
        description,
        short_description,
        sku,
        part_number,
        category,
        brand,
        dealer_id,
        supplier_id,
        item_condition,
        price,
        stock_quantity,
        is_active,
        approval_status,
        compatibility,
        created_at,
        updated_at
    FROM catalog_items
"#;

/// PostgreSQL-backed catalog store.
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn fetch_items(&self, query: &CatalogQuery) -> Result<Vec<CatalogItem>> {
        let mut builder = QueryBuilder::<Postgres>::new(SELECT_ITEMS);
        push_where(&mut builder, &query.predicates);

        let direction = match query.sort.direction {
            Direction::Asc => " ASC",
            Direction::Desc => " DESC",
        };
        builder
            .push(" ORDER BY ")
            .push(query.sort.field.column())
            .push(direction)
            .push(", id DESC LIMIT ")
            .push_bind(query.pagination.limit)
            .push(" OFFSET ")
            .push_bind(query.pagination.offset);

        let rows = builder
            .build_query_as::<CatalogItemRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SearchError::Fetch(e.to_string()))?;

        Ok(rows.into_iter().map(CatalogItem::from).collect())
    }

    async fn count_items(&self, predicates: &PredicateSet) -> Result<i64> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM catalog_items");
        push_where(&mut builder, predicates);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| SearchError::Fetch(e.to_string()))?;

        Ok(count)
    }

    async fn get_item(&self, id: ItemId) -> Result<Option<CatalogItem>> {
        let sql = format!("{SELECT_ITEMS} WHERE id = $1");
        let row = sqlx::query_as::<_, CatalogItemRow>(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(CatalogItem::from))
    }

    async fn list_items(&self, offset: i64, limit: i64) -> Result<Vec<CatalogItem>> {
        let sql = format!("{SELECT_ITEMS} ORDER BY id LIMIT $1 OFFSET $2");
        let rows = sqlx::query_as::<_, CatalogItemRow>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(CatalogItem::from).collect())
    }

    async fn update_compatibility(
        &self,
        id: ItemId,
        compatibility: &[VehicleDescriptor],
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE catalog_items
            SET compatibility = $1, updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(Json(compatibility.to_vec()))
        .bind(id.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn push_where(builder: &mut QueryBuilder<'_, Postgres>, predicates: &PredicateSet) {
    for (i, predicate) in predicates.predicates().iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        push_predicate(builder, predicate);
    }
}

fn push_predicate(builder: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate) {
    match predicate {
        Predicate::Eq(field, value) => {
            builder.push(field.column()).push(" = ");
            push_value(builder, value);
        }
        Predicate::Range { field, min, max } => {
            builder.push("(TRUE");
            if let Some(min) = min {
                builder.push(" AND ").push(field.column()).push(" >= ");
                push_value(builder, min);
            }
            if let Some(max) = max {
                builder.push(" AND ").push(field.column()).push(" <= ");
                push_value(builder, max);
            }
            builder.push(")");
        }
        Predicate::Pattern(field, needle) => {
            builder
                .push(field.column())
                .push(" ILIKE ")
                .push_bind(format!("%{}%", escape_like(needle)));
        }
        Predicate::Contains(field, needle) => {
            builder
                .push(field.column())
                .push(" @> ")
                .push_bind(Json(needle.clone()));
        }
        Predicate::Or(alternatives) => push_group(builder, alternatives, " OR ", "FALSE"),
        Predicate::And(all) => push_group(builder, all, " AND ", "TRUE"),
    }
}

fn push_group(
    builder: &mut QueryBuilder<'_, Postgres>,
    predicates: &[Predicate],
    separator: &str,
    empty: &str,
) {
    if predicates.is_empty() {
        builder.push(empty);
        return;
    }

    builder.push("(");
    for (i, predicate) in predicates.iter().enumerate() {
        if i > 0 {
            builder.push(separator);
        }
        push_predicate(builder, predicate);
    }
    builder.push(")");
}

fn push_value(builder: &mut QueryBuilder<'_, Postgres>, value: &Value) {
    match value {
        Value::Text(v) => builder.push_bind(v.clone()),
        Value::Float(v) => builder.push_bind(*v),
        Value::Int(v) => builder.push_bind(*v),
        Value::Bool(v) => builder.push_bind(*v),
    };
}

/// Escape LIKE wildcards so user text matches literally.
fn escape_like(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[derive(sqlx::FromRow)]
struct CatalogItemRow {
    id: i64,
    name: String,
    description: Option<String>,
    short_description: Option<String>,
    sku: Option<String>,
    part_number: Option<String>,
    category: Option<String>,
    brand: Option<String>,
    dealer_id: Option<String>,
    supplier_id: Option<String>,
    item_condition: Option<String>,
    price: f64,
    stock_quantity: i32,
    is_active: bool,
    approval_status: String,
    compatibility: Json<Vec<VehicleDescriptor>>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<CatalogItemRow> for CatalogItem {
    fn from(row: CatalogItemRow) -> Self {
        CatalogItem {
            id: ItemId::new(row.id),
            name: row.name,
            description: row.description,
            short_description: row.short_description,
            sku: row.sku,
            part_number: row.part_number,
            category: row.category,
            brand: row.brand,
            dealer_id: row.dealer_id,
            supplier_id: row.supplier_id,
            condition: row.item_condition,
            price: row.price,
            stock_quantity: row.stock_quantity,
            is_active: row.is_active,
            approval_status: row.approval_status,
            compatibility: row.compatibility.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
