// Completed work repository implementation

use crate::db::repositories::brand::CarBrandRepository;
use crate::db::repositories::car_model::CarModelRepository;
use crate::db::repositories::queries::{push_work_filter, work_queries};
use crate::db::repositories::repair_type::RepairTypeRepository;
use crate::db::DbPool;
use crate::errors::DatabaseError;
use crate::import::parser::ParsedRow;
use crate::import::ImportStore;
use crate::models::{
    CarBrand, CarModel, NewCompletedWork, Page, Pagination, RepairCategory, RepairType,
    RepairTypeDetail, UserSummary, WorkFilter, WorkRecord, WorkTotals,
};
use crate::slug::{slug_candidate, work_slug, MAX_SLUG_ATTEMPTS};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::instrument;
use uuid::Uuid;

/// Joined work row as selected by `work_queries::SELECT_JOINED`
#[derive(Debug, FromRow)]
struct WorkRow {
    id: Uuid,
    slug: String,
    work_date: NaiveDate,
    cost: Decimal,
    notes: String,
    parts_used: String,
    created_at: DateTime<Utc>,
    brand_id: Uuid,
    brand_name: String,
    brand_description: String,
    brand_created_at: DateTime<Utc>,
    model_id: Uuid,
    model_name: String,
    model_production_years: String,
    model_engine_options: String,
    model_notes: String,
    model_created_at: DateTime<Utc>,
    user_id: Uuid,
    user_username: String,
    user_email: Option<String>,
}

/// Repair type link row as selected by `work_queries::SELECT_REPAIR_TYPES_FOR_WORKS`
#[derive(Debug, FromRow)]
struct WorkRepairTypeRow {
    work_id: Uuid,
    id: Uuid,
    category_id: Uuid,
    name: String,
    description: String,
    typical_duration: String,
    complexity: String,
    owner_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    category_name: String,
    category_color: String,
    category_description: String,
    category_created_at: DateTime<Utc>,
}

impl From<WorkRepairTypeRow> for RepairTypeDetail {
    fn from(row: WorkRepairTypeRow) -> Self {
        RepairTypeDetail {
            repair_type: RepairType {
                id: row.id,
                category_id: row.category_id,
                name: row.name,
                description: row.description,
                typical_duration: row.typical_duration,
                complexity: row.complexity,
                owner_id: row.owner_id,
                created_at: row.created_at,
            },
            category: RepairCategory {
                id: row.category_id,
                name: row.category_name,
                color: row.category_color,
                description: row.category_description,
                created_at: row.category_created_at,
            },
        }
    }
}

impl WorkRow {
    fn into_record(self, repair_types: Vec<RepairTypeDetail>) -> WorkRecord {
        WorkRecord {
            id: self.id,
            slug: self.slug,
            work_date: self.work_date,
            car_brand: CarBrand {
                id: self.brand_id,
                name: self.brand_name,
                description: self.brand_description,
                created_at: self.brand_created_at,
            },
            car_model: CarModel {
                id: self.model_id,
                brand_id: self.brand_id,
                name: self.model_name,
                production_years: self.model_production_years,
                engine_options: self.model_engine_options,
                notes: self.model_notes,
                created_at: self.model_created_at,
            },
            repair_types,
            cost: self.cost,
            notes: self.notes,
            parts_used: self.parts_used,
            user: UserSummary {
                id: self.user_id,
                username: self.user_username,
                email: self.user_email,
            },
            created_at: self.created_at,
        }
    }
}

/// Values written for one new work, shared by API creation and import
struct WorkInsert<'a> {
    owner_id: Uuid,
    brand: &'a CarBrand,
    model: &'a CarModel,
    repair_type_ids: &'a [Uuid],
    work_date: NaiveDate,
    cost: Decimal,
    notes: &'a str,
    parts_used: &'a str,
}

/// Repository for completed works
#[derive(Clone)]
pub struct WorkRepository {
    pool: DbPool,
}

impl WorkRepository {
    /// Create a new WorkRepository
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create a work owned by `owner_id`
    ///
    /// The caller has checked that the model belongs to the brand and that
    /// every repair type is visible to the owner.
    #[instrument(skip(self, input), fields(owner_id = %owner_id))]
    pub async fn create(
        &self,
        owner_id: Uuid,
        input: &NewCompletedWork,
    ) -> Result<WorkRecord, DatabaseError> {
        let brand = CarBrandRepository::new(self.pool.clone())
            .find_by_id(input.car_brand_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Car brand not found: {}", input.car_brand_id)))?;
        let model = CarModelRepository::new(self.pool.clone())
            .find_by_id(input.car_model_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Car model not found: {}", input.car_model_id)))?;

        let mut tx = self.pool.pool().begin().await?;
        let work_id = Self::insert_in(
            &mut tx,
            WorkInsert {
                owner_id,
                brand: &brand,
                model: &model,
                repair_type_ids: &input.repair_type_ids,
                work_date: input.work_date,
                cost: input.cost,
                notes: &input.notes,
                parts_used: &input.parts_used,
            },
        )
        .await?;
        tx.commit().await?;

        self.find_by_id(owner_id, work_id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Work not found: {}", work_id)))
    }

    /// Insert the work row and its ordered repair type links
    async fn insert_in(conn: &mut PgConnection, work: WorkInsert<'_>) -> Result<Uuid, DatabaseError> {
        let slug = Self::unique_slug_in(
            &mut *conn,
            &work_slug(&work.brand.name, &work.model.name, work.work_date),
        )
        .await?;
        let work_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO completed_works (
                id, slug, work_date, car_brand_id, car_model_id, cost,
                notes, parts_used, owner_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(work_id)
        .bind(&slug)
        .bind(work.work_date)
        .bind(work.brand.id)
        .bind(work.model.id)
        .bind(work.cost)
        .bind(work.notes)
        .bind(work.parts_used)
        .bind(work.owner_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        let mut seen = Vec::with_capacity(work.repair_type_ids.len());
        for repair_type_id in work.repair_type_ids {
            if seen.contains(repair_type_id) {
                continue;
            }
            sqlx::query(
                r#"
                INSERT INTO work_repair_types (work_id, repair_type_id, position)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(work_id)
            .bind(repair_type_id)
            .bind(seen.len() as i32)
            .execute(&mut *conn)
            .await?;
            seen.push(*repair_type_id);
        }

        tracing::info!(work_id = %work_id, slug = %slug, owner_id = %work.owner_id, "Completed work created");
        Ok(work_id)
    }

    /// First free slug among `base`, `base-1`, `base-2`, ...
    async fn unique_slug_in(conn: &mut PgConnection, base: &str) -> Result<String, DatabaseError> {
        for attempt in 0..MAX_SLUG_ATTEMPTS {
            let candidate = slug_candidate(base, attempt);
            let taken: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM completed_works WHERE slug = $1)")
                    .bind(&candidate)
                    .fetch_one(&mut *conn)
                    .await?;
            if !taken {
                return Ok(candidate);
            }
        }

        Err(DatabaseError::DuplicateKey(format!(
            "Could not generate unique slug for '{}' after {} attempts",
            base, MAX_SLUG_ATTEMPTS
        )))
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(
        &self,
        owner_id: Uuid,
        id: Uuid,
    ) -> Result<Option<WorkRecord>, DatabaseError> {
        let query = format!("{} WHERE w.id = $1 AND w.owner_id = $2", work_queries::SELECT_JOINED);
        let row = sqlx::query_as::<_, WorkRow>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(self.pool.pool())
            .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.into_iter().next()),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    pub async fn find_by_slug(
        &self,
        owner_id: Uuid,
        slug: &str,
    ) -> Result<Option<WorkRecord>, DatabaseError> {
        let query = format!(
            "{} WHERE w.slug = $1 AND w.owner_id = $2",
            work_queries::SELECT_JOINED
        );
        let row = sqlx::query_as::<_, WorkRow>(&query)
            .bind(slug)
            .bind(owner_id)
            .fetch_optional(self.pool.pool())
            .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.into_iter().next()),
            None => Ok(None),
        }
    }

    /// One page of the owner's works matching `filter`
    #[instrument(skip(self, filter))]
    pub async fn find_page(
        &self,
        owner_id: Uuid,
        filter: &WorkFilter,
        pagination: Pagination,
    ) -> Result<Page<WorkRecord>, DatabaseError> {
        let pagination = pagination.normalized();

        let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM completed_works w");
        push_work_filter(&mut count_query, owner_id, filter);
        let count: i64 = count_query
            .build_query_scalar()
            .fetch_one(self.pool.pool())
            .await?;

        let mut query = QueryBuilder::<Postgres>::new(work_queries::SELECT_JOINED);
        push_work_filter(&mut query, owner_id, filter);
        query.push(" ORDER BY ");
        query.push(filter.ordering.as_sql());
        query.push(" LIMIT ");
        query.push_bind(pagination.limit());
        query.push(" OFFSET ");
        query.push_bind(pagination.offset());

        let rows = query
            .build_query_as::<WorkRow>()
            .fetch_all(self.pool.pool())
            .await?;

        Ok(Page {
            count,
            page: pagination.page,
            page_size: pagination.page_size,
            results: self.hydrate(rows).await?,
        })
    }

    /// Every work of the owner matching `filter`, for analytics and export
    #[instrument(skip(self, filter))]
    pub async fn find_filtered(
        &self,
        owner_id: Uuid,
        filter: &WorkFilter,
    ) -> Result<Vec<WorkRecord>, DatabaseError> {
        let mut query = QueryBuilder::<Postgres>::new(work_queries::SELECT_JOINED);
        push_work_filter(&mut query, owner_id, filter);
        query.push(" ORDER BY ");
        query.push(filter.ordering.as_sql());

        let rows = query
            .build_query_as::<WorkRow>()
            .fetch_all(self.pool.pool())
            .await?;

        tracing::debug!(count = rows.len(), "Found works with filter");
        self.hydrate(rows).await
    }

    /// Most recent works of the owner, newest first
    #[instrument(skip(self))]
    pub async fn find_recent(
        &self,
        owner_id: Uuid,
        limit: i64,
    ) -> Result<Vec<WorkRecord>, DatabaseError> {
        let query = format!(
            "{} WHERE w.owner_id = $1 ORDER BY w.work_date DESC, w.created_at DESC LIMIT $2",
            work_queries::SELECT_JOINED
        );
        let rows = sqlx::query_as::<_, WorkRow>(&query)
            .bind(owner_id)
            .bind(limit)
            .fetch_all(self.pool.pool())
            .await?;

        self.hydrate(rows).await
    }

    /// Count and cost sum of the owner's works matching `filter`
    #[instrument(skip(self, filter))]
    pub async fn totals(
        &self,
        owner_id: Uuid,
        filter: &WorkFilter,
    ) -> Result<WorkTotals, DatabaseError> {
        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) AS count, COALESCE(SUM(w.cost), 0) AS total_cost FROM completed_works w",
        );
        push_work_filter(&mut query, owner_id, filter);

        let totals = query
            .build_query_as::<WorkTotals>()
            .fetch_one(self.pool.pool())
            .await?;

        Ok(totals)
    }

    /// Delete a work owned by `owner_id`
    #[instrument(skip(self))]
    pub async fn delete(&self, owner_id: Uuid, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM completed_works WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(self.pool.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Work not found: {}", id)));
        }

        tracing::info!(work_id = %id, owner_id = %owner_id, "Completed work deleted");
        Ok(())
    }

    /// Attach repair types with categories to joined rows, keeping row order
    async fn hydrate(&self, rows: Vec<WorkRow>) -> Result<Vec<WorkRecord>, DatabaseError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let links = sqlx::query_as::<_, WorkRepairTypeRow>(work_queries::SELECT_REPAIR_TYPES_FOR_WORKS)
            .bind(&ids)
            .fetch_all(self.pool.pool())
            .await?;

        let mut by_work: HashMap<Uuid, Vec<RepairTypeDetail>> = HashMap::new();
        for link in links {
            by_work.entry(link.work_id).or_default().push(link.into());
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let repair_types = by_work.remove(&row.id).unwrap_or_default();
                row.into_record(repair_types)
            })
            .collect())
    }
}

#[async_trait]
impl ImportStore for WorkRepository {
    /// Store one parsed row in its own transaction
    #[instrument(skip(self, row), fields(owner_id = %owner_id, brand = %row.brand, model = %row.model))]
    async fn import_row(
        &self,
        owner_id: Uuid,
        row: &ParsedRow,
        default_category_name: &str,
    ) -> Result<Uuid, DatabaseError> {
        let mut tx = self.pool.pool().begin().await?;

        let brand = CarBrandRepository::get_or_create_in(&mut tx, &row.brand).await?;
        let model = CarModelRepository::get_or_create_in(&mut tx, brand.id, &row.model).await?;

        let mut repair_type_ids = Vec::with_capacity(row.repair_types.len());
        for name in &row.repair_types {
            let repair_type =
                RepairTypeRepository::resolve_or_create_in(&mut tx, owner_id, name, default_category_name)
                    .await?;
            repair_type_ids.push(repair_type.id);
        }

        let work_id = Self::insert_in(
            &mut tx,
            WorkInsert {
                owner_id,
                brand: &brand,
                model: &model,
                repair_type_ids: &repair_type_ids,
                work_date: row.work_date,
                cost: row.cost,
                notes: &row.notes,
                parts_used: &row.parts_used,
            },
        )
        .await?;

        tx.commit().await?;
        Ok(work_id)
    }
}
