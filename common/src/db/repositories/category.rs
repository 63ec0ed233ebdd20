// Repair category repository implementation

use crate::db::repositories::queries::category_queries;
use crate::db::DbPool;
use crate::errors::DatabaseError;
use crate::models::{NewRepairCategory, RepairCategory, DEFAULT_CATEGORY_COLOR};
use chrono::Utc;
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Repository for repair categories
#[derive(Clone)]
pub struct RepairCategoryRepository {
    pool: DbPool,
}

impl RepairCategoryRepository {
    /// Create a new RepairCategoryRepository
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self))]
    pub async fn find_all(&self) -> Result<Vec<RepairCategory>, DatabaseError> {
        let query = format!(
            "SELECT {} FROM repair_categories ORDER BY name",
            category_queries::SELECT_ALL_COLUMNS
        );
        let categories = sqlx::query_as::<_, RepairCategory>(&query)
            .fetch_all(self.pool.pool())
            .await?;

        Ok(categories)
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<RepairCategory>, DatabaseError> {
        let query = format!(
            "SELECT {} FROM repair_categories WHERE id = $1",
            category_queries::SELECT_ALL_COLUMNS
        );
        let category = sqlx::query_as::<_, RepairCategory>(&query)
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await?;

        Ok(category)
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: &NewRepairCategory) -> Result<RepairCategory, DatabaseError> {
        let query = format!(
            r#"
            INSERT INTO repair_categories (id, name, color, description, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            category_queries::SELECT_ALL_COLUMNS
        );
        let category = sqlx::query_as::<_, RepairCategory>(&query)
            .bind(Uuid::new_v4())
            .bind(input.name.trim())
            .bind(&input.color)
            .bind(&input.description)
            .bind(Utc::now())
            .fetch_one(self.pool.pool())
            .await?;

        tracing::info!(category_id = %category.id, name = %category.name, "Repair category created");
        Ok(category)
    }

    /// Category for repair types created on the fly
    ///
    /// Returns the oldest existing category, or creates `fallback_name` when
    /// the table is empty.
    #[instrument(skip(conn))]
    pub async fn default_category_in(
        conn: &mut PgConnection,
        fallback_name: &str,
    ) -> Result<RepairCategory, DatabaseError> {
        let query = format!(
            "SELECT {} FROM repair_categories ORDER BY created_at, name LIMIT 1",
            category_queries::SELECT_ALL_COLUMNS
        );
        if let Some(category) = sqlx::query_as::<_, RepairCategory>(&query)
            .fetch_optional(&mut *conn)
            .await?
        {
            return Ok(category);
        }

        sqlx::query(
            r#"
            INSERT INTO repair_categories (id, name, color, description, created_at)
            VALUES ($1, $2, $3, '', $4)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(fallback_name)
        .bind(DEFAULT_CATEGORY_COLOR)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        let query = format!(
            "SELECT {} FROM repair_categories WHERE name = $1",
            category_queries::SELECT_ALL_COLUMNS
        );
        let category = sqlx::query_as::<_, RepairCategory>(&query)
            .bind(fallback_name)
            .fetch_one(&mut *conn)
            .await?;

        tracing::info!(category_id = %category.id, name = %category.name, "Default repair category created");
        Ok(category)
    }
}
