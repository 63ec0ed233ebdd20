// Car brand repository implementation

use crate::db::repositories::queries::brand_queries;
use crate::db::DbPool;
use crate::errors::DatabaseError;
use crate::models::{CarBrand, NewCarBrand};
use chrono::Utc;
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Repository for shared car brand records
#[derive(Clone)]
pub struct CarBrandRepository {
    pool: DbPool,
}

impl CarBrandRepository {
    /// Create a new CarBrandRepository
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// List all brands ordered by name
    #[instrument(skip(self))]
    pub async fn find_all(&self) -> Result<Vec<CarBrand>, DatabaseError> {
        let query = format!(
            "SELECT {} FROM car_brands ORDER BY name",
            brand_queries::SELECT_ALL_COLUMNS
        );
        let brands = sqlx::query_as::<_, CarBrand>(&query)
            .fetch_all(self.pool.pool())
            .await?;

        Ok(brands)
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<CarBrand>, DatabaseError> {
        let query = format!(
            "SELECT {} FROM car_brands WHERE id = $1",
            brand_queries::SELECT_ALL_COLUMNS
        );
        let brand = sqlx::query_as::<_, CarBrand>(&query)
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await?;

        Ok(brand)
    }

    /// Create a brand; a duplicate name yields `DuplicateKey`
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: &NewCarBrand) -> Result<CarBrand, DatabaseError> {
        let query = format!(
            r#"
            INSERT INTO car_brands (id, name, description, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            brand_queries::SELECT_ALL_COLUMNS
        );
        let brand = sqlx::query_as::<_, CarBrand>(&query)
            .bind(Uuid::new_v4())
            .bind(input.name.trim())
            .bind(&input.description)
            .bind(Utc::now())
            .fetch_one(self.pool.pool())
            .await?;

        tracing::info!(brand_id = %brand.id, name = %brand.name, "Car brand created");
        Ok(brand)
    }

    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM car_brands")
            .fetch_one(self.pool.pool())
            .await?;

        Ok(count)
    }

    /// Find a brand by exact name, inserting it when absent
    ///
    /// A concurrent insert of the same name is absorbed by the unique
    /// constraint and the existing row is returned.
    #[instrument(skip(conn))]
    pub async fn get_or_create_in(
        conn: &mut PgConnection,
        name: &str,
    ) -> Result<CarBrand, DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO car_brands (id, name, description, created_at)
            VALUES ($1, $2, '', $3)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        let query = format!(
            "SELECT {} FROM car_brands WHERE name = $1",
            brand_queries::SELECT_ALL_COLUMNS
        );
        let brand = sqlx::query_as::<_, CarBrand>(&query)
            .bind(name)
            .fetch_one(&mut *conn)
            .await?;

        Ok(brand)
    }
}
