// Car model repository implementation

use crate::db::repositories::queries::car_model_queries;
use crate::db::DbPool;
use crate::errors::DatabaseError;
use crate::models::{CarModel, NewCarModel};
use chrono::Utc;
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Repository for car models, each scoped to one brand
#[derive(Clone)]
pub struct CarModelRepository {
    pool: DbPool,
}

impl CarModelRepository {
    /// Create a new CarModelRepository
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// List models ordered by name, optionally restricted to one brand
    #[instrument(skip(self))]
    pub async fn find_all(&self, brand_id: Option<Uuid>) -> Result<Vec<CarModel>, DatabaseError> {
        let models = match brand_id {
            Some(brand_id) => {
                let query = format!(
                    "SELECT {} FROM car_models WHERE brand_id = $1 ORDER BY name",
                    car_model_queries::SELECT_ALL_COLUMNS
                );
                sqlx::query_as::<_, CarModel>(&query)
                    .bind(brand_id)
                    .fetch_all(self.pool.pool())
                    .await?
            }
            None => {
                let query = format!(
                    "SELECT {} FROM car_models ORDER BY name",
                    car_model_queries::SELECT_ALL_COLUMNS
                );
                sqlx::query_as::<_, CarModel>(&query)
                    .fetch_all(self.pool.pool())
                    .await?
            }
        };

        Ok(models)
    }

    #[instrument(skip(self))]
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<CarModel>, DatabaseError> {
        let query = format!(
            "SELECT {} FROM car_models WHERE id = $1",
            car_model_queries::SELECT_ALL_COLUMNS
        );
        let model = sqlx::query_as::<_, CarModel>(&query)
            .bind(id)
            .fetch_optional(self.pool.pool())
            .await?;

        Ok(model)
    }

    /// Create a model under an existing brand
    ///
    /// An unknown brand surfaces as `ForeignKeyViolation`, a name already
    /// used within the brand as `DuplicateKey`.
    #[instrument(skip(self, input), fields(brand_id = %input.brand_id, name = %input.name))]
    pub async fn create(&self, input: &NewCarModel) -> Result<CarModel, DatabaseError> {
        let query = format!(
            r#"
            INSERT INTO car_models (
                id, brand_id, name, production_years, engine_options, notes, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            car_model_queries::SELECT_ALL_COLUMNS
        );
        let model = sqlx::query_as::<_, CarModel>(&query)
            .bind(Uuid::new_v4())
            .bind(input.brand_id)
            .bind(input.name.trim())
            .bind(&input.production_years)
            .bind(&input.engine_options)
            .bind(&input.notes)
            .bind(Utc::now())
            .fetch_one(self.pool.pool())
            .await?;

        tracing::info!(model_id = %model.id, brand_id = %model.brand_id, name = %model.name, "Car model created");
        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn count(&self) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM car_models")
            .fetch_one(self.pool.pool())
            .await?;

        Ok(count)
    }

    /// Find a model by name under `brand_id`, inserting it when absent
    #[instrument(skip(conn))]
    pub async fn get_or_create_in(
        conn: &mut PgConnection,
        brand_id: Uuid,
        name: &str,
    ) -> Result<CarModel, DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO car_models (
                id, brand_id, name, production_years, engine_options, notes, created_at
            )
            VALUES ($1, $2, $3, '', '', '', $4)
            ON CONFLICT (brand_id, name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(brand_id)
        .bind(name)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        let query = format!(
            "SELECT {} FROM car_models WHERE brand_id = $1 AND name = $2",
            car_model_queries::SELECT_ALL_COLUMNS
        );
        let model = sqlx::query_as::<_, CarModel>(&query)
            .bind(brand_id)
            .bind(name)
            .fetch_one(&mut *conn)
            .await?;

        Ok(model)
    }
}
