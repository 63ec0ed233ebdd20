// Repair type repository implementation

use crate::db::repositories::category::RepairCategoryRepository;
use crate::db::repositories::queries::repair_type_queries;
use crate::db::DbPool;
use crate::errors::DatabaseError;
use crate::models::{RepairType, RepairTypeInput};
use chrono::Utc;
use sqlx::PgConnection;
use tracing::instrument;
use uuid::Uuid;

/// Repository for repair types
///
/// Shared types have no owner and are visible to everyone; a user's own
/// types are visible and editable only by that user.
#[derive(Clone)]
pub struct RepairTypeRepository {
    pool: DbPool,
}

impl RepairTypeRepository {
    /// Create a new RepairTypeRepository
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Repair types created by `owner_id`, ordered by name
    #[instrument(skip(self))]
    pub async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<RepairType>, DatabaseError> {
        let query = format!(
            "SELECT {} FROM repair_types WHERE owner_id = $1 ORDER BY name",
            repair_type_queries::SELECT_ALL_COLUMNS
        );
        let repair_types = sqlx::query_as::<_, RepairType>(&query)
            .bind(owner_id)
            .fetch_all(self.pool.pool())
            .await?;

        Ok(repair_types)
    }

    /// Shared repair types plus those owned by `owner_id`
    #[instrument(skip(self))]
    pub async fn find_visible(&self, owner_id: Uuid) -> Result<Vec<RepairType>, DatabaseError> {
        let query = format!(
            r#"
            SELECT {} FROM repair_types
            WHERE owner_id IS NULL OR owner_id = $1
            ORDER BY name
            "#,
            repair_type_queries::SELECT_ALL_COLUMNS
        );
        let repair_types = sqlx::query_as::<_, RepairType>(&query)
            .bind(owner_id)
            .fetch_all(self.pool.pool())
            .await?;

        Ok(repair_types)
    }

    #[instrument(skip(self))]
    pub async fn find_visible_by_id(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<RepairType>, DatabaseError> {
        let query = format!(
            r#"
            SELECT {} FROM repair_types
            WHERE id = $1 AND (owner_id IS NULL OR owner_id = $2)
            "#,
            repair_type_queries::SELECT_ALL_COLUMNS
        );
        let repair_type = sqlx::query_as::<_, RepairType>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(self.pool.pool())
            .await?;

        Ok(repair_type)
    }

    /// Number of distinct ids in `ids` that `owner_id` may attach to a work
    #[instrument(skip(self, ids), fields(requested = ids.len()))]
    pub async fn count_visible(&self, owner_id: Uuid, ids: &[Uuid]) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM repair_types
            WHERE id = ANY($1) AND (owner_id IS NULL OR owner_id = $2)
            "#,
        )
        .bind(ids)
        .bind(owner_id)
        .fetch_one(self.pool.pool())
        .await?;

        Ok(count)
    }

    #[instrument(skip(self))]
    pub async fn count_by_owner(&self, owner_id: Uuid) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM repair_types WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_one(self.pool.pool())
            .await?;

        Ok(count)
    }

    /// Create a repair type owned by `owner_id`
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(
        &self,
        owner_id: Uuid,
        input: &RepairTypeInput,
    ) -> Result<RepairType, DatabaseError> {
        let query = format!(
            r#"
            INSERT INTO repair_types (
                id, category_id, name, description, typical_duration,
                complexity, owner_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            repair_type_queries::SELECT_ALL_COLUMNS
        );
        let repair_type = sqlx::query_as::<_, RepairType>(&query)
            .bind(Uuid::new_v4())
            .bind(input.category_id)
            .bind(input.name.trim())
            .bind(&input.description)
            .bind(&input.typical_duration)
            .bind(&input.complexity)
            .bind(owner_id)
            .bind(Utc::now())
            .fetch_one(self.pool.pool())
            .await?;

        tracing::info!(repair_type_id = %repair_type.id, owner_id = %owner_id, "Repair type created");
        Ok(repair_type)
    }

    /// Replace the fields of a repair type owned by `owner_id`
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn update(
        &self,
        id: Uuid,
        owner_id: Uuid,
        input: &RepairTypeInput,
    ) -> Result<RepairType, DatabaseError> {
        let query = format!(
            r#"
            UPDATE repair_types
            SET category_id = $3,
                name = $4,
                description = $5,
                typical_duration = $6,
                complexity = $7
            WHERE id = $1 AND owner_id = $2
            RETURNING {}
            "#,
            repair_type_queries::SELECT_ALL_COLUMNS
        );
        let repair_type = sqlx::query_as::<_, RepairType>(&query)
            .bind(id)
            .bind(owner_id)
            .bind(input.category_id)
            .bind(input.name.trim())
            .bind(&input.description)
            .bind(&input.typical_duration)
            .bind(&input.complexity)
            .fetch_optional(self.pool.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Repair type not found: {}", id)))?;

        tracing::info!(repair_type_id = %id, owner_id = %owner_id, "Repair type updated");
        Ok(repair_type)
    }

    /// Delete a repair type owned by `owner_id`
    ///
    /// Fails with `StillReferenced` while any work is linked to it.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid, owner_id: Uuid) -> Result<(), DatabaseError> {
        let in_use: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM work_repair_types WHERE repair_type_id = $1)",
        )
        .bind(id)
        .fetch_one(self.pool.pool())
        .await?;

        if in_use {
            return Err(DatabaseError::StillReferenced(format!(
                "Repair type {} is used by completed works",
                id
            )));
        }

        let result = sqlx::query("DELETE FROM repair_types WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(self.pool.pool())
            .await
            .map_err(|e| match DatabaseError::from(e) {
                // A link inserted between the check and the delete
                DatabaseError::ForeignKeyViolation(msg) => DatabaseError::StillReferenced(msg),
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!(
                "Repair type not found: {}",
                id
            )));
        }

        tracing::info!(repair_type_id = %id, owner_id = %owner_id, "Repair type deleted");
        Ok(())
    }

    /// Resolve a repair type by name for `owner_id`, creating it when absent
    ///
    /// The user's own type wins over a shared one with the same name. New
    /// types are owned by the user and filed under the default category.
    #[instrument(skip(conn))]
    pub async fn resolve_or_create_in(
        conn: &mut PgConnection,
        owner_id: Uuid,
        name: &str,
        fallback_category_name: &str,
    ) -> Result<RepairType, DatabaseError> {
        let lookup = format!(
            r#"
            SELECT {} FROM repair_types
            WHERE name = $1 AND (owner_id = $2 OR owner_id IS NULL)
            ORDER BY owner_id NULLS LAST
            LIMIT 1
            "#,
            repair_type_queries::SELECT_ALL_COLUMNS
        );
        if let Some(existing) = sqlx::query_as::<_, RepairType>(&lookup)
            .bind(name)
            .bind(owner_id)
            .fetch_optional(&mut *conn)
            .await?
        {
            return Ok(existing);
        }

        let category =
            RepairCategoryRepository::default_category_in(&mut *conn, fallback_category_name)
                .await?;

        sqlx::query(
            r#"
            INSERT INTO repair_types (
                id, category_id, name, description, typical_duration,
                complexity, owner_id, created_at
            )
            VALUES ($1, $2, $3, '', '', '', $4, $5)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(category.id)
        .bind(name)
        .bind(owner_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        let owned = format!(
            "SELECT {} FROM repair_types WHERE name = $1 AND owner_id = $2",
            repair_type_queries::SELECT_ALL_COLUMNS
        );
        let repair_type = sqlx::query_as::<_, RepairType>(&owned)
            .bind(name)
            .bind(owner_id)
            .fetch_one(&mut *conn)
            .await?;

        tracing::debug!(repair_type_id = %repair_type.id, name = %name, "Repair type created on import");
        Ok(repair_type)
    }
}
