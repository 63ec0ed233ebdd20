// SQL query constants and fragments shared by the repositories

use crate::models::WorkFilter;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

/// SQL query fragments for car_brands table
pub mod brand_queries {
    pub const SELECT_ALL_COLUMNS: &str = "id, name, description, created_at";
}

/// SQL query fragments for car_models table
pub mod car_model_queries {
    pub const SELECT_ALL_COLUMNS: &str =
        "id, brand_id, name, production_years, engine_options, notes, created_at";
}

/// SQL query fragments for repair_categories table
pub mod category_queries {
    pub const SELECT_ALL_COLUMNS: &str = "id, name, color, description, created_at";
}

/// SQL query fragments for repair_types table
pub mod repair_type_queries {
    pub const SELECT_ALL_COLUMNS: &str = r#"id, category_id, name, description,
        typical_duration, complexity, owner_id, created_at"#;
}

/// SQL query fragments for users table
pub mod user_queries {
    pub const SELECT_ALL_COLUMNS: &str =
        "id, username, password_hash, email, is_superuser, enabled, created_at, updated_at";
}

/// SQL query fragments for completed_works and its joins
pub mod work_queries {
    /// Work columns joined with brand, model and owner, aliased for `WorkRow`
    pub const SELECT_JOINED: &str = r#"
        SELECT
            w.id, w.slug, w.work_date, w.cost, w.notes, w.parts_used, w.created_at,
            b.id AS brand_id, b.name AS brand_name, b.description AS brand_description,
            b.created_at AS brand_created_at,
            m.id AS model_id, m.name AS model_name, m.production_years AS model_production_years,
            m.engine_options AS model_engine_options, m.notes AS model_notes,
            m.created_at AS model_created_at,
            u.id AS user_id, u.username AS user_username, u.email AS user_email
        FROM completed_works w
        INNER JOIN car_brands b ON b.id = w.car_brand_id
        INNER JOIN car_models m ON m.id = w.car_model_id
        INNER JOIN users u ON u.id = w.owner_id
    "#;

    /// Repair types with categories for a batch of works, in attachment order
    pub const SELECT_REPAIR_TYPES_FOR_WORKS: &str = r#"
        SELECT
            wrt.work_id,
            rt.id, rt.category_id, rt.name, rt.description, rt.typical_duration,
            rt.complexity, rt.owner_id, rt.created_at,
            c.name AS category_name, c.color AS category_color,
            c.description AS category_description, c.created_at AS category_created_at
        FROM work_repair_types wrt
        INNER JOIN repair_types rt ON rt.id = wrt.repair_type_id
        INNER JOIN repair_categories c ON c.id = rt.category_id
        WHERE wrt.work_id = ANY($1)
        ORDER BY wrt.work_id, wrt.position
    "#;
}

/// Escape LIKE metacharacters and wrap the term for a substring match
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Append the owner scope and every set filter field as a WHERE clause
///
/// Expects the builder to hold a query over `completed_works w`.
pub fn push_work_filter(builder: &mut QueryBuilder<'_, Postgres>, owner_id: Uuid, filter: &WorkFilter) {
    builder.push(" WHERE w.owner_id = ");
    builder.push_bind(owner_id);

    if let Some(work_date) = filter.work_date {
        builder.push(" AND w.work_date = ");
        builder.push_bind(work_date);
    }
    if let Some(brand_id) = filter.car_brand_id {
        builder.push(" AND w.car_brand_id = ");
        builder.push_bind(brand_id);
    }
    if let Some(model_id) = filter.car_model_id {
        builder.push(" AND w.car_model_id = ");
        builder.push_bind(model_id);
    }
    if let Some(date_from) = filter.date_from {
        builder.push(" AND w.work_date >= ");
        builder.push_bind(date_from);
    }
    if let Some(date_to) = filter.date_to {
        builder.push(" AND w.work_date <= ");
        builder.push_bind(date_to);
    }
    if let Some(term) = filter.search_term() {
        let pattern = like_pattern(term);
        builder.push(" AND (w.notes ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR w.parts_used ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("oil"), "%oil%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_push_work_filter_only_owner() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 FROM completed_works w");
        push_work_filter(&mut builder, Uuid::new_v4(), &WorkFilter::default());
        assert_eq!(
            builder.sql(),
            "SELECT 1 FROM completed_works w WHERE w.owner_id = $1"
        );
    }

    #[test]
    fn test_push_work_filter_numbers_binds_in_order() {
        let filter = WorkFilter {
            car_brand_id: Some(Uuid::new_v4()),
            date_from: NaiveDate::from_ymd_opt(2024, 1, 1),
            search: Some("filter".to_string()),
            ..WorkFilter::default()
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 FROM completed_works w");
        push_work_filter(&mut builder, Uuid::new_v4(), &filter);
        let sql = builder.sql();
        assert!(sql.contains("w.car_brand_id = $2"));
        assert!(sql.contains("w.work_date >= $3"));
        assert!(sql.contains("w.notes ILIKE $4 OR w.parts_used ILIKE $5"));
    }
}
