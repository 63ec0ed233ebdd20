// Shared reference data: car brands, car models and repair categories

use axum::{
    extract::{Path, Query, State},
    Json,
};
use common::db::repositories::{CarBrandRepository, CarModelRepository, RepairCategoryRepository};
use common::errors::ValidationError;
use common::models::{
    CarBrand, CarModel, NewCarBrand, NewCarModel, NewRepairCategory, RepairCategory,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::handlers::{ErrorResponse, SuccessResponse};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CarModelQuery {
    pub brand_id: Option<Uuid>,
}

fn require_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::MissingField("name".to_string()));
    }
    Ok(())
}

/// `#rrggbb` display color
fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[tracing::instrument(skip(state))]
pub async fn list_brands(
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<Vec<CarBrand>>>, ErrorResponse> {
    let brands = CarBrandRepository::new(state.db_pool.clone())
        .find_all()
        .await?;

    Ok(Json(SuccessResponse::new(brands)))
}

#[tracing::instrument(skip(state))]
pub async fn get_brand(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse<CarBrand>>, ErrorResponse> {
    let brand = CarBrandRepository::new(state.db_pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| ErrorResponse::new("not_found", format!("Car brand not found: {}", id)))?;

    Ok(Json(SuccessResponse::new(brand)))
}

/// Create a car brand (superusers only)
#[tracing::instrument(skip(state, req), fields(name = %req.name))]
pub async fn create_brand(
    State(state): State<AppState>,
    Json(req): Json<NewCarBrand>,
) -> Result<Json<SuccessResponse<CarBrand>>, ErrorResponse> {
    require_name(&req.name)?;

    let brand = CarBrandRepository::new(state.db_pool.clone())
        .create(&req)
        .await?;

    Ok(Json(SuccessResponse::new(brand)))
}

#[tracing::instrument(skip(state))]
pub async fn list_models(
    State(state): State<AppState>,
    Query(query): Query<CarModelQuery>,
) -> Result<Json<SuccessResponse<Vec<CarModel>>>, ErrorResponse> {
    let models = CarModelRepository::new(state.db_pool.clone())
        .find_all(query.brand_id)
        .await?;

    Ok(Json(SuccessResponse::new(models)))
}

#[tracing::instrument(skip(state))]
pub async fn get_model(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse<CarModel>>, ErrorResponse> {
    let model = CarModelRepository::new(state.db_pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| ErrorResponse::new("not_found", format!("Car model not found: {}", id)))?;

    Ok(Json(SuccessResponse::new(model)))
}

/// Create a car model under an existing brand (superusers only)
#[tracing::instrument(skip(state, req), fields(name = %req.name, brand_id = %req.brand_id))]
pub async fn create_model(
    State(state): State<AppState>,
    Json(req): Json<NewCarModel>,
) -> Result<Json<SuccessResponse<CarModel>>, ErrorResponse> {
    require_name(&req.name)?;

    CarBrandRepository::new(state.db_pool.clone())
        .find_by_id(req.brand_id)
        .await?
        .ok_or_else(|| ErrorResponse::new("validation_error", "Car brand not found"))?;

    let model = CarModelRepository::new(state.db_pool.clone())
        .create(&req)
        .await?;

    Ok(Json(SuccessResponse::new(model)))
}

#[tracing::instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<Vec<RepairCategory>>>, ErrorResponse> {
    let categories = RepairCategoryRepository::new(state.db_pool.clone())
        .find_all()
        .await?;

    Ok(Json(SuccessResponse::new(categories)))
}

/// Create a repair category (superusers only)
#[tracing::instrument(skip(state, req), fields(name = %req.name))]
pub async fn create_category(
    State(state): State<AppState>,
    Json(req): Json<NewRepairCategory>,
) -> Result<Json<SuccessResponse<RepairCategory>>, ErrorResponse> {
    require_name(&req.name)?;
    if !is_hex_color(&req.color) {
        return Err(ValidationError::invalid("color", "expected #rrggbb").into());
    }

    let category = RepairCategoryRepository::new(state.db_pool.clone())
        .create(&req)
        .await?;

    Ok(Json(SuccessResponse::new(category)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_color_validation() {
        assert!(is_hex_color("#6c757d"));
        assert!(is_hex_color("#FFAA00"));
        assert!(!is_hex_color("6c757d"));
        assert!(!is_hex_color("#6c757"));
        assert!(!is_hex_color("#zzzzzz"));
    }

    #[test]
    fn test_blank_name_is_missing() {
        assert!(matches!(
            require_name("   "),
            Err(ValidationError::MissingField(_))
        ));
        assert!(require_name("Toyota").is_ok());
    }

    #[test]
    fn test_new_category_defaults_color() {
        let req: NewRepairCategory = serde_json::from_str(r#"{"name": "Engine"}"#).unwrap();
        assert_eq!(req.color, common::models::DEFAULT_CATEGORY_COLOR);
    }
}
