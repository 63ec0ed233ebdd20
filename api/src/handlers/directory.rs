// Read-only directory views combining reference data

use axum::{extract::State, Extension, Json};
use common::db::repositories::{
    CarBrandRepository, CarModelRepository, RepairCategoryRepository, RepairTypeRepository,
};
use common::models::{
    BrandWithModels, CarBrand, CarModel, CategoryWithRepairTypes, RepairCategory, RepairType,
    UserClaims,
};

use crate::handlers::{current_user_id, ErrorResponse, SuccessResponse};
use crate::state::AppState;

/// Attach each model to its brand; both inputs arrive sorted by name
fn group_models(brands: Vec<CarBrand>, models: Vec<CarModel>) -> Vec<BrandWithModels> {
    let mut grouped: Vec<BrandWithModels> = brands
        .into_iter()
        .map(|brand| BrandWithModels {
            brand,
            models: Vec::new(),
        })
        .collect();

    for model in models {
        if let Some(entry) = grouped.iter_mut().find(|b| b.brand.id == model.brand_id) {
            entry.models.push(model);
        }
    }
    grouped
}

fn group_repair_types(
    categories: Vec<RepairCategory>,
    repair_types: Vec<RepairType>,
) -> Vec<CategoryWithRepairTypes> {
    let mut grouped: Vec<CategoryWithRepairTypes> = categories
        .into_iter()
        .map(|category| CategoryWithRepairTypes {
            category,
            repair_types: Vec::new(),
        })
        .collect();

    for repair_type in repair_types {
        if let Some(entry) = grouped
            .iter_mut()
            .find(|c| c.category.id == repair_type.category_id)
        {
            entry.repair_types.push(repair_type);
        }
    }
    grouped
}

/// Brands with their models
#[tracing::instrument(skip(state))]
pub async fn car_models_directory(
    State(state): State<AppState>,
) -> Result<Json<SuccessResponse<Vec<BrandWithModels>>>, ErrorResponse> {
    let brands = CarBrandRepository::new(state.db_pool.clone())
        .find_all()
        .await?;
    let models = CarModelRepository::new(state.db_pool.clone())
        .find_all(None)
        .await?;

    Ok(Json(SuccessResponse::new(group_models(brands, models))))
}

/// Categories with the repair types visible to the caller
#[tracing::instrument(skip(state, claims))]
pub async fn repair_types_directory(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
) -> Result<Json<SuccessResponse<Vec<CategoryWithRepairTypes>>>, ErrorResponse> {
    let owner_id = current_user_id(&claims)?;

    let categories = RepairCategoryRepository::new(state.db_pool.clone())
        .find_all()
        .await?;
    let repair_types = RepairTypeRepository::new(state.db_pool.clone())
        .find_visible(owner_id)
        .await?;

    Ok(Json(SuccessResponse::new(group_repair_types(
        categories,
        repair_types,
    ))))
}
