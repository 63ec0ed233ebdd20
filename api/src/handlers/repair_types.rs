use axum::{
    extract::{Path, State},
    Extension, Json,
};
use common::db::repositories::{RepairCategoryRepository, RepairTypeRepository};
use common::errors::ValidationError;
use common::models::{RepairType, RepairTypeInput, UserClaims};
use uuid::Uuid;

use crate::handlers::{current_user_id, ErrorResponse, SuccessResponse};
use crate::state::AppState;

async fn check_input(state: &AppState, input: &RepairTypeInput) -> Result<(), ErrorResponse> {
    if input.name.trim().is_empty() {
        return Err(ValidationError::MissingField("name".to_string()).into());
    }

    RepairCategoryRepository::new(state.db_pool.clone())
        .find_by_id(input.category_id)
        .await?
        .ok_or_else(|| ErrorResponse::new("validation_error", "Repair category not found"))?;

    Ok(())
}

/// The caller's own repair types
#[tracing::instrument(skip(state, claims))]
pub async fn list_repair_types(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
) -> Result<Json<SuccessResponse<Vec<RepairType>>>, ErrorResponse> {
    let owner_id = current_user_id(&claims)?;

    let repair_types = RepairTypeRepository::new(state.db_pool.clone())
        .find_by_owner(owner_id)
        .await?;

    Ok(Json(SuccessResponse::new(repair_types)))
}

#[tracing::instrument(skip(state, claims, req))]
pub async fn create_repair_type(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Json(req): Json<RepairTypeInput>,
) -> Result<Json<SuccessResponse<RepairType>>, ErrorResponse> {
    let owner_id = current_user_id(&claims)?;
    check_input(&state, &req).await?;

    let repair_type = RepairTypeRepository::new(state.db_pool.clone())
        .create(owner_id, &req)
        .await?;

    Ok(Json(SuccessResponse::new(repair_type)))
}

/// Get a repair type the caller owns
#[tracing::instrument(skip(state, claims))]
pub async fn get_repair_type(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse<RepairType>>, ErrorResponse> {
    let owner_id = current_user_id(&claims)?;

    let repair_type = RepairTypeRepository::new(state.db_pool.clone())
        .find_visible_by_id(id, owner_id)
        .await?
        .filter(|repair_type| repair_type.owner_id == Some(owner_id))
        .ok_or_else(|| ErrorResponse::new("not_found", format!("Repair type not found: {}", id)))?;

    Ok(Json(SuccessResponse::new(repair_type)))
}

#[tracing::instrument(skip(state, claims, req))]
pub async fn update_repair_type(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(id): Path<Uuid>,
    Json(req): Json<RepairTypeInput>,
) -> Result<Json<SuccessResponse<RepairType>>, ErrorResponse> {
    let owner_id = current_user_id(&claims)?;
    check_input(&state, &req).await?;

    let repair_type = RepairTypeRepository::new(state.db_pool.clone())
        .update(id, owner_id, &req)
        .await?;

    Ok(Json(SuccessResponse::new(repair_type)))
}

/// Delete a repair type; 409 while completed works still use it
#[tracing::instrument(skip(state, claims))]
pub async fn delete_repair_type(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse<()>>, ErrorResponse> {
    let owner_id = current_user_id(&claims)?;

    RepairTypeRepository::new(state.db_pool.clone())
        .delete(id, owner_id)
        .await?;

    Ok(Json(SuccessResponse::new(())))
}
