use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use common::db::repositories::{CarModelRepository, RepairTypeRepository, WorkRepository};
use common::errors::ValidationError;
use common::models::{
    NewCompletedWork, Page, Pagination, UserClaims, WorkFilter, WorkRecord, WorkTotals,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::handlers::{current_user_id, ErrorResponse, SuccessResponse};
use crate::state::AppState;

/// Largest cost a NUMERIC(10,2) column accepts, exclusive
const MAX_COST: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

/// Check the scalar fields of a new work and normalize its cost
fn validate_new_work(mut input: NewCompletedWork) -> Result<NewCompletedWork, ValidationError> {
    if input.cost < Decimal::ZERO {
        return Err(ValidationError::invalid("cost", "must not be negative"));
    }

    input.cost = input.cost.round_dp(2);
    if input.cost >= MAX_COST {
        return Err(ValidationError::invalid(
            "cost",
            "must have at most 8 digits before the decimal point",
        ));
    }

    if input.repair_type_ids.is_empty() {
        return Err(ValidationError::MissingField("repair_type_ids".to_string()));
    }

    let mut seen = Vec::with_capacity(input.repair_type_ids.len());
    input.repair_type_ids.retain(|id| {
        if seen.contains(id) {
            false
        } else {
            seen.push(*id);
            true
        }
    });

    input.notes = input.notes.trim().to_string();
    input.parts_used = input.parts_used.trim().to_string();
    Ok(input)
}

/// List the caller's works, filtered, ordered and paginated
#[tracing::instrument(skip(state, claims, filter))]
pub async fn list_works(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Query(filter): Query<WorkFilter>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<SuccessResponse<Page<WorkRecord>>>, ErrorResponse> {
    let owner_id = current_user_id(&claims)?;

    let page = WorkRepository::new(state.db_pool.clone())
        .find_page(owner_id, &filter, pagination)
        .await?;

    Ok(Json(SuccessResponse::new(page)))
}

/// Record a completed work for the caller
#[tracing::instrument(skip(state, claims, req))]
pub async fn create_work(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Json(req): Json<NewCompletedWork>,
) -> Result<Json<SuccessResponse<WorkRecord>>, ErrorResponse> {
    let owner_id = current_user_id(&claims)?;
    let input = validate_new_work(req)?;

    let model = CarModelRepository::new(state.db_pool.clone())
        .find_by_id(input.car_model_id)
        .await?
        .ok_or_else(|| ErrorResponse::new("validation_error", "Car model not found"))?;

    if model.brand_id != input.car_brand_id {
        return Err(ErrorResponse::new(
            "validation_error",
            "Car model does not belong to the selected brand",
        ));
    }

    let visible = RepairTypeRepository::new(state.db_pool.clone())
        .count_visible(owner_id, &input.repair_type_ids)
        .await?;

    if visible != input.repair_type_ids.len() as i64 {
        return Err(ErrorResponse::new(
            "validation_error",
            "One or more repair types are not available",
        ));
    }

    let work = WorkRepository::new(state.db_pool.clone())
        .create(owner_id, &input)
        .await?;

    tracing::info!(work_id = %work.id, slug = %work.slug, owner_id = %owner_id, "Completed work recorded");
    Ok(Json(SuccessResponse::new(work)))
}

/// Get one of the caller's works by id
#[tracing::instrument(skip(state, claims))]
pub async fn get_work(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse<WorkRecord>>, ErrorResponse> {
    let owner_id = current_user_id(&claims)?;

    let work = WorkRepository::new(state.db_pool.clone())
        .find_by_id(owner_id, id)
        .await?
        .ok_or_else(|| ErrorResponse::new("not_found", format!("Work not found: {}", id)))?;

    Ok(Json(SuccessResponse::new(work)))
}

/// Get one of the caller's works by slug
#[tracing::instrument(skip(state, claims))]
pub async fn get_work_by_slug(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(slug): Path<String>,
) -> Result<Json<SuccessResponse<WorkRecord>>, ErrorResponse> {
    let owner_id = current_user_id(&claims)?;

    let work = WorkRepository::new(state.db_pool.clone())
        .find_by_slug(owner_id, &slug)
        .await?
        .ok_or_else(|| ErrorResponse::new("not_found", format!("Work not found: {}", slug)))?;

    Ok(Json(SuccessResponse::new(work)))
}

/// Delete one of the caller's works
#[tracing::instrument(skip(state, claims))]
pub async fn delete_work(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse<()>>, ErrorResponse> {
    let owner_id = current_user_id(&claims)?;

    WorkRepository::new(state.db_pool.clone())
        .delete(owner_id, id)
        .await?;

    tracing::info!(work_id = %id, owner_id = %owner_id, "Completed work deleted");
    Ok(Json(SuccessResponse::new(())))
}

/// Count and cost sum of the caller's filtered works
#[tracing::instrument(skip(state, claims, filter))]
pub async fn work_totals(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Query(filter): Query<WorkFilter>,
) -> Result<Json<SuccessResponse<WorkTotals>>, ErrorResponse> {
    let owner_id = current_user_id(&claims)?;

    let totals = WorkRepository::new(state.db_pool.clone())
        .totals(owner_id, &filter)
        .await?;

    Ok(Json(SuccessResponse::new(totals)))
}
