use axum::{extract::State, Extension, Json};
use chrono::{Duration, Local};
use common::db::repositories::{
    CarBrandRepository, CarModelRepository, RepairTypeRepository, WorkRepository,
};
use common::models::{DashboardSummary, UserClaims, WorkFilter};

use crate::handlers::{current_user_id, ErrorResponse, SuccessResponse};
use crate::state::AppState;

const RECENT_WORKS: i64 = 10;
const SUMMARY_WINDOW_DAYS: i64 = 30;

/// Home page figures for the caller
#[tracing::instrument(skip(state, claims))]
pub async fn dashboard_summary(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
) -> Result<Json<SuccessResponse<DashboardSummary>>, ErrorResponse> {
    let owner_id = current_user_id(&claims)?;
    let works = WorkRepository::new(state.db_pool.clone());

    let since = Local::now().date_naive() - Duration::days(SUMMARY_WINDOW_DAYS);
    let last_month = works
        .totals(owner_id, &WorkFilter::between(Some(since), None))
        .await?;

    let brand_count = CarBrandRepository::new(state.db_pool.clone())
        .count()
        .await?;
    let model_count = CarModelRepository::new(state.db_pool.clone())
        .count()
        .await?;
    let repair_type_count = RepairTypeRepository::new(state.db_pool.clone())
        .count_by_owner(owner_id)
        .await?;
    let recent_works = works.find_recent(owner_id, RECENT_WORKS).await?;

    Ok(Json(SuccessResponse::new(DashboardSummary {
        works_last_30_days: last_month.count,
        revenue_last_30_days: last_month.total_cost,
        brand_count,
        model_count,
        repair_type_count,
        recent_works,
    })))
}
