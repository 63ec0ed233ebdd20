use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::NaiveDate;
use common::analytics::{self, WorkSummary};
use common::db::repositories::WorkRepository;
use common::models::{empty_as_none, UserClaims, WorkFilter};
use serde::Deserialize;

use crate::handlers::{current_user_id, ErrorResponse, SuccessResponse};
use crate::state::AppState;

/// Optional date range of the analytics view
#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub date_from: Option<NaiveDate>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub date_to: Option<NaiveDate>,
}

/// Repair-category breakdown of the caller's works
///
/// An inverted range matches no works and yields the all-zero summary.
#[tracing::instrument(skip(state, claims))]
pub async fn work_analytics(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<SuccessResponse<WorkSummary>>, ErrorResponse> {
    let owner_id = current_user_id(&claims)?;

    let filter = WorkFilter::between(query.date_from, query.date_to);
    let works = WorkRepository::new(state.db_pool.clone())
        .find_filtered(owner_id, &filter)
        .await?;

    let summary = analytics::summarize(&works);
    tracing::debug!(
        owner_id = %owner_id,
        works = summary.total_works,
        categories = summary.categories.len(),
        "Analytics computed"
    );

    Ok(Json(SuccessResponse::new(summary)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analytics_query_accepts_partial_range() {
        let query: AnalyticsQuery =
            serde_json::from_str(r#"{"date_from": "2024-01-01"}"#).unwrap();
        assert_eq!(query.date_from, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert!(query.date_to.is_none());
    }

    #[test]
    fn test_blank_query_values_are_ignored() {
        let uri: axum::http::Uri = "/api/completed-works/analytics?date_from=&date_to=2024-01-31"
            .parse()
            .unwrap();
        let Query(query) = Query::<AnalyticsQuery>::try_from_uri(&uri).unwrap();
        assert!(query.date_from.is_none());
        assert_eq!(query.date_to, NaiveDate::from_ymd_opt(2024, 1, 31));

        let uri: axum::http::Uri = "/api/completed-works?date_from=&car_brand_id=&ordering=&search="
            .parse()
            .unwrap();
        let Query(filter) = Query::<WorkFilter>::try_from_uri(&uri).unwrap();
        assert!(filter.date_from.is_none());
        assert!(filter.car_brand_id.is_none());
        assert!(filter.search_term().is_none());
    }
}
