use axum::{
    extract::{Multipart, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Local;
use common::db::repositories::WorkRepository;
use common::export::{self, ExportFile, ExportFormat};
use common::import::{ImportError, ImportSummary, Importer};
use common::models::{UserClaims, WorkFilter};
use serde_json::json;

use crate::handlers::{current_user_id, ErrorResponse};
use crate::state::AppState;

/// Multipart field carrying the spreadsheet
const UPLOAD_FIELD: &str = "file";

/// Structural import failure, rendered as `{"error": <message>}`
#[derive(Debug)]
pub struct ImportRejection(pub String);

impl IntoResponse for ImportRejection {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": self.0 }))).into_response()
    }
}

impl From<ImportError> for ImportRejection {
    fn from(err: ImportError) -> Self {
        ImportRejection(err.to_string())
    }
}

fn attachment(file: ExportFile) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, file.content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file.filename),
            ),
        ],
        file.bytes,
    )
        .into_response()
}

async fn export_as(
    state: &AppState,
    claims: &UserClaims,
    filter: &WorkFilter,
    format: ExportFormat,
) -> Result<Response, ErrorResponse> {
    let owner_id = current_user_id(claims)?;

    let works = WorkRepository::new(state.db_pool.clone())
        .find_filtered(owner_id, filter)
        .await?;

    let file = export::export_works(format, &works, Local::now().naive_local()).map_err(|e| {
        tracing::error!(error = %e, format = format.label(), "Export failed");
        ErrorResponse::new("export_failed", e.to_string())
    })?;

    Ok(attachment(file))
}

/// Export the caller's filtered works as CSV
#[tracing::instrument(skip(state, claims, filter))]
pub async fn export_csv(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Query(filter): Query<WorkFilter>,
) -> Result<Response, ErrorResponse> {
    export_as(&state, &claims, &filter, ExportFormat::Csv).await
}

/// Export the caller's filtered works as an XLSX workbook
#[tracing::instrument(skip(state, claims, filter))]
pub async fn export_excel(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Query(filter): Query<WorkFilter>,
) -> Result<Response, ErrorResponse> {
    export_as(&state, &claims, &filter, ExportFormat::Excel).await
}

/// Export the caller's filtered works as JSON
#[tracing::instrument(skip(state, claims, filter))]
pub async fn export_json(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Query(filter): Query<WorkFilter>,
) -> Result<Response, ErrorResponse> {
    export_as(&state, &claims, &filter, ExportFormat::Json).await
}

/// Import works from an uploaded `.csv` or `.xlsx` file
#[tracing::instrument(skip(state, claims, multipart))]
pub async fn import_works(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    mut multipart: Multipart,
) -> Result<Json<ImportSummary>, Response> {
    let owner_id = current_user_id(&claims).map_err(IntoResponse::into_response)?;

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!(error = %e, "Malformed multipart upload");
        ImportRejection(format!("Error processing file: {}", e)).into_response()
    })? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(|e| {
            ImportRejection(format!("Error processing file: {}", e)).into_response()
        })?;
        upload = Some((file_name, bytes.to_vec()));
        break;
    }

    let importer = Importer::new(
        WorkRepository::new(state.db_pool.clone()),
        state.config.import.default_category_name.clone(),
    );

    let summary = importer
        .import(
            owner_id,
            upload
                .as_ref()
                .map(|(name, bytes)| (name.as_str(), bytes.as_slice())),
        )
        .await
        .map_err(|e| {
            tracing::warn!(owner_id = %owner_id, error = %e, "Import rejected");
            ImportRejection::from(e).into_response()
        })?;

    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_import_rejection_body_carries_message() {
        let response = ImportRejection::from(ImportError::MissingColumn("Cost".to_string()))
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Missing required column: Cost");
    }

    #[test]
    fn test_attachment_sets_download_headers() {
        let response = attachment(ExportFile {
            filename: "works_20240305_1412.csv".to_string(),
            content_type: ExportFormat::Csv.content_type(),
            bytes: b"\xEF\xBB\xBFDate".to_vec(),
        });

        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"works_20240305_1412.csv\""
        );
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
    }
}
