use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::{auth_middleware, rbac_middleware};
use crate::state::AppState;

/// Create the main application router with all routes and middleware
#[tracing::instrument(skip(state))]
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/auth/register", post(handlers::auth::register))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/refresh", post(handlers::auth::refresh_token))
        .route("/api/car-brands", get(handlers::references::list_brands))
        .route("/api/car-brands/:id", get(handlers::references::get_brand))
        .route("/api/car-models", get(handlers::references::list_models))
        .route("/api/car-models/:id", get(handlers::references::get_model));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        // Completed works
        .route(
            "/api/completed-works",
            get(handlers::works::list_works).post(handlers::works::create_work),
        )
        .route(
            "/api/completed-works/totals",
            get(handlers::works::work_totals),
        )
        .route(
            "/api/completed-works/analytics",
            get(handlers::analytics::work_analytics),
        )
        .route(
            "/api/completed-works/slug/:slug",
            get(handlers::works::get_work_by_slug),
        )
        .route(
            "/api/completed-works/:id",
            get(handlers::works::get_work).delete(handlers::works::delete_work),
        )
        // Export and import
        .route(
            "/api/completed-works/export/csv",
            get(handlers::import_export::export_csv),
        )
        .route(
            "/api/completed-works/export/excel",
            get(handlers::import_export::export_excel),
        )
        .route(
            "/api/completed-works/export/json",
            get(handlers::import_export::export_json),
        )
        .route(
            "/api/completed-works/import",
            post(handlers::import_export::import_works).layer(DefaultBodyLimit::max(
                state.config.import.max_upload_bytes,
            )),
        )
        .route("/api/dashboard", get(handlers::dashboard::dashboard_summary))
        // Repair types owned by the caller
        .route(
            "/api/repair-types",
            get(handlers::repair_types::list_repair_types)
                .post(handlers::repair_types::create_repair_type),
        )
        .route(
            "/api/repair-types/:id",
            get(handlers::repair_types::get_repair_type)
                .put(handlers::repair_types::update_repair_type)
                .delete(handlers::repair_types::delete_repair_type),
        )
        // Shared reference data
        .route(
            "/api/repair-categories",
            get(handlers::references::list_categories)
                .post(handlers::references::create_category),
        )
        .route("/api/car-brands", post(handlers::references::create_brand))
        .route("/api/car-models", post(handlers::references::create_model))
        .route(
            "/api/directory/car-models",
            get(handlers::directory::car_models_directory),
        )
        .route(
            "/api/directory/repair-types",
            get(handlers::directory::repair_types_directory),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    rbac_middleware,
                )),
        );

    // Metrics endpoint (no authentication for Prometheus scraping)
    let metrics_routes = Router::new().route("/metrics", get(handlers::metrics::metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .merge(metrics_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
