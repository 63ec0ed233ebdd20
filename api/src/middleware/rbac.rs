use axum::{
    extract::{Request, State},
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};
use common::auth::permissions;
use common::models::UserClaims;

use crate::state::AppState;

/// RBAC middleware that checks user permissions
#[tracing::instrument(skip(_state, req, next))]
pub async fn rbac_middleware(
    State(_state): State<AppState>,
    req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let claims = req
        .extensions()
        .get::<UserClaims>()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let required_permission = determine_required_permission(req.uri().path(), req.method());

    if let Some(permission) = required_permission {
        if !claims.has_permission(permission) {
            tracing::warn!(
                user = %claims.username,
                required_permission = %permission,
                "User lacks required permission"
            );
            return Err(StatusCode::FORBIDDEN);
        }
    }

    tracing::info!(
        user_id = %claims.sub,
        username = %claims.username,
        method = %req.method(),
        path = %req.uri().path(),
        "API operation"
    );

    Ok(next.run(req).await)
}

/// Permission required for a protected path and method
fn determine_required_permission(path: &str, method: &Method) -> Option<&'static str> {
    let reads = method == Method::GET || method == Method::HEAD;

    if path.starts_with("/api/completed-works") {
        if path.ends_with("/import") {
            return Some(permissions::WORK_IMPORT);
        }
        if path.contains("/export/") {
            return Some(permissions::WORK_EXPORT);
        }
        return Some(if reads {
            permissions::WORK_READ
        } else {
            permissions::WORK_WRITE
        });
    }

    if path.starts_with("/api/dashboard") {
        return Some(permissions::WORK_READ);
    }

    if path.starts_with("/api/repair-types") {
        return Some(if reads {
            permissions::REPAIR_TYPE_READ
        } else {
            permissions::REPAIR_TYPE_WRITE
        });
    }

    if path.starts_with("/api/directory") {
        return Some(permissions::REFERENCE_READ);
    }

    if path.starts_with("/api/car-brands")
        || path.starts_with("/api/car-models")
        || path.starts_with("/api/repair-categories")
    {
        return Some(if reads {
            permissions::REFERENCE_READ
        } else {
            permissions::REFERENCE_WRITE
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_paths_map_to_work_permissions() {
        assert_eq!(
            determine_required_permission("/api/completed-works", &Method::GET),
            Some(permissions::WORK_READ)
        );
        assert_eq!(
            determine_required_permission("/api/completed-works", &Method::POST),
            Some(permissions::WORK_WRITE)
        );
        assert_eq!(
            determine_required_permission("/api/completed-works/import", &Method::POST),
            Some(permissions::WORK_IMPORT)
        );
        assert_eq!(
            determine_required_permission("/api/completed-works/export/excel", &Method::GET),
            Some(permissions::WORK_EXPORT)
        );
        assert_eq!(
            determine_required_permission("/api/completed-works/analytics", &Method::GET),
            Some(permissions::WORK_READ)
        );
    }

    #[test]
    fn test_slug_containing_import_is_a_plain_read() {
        assert_eq!(
            determine_required_permission("/api/completed-works/slug/import-car", &Method::GET),
            Some(permissions::WORK_READ)
        );
    }

    #[test]
    fn test_reference_writes_need_reference_write() {
        for path in ["/api/car-brands", "/api/car-models", "/api/repair-categories"] {
            assert_eq!(
                determine_required_permission(path, &Method::POST),
                Some(permissions::REFERENCE_WRITE)
            );
        }
        assert_eq!(
            determine_required_permission("/api/repair-categories", &Method::GET),
            Some(permissions::REFERENCE_READ)
        );
    }

    #[test]
    fn test_repair_type_permissions() {
        assert_eq!(
            determine_required_permission("/api/repair-types/abc", &Method::DELETE),
            Some(permissions::REPAIR_TYPE_WRITE)
        );
        assert_eq!(
            determine_required_permission("/api/directory/repair-types", &Method::GET),
            Some(permissions::REFERENCE_READ)
        );
    }

    #[test]
    fn test_regular_user_cannot_create_brands() {
        let granted = common::auth::permissions_for(false);
        let required = determine_required_permission("/api/car-brands", &Method::POST).unwrap();
        assert!(!granted.iter().any(|p| p == required));
    }
}
