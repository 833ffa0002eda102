use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use sea_orm::EntityTrait;
use uuid::Uuid;

use crate::auth::jwt;
use crate::entities::user;
use crate::error::AppError;
use crate::state::AppState;

/// Signed-in user, loaded from the `Authorization: Bearer <token>` header.
///
/// Handlers that record progress or read personal data take this extractor;
/// requests without a valid token are rejected with 401.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?
            .ok_or_else(|| AppError::Unauthorized("Missing authorization header.".to_string()))?;
        load_user(state, token).await.map(Self)
    }
}

/// Viewer for entitlement checks: `None` for anonymous visitors.
///
/// A token that is present but invalid is still a 401, so a stale session
/// is not silently downgraded to freemium.
#[derive(Debug, Clone)]
pub struct OptionalAuth(pub Option<user::Model>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            Some(token) => load_user(state, token).await.map(|u| Self(Some(u))),
            None => Ok(Self(None)),
        }
    }
}

/// The bearer token, if an `Authorization` header is present at all.
fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    header
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(Some)
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header format.".to_string()))
}

async fn load_user(state: &AppState, token: &str) -> Result<user::Model, AppError> {
    let claims = jwt::validate_access_token(token, &state.config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token.".to_string()))?;

    let user_id: Uuid = claims
        .sub
        .parse()
        .map_err(|_| AppError::Unauthorized("Invalid token subject.".to_string()))?;

    user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found.".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap_or_default().into_parts().0
    }

    #[test]
    fn test_missing_header_is_anonymous() {
        let parts = parts_with(None);
        assert!(matches!(bearer_token(&parts), Ok(None)));
    }

    #[test]
    fn test_bearer_prefix_is_stripped() {
        let parts = parts_with(Some("Bearer abc.def.ghi"));
        assert!(matches!(bearer_token(&parts), Ok(Some("abc.def.ghi"))));
    }

    #[test]
    fn test_other_schemes_are_rejected() {
        let parts = parts_with(Some("Basic dXNlcjpwYXNz"));
        assert!(matches!(
            bearer_token(&parts),
            Err(AppError::Unauthorized(_))
        ));
    }
}
