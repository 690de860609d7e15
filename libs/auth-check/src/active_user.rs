use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use common::{ErrorCode, USER_ID_HEADER};

use crate::template::ProtectedRoutes;

/// What the filter needs to know about an admin user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserStatus {
    pub active: bool,
    pub super_admin: bool,
}

#[derive(Debug, thiserror::Error)]
#[error("user lookup failed: {0}")]
pub struct LookupError(pub String);

/// Read-only access to the admin user store.
pub trait UserLookup: Send + Sync {
    fn find_user_status(&self, user_id: &str) -> Result<Option<UserStatus>, LookupError>;
}

/// Maps a lookup result onto the filter's verdict.
pub fn check_user_status(status: Option<UserStatus>) -> Result<(), ErrorCode> {
    match status {
        None => Err(ErrorCode::UserNotFound),
        Some(status) if !status.active => Err(ErrorCode::UserNotActive),
        Some(_) => Ok(()),
    }
}

#[derive(Clone)]
pub struct ActiveUserFilter {
    routes: Arc<ProtectedRoutes>,
    users: Arc<dyn UserLookup>,
}

impl ActiveUserFilter {
    pub fn new(routes: ProtectedRoutes, users: Arc<dyn UserLookup>) -> Self {
        ActiveUserFilter {
            routes: Arc::new(routes),
            users,
        }
    }

    /// `Ok(())` when the request may proceed, otherwise the error to answer with.
    pub fn verify(&self, user_id: Option<&str>) -> Result<(), ErrorCode> {
        let Some(user_id) = user_id else {
            return Err(ErrorCode::UserNotFound);
        };

        let status = self.users.find_user_status(user_id).map_err(|err| {
            tracing::error!("Active user check failed for {}: {}", user_id, err);
            ErrorCode::ApplicationError
        })?;

        check_user_status(status)
    }
}

/// Middleware rejecting protected requests whose `userId` is unknown or inactive.
///
/// Requests outside the protected set are forwarded untouched.
pub async fn active_user_filter(
    State(filter): State<ActiveUserFilter>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();

    if !filter.routes.is_protected(req.method(), &path) {
        tracing::debug!("skip active user filter for {}", path);
        return next.run(req).await;
    }

    tracing::info!("check user status for {}", path);
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    match filter.verify(user_id) {
        Ok(()) => next.run(req).await,
        Err(code) => {
            tracing::info!("User status check failed with error code={}", code.code());
            code.into_response()
        }
    }
}
