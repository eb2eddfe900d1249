//! Identity extractors.
//!
//! Login and logout belong to the identity provider, which stores a
//! [`CurrentUser`] in the session via [`set_current_user`]. Handlers only
//! read it back.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::error::{AppError, set_sentry_user};
use crate::models::{CurrentUser, session_keys};

/// Where unauthenticated page requests are sent.
pub const LOGIN_PATH: &str = "/login";

/// Body of the 401 sent to unauthenticated API requests.
pub const LOGIN_REQUIRED: &str = "You must be logged in to do that!";

/// Extractor that requires a signed-in user.
///
/// Page requests without one are redirected to [`LOGIN_PATH`]; `/api/*`
/// requests get a 401 saying [`LOGIN_REQUIRED`]. A signed-in user is
/// attached to the Sentry scope of the request.
///
/// # Example
///
/// ```rust,ignore
/// async fn add_store(RequireAuth(user): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Rejection for [`RequireAuth`].
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page (HTML requests).
    RedirectToLogin,
    /// Unauthorized response (API requests).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
            Self::Unauthorized => AppError::Unauthorized(LOGIN_REQUIRED.to_string()).into_response(),
        }
    }
}

async fn session_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = session_user(parts).await {
            set_sentry_user(&user.id, Some(&user.email));
            return Ok(Self(user));
        }

        // Nested routers see a stripped path; the original keeps `/api`.
        let path = parts
            .extensions
            .get::<OriginalUri>()
            .map_or_else(|| parts.uri.path(), |original| original.0.path());
        if path.starts_with("/api/") {
            Err(AuthRejection::Unauthorized)
        } else {
            Err(AuthRejection::RedirectToLogin)
        }
    }
}

/// Extractor that reads the signed-in user if there is one.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts).await))
    }
}

/// Store `user` as the signed-in user.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::CURRENT_USER, user).await
}
