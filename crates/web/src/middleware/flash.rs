//! One-shot messages carried across a redirect.
//!
//! Handlers push messages before redirecting; the next rendered page takes
//! them out of the session and shows them once.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::models::session_keys;

/// Severity of a flash message, used as its CSS class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Error,
    Info,
    Warning,
}

impl FlashLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
            Self::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub message: String,
}

/// Extractor giving access to the flash queue of the current session.
#[derive(Clone)]
pub struct Flash {
    session: Session,
}

impl Flash {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    /// Queue a message for the next page.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read or written.
    pub async fn push(
        &self,
        level: FlashLevel,
        message: impl Into<String>,
    ) -> Result<(), tower_sessions::session::Error> {
        let mut queued: Vec<FlashMessage> = self
            .session
            .get(session_keys::FLASH)
            .await?
            .unwrap_or_default();
        queued.push(FlashMessage {
            level,
            message: message.into(),
        });
        self.session.insert(session_keys::FLASH, queued).await
    }

    /// Remove and return every queued message, oldest first.
    ///
    /// A broken session yields no messages rather than failing the page.
    pub async fn take(&self) -> Vec<FlashMessage> {
        match self
            .session
            .remove::<Vec<FlashMessage>>(session_keys::FLASH)
            .await
        {
            Ok(messages) => messages.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not read flash messages");
                Vec::new()
            }
        }
    }
}

impl<S> FromRequestParts<S> for Flash
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(Self::new)
            .ok_or((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Session layer is not installed",
            ))
    }
}
