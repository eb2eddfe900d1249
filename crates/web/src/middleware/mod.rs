//! HTTP middleware and extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, one hub per request)
//! 2. `TraceLayer` (`http_request` span)
//! 3. Request ID (recorded in the span and Sentry scope)
//! 4. Body limit (form uploads)
//! 5. Session layer (tower-sessions, `PostgreSQL` or memory store)
//!
//! Identity and flash messages are read through extractors rather than
//! layers: [`RequireAuth`], [`OptionalAuth`] and [`Flash`].

pub mod auth;
pub mod flash;
pub mod request_id;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, set_current_user};
pub use flash::{Flash, FlashLevel, FlashMessage};
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
