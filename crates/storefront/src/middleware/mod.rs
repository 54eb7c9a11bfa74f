//! HTTP middleware stack and extractors for the storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (recorded on the span and Sentry scope)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//!
//! Rate limiting is not a layer: handlers call [`rate_limit::enforce`] with
//! the policy for their action.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;
pub mod validated_json;

pub use auth::{OptionalAuth, RequireAdmin, RequireAuth, clear_current_user, set_current_user};
pub use rate_limit::{GovernorRateLimitStore, RateLimitStore};
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
pub use validated_json::ValidatedJson;
