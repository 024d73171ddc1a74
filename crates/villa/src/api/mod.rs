//! HTTP API module.
//!
//! REST endpoints for the villa plus the realtime WebSocket route.

mod error;
mod extract;
mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult, ErrorResponse, INTERNAL_ERROR_MESSAGE};
pub use extract::ApiJson;
pub use routes::create_router;
pub use state::AppState;
