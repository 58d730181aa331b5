//! HTTP front end of the ReelRecs recommendation engine.
//!
//! Serves similarity recommendations and rating predictions from a loaded
//! artifact set, and swaps in a freshly built set on `POST /admin/reload`.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
