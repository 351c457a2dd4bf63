pub mod auth;
pub mod error;
pub mod middleware;
pub mod notes;
pub mod notifications;
pub mod routes;
pub mod users;

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;
pub use routes::router;
