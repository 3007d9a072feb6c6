//! # cm-api
//!
//! HTTP surface of the ClaimDesk RS auth core: the `/api/auth` endpoints,
//! the admin token sweep, and the role portals behind the session edge.

pub mod edge;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routes;

pub use extractors::AppState;
pub use routes::router;
