//! HTTP server for the agency site: admin console API, public site routes,
//! the contact and careers proxies, and the static single-page app.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod middleware;
pub mod outbound;
pub mod routes;
pub mod state;

pub use routes::build_router;
