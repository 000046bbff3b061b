//! HTTP server for the dispatch API
//!
//! `DispatchServerBuilder` wires storage, matcher, notifications and the
//! lifecycle engine into a `DispatchHost`, then exposes it through axum.

pub mod builder;
pub mod handlers;
pub mod host;
pub mod router;

pub use builder::DispatchServerBuilder;
pub use host::DispatchHost;
pub use builder::serve_router;
pub use router::{AppState, build_routes};
