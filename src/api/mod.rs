//! Demo API: the display-surface boundary.
//!
//! The patient and doctor views are browser clients of this process.
//! Routes are nested under `/api/`; `/ws/state` streams state
//! snapshots so the views re-render on every transition.
//!
//! The router is composable — `demo_api_router()` returns a `Router`
//! that can be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;
pub mod websocket;

pub use router::demo_api_router;
pub use server::{start_api_server, ApiServer};
pub use types::ApiContext;
