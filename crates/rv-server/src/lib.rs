//! HTTP server for the Reavise mutation engine.
//!
//! Exposes auction listings, bids, relationship writes, and counter
//! maintenance over a JSON API, and runs the expiry sweep and consistency
//! auditor in the background. The acting user is taken from the
//! `x-user-id` header through an [`AuthProvider`].

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use auth::{Actor, AuthProvider, Credentials, Identity, TrustedHeaderAuth, USER_ID_HEADER};
pub use config::{AuditorConfig, EngineConfig, SeedConfig, SeedPost, ServerConfig, SweepConfig};
pub use error::{ServerError, ServerResult};
pub use server::RvServer;
pub use state::AppState;
