//! Ticket Assigner Service
//!
//! Loads the persisted assignee model once at start-up and answers
//! prediction requests over HTTP:
//!
//! - `POST /predict`: `{"title", "description", "labels"}` -> `{"assignee"}`
//! - `GET /health`: liveness plus model metadata
//! - `GET /model/info`: known assignees and model dimensions

pub mod config;
pub mod errors;
pub mod request;
pub mod server;

pub use config::ServiceConfig;
pub use errors::ServiceError;
pub use request::ticket_from_json;
pub use server::{build_router, start_server, AppState, SharedState, AVAILABLE_ENDPOINTS};
