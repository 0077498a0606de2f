//! API Module
//!
//! HTTP handlers and routing for the REST API.
//!
//! # Endpoints
//! - `PUT /set` - Store a value, optionally queued
//! - `GET /get/:key` - Read a value (consumes the oldest queued value)
//! - `POST /pull/:key` - Remove a key and return its value
//! - `DELETE /del/:key` - Delete a key
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check
//! - `POST /constraints/check` - Evaluate a constraint query
//! - `GET /constraints/disabled` - Algorithms disabled outright

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
