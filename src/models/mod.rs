//! Request and Response models for the HTTP API
//!
//! DTOs serialized to and from HTTP request and response bodies. The
//! constraint check endpoint takes a
//! [`ConstraintQuery`](crate::constraints::ConstraintQuery) directly.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::SetRequest;
pub use responses::{
    CheckResponse, DeleteResponse, DisabledResponse, GetResponse, HealthResponse, SetResponse,
    StatsResponse,
};
