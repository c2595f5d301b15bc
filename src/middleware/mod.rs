// ABOUTME: HTTP middleware for request tracing and cross-origin access
// ABOUTME: Provides request ID propagation, per-request spans, and CORS configuration

/// CORS configuration
pub mod cors;
/// Request spans
pub mod tracing;

pub use cors::setup_cors;
pub use tracing::{create_request_span, REQUEST_ID_HEADER};
