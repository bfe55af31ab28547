//! Middleware for HTTP request processing.

pub mod validation;
