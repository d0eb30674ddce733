//! Authentication for landgate
//!
//! Provides:
//! - JWT token verification and (for tooling/tests) generation
//! - Bearer token extraction from the Authorization header
//! - Canonical identity resolution from token claims

pub mod jwt;

pub use jwt::{extract_token_from_header, Claims, JwtValidator};
