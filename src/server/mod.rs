//! HTTP server for landgate

pub mod http;

pub use http::{run, AppState};
