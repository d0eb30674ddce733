//! Configuration for landgate
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// landgate - authenticated land-record service with audit history
#[derive(Parser, Debug, Clone)]
#[command(name = "landgate")]
#[command(about = "Ownership-scoped record store with append-only history")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "landgate")]
    pub mongodb_db: String,

    /// JWT secret for token verification (required)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// JWT token expiry in seconds (used when minting tokens)
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Maximum accepted JSON request body in bytes
    #[arg(long, env = "MAX_BODY_BYTES", default_value = "65536")]
    pub max_body_bytes: usize,
}

impl Args {
    /// Get the configured JWT secret
    ///
    /// `validate()` runs before any component is constructed, so the secret
    /// is present by the time this accessor is used.
    pub fn jwt_secret(&self) -> &str {
        self.jwt_secret
            .as_deref()
            .expect("JWT_SECRET is required; Args::validate enforces this at startup")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        match &self.jwt_secret {
            None => Err("JWT_SECRET is required".to_string()),
            Some(s) if s.is_empty() => Err("JWT_SECRET must not be empty".to_string()),
            Some(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> Args {
        Args::parse_from(["landgate", "--jwt-secret", "test-secret"])
    }

    #[test]
    fn test_validate_requires_secret() {
        let mut args = base_args();
        assert!(args.validate().is_ok());

        args.jwt_secret = None;
        assert!(args.validate().is_err());

        args.jwt_secret = Some(String::new());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_defaults() {
        let args = base_args();
        assert_eq!(args.listen.port(), 8080);
        assert_eq!(args.mongodb_db, "landgate");
        assert_eq!(args.jwt_expiry_seconds, 3600);
        assert_eq!(args.max_body_bytes, 65536);
    }
}
