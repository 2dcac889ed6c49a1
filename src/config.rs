// src/config.rs

use std::env;
use dotenvy::dotenv;

/// Number of entries kept in the "recent activity" section of user stats.
pub const RECENT_ACTIVITY_LIMIT: usize = 5;

/// Duration buckets used by the exam catalog filter (minutes, inclusive).
pub const SHORT_EXAM_MAX_MINUTES: i64 = 10;
pub const MEDIUM_EXAM_MAX_MINUTES: i64 = 20;

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub server_port: u16,
    /// Load the sample exam catalog at startup.
    pub seed_exams: bool,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub admin_email: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let server_port = env::var("SERVER_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        let seed_exams = env::var("SEED_EXAMS")
            .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no"))
            .unwrap_or(true);

        Self {
            jwt_secret,
            jwt_expiration,
            rust_log,
            server_port,
            seed_exams,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
            admin_email: env::var("ADMIN_EMAIL").ok(),
        }
    }
}
