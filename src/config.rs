// src/config.rs

use std::env;
use std::net::SocketAddr;

use dotenvy::dotenv;

const DEFAULT_DATABASE_URL: &str = "sqlite://quizboard.db?mode=rwc";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub addr: SocketAddr,
    pub rust_log: String,
    /// Origins allowed by the CORS layer.
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let addr = env::var("APP_ADDR")
            .ok()
            .and_then(|raw| match raw.parse() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    eprintln!("Ignoring invalid APP_ADDR '{}': {}", raw, e);
                    None
                }
            })
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let cors_origins = parse_origins(
            &env::var("CORS_ORIGINS").unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.to_string()),
        );

        Self {
            database_url,
            addr,
            rust_log,
            cors_origins,
        }
    }

    /// Configuration for tests and local tooling: in-memory database, random port.
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            rust_log: "error".to_string(),
            cors_origins: parse_origins(DEFAULT_CORS_ORIGINS),
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
