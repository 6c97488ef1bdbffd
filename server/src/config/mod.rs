use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use chrono::{Duration, FixedOffset};

use crate::engine::Policy;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/tutoring";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_CANCEL_CUTOFF_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    /// Process-local store for demos; nothing survives a restart.
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub store_backend: StoreBackend,
    pub bind_addr: SocketAddr,
    pub policy: Policy,
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Policy::default();

        let utc_offset = env::var("LESSON_UTC_OFFSET")
            .ok()
            .and_then(|raw| match FixedOffset::from_str(raw.trim()) {
                Ok(offset) => Some(offset),
                Err(e) => {
                    tracing::warn!("Config: invalid LESSON_UTC_OFFSET '{}': {}", raw, e);
                    None
                }
            })
            .unwrap_or(defaults.utc_offset);

        let cutoff_hours = parse_var("CANCEL_CUTOFF_HOURS", DEFAULT_CANCEL_CUTOFF_HOURS);

        let store_backend = match env::var("STORE_BACKEND").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            Ok("postgres") | Err(_) => StoreBackend::Postgres,
            Ok(other) => {
                tracing::warn!("Config: unknown STORE_BACKEND '{}', using postgres", other);
                StoreBackend::Postgres
            }
        };

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS),
            store_backend,
            bind_addr: parse_var(
                "BIND_ADDR",
                DEFAULT_BIND_ADDR
                    .parse()
                    .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 3001))),
            ),
            policy: Policy {
                utc_offset,
                cancel_cutoff: Duration::hours(cutoff_hours),
            },
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|e| {
            tracing::warn!("Config: invalid {} '{}': {}", name, raw, e);
            default
        }),
        Err(_) => default,
    }
}
