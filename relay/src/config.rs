use crate::errors::{Error, Result};
use crate::session::{sha256_hex, Credentials};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub mqtt_broker: String,
    pub mqtt_port: u16,
    pub mqtt_client_prefix: String,
    pub http_addr: SocketAddr,
    pub channel_capacity: usize,
    pub credentials: Credentials,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let http_addr = var("HTTP_ADDR", "127.0.0.1:3789");
        let http_addr = http_addr
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("HTTP_ADDR {}: {}", http_addr, e)))?;

        let password_sha256 = match lookup("RELAY_PASSWORD_SHA256") {
            Some(hash) if hash.len() == 64 && hash.chars().all(|c| c.is_ascii_hexdigit()) => {
                hash.to_ascii_lowercase()
            }
            Some(_) => {
                return Err(Error::Config(
                    "RELAY_PASSWORD_SHA256 must be 64 hex characters".to_string(),
                ))
            }
            None => {
                warn!("RELAY_PASSWORD_SHA256 not set, using the default password");
                sha256_hex("admin")
            }
        };

        let channel_capacity: usize = parse_or(&lookup, "CHANNEL_CAPACITY", 1024);

        Ok(Self {
            mqtt_broker: var("MQTT_BROKER", "localhost"),
            mqtt_port: parse_or(&lookup, "MQTT_PORT", 1883),
            mqtt_client_prefix: var("MQTT_CLIENT_PREFIX", "office-relay"),
            http_addr,
            channel_capacity: channel_capacity.max(1),
            credentials: Credentials {
                username: var("RELAY_USERNAME", "admin"),
                password_sha256,
            },
        })
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Invalid {}={}, using {}", key, raw, default);
            default
        }),
        None => default,
    }
}
