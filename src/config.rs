// src/config.rs
use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Runtime configuration, read once at startup from the environment
/// (a `.env` file is honored if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub database: PathBuf,
    pub api_key: String,
    pub jwt_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("API_KEY").context("API_KEY not set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET not set")?;
        let database = env::var("DATABASE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("stock_trader.sqlite"));
        let bind = env::var("BIND")
            .unwrap_or_else(|_| "127.0.0.1:3030".to_string())
            .parse()
            .context("BIND is not a valid socket address")?;
        Ok(Config {
            bind,
            database,
            api_key,
            jwt_secret,
        })
    }
}
