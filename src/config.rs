//! Environment-driven configuration.
//!
//! The process is configured through `SERVER_MODE`, `PORT`, `API_KEY` and
//! `ALLOWED_ORIGINS`; CLI flags may override the non-secret values.

use std::str::FromStr;

use crate::error::{Error, Result};

/// Which transport the process serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMode {
    /// JSON-RPC 2.0 over stdio.
    Stdio,
    /// HTTP API.
    Http,
}

impl FromStr for ServerMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "stdio" => Ok(ServerMode::Stdio),
            "http" => Ok(ServerMode::Http),
            other => Err(Error::Config(format!(
                "unknown server mode '{other}' (expected 'stdio' or 'http')"
            ))),
        }
    }
}

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Transport to serve.
    pub mode: ServerMode,
    /// HTTP listening port.
    pub port: u16,
    /// Shared secret for the HTTP transport; `None` disables the gate.
    pub api_key: Option<String>,
    /// Allowed CORS origins; empty means any origin.
    pub allowed_origins: Vec<String>,
    /// Run the browser headless.
    pub headless: bool,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mode = match var("SERVER_MODE") {
            Some(value) => value.parse()?,
            None => ServerMode::Http,
        };

        let port = match var("PORT") {
            Some(value) => value
                .parse()
                .map_err(|_| Error::Config(format!("invalid PORT value '{value}'")))?,
            None => 3000,
        };

        let api_key = var("API_KEY").filter(|k| !k.is_empty());

        let allowed_origins = var("ALLOWED_ORIGINS")
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            mode,
            port,
            api_key,
            allowed_origins,
            headless: true,
        })
    }
}
