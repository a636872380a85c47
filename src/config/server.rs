//! Server configuration types.
//!
//! This module defines the process-level settings that are fixed at startup:
//! - Address and port bindings
//! - Worker thread count
//! - Upstream fetch limits (timeout, maximum source size)
//! - Request coalescing switch and log output format
//!
//! Default values are sourced from `crate::constants`.

use std::time::Duration;

use crate::constants::{
    DEFAULT_ADDRESS, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_MAX_SOURCE_BYTES, DEFAULT_PORT,
    DEFAULT_THREADS,
};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human readable output
    Text,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    /// Number of worker threads (default: 4)
    pub threads: usize,
    /// Upper bound on a single source fetch
    pub fetch_timeout: Duration,
    /// Largest accepted source body in bytes
    pub max_source_bytes: usize,
    /// Share work between concurrent identical requests
    pub coalesce: bool,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            threads: DEFAULT_THREADS,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            max_source_bytes: DEFAULT_MAX_SOURCE_BYTES,
            coalesce: false,
            log_format: LogFormat::default(),
        }
    }
}

impl ServerConfig {
    /// Socket address in `host:port` form
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}
