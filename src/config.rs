//! Server and transfer configuration
//!
//! Transfer fields resolve with a fixed precedence: a non-empty field on the
//! request wins, otherwise the process-wide default (CLI flag or environment)
//! is used. Validation happens once, before any network call.

use alloy::primitives::Address;
use clap::Args;
use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_EXPLORER_URL, DEFAULT_POLL_INTERVAL, DEFAULT_SESSION_RETENTION,
};
use crate::error::TransferError;
use crate::monitor::MonitorConfig;

/// HTTP server and lifecycle settings
#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long = "bind", env = "BIND_ADDR", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,
    /// Seconds between lifecycle polls
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
    pub poll_interval_secs: u64,
    /// Give up monitoring after this many seconds (unbounded when unset)
    #[arg(long, env = "MAX_WAIT_SECS")]
    pub max_wait_secs: Option<u64>,
    /// Block explorer base URL used for transaction links
    #[arg(long, env = "EXPLORER_URL", default_value = DEFAULT_EXPLORER_URL)]
    pub explorer_url: String,
    /// Seconds a completed session stays replayable
    #[arg(long, env = "SESSION_RETENTION_SECS", default_value_t = DEFAULT_SESSION_RETENTION.as_secs())]
    pub session_retention_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            poll_interval_secs: DEFAULT_POLL_INTERVAL.as_secs(),
            max_wait_secs: None,
            explorer_url: DEFAULT_EXPLORER_URL.to_string(),
            session_retention_secs: DEFAULT_SESSION_RETENTION.as_secs(),
        }
    }
}

impl ServerConfig {
    /// Monitor settings derived from this configuration
    pub fn monitor(&self) -> MonitorConfig {
        MonitorConfig {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            max_wait: self.max_wait_secs.map(Duration::from_secs),
            explorer_url: self.explorer_url.clone(),
        }
    }

    /// Retention of completed sessions
    pub fn session_retention(&self) -> Duration {
        Duration::from_secs(self.session_retention_secs)
    }

    /// Set the explorer base URL
    pub fn with_explorer_url(mut self, explorer_url: impl Into<String>) -> Self {
        self.explorer_url = explorer_url.into();
        self
    }
}

/// Process-wide transfer defaults
#[derive(Clone, Default, Args)]
pub struct TransferDefaults {
    /// JSON-RPC endpoint
    #[arg(long, env = "RPC_URL")]
    pub rpc_url: Option<String>,
    /// Hex-encoded private key of the sender
    #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,
    /// ERC20 token contract address
    #[arg(long, env = "TOKEN_ADDRESS")]
    pub token_address: Option<String>,
    /// Recipient address
    #[arg(long, env = "RECIPIENT_ADDRESS")]
    pub recipient: Option<String>,
    /// Amount in whole tokens (e.g. "1.5")
    #[arg(long, env = "AMOUNT")]
    pub amount: Option<String>,
    /// Gas price in gwei
    #[arg(long, env = "GAS_PRICE_GWEI")]
    pub gas_price: Option<String>,
    /// Gas limit (accepted but ignored; the allowance is always forced)
    #[arg(long, env = "GAS_LIMIT")]
    pub gas_limit: Option<String>,
}

/// Transfer submission payload; every field is optional
#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct TransferForm {
    pub rpc_url: Option<String>,
    pub private_key: Option<String>,
    pub token_address: Option<String>,
    pub recipient: Option<String>,
    pub amount: Option<String>,
    pub gas_price: Option<String>,
    pub gas_limit: Option<String>,
}

/// Request fields merged with defaults, not yet validated
#[derive(Clone, Default, PartialEq, Eq)]
pub struct TransferRequest {
    pub rpc_url: Option<String>,
    pub private_key: Option<String>,
    pub token_address: Option<String>,
    pub recipient: Option<String>,
    pub amount: Option<String>,
    pub gas_price: Option<String>,
    pub gas_limit: Option<String>,
}

/// Validated transfer parameters
#[derive(Clone, PartialEq, Eq)]
pub struct TransferParams {
    pub rpc_url: String,
    pub private_key: String,
    pub token: Address,
    pub recipient: Address,
    pub amount: String,
    pub gas_price: Option<String>,
    pub gas_limit: Option<String>,
}

fn pick(explicit: Option<String>, default: &Option<String>) -> Option<String> {
    let non_empty = |v: &String| !v.trim().is_empty();
    explicit
        .filter(non_empty)
        .or_else(|| default.clone().filter(non_empty))
        .map(|v| v.trim().to_string())
}

impl TransferRequest {
    /// Merge a submission with the process defaults
    pub fn resolve(form: TransferForm, defaults: &TransferDefaults) -> Self {
        Self {
            rpc_url: pick(form.rpc_url, &defaults.rpc_url),
            private_key: pick(form.private_key, &defaults.private_key),
            token_address: pick(form.token_address, &defaults.token_address),
            recipient: pick(form.recipient, &defaults.recipient),
            amount: pick(form.amount, &defaults.amount),
            gas_price: pick(form.gas_price, &defaults.gas_price),
            gas_limit: pick(form.gas_limit, &defaults.gas_limit),
        }
    }

    /// Check that the mandatory fields are present and the addresses parse
    pub fn validate(&self) -> Result<TransferParams, TransferError> {
        let mut missing = Vec::new();
        let mut require = |name: &'static str, value: &Option<String>| {
            value.clone().unwrap_or_else(|| {
                missing.push(name);
                String::new()
            })
        };

        let rpc_url = require("rpc_url", &self.rpc_url);
        let private_key = require("private_key", &self.private_key);
        let token_address = require("token_address", &self.token_address);
        let recipient = require("recipient", &self.recipient);
        let amount = require("amount", &self.amount);

        if !missing.is_empty() {
            return Err(TransferError::ConfigurationMissing(missing));
        }

        Ok(TransferParams {
            rpc_url,
            private_key,
            token: parse_address("token", &token_address)?,
            recipient: parse_address("recipient", &recipient)?,
            amount,
            gas_price: self.gas_price.clone(),
            gas_limit: self.gas_limit.clone(),
        })
    }
}

fn parse_address(field: &'static str, value: &str) -> Result<Address, TransferError> {
    value.parse().map_err(|_| TransferError::AddressInvalid {
        field,
        value: value.to_string(),
    })
}

// Keep the private key out of logs.
impl std::fmt::Debug for TransferRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferRequest")
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("token_address", &self.token_address)
            .field("recipient", &self.recipient)
            .field("amount", &self.amount)
            .field("gas_price", &self.gas_price)
            .field("gas_limit", &self.gas_limit)
            .finish()
    }
}

impl std::fmt::Debug for TransferParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferParams")
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &"<redacted>")
            .field("token", &self.token)
            .field("recipient", &self.recipient)
            .field("amount", &self.amount)
            .field("gas_price", &self.gas_price)
            .field("gas_limit", &self.gas_limit)
            .finish()
    }
}
