//! Forced-revert token transfer monitor
//!
//! Submits a single ERC20 transfer with a gas allowance one unit below the
//! estimate, then follows it from broadcast to a mined outcome, recovering a
//! human-readable revert reason when execution fails. Each attempt reports
//! into its own session, which any number of observers can replay and follow
//! live.
//!
//! # Features
//!
//! - Forced out-of-gas transfers (estimate - 1, or a fixed fallback)
//! - Lifecycle polling with state-change-only reporting
//! - `Error(string)` revert decoding
//! - Replayable per-session event streams over SSE
//!
//! # Example
//!
//! ```rust,ignore
//! use revert_watch::{RpcConnector, ServerConfig, TransferDefaults};
//!
//! #[tokio::main]
//! async fn main() -> eyre::Result<()> {
//!     let config = ServerConfig::default().with_explorer_url("https://sepolia.etherscan.io");
//!     revert_watch::server::serve(RpcConnector, config, TransferDefaults::default()).await
//! }
//! ```

pub mod chain;
pub mod config;
pub mod constants;
pub mod contracts;
pub mod diagnose;
pub mod error;
pub mod gas;
pub mod monitor;
pub mod orchestrator;
pub mod server;
pub mod session;

// Re-export main types for convenience
pub use chain::{ChainClient, ChainConnector, RpcChainClient, RpcConnector, TxRequest};
pub use config::{ServerConfig, TransferDefaults, TransferForm, TransferRequest};
pub use diagnose::diagnose;
pub use error::{eyre, Context, Report, Result, TransferError};
pub use monitor::{LifecycleMonitor, MonitorConfig, TransactionState};
pub use orchestrator::{BestEffort, TransferOrchestrator};
pub use session::{LogEvent, LogLevel, Session, SessionFeed, SessionId, SessionRegistry};
