//! Lifecycle monitor
//!
//! Polls the chain on a fixed cadence until a broadcast transaction is mined.
//! Each tick asks for the receipt first and falls back to a mempool lookup.
//! Transient states are reported once per contiguous run so an unbounded wait
//! does not flood the session log; any change of state re-arms the report.

use alloy::primitives::TxHash;
use std::time::Duration;
use tokio::time::Instant;

use crate::chain::{ChainClient, ReceiptView, TxRequest};
use crate::constants::{DEFAULT_EXPLORER_URL, DEFAULT_POLL_INTERVAL};
use crate::diagnose::diagnose;
use crate::error::TransferError;
use crate::session::Session;

/// Where a broadcast transaction stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Not known to the node
    Unseen,
    /// In the mempool, not yet in a block
    Pending,
    /// Mined with a successful receipt
    MinedSuccess,
    /// Mined, execution reverted
    MinedReverted,
}

/// Monitor settings
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Delay between polls
    pub poll_interval: Duration,
    /// Abandon the wait after this long; `None` waits until mined
    pub max_wait: Option<Duration>,
    /// Block explorer base URL
    pub explorer_url: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: None,
            explorer_url: DEFAULT_EXPLORER_URL.to_string(),
        }
    }
}

impl MonitorConfig {
    /// Set the poll interval
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the maximum wait
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = Some(max_wait);
        self
    }
}

/// Tracks one transaction to a mined outcome, reporting into its session
#[derive(Debug, Clone, Default)]
pub struct LifecycleMonitor {
    config: MonitorConfig,
}

impl LifecycleMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self { config }
    }

    /// Explorer page for a transaction
    pub fn explorer_link(&self, tx_hash: TxHash) -> String {
        format!("{}/tx/{tx_hash}", self.config.explorer_url.trim_end_matches('/'))
    }

    /// Poll until `tx_hash` is mined and report the outcome.
    ///
    /// `tx` must be the exact call that was broadcast; it is replayed against
    /// the mining block to recover a revert reason.
    pub async fn watch<C: ChainClient>(
        &self,
        client: &C,
        tx: &TxRequest,
        tx_hash: TxHash,
        session: &Session,
    ) -> Result<TransactionState, TransferError> {
        let started = Instant::now();
        let mut last_reported: Option<TransactionState> = None;

        loop {
            let receipt = client
                .get_receipt(tx_hash)
                .await
                .map_err(|e| TransferError::monitoring(&e))?;
            if let Some(receipt) = receipt {
                return Ok(self.report_mined(client, tx, tx_hash, receipt, session).await);
            }

            let state = match client
                .get_transaction(tx_hash)
                .await
                .map_err(|e| TransferError::monitoring(&e))?
            {
                None => TransactionState::Unseen,
                // Included but no receipt yet still counts as waiting
                Some(_) => TransactionState::Pending,
            };
            tracing::debug!(tx = %tx_hash, ?state, "poll");

            if last_reported != Some(state) {
                match state {
                    TransactionState::Unseen => session.warn(format!(
                        "Transaction {tx_hash} not yet found in mempool, waiting..."
                    )),
                    _ => session.info(format!(
                        "Transaction {tx_hash} is pending, waiting to be mined..."
                    )),
                }
                last_reported = Some(state);
            }

            if let Some(max_wait) = self.config.max_wait {
                if started.elapsed() >= max_wait {
                    return Err(TransferError::MonitoringFailure(format!(
                        "transaction {tx_hash} not mined after {}s",
                        max_wait.as_secs()
                    )));
                }
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn report_mined<C: ChainClient>(
        &self,
        client: &C,
        tx: &TxRequest,
        tx_hash: TxHash,
        receipt: ReceiptView,
        session: &Session,
    ) -> TransactionState {
        let state = if receipt.success {
            session.success(format!(
                "Transaction confirmed in block {}",
                receipt.block_number
            ));
            TransactionState::MinedSuccess
        } else {
            session.error(format!(
                "Transaction mined but reverted in block {}",
                receipt.block_number
            ));
            match client.simulate_at(tx, receipt.block_number).await {
                Err(failure) => session.error(format!("Revert reason: {}", diagnose(&failure))),
                Ok(_) => tracing::debug!(tx = %tx_hash, "replay did not revert, no reason recovered"),
            }
            TransactionState::MinedReverted
        };

        match tx.gas_limit {
            Some(limit) => session.info(format!("Gas used: {} of {limit}", receipt.gas_used)),
            None => session.info(format!("Gas used: {}", receipt.gas_used)),
        }
        session.info(format!("Explorer: {}", self.explorer_link(tx_hash)));
        state
    }
}
