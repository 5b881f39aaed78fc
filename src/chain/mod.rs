//! Chain client facade
//!
//! The lifecycle of a transfer only needs a handful of read and broadcast
//! operations from the network. They sit behind [`ChainConnector`] and
//! [`ChainClient`] so the orchestrator and monitor can be driven by the
//! alloy-backed [`RpcConnector`] in production and a scripted chain in tests.
//!
//! Facade calls never retry; every failure is returned to the call site.

#[cfg(test)]
pub(crate) mod mock;
mod rpc;
mod wallet;

pub use rpc::{RpcChainClient, RpcConnector};
pub use wallet::parse_credential;

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, TxHash};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use eyre::Result;
use std::future::Future;

/// Call parameters shared by reads, estimation, simulation and broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    /// Sender, if the call should execute in its context
    pub from: Option<Address>,
    /// Target contract address
    pub to: Address,
    /// Encoded calldata
    pub data: Bytes,
    /// Gas limit, left to the provider when unset
    pub gas_limit: Option<u64>,
    /// Legacy gas price in wei, left to the provider when unset
    pub gas_price: Option<u128>,
}

impl TxRequest {
    /// Create a new call against `to`
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            from: None,
            to,
            data: data.into(),
            gas_limit: None,
            gas_price: None,
        }
    }

    /// Set the sender
    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    /// Set gas limit
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    /// Set gas price in wei
    pub fn with_gas_price(mut self, gas_price: Option<u128>) -> Self {
        self.gas_price = gas_price;
        self
    }

    /// Convert into an RPC transaction request
    pub fn to_rpc(&self) -> TransactionRequest {
        let mut request = TransactionRequest::default()
            .with_to(self.to)
            .with_input(self.data.clone());
        if let Some(from) = self.from {
            request = request.with_from(from);
        }
        if let Some(gas_limit) = self.gas_limit {
            request = request.with_gas_limit(gas_limit);
        }
        if let Some(gas_price) = self.gas_price {
            request = request.with_gas_price(gas_price);
        }
        request
    }
}

/// What the network knows about a broadcast transaction before its receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionView {
    /// Block the transaction was included in, `None` while in the mempool
    pub block_number: Option<u64>,
}

/// Outcome of a mined transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptView {
    /// Receipt status flag
    pub success: bool,
    /// Block the transaction was mined in
    pub block_number: u64,
    /// Gas consumed by execution
    pub gas_used: u64,
}

/// Error payload of a failed simulated call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationFailure {
    /// Revert data returned by the node, if any
    pub data: Option<Bytes>,
    /// Top-level error message, if any
    pub message: Option<String>,
}

/// Opens a [`ChainClient`] for an endpoint
pub trait ChainConnector: Send + Sync + 'static {
    /// Client produced by a successful connection
    type Client: ChainClient + 'static;

    /// Connect to `endpoint` and confirm it answers
    fn connect(&self, endpoint: &str) -> impl Future<Output = Result<Self::Client>> + Send;
}

/// Read and broadcast operations consumed by a transfer attempt
pub trait ChainClient: Send + Sync {
    /// Chain id reported at connection time
    fn chain_id(&self) -> u64;

    /// Execute a read-only call against the latest block
    fn read(&self, tx: &TxRequest) -> impl Future<Output = Result<Bytes>> + Send;

    /// Re-execute a call against the state of a specific block
    fn simulate_at(
        &self,
        tx: &TxRequest,
        block_number: u64,
    ) -> impl Future<Output = std::result::Result<Bytes, SimulationFailure>> + Send;

    /// Estimate the gas a call would consume
    fn estimate_gas(&self, tx: &TxRequest) -> impl Future<Output = Result<u64>> + Send;

    /// Sign `tx` with `signer` and broadcast it, returning the transaction hash
    fn send_transaction(
        &self,
        signer: &PrivateKeySigner,
        tx: TxRequest,
    ) -> impl Future<Output = Result<TxHash>> + Send;

    /// Look a transaction up by hash
    fn get_transaction(
        &self,
        tx_hash: TxHash,
    ) -> impl Future<Output = Result<Option<TransactionView>>> + Send;

    /// Fetch the receipt of a mined transaction
    fn get_receipt(
        &self,
        tx_hash: TxHash,
    ) -> impl Future<Output = Result<Option<ReceiptView>>> + Send;
}
