//! alloy-backed chain client

use super::{
    ChainClient, ChainConnector, ReceiptView, SimulationFailure, TransactionView, TxRequest,
};
use alloy::eips::BlockId;
use alloy::network::{Ethereum, EthereumWallet};
use alloy::primitives::{Bytes, TxHash};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::TransactionReceipt;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use eyre::{Context, Result};
use std::sync::Arc;

/// Type alias for read-only provider
type ReadProvider = Arc<RootProvider<Ethereum>>;

/// Connects to JSON-RPC endpoints over HTTP
#[derive(Debug, Clone, Copy, Default)]
pub struct RpcConnector;

impl ChainConnector for RpcConnector {
    type Client = RpcChainClient;

    async fn connect(&self, endpoint: &str) -> Result<RpcChainClient> {
        RpcChainClient::connect(endpoint).await
    }
}

/// Chain client over a JSON-RPC HTTP endpoint
pub struct RpcChainClient {
    url: Url,
    provider: ReadProvider,
    chain_id: u64,
}

impl RpcChainClient {
    /// Connect to `rpc_url` and confirm the node answers `eth_chainId`
    pub async fn connect(rpc_url: &str) -> Result<Self> {
        let url: Url = rpc_url.parse().context("Invalid RPC URL")?;
        // Read-only provider without fillers; broadcasting builds its own wallet provider
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .network::<Ethereum>()
            .connect_http(url.clone());

        let chain_id = provider
            .get_chain_id()
            .await
            .context("Endpoint did not answer eth_chainId")?;

        Ok(Self {
            url,
            provider: Arc::new(provider),
            chain_id,
        })
    }
}

impl ChainClient for RpcChainClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn read(&self, tx: &TxRequest) -> Result<Bytes> {
        self.provider
            .call(tx.to_rpc())
            .await
            .context("eth_call failed")
    }

    async fn simulate_at(
        &self,
        tx: &TxRequest,
        block_number: u64,
    ) -> std::result::Result<Bytes, SimulationFailure> {
        self.provider
            .call(tx.to_rpc())
            .block(BlockId::number(block_number))
            .await
            .map_err(|err| {
                let payload = err.as_error_resp();
                SimulationFailure {
                    data: payload.and_then(|p| p.as_revert_data()),
                    message: Some(
                        payload
                            .map(|p| p.message.to_string())
                            .unwrap_or_else(|| err.to_string()),
                    ),
                }
            })
    }

    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u64> {
        self.provider
            .estimate_gas(tx.to_rpc())
            .await
            .context("eth_estimateGas failed")
    }

    async fn send_transaction(&self, signer: &PrivateKeySigner, tx: TxRequest) -> Result<TxHash> {
        let wallet = EthereumWallet::from(signer.clone());

        // Wallet filler handles nonce, chain_id, fees left unset, and signing
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect_http(self.url.clone());

        let pending_tx = provider
            .send_transaction(tx.with_from(signer.address()).to_rpc())
            .await
            .context("Failed to send transaction")?;

        Ok(*pending_tx.tx_hash())
    }

    async fn get_transaction(&self, tx_hash: TxHash) -> Result<Option<TransactionView>> {
        let tx = self
            .provider
            .get_transaction_by_hash(tx_hash)
            .await
            .context("Failed to get transaction")?;

        Ok(tx.map(|tx| TransactionView {
            block_number: tx.block_number,
        }))
    }

    async fn get_receipt(&self, tx_hash: TxHash) -> Result<Option<ReceiptView>> {
        let receipt: Option<TransactionReceipt> = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .context("Failed to get transaction receipt")?;

        receipt
            .map(|receipt| {
                let block_number = receipt
                    .block_number
                    .ok_or_else(|| eyre::eyre!("Receipt for {tx_hash} has no block number"))?;
                Ok(ReceiptView {
                    success: receipt.status(),
                    block_number,
                    gas_used: receipt.gas_used,
                })
            })
            .transpose()
    }
}
