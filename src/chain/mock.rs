//! Scripted in-memory chain for driving transfers in tests

use super::{
    ChainClient, ChainConnector, ReceiptView, SimulationFailure, TransactionView, TxRequest,
};
use crate::contracts::IERC20;
use alloy::primitives::{Bytes, TxHash, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::{SolCall, SolValue};
use eyre::{eyre, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// What the chain reports on one monitor tick
#[derive(Debug, Clone)]
pub enum Poll {
    NotFound,
    Pending,
    Mined(ReceiptView),
    Error(String),
}

#[derive(Debug)]
pub struct Script {
    pub connect_error: Option<String>,
    pub panic_on_connect: bool,
    pub chain_id: u64,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub balance: Option<u64>,
    pub estimate: std::result::Result<u64, String>,
    pub broadcast: std::result::Result<TxHash, String>,
    pub polls: VecDeque<Poll>,
    pub simulation: std::result::Result<Bytes, SimulationFailure>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            connect_error: None,
            panic_on_connect: false,
            chain_id: 11_155_111,
            symbol: Some("USDC".into()),
            decimals: Some(6),
            balance: Some(5_000_000),
            estimate: Ok(21_001),
            broadcast: Ok(TxHash::repeat_byte(0xaa)),
            polls: VecDeque::new(),
            simulation: Err(SimulationFailure {
                data: None,
                message: Some("out of gas".into()),
            }),
        }
    }
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub connected_to: Vec<String>,
    pub sent: Vec<TxRequest>,
    pub simulated: Vec<(TxRequest, u64)>,
    pub receipt_calls: usize,
}

/// Connector and client sharing one script
#[derive(Debug, Clone)]
pub struct MockChain {
    script: Arc<Mutex<Script>>,
    recorded: Arc<Mutex<Recorded>>,
}

impl MockChain {
    pub fn new(script: Script) -> Self {
        Self {
            script: Arc::new(Mutex::new(script)),
            recorded: Arc::new(Mutex::new(Recorded::default())),
        }
    }

    /// Healthy chain that never sees the transaction
    pub fn idle() -> Self {
        Self::new(Script::default())
    }

    pub fn with_polls(polls: impl IntoIterator<Item = Poll>) -> Self {
        Self::new(Script {
            polls: polls.into_iter().collect(),
            ..Default::default()
        })
    }

    pub fn recorded(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap()
    }
}

impl ChainConnector for MockChain {
    type Client = MockChain;

    async fn connect(&self, endpoint: &str) -> Result<MockChain> {
        self.recorded().connected_to.push(endpoint.to_string());
        let panics = self.script.lock().unwrap().panic_on_connect;
        if panics {
            panic!("scripted connect panic");
        }
        match &self.script.lock().unwrap().connect_error {
            Some(reason) => Err(eyre!("{reason}")),
            None => Ok(self.clone()),
        }
    }
}

impl ChainClient for MockChain {
    fn chain_id(&self) -> u64 {
        self.script.lock().unwrap().chain_id
    }

    async fn read(&self, tx: &TxRequest) -> Result<Bytes> {
        let script = self.script.lock().unwrap();
        let selector: [u8; 4] = tx.data[..4].try_into()?;
        let encoded = if selector == IERC20::symbolCall::SELECTOR {
            script.symbol.clone().map(|s| s.abi_encode())
        } else if selector == IERC20::decimalsCall::SELECTOR {
            script.decimals.map(|d| U256::from(d).abi_encode())
        } else if selector == IERC20::balanceOfCall::SELECTOR {
            script.balance.map(|b| U256::from(b).abi_encode())
        } else {
            None
        };
        encoded
            .map(Bytes::from)
            .ok_or_else(|| eyre!("execution reverted"))
    }

    async fn simulate_at(
        &self,
        tx: &TxRequest,
        block_number: u64,
    ) -> std::result::Result<Bytes, SimulationFailure> {
        self.recorded().simulated.push((tx.clone(), block_number));
        self.script.lock().unwrap().simulation.clone()
    }

    async fn estimate_gas(&self, _tx: &TxRequest) -> Result<u64> {
        self.script
            .lock()
            .unwrap()
            .estimate
            .clone()
            .map_err(|reason| eyre!("{reason}"))
    }

    async fn send_transaction(&self, _signer: &PrivateKeySigner, tx: TxRequest) -> Result<TxHash> {
        self.recorded().sent.push(tx);
        self.script
            .lock()
            .unwrap()
            .broadcast
            .clone()
            .map_err(|reason| eyre!("{reason}"))
    }

    // Each tick asks for the receipt first; a mined entry stays at the front.
    async fn get_receipt(&self, _tx_hash: TxHash) -> Result<Option<ReceiptView>> {
        self.recorded().receipt_calls += 1;
        let mut script = self.script.lock().unwrap();
        if let Some(Poll::Mined(receipt)) = script.polls.front() {
            return Ok(Some(*receipt));
        }
        if let Some(Poll::Error(reason)) = script.polls.front() {
            let err = eyre!("{reason}");
            script.polls.pop_front();
            return Err(err);
        }
        Ok(None)
    }

    async fn get_transaction(&self, _tx_hash: TxHash) -> Result<Option<TransactionView>> {
        let mut script = self.script.lock().unwrap();
        match script.polls.pop_front() {
            Some(Poll::Pending) => Ok(Some(TransactionView { block_number: None })),
            _ => Ok(None),
        }
    }
}
