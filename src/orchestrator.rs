//! Transfer orchestrator
//!
//! Owns the narrative of one transfer attempt: validate, connect, derive the
//! sender, describe the token, convert amounts, force an insufficient gas
//! allowance, broadcast, then hand off to the [`LifecycleMonitor`]. Every
//! failure ends the attempt with exactly one error event, and every path ends
//! with the session's completion signal.

use alloy::primitives::utils::format_units;
use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;
use std::sync::Arc;

use crate::chain::{parse_credential, ChainClient, ChainConnector, TxRequest};
use crate::config::TransferRequest;
use crate::constants::{scale_amount, scale_gas_price, DEFAULT_DECIMALS, DEFAULT_SYMBOL};
use crate::contracts::IERC20;
use crate::error::TransferError;
use crate::gas::{forced_gas_limit, GasSource};
use crate::monitor::{LifecycleMonitor, MonitorConfig, TransactionState};
use crate::session::{Session, SessionRegistry};

/// A read that may have fallen back to a default
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestEffort<T> {
    /// The value was read successfully
    Value(T),
    /// The read failed and `value` is the default
    Defaulted { value: T, reason: String },
}

impl<T> BestEffort<T> {
    /// The resolved value, read or defaulted
    pub fn into_value(self) -> T {
        match self {
            Self::Value(value) | Self::Defaulted { value, .. } => value,
        }
    }

    /// Emit a warning into `session` if this value was defaulted
    fn warn_if_defaulted(&self, session: &Session) {
        if let Self::Defaulted { reason, .. } = self {
            session.warn(reason.clone());
        }
    }
}

/// Runs transfer attempts against chains opened by `K`
pub struct TransferOrchestrator<K: ChainConnector> {
    connector: K,
    monitor: LifecycleMonitor,
}

impl<K: ChainConnector> TransferOrchestrator<K> {
    pub fn new(connector: K, monitor: MonitorConfig) -> Self {
        Self {
            connector,
            monitor: LifecycleMonitor::new(monitor),
        }
    }

    /// Run the attempt in the background, releasing the session from `registry` when done
    pub fn spawn(
        self: &Arc<Self>,
        registry: &Arc<SessionRegistry>,
        request: TransferRequest,
        session: Arc<Session>,
    ) -> tokio::task::JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        let registry = Arc::clone(registry);
        tokio::spawn(async move {
            let attempt = {
                let session = Arc::clone(&session);
                tokio::spawn(async move { orchestrator.execute(request, &session).await })
            };
            // A panicking attempt still has to end the session for its observers
            if let Err(err) = attempt.await {
                tracing::error!(session = %session.id(), "transfer attempt aborted: {err}");
                if !session.is_completed() {
                    session.error("Transfer attempt aborted unexpectedly");
                    session.complete();
                }
            }
            registry.release(session.id());
        })
    }

    /// Run one transfer attempt to completion, reporting into `session`
    pub async fn execute(&self, request: TransferRequest, session: &Session) {
        match self.attempt(request, session).await {
            Ok(state) => tracing::info!(session = %session.id(), ?state, "transfer attempt finished"),
            Err(err) => session.error(err.to_string()),
        }
        session.complete();
    }

    async fn attempt(
        &self,
        request: TransferRequest,
        session: &Session,
    ) -> Result<TransactionState, TransferError> {
        let params = request.validate()?;

        let client = self
            .connector
            .connect(&params.rpc_url)
            .await
            .map_err(|e| TransferError::ConnectionFailure(format!("{e:#}")))?;
        session.info(format!(
            "Connected to RPC endpoint (chain id {})",
            client.chain_id()
        ));

        let signer = parse_credential(&params.private_key)?;
        let sender = signer.address();
        session.info(format!("Sending from {sender}"));

        let symbol = resolve_symbol(&client, params.token).await;
        let decimals = resolve_decimals(&client, params.token).await;
        symbol.warn_if_defaulted(session);
        decimals.warn_if_defaulted(session);
        let (symbol, decimals) = (symbol.into_value(), decimals.into_value());
        session.info(format!(
            "Token {}: {symbol} ({decimals} decimals)",
            params.token
        ));

        match read_balance(&client, params.token, sender).await {
            Ok(balance) => match format_units(balance, decimals) {
                Ok(balance) => session.info(format!("Sender balance: {balance} {symbol}")),
                Err(e) => tracing::debug!("cannot format balance {balance}: {e}"),
            },
            Err(e) => tracing::debug!("balance read failed: {e:#}"),
        }

        let amount = scale_amount(&params.amount, decimals)?;
        let gas_price = params
            .gas_price
            .as_deref()
            .map(scale_gas_price)
            .transpose()?;
        session.info(format!(
            "Transferring {} {symbol} to {}",
            params.amount, params.recipient
        ));

        if let Some(limit) = &params.gas_limit {
            session.warn(format!(
                "Ignoring gas limit override ({limit}): the allowance is forced below the estimate so the transfer runs out of gas"
            ));
        }

        let call = IERC20::transferCall {
            to: params.recipient,
            amount,
        };
        let tx = TxRequest::new(params.token, call.abi_encode())
            .with_from(sender)
            .with_gas_price(gas_price);

        let estimate = client.estimate_gas(&tx).await;
        let (gas_limit, source) = forced_gas_limit(&estimate);
        match (source, &estimate) {
            (GasSource::Estimated { estimate }, _) => session.info(format!(
                "Estimated gas {estimate}, forcing gas limit to {gas_limit}"
            )),
            (GasSource::Fallback, Err(e)) => session.warn(format!(
                "{}; falling back to gas limit {gas_limit}",
                TransferError::EstimationFailure(format!("{e:#}"))
            )),
            (GasSource::Fallback, Ok(_)) => {}
        }
        if let Some(gas_price) = gas_price {
            session.info(format!("Using gas price {gas_price} wei"));
        }
        let tx = tx.with_gas_limit(gas_limit);

        let tx_hash = client
            .send_transaction(&signer, tx.clone())
            .await
            .map_err(|e| TransferError::BroadcastFailure(format!("{e:#}")))?;
        session.success(format!("Transaction submitted: {tx_hash}"));

        self.monitor.watch(&client, &tx, tx_hash, session).await
    }
}

async fn resolve_symbol<C: ChainClient>(client: &C, token: Address) -> BestEffort<String> {
    let tx = TxRequest::new(token, IERC20::symbolCall {}.abi_encode());
    let symbol = match client.read(&tx).await {
        Ok(result) => IERC20::symbolCall::abi_decode_returns(&result).map_err(eyre::Report::from),
        Err(e) => Err(e),
    };
    match symbol {
        Ok(symbol) => BestEffort::Value(symbol),
        Err(e) => BestEffort::Defaulted {
            value: DEFAULT_SYMBOL.to_string(),
            reason: format!("Could not read token symbol ({e:#}), using {DEFAULT_SYMBOL}"),
        },
    }
}

async fn resolve_decimals<C: ChainClient>(client: &C, token: Address) -> BestEffort<u8> {
    let tx = TxRequest::new(token, IERC20::decimalsCall {}.abi_encode());
    let decimals = match client.read(&tx).await {
        Ok(result) => {
            IERC20::decimalsCall::abi_decode_returns(&result).map_err(eyre::Report::from)
        }
        Err(e) => Err(e),
    };
    match decimals {
        Ok(decimals) => BestEffort::Value(decimals),
        Err(e) => BestEffort::Defaulted {
            value: DEFAULT_DECIMALS,
            reason: format!("Could not read token decimals ({e:#}), using {DEFAULT_DECIMALS}"),
        },
    }
}

async fn read_balance<C: ChainClient>(
    client: &C,
    token: Address,
    account: Address,
) -> eyre::Result<U256> {
    let tx = TxRequest::new(token, IERC20::balanceOfCall { account }.abi_encode());
    let result = client.read(&tx).await?;
    Ok(IERC20::balanceOfCall::abi_decode_returns(&result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::{MockChain, Poll, Script};
    use crate::chain::ReceiptView;
    use crate::config::{TransferDefaults, TransferForm};
    use crate::session::{LogLevel, SessionFeed};
    use alloy::primitives::TxHash;
    use futures::StreamExt;
    use std::time::Duration;
    use uuid::Uuid;

    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TOKEN: &str = "0xaf88d065e77c8cC2239327C5EDb3A432268e5831";
    const RECIPIENT: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

    fn form() -> TransferForm {
        TransferForm {
            rpc_url: Some("http://localhost:8545".into()),
            private_key: Some(DEV_KEY.into()),
            token_address: Some(TOKEN.into()),
            recipient: Some(RECIPIENT.into()),
            amount: Some("1.5".into()),
            ..Default::default()
        }
    }

    fn request(form: TransferForm) -> TransferRequest {
        TransferRequest::resolve(form, &TransferDefaults::default())
    }

    fn orchestrator(chain: &MockChain) -> TransferOrchestrator<MockChain> {
        TransferOrchestrator::new(
            chain.clone(),
            MonitorConfig::default().with_poll_interval(Duration::from_secs(5)),
        )
    }

    async fn run(chain: &MockChain, form: TransferForm) -> Vec<SessionFeed> {
        let session = Arc::new(Session::new(Uuid::new_v4()));
        orchestrator(chain).execute(request(form), &session).await;
        session.subscribe().collect().await
    }

    fn errors(feed: &[SessionFeed]) -> Vec<String> {
        feed.iter()
            .filter_map(SessionFeed::event)
            .filter(|e| e.level == LogLevel::Error)
            .map(|e| e.message.clone())
            .collect()
    }

    fn messages(feed: &[SessionFeed]) -> Vec<String> {
        feed.iter()
            .filter_map(SessionFeed::event)
            .map(|e| e.message.clone())
            .collect()
    }

    fn mined(success: bool, block_number: u64, gas_used: u64) -> Poll {
        Poll::Mined(ReceiptView {
            success,
            block_number,
            gas_used,
        })
    }

    #[tokio::test]
    async fn test_missing_fields_abort_before_network() {
        let chain = MockChain::idle();
        let feed = run(
            &chain,
            TransferForm {
                rpc_url: None,
                private_key: None,
                ..form()
            },
        )
        .await;

        assert_eq!(feed.len(), 2);
        assert_eq!(
            errors(&feed),
            ["Missing required configuration: rpc_url, private_key"]
        );
        assert_eq!(feed[1], SessionFeed::End);
        assert!(chain.recorded().connected_to.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_amount_is_single_terminal_error() {
        let chain = MockChain::idle();
        let feed = run(
            &chain,
            TransferForm {
                amount: Some("abc".into()),
                ..form()
            },
        )
        .await;

        let errors = errors(&feed);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Invalid amount 'abc'"));
        assert_eq!(feed.last(), Some(&SessionFeed::End));
        assert!(chain.recorded().sent.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_gas_price_aborts() {
        let chain = MockChain::idle();
        let feed = run(
            &chain,
            TransferForm {
                gas_price: Some("fast".into()),
                ..form()
            },
        )
        .await;

        assert!(errors(&feed)[0].contains("Invalid gas price 'fast'"));
        assert!(chain.recorded().sent.is_empty());
    }

    #[tokio::test]
    async fn test_connection_failure() {
        let chain = MockChain::new(Script {
            connect_error: Some("connection refused".into()),
            ..Default::default()
        });
        let feed = run(&chain, form()).await;

        assert_eq!(feed.len(), 2);
        assert_eq!(
            errors(&feed),
            ["Failed to connect to RPC endpoint: connection refused"]
        );
        assert_eq!(chain.recorded().connected_to, ["http://localhost:8545"]);
    }

    #[tokio::test]
    async fn test_malformed_credential() {
        let chain = MockChain::idle();
        let feed = run(
            &chain,
            TransferForm {
                private_key: Some("0xnot-a-key".into()),
                ..form()
            },
        )
        .await;

        let errors = errors(&feed);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Invalid private key"));
        assert!(chain.recorded().sent.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_lifecycle_event_order() {
        let chain = MockChain::with_polls([Poll::NotFound, Poll::Pending, mined(true, 100, 20_999)]);
        let feed = run(&chain, form()).await;
        let messages = messages(&feed);

        let hash = TxHash::repeat_byte(0xaa);
        let submitted = messages
            .iter()
            .position(|m| m == &format!("Transaction submitted: {hash}"))
            .unwrap();
        let tail = &messages[submitted + 1..];
        assert_eq!(tail.len(), 5);
        assert!(tail[0].contains("not yet found in mempool"));
        assert!(tail[1].contains("is pending"));
        assert_eq!(tail[2], "Transaction confirmed in block 100");
        assert_eq!(tail[3], "Gas used: 20999 of 21000");
        assert_eq!(tail[4], format!("Explorer: https://etherscan.io/tx/{hash}"));
        assert_eq!(feed.last(), Some(&SessionFeed::End));

        // 1.5 tokens at 6 decimals, forced one below the 21001 estimate
        let sent = &chain.recorded().sent;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].gas_limit, Some(21_000));
        let call = IERC20::transferCall::abi_decode(&sent[0].data).unwrap();
        assert_eq!(call.amount, U256::from(1_500_000u64));
        assert_eq!(call.to, RECIPIENT.parse::<Address>().unwrap());
        assert!(messages.contains(&"Sender balance: 5.000000 USDC".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_estimation_failure_uses_fallback_and_ignores_gas_limit() {
        let chain = MockChain::new(Script {
            estimate: Err("execution reverted: insufficient balance".into()),
            polls: [mined(false, 3, 44_000)].into_iter().collect(),
            ..Default::default()
        });
        let feed = run(
            &chain,
            TransferForm {
                gas_limit: Some("500000".into()),
                gas_price: Some("2".into()),
                ..form()
            },
        )
        .await;

        let sent = &chain.recorded().sent;
        assert_eq!(sent[0].gas_limit, Some(45_000));
        assert_eq!(sent[0].gas_price, Some(2_000_000_000));

        let warnings: Vec<_> = feed
            .iter()
            .filter_map(SessionFeed::event)
            .filter(|e| e.level == LogLevel::Warn)
            .map(|e| e.message.clone())
            .collect();
        assert!(warnings[0].starts_with("Ignoring gas limit override (500000)"));
        assert!(warnings[1].starts_with("Gas estimation failed: execution reverted"));
        assert!(warnings[1].ends_with("falling back to gas limit 45000"));

        let errors = errors(&feed);
        assert_eq!(errors[0], "Transaction mined but reverted in block 3");
        assert_eq!(errors[1], "Revert reason: out of gas");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_metadata_defaults_with_warnings() {
        let chain = MockChain::new(Script {
            symbol: None,
            decimals: None,
            balance: None,
            polls: [mined(true, 1, 21_000)].into_iter().collect(),
            ..Default::default()
        });
        let feed = run(&chain, form()).await;
        let messages = messages(&feed);

        assert!(messages.iter().any(|m| m.starts_with("Could not read token symbol")));
        assert!(messages.iter().any(|m| m.starts_with("Could not read token decimals")));
        assert!(messages.contains(&format!("Token {TOKEN}: TOKEN (18 decimals)")));
        let call = IERC20::transferCall::abi_decode(&chain.recorded().sent[0].data).unwrap();
        assert_eq!(call.amount, U256::from(15u64) * U256::from(10u64).pow(U256::from(17u64)));
    }

    #[tokio::test]
    async fn test_broadcast_failure() {
        let chain = MockChain::new(Script {
            broadcast: Err("nonce too low".into()),
            ..Default::default()
        });
        let feed = run(&chain, form()).await;

        let errors = errors(&feed);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Failed to broadcast transfer"));
        assert!(errors[0].contains("nonce too low"));
        assert_eq!(feed.last(), Some(&SessionFeed::End));
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitoring_failure_is_reported_and_completes() {
        let chain = MockChain::with_polls([Poll::Error("connection reset".into())]);
        let feed = run(&chain, form()).await;

        let errors = errors(&feed);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Monitoring failed"));
        assert_eq!(feed.last(), Some(&SessionFeed::End));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_releases_session() {
        let chain = MockChain::with_polls([mined(true, 1, 21_000)]);
        let registry = Arc::new(SessionRegistry::new(Duration::from_secs(60)));
        let session = registry.create().await;
        let live = session.subscribe();

        let orchestrator = Arc::new(orchestrator(&chain));
        orchestrator
            .spawn(&registry, request(form()), Arc::clone(&session))
            .await
            .unwrap();

        let feed: Vec<_> = live.collect().await;
        assert_eq!(feed.last(), Some(&SessionFeed::End));
        assert!(registry.get(session.id()).await.is_some());

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(registry.get(session.id()).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_ends_session_when_attempt_panics() {
        let chain = MockChain::new(Script {
            panic_on_connect: true,
            ..Default::default()
        });
        let registry = Arc::new(SessionRegistry::new(Duration::from_secs(60)));
        let session = registry.create().await;

        let orchestrator = Arc::new(orchestrator(&chain));
        orchestrator
            .spawn(&registry, request(form()), Arc::clone(&session))
            .await
            .unwrap();

        let feed: Vec<_> = session.subscribe().collect().await;
        assert_eq!(errors(&feed), ["Transfer attempt aborted unexpectedly"]);
        assert_eq!(feed.last(), Some(&SessionFeed::End));

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(registry.get(session.id()).await.is_none());
    }

    #[test]
    fn test_best_effort_into_value() {
        let read = BestEffort::Value(6u8);
        let defaulted = BestEffort::Defaulted {
            value: 18u8,
            reason: "no decimals()".into(),
        };
        assert_eq!(read.into_value(), 6);
        assert_eq!(defaulted.into_value(), 18);
    }
}
