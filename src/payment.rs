// src/payment.rs
use crate::calculator::{self, CalcError};
use crate::config::{NetworkConfig, PLACEHOLDER_PREFIX};
use crate::models::{Instrument, PaymentIntent, RateSnapshot};
use crate::session::Session;
use crate::wallet::{WalletAdapter, WalletError};
use alloy::primitives::{Address, TxHash, U256};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{error, info, warn};

pub const FALLBACK_FAILURE: &str = "Transaction failed or was rejected.";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PaymentError {
    #[error("Connect your wallet first.")]
    WalletNotConnected,
    #[error("Unknown network {0}.")]
    UnknownNetwork(String),
    #[error("Presale wallet address is not configured for this chain.")]
    MisconfiguredDestination,
    #[error("Price is not available. Try again in a moment.")]
    PriceUnavailable,
    #[error("Minimum investment is ${minimum}.")]
    BelowMinimum { minimum: f64 },
    #[error("Switch your wallet network to {label} and try again.")]
    SwitchNetwork { label: String },
    #[error("Calculated {what} amount is 0.")]
    ZeroAmount { what: String },
    #[error("{symbol} contract is not configured for this chain.")]
    MissingStablecoin { symbol: String },
    #[error("Could not compute the payment amount: {0}")]
    Amount(#[from] CalcError),
    #[error("{0}")]
    Wallet(String),
    #[error("A payment is already in progress.")]
    InProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Validation,
    Wallet,
    Busy,
}

impl PaymentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaymentError::SwitchNetwork { .. } | PaymentError::Wallet(_) => ErrorKind::Wallet,
            PaymentError::InProgress => ErrorKind::Busy,
            _ => ErrorKind::Validation,
        }
    }

    fn from_wallet(err: WalletError) -> Self {
        let msg = err.to_string();
        if msg.trim().is_empty() {
            PaymentError::Wallet(FALLBACK_FAILURE.to_string())
        } else {
            PaymentError::Wallet(msg)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub tx_hash: TxHash,
    pub network: String,
    pub instrument: Instrument,
    pub amount_units: U256,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "detail")]
pub enum PaymentState {
    Idle,
    Validating,
    SwitchingNetwork,
    Submitting,
    Succeeded(TxHash),
    Failed(String),
}

/// Last outcome shown under the pay button; exactly one side is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PaymentStatus {
    pub error: Option<String>,
    pub success: Option<String>,
}

// Resolved payment, ready to hand to the wallet
enum Transfer {
    Native { amount: f64, value: U256 },
    Token { token: Address, amount: f64, units: U256 },
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Runs one payment at a time against the session wallet.
pub struct PaymentSubmitter<W> {
    session: Arc<Session<W>>,
    networks: Vec<NetworkConfig>,
    min_usd: f64,
    stablecoin_symbol: String,
    busy: AtomicBool,
    state: RwLock<PaymentState>,
    status: RwLock<PaymentStatus>,
}

impl<W: WalletAdapter> PaymentSubmitter<W> {
    pub fn new(
        session: Arc<Session<W>>,
        networks: Vec<NetworkConfig>,
        min_usd: f64,
        stablecoin_symbol: &str,
    ) -> Self {
        Self {
            session,
            networks,
            min_usd,
            stablecoin_symbol: stablecoin_symbol.to_string(),
            busy: AtomicBool::new(false),
            state: RwLock::new(PaymentState::Idle),
            status: RwLock::new(PaymentStatus::default()),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> PaymentState {
        self.state.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn status(&self) -> PaymentStatus {
        self.status.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_state(&self, state: PaymentState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = state;
    }

    fn set_status(&self, status: PaymentStatus) {
        *self.status.write().unwrap_or_else(|e| e.into_inner()) = status;
    }

    /// Record a failure that happened outside `submit`, e.g. the widget's wallet connect.
    pub fn fail(&self, message: &str) {
        let message = if message.trim().is_empty() {
            FALLBACK_FAILURE.to_string()
        } else {
            message.to_string()
        };
        self.set_state(PaymentState::Failed(message.clone()));
        self.set_status(PaymentStatus {
            error: Some(message),
            success: None,
        });
    }

    /// Validate `intent`, switch networks if needed and send exactly one transaction.
    pub async fn submit(
        &self,
        intent: &PaymentIntent,
        rates: Option<&RateSnapshot>,
    ) -> Result<PaymentReceipt, PaymentError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Pay pressed while another payment is running");
            return Err(PaymentError::InProgress);
        }
        let _guard = BusyGuard(&self.busy);

        let outcome = self.run(intent, rates).await;
        match &outcome {
            Ok(receipt) => {
                info!("Payment sent on {}: {}", receipt.network, receipt.tx_hash);
                self.set_state(PaymentState::Succeeded(receipt.tx_hash));
                self.set_status(PaymentStatus {
                    error: None,
                    success: Some(receipt.message.clone()),
                });
            }
            Err(e) => {
                error!("Payment failed: {}", e);
                self.set_state(PaymentState::Failed(e.to_string()));
                self.set_status(PaymentStatus {
                    error: Some(e.to_string()),
                    success: None,
                });
            }
        }
        outcome
    }

    async fn run(
        &self,
        intent: &PaymentIntent,
        rates: Option<&RateSnapshot>,
    ) -> Result<PaymentReceipt, PaymentError> {
        self.set_state(PaymentState::Validating);
        let wallet = self.session.wallet();

        if wallet.address().await.is_none() {
            return Err(PaymentError::WalletNotConnected);
        }

        let network = self
            .networks
            .iter()
            .find(|n| n.key.eq_ignore_ascii_case(&intent.network))
            .ok_or_else(|| PaymentError::UnknownNetwork(intent.network.clone()))?;

        let destination = receiving_address(network).ok_or(PaymentError::MisconfiguredDestination)?;

        let price = rates.map(|r| r.price_usd_per_token).unwrap_or(0.0);
        if !price.is_finite() || price <= 0.0 {
            return Err(PaymentError::PriceUnavailable);
        }

        if intent.usd_amount.is_nan() || intent.usd_amount < self.min_usd {
            return Err(PaymentError::BelowMinimum { minimum: self.min_usd });
        }

        // config and amount errors surface before any wallet call
        let transfer = match intent.instrument {
            Instrument::Native => {
                let native_usd = rates.map(|r| r.native_usd(&network.native_symbol)).unwrap_or(0.0);
                let amount = calculator::native_quantity(intent.usd_amount, native_usd);
                Transfer::Native {
                    amount,
                    value: calculator::native_to_wei(amount)?,
                }
            }
            Instrument::Usdt => {
                let token = network
                    .usdt_address
                    .as_deref()
                    .and_then(|a| a.parse::<Address>().ok())
                    .ok_or_else(|| PaymentError::MissingStablecoin {
                        symbol: self.stablecoin_symbol.clone(),
                    })?;
                let amount = calculator::stablecoin_quantity(intent.usd_amount);
                Transfer::Token {
                    token,
                    amount,
                    units: calculator::stablecoin_to_units(amount, network.usdt_decimals)?,
                }
            }
        };

        if wallet.chain_id().await != Some(network.chain_id) {
            self.set_state(PaymentState::SwitchingNetwork);
            info!("Switching wallet to {} ({})", network.label, network.chain_id);
            if let Err(e) = wallet.switch_network(network.chain_id).await {
                warn!("Network switch failed: {}", e);
                return Err(PaymentError::SwitchNetwork {
                    label: network.label.clone(),
                });
            }
        }

        self.set_state(PaymentState::Submitting);

        match transfer {
            Transfer::Native { amount, value } => {
                if amount <= 0.0 {
                    return Err(PaymentError::ZeroAmount { what: "native".into() });
                }
                info!("Sending {} {} ({} wei) to {}", amount, network.native_symbol, value, destination);

                let tx_hash = wallet
                    .send_native(destination, value)
                    .await
                    .map_err(PaymentError::from_wallet)?;

                Ok(PaymentReceipt {
                    tx_hash,
                    network: network.key.clone(),
                    instrument: Instrument::Native,
                    amount_units: value,
                    message: format!("Transaction sent: {tx_hash}"),
                })
            }
            Transfer::Token { token, amount, units } => {
                if amount <= 0.0 {
                    return Err(PaymentError::ZeroAmount {
                        what: self.stablecoin_symbol.clone(),
                    });
                }
                info!("Transferring {} {} ({} units) to {}", amount, self.stablecoin_symbol, units, destination);

                let tx_hash = wallet
                    .transfer_token(token, destination, units)
                    .await
                    .map_err(PaymentError::from_wallet)?;

                Ok(PaymentReceipt {
                    tx_hash,
                    network: network.key.clone(),
                    instrument: Instrument::Usdt,
                    amount_units: units,
                    message: format!("{} transfer sent: {tx_hash}", self.stablecoin_symbol),
                })
            }
        }
    }
}

/// Receiving address for a network, `None` when unset or still a template value.
pub fn receiving_address(network: &NetworkConfig) -> Option<Address> {
    network
        .presale_wallet
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty() && !a.starts_with(PLACEHOLDER_PREFIX))
        .and_then(|a| a.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::wallet::mock::{Call, MockWallet};
    use chrono::Utc;
    use serde_json::json;
    use std::collections::HashMap;

    fn rates(price: f64, eth_usd: f64, bnb_usd: f64) -> RateSnapshot {
        let mut native_rates = HashMap::new();
        native_rates.insert("ethUsd".to_string(), json!(eth_usd));
        native_rates.insert("bnbUsd".to_string(), json!(bnb_usd));
        RateSnapshot {
            phase: "Phase 1".into(),
            price_usd_per_token: price,
            total_supply: 1_000_000.0,
            sold_supply: 100_000.0,
            progress: 0.1,
            updated_at: Utc::now(),
            native_rates,
        }
    }

    fn intent(network: &str, instrument: Instrument, usd: f64) -> PaymentIntent {
        PaymentIntent {
            network: network.into(),
            instrument,
            usd_amount: usd,
        }
    }

    fn submitter(wallet: MockWallet) -> PaymentSubmitter<MockWallet> {
        let cfg = test_config();
        PaymentSubmitter::new(Arc::new(Session::new(wallet)), cfg.networks, 50.0, "USDT")
    }

    fn destination(key: &str) -> Address {
        receiving_address(test_config().network(key).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn rejects_without_wallet() {
        let s = submitter(MockWallet::disconnected());
        let err = s
            .submit(&intent("ETH", Instrument::Native, 100.0), Some(&rates(0.05, 2000.0, 500.0)))
            .await
            .unwrap_err();
        assert_eq!(err, PaymentError::WalletNotConnected);
        assert!(s.session.wallet().calls().is_empty());
    }

    #[tokio::test]
    async fn rejects_placeholder_destination() {
        let mut cfg = test_config();
        cfg.networks[0].presale_wallet = Some("0xYOUR_ETH_SAFE_HERE".into());
        cfg.networks[1].presale_wallet = None;
        let s = PaymentSubmitter::new(
            Arc::new(Session::new(MockWallet::connected(1))),
            cfg.networks,
            50.0,
            "USDT",
        );
        let r = rates(0.05, 2000.0, 500.0);

        for key in ["ETH", "BSC"] {
            let err = s
                .submit(&intent(key, Instrument::Native, 100.0), Some(&r))
                .await
                .unwrap_err();
            assert_eq!(err, PaymentError::MisconfiguredDestination);
        }
    }

    #[tokio::test]
    async fn rejects_missing_or_zero_price_for_any_amount() {
        let s = submitter(MockWallet::connected(1));
        for usd in [10.0, 50.0, 10_000.0] {
            let err = s
                .submit(&intent("ETH", Instrument::Usdt, usd), Some(&rates(0.0, 2000.0, 500.0)))
                .await
                .unwrap_err();
            assert_eq!(err, PaymentError::PriceUnavailable);

            let err = s.submit(&intent("ETH", Instrument::Usdt, usd), None).await.unwrap_err();
            assert_eq!(err, PaymentError::PriceUnavailable);
        }
        assert!(s.session.wallet().calls().is_empty());
    }

    #[tokio::test]
    async fn minimum_threshold_is_inclusive() {
        let s = submitter(MockWallet::connected(1));
        let r = rates(0.05, 2000.0, 500.0);

        let err = s
            .submit(&intent("ETH", Instrument::Usdt, 49.0), Some(&r))
            .await
            .unwrap_err();
        assert_eq!(err, PaymentError::BelowMinimum { minimum: 50.0 });
        assert_eq!(err.to_string(), "Minimum investment is $50.");
        assert!(s.session.wallet().calls().is_empty());

        s.submit(&intent("ETH", Instrument::Usdt, 50.0), Some(&r))
            .await
            .unwrap();
        assert_eq!(s.session.wallet().calls().len(), 1);
    }

    #[tokio::test]
    async fn switches_network_before_transfer() {
        let s = submitter(MockWallet::connected(1));
        s.submit(&intent("BSC", Instrument::Native, 100.0), Some(&rates(0.05, 2000.0, 500.0)))
            .await
            .unwrap();

        let calls = s.session.wallet().calls();
        assert_eq!(calls[0], Call::Switch(56));
        assert!(matches!(calls[1], Call::Native { .. }));
    }

    #[tokio::test]
    async fn failed_switch_sends_nothing() {
        let wallet = MockWallet::connected(1);
        *wallet.switch_result.lock().unwrap() = Err(WalletError::Rejected("User rejected".into()));
        let s = submitter(wallet);

        let err = s
            .submit(&intent("BSC", Instrument::Usdt, 100.0), Some(&rates(0.05, 2000.0, 500.0)))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Switch your wallet network to BNB and try again.");
        assert_eq!(s.session.wallet().calls(), vec![Call::Switch(56)]);
        assert_eq!(s.status().success, None);
    }

    #[tokio::test]
    async fn stablecoin_transfer_uses_six_decimal_units() {
        let s = submitter(MockWallet::connected(56));
        let receipt = s
            .submit(&intent("BSC", Instrument::Usdt, 100.0), Some(&rates(0.05, 2000.0, 500.0)))
            .await
            .unwrap();

        let usdt: Address = "0x55d398326f99059fF775485246999027B3197955".parse().unwrap();
        assert_eq!(
            s.session.wallet().calls(),
            vec![Call::Token {
                token: usdt,
                recipient: destination("BSC"),
                amount: U256::from(100_000_000u64),
            }]
        );
        assert!(receipt.message.starts_with("USDT transfer sent: 0x"));
        assert_eq!(s.state(), PaymentState::Succeeded(receipt.tx_hash));
    }

    #[tokio::test]
    async fn native_transfer_converts_at_rate() {
        let s = submitter(MockWallet::connected(1));
        let receipt = s
            .submit(&intent("ETH", Instrument::Native, 100.0), Some(&rates(0.05, 2000.0, 500.0)))
            .await
            .unwrap();

        assert_eq!(
            s.session.wallet().calls(),
            vec![Call::Native {
                to: destination("ETH"),
                value: U256::from(50_000_000_000_000_000u128),
            }]
        );
        assert!(receipt.message.starts_with("Transaction sent: 0x"));
    }

    #[tokio::test]
    async fn zero_native_rate_is_rejected_before_sending() {
        let s = submitter(MockWallet::connected(1));
        let err = s
            .submit(&intent("ETH", Instrument::Native, 100.0), Some(&rates(0.05, 0.0, 500.0)))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Calculated native amount is 0.");
        assert!(s.session.wallet().calls().is_empty());
    }

    #[tokio::test]
    async fn wallet_message_surfaces_and_clears_success() {
        let wallet = MockWallet::connected(1);
        let s = submitter(wallet);
        let r = rates(0.05, 2000.0, 500.0);

        s.submit(&intent("ETH", Instrument::Native, 100.0), Some(&r))
            .await
            .unwrap();
        assert!(s.status().success.is_some());

        *s.session.wallet().send_result.lock().unwrap() =
            Err(WalletError::Rejected("User denied transaction signature.".into()));
        let err = s
            .submit(&intent("ETH", Instrument::Native, 100.0), Some(&r))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Wallet);
        assert_eq!(
            s.status(),
            PaymentStatus {
                error: Some("User denied transaction signature.".into()),
                success: None,
            }
        );
        assert!(!s.is_busy());
    }

    #[tokio::test]
    async fn empty_wallet_message_falls_back() {
        let wallet = MockWallet::connected(1);
        *wallet.send_result.lock().unwrap() = Err(WalletError::Rpc(String::new()));
        let s = submitter(wallet);

        let err = s
            .submit(&intent("ETH", Instrument::Native, 100.0), Some(&rates(0.05, 2000.0, 500.0)))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), FALLBACK_FAILURE);
    }

    #[tokio::test]
    async fn second_submit_is_refused_while_busy() {
        let s = submitter(MockWallet::connected(1));
        s.busy.store(true, Ordering::SeqCst);

        let err = s
            .submit(&intent("ETH", Instrument::Native, 100.0), Some(&rates(0.05, 2000.0, 500.0)))
            .await
            .unwrap_err();
        assert_eq!(err, PaymentError::InProgress);
        assert!(s.session.wallet().calls().is_empty());
        assert_eq!(s.state(), PaymentState::Idle);
    }

    #[tokio::test]
    async fn missing_stablecoin_contract_fails_before_switch() {
        let mut cfg = test_config();
        cfg.networks[1].usdt_address = None;
        let s = PaymentSubmitter::new(
            Arc::new(Session::new(MockWallet::connected(1))),
            cfg.networks,
            50.0,
            "USDT",
        );

        let err = s
            .submit(&intent("BSC", Instrument::Usdt, 100.0), Some(&rates(0.05, 2000.0, 500.0)))
            .await
            .unwrap_err();
        assert_eq!(err, PaymentError::MissingStablecoin { symbol: "USDT".into() });
        assert!(s.session.wallet().calls().is_empty());
    }

    #[tokio::test]
    async fn unconvertible_amount_fails_before_switch() {
        let s = submitter(MockWallet::connected(56));
        let err = s
            .submit(&intent("ETH", Instrument::Native, 1e30), Some(&rates(0.05, 2000.0, 500.0)))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Amount(_)));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(s.session.wallet().calls().is_empty());
    }

    #[tokio::test]
    async fn outside_failure_replaces_success() {
        let s = submitter(MockWallet::connected(1));
        s.submit(&intent("ETH", Instrument::Native, 100.0), Some(&rates(0.05, 2000.0, 500.0)))
            .await
            .unwrap();

        s.fail("User rejected the request.");
        assert_eq!(
            s.status(),
            PaymentStatus {
                error: Some("User rejected the request.".into()),
                success: None,
            }
        );

        s.fail("");
        assert_eq!(s.status().error.as_deref(), Some(FALLBACK_FAILURE));
    }
}
