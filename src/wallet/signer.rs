// src/wallet/signer.rs
use super::{transfer_calldata, WalletAdapter, WalletError};
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use reqwest::Url;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{info, warn};

/// Wallet backed by a local private key and one RPC endpoint per network.
///
/// Switching networks means signing against another endpoint, so a switch
/// only succeeds for networks that have an RPC URL configured.
pub struct SignerWallet {
    signer: PrivateKeySigner,
    rpc_urls: HashMap<u64, Url>,
    default_chain: u64,
    connected: AtomicBool,
    chain_id: AtomicU64,
}

impl SignerWallet {
    pub fn new(
        private_key: &str,
        rpc_urls: HashMap<u64, String>,
        default_chain: u64,
    ) -> Result<Self, WalletError> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .map_err(|e| WalletError::Rpc(format!("invalid private key: {e}")))?;

        let rpc_urls = rpc_urls
            .into_iter()
            .map(|(chain, url)| {
                url.parse::<Url>()
                    .map(|u| (chain, u))
                    .map_err(|e| WalletError::Rpc(format!("invalid RPC URL for chain {chain}: {e}")))
            })
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(Self {
            signer,
            rpc_urls,
            default_chain,
            connected: AtomicBool::new(false),
            chain_id: AtomicU64::new(0),
        })
    }

    fn provider(&self, chain_id: u64) -> Result<impl Provider, WalletError> {
        let url = self
            .rpc_urls
            .get(&chain_id)
            .cloned()
            .ok_or(WalletError::UnsupportedNetwork(chain_id))?;

        Ok(ProviderBuilder::new()
            .wallet(EthereumWallet::from(self.signer.clone()))
            .connect_http(url))
    }

    // chain id reported by the endpoint must match what we think we talk to
    async fn verify_chain(&self, chain_id: u64) -> Result<(), WalletError> {
        let provider = self.provider(chain_id)?;
        let reported = provider
            .get_chain_id()
            .await
            .map_err(|e| WalletError::Rpc(e.to_string()))?;

        if reported != chain_id {
            warn!("RPC for chain {} reports chain {}", chain_id, reported);
            return Err(WalletError::UnsupportedNetwork(chain_id));
        }
        Ok(())
    }

    fn current_chain(&self) -> Result<u64, WalletError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(WalletError::NotConnected);
        }
        Ok(self.chain_id.load(Ordering::SeqCst))
    }

    async fn send(&self, tx: TransactionRequest) -> Result<TxHash, WalletError> {
        let chain_id = self.current_chain()?;
        let provider = self.provider(chain_id)?;

        let tx = tx.with_from(self.signer.address()).with_chain_id(chain_id);
        let pending = provider
            .send_transaction(tx)
            .await
            .map_err(|e| WalletError::Rpc(e.to_string()))?;

        Ok(*pending.tx_hash())
    }
}

impl WalletAdapter for SignerWallet {
    fn name(&self) -> &'static str {
        "signer"
    }

    async fn connect(&self) -> Result<Address, WalletError> {
        self.verify_chain(self.default_chain).await?;
        self.chain_id.store(self.default_chain, Ordering::SeqCst);
        self.connected.store(true, Ordering::SeqCst);

        let address = self.signer.address();
        info!("Signer wallet connected: {} on chain {}", address, self.default_chain);
        Ok(address)
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.chain_id.store(0, Ordering::SeqCst);
    }

    async fn address(&self) -> Option<Address> {
        self.connected
            .load(Ordering::SeqCst)
            .then(|| self.signer.address())
    }

    async fn chain_id(&self) -> Option<u64> {
        self.current_chain().ok()
    }

    async fn switch_network(&self, chain_id: u64) -> Result<(), WalletError> {
        self.current_chain()?;
        self.verify_chain(chain_id).await?;
        self.chain_id.store(chain_id, Ordering::SeqCst);
        info!("Signer wallet switched to chain {}", chain_id);
        Ok(())
    }

    async fn send_native(&self, to: Address, value: U256) -> Result<TxHash, WalletError> {
        let tx = TransactionRequest::default().with_to(to).with_value(value);
        self.send(tx).await
    }

    async fn transfer_token(
        &self,
        token: Address,
        recipient: Address,
        amount: U256,
    ) -> Result<TxHash, WalletError> {
        let data: Bytes = transfer_calldata(recipient, amount);
        let tx = TransactionRequest::default().with_to(token).with_input(data);
        self.send(tx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // anvil's first dev account
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn rejects_malformed_key() {
        assert!(SignerWallet::new("0x1234", HashMap::new(), 1).is_err());
    }

    #[tokio::test]
    async fn stays_disconnected_until_connect() {
        let wallet = SignerWallet::new(DEV_KEY, HashMap::new(), 56).unwrap();
        assert!(wallet.address().await.is_none());
        assert!(wallet.chain_id().await.is_none());
        assert_eq!(
            wallet.send_native(Address::ZERO, U256::from(1u8)).await,
            Err(WalletError::NotConnected)
        );
    }

    #[tokio::test]
    async fn networks_without_rpc_are_unsupported() {
        let wallet = SignerWallet::new(DEV_KEY, HashMap::new(), 56).unwrap();
        assert_eq!(wallet.connect().await, Err(WalletError::UnsupportedNetwork(56)));
    }
}
