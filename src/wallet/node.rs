// src/wallet/node.rs
use super::{transfer_calldata, WalletAdapter, WalletError};
use alloy::primitives::{Address, TxHash, U256};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// EIP-1193 code for "user rejected the request"
const USER_REJECTED: i64 = 4001;
/// EIP-3326 code for "unrecognized chain id"
const UNKNOWN_CHAIN: i64 = 4902;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RpcResponse<T> {
    Error { error: RpcError },
    Success { result: T },
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl From<RpcError> for WalletError {
    fn from(error: RpcError) -> Self {
        match error.code {
            USER_REJECTED => WalletError::Rejected(error.message),
            _ => WalletError::Rpc(error.message),
        }
    }
}

/// Account managed by an external signer behind a JSON-RPC endpoint.
///
/// Speaks the same methods a browser-injected wallet answers, so approvals
/// and rejections happen on the wallet side.
pub struct NodeWallet {
    rpc_url: String,
    client: Client,
    account: RwLock<Option<Address>>,
    chain_id: AtomicU64,
}

impl NodeWallet {
    pub fn new(rpc_url: &str) -> Self {
        Self {
            rpc_url: rpc_url.to_string(),
            client: Client::new(),
            account: RwLock::new(None),
            chain_id: AtomicU64::new(0),
        }
    }

    async fn call_raw<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<RpcResponse<T>, WalletError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });

        info!("📡 Sending {} → {}", method, self.rpc_url);

        let resp = self
            .client
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| WalletError::Rpc(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(WalletError::Rpc(format!("RPC error: HTTP {}", resp.status())));
        }

        resp.json()
            .await
            .map_err(|e| WalletError::Rpc(e.to_string()))
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, WalletError> {
        match self.call_raw(method, params).await? {
            RpcResponse::Success { result } => Ok(result),
            RpcResponse::Error { error } => {
                warn!("{} failed: {} ({})", method, error.message, error.code);
                Err(error.into())
            }
        }
    }

    async fn fetch_chain_id(&self) -> Result<u64, WalletError> {
        let hex: String = self.call("eth_chainId", json!([])).await?;
        u64::from_str_radix(hex.trim_start_matches("0x"), 16)
            .map_err(|e| WalletError::Rpc(format!("bad chain id {hex}: {e}")))
    }

    async fn sender(&self) -> Result<Address, WalletError> {
        (*self.account.read().await).ok_or(WalletError::NotConnected)
    }

    async fn send_transaction(&self, tx: Value) -> Result<TxHash, WalletError> {
        self.call("eth_sendTransaction", json!([tx])).await
    }
}

impl WalletAdapter for NodeWallet {
    fn name(&self) -> &'static str {
        "node"
    }

    async fn connect(&self) -> Result<Address, WalletError> {
        let mut accounts: Vec<Address> = self.call("eth_accounts", json!([])).await?;
        if accounts.is_empty() {
            accounts = self.call("eth_requestAccounts", json!([])).await?;
        }
        let account = accounts.first().copied().ok_or(WalletError::NotConnected)?;

        let chain_id = self.fetch_chain_id().await?;
        self.chain_id.store(chain_id, Ordering::SeqCst);
        *self.account.write().await = Some(account);

        info!("Node wallet connected: {} on chain {}", account, chain_id);
        Ok(account)
    }

    async fn disconnect(&self) {
        *self.account.write().await = None;
        self.chain_id.store(0, Ordering::SeqCst);
    }

    async fn address(&self) -> Option<Address> {
        *self.account.read().await
    }

    async fn chain_id(&self) -> Option<u64> {
        self.account.read().await.as_ref()?;
        match self.chain_id.load(Ordering::SeqCst) {
            0 => None,
            id => Some(id),
        }
    }

    async fn switch_network(&self, chain_id: u64) -> Result<(), WalletError> {
        self.sender().await?;

        let params = json!([{ "chainId": format!("0x{:x}", chain_id) }]);
        match self.call_raw::<Value>("wallet_switchEthereumChain", params).await? {
            RpcResponse::Success { .. } => {}
            RpcResponse::Error { error } if error.code == UNKNOWN_CHAIN => {
                warn!("Wallet does not know chain {}", chain_id);
                return Err(WalletError::UnsupportedNetwork(chain_id));
            }
            RpcResponse::Error { error } => {
                warn!("wallet_switchEthereumChain failed: {} ({})", error.message, error.code);
                return Err(error.into());
            }
        }

        // trust the wallet, not the request
        let current = self.fetch_chain_id().await?;
        self.chain_id.store(current, Ordering::SeqCst);
        if current != chain_id {
            return Err(WalletError::UnsupportedNetwork(chain_id));
        }
        Ok(())
    }

    async fn send_native(&self, to: Address, value: U256) -> Result<TxHash, WalletError> {
        let from = self.sender().await?;
        self.send_transaction(json!({
            "from": from,
            "to": to,
            "value": value,
        }))
        .await
    }

    async fn transfer_token(
        &self,
        token: Address,
        recipient: Address,
        amount: U256,
    ) -> Result<TxHash, WalletError> {
        let from = self.sender().await?;
        let data = transfer_calldata(recipient, amount);
        self.send_transaction(json!({
            "from": from,
            "to": token,
            "data": format!("0x{}", hex::encode(&data)),
        }))
        .await
    }
}
