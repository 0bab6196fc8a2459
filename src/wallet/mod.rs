// src/wallet/mod.rs
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use std::future::Future;
use thiserror::Error;

mod node;
mod signer;
#[cfg(test)]
pub mod mock;

pub use node::NodeWallet;
pub use signer::SignerWallet;

sol! {
    interface IERC20 {
        function transfer(address recipient, uint256 amount) external returns (bool);
    }
}

/// ABI-encoded `transfer(recipient, amount)` call
pub fn transfer_calldata(recipient: Address, amount: U256) -> Bytes {
    Bytes::from(IERC20::transferCall { recipient, amount }.abi_encode())
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WalletError {
    #[error("Wallet is not connected.")]
    NotConnected,
    #[error("{0}")]
    Rejected(String),
    #[error("Network {0} is not available in this wallet.")]
    UnsupportedNetwork(u64),
    #[error("{0}")]
    Rpc(String),
}

/// Everything the payment flow needs from a connected wallet.
///
/// Implementations keep their own connection state; callers never cache the
/// address or network between calls.
pub trait WalletAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn connect(&self) -> impl Future<Output = Result<Address, WalletError>> + Send;

    fn disconnect(&self) -> impl Future<Output = ()> + Send;

    fn address(&self) -> impl Future<Output = Option<Address>> + Send;

    /// Network the wallet currently points at, `None` while disconnected.
    fn chain_id(&self) -> impl Future<Output = Option<u64>> + Send;

    fn switch_network(&self, chain_id: u64) -> impl Future<Output = Result<(), WalletError>> + Send;

    fn send_native(
        &self,
        to: Address,
        value: U256,
    ) -> impl Future<Output = Result<TxHash, WalletError>> + Send;

    /// Calls `transfer(recipient, amount)` on the token contract.
    fn transfer_token(
        &self,
        token: Address,
        recipient: Address,
        amount: U256,
    ) -> impl Future<Output = Result<TxHash, WalletError>> + Send;
}

/// The wallet picked at startup
pub enum Wallet {
    Signer(SignerWallet),
    Node(NodeWallet),
}

impl WalletAdapter for Wallet {
    fn name(&self) -> &'static str {
        match self {
            Wallet::Signer(w) => w.name(),
            Wallet::Node(w) => w.name(),
        }
    }

    async fn connect(&self) -> Result<Address, WalletError> {
        match self {
            Wallet::Signer(w) => w.connect().await,
            Wallet::Node(w) => w.connect().await,
        }
    }

    async fn disconnect(&self) {
        match self {
            Wallet::Signer(w) => w.disconnect().await,
            Wallet::Node(w) => w.disconnect().await,
        }
    }

    async fn address(&self) -> Option<Address> {
        match self {
            Wallet::Signer(w) => w.address().await,
            Wallet::Node(w) => w.address().await,
        }
    }

    async fn chain_id(&self) -> Option<u64> {
        match self {
            Wallet::Signer(w) => w.chain_id().await,
            Wallet::Node(w) => w.chain_id().await,
        }
    }

    async fn switch_network(&self, chain_id: u64) -> Result<(), WalletError> {
        match self {
            Wallet::Signer(w) => w.switch_network(chain_id).await,
            Wallet::Node(w) => w.switch_network(chain_id).await,
        }
    }

    async fn send_native(&self, to: Address, value: U256) -> Result<TxHash, WalletError> {
        match self {
            Wallet::Signer(w) => w.send_native(to, value).await,
            Wallet::Node(w) => w.send_native(to, value).await,
        }
    }

    async fn transfer_token(
        &self,
        token: Address,
        recipient: Address,
        amount: U256,
    ) -> Result<TxHash, WalletError> {
        match self {
            Wallet::Signer(w) => w.transfer_token(token, recipient, amount).await,
            Wallet::Node(w) => w.transfer_token(token, recipient, amount).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn transfer_calldata_uses_erc20_selector() {
        let recipient = address!("fddcfb6f1f104793df8729d7aa6c2b7183ee3b55");
        let data = transfer_calldata(recipient, U256::from(100_000_000u64));

        assert_eq!(data.len(), 4 + 32 + 32);
        // keccak256("transfer(address,uint256)")[..4]
        assert_eq!(&data[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(&data[16..36], recipient.as_slice());
        assert_eq!(U256::from_be_slice(&data[36..68]), U256::from(100_000_000u64));
    }
}
