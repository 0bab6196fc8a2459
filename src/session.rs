// src/session.rs
use crate::wallet::{WalletAdapter, WalletError};
use alloy::primitives::Address;
use serde::Serialize;
use tracing::info;

/// What the views know about the wallet at render time
#[derive(Debug, Clone, Serialize)]
pub struct SessionState {
    pub connected: bool,
    pub address: Option<Address>,
    pub chain_id: Option<u64>,
    pub wallet: &'static str,
}

/// Wallet session shared by the payment flow and the views.
///
/// Built once in `main` and shut down with the server.
pub struct Session<W> {
    wallet: W,
}

impl<W: WalletAdapter> Session<W> {
    pub fn new(wallet: W) -> Self {
        info!("Session created with {} wallet", wallet.name());
        Self { wallet }
    }

    pub fn wallet(&self) -> &W {
        &self.wallet
    }

    pub async fn connect(&self) -> Result<Address, WalletError> {
        self.wallet.connect().await
    }

    /// Connect when no account is selected; `Some` only for a fresh connection.
    pub async fn connect_if_needed(&self) -> Result<Option<Address>, WalletError> {
        match self.wallet.address().await {
            Some(_) => Ok(None),
            None => self.connect().await.map(Some),
        }
    }

    pub async fn state(&self) -> SessionState {
        let address = self.wallet.address().await;
        SessionState {
            connected: address.is_some(),
            address,
            chain_id: self.wallet.chain_id().await,
            wallet: self.wallet.name(),
        }
    }

    pub async fn shutdown(&self) {
        self.wallet.disconnect().await;
        info!("Session closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::mock::MockWallet;

    #[tokio::test]
    async fn connect_if_needed_connects_once() {
        let session = Session::new(MockWallet::disconnected());
        assert!(!session.state().await.connected);

        let address = session.connect_if_needed().await.unwrap();
        let state = session.state().await;
        assert!(state.connected);
        assert_eq!(state.address, address);
        assert_eq!(session.connect_if_needed().await.unwrap(), None);

        session.shutdown().await;
        assert!(session.state().await.address.is_none());
    }
}
