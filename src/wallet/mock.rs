// src/wallet/mock.rs
use super::{WalletAdapter, WalletError};
use alloy::primitives::{Address, TxHash, U256};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Switch(u64),
    Native { to: Address, value: U256 },
    Token { token: Address, recipient: Address, amount: U256 },
}

/// Records every wallet call; outcomes are set per test.
pub struct MockWallet {
    pub account: Mutex<Option<Address>>,
    pub chain: Mutex<u64>,
    pub connect_result: Mutex<Result<(), WalletError>>,
    pub switch_result: Mutex<Result<(), WalletError>>,
    pub send_result: Mutex<Result<TxHash, WalletError>>,
    pub calls: Mutex<Vec<Call>>,
}

impl MockWallet {
    pub fn connected(chain: u64) -> Self {
        Self {
            account: Mutex::new(Some(Address::repeat_byte(0x11))),
            chain: Mutex::new(chain),
            connect_result: Mutex::new(Ok(())),
            switch_result: Mutex::new(Ok(())),
            send_result: Mutex::new(Ok(TxHash::repeat_byte(0xab))),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn disconnected() -> Self {
        let wallet = Self::connected(1);
        *wallet.account.lock().unwrap() = None;
        wallet
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl WalletAdapter for MockWallet {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn connect(&self) -> Result<Address, WalletError> {
        self.connect_result.lock().unwrap().clone()?;
        let account = Address::repeat_byte(0x11);
        *self.account.lock().unwrap() = Some(account);
        Ok(account)
    }

    async fn disconnect(&self) {
        *self.account.lock().unwrap() = None;
    }

    async fn address(&self) -> Option<Address> {
        *self.account.lock().unwrap()
    }

    async fn chain_id(&self) -> Option<u64> {
        self.account.lock().unwrap().map(|_| *self.chain.lock().unwrap())
    }

    async fn switch_network(&self, chain_id: u64) -> Result<(), WalletError> {
        self.calls.lock().unwrap().push(Call::Switch(chain_id));
        let result = self.switch_result.lock().unwrap().clone();
        if result.is_ok() {
            *self.chain.lock().unwrap() = chain_id;
        }
        result
    }

    async fn send_native(&self, to: Address, value: U256) -> Result<TxHash, WalletError> {
        self.calls.lock().unwrap().push(Call::Native { to, value });
        self.send_result.lock().unwrap().clone()
    }

    async fn transfer_token(
        &self,
        token: Address,
        recipient: Address,
        amount: U256,
    ) -> Result<TxHash, WalletError> {
        self.calls.lock().unwrap().push(Call::Token { token, recipient, amount });
        self.send_result.lock().unwrap().clone()
    }
}
