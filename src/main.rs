mod api;
mod backend;
mod calculator;
mod config;
mod models;
mod payment;
mod session;
mod views;
mod wallet;

use std::collections::HashMap;
use std::sync::Arc;
use eyre::{eyre, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, WalletMode};
use crate::session::Session;
use crate::wallet::{NodeWallet, SignerWallet, Wallet};

fn build_wallet(cfg: &Config) -> Result<Wallet> {
    match cfg.wallet_mode {
        WalletMode::Signer => {
            let key = cfg
                .private_key
                .as_deref()
                .ok_or_else(|| eyre!("PRIVATE_KEY is required when WALLET_MODE=signer"))?;

            let rpc_urls: HashMap<u64, String> = cfg
                .networks
                .iter()
                .filter_map(|n| n.rpc_url.clone().map(|url| (n.chain_id, url)))
                .collect();
            if rpc_urls.is_empty() {
                warn!("No <NETWORK>_RPC_URL configured; the signer wallet cannot connect");
            }

            let default_chain = cfg
                .network(&cfg.default_network)
                .map(|n| n.chain_id)
                .ok_or_else(|| eyre!("default network {} is not configured", cfg.default_network))?;

            Ok(Wallet::Signer(SignerWallet::new(key, rpc_urls, default_chain)?))
        }
        WalletMode::Node => Ok(Wallet::Node(NodeWallet::new(&cfg.node_rpc_url))),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stdout)
        .with_target(false)
        .init();

    info!("Presale dashboard starting...");

    let cfg = Arc::new(config::load()?);
    info!("  Backend: {}", cfg.backend_url);
    info!("  Port: {}", cfg.port);
    info!("  Minimum investment: ${}", cfg.min_investment_usd);
    for n in &cfg.networks {
        info!(
            "  Network {} (chain {}): wallet={:?} usdt={:?} rpc={}",
            n.key,
            n.chain_id,
            n.presale_wallet,
            n.usdt_address,
            n.rpc_url.is_some()
        );
    }

    let session = Arc::new(Session::new(build_wallet(&cfg)?));

    match session.connect().await {
        Ok(address) => info!("Wallet ready: {}", address),
        Err(e) => warn!("Wallet not connected at startup: {} (POST /connect to retry)", e),
    }

    let backend = backend::BackendClient::new(&cfg.backend_url)?;
    let state = Arc::new(api::AppState::new(Arc::clone(&cfg), backend, Arc::clone(&session)));

    let api_handle = tokio::spawn({
        let state = Arc::clone(&state);
        async move { api::serve(state).await }
    });

    tokio::select! {
        res = api_handle => match res {
            Ok(Ok(_)) => info!("API exited cleanly"),
            Ok(Err(e)) => error!("API error: {:?}", e),
            Err(e) => error!("API task panicked: {:?}", e),
        },
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received, stopping...");
        }
    }

    session.shutdown().await;
    info!("Presale dashboard stopped.");
    Ok(())
}
