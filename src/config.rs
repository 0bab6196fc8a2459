use dotenvy::dotenv;
use eyre::{eyre, Result};
use std::env;
use tracing::info;

/// Prefix used by the deploy templates for receiving addresses nobody filled in.
pub const PLACEHOLDER_PREFIX: &str = "0xYOUR";

/// One supported network, keyed by a short name such as `ETH` or `BSC`.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub key: String,
    pub chain_id: u64,
    pub label: String,
    pub native_symbol: String,
    pub presale_wallet: Option<String>,
    pub usdt_address: Option<String>,
    pub usdt_decimals: u32,
    pub rpc_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletMode {
    Signer,
    Node,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub port: u16,
    pub min_investment_usd: f64,
    pub token_symbol: String,
    pub stablecoin_symbol: String,
    pub networks: Vec<NetworkConfig>,
    pub default_network: String,
    pub wallet_mode: WalletMode,
    pub private_key: Option<String>,
    pub node_rpc_url: String,
}

impl Config {
    pub fn network(&self, key: &str) -> Option<&NetworkConfig> {
        self.networks.iter().find(|n| n.key.eq_ignore_ascii_case(key))
    }
}

// Known defaults for the two networks the sale started on.
fn builtin_network(key: &str) -> Option<NetworkConfig> {
    match key {
        "ETH" => Some(NetworkConfig {
            key: "ETH".into(),
            chain_id: 1,
            label: "ETH".into(),
            native_symbol: "ETH".into(),
            presale_wallet: Some("0x76aF211e9649f1469944f143FF27B24712af8343".into()),
            usdt_address: Some("0xdAC17F958D2ee523a2206206994597C13D831ec7".into()),
            usdt_decimals: 6,
            rpc_url: None,
        }),
        "BSC" => Some(NetworkConfig {
            key: "BSC".into(),
            chain_id: 56,
            label: "BNB".into(),
            native_symbol: "BNB".into(),
            presale_wallet: Some("0xfddcFB6f1F104793df8729D7Aa6c2B7183Ee3b55".into()),
            usdt_address: Some("0x55d398326f99059fF775485246999027B3197955".into()),
            usdt_decimals: 6,
            rpc_url: None,
        }),
        _ => None,
    }
}

fn var(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn load_network(key: &str) -> Result<NetworkConfig> {
    let base = builtin_network(key);

    let chain_id = match var(&format!("{key}_CHAIN_ID")) {
        Some(raw) => raw
            .parse()
            .map_err(|_| eyre!("{key}_CHAIN_ID is not a number: {raw}"))?,
        None => base
            .as_ref()
            .map(|b| b.chain_id)
            .ok_or_else(|| eyre!("{key}_CHAIN_ID is required for network {key}"))?,
    };

    let label = var(&format!("{key}_LABEL"))
        .or_else(|| base.as_ref().map(|b| b.label.clone()))
        .unwrap_or_else(|| key.to_string());

    let native_symbol = var(&format!("{key}_NATIVE_SYMBOL"))
        .or_else(|| base.as_ref().map(|b| b.native_symbol.clone()))
        .unwrap_or_else(|| label.clone());

    let presale_wallet = var(&format!("{key}_PRESALE_WALLET"))
        .or_else(|| base.as_ref().and_then(|b| b.presale_wallet.clone()));

    let usdt_address = var(&format!("{key}_USDT_ADDRESS"))
        .or_else(|| base.as_ref().and_then(|b| b.usdt_address.clone()));

    // USDT is assumed to carry 6 decimals unless told otherwise
    let usdt_decimals = match var(&format!("{key}_USDT_DECIMALS")) {
        Some(raw) => raw
            .parse()
            .map_err(|_| eyre!("{key}_USDT_DECIMALS is not a number: {raw}"))?,
        None => base.as_ref().map(|b| b.usdt_decimals).unwrap_or(6),
    };

    let rpc_url = var(&format!("{key}_RPC_URL"));

    Ok(NetworkConfig {
        key: key.to_string(),
        chain_id,
        label,
        native_symbol,
        presale_wallet,
        usdt_address,
        usdt_decimals,
        rpc_url,
    })
}

fn parse_min_investment(raw: &str) -> Result<f64> {
    let value: f64 = raw
        .parse()
        .map_err(|_| eyre!("MIN_INVESTMENT_USD is not a number: {raw}"))?;
    if !value.is_finite() || value < 0.0 {
        return Err(eyre!("MIN_INVESTMENT_USD must be a non-negative amount: {raw}"));
    }
    Ok(value)
}

pub fn load() -> Result<Config> {
    dotenv().ok();

    let backend_url = env::var("BACKEND_URL")
        .or_else(|_| env::var("API_BASE"))
        .unwrap_or_else(|_| "http://localhost:3000".to_string())
        .trim_end_matches('/')
        .to_string();

    let port = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .unwrap_or(8080);

    let min_investment_usd = match var("MIN_INVESTMENT_USD") {
        Some(raw) => parse_min_investment(&raw)?,
        None => 50.0,
    };

    let token_symbol = var("TOKEN_SYMBOL").unwrap_or_else(|| "TWE".to_string());
    let stablecoin_symbol = var("STABLECOIN_SYMBOL").unwrap_or_else(|| "USDT".to_string());

    let networks = env::var("NETWORKS")
        .unwrap_or_else(|_| "ETH,BSC".to_string())
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .map(|key| load_network(&key))
        .collect::<Result<Vec<_>>>()?;

    if networks.is_empty() {
        return Err(eyre!("NETWORKS must name at least one network"));
    }

    let default_network = var("DEFAULT_NETWORK")
        .map(|s| s.to_uppercase())
        .filter(|k| networks.iter().any(|n| &n.key == k))
        .unwrap_or_else(|| {
            if networks.iter().any(|n| n.key == "BSC") {
                "BSC".to_string()
            } else {
                networks[0].key.clone()
            }
        });

    let wallet_mode = match var("WALLET_MODE").as_deref() {
        Some("node") => WalletMode::Node,
        Some("signer") | None => WalletMode::Signer,
        Some(other) => return Err(eyre!("unknown WALLET_MODE: {other}")),
    };

    let private_key = var("PRIVATE_KEY");
    let node_rpc_url =
        var("NODE_RPC_URL").unwrap_or_else(|| "http://127.0.0.1:8545".to_string());

    let cfg = Config {
        backend_url,
        port,
        min_investment_usd,
        token_symbol,
        stablecoin_symbol,
        networks,
        default_network,
        wallet_mode,
        private_key,
        node_rpc_url,
    };

    info!(
        "Loaded config: backend={} port={} min=${} networks={:?} wallet={:?}",
        cfg.backend_url,
        cfg.port,
        cfg.min_investment_usd,
        cfg.networks.iter().map(|n| &n.key).collect::<Vec<_>>(),
        cfg.wallet_mode
    );

    Ok(cfg)
}

#[cfg(test)]
pub fn test_config() -> Config {
    Config {
        backend_url: "http://localhost:3000".into(),
        port: 0,
        min_investment_usd: 50.0,
        token_symbol: "TWE".into(),
        stablecoin_symbol: "USDT".into(),
        networks: vec![
            builtin_network("ETH").expect("eth"),
            builtin_network("BSC").expect("bsc"),
        ],
        default_network: "BSC".into(),
        wallet_mode: WalletMode::Signer,
        private_key: None,
        node_rpc_url: "http://127.0.0.1:8545".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn networks_resolve_by_key() {
        let cfg = test_config();
        assert_eq!(cfg.network("bsc").map(|n| n.chain_id), Some(56));
        assert_eq!(cfg.network("ETH").map(|n| n.label.as_str()), Some("ETH"));
        assert!(cfg.network("SOL").is_none());
    }

    #[test]
    fn builtin_networks_default_to_six_decimal_usdt() {
        let eth = builtin_network("ETH").unwrap();
        let bsc = builtin_network("BSC").unwrap();
        assert_eq!(eth.usdt_decimals, 6);
        assert_eq!(bsc.usdt_decimals, 6);
        assert_eq!(bsc.native_symbol, "BNB");
    }

    #[test]
    fn minimum_investment_must_be_a_real_amount() {
        assert_eq!(parse_min_investment("50").unwrap(), 50.0);
        assert_eq!(parse_min_investment("0").unwrap(), 0.0);
        assert!(parse_min_investment("NaN").is_err());
        assert!(parse_min_investment("inf").is_err());
        assert!(parse_min_investment("-5").is_err());
        assert!(parse_min_investment("fifty").is_err());
    }

    #[test]
    fn invalid_usdt_decimals_is_an_error() {
        env::set_var("ZZTEST_CHAIN_ID", "31337");
        env::set_var("ZZTEST_USDT_DECIMALS", "six");
        assert!(load_network("ZZTEST").is_err());

        env::set_var("ZZTEST_USDT_DECIMALS", "18");
        assert_eq!(load_network("ZZTEST").unwrap().usdt_decimals, 18);

        env::remove_var("ZZTEST_USDT_DECIMALS");
        assert_eq!(load_network("ZZTEST").unwrap().usdt_decimals, 6);
        env::remove_var("ZZTEST_CHAIN_ID");
    }
}
