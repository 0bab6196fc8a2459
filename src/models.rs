// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Current sale phase, price and native-coin rates as served by `GET /rates`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateSnapshot {
    pub phase: String,
    #[serde(rename = "priceUsdPerTWE")]
    pub price_usd_per_token: f64,
    pub total_supply: f64,
    pub sold_supply: f64,
    pub progress: f64, // 0..1
    pub updated_at: DateTime<Utc>,

    // ethUsd, bnbUsd, ... one per native coin
    #[serde(flatten)]
    pub native_rates: HashMap<String, serde_json::Value>,
}

impl RateSnapshot {
    /// USD rate of a network's native coin, 0 when the backend does not quote it.
    pub fn native_usd(&self, native_symbol: &str) -> f64 {
        let field = format!("{}Usd", native_symbol.to_lowercase());
        self.native_rates
            .get(&field)
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
    }
}

/// One recorded presale deposit
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deposit {
    pub tx_hash: String,
    pub chain: String,
    pub token_symbol: String,
    pub amount_token: f64,
    pub amount_usd: f64,
    #[serde(rename = "tweAmount")]
    pub token_amount: f64,
    pub phase_name: Option<String>,
    #[serde(rename = "priceUsdPerTWE")]
    pub price_usd_per_token: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Aggregated position for an address as served by `GET /user/{address}`
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPosition {
    pub address: String,
    #[serde(rename = "totalTwe")]
    pub total_tokens: f64,
    pub total_usd: f64,
    pub deposits: Vec<Deposit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Instrument {
    Native,
    Usdt,
}

/// What the buy form holds when the user presses pay
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentIntent {
    pub network: String,
    pub instrument: Instrument,
    pub usd_amount: f64,
}
