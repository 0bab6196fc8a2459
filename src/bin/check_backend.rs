use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Rates {
    phase: String,
    #[serde(rename = "priceUsdPerTWE")]
    price: f64,
    progress: f64,
    eth_usd: Option<f64>,
    bnb_usd: Option<f64>,
    updated_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Deposit {
    tx_hash: String,
    chain: String,
    token_symbol: String,
    amount_usd: f64,
    twe_amount: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct User {
    total_twe: f64,
    total_usd: f64,
    deposits: Vec<Deposit>,
}

// usage: check_backend [address]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let base = std::env::var("BACKEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let base = base.trim_end_matches('/');
    let client = Client::new();

    println!("Checking presale backend at {}...", base);

    let resp = client.get(format!("{base}/rates")).send().await?;
    if !resp.status().is_success() {
        anyhow::bail!("/rates returned HTTP {}", resp.status());
    }
    let rates: Rates = resp.json().await?;
    println!(
        "Phase: {} | Price: ${} | Progress: {:.2}% | ETH ${:?} | BNB ${:?} | Updated {}",
        rates.phase,
        rates.price,
        rates.progress * 100.0,
        rates.eth_usd,
        rates.bnb_usd,
        rates.updated_at
    );

    let Some(address) = std::env::args().nth(1) else {
        return Ok(());
    };

    let resp = client.get(format!("{base}/user/{address}")).send().await?;
    if !resp.status().is_success() {
        anyhow::bail!("/user/{} returned HTTP {}", address, resp.status());
    }
    let user: User = resp.json().await?;

    let sum_usd: f64 = user.deposits.iter().map(|d| d.amount_usd).sum();
    let sum_twe: f64 = user.deposits.iter().map(|d| d.twe_amount).sum();
    println!(
        "User {}: {} TWE / ${} over {} deposits (sum of deposits: {} TWE / ${})",
        address,
        user.total_twe,
        user.total_usd,
        user.deposits.len(),
        sum_twe,
        sum_usd
    );

    for d in user.deposits.iter().take(5) {
        println!(
            "Tx: {} | {} ({}) | ${:.2} | {} TWE",
            d.tx_hash, d.token_symbol, d.chain, d.amount_usd, d.twe_amount
        );
    }

    if (sum_usd - user.total_usd).abs() > 1e-9 || (sum_twe - user.total_twe).abs() > 1e-9 {
        eprintln!("⚠️ Totals do not match the deposit list");
    }

    Ok(())
}
