// src/views.rs
use crate::calculator;
use crate::config::Config;
use crate::models::{Deposit, Instrument, RateSnapshot, UserPosition};
use crate::payment::PaymentStatus;
use crate::session::SessionState;
use serde::{Deserialize, Serialize};

pub const NO_PURCHASES: &str = "No purchases yet for this wallet.";
pub const RATES_ERROR: &str = "Couldn't load presale data. Please try again in a moment.";
pub const BUY_RATES_ERROR: &str = "Couldn't load rates. You can still test the Pay flow, but price may be 0.";
pub const USER_ERROR: &str = "Couldn't load your transactions. Please try again later.";

/// Result of a backend fetch as the views see it
pub enum Fetched<T> {
    Ready(T),
    Failed,
}

impl<T> Fetched<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Fetched::Ready(v) => Some(v),
            Fetched::Failed => None,
        }
    }
}

// ---------- formatting ----------

fn group_thousands(int_part: &str) -> String {
    let digits: Vec<char> = int_part.chars().collect();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(*c);
    }
    out
}

fn fixed_grouped(value: f64, decimals: usize) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let raw = format!("{:.*}", decimals, value.abs());
    let (int_part, frac) = match raw.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (raw.as_str(), None),
    };

    let sign = if value < 0.0 && raw.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };

    match frac {
        Some(f) => format!("{sign}{}.{f}", group_thousands(int_part)),
        None => format!("{sign}{}", group_thousands(int_part)),
    }
}

/// `$1,234.50`
pub fn format_usd(value: f64) -> String {
    format!("${}", fixed_grouped(value, 2))
}

/// Token amounts, two decimals with grouping
pub fn format_tokens(value: f64) -> String {
    fixed_grouped(value, 2)
}

pub fn format_native(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    format!("{value:.6}")
}

/// `0x76aF…8343` style: first 6 + `...` + last 4
pub fn shorten_address(addr: &str) -> String {
    let chars: Vec<char> = addr.chars().collect();
    if chars.len() <= 10 {
        return addr.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

pub fn short_hash(hash: &str) -> String {
    let head: String = hash.chars().take(10).collect();
    format!("{head}...")
}

pub fn progress_percent(progress: f64) -> f64 {
    if !progress.is_finite() {
        return 0.0;
    }
    (progress * 100.0).clamp(0.0, 100.0)
}

// ---------- views ----------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    Dashboard,
    Buy,
    Transactions,
    Leaderboard,
    Claim,
}

#[derive(Debug, Serialize)]
pub struct TabLink {
    pub id: Tab,
    pub label: String,
    pub active: bool,
    pub disabled: bool,
}

pub fn tabs(active: Tab, token_symbol: &str) -> Vec<TabLink> {
    [
        (Tab::Dashboard, "Dashboard".to_string()),
        (Tab::Buy, format!("Buy {token_symbol}")),
        (Tab::Transactions, "Transactions".to_string()),
        (Tab::Leaderboard, "Leaderboard".to_string()),
        (Tab::Claim, "Claim (soon)".to_string()),
    ]
    .into_iter()
    .map(|(id, label)| TabLink {
        id,
        label,
        active: id == active,
        disabled: id == Tab::Claim,
    })
    .collect()
}

#[derive(Debug, Serialize)]
pub struct DepositRow {
    pub date: String,
    pub paid_with: String,
    pub usd: String,
    pub tokens: String,
    pub tx: String,
}

pub fn deposit_row(d: &Deposit, token_symbol: &str) -> DepositRow {
    DepositRow {
        date: d.created_at.format("%Y-%m-%d %H:%M").to_string(),
        paid_with: format!("{} ({})", d.token_symbol, d.chain),
        usd: format!("${:.2}", d.amount_usd),
        tokens: format!("{} {}", format_tokens(d.token_amount), token_symbol),
        tx: short_hash(&d.tx_hash),
    }
}

#[derive(Debug, Serialize)]
pub struct DepositTable {
    pub rows: Vec<DepositRow>,
    pub empty_message: Option<&'static str>,
}

pub fn deposit_table(deposits: &[Deposit], limit: Option<usize>, token_symbol: &str) -> DepositTable {
    let rows: Vec<DepositRow> = deposits
        .iter()
        .take(limit.unwrap_or(deposits.len()))
        .map(|d| deposit_row(d, token_symbol))
        .collect();
    let empty_message = rows.is_empty().then_some(NO_PURCHASES);
    DepositTable { rows, empty_message }
}

#[derive(Debug, Serialize)]
pub struct SaleProgress {
    pub phase: String,
    pub price: String,
    pub percent: f64,
    pub label: String,
}

pub fn sale_progress(rates: &RateSnapshot, token_symbol: &str) -> SaleProgress {
    let percent = progress_percent(rates.progress);
    SaleProgress {
        phase: rates.phase.clone(),
        price: format!("Price: ${} / {}", rates.price_usd_per_token, token_symbol),
        percent,
        label: format!("{percent:.2}%"),
    }
}

#[derive(Debug, Serialize)]
pub struct BalanceSummary {
    pub token_balance: String,
    pub total_invested: String,
    pub progress: SaleProgress,
}

pub fn balance_summary(user: Option<&UserPosition>, rates: &RateSnapshot, token_symbol: &str) -> BalanceSummary {
    let (tokens, usd) = user.map(|u| (u.total_tokens, u.total_usd)).unwrap_or((0.0, 0.0));
    BalanceSummary {
        token_balance: format!("{} {}", format_tokens(tokens), token_symbol),
        total_invested: format_usd(usd),
        progress: sale_progress(rates, token_symbol),
    }
}

/// Buy-form selections coming from the query string or a pay request
#[derive(Debug, Clone, Deserialize)]
pub struct FormInput {
    pub chain: Option<String>,
    pub coin: Option<Instrument>,
    pub usd: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct Choice {
    pub id: String,
    pub label: String,
    pub active: bool,
}

#[derive(Debug, Serialize)]
pub struct PayButton {
    pub label: String,
    pub disabled: bool,
}

#[derive(Debug, Serialize)]
pub struct PaymentForm {
    pub chains: Vec<Choice>,
    pub coins: Vec<Choice>,
    pub usd_amount: f64,
    pub minimum_note: String,
    pub pay_label: String,
    pub you_pay: String,
    pub receive_label: String,
    pub you_receive: String,
    pub rate_hint: String,
    pub button: PayButton,
    pub notice: Option<&'static str>,
    pub error: Option<String>,
    pub success: Option<String>,
}

pub struct FormContext<'a> {
    pub cfg: &'a Config,
    pub rates: Option<&'a RateSnapshot>,
    pub status: PaymentStatus,
    pub busy: bool,
    pub connected: bool,
}

/// Widget input never drops below the minimum; garbage becomes the minimum.
pub fn clamp_usd_input(value: Option<f64>, min: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v.max(min),
        _ => min,
    }
}

pub fn payment_form(ctx: &FormContext<'_>, input: &FormInput, default_coin: Instrument, default_usd: f64) -> PaymentForm {
    let cfg = ctx.cfg;
    let network = input
        .chain
        .as_deref()
        .and_then(|k| cfg.network(k))
        .or_else(|| cfg.network(&cfg.default_network))
        .unwrap_or(&cfg.networks[0]);
    let coin = input.coin.unwrap_or(default_coin);
    let usd = input.usd.filter(|v| v.is_finite()).unwrap_or(default_usd);

    let price = ctx.rates.map(|r| r.price_usd_per_token).unwrap_or(0.0);
    let native_usd = ctx.rates.map(|r| r.native_usd(&network.native_symbol)).unwrap_or(0.0);
    let quote = calculator::quote(usd, price, native_usd);

    let chains = cfg
        .networks
        .iter()
        .map(|n| Choice {
            id: n.key.clone(),
            label: n.label.clone(),
            active: n.key == network.key,
        })
        .collect();

    let coins = [Instrument::Usdt, Instrument::Native]
        .into_iter()
        .map(|c| Choice {
            id: match c {
                Instrument::Usdt => "USDT".to_string(),
                Instrument::Native => "NATIVE".to_string(),
            },
            label: match c {
                Instrument::Usdt => cfg.stablecoin_symbol.clone(),
                Instrument::Native => network.native_symbol.clone(),
            },
            active: c == coin,
        })
        .collect();

    let (pay_symbol, you_pay, rate_hint) = match coin {
        Instrument::Usdt => (
            cfg.stablecoin_symbol.clone(),
            format!("{:.2}", quote.stablecoin),
            format!("1 {} ≈ 1 USD", cfg.stablecoin_symbol),
        ),
        Instrument::Native => (
            network.native_symbol.clone(),
            format_native(quote.native),
            format!("{} price: ${:.2}", network.native_symbol, native_usd),
        ),
    };

    let below_min = usd.is_nan() || usd < cfg.min_investment_usd;
    let button = PayButton {
        label: if ctx.busy {
            "Waiting for wallet...".to_string()
        } else if ctx.connected {
            "Pay".to_string()
        } else {
            "Connect Wallet & Pay".to_string()
        },
        disabled: ctx.busy || below_min,
    };

    PaymentForm {
        chains,
        coins,
        usd_amount: usd,
        minimum_note: format!(
            "Minimum investment: ${}. Gas is paid separately in your wallet.",
            cfg.min_investment_usd
        ),
        pay_label: format!("{pay_symbol} you pay"),
        you_pay,
        receive_label: format!("{} you receive", cfg.token_symbol),
        you_receive: format!("{} {}", format_tokens(quote.tokens), cfg.token_symbol),
        rate_hint,
        button,
        notice: ctx.rates.is_none().then_some(BUY_RATES_ERROR),
        error: ctx.status.error.clone(),
        success: ctx.status.success.clone(),
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "tab", rename_all = "lowercase")]
pub enum TabContent {
    Dashboard {
        wallet: String,
        summary: Option<BalanceSummary>,
        rates_error: Option<&'static str>,
        recent: Option<DepositTable>,
        user_error: Option<&'static str>,
    },
    Buy {
        form: PaymentForm,
    },
    Transactions {
        table: Option<DepositTable>,
        user_error: Option<&'static str>,
    },
    Leaderboard {
        title: &'static str,
        text: &'static str,
    },
}

#[derive(Debug, Serialize)]
pub struct Landing {
    pub title: String,
    pub text: &'static str,
}

#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub title: String,
    pub wallet: SessionState,
    pub wallet_short: Option<String>,
    pub landing: Option<Landing>,
    pub tabs: Vec<TabLink>,
    pub content: Option<TabContent>,
}

pub struct DashboardData<'a> {
    pub session: SessionState,
    pub rates: &'a Fetched<RateSnapshot>,
    pub user: Option<&'a Fetched<UserPosition>>,
}

pub fn dashboard(
    ctx: &FormContext<'_>,
    data: &DashboardData<'_>,
    tab: Tab,
    input: &FormInput,
) -> DashboardView {
    let cfg = ctx.cfg;
    let title = format!("{} Presale Dashboard", cfg.token_symbol);
    let wallet_short = data.session.address.map(|a| shorten_address(&a.to_string()));

    if !data.session.connected {
        return DashboardView {
            title,
            wallet: data.session.clone(),
            wallet_short,
            landing: Some(Landing {
                title: "Connect your wallet".to_string(),
                text: "Connect a wallet to see your balance, your deposit history and the current presale status.",
            }),
            tabs: Vec::new(),
            content: None,
        };
    }

    // Claim is never selectable; it falls back to the dashboard
    let tab = if tab == Tab::Claim { Tab::Dashboard } else { tab };

    let user = data.user.and_then(Fetched::ready);
    let user_error = match data.user {
        Some(Fetched::Failed) => Some(USER_ERROR),
        _ => None,
    };
    let deposits: &[Deposit] = user.map(|u| u.deposits.as_slice()).unwrap_or(&[]);

    let content = match tab {
        Tab::Dashboard | Tab::Claim => TabContent::Dashboard {
            wallet: wallet_short.clone().unwrap_or_default(),
            summary: data
                .rates
                .ready()
                .map(|r| balance_summary(user, r, &cfg.token_symbol)),
            rates_error: data.rates.ready().is_none().then_some(RATES_ERROR),
            recent: user_error
                .is_none()
                .then(|| deposit_table(deposits, Some(5), &cfg.token_symbol)),
            user_error,
        },
        Tab::Buy => TabContent::Buy {
            form: payment_form(ctx, input, Instrument::Usdt, 100.0),
        },
        Tab::Transactions => TabContent::Transactions {
            table: user_error
                .is_none()
                .then(|| deposit_table(deposits, None, &cfg.token_symbol)),
            user_error,
        },
        Tab::Leaderboard => TabContent::Leaderboard {
            title: "Leaderboard (soon)",
            text: "Top holders, transaction counts and levels will be listed here.",
        },
    };

    DashboardView {
        title,
        wallet: data.session.clone(),
        wallet_short,
        landing: None,
        tabs: tabs(tab, &cfg.token_symbol),
        content: Some(content),
    }
}

#[derive(Debug, Serialize)]
pub struct WidgetView {
    pub title: &'static str,
    pub subtitle: &'static str,
    pub progress: Option<SaleProgress>,
    pub price_line: String,
    pub form: PaymentForm,
}

pub fn widget(ctx: &FormContext<'_>, input: &FormInput) -> WidgetView {
    let cfg = ctx.cfg;
    let input = FormInput {
        usd: Some(clamp_usd_input(input.usd.or(Some(100.0)), cfg.min_investment_usd)),
        ..input.clone()
    };
    let price = ctx.rates.map(|r| r.price_usd_per_token).unwrap_or(0.0);

    WidgetView {
        title: "Buy Now",
        subtitle: "Before Price Rises",
        progress: ctx.rates.map(|r| sale_progress(r, &cfg.token_symbol)),
        price_line: format!("1 {} = ${}", cfg.token_symbol, price),
        form: payment_form(ctx, &input, Instrument::Native, 100.0),
    }
}
