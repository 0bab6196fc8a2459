use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use futures_util::future::{join, OptionFuture};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::backend::BackendClient;
use crate::config::Config;
use crate::models::{Instrument, PaymentIntent, RateSnapshot};
use crate::payment::{ErrorKind, PaymentState, PaymentSubmitter};
use crate::session::{Session, SessionState};
use crate::views::{self, DashboardData, DashboardView, FormContext, FormInput, Fetched, Tab, WidgetView};
use crate::wallet::WalletAdapter;

/// Everything the handlers share; built once at startup.
pub struct AppState<W> {
    pub cfg: Arc<Config>,
    pub backend: BackendClient,
    pub session: Arc<Session<W>>,
    pub submitter: PaymentSubmitter<W>,
    // last successful /rates fetch
    pub rates: RwLock<Option<RateSnapshot>>,
}

impl<W: WalletAdapter> AppState<W> {
    pub fn new(cfg: Arc<Config>, backend: BackendClient, session: Arc<Session<W>>) -> Self {
        let submitter = PaymentSubmitter::new(
            Arc::clone(&session),
            cfg.networks.clone(),
            cfg.min_investment_usd,
            &cfg.stablecoin_symbol,
        );
        Self {
            cfg,
            backend,
            session,
            submitter,
            rates: RwLock::new(None),
        }
    }

    async fn refresh_rates(&self) -> Fetched<RateSnapshot> {
        match self.backend.rates().await {
            Ok(rates) => {
                *self.rates.write().await = Some(rates.clone());
                Fetched::Ready(rates)
            }
            Err(e) => {
                warn!("Rates fetch failed: {}", e);
                Fetched::Failed
            }
        }
    }

    // fresh rates when the backend answers, otherwise the last good snapshot
    async fn rates_for_payment(&self) -> Option<RateSnapshot> {
        match self.refresh_rates().await {
            Fetched::Ready(rates) => Some(rates),
            Fetched::Failed => self.rates.read().await.clone(),
        }
    }

    fn form_context<'a>(&'a self, rates: Option<&'a RateSnapshot>, connected: bool) -> FormContext<'a> {
        FormContext {
            cfg: &self.cfg,
            rates,
            status: self.submitter.status(),
            busy: self.submitter.is_busy(),
            connected,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub tab: Option<Tab>,
    pub chain: Option<String>,
    pub coin: Option<Instrument>,
    pub usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct PayRequest {
    pub chain: Option<String>,
    pub coin: Instrument,
    pub usd: f64,
}

#[derive(Debug, Serialize)]
pub struct PayResponse {
    pub ok: bool,
    pub message: String,
    pub tx_hash: Option<String>,
    pub kind: Option<ErrorKind>,
    pub state: PaymentState,
}

pub fn router<W: WalletAdapter + 'static>(state: Arc<AppState<W>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { "Presale dashboard running" }))
        .route("/session", get(session_state::<W>))
        .route("/connect", post(connect::<W>))
        .route("/disconnect", post(disconnect::<W>))
        .route("/dashboard", get(dashboard::<W>))
        .route("/widget", get(widget::<W>))
        .route("/pay", post(pay::<W>))
        .route("/widget/pay", post(widget_pay::<W>))
        .layer(cors)
        .with_state(state)
}

pub async fn serve<W: WalletAdapter + 'static>(state: Arc<AppState<W>>) -> eyre::Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], state.cfg.port));
    let app = router(state);

    info!("Dashboard listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

// ---------- handlers ----------

async fn session_state<W: WalletAdapter>(State(state): State<Arc<AppState<W>>>) -> Json<SessionState> {
    Json(state.session.state().await)
}

async fn connect<W: WalletAdapter>(
    State(state): State<Arc<AppState<W>>>,
) -> Result<Json<SessionState>, (StatusCode, String)> {
    match state.session.connect().await {
        Ok(address) => {
            info!("Wallet connected: {}", address);
            Ok(Json(state.session.state().await))
        }
        Err(e) => {
            warn!("Connect failed: {}", e);
            Err((StatusCode::BAD_GATEWAY, e.to_string()))
        }
    }
}

async fn disconnect<W: WalletAdapter>(State(state): State<Arc<AppState<W>>>) -> Json<SessionState> {
    state.session.wallet().disconnect().await;
    Json(state.session.state().await)
}

async fn dashboard<W: WalletAdapter>(
    State(state): State<Arc<AppState<W>>>,
    Query(q): Query<DashboardQuery>,
) -> Json<DashboardView> {
    let session = state.session.state().await;

    let user_fetch: OptionFuture<_> = session
        .address
        .map(|a| {
            let backend = state.backend.clone();
            async move { backend.user(&a.to_string()).await }
        })
        .into();

    let (rates, user) = join(state.refresh_rates(), user_fetch).await;
    let user = user.map(|res| match res {
        Ok(u) => Fetched::Ready(u),
        Err(e) => {
            warn!("User fetch failed: {}", e);
            Fetched::Failed
        }
    });

    let ctx = state.form_context(rates.ready(), session.connected);
    let data = DashboardData {
        session,
        rates: &rates,
        user: user.as_ref(),
    };

    let form = FormInput {
        chain: q.chain,
        coin: q.coin,
        usd: q.usd,
    };
    Json(views::dashboard(&ctx, &data, q.tab.unwrap_or(Tab::Dashboard), &form))
}

async fn widget<W: WalletAdapter>(
    State(state): State<Arc<AppState<W>>>,
    Query(form): Query<FormInput>,
) -> Json<WidgetView> {
    let connected = state.session.state().await.connected;
    let rates = state.refresh_rates().await;
    let ctx = state.form_context(rates.ready(), connected);
    Json(views::widget(&ctx, &form))
}

async fn pay<W: WalletAdapter>(
    State(state): State<Arc<AppState<W>>>,
    Json(req): Json<PayRequest>,
) -> (StatusCode, Json<PayResponse>) {
    submit(&state, req).await
}

async fn widget_pay<W: WalletAdapter>(
    State(state): State<Arc<AppState<W>>>,
    Json(mut req): Json<PayRequest>,
) -> (StatusCode, Json<PayResponse>) {
    // A disconnected widget only connects; the next press pays.
    match state.session.connect_if_needed().await {
        Ok(None) => {}
        Ok(Some(address)) => {
            info!("Widget connected wallet {}", address);
            return (
                StatusCode::OK,
                Json(PayResponse {
                    ok: false,
                    message: "Wallet connected.".to_string(),
                    tx_hash: None,
                    kind: None,
                    state: state.submitter.state(),
                }),
            );
        }
        Err(e) => {
            warn!("Widget connect failed: {}", e);
            state.submitter.fail(&e.to_string());
            return (
                StatusCode::BAD_GATEWAY,
                Json(PayResponse {
                    ok: false,
                    message: state.submitter.status().error.unwrap_or_default(),
                    tx_hash: None,
                    kind: Some(ErrorKind::Wallet),
                    state: state.submitter.state(),
                }),
            );
        }
    }
    req.usd = views::clamp_usd_input(Some(req.usd), state.cfg.min_investment_usd);
    submit(&state, req).await
}

async fn submit<W: WalletAdapter>(state: &AppState<W>, req: PayRequest) -> (StatusCode, Json<PayResponse>) {
    let intent = PaymentIntent {
        network: req.chain.unwrap_or_else(|| state.cfg.default_network.clone()),
        instrument: req.coin,
        usd_amount: req.usd,
    };
    let rates = state.rates_for_payment().await;

    match state.submitter.submit(&intent, rates.as_ref()).await {
        Ok(receipt) => (
            StatusCode::OK,
            Json(PayResponse {
                ok: true,
                message: receipt.message,
                tx_hash: Some(receipt.tx_hash.to_string()),
                kind: None,
                state: state.submitter.state(),
            }),
        ),
        Err(e) => {
            let status = match e.kind() {
                ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::Wallet => StatusCode::BAD_GATEWAY,
                ErrorKind::Busy => StatusCode::CONFLICT,
            };
            (
                status,
                Json(PayResponse {
                    ok: false,
                    message: e.to_string(),
                    tx_hash: None,
                    kind: Some(e.kind()),
                    state: state.submitter.state(),
                }),
            )
        }
    }
}
