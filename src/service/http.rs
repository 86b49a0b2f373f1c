//! HTTP front-end
//!
//! Exposes an [`AuctionHouse`] over JSON. Capability tokens stay in a
//! [`CapabilityVault`] and payments are minted from the host [`Treasury`],
//! which stands in for the bidders' wallets.
mod vault;

pub use self::vault::*;

use super::LoopService;
use crate::auction::{AuctionError, Refused};
use crate::auction_house::{AuctionHouse, AuctionSnapshot};
use crate::auth::Principal;
use crate::coin::{Amount, Treasury};
use crate::event_log::{LogEvent, Offset, SharedReader, WithOffset};
use crate::id::AuctionId;
use anyhow::{format_err, Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::{runtime::Runtime, sync::oneshot};
use tracing::{info, warn};

const MAX_EVENTS_PER_PAGE: usize = 1000;

#[derive(Clone)]
pub struct AppState {
    pub house: Arc<AuctionHouse<String>>,
    pub vault: Arc<CapabilityVault>,
    pub treasury: Arc<Treasury>,
    pub events: SharedReader,
}

impl AppState {
    pub fn new(house: Arc<AuctionHouse<String>>, events: SharedReader) -> Self {
        Self {
            house,
            vault: Arc::new(CapabilityVault::new()),
            treasury: Arc::new(Treasury::new()),
            events,
        }
    }
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn unknown_capability() -> Self {
        Self::new(StatusCode::FORBIDDEN, "unknown capability")
    }
}

impl From<AuctionError> for ApiError {
    fn from(e: AuctionError) -> Self {
        let status = match e {
            AuctionError::NotFound(_) => StatusCode::NOT_FOUND,
            AuctionError::AuthorizationMismatch(_) => StatusCode::FORBIDDEN,
            AuctionError::AuctionClosed(_) | AuctionError::AuctionNotEnded(_) => {
                StatusCode::CONFLICT
            }
            AuctionError::PriceNotDecreasing { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AuctionError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
        };
        Self::new(status, e.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        warn!(error = %e, "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

fn parse_id(raw: &str) -> Result<AuctionId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, format!("bad auction id: {raw}")))
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateRequest {
    pub auctioneer: Principal,
    pub item: String,
    pub initial_price: Amount,
    #[serde(default)]
    pub min_bid: Option<Amount>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateResponse {
    pub auction_id: AuctionId,
    pub capability: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PriceRequest {
    pub caller: Principal,
    pub capability: String,
    pub new_price: Amount,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct BidRequest {
    pub bidder: Principal,
    pub amount: Amount,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct BidResponse {
    pub item: String,
    pub change: Amount,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CloseRequest {
    pub caller: Principal,
    pub capability: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ClaimResponse {
    pub proceeds: Amount,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StopResponse {
    pub item: String,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    offset: Option<Offset>,
    limit: Option<usize>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auctions", post(create_auction))
        .route("/auctions/:id", get(get_auction))
        .route("/auctions/:id/price", post(set_price))
        .route("/auctions/:id/bid", post(bid))
        .route("/auctions/:id/claim", post(claim))
        .route("/auctions/:id/stop", post(stop))
        .route("/events", get(list_events))
        .with_state(state)
}

async fn create_auction(
    State(state): State<AppState>,
    Json(req): Json<CreateRequest>,
) -> (StatusCode, Json<CreateResponse>) {
    let (auction_id, cap) =
        state
            .house
            .create(req.auctioneer, req.item, req.initial_price, req.min_bid);
    let capability = state.vault.deposit(cap);

    (
        StatusCode::CREATED,
        Json(CreateResponse {
            auction_id,
            capability,
        }),
    )
}

async fn get_auction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AuctionSnapshot>, ApiError> {
    Ok(Json(state.house.snapshot(parse_id(&id)?)?))
}

async fn set_price(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<PriceRequest>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    state
        .vault
        .with(&req.capability, |cap| {
            state.house.set_price(id, &req.caller, cap, req.new_price)
        })
        .ok_or_else(ApiError::unknown_capability)??;
    Ok(StatusCode::NO_CONTENT)
}

async fn bid(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<BidRequest>,
) -> Result<Json<BidResponse>, ApiError> {
    let id = parse_id(&id)?;
    let payment = state
        .treasury
        .mint(req.amount)
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e.to_string()))?;

    match state.house.bid(id, &req.bidder, payment) {
        Ok(settlement) => {
            let change = settlement.change.value();
            // change goes straight back to the bidder's wallet
            state.treasury.burn(settlement.change);
            Ok(Json(BidResponse {
                item: settlement.item,
                change,
            }))
        }
        Err(Refused { error, returned }) => {
            state.treasury.burn(returned);
            Err(error.into())
        }
    }
}

async fn claim(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CloseRequest>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let id = parse_id(&id)?;
    let cap = state
        .vault
        .withdraw(&req.capability)
        .ok_or_else(ApiError::unknown_capability)?;

    match state.house.claim(id, &req.caller, cap) {
        Ok(proceeds) => {
            let value = proceeds.value();
            // paid out to the auctioneer's wallet
            state.treasury.burn(proceeds);
            Ok(Json(ClaimResponse { proceeds: value }))
        }
        Err(Refused { error, returned }) => {
            state.vault.restore(req.capability, returned);
            Err(error.into())
        }
    }
}

async fn stop(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CloseRequest>,
) -> Result<Json<StopResponse>, ApiError> {
    let id = parse_id(&id)?;
    let cap = state
        .vault
        .withdraw(&req.capability)
        .ok_or_else(ApiError::unknown_capability)?;

    match state.house.stop(id, &req.caller, cap) {
        Ok(item) => Ok(Json(StopResponse { item })),
        Err(Refused { error, returned }) => {
            state.vault.restore(req.capability, returned);
            Err(error.into())
        }
    }
}

async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<WithOffset<Vec<LogEvent>>>, ApiError> {
    let offset = match query.offset {
        Some(offset) => offset,
        None => state.events.get_start_offset()?,
    };
    let limit = query.limit.unwrap_or(100).min(MAX_EVENTS_PER_PAGE);

    Ok(Json(state.events.read(offset, limit, Some(Duration::ZERO))?))
}

/// The HTTP server, running on its own runtime
pub struct HttpService {
    // cancels all tasks on drop
    _runtime: Runtime,
    server_rx: oneshot::Receiver<Result<()>>,
}

impl HttpService {
    pub fn new(listen_addr: SocketAddr, state: AppState) -> Result<Self> {
        let runtime = Runtime::new()?;

        let (tx, rx) = oneshot::channel();

        runtime.spawn(async move {
            let res = run_http_server(listen_addr, state)
                .await
                .with_context(|| format!("Failed to run http server on {listen_addr}"));
            if tx.send(res).is_err() {
                warn!("http service gone before the server ended");
            }
        });

        Ok(Self {
            _runtime: runtime,
            server_rx: rx,
        })
    }
}

async fn run_http_server(listen_addr: SocketAddr, state: AppState) -> Result<()> {
    let server = axum::Server::try_bind(&listen_addr)?;
    info!(%listen_addr, "http server listening");
    server.serve(router(state).into_make_service()).await?;
    Ok(())
}

impl LoopService for HttpService {
    fn run_iteration(&mut self) -> Result<()> {
        // don't hog the cpu
        std::thread::sleep(Duration::from_millis(100));

        match self.server_rx.try_recv() {
            Ok(res) => res,
            Err(oneshot::error::TryRecvError::Empty) => Ok(()),
            Err(oneshot::error::TryRecvError::Closed) => {
                Err(format_err!("http server died without leaving a response?!"))
            }
        }
    }
}
