// =============================================================================
// HTTP API層 (axum)
// =============================================================================
//
// ハンドラーはエンジンにメッセージを送るだけで、状態は直接触らない。
// パスとJSONの形はフロントエンド（localhost:4000/api/...）に合わせている。

use std::path::Path;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path as UrlPath, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};
use uuid::Uuid;

use crate::engine::EngineHandle;
use crate::error::TradeError;
use crate::ledger::{parse_player_id, parse_quantity};
use crate::models::{CoinDetail, CoinView, PortfolioView, Side, TradeReceipt};

/// プレイヤーIDを運ぶヘッダー
pub const PLAYER_ID_HEADER: &str = "x-player-id";

/// APIハンドラーが持つ共有状態
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: EngineHandle,
}

// =============================================================================
// エラーレスポンス
// =============================================================================

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorInfo,
}

#[derive(Debug, Serialize)]
struct ErrorInfo {
    code: &'static str,
    message: String,
}

/// APIエラー
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing x-player-id header")]
    MissingPlayerId,

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Trade(#[from] TradeError),
}

// 壊れたJSONや必須フィールドの欠落も同じエラー形式で返す
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::MissingPlayerId => (StatusCode::BAD_REQUEST, "missing_player_id"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            ApiError::Trade(e) => match e {
                TradeError::PlayerNotFound(_) => (StatusCode::NOT_FOUND, "player_not_found"),
                TradeError::CoinNotFound(_) => (StatusCode::NOT_FOUND, "coin_not_found"),
                TradeError::InvalidQuantity(_) => (StatusCode::BAD_REQUEST, "invalid_quantity"),
                TradeError::InsufficientFunds { .. } => (StatusCode::BAD_REQUEST, "insufficient_funds"),
                TradeError::InsufficientHoldings { .. } => (StatusCode::BAD_REQUEST, "insufficient_holdings"),
                TradeError::DuplicateId(_) => (StatusCode::CONFLICT, "duplicate_id"),
                TradeError::InvalidName => (StatusCode::BAD_REQUEST, "invalid_name"),
                TradeError::InvalidCoinId => (StatusCode::BAD_REQUEST, "invalid_coin_id"),
                TradeError::InvalidPrice(_) => (StatusCode::BAD_REQUEST, "invalid_price"),
                TradeError::EngineUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "engine_unavailable"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        } else {
            debug!(error = %self, code, "request rejected");
        }

        let body = ErrorResponse {
            error: ErrorInfo {
                code,
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// ヘッダーからプレイヤーIDを取り出す
fn player_id_from(headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let raw = headers
        .get(PLAYER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::MissingPlayerId)?;
    Ok(parse_player_id(raw)?)
}

fn parse_side(raw: &str) -> Result<Side, ApiError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "buy" => Ok(Side::Buy),
        "sell" => Ok(Side::Sell),
        other => Err(ApiError::BadRequest(format!("unknown trade type: {other}"))),
    }
}

// =============================================================================
// ハンドラー
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub player_id: Uuid,
}

/// POST /api/login - 名前でログイン（同じ名前なら同じID）
async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> ApiResult<LoginResponse> {
    let Json(payload) = payload?;
    let player_id = state.engine.login(&payload.name).await?;
    Ok(Json(LoginResponse { player_id }))
}

/// GET /api/tokens - コイン一覧
async fn list_tokens(State(state): State<Arc<AppState>>) -> ApiResult<Vec<CoinView>> {
    let coins = state.engine.list_coins().await?;
    Ok(Json(coins.iter().map(CoinView::from_coin).collect()))
}

/// GET /api/token/{id} - コイン詳細（自分の保有数量つき）
async fn get_token(
    State(state): State<Arc<AppState>>,
    UrlPath(coin_id): UrlPath<String>,
    headers: HeaderMap,
) -> ApiResult<CoinDetail> {
    let player_id = player_id_from(&headers)?;
    Ok(Json(state.engine.coin_detail(player_id, &coin_id).await?))
}

/// 売買リクエストのボディ
///
/// amount は数値でも文字列でも受け付け、解釈できなければ InvalidQuantity にする。
#[derive(Debug, Deserialize)]
pub struct TradePayload {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub amount: Value,
}

/// POST /api/token/{id}/trade - 売買
async fn trade_token(
    State(state): State<Arc<AppState>>,
    UrlPath(coin_id): UrlPath<String>,
    headers: HeaderMap,
    payload: Result<Json<TradePayload>, JsonRejection>,
) -> ApiResult<TradeReceipt> {
    let player_id = player_id_from(&headers)?;
    let Json(payload) = payload?;
    let side = parse_side(&payload.kind)?;
    let quantity = parse_quantity(&payload.amount)?;
    Ok(Json(state.engine.trade(player_id, &coin_id, side, quantity).await?))
}

/// GET /api/portfolio - 自分のポートフォリオ
async fn get_portfolio(State(state): State<Arc<AppState>>, headers: HeaderMap) -> ApiResult<PortfolioView> {
    let player_id = player_id_from(&headers)?;
    Ok(Json(state.engine.portfolio(player_id).await?))
}

/// GET /api/players - ランキング（純資産の降順）
async fn list_players(State(state): State<Arc<AppState>>) -> ApiResult<Vec<PortfolioView>> {
    Ok(Json(state.engine.leaderboard().await?))
}

/// ルーターを構築
///
/// static_dir を指定すると、APIに一致しないパスはそのディレクトリから配信する。
pub fn router(engine: EngineHandle, static_dir: Option<&Path>) -> Router {
    let state = Arc::new(AppState { engine });

    let app = Router::new()
        .route("/api/login", post(login))
        .route("/api/tokens", get(list_tokens))
        .route("/api/token/{id}", get(get_token))
        .route("/api/token/{id}/trade", post(trade_token))
        .route("/api/portfolio", get(get_portfolio))
        .route("/api/players", get(list_players))
        .with_state(state);

    let app = match static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    };

    app.layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive())
}
