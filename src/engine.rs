use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Result, TradeError};
use crate::ledger::Ledger;
use crate::market::MarketEngine;
use crate::models::{Coin, CoinDetail, NewCoin, PortfolioView, Side, TradeReceipt};

/// エンジンへのメッセージキューの容量
pub const ENGINE_QUEUE_CAPACITY: usize = 1024;

// =============================================================================
// Actorパターンのメッセージ定義
// =============================================================================
//
// マーケットと台帳はエンジンタスクだけが所有する。
// 他のタスクはメッセージを送り、oneshotで結果を受け取る。
// これで売買とティックが同じコイン・プレイヤーを同時に書き換えることはない。

/// エンジンに送るメッセージ
pub enum EngineMessage {
    /// 全コインの価格を1ステップ進める（返信なし）
    Tick,
    ListCoins {
        respond_to: oneshot::Sender<Vec<Coin>>,
    },
    GetCoin {
        coin_id: String,
        respond_to: oneshot::Sender<Option<Coin>>,
    },
    AddCoin {
        coin: NewCoin,
        respond_to: oneshot::Sender<Result<Coin>>,
    },
    RemoveCoin {
        coin_id: String,
        respond_to: oneshot::Sender<Result<Coin>>,
    },
    Login {
        name: String,
        respond_to: oneshot::Sender<Result<Uuid>>,
    },
    GetCoinDetail {
        player_id: Uuid,
        coin_id: String,
        respond_to: oneshot::Sender<Result<CoinDetail>>,
    },
    Trade {
        player_id: Uuid,
        coin_id: String,
        side: Side,
        quantity: Decimal,
        respond_to: oneshot::Sender<Result<TradeReceipt>>,
    },
    GetPortfolio {
        player_id: Uuid,
        respond_to: oneshot::Sender<Result<PortfolioView>>,
    },
    ListPlayers {
        respond_to: oneshot::Sender<Vec<PortfolioView>>,
    },
}

/// エンジンを実行する（Actor Loop）
///
/// 送信側がすべてドロップされるとループを抜ける。
pub async fn run_engine(mut rx: mpsc::Receiver<EngineMessage>, mut market: MarketEngine, mut ledger: Ledger) {
    while let Some(msg) = rx.recv().await {
        // 返信先が既に切断されていても処理は完了させる（送信結果は無視）
        match msg {
            EngineMessage::Tick => market.tick(),
            EngineMessage::ListCoins { respond_to } => {
                let _ = respond_to.send(market.list_coins().to_vec());
            }
            EngineMessage::GetCoin { coin_id, respond_to } => {
                let _ = respond_to.send(market.get_coin(&coin_id).cloned());
            }
            EngineMessage::AddCoin { coin, respond_to } => {
                let _ = respond_to.send(market.add_coin(coin).cloned());
            }
            EngineMessage::RemoveCoin { coin_id, respond_to } => {
                let removed = market.remove_coin(&coin_id);
                if removed.is_ok() {
                    ledger.forget_coin(&coin_id);
                }
                let _ = respond_to.send(removed);
            }
            EngineMessage::Login { name, respond_to } => {
                let _ = respond_to.send(ledger.create_or_get_player(&name, &market));
            }
            EngineMessage::GetCoinDetail { player_id, coin_id, respond_to } => {
                let _ = respond_to.send(ledger.coin_detail(&player_id, &coin_id, &market));
            }
            EngineMessage::Trade { player_id, coin_id, side, quantity, respond_to } => {
                let result = ledger.trade(&player_id, &coin_id, side, quantity, &market);
                if let Err(e) = &result {
                    warn!(player = %player_id, coin = %coin_id, error = %e, "trade rejected");
                }
                let _ = respond_to.send(result);
            }
            EngineMessage::GetPortfolio { player_id, respond_to } => {
                let _ = respond_to.send(ledger.get_portfolio(&player_id, &market));
            }
            EngineMessage::ListPlayers { respond_to } => {
                let _ = respond_to.send(ledger.list_players(&market));
            }
        }
    }
    info!("engine stopped");
}

/// エンジンへの送信ハンドル
///
/// Cloneして各タスク（HTTPハンドラ、ティッカー、コンソール）に配る。
#[derive(Debug, Clone)]
pub struct EngineHandle {
    sender: mpsc::Sender<EngineMessage>,
}

impl EngineHandle {
    pub fn new(sender: mpsc::Sender<EngineMessage>) -> Self {
        Self { sender }
    }

    /// エンジンタスクを起動してハンドルを返す
    pub fn spawn(market: MarketEngine, ledger: Ledger) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(ENGINE_QUEUE_CAPACITY);
        let task = tokio::spawn(run_engine(rx, market, ledger));
        (Self::new(tx), task)
    }

    /// メッセージを送って返信を待つ
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> EngineMessage) -> Result<T> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.sender
            .send(make(resp_tx))
            .await
            .map_err(|_| TradeError::EngineUnavailable)?;
        resp_rx.await.map_err(|_| TradeError::EngineUnavailable)
    }

    /// ティックを依頼する（完了は待たない）
    pub async fn tick(&self) -> Result<()> {
        self.sender
            .send(EngineMessage::Tick)
            .await
            .map_err(|_| TradeError::EngineUnavailable)
    }

    pub async fn list_coins(&self) -> Result<Vec<Coin>> {
        self.request(|respond_to| EngineMessage::ListCoins { respond_to }).await
    }

    pub async fn get_coin(&self, coin_id: &str) -> Result<Coin> {
        let coin_id = coin_id.to_string();
        let missing = TradeError::CoinNotFound(coin_id.clone());
        self.request(|respond_to| EngineMessage::GetCoin { coin_id, respond_to })
            .await?
            .ok_or(missing)
    }

    pub async fn add_coin(&self, coin: NewCoin) -> Result<Coin> {
        self.request(|respond_to| EngineMessage::AddCoin { coin, respond_to }).await?
    }

    pub async fn remove_coin(&self, coin_id: &str) -> Result<Coin> {
        let coin_id = coin_id.to_string();
        self.request(|respond_to| EngineMessage::RemoveCoin { coin_id, respond_to }).await?
    }

    pub async fn login(&self, name: &str) -> Result<Uuid> {
        let name = name.to_string();
        self.request(|respond_to| EngineMessage::Login { name, respond_to }).await?
    }

    pub async fn coin_detail(&self, player_id: Uuid, coin_id: &str) -> Result<CoinDetail> {
        let coin_id = coin_id.to_string();
        self.request(|respond_to| EngineMessage::GetCoinDetail { player_id, coin_id, respond_to })
            .await?
    }

    pub async fn trade(&self, player_id: Uuid, coin_id: &str, side: Side, quantity: Decimal) -> Result<TradeReceipt> {
        let coin_id = coin_id.to_string();
        self.request(|respond_to| EngineMessage::Trade {
            player_id,
            coin_id,
            side,
            quantity,
            respond_to,
        })
        .await?
    }

    pub async fn portfolio(&self, player_id: Uuid) -> Result<PortfolioView> {
        self.request(|respond_to| EngineMessage::GetPortfolio { player_id, respond_to })
            .await?
    }

    pub async fn leaderboard(&self) -> Result<Vec<PortfolioView>> {
        self.request(|respond_to| EngineMessage::ListPlayers { respond_to }).await
    }

    /// エンジンが停止しているか
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
