use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Result, TradeError};
use crate::market::MarketEngine;
use crate::models::{CoinDetail, CoinView, HoldingView, Player, PortfolioView, Side, TradeReceipt};

/// 新規プレイヤーの初期資金
pub const STARTING_CASH: Decimal = dec!(1000);

/// 全プレイヤーの現金と保有コインを管理する
///
/// 価格はマーケットエンジンから約定の瞬間に読み取る（価格ロックはしない）。
#[derive(Debug, Clone)]
pub struct Ledger {
    // 登録順（ランキングの同点時の順序に使う）
    players: Vec<Player>,
    by_id: HashMap<Uuid, usize>,
    by_name: HashMap<String, usize>,
    starting_cash: Decimal,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Self::with_starting_cash(STARTING_CASH)
    }

    pub fn with_starting_cash(starting_cash: Decimal) -> Self {
        Self {
            players: Vec::new(),
            by_id: HashMap::new(),
            by_name: HashMap::new(),
            starting_cash,
        }
    }

    /// ログイン: 同じ名前なら既存のIDを返し、なければ新規作成する
    ///
    /// 新規プレイヤーはその時点で存在する全コインについて保有数量0のエントリを持つ。
    pub fn create_or_get_player(&mut self, name: &str, market: &MarketEngine) -> Result<Uuid> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TradeError::InvalidName);
        }
        if let Some(&index) = self.by_name.get(name) {
            return Ok(self.players[index].id);
        }

        let id = Uuid::new_v4();
        let holdings = market
            .list_coins()
            .iter()
            .map(|c| (c.id.clone(), Decimal::ZERO))
            .collect();

        let index = self.players.len();
        self.players.push(Player {
            id,
            name: name.to_string(),
            cash: self.starting_cash,
            holdings,
        });
        self.by_id.insert(id, index);
        self.by_name.insert(name.to_string(), index);

        info!(player = %id, player_name = name, "player created");
        Ok(id)
    }

    pub fn get_player(&self, id: &Uuid) -> Option<&Player> {
        self.by_id.get(id).map(|&i| &self.players[i])
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// 上場廃止されたコインの保有記録を全プレイヤーから消す
    ///
    /// 同じIDで再上場しても、古い保有数量は復活しない。
    pub fn forget_coin(&mut self, coin_id: &str) {
        let mut cleared = 0;
        for player in &mut self.players {
            if player.holdings.remove(coin_id).is_some_and(|q| q > Decimal::ZERO) {
                cleared += 1;
            }
        }
        info!(coin = coin_id, holders = cleared, "holdings cleared for delisted coin");
    }

    /// 売買を実行する
    ///
    /// - 買い: cost = quantity * price。現金が足りなければ InsufficientFunds
    /// - 売り: 保有数量が足りなければ InsufficientHoldings
    ///
    /// どのチェックで失敗しても状態は変更されない。
    pub fn trade(
        &mut self,
        player_id: &Uuid,
        coin_id: &str,
        side: Side,
        quantity: Decimal,
        market: &MarketEngine,
    ) -> Result<TradeReceipt> {
        let index = *self
            .by_id
            .get(player_id)
            .ok_or_else(|| TradeError::PlayerNotFound(player_id.to_string()))?;
        let coin = market
            .get_coin(coin_id)
            .ok_or_else(|| TradeError::CoinNotFound(coin_id.to_string()))?;
        let quantity = validate_quantity(quantity)?;

        let price = coin.price;
        let notional = quantity
            .checked_mul(price)
            .ok_or_else(|| TradeError::InvalidQuantity(quantity.to_string()))?;

        let player = &mut self.players[index];
        let held = player.holding(coin_id);

        match side {
            Side::Buy => {
                if player.cash < notional {
                    return Err(TradeError::InsufficientFunds {
                        needed: notional.to_string(),
                        available: player.cash.to_string(),
                    });
                }
                player.cash -= notional;
                player.holdings.insert(coin_id.to_string(), held + quantity);
            }
            Side::Sell => {
                if held < quantity {
                    return Err(TradeError::InsufficientHoldings {
                        needed: quantity.to_string(),
                        available: held.to_string(),
                    });
                }
                player.cash += notional;
                player.holdings.insert(coin_id.to_string(), held - quantity);
            }
        }

        let tokens = player.holding(coin_id);
        debug!(player = %player.id, coin = coin_id, ?side, %quantity, %price, "trade executed");

        Ok(TradeReceipt {
            player_id: player.id,
            side,
            amount: quantity,
            money: player.cash,
            coin: CoinView::from_coin(coin),
            tokens,
            token_value: tokens * price,
        })
    }

    /// プレイヤーから見たコイン詳細
    pub fn coin_detail(&self, player_id: &Uuid, coin_id: &str, market: &MarketEngine) -> Result<CoinDetail> {
        let player = self
            .get_player(player_id)
            .ok_or_else(|| TradeError::PlayerNotFound(player_id.to_string()))?;
        let coin = market
            .get_coin(coin_id)
            .ok_or_else(|| TradeError::CoinNotFound(coin_id.to_string()))?;
        Ok(CoinDetail::new(coin, player))
    }

    pub fn get_portfolio(&self, player_id: &Uuid, market: &MarketEngine) -> Result<PortfolioView> {
        let player = self
            .get_player(player_id)
            .ok_or_else(|| TradeError::PlayerNotFound(player_id.to_string()))?;
        Ok(portfolio_of(player, market))
    }

    /// ランキング: 純資産の降順（同額は登録順）
    pub fn list_players(&self, market: &MarketEngine) -> Vec<PortfolioView> {
        let mut views: Vec<PortfolioView> = self.players.iter().map(|p| portfolio_of(p, market)).collect();
        // sort_by は安定ソートなので同額は登録順のまま
        views.sort_by(|a, b| b.net_worth.cmp(&a.net_worth));
        views
    }
}

/// 純資産 = 現金 + Σ 保有数量 * 現在価格
///
/// 上場中のコインだけを数える。
fn portfolio_of(player: &Player, market: &MarketEngine) -> PortfolioView {
    let mut portfolio = BTreeMap::new();
    let mut net_worth = player.cash;

    for coin in market.list_coins() {
        let tokens = player.holding(&coin.id);
        let token_value = tokens * coin.price;
        net_worth += token_value;
        portfolio.insert(
            coin.id.clone(),
            HoldingView {
                tokens,
                value: coin.price,
                token_value,
            },
        );
    }

    PortfolioView {
        id: player.id,
        name: player.name.clone(),
        money: player.cash,
        net_worth,
        portfolio,
    }
}

/// 数量は正の値でなければならない
pub fn validate_quantity(quantity: Decimal) -> Result<Decimal> {
    if quantity <= Decimal::ZERO {
        return Err(TradeError::InvalidQuantity(quantity.to_string()));
    }
    Ok(quantity)
}

/// クライアントから来た数量（JSONの数値または数値文字列）を解釈する
pub fn parse_quantity(raw: &Value) -> Result<Decimal> {
    let text = match raw {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        other => return Err(TradeError::InvalidQuantity(other.to_string())),
    };

    let quantity = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| TradeError::InvalidQuantity(text.clone()))?;
    validate_quantity(quantity)
}

/// ヘッダー等から来たプレイヤーIDを解釈する（形式が不正なら未登録扱い）
pub fn parse_player_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| TradeError::PlayerNotFound(raw.to_string()))
}
