use std::collections::VecDeque;
use std::time::Instant;

use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info};

use crate::error::{Result, TradeError};
use crate::models::{Coin, NewCoin, PricePoint};

/// 価格履歴の最大件数（超えたら古いものから捨てる）
pub const HISTORY_CAPACITY: usize = 30;

/// 1ティックあたりの最大変動率（±5%）
pub const MAX_DRIFT: f64 = 0.05;

/// 価格の下限
///
/// 初期価格が1未満のコインも、最初のティックで1まで引き上げられる。
pub const PRICE_FLOOR: Decimal = Decimal::ONE;

/// 全コインの価格と履歴を管理する
///
/// 台帳（Ledger）のことは知らない。ティックごとに各コインの価格を独立にランダムウォークさせる。
#[derive(Debug, Clone)]
pub struct MarketEngine {
    // 挿入順を保つためVecで持つ（件数は数十程度）
    coins: Vec<Coin>,
    started_at: Instant,
}

impl Default for MarketEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketEngine {
    pub fn new() -> Self {
        Self {
            coins: Vec::new(),
            started_at: Instant::now(),
        }
    }

    /// 初期コインを登録した状態で作成
    pub fn with_coins(coins: impl IntoIterator<Item = NewCoin>) -> Result<Self> {
        let mut engine = Self::new();
        for coin in coins {
            engine.add_coin(coin)?;
        }
        Ok(engine)
    }

    /// エンジン起動からの経過秒数
    pub fn elapsed_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// 全コインの価格を1ステップ進める（タイマーから呼ばれる）
    pub fn tick(&mut self) {
        let elapsed = self.elapsed_secs();
        // rand::rng() は !Send なので、このスコープ内だけで使う
        let mut rng = rand::rng();
        self.tick_at(&mut rng, elapsed);
    }

    /// 乱数源と時刻を指定してティックを実行する
    pub fn tick_at<R: Rng>(&mut self, rng: &mut R, elapsed_secs: u64) {
        for coin in &mut self.coins {
            let drift: f64 = rng.random_range(-MAX_DRIFT..=MAX_DRIFT);
            let drift = Decimal::try_from(drift).unwrap_or(Decimal::ZERO);
            coin.apply_drift(drift, elapsed_secs);
        }
        debug!(coins = self.coins.len(), elapsed_secs, "market tick");
    }

    pub fn get_coin(&self, id: &str) -> Option<&Coin> {
        self.coins.iter().find(|c| c.id == id)
    }

    /// 現在価格を取得
    pub fn price_of(&self, id: &str) -> Option<Decimal> {
        self.get_coin(id).map(|c| c.price)
    }

    /// 挿入順のコイン一覧
    pub fn list_coins(&self) -> &[Coin] {
        &self.coins
    }

    /// コインを追加する（管理者用）
    ///
    /// 履歴は現在の経過時間の1点で初期化される。
    pub fn add_coin(&mut self, new_coin: NewCoin) -> Result<&Coin> {
        let id = new_coin.id.trim().to_string();
        if id.is_empty() {
            return Err(TradeError::InvalidCoinId);
        }
        if new_coin.price <= Decimal::ZERO {
            return Err(TradeError::InvalidPrice(new_coin.price.to_string()));
        }
        if self.get_coin(&id).is_some() {
            return Err(TradeError::DuplicateId(id));
        }

        let mut history = VecDeque::with_capacity(HISTORY_CAPACITY + 1);
        history.push_back(PricePoint {
            price: new_coin.price,
            elapsed_secs: self.elapsed_secs(),
        });

        info!(coin = %id, price = %new_coin.price, "coin listed");
        self.coins.push(Coin {
            id,
            name: new_coin.name,
            owner: new_coin.owner,
            price: new_coin.price,
            growth_percent: new_coin.growth_percent,
            demand_percent: new_coin.demand_percent,
            history,
        });
        let index = self.coins.len() - 1;
        Ok(&self.coins[index])
    }

    /// コインを削除する（管理者用）
    pub fn remove_coin(&mut self, id: &str) -> Result<Coin> {
        let index = self
            .coins
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| TradeError::CoinNotFound(id.to_string()))?;
        let removed = self.coins.remove(index);
        info!(coin = %removed.id, "coin delisted");
        Ok(removed)
    }
}

impl Coin {
    /// 変動率 drift を適用して価格・成長率・履歴を更新する
    ///
    /// 1. new = price * (1 + drift)
    /// 2. new = max(new, 1)
    /// 3. 小数点以下2桁に丸める
    /// 4. 履歴に追加し、30件を超えたら最古の1件を捨てる
    pub fn apply_drift(&mut self, drift: Decimal, elapsed_secs: u64) {
        let old_price = self.price;
        let moved = old_price
            .checked_mul(Decimal::ONE + drift)
            .unwrap_or(old_price);
        let new_price = moved.max(PRICE_FLOOR).round_dp(2);

        if old_price > Decimal::ZERO {
            self.growth_percent = ((new_price - old_price) / old_price * dec!(100)).round_dp(2);
        }
        self.price = new_price;

        // 経過時間は単調非減少にそろえる
        let last = self.history.back().map(|p| p.elapsed_secs).unwrap_or(0);
        self.history.push_back(PricePoint {
            price: new_price,
            elapsed_secs: elapsed_secs.max(last),
        });
        while self.history.len() > HISTORY_CAPACITY {
            self.history.pop_front();
        }
    }
}
