use std::collections::{BTreeMap, HashMap, VecDeque};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// ドメインモデル
// =============================================================================

/// 売買方向
///
/// JSONでは "buy" / "sell" の小文字で受け取る
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

/// 価格履歴の1点
///
/// - price: その時点の価格
/// - elapsed_secs: エンジン起動からの経過秒数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricePoint {
    pub price: Decimal,
    pub elapsed_secs: u64,
}

/// シミュレーション上のコイン
///
/// 価格・成長率・需要・履歴はすべてマーケットエンジンだけが書き換える。
#[derive(Debug, Clone, PartialEq)]
pub struct Coin {
    pub id: String,
    pub name: String,
    /// 発行元の表示ラベル（"PapaCoin corp." など）
    pub owner: String,
    pub price: Decimal,
    /// 直近のティックで適用された変化率（%）
    pub growth_percent: Decimal,
    pub demand_percent: Decimal,
    pub history: VecDeque<PricePoint>,
}

/// コイン追加時の入力
#[derive(Debug, Clone, PartialEq)]
pub struct NewCoin {
    pub id: String,
    pub name: String,
    pub owner: String,
    pub price: Decimal,
    pub growth_percent: Decimal,
    pub demand_percent: Decimal,
}

impl NewCoin {
    /// 成長率・需要を0で作る
    pub fn new(id: impl Into<String>, name: impl Into<String>, owner: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            owner: owner.into(),
            price,
            growth_percent: Decimal::ZERO,
            demand_percent: Decimal::ZERO,
        }
    }

    pub fn with_rates(mut self, growth_percent: Decimal, demand_percent: Decimal) -> Self {
        self.growth_percent = growth_percent;
        self.demand_percent = demand_percent;
        self
    }
}

/// プレイヤー（ログイン名ごとに1つ）
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: Uuid,
    pub name: String,
    pub cash: Decimal,
    /// コインID -> 保有数量
    pub holdings: HashMap<String, Decimal>,
}

impl Player {
    /// 保有数量を取得（エントリがなければ0）
    pub fn holding(&self, coin_id: &str) -> Decimal {
        self.holdings.get(coin_id).copied().unwrap_or(Decimal::ZERO)
    }
}

// =============================================================================
// 外部に返すビュー
// =============================================================================
//
// 数値はフロントエンドがそのまま計算に使うので、文字列ではなくJSONの数値で出す。

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePointView {
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    pub time: u64,
}

/// コイン一覧・詳細用のビュー
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinView {
    pub id: String,
    pub name: String,
    pub corp: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub growth: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub demand: Decimal,
    pub history: Vec<PricePointView>,
}

impl CoinView {
    pub fn from_coin(coin: &Coin) -> Self {
        Self {
            id: coin.id.clone(),
            name: coin.name.clone(),
            corp: coin.owner.clone(),
            value: coin.price,
            growth: coin.growth_percent,
            demand: coin.demand_percent,
            history: coin
                .history
                .iter()
                .map(|p| PricePointView { value: p.price, time: p.elapsed_secs })
                .collect(),
        }
    }
}

/// 1人のプレイヤーから見たコイン詳細
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinDetail {
    #[serde(flatten)]
    pub coin: CoinView,
    #[serde(with = "rust_decimal::serde::float")]
    pub tokens: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub token_value: Decimal,
}

impl CoinDetail {
    pub fn new(coin: &Coin, player: &Player) -> Self {
        let tokens = player.holding(&coin.id);
        Self {
            coin: CoinView::from_coin(coin),
            tokens,
            token_value: tokens * coin.price,
        }
    }
}

/// 売買成立後のスナップショット
///
/// - money: 取引後の現金
/// - tokens: 取引後の保有数量
/// - value: 約定に使われた価格
/// - tokenValue: tokens * value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeReceipt {
    pub player_id: Uuid,
    pub side: Side,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub money: Decimal,
    #[serde(flatten)]
    pub coin: CoinView,
    #[serde(with = "rust_decimal::serde::float")]
    pub tokens: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub token_value: Decimal,
}

/// ポートフォリオ内の1銘柄
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingView {
    #[serde(with = "rust_decimal::serde::float")]
    pub tokens: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub token_value: Decimal,
}

/// プレイヤーのポートフォリオ（ダッシュボードとランキングで共用）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioView {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub money: Decimal,
    /// money + Σ 保有数量 * 現在価格
    #[serde(with = "rust_decimal::serde::float")]
    pub net_worth: Decimal,
    pub portfolio: BTreeMap<String, HoldingView>,
}
