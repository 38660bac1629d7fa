use thiserror::Error;

/// マーケットと台帳の操作で発生するエラー
///
/// どれも呼び出し側の入力チェックで起きるもので、失敗した操作は状態を一切変更しない。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TradeError {
    #[error("player not found: {0}")]
    PlayerNotFound(String),

    #[error("coin not found: {0}")]
    CoinNotFound(String),

    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("not enough money: need {needed}, have {available}")]
    InsufficientFunds { needed: String, available: String },

    #[error("not enough tokens: need {needed}, have {available}")]
    InsufficientHoldings { needed: String, available: String },

    #[error("coin already exists: {0}")]
    DuplicateId(String),

    #[error("invalid player name")]
    InvalidName,

    #[error("invalid coin id")]
    InvalidCoinId,

    #[error("invalid price: {0}")]
    InvalidPrice(String),

    /// エンジンのタスクが停止している（チャネルが閉じた）
    #[error("engine is not running")]
    EngineUnavailable,
}

pub type Result<T> = std::result::Result<T, TradeError>;
