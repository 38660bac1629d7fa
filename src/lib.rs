//! コイン取引シミュレータ
//!
//! - market: コイン価格のランダムウォークと価格履歴
//! - ledger: プレイヤーの現金・保有コインと売買
//! - engine: 両者を所有するアクター
//! - ticker: 一定周期で価格を更新するタスク
//! - api: HTTP API (axum)
//! - console: 管理コンソール

pub mod api;
pub mod config;
pub mod console;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod market;
pub mod models;
pub mod seed;
pub mod ticker;
