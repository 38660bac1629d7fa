//! サーバー設定
//!
//! コマンドライン引数と環境変数（.env も可）から読み込む。

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use rust_decimal::Decimal;

use crate::ledger::STARTING_CASH;

/// コイン取引シミュレータのサーバー
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// 待ち受けアドレス
    #[arg(long, env = "COIN_SIM_ADDR", default_value = "0.0.0.0:4000")]
    pub addr: SocketAddr,

    /// 価格更新の周期（秒）
    #[arg(long, env = "COIN_SIM_TICK_SECS", default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub tick_secs: u64,

    /// 新規プレイヤーの初期資金
    #[arg(long, env = "COIN_SIM_STARTING_CASH", default_value_t = STARTING_CASH)]
    pub starting_cash: Decimal,

    /// フロントエンドのビルド成果物を配信するディレクトリ
    #[arg(long, env = "COIN_SIM_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// 標準入力の管理コンソールを無効にする
    #[arg(long, env = "COIN_SIM_NO_CONSOLE")]
    pub no_console: bool,
}

impl Config {
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }
}
