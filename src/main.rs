// =============================================================================
// coin-trading-sim - コイン取引シミュレータ
// =============================================================================
//
// 共有のコイン一覧の価格がタイマーでランダムに動き、
// プレイヤーは現在価格でコインを売買して純資産を競う。
//
// ┌─────────────────┐     ┌─────────────────┐     ┌──────────────────────┐
// │  Web API層      │────▶│   チャネル      │────▶│  エンジン            │
// │  (axum)        │◀────│   (mpsc)       │◀────│  (Market + Ledger)  │
// └─────────────────┘     └─────────────────┘     └──────────────────────┘
//          管理コンソール / 価格ティッカー も同じチャネルに送る
// =============================================================================

use clap::Parser;
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use coin_trading_sim::api;
use coin_trading_sim::config::Config;
use coin_trading_sim::console;
use coin_trading_sim::engine::EngineHandle;
use coin_trading_sim::ledger::Ledger;
use coin_trading_sim::market::MarketEngine;
use coin_trading_sim::seed;
use coin_trading_sim::ticker::PriceTicker;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // =========================================================================
    // Step 0: 設定とログ
    // =========================================================================
    dotenv::dotenv().ok();
    let config = Config::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("coin_trading_sim=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // =========================================================================
    // Step 1: マーケットと台帳を作成
    // =========================================================================
    let market = MarketEngine::with_coins(seed::default_coins())?;
    info!(coins = market.list_coins().len(), "market seeded");
    let ledger = Ledger::with_starting_cash(config.starting_cash);

    // =========================================================================
    // Step 2: エンジン（アクター）を起動
    // =========================================================================
    let (engine, engine_task) = EngineHandle::spawn(market, ledger);

    // =========================================================================
    // Step 3: 価格ティッカーを起動
    // =========================================================================
    let ticker = PriceTicker::spawn(engine.clone(), config.tick_period());

    // =========================================================================
    // Step 4: 管理コンソールを起動
    // =========================================================================
    if !config.no_console {
        let console_engine = engine.clone();
        tokio::spawn(async move {
            let input = BufReader::new(tokio::io::stdin());
            if let Err(e) = console::run_console(console_engine, input, tokio::io::stdout()).await {
                warn!(error = %e, "console closed with error");
            }
        });
    }

    // =========================================================================
    // Step 5: Webサーバーを起動
    // =========================================================================
    let app = api::router(engine, config.static_dir.as_deref());
    let listener = TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // コンソールは標準入力で待ち続けるので、エンジンは待たずに中断する
    ticker.stop().await;
    engine_task.abort();
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("shutting down..."),
        Err(e) => error!(error = %e, "failed to listen for ctrl-c"),
    }
}
