use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::engine::EngineHandle;

/// 価格更新の既定周期
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(5);

/// 一定周期でエンジンに Tick を送り続ける
///
/// 最初のティックは起動直後ではなく1周期後。エンジンが停止したらループを抜ける。
pub async fn run_price_ticker(engine: EngineHandle, period: Duration) {
    let mut interval = time::interval_at(Instant::now() + period, period);
    // 遅れたティックをまとめて撃たない
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        if engine.tick().await.is_err() {
            debug!("engine gone, price ticker exiting");
            break;
        }
    }
}

/// 価格ティッカーのタスク
///
/// spawn で開始し、stop で止める。ドロップしてもタスクは止まらない。
#[derive(Debug)]
pub struct PriceTicker {
    task: JoinHandle<()>,
}

impl PriceTicker {
    pub fn spawn(engine: EngineHandle, period: Duration) -> Self {
        info!(period_ms = period.as_millis() as u64, "price ticker started");
        Self {
            task: tokio::spawn(run_price_ticker(engine, period)),
        }
    }

    /// タスクを中断し、終了を待つ
    pub async fn stop(self) {
        self.task.abort();
        // 中断によるJoinErrorは正常終了扱い
        let _ = self.task.await;
        info!("price ticker stopped");
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
