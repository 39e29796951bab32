mod demo;

use std::sync::Arc;

use demo::DemoCandleSource;
use fupan_core::common::TimeFrame;
use fupan_core::config::SimConfig;
use fupan_core::trade::entity::Side;
use fupan_sim::session::{SessionManager, SessionRequest};
use rust_decimal::Decimal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// # Summary
/// 从 `fupan.toml`（可选）与 `FUPAN_*` 环境变量加载模拟配置，
/// 任何字段缺省时回退到内置默认值。
fn load_config() -> SimConfig {
    let loaded = config::Config::builder()
        .add_source(config::File::with_name("fupan").required(false))
        .add_source(config::Environment::with_prefix("FUPAN"))
        .build()
        .and_then(|c| c.try_deserialize::<SimConfig>());

    match loaded {
        Ok(config) => config,
        Err(e) => {
            warn!("Config load failed ({}), using defaults", e);
            SimConfig::default()
        }
    }
}

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责实例化数据源并注入 SessionManager，再跑一个演示回放会话。
///
/// # Logic
/// 1. 初始化全局日志与配置。
/// 2. 实例化数据源（内置演示行情）。
/// 3. 构造应用服务层（SessionManager），创建并启动一个回放会话。
/// 4. 派生协程消费行情推送，期间演示一买一卖。
/// 5. 挂起等待外部信号退出。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 初始化日志与配置
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    info!("Fupan simulator starting...");
    let sim_config = load_config();

    // 2. 实例化数据源
    let source = Arc::new(DemoCandleSource::new(100.0));

    // 3. 构造应用服务层并创建演示会话
    let manager = SessionManager::new(source, sim_config);
    let session = manager.create_session(SessionRequest {
        symbol: "DEMO".to_string(),
        timeframe: TimeFrame::Minute1,
        history_limit: 120,
    });

    // 4. 消费推送并演示交易：第 5 帧买入，第 50 帧卖出
    let mut updates = session.subscribe();
    let trader = session.clone();
    tokio::spawn(async move {
        let mut frames: usize = 0;
        while let Ok(update) = updates.recv().await {
            frames += 1;
            info!(
                "{} @ {:.2} | equity {} | drawdown {}",
                update.symbol, update.price, update.equity.equity, update.statistics.max_drawdown
            );
            let action = match frames {
                5 => Some(Side::Buy),
                50 => Some(Side::Sell),
                _ => None,
            };
            if let Some(side) = action {
                match trader.submit_trade(side, Decimal::from(10)).await {
                    Ok(trade) => info!(
                        "Demo {:?} filled: {} x {} (pnl {})",
                        trade.side, trade.volume, trade.price, trade.realized_pnl
                    ),
                    Err(e) => warn!("Demo trade rejected: {}", e),
                }
            }
        }
    });

    session.start(1).await?;
    info!("Replay session {} running. Press Ctrl-C to exit.", session.id());

    // 5. 挂起主线程，等待外部退出信号
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting...");
    session.stop();
    manager.remove(session.id());

    Ok(())
}
