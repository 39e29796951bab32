use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use fupan_core::common::TimeFrame;
use fupan_core::config::SimConfig;
use fupan_core::market::entity::Candle;
use fupan_core::market::error::MarketError;
use fupan_core::market::mem::MemoryCandleSource;
use fupan_core::market::port::CandleSource;
use fupan_core::sim::entity::{ClockStatus, MarketUpdate};
use fupan_core::sim::error::SimError;
use fupan_core::trade::entity::AccountId;
use fupan_sim::clock::SimulationClock;
use fupan_trade::account::PortfolioAccount;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};
use tokio::time::{Duration, sleep, timeout};

/// 在返回历史前故意挂起一段时间的数据源，用于暴露启动路径上的竞态
struct SlowCandleSource {
    inner: MemoryCandleSource,
    delay: Duration,
}

#[async_trait]
impl CandleSource for SlowCandleSource {
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketError> {
        sleep(self.delay).await;
        self.inner.fetch_candles(symbol, timeframe, limit).await
    }
}

fn candles(count: usize) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
    (0..count)
        .map(|i| Candle {
            time: start + chrono::Duration::minutes(i as i64),
            open: 10.0,
            high: 15.0,
            low: 8.0,
            close: 12.0,
            volume: 1000.0,
        })
        .collect()
}

fn fast_config(ticks_per_candle: usize, tick_period_ms: u64) -> SimConfig {
    SimConfig {
        ticks_per_candle,
        tick_period_ms,
        seed: Some(42),
        ..SimConfig::default()
    }
}

async fn setup(
    candle_count: usize,
    config: SimConfig,
) -> (
    Arc<SimulationClock>,
    Arc<RwLock<PortfolioAccount>>,
    broadcast::Receiver<MarketUpdate>,
) {
    let source = Arc::new(MemoryCandleSource::new());
    source.seed("AAPL", candles(candle_count)).await;

    let account = Arc::new(RwLock::new(PortfolioAccount::new(
        AccountId("sim_test".into()),
        config.initial_cash,
    )));
    let (tx, rx) = broadcast::channel(256);
    let clock = Arc::new(SimulationClock::new(
        "AAPL".into(),
        TimeFrame::Minute1,
        100,
        config,
        source,
        account.clone(),
        tx,
    ));
    (clock, account, rx)
}

async fn wait_for_status(clock: &SimulationClock, expected: ClockStatus) {
    for _ in 0..300 {
        if clock.status() == expected {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("时钟未在时限内到达 {:?} 状态", expected);
}

#[tokio::test]
async fn test_ticks_published_in_order_then_clock_stops() {
    let (clock, _account, mut rx) = setup(1, fast_config(4, 10)).await;
    clock.start(1).await.unwrap();

    let mut updates = Vec::new();
    for _ in 0..4 {
        let update = timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        updates.push(update);
    }

    // 锚点: 开盘在前，收盘在后，序号稠密递增
    assert_eq!(updates[0].seq, Some(0));
    assert_eq!(updates[0].price, 10.0);
    assert_eq!(updates[3].seq, Some(3));
    assert_eq!(updates[3].price, 12.0);

    // 历史播完后时钟自行停止
    wait_for_status(&clock, ClockStatus::Stopped).await;
}

#[tokio::test]
async fn test_stop_after_three_ticks_publishes_nothing_further() {
    let (clock, account, mut rx) = setup(3, fast_config(4, 50)).await;
    clock.start(1).await.unwrap();

    for _ in 0..3 {
        timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
    }
    clock.stop();
    assert_eq!(clock.status(), ClockStatus::Stopped);

    // 第 4 次唤醒到期后既无推送也无落账
    let res = timeout(Duration::from_millis(200), rx.recv()).await;
    assert!(res.is_err(), "停止后不应再收到任何推送");
    assert_eq!(account.read().await.equity_curve().len(), 3);

    // 幂等：重复 stop 无副作用
    clock.stop();
    assert_eq!(clock.status(), ClockStatus::Stopped);
}

#[tokio::test]
async fn test_pause_suppresses_publishing_until_resume() {
    let (clock, _account, mut rx) = setup(5, fast_config(60, 20)).await;
    clock.start(1).await.unwrap();

    timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    clock.pause().unwrap();
    assert_eq!(clock.status(), ClockStatus::Paused);

    // 清掉暂停生效前可能在途的一帧，之后必须完全静默
    let _ = timeout(Duration::from_millis(100), rx.recv()).await;
    let res = timeout(Duration::from_millis(200), rx.recv()).await;
    assert!(res.is_err(), "暂停期间不应有推送");

    clock.resume().unwrap();
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    clock.stop();
}

#[tokio::test]
async fn test_double_start_rejected() {
    let (clock, _account, _rx) = setup(2, fast_config(4, 50)).await;
    clock.start(1).await.unwrap();

    assert!(matches!(
        clock.start(1).await,
        Err(SimError::AlreadyRunning)
    ));
    clock.stop();
}

#[tokio::test]
async fn test_zero_speed_rejected() {
    let (clock, _account, _rx) = setup(2, fast_config(4, 50)).await;

    assert!(matches!(clock.start(0).await, Err(SimError::InvalidSpeed(0))));
    assert_eq!(clock.status(), ClockStatus::Idle);
    assert!(matches!(clock.set_speed(0), Err(SimError::InvalidSpeed(0))));
}

#[tokio::test]
async fn test_concurrent_start_admits_exactly_one_driver() {
    let inner = MemoryCandleSource::new();
    inner.seed("AAPL", candles(2)).await;
    let source = Arc::new(SlowCandleSource {
        inner,
        delay: Duration::from_millis(100),
    });

    let config = fast_config(4, 10);
    let account = Arc::new(RwLock::new(PortfolioAccount::new(
        AccountId("sim_test".into()),
        config.initial_cash,
    )));
    let (tx, mut rx) = broadcast::channel(256);
    let clock = Arc::new(SimulationClock::new(
        "AAPL".into(),
        TimeFrame::Minute1,
        100,
        config,
        source,
        account.clone(),
        tx,
    ));

    // 两个 start 在数据源挂起期间并发竞争，只允许一个抢到启动权
    let results = {
        let (a, b) = tokio::join!(clock.start(4), clock.start(4));
        [a, b]
    };
    assert_eq!(
        results.iter().filter(|r| r.is_ok()).count(),
        1,
        "并发启动必须恰好一个成功"
    );
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(SimError::AlreadyRunning))),
        "落败的一方必须收到 AlreadyRunning"
    );

    // 单驱动纪律：每个合成 Tick 恰好发布一次、落账一次
    wait_for_status(&clock, ClockStatus::Stopped).await;
    let mut received = 0;
    while timeout(Duration::from_millis(50), rx.recv())
        .await
        .ok()
        .and_then(|r| r.ok())
        .is_some()
    {
        received += 1;
    }
    assert_eq!(received, 8);
    assert_eq!(account.read().await.equity_curve().len(), 8);
}

#[tokio::test]
async fn test_stop_on_idle_clock_keeps_it_startable() {
    let (clock, _account, mut rx) = setup(1, fast_config(4, 10)).await;

    // 从未启动的时钟没有可取消的协程，stop 保持 Idle
    clock.stop();
    assert_eq!(clock.status(), ClockStatus::Idle);

    clock.start(1).await.unwrap();
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    clock.stop();
    assert_eq!(clock.status(), ClockStatus::Stopped);
}

#[tokio::test]
async fn test_invalid_history_candle_degrades_to_linear_path() {
    let source = Arc::new(MemoryCandleSource::new());
    // low > high 违反四价约束
    source
        .seed(
            "BAD",
            vec![Candle {
                time: Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap(),
                open: 10.0,
                high: 8.0,
                low: 15.0,
                close: 12.0,
                volume: 1000.0,
            }],
        )
        .await;

    let config = fast_config(4, 10);
    let account = Arc::new(RwLock::new(PortfolioAccount::new(
        AccountId("sim_test".into()),
        config.initial_cash,
    )));
    let (tx, mut rx) = broadcast::channel(64);
    let clock = Arc::new(SimulationClock::new(
        "BAD".into(),
        TimeFrame::Minute1,
        100,
        config,
        source,
        account,
        tx,
    ));

    // 非法 K 线只告警降级，不得拒绝启动
    clock.start(1).await.unwrap();

    let mut updates = Vec::new();
    for _ in 0..4 {
        updates.push(
            timeout(Duration::from_secs(2), rx.recv())
                .await
                .unwrap()
                .unwrap(),
        );
    }
    assert_eq!(updates[0].price, 10.0);
    assert_eq!(updates[3].price, 12.0);
    assert!(updates.iter().all(|u| u.price >= 10.0 && u.price <= 12.0));

    wait_for_status(&clock, ClockStatus::Stopped).await;
}

#[tokio::test]
async fn test_empty_history_faults_clock() {
    let source = Arc::new(MemoryCandleSource::new());
    source.seed("EMPTY", Vec::new()).await;

    let config = fast_config(4, 50);
    let account = Arc::new(RwLock::new(PortfolioAccount::new(
        AccountId("sim_test".into()),
        config.initial_cash,
    )));
    let (tx, _rx) = broadcast::channel(16);
    let clock = Arc::new(SimulationClock::new(
        "EMPTY".into(),
        TimeFrame::Minute1,
        100,
        config,
        source,
        account,
        tx,
    ));

    assert!(matches!(clock.start(1).await, Err(SimError::Market(_))));
    assert_eq!(clock.status(), ClockStatus::Faulted);
}

#[tokio::test]
async fn test_speed_multiplier_drains_history_faster() {
    // 2 根 K 线 x 4 Tick，每次唤醒推进 4 个：三次唤醒内必然播完
    let (clock, account, mut rx) = setup(2, fast_config(4, 10)).await;
    clock.start(4).await.unwrap();

    wait_for_status(&clock, ClockStatus::Stopped).await;

    let mut received = 0;
    while timeout(Duration::from_millis(50), rx.recv())
        .await
        .ok()
        .and_then(|r| r.ok())
        .is_some()
    {
        received += 1;
    }
    assert_eq!(received, 8, "全部合成 Tick 必须恰好各发布一次");
    assert_eq!(account.read().await.equity_curve().len(), 8);

    // 无持仓时权益曲线恒等于初始现金
    assert!(account
        .read()
        .await
        .equity_curve()
        .iter()
        .all(|p| p.equity == dec!(100000)));
}
