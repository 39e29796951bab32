use chrono::{TimeZone, Utc};
use fupan_core::common::TimeFrame;
use fupan_core::config::SimConfig;
use fupan_core::market::entity::Candle;
use fupan_core::market::mem::MemoryCandleSource;
use fupan_core::sim::entity::ClockStatus;
use fupan_core::trade::entity::Side;
use fupan_core::trade::port::TradeError;
use fupan_sim::session::{SessionError, SessionManager, SessionRequest};
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::time::{Duration, timeout};

fn candles(count: usize) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
    (0..count)
        .map(|i| Candle {
            time: start + chrono::Duration::minutes(i as i64),
            open: 50.0,
            high: 55.0,
            low: 48.0,
            close: 52.0,
            volume: 1000.0,
        })
        .collect()
}

async fn manager(config: SimConfig) -> Arc<SessionManager> {
    let source = Arc::new(MemoryCandleSource::new());
    source.seed("AAPL", candles(20)).await;
    source.seed("MSFT", candles(20)).await;
    SessionManager::new(source, config)
}

fn request(symbol: &str) -> SessionRequest {
    SessionRequest {
        symbol: symbol.to_string(),
        timeframe: TimeFrame::Minute1,
        history_limit: 20,
    }
}

fn fast_config() -> SimConfig {
    SimConfig {
        ticks_per_candle: 10,
        tick_period_ms: 10,
        seed: Some(42),
        ..SimConfig::default()
    }
}

#[tokio::test]
async fn test_session_lifecycle_with_trading() {
    let manager = manager(fast_config()).await;
    let session = manager.create_session(request("AAPL"));
    assert_eq!(manager.session_count(), 1);
    assert_eq!(session.status(), ClockStatus::Idle);

    let mut rx = session.subscribe();
    session.start(1).await.unwrap();

    // 等第一个 Tick 建立行情价后按市价买入
    let first = timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.seq, Some(0));

    let trade = session.submit_trade(Side::Buy, dec!(10)).await.unwrap();
    assert_eq!(trade.side, Side::Buy);
    assert_eq!(trade.volume, dec!(10));
    assert!(trade.price > dec!(0));

    // 成交后必须收到一帧 seq 为 None 的补发推送
    let mut saw_trade_frame = false;
    for _ in 0..20 {
        let update = timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        if update.seq.is_none() {
            assert_eq!(update.positions.len(), 1);
            assert_eq!(update.positions[0].volume, dec!(10));
            saw_trade_frame = true;
            break;
        }
    }
    assert!(saw_trade_frame, "成交后未收到补发帧");

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.trade_count, 1);
    assert!(snapshot.cash < dec!(100000));
    assert_eq!(snapshot.positions.len(), 1);

    let id = session.id().to_string();
    manager.remove(&id);
    assert_eq!(manager.session_count(), 0);
    assert_eq!(session.status(), ClockStatus::Stopped);
    assert!(matches!(
        manager.get(&id),
        Err(SessionError::SessionNotFound(_))
    ));
}

#[tokio::test]
async fn test_trade_before_any_tick_is_rejected() {
    let manager = manager(fast_config()).await;
    let session = manager.create_session(request("AAPL"));

    // 时钟未启动，尚无任何行情价可定价
    let result = session.submit_trade(Side::Buy, dec!(10)).await;
    assert!(matches!(result, Err(TradeError::PriceUnavailable(_))));

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.cash, dec!(100000));
    assert_eq!(snapshot.trade_count, 0);
}

#[tokio::test]
async fn test_sessions_are_fully_isolated() {
    let manager = manager(fast_config()).await;
    let first = manager.create_session(request("AAPL"));
    let second = manager.create_session(request("MSFT"));
    assert_eq!(manager.session_count(), 2);
    assert_ne!(first.id(), second.id());

    let mut rx = first.subscribe();
    first.start(1).await.unwrap();
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    first.submit_trade(Side::Buy, dec!(5)).await.unwrap();
    first.stop();

    // 另一个会话的账户不受影响
    let untouched = second.snapshot().await;
    assert_eq!(untouched.cash, dec!(100000));
    assert_eq!(untouched.trade_count, 0);
    assert_eq!(untouched.equity_samples, 0);
    assert_eq!(second.status(), ClockStatus::Idle);
}

#[tokio::test]
async fn test_lookup_by_id_returns_same_session() {
    let manager = manager(fast_config()).await;
    let session = manager.create_session(request("AAPL"));

    let found = manager.get(session.id()).unwrap();
    assert_eq!(found.id(), session.id());
    assert_eq!(found.symbol(), "AAPL");
}
