use crate::clock::SimulationClock;
use dashmap::DashMap;
use fupan_core::common::TimeFrame;
use fupan_core::config::SimConfig;
use fupan_core::market::port::CandleSource;
use fupan_core::sim::entity::{ClockStatus, MarketUpdate};
use fupan_core::sim::error::SimError;
use fupan_core::trade::entity::{AccountId, AccountSnapshot, EquityPoint, Side, Trade};
use fupan_core::trade::port::TradeError;
use fupan_trade::account::PortfolioAccount;
use fupan_trade::executor::TradeExecutor;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{RwLock, broadcast};
use tracing::info;
use uuid::Uuid;

/// # Summary
/// 会话管理层的统一错误类型。
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),
    #[error(transparent)]
    Sim(#[from] SimError),
    #[error(transparent)]
    Trade(#[from] TradeError),
}

/// # Summary
/// 回放会话创建请求。
pub struct SessionRequest {
    /// 目标证券代码
    pub symbol: String,
    /// K 线时间周期
    pub timeframe: TimeFrame,
    /// 本次回放拉取的历史 K 线数量上限
    pub history_limit: usize,
}

/// # Summary
/// 一次回放会话：独占一个虚拟账户，并把时钟、执行器与广播通道
/// 捆绑在同一标的上。账户生命周期等于会话生命周期。
///
/// # Invariants
/// - 时钟盯市与用户交易串行在同一把账户写锁上 (单写者纪律)。
/// - 每笔成交后立即补发一帧 MarketUpdate，渲染层无需等待下一个 Tick。
pub struct ReplaySession {
    id: String,
    symbol: String,
    account: Arc<RwLock<PortfolioAccount>>,
    clock: Arc<SimulationClock>,
    executor: TradeExecutor,
    updates: broadcast::Sender<MarketUpdate>,
}

impl ReplaySession {
    fn create(
        id: String,
        req: SessionRequest,
        config: SimConfig,
        source: Arc<dyn CandleSource>,
    ) -> Arc<Self> {
        let account = Arc::new(RwLock::new(PortfolioAccount::new(
            AccountId(format!("sim_{}", id)),
            config.initial_cash,
        )));
        let (updates, _) = broadcast::channel(config.update_channel_capacity);
        let clock = Arc::new(SimulationClock::new(
            req.symbol.clone(),
            req.timeframe,
            req.history_limit,
            config.clone(),
            source,
            account.clone(),
            updates.clone(),
        ));
        let executor = TradeExecutor::new(account.clone(), &config);

        Arc::new(Self {
            id,
            symbol: req.symbol,
            account,
            clock,
            executor,
            updates,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn status(&self) -> ClockStatus {
        self.clock.status()
    }

    /// 订阅本会话的行情与账户增量推送
    pub fn subscribe(&self) -> broadcast::Receiver<MarketUpdate> {
        self.clock.subscribe()
    }

    pub async fn start(&self, speed: u32) -> Result<(), SimError> {
        self.clock.start(speed).await
    }

    pub fn pause(&self) -> Result<(), SimError> {
        self.clock.pause()
    }

    pub fn resume(&self) -> Result<(), SimError> {
        self.clock.resume()
    }

    pub fn set_speed(&self, speed: u32) -> Result<(), SimError> {
        self.clock.set_speed(speed)
    }

    pub fn stop(&self) {
        self.clock.stop();
    }

    /// # Summary
    /// 提交一笔按当前 Tick 价成交的市价买卖意图。
    ///
    /// # Logic
    /// 1. 委托执行器校验并落账 (拒绝时账户零改动)。
    /// 2. 成交后以账户最新状态补发一帧推送 (seq 为 None 标记非 Tick 帧)。
    pub async fn submit_trade(&self, side: Side, volume: Decimal) -> Result<Trade, TradeError> {
        let trade = self.executor.execute(&self.symbol, side, volume).await?;

        let account = self.account.read().await;
        let equity = account.last_equity_point().cloned().unwrap_or(EquityPoint {
            time: trade.timestamp,
            equity: account.equity(),
            cash: account.cash(),
        });
        let update = MarketUpdate {
            symbol: self.symbol.clone(),
            price: trade.price.to_f64().unwrap_or_default(),
            seq: None,
            time: trade.timestamp,
            equity,
            statistics: account.statistics(),
            positions: account.open_positions(),
        };
        drop(account);
        let _ = self.updates.send(update);

        Ok(trade)
    }

    /// 账户只读快照，渲染层的拉取入口
    pub async fn snapshot(&self) -> AccountSnapshot {
        self.account.read().await.to_snapshot()
    }
}

/// # Summary
/// 回放会话管理器，系统的应用服务层门面 (Facade)。
/// 编译期仅依赖 `fupan-core` 中的数据源 Trait，具体实现由外部注入。
///
/// # Invariants
/// - 每个会话以 UUID 为键注册在 DashMap 中，互相完全隔离。
/// - 移除会话前必须先停掉其时钟，避免孤儿协程继续落账。
pub struct SessionManager {
    config: SimConfig,
    source: Arc<dyn CandleSource>,
    sessions: DashMap<String, Arc<ReplaySession>>,
}

impl SessionManager {
    pub fn new(source: Arc<dyn CandleSource>, config: SimConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            source,
            sessions: DashMap::new(),
        })
    }

    /// # Summary
    /// 创建一个新的回放会话 (尚未启动时钟)。
    pub fn create_session(&self, req: SessionRequest) -> Arc<ReplaySession> {
        let id = Uuid::new_v4().to_string();
        let session = ReplaySession::create(
            id.clone(),
            req,
            self.config.clone(),
            self.source.clone(),
        );
        info!("Replay session {} created for {}", id, session.symbol());
        self.sessions.insert(id, session.clone());
        session
    }

    pub fn get(&self, id: &str) -> Result<Arc<ReplaySession>, SessionError> {
        self.sessions
            .get(id)
            .map(|kv| kv.value().clone())
            .ok_or_else(|| SessionError::SessionNotFound(id.to_string()))
    }

    /// 停止并移除会话。对不存在的会话为无害空操作。
    pub fn remove(&self, id: &str) {
        if let Some((_, session)) = self.sessions.remove(id) {
            session.stop();
            info!("Replay session {} removed", id);
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
