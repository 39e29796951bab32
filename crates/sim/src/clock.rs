use crate::generator::TickGenerator;
use chrono::{DateTime, Utc};
use fupan_core::common::TimeFrame;
use fupan_core::config::SimConfig;
use fupan_core::market::entity::Candle;
use fupan_core::market::error::MarketError;
use fupan_core::market::port::CandleSource;
use fupan_core::sim::entity::{ClockStatus, MarketUpdate, Tick};
use fupan_core::sim::error::SimError;
use fupan_core::trade::entity::EquityPoint;
use fupan_trade::account::PortfolioAccount;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, RwLock as StdRwLock};
use tokio::sync::{RwLock, broadcast};
use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// # Summary
/// 模拟时钟：以固定真实时间间隔驱动回放推进的唯一引擎。
/// 每次唤醒推进 `speed` 个合成 Tick，每个 Tick 依次完成
/// 盯市 -> 权益采样 -> 统计重算 -> 广播推送。
///
/// # Invariants
/// - 状态机: Idle -> Running <-> Paused -> Stopped (Faulted 为异常终态)。
/// - 推进逻辑全部在单个 tokio 协程内执行，唤醒之间绝不交错
///   (错过的唤醒按 Skip 策略丢弃，不补发)。
/// - 速度倍率只改变每次唤醒推进的 Tick 数，不改变唤醒频率。
/// - `stop` 是唯一的取消点且幂等：对已停止时钟再次 stop 为无害空操作。
pub struct SimulationClock {
    symbol: String,
    timeframe: TimeFrame,
    // 启动时一次性预拉取的历史 K 线数量上限
    history_limit: usize,
    config: SimConfig,
    source: Arc<dyn CandleSource>,
    account: Arc<RwLock<PortfolioAccount>>,
    updates: broadcast::Sender<MarketUpdate>,
    status: StdRwLock<ClockStatus>,
    speed: AtomicU32,
    abort: Mutex<Option<AbortHandle>>,
}

impl SimulationClock {
    pub fn new(
        symbol: String,
        timeframe: TimeFrame,
        history_limit: usize,
        config: SimConfig,
        source: Arc<dyn CandleSource>,
        account: Arc<RwLock<PortfolioAccount>>,
        updates: broadcast::Sender<MarketUpdate>,
    ) -> Self {
        Self {
            symbol,
            timeframe,
            history_limit,
            config,
            source,
            account,
            updates,
            status: StdRwLock::new(ClockStatus::Idle),
            speed: AtomicU32::new(1),
            abort: Mutex::new(None),
        }
    }

    pub fn status(&self) -> ClockStatus {
        *self.status.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set_status(&self, status: ClockStatus) {
        *self.status.write().unwrap_or_else(|e| e.into_inner()) = status;
    }

    /// 订阅行情推送。发送端永不阻塞，慢速订阅者超出积压后丢帧。
    pub fn subscribe(&self) -> broadcast::Receiver<MarketUpdate> {
        self.updates.subscribe()
    }

    /// # Summary
    /// 启动时钟。
    ///
    /// # Logic
    /// 1. 在同一个持锁临界区内校验 Idle 并迁移到 Running，抢占启动权。
    ///    并发 start 之间只有一个能完成迁移，其余报 `AlreadyRunning`，
    ///    账户上永远只会挂一个推进协程。
    /// 2. 通过数据端口一次性预拉取全部回放历史；拉取失败或为空时
    ///    迁移到 Faulted 终态并立即报错，绝不空转重试。
    /// 3. 历史中违反四价约束的 K 线仅告警，展开时降级为直线路径。
    /// 4. 派生推进协程，记录 AbortHandle 供 stop 取消。
    ///
    /// # Arguments
    /// * `speed`: 每次唤醒推进的 Tick 数，必须为正。
    pub async fn start(self: &Arc<Self>, speed: u32) -> Result<(), SimError> {
        if speed == 0 {
            return Err(SimError::InvalidSpeed(speed));
        }
        {
            let mut status = self.status.write().unwrap_or_else(|e| e.into_inner());
            if *status != ClockStatus::Idle {
                return Err(SimError::AlreadyRunning);
            }
            // 在 await 之前占位，检查与迁移之间不允许第二个 start 插入
            *status = ClockStatus::Running;
        }

        let history = match self
            .source
            .fetch_candles(&self.symbol, self.timeframe, self.history_limit)
            .await
        {
            Ok(history) if !history.is_empty() => history,
            Ok(_) => {
                error!("No historical candles for {}, clock faulted", self.symbol);
                self.set_status(ClockStatus::Faulted);
                return Err(SimError::Market(MarketError::NoData(self.symbol.clone())));
            }
            Err(e) => {
                error!("History fetch failed for {}: {}", self.symbol, e);
                self.set_status(ClockStatus::Faulted);
                return Err(SimError::Market(e));
            }
        };

        for candle in history.iter().filter(|c| !c.is_valid()) {
            warn!(
                "{}",
                MarketError::InvalidCandle {
                    time: candle.time,
                    open: candle.open,
                    high: candle.high,
                    low: candle.low,
                    close: candle.close,
                }
            );
        }

        self.speed.store(speed, Ordering::Relaxed);
        info!(
            "Simulation clock started for {} ({} candles, speed x{})",
            self.symbol,
            history.len(),
            speed
        );

        let clock = Arc::clone(self);
        let handle = tokio::spawn(clock.run(history));
        let mut guard = self.abort.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(handle.abort_handle());
        Ok(())
    }

    /// 暂停推进。唤醒仍按节拍发生，但既不弹出 Tick 也不发布任何状态。
    pub fn pause(&self) -> Result<(), SimError> {
        let mut status = self.status.write().unwrap_or_else(|e| e.into_inner());
        if *status != ClockStatus::Running {
            return Err(SimError::NotRunning);
        }
        *status = ClockStatus::Paused;
        Ok(())
    }

    /// 从暂停恢复推进。
    pub fn resume(&self) -> Result<(), SimError> {
        let mut status = self.status.write().unwrap_or_else(|e| e.into_inner());
        if *status != ClockStatus::Paused {
            return Err(SimError::NotRunning);
        }
        *status = ClockStatus::Running;
        Ok(())
    }

    /// 运行期调速。零倍速非法。
    pub fn set_speed(&self, speed: u32) -> Result<(), SimError> {
        if speed == 0 {
            return Err(SimError::InvalidSpeed(speed));
        }
        self.speed.store(speed, Ordering::Relaxed);
        Ok(())
    }

    /// # Summary
    /// 停止时钟，取消推进协程。此后不再有任何 Tick 被发布或落账。
    /// 幂等：重复调用为无害空操作；对从未启动的时钟调用保持 Idle，
    /// 之后仍可正常 start。
    pub fn stop(&self) {
        {
            let mut status = self.status.write().unwrap_or_else(|e| e.into_inner());
            // Idle 时钟没有可取消的协程；Faulted 终态保留原因，不被 stop 覆盖
            if *status != ClockStatus::Idle && *status != ClockStatus::Faulted {
                *status = ClockStatus::Stopped;
            }
        }
        let handle = {
            let mut guard = self.abort.lock().unwrap_or_else(|e| e.into_inner());
            guard.take()
        };
        if let Some(handle) = handle {
            handle.abort();
            info!("Simulation clock stopped for {}", self.symbol);
        }
    }

    /// # Summary
    /// 推进协程主循环。时钟生命周期内对账户的盯市写入只发生在这里。
    ///
    /// # Logic
    /// 1. 按固定周期等待唤醒；错过的节拍丢弃 (Skip)，保证不交错。
    /// 2. Paused 时空转；终态时退出。
    /// 3. 每次唤醒推进 `speed` 个 Tick；当前 K 线耗尽则弹出下一根重新生成，
    ///    历史耗尽则迁移 Stopped 并退出。
    async fn run(self: Arc<Self>, history: Vec<Candle>) {
        let mut queue: VecDeque<Candle> = history.into();
        let mut generator = TickGenerator::new(self.config.ticks_per_candle, self.config.seed);
        let mut pending: VecDeque<Tick> = VecDeque::new();
        let mut candle_time = Utc::now();

        let mut interval =
            tokio::time::interval(std::time::Duration::from_millis(self.config.tick_period_ms));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            match self.status() {
                ClockStatus::Running => {}
                ClockStatus::Paused => continue,
                _ => return,
            }

            let advance = self.speed.load(Ordering::Relaxed);
            for _ in 0..advance {
                let tick = match pending.pop_front() {
                    Some(tick) => tick,
                    None => match queue.pop_front() {
                        Some(candle) => {
                            candle_time = candle.time;
                            pending = generator.generate(&candle).into();
                            match pending.pop_front() {
                                Some(tick) => tick,
                                None => continue,
                            }
                        }
                        None => {
                            info!("Replay history exhausted for {}, clock stops", self.symbol);
                            self.set_status(ClockStatus::Stopped);
                            return;
                        }
                    },
                };
                self.publish(tick, candle_time).await;
            }
        }
    }

    /// # Summary
    /// 发布单个 Tick：盯市落账后广播增量状态。
    ///
    /// # Logic
    /// 1. f64 合成价换算为 Decimal，不可表示时跳过该 Tick 并告警。
    /// 2. 在账户写锁内完成盯市 (刷新浮盈 + 追加权益采样 + 统计重算)。
    /// 3. 锁外广播 MarketUpdate，渲染层永远无法阻塞推进。
    async fn publish(&self, tick: Tick, candle_time: DateTime<Utc>) {
        let Some(price) = Decimal::from_f64_retain(tick.price) else {
            warn!("Tick price {} not representable as Decimal, skipped", tick.price);
            return;
        };
        let time = candle_time + self.tick_offset(tick.seq);

        let mut account = self.account.write().await;
        account.mark_to_market(&self.symbol, price, time);
        let equity = account.last_equity_point().cloned().unwrap_or(EquityPoint {
            time,
            equity: account.equity(),
            cash: account.cash(),
        });
        let update = MarketUpdate {
            symbol: self.symbol.clone(),
            price: tick.price,
            seq: Some(tick.seq),
            time,
            equity,
            statistics: account.statistics(),
            positions: account.open_positions(),
        };
        drop(account);

        let _ = self.updates.send(update);
    }

    /// 把 K 线的真实时间跨度均匀分摊到 N 个 Tick 上
    fn tick_offset(&self, seq: usize) -> chrono::Duration {
        let total_ms = self.timeframe.duration().num_milliseconds();
        let n = self.config.ticks_per_candle.max(1) as i64;
        chrono::Duration::milliseconds(total_ms * (seq as i64) / n)
    }
}
