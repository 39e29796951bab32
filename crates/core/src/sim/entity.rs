use crate::trade::entity::{EquityPoint, Position, StatisticsSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// # Summary
/// 单个合成 Tick，表示 K 线回放过程中的一次价格采样。
/// 由生成器产出，被时钟消费一次后即丢弃，不做任何持久化。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// 合成价格
    pub price: f64,
    /// 在所属 K 线内的序号 (0 对应开盘价，N-1 对应收盘价)
    pub seq: usize,
}

/// # Summary
/// 模拟时钟的生命周期状态。
///
/// # Invariants
/// - 合法迁移: Idle -> Running <-> Paused -> Stopped。
/// - Stopped / Faulted 为终态，时钟不可复用，需重建会话。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockStatus {
    /// 尚未启动
    Idle,
    /// 正在按固定间隔推进 Tick
    Running,
    /// 暂停中 (唤醒仍发生但不推进、不发布)
    Paused,
    /// 已正常停止 (用户主动停止或历史数据播完)
    Stopped,
    /// 异常终止 (例如启动时拉不到任何历史数据)
    Faulted,
}

/// # Summary
/// 每个 Tick / 每笔成交后推送给渲染层的增量行情与账户状态。
/// 通过广播通道分发，发送端永不阻塞，慢速订阅者自行丢帧。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketUpdate {
    /// 标的代码
    pub symbol: String,
    /// 当前最新合成价
    pub price: f64,
    /// Tick 在所属 K 线内的序号。由成交触发的推送没有对应 Tick，为 None。
    pub seq: Option<usize>,
    /// 本次更新对应的模拟时间
    pub time: DateTime<Utc>,
    /// 新追加的权益曲线采样点
    pub equity: EquityPoint,
    /// 重算后的绩效统计
    pub statistics: StatisticsSnapshot,
    /// 当前未归零的持仓
    pub positions: Vec<Position>,
}
