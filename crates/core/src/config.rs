use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// # Summary
/// 回放模拟的全局配置。
/// 一次模拟会话从创建到销毁共享同一份配置，运行期间不可变
/// (速度倍率是唯一的运行时可调参数，由时钟单独持有)。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// 虚拟账户的初始现金
    pub initial_cash: Decimal,
    /// 单根 K 线展开的合成 Tick 数量
    pub ticks_per_candle: usize,
    /// 时钟唤醒的固定真实时间间隔 (毫秒)。速度倍率不改变此值。
    pub tick_period_ms: u64,
    /// 双边手续费率 (成交额 * 费率)
    pub fee_rate: Decimal,
    /// 是否允许卖空开仓 (关闭时卖出数量不得超过现有多头持仓)
    pub allow_short: bool,
    /// 合成 Tick 随机源种子。指定后整个回放序列可复现。
    pub seed: Option<u64>,
    /// 行情推送广播通道的容量。慢速订阅者超过此积压量后丢帧。
    pub update_channel_capacity: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            initial_cash: Decimal::new(100_000, 0),
            ticks_per_candle: 60,
            tick_period_ms: 1000,
            // 万一佣金，双边收取，与撮合侧的默认值保持一致
            fee_rate: Decimal::new(1, 4),
            allow_short: false,
            seed: None,
            update_channel_capacity: 128,
        }
    }
}
