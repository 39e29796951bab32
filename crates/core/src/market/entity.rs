use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// # Summary
/// 单根 K 线数据实体，记录特定时段内的行情波动。
/// 由外部历史数据协作方产出，读入后不可变。
///
/// # Invariants
/// - `low <= min(open, close) <= max(open, close) <= high`。
/// - `high == low` 视为退化的横盘 K 线，展开为平直段而非报错。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    // K 线开始时间
    pub time: DateTime<Utc>,
    // 开盘价
    pub open: f64,
    // 最高价
    pub high: f64,
    // 最低价
    pub low: f64,
    // 收盘价
    pub close: f64,
    // 成交量
    pub volume: f64,
}

impl Candle {
    /// # Summary
    /// 校验 OHLC 四价是否满足 K 线约束。
    ///
    /// # Logic
    /// 1. 四价必须均为有限数。
    /// 2. `high` 不低于开收两价，`low` 不高于开收两价。
    ///
    /// # Returns
    /// 满足约束返回 true。退化 (high == low) 的横盘 K 线视为合法。
    pub fn is_valid(&self) -> bool {
        let finite = self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite();
        finite
            && self.high >= self.open.max(self.close)
            && self.low <= self.open.min(self.close)
    }
}
