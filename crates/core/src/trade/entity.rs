use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// # Summary
/// 系统内的唯一账户标识，用于隔离不同回放会话的虚拟资金体系。
///
/// # Invariants
/// - AccountId 在整个系统中必须全局唯一。
/// - 一个回放会话独占一个账户，账户生命周期等于会话生命周期。
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct AccountId(pub String);

/// # Summary
/// 交易方向定义。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    /// 买入 (做多)
    Buy,
    /// 卖出 (做空)
    Sell,
}

/// # Summary
/// 单笔成交流水记录。由执行器在成交时追加，追加后不可变、不可删。
/// 用于精确回溯资金变动、手续费与平仓盈亏。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// 归属的逻辑系统账户
    pub account_id: AccountId,
    /// 交易标的
    pub symbol: String,
    /// 成交方向
    pub side: Side,
    /// 成交数量 (绝对值)
    pub volume: Decimal,
    /// 实际成交价格
    pub price: Decimal,
    /// 手续费 (双边收取)
    pub commission: Decimal,
    /// 本笔成交中被平掉的数量。大于零表示这是一笔 (部分) 平仓交易。
    pub closed_volume: Decimal,
    /// 本笔成交锁定的已实现盈亏 (已扣除本笔手续费)
    pub realized_pnl: Decimal,
    /// 成交时间
    pub timestamp: DateTime<Utc>,
}

impl Trade {
    /// 是否属于平仓交易 (胜率统计只计入平仓交易)
    pub fn is_closing(&self) -> bool {
        self.closed_volume > Decimal::ZERO
    }
}

/// # Summary
/// 指定标的的持仓记录。
///
/// # Invariants
/// - `volume` 为带符号数量，正数表示多头，负数表示空头。
/// - 数量归零后记录保留 (均价清零)，以便按标的回溯历史盈亏。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// 归属账户
    pub account_id: AccountId,
    /// 资产标的
    pub symbol: String,
    /// 当前持有数量 (正数表示多头，负数表示空头)
    pub volume: Decimal,
    /// 持仓均价 (用于计算盈亏)
    pub average_price: Decimal,
    /// 该标的累计已实现盈亏 (不含手续费)
    pub realized_pnl: Decimal,
    /// 按最新行情价计算的未实现盈亏
    pub unrealized_pnl: Decimal,
    /// 最后一次变动时间 (成交或盯市)
    pub updated_at: DateTime<Utc>,
}

impl Position {
    /// # Logic
    /// 初始化一个空持仓
    pub fn empty(account_id: AccountId, symbol: String, now: DateTime<Utc>) -> Self {
        Self {
            account_id,
            symbol,
            volume: Decimal::ZERO,
            average_price: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            updated_at: now,
        }
    }
}

/// # Summary
/// 权益曲线上的单个采样点。每个合成 Tick 和每笔成交各追加一点。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityPoint {
    /// 采样时间 (Tick 的模拟时间或成交时间)
    pub time: DateTime<Utc>,
    /// 总权益 = 现金 + 全部持仓按最新价的市值
    pub equity: Decimal,
    /// 当时的可用现金
    pub cash: Decimal,
}

/// # Summary
/// 账户绩效统计快照。由权益曲线与成交历史推导，随每个 Tick / 每笔成交重算。
///
/// # Invariants
/// - 所有比率类指标在分母为零时定义为零，绝不产生 NaN 或除零异常。
/// - `win_rate` 恒落在 [0, 1] 区间。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    /// 总盈亏 = 最新权益 - 初始现金
    pub total_profit: Decimal,
    /// 总收益率 = 总盈亏 / 初始现金
    pub total_return_rate: Decimal,
    /// 最大回撤比例 (历史峰值到其后谷底的最大跌幅)
    pub max_drawdown: Decimal,
    /// 最大涨幅比例 (历史谷底到其后峰值的最大涨幅)
    pub max_gain: Decimal,
    /// 平仓交易总笔数 (开仓不计)
    pub total_trades: u64,
    /// 盈利平仓笔数 (扣费后盈亏为正)
    pub winning_trades: u64,
    /// 亏损平仓笔数 (扣费后盈亏为负)
    pub losing_trades: u64,
    /// 胜率 = 盈利笔数 / 平仓总笔数
    pub win_rate: Decimal,
}

/// # Summary
/// 账户聚合根的对外只读快照。
/// 渲染层只消费此结构，绝不直接触碰账户内部可变状态。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub account_id: AccountId,
    /// 可用现金余额
    pub cash: Decimal,
    /// 会话创建时注入的初始现金
    pub initial_cash: Decimal,
    /// 按最新行情价估值的总权益
    pub equity: Decimal,
    /// 当前未归零的持仓列表
    pub positions: Vec<Position>,
    /// 累计成交笔数 (含开仓)
    pub trade_count: usize,
    /// 权益曲线采样点数量
    pub equity_samples: usize,
    /// 绩效统计
    pub statistics: StatisticsSnapshot,
}
