use fupan_core::trade::entity::StatisticsSnapshot;
use rust_decimal::Decimal;

/// # Summary
/// 账户绩效的增量统计器。
/// 逐点消费权益曲线采样与平仓流水，维护运行中的峰值 / 谷底，
/// 使最大回撤与最大涨幅的计算保持 O(1) 每采样，而非全量 O(n^2) 重扫。
///
/// # Invariants
/// - 峰值 / 谷底以初始现金为第一个采样点。
/// - 比率类指标分母为零时一律定义为零，绝不产生 NaN。
/// - 胜负只统计平仓交易，盈亏恰好为零的平仓计入总数但不计胜负。
pub struct StatsTracker {
    initial_cash: Decimal,
    latest_equity: Decimal,
    // 截至当前的权益最高点 (回撤的分母)
    peak_equity: Decimal,
    // 截至当前的权益最低点 (涨幅的分母)
    trough_equity: Decimal,
    max_drawdown: Decimal,
    max_gain: Decimal,
    total_trades: u64,
    winning_trades: u64,
    losing_trades: u64,
}

impl StatsTracker {
    pub fn new(initial_cash: Decimal) -> Self {
        Self {
            initial_cash,
            latest_equity: initial_cash,
            peak_equity: initial_cash,
            trough_equity: initial_cash,
            max_drawdown: Decimal::ZERO,
            max_gain: Decimal::ZERO,
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
        }
    }

    /// # Summary
    /// 接收一个新的权益采样点。
    ///
    /// # Logic
    /// 1. 以历史峰值为基准计算本点回撤，刷新最大回撤。
    /// 2. 以历史谷底为基准计算本点涨幅，刷新最大涨幅。
    /// 3. 再用本点更新峰值 / 谷底 (顺序保证 i < j 的配对语义)。
    pub fn on_equity(&mut self, equity: Decimal) {
        self.latest_equity = equity;

        if self.peak_equity > Decimal::ZERO {
            let drawdown = (self.peak_equity - equity) / self.peak_equity;
            if drawdown > self.max_drawdown {
                self.max_drawdown = drawdown;
            }
        }
        if self.trough_equity > Decimal::ZERO {
            let gain = (equity - self.trough_equity) / self.trough_equity;
            if gain > self.max_gain {
                self.max_gain = gain;
            }
        }

        if equity > self.peak_equity {
            self.peak_equity = equity;
        }
        if equity < self.trough_equity {
            self.trough_equity = equity;
        }
    }

    /// # Summary
    /// 接收一笔平仓交易的扣费后盈亏。开仓交易不得调用此方法。
    pub fn on_closure(&mut self, realized_pnl: Decimal) {
        self.total_trades += 1;
        if realized_pnl > Decimal::ZERO {
            self.winning_trades += 1;
        } else if realized_pnl < Decimal::ZERO {
            self.losing_trades += 1;
        }
    }

    /// # Summary
    /// 产出当前时点的统计快照。
    ///
    /// # Logic
    /// 总收益率与胜率在分母为零时 (零初始资金 / 零平仓) 定义为零。
    pub fn snapshot(&self) -> StatisticsSnapshot {
        let total_profit = self.latest_equity - self.initial_cash;
        let total_return_rate = if self.initial_cash.is_zero() {
            Decimal::ZERO
        } else {
            total_profit / self.initial_cash
        };
        let win_rate = if self.total_trades == 0 {
            Decimal::ZERO
        } else {
            Decimal::from(self.winning_trades) / Decimal::from(self.total_trades)
        };

        StatisticsSnapshot {
            total_profit,
            total_return_rate,
            max_drawdown: self.max_drawdown,
            max_gain: self.max_gain,
            total_trades: self.total_trades,
            winning_trades: self.winning_trades,
            losing_trades: self.losing_trades,
            win_rate,
        }
    }
}
