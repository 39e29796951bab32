use crate::position::PositionLedger;
use crate::stats::StatsTracker;
use chrono::{DateTime, Utc};
use fupan_core::trade::entity::{
    AccountId, AccountSnapshot, EquityPoint, Position, Side, StatisticsSnapshot, Trade,
};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// # Summary
/// 回放会话的虚拟账户聚合根：现金、全部持仓台账、成交历史、
/// 权益曲线与增量统计器的唯一所有者。
/// 外部通过 `Arc<tokio::sync::RwLock<PortfolioAccount>>` 共享，
/// 时钟盯市与交易执行串行在同一把写锁上，渲染层只拿快照。
///
/// # Invariants
/// - 成交历史与权益曲线只追加，从不修改或删除。
/// - 每个 Tick 和每笔成交各追加恰好一个权益采样点。
/// - 现金只经 `apply_fill` 变动。
pub struct PortfolioAccount {
    account_id: AccountId,
    initial_cash: Decimal,
    cash: Decimal,
    ledgers: HashMap<String, PositionLedger>,
    trades: Vec<Trade>,
    equity_curve: Vec<EquityPoint>,
    // 各标的最近一次发布的行情价，交易定价与市值估算共用
    last_prices: HashMap<String, Decimal>,
    stats: StatsTracker,
}

impl PortfolioAccount {
    pub fn new(account_id: AccountId, initial_cash: Decimal) -> Self {
        Self {
            account_id,
            initial_cash,
            cash: initial_cash,
            ledgers: HashMap::new(),
            trades: Vec::new(),
            equity_curve: Vec::new(),
            last_prices: HashMap::new(),
            stats: StatsTracker::new(initial_cash),
        }
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn initial_cash(&self) -> Decimal {
        self.initial_cash
    }

    pub fn last_price(&self, symbol: &str) -> Option<Decimal> {
        self.last_prices.get(symbol).copied()
    }

    /// 指定标的当前的多头数量 (无持仓视为零)
    pub fn long_volume(&self, symbol: &str) -> Decimal {
        self.ledgers
            .get(symbol)
            .map(|l| l.long_volume())
            .unwrap_or(Decimal::ZERO)
    }

    /// # Summary
    /// 按最新行情价估算总权益 = 现金 + 全部持仓的带符号市值。
    pub fn equity(&self) -> Decimal {
        let positions_value: Decimal = self
            .ledgers
            .iter()
            .map(|(symbol, ledger)| {
                let price = self
                    .last_prices
                    .get(symbol)
                    .copied()
                    .unwrap_or(ledger.position().average_price);
                ledger.market_value(price)
            })
            .sum();
        self.cash + positions_value
    }

    /// # Summary
    /// 盯市：接收一个新的行情价，刷新对应持仓的未实现盈亏，
    /// 并追加一个权益曲线采样点。
    ///
    /// # Logic
    /// 1. 记录该标的最新价。
    /// 2. 若有持仓台账则委托其 `mark_to_market`。
    /// 3. 追加权益采样并喂给统计器。
    pub fn mark_to_market(&mut self, symbol: &str, price: Decimal, time: DateTime<Utc>) {
        self.last_prices.insert(symbol.to_string(), price);
        if let Some(ledger) = self.ledgers.get_mut(symbol) {
            ledger.mark_to_market(price, time);
        }
        self.push_equity_sample(time);
    }

    /// # Summary
    /// 成交落账。调用前所有校验必须已经完成，本方法不再拒绝。
    ///
    /// # Logic
    /// 1. 现金划转：买入扣减 `数量×价格`，卖出入账 `数量×价格`，手续费恒为扣减。
    /// 2. 委托持仓台账结算数量 / 均价 / 已实现盈亏。
    /// 3. 追加不可变成交流水 (流水中的已实现盈亏已扣除本笔手续费)。
    /// 4. 平仓流水喂给统计器的胜负计数。
    /// 5. 追加一个权益采样点。
    pub fn apply_fill(
        &mut self,
        symbol: &str,
        side: Side,
        volume: Decimal,
        price: Decimal,
        commission: Decimal,
        now: DateTime<Utc>,
    ) -> Trade {
        let notional = price * volume;
        match side {
            Side::Buy => self.cash -= notional + commission,
            Side::Sell => self.cash += notional - commission,
        }

        let ledger = self
            .ledgers
            .entry(symbol.to_string())
            .or_insert_with(|| {
                PositionLedger::new(self.account_id.clone(), symbol.to_string(), now)
            });
        let outcome = ledger.apply_trade(side, volume, price, now);

        // 成交价同样是该标的的最新已知价
        self.last_prices.insert(symbol.to_string(), price);

        let trade = Trade {
            account_id: self.account_id.clone(),
            symbol: symbol.to_string(),
            side,
            volume,
            price,
            commission,
            closed_volume: outcome.closed_volume,
            realized_pnl: outcome.realized_pnl - commission,
            timestamp: now,
        };
        self.trades.push(trade.clone());

        if trade.is_closing() {
            self.stats.on_closure(trade.realized_pnl);
        }
        self.push_equity_sample(now);

        trade
    }

    fn push_equity_sample(&mut self, time: DateTime<Utc>) {
        let equity = self.equity();
        self.equity_curve.push(EquityPoint {
            time,
            equity,
            cash: self.cash,
        });
        self.stats.on_equity(equity);
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    pub fn last_equity_point(&self) -> Option<&EquityPoint> {
        self.equity_curve.last()
    }

    pub fn statistics(&self) -> StatisticsSnapshot {
        self.stats.snapshot()
    }

    /// 当前未归零的持仓 (渲染层只展示未平仓部分)，按标的排序保证稳定输出
    pub fn open_positions(&self) -> Vec<Position> {
        let mut positions: Vec<Position> = self
            .ledgers
            .values()
            .map(|l| l.position().clone())
            .filter(|p| !p.volume.is_zero())
            .collect();
        positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        positions
    }

    /// # Summary
    /// 获取对外透明的只读快照数据。
    pub fn to_snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            account_id: self.account_id.clone(),
            cash: self.cash,
            initial_cash: self.initial_cash,
            equity: self.equity(),
            positions: self.open_positions(),
            trade_count: self.trades.len(),
            equity_samples: self.equity_curve.len(),
            statistics: self.stats.snapshot(),
        }
    }
}
