use chrono::{DateTime, Utc};
use fupan_core::trade::entity::{AccountId, Position, Side};
use rust_decimal::Decimal;

/// # Summary
/// 单笔成交对持仓产生的结算结果。
#[derive(Debug, Clone, Copy)]
pub struct FillOutcome {
    /// 本笔锁定的已实现盈亏 (不含手续费)
    pub realized_pnl: Decimal,
    /// 本笔中被平掉的数量 (零表示纯开仓)
    pub closed_volume: Decimal,
}

/// # Summary
/// 单个标的的持仓台账。持有该标的的数量、加权均价与两类盈亏，
/// 只接受两条修改路径：成交落账 (`apply_trade`) 与盯市重估 (`mark_to_market`)。
///
/// # Invariants
/// - `volume` 带符号：正数多头，负数空头。
/// - 同向加仓只改均价与数量，绝不产生已实现盈亏。
/// - 反向减仓只减数量、实现盈亏，均价对剩余部分保持不变。
/// - 数量归零后均价清零，记录本身保留。
pub struct PositionLedger {
    position: Position,
}

impl PositionLedger {
    pub fn new(account_id: AccountId, symbol: String, now: DateTime<Utc>) -> Self {
        Self {
            position: Position::empty(account_id, symbol, now),
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    /// 当前多头数量 (空头或空仓时为零)，用于卖空开关的额度校验
    pub fn long_volume(&self) -> Decimal {
        self.position.volume.max(Decimal::ZERO)
    }

    /// 按给定行情价计算带符号持仓市值
    pub fn market_value(&self, price: Decimal) -> Decimal {
        self.position.volume * price
    }

    /// # Summary
    /// 成交落账。
    ///
    /// # Logic
    /// 1. 同向 (或空仓起步)：数量相加，均价按数量加权平均，已实现盈亏为零。
    /// 2. 反向且不超过现有数量：按 `(成交价 - 均价) × 平仓量` 实现盈亏
    ///    (空头符号自动反转)，均价不动，数量递减；归零后均价清零。
    /// 3. 反向且超过现有数量 (反手)：拆为"全平 + 以成交价开反向仓"，
    ///    先对原有全部数量实现盈亏，剩余数量以成交价作为新均价。
    ///
    /// # Returns
    /// 返回本笔的结算结果 (已实现盈亏与被平数量)。
    pub fn apply_trade(
        &mut self,
        side: Side,
        volume: Decimal,
        price: Decimal,
        now: DateTime<Utc>,
    ) -> FillOutcome {
        let delta = match side {
            Side::Buy => volume,
            Side::Sell => -volume,
        };
        let pos = &mut self.position;

        let same_direction = pos.volume.is_zero()
            || (pos.volume > Decimal::ZERO) == (delta > Decimal::ZERO);

        let outcome = if same_direction {
            // 开仓或加仓：数量加权平均成本
            let old_cost = pos.volume.abs() * pos.average_price;
            let added_cost = volume * price;
            pos.volume += delta;
            if !pos.volume.is_zero() {
                pos.average_price = (old_cost + added_cost) / pos.volume.abs();
            }
            FillOutcome {
                realized_pnl: Decimal::ZERO,
                closed_volume: Decimal::ZERO,
            }
        } else {
            // 平仓方向：先实现能平掉部分的盈亏
            let closed = volume.min(pos.volume.abs());
            let direction = if pos.volume > Decimal::ZERO {
                Decimal::ONE
            } else {
                -Decimal::ONE
            };
            let realized = (price - pos.average_price) * closed * direction;
            pos.realized_pnl += realized;
            pos.volume += delta;

            if pos.volume.is_zero() {
                pos.average_price = Decimal::ZERO;
            } else if (pos.volume > Decimal::ZERO) == (delta > Decimal::ZERO) {
                // 反手：剩余数量属于新方向，以成交价为新均价
                pos.average_price = price;
            }
            FillOutcome {
                realized_pnl: realized,
                closed_volume: closed,
            }
        };

        // 成交价即最新价，顺带刷新未实现盈亏
        pos.unrealized_pnl = (price - pos.average_price) * pos.volume;
        pos.updated_at = now;
        outcome
    }

    /// # Summary
    /// 盯市重估：以最新行情价刷新未实现盈亏。
    ///
    /// # Logic
    /// `unrealized = (最新价 - 均价) × 带符号数量`，空头符号由负数量自动反转。
    /// 不触碰现金与已实现盈亏。
    pub fn mark_to_market(&mut self, price: Decimal, now: DateTime<Utc>) -> Decimal {
        let pos = &mut self.position;
        pos.unrealized_pnl = (price - pos.average_price) * pos.volume;
        pos.updated_at = now;
        pos.unrealized_pnl
    }
}
