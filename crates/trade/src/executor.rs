use crate::account::PortfolioAccount;
use chrono::Utc;
use fupan_core::config::SimConfig;
use fupan_core::trade::entity::{Side, Trade};
use fupan_core::trade::port::TradeError;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// # Summary
/// 交易执行器：把用户的买卖意图校验后原子地落到账户上。
/// 与时钟盯市共享同一把账户写锁，二者天然串行，互不交错。
///
/// # Invariants
/// - 先校验后落账：任何拒绝路径都不会部分修改账户状态。
/// - 执行器对回撤 / 胜率等统计公式零感知，统计由账户内的聚合器独立维护。
pub struct TradeExecutor {
    account: Arc<RwLock<PortfolioAccount>>,
    // 双边手续费率
    fee_rate: Decimal,
    // 卖空开关：关闭时卖出数量不得超过现有多头
    allow_short: bool,
}

impl TradeExecutor {
    pub fn new(account: Arc<RwLock<PortfolioAccount>>, config: &SimConfig) -> Self {
        Self {
            account,
            fee_rate: config.fee_rate,
            allow_short: config.allow_short,
        }
    }

    /// # Summary
    /// 按当前 Tick 价执行一笔市价买卖。
    ///
    /// # Logic
    /// 1. 数量必须为正。
    /// 2. 以账户记录的该标的最新发布价为成交价，无价则拒绝。
    /// 3. 手续费 = 成交额 × 费率。
    /// 4. 买入校验现金覆盖 `成交额 + 手续费`；卖空关闭时校验卖出量不超过多头持仓。
    /// 5. 校验通过后在同一把写锁内完成现金划转、持仓结算、流水追加与权益采样。
    ///
    /// # Returns
    /// * `Ok(Trade)` - 本笔成交的不可变流水记录
    /// * `Err(TradeError)` - 校验拒绝，账户状态保证未被触碰
    pub async fn execute(
        &self,
        symbol: &str,
        side: Side,
        volume: Decimal,
    ) -> Result<Trade, TradeError> {
        if volume <= Decimal::ZERO {
            return Err(TradeError::InvalidQuantity(volume));
        }

        let mut account = self.account.write().await;

        let price = account
            .last_price(symbol)
            .ok_or_else(|| TradeError::PriceUnavailable(symbol.to_string()))?;

        let notional = price * volume;
        let commission = notional * self.fee_rate;

        match side {
            Side::Buy => {
                let required = notional + commission;
                if required > account.cash() {
                    return Err(TradeError::InsufficientFunds {
                        required,
                        actual: account.cash(),
                    });
                }
            }
            Side::Sell => {
                if !self.allow_short && volume > account.long_volume(symbol) {
                    return Err(TradeError::ShortSellingDisabled);
                }
            }
        }

        let trade = account.apply_fill(symbol, side, volume, price, commission, Utc::now());
        info!(
            "Trade executed: {:?} {} x {} @ {} (fee {})",
            side, symbol, volume, price, commission
        );

        Ok(trade)
    }
}
