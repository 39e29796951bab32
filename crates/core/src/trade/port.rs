use thiserror::Error;

/// # Summary
/// 交易执行环节中可能发生的错误。
/// 所有拒绝均为"先校验后落账"：返回错误时账户状态保证未被部分修改。
#[derive(Error, Debug)]
pub enum TradeError {
    #[error("可用资金不足. 需要: {required}, 实际: {actual}")]
    InsufficientFunds {
        required: rust_decimal::Decimal,
        actual: rust_decimal::Decimal,
    },
    #[error("非法交易数量: {0}")]
    InvalidQuantity(rust_decimal::Decimal),
    #[error("卖空未启用，卖出数量不得超过现有多头持仓")]
    ShortSellingDisabled,
    #[error("标的尚无行情价，无法定价成交: {0}")]
    PriceUnavailable(String),
}
