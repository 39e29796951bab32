use thiserror::Error;

/// # Summary
/// 市场数据域错误枚举，处理历史数据缺失与非法 K 线等问题。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug)]
pub enum MarketError {
    // 历史数据源已耗尽或返回空集
    #[error("No historical data available for {0}")]
    NoData(String),
    // K 线四价违反 low <= open/close <= high 约束
    #[error("Invalid candle at {time}: open={open} high={high} low={low} close={close}")]
    InvalidCandle {
        time: chrono::DateTime<chrono::Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },
    // 底层数据提供者错误 (网络、解析等)
    #[error("Provider error: {0}")]
    Provider(String),
}
