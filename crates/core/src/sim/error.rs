use crate::market::error::MarketError;
use thiserror::Error;

/// # Summary
/// 模拟时钟域错误枚举。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug)]
pub enum SimError {
    // 时钟已处于运行/暂停状态，不允许重复启动
    #[error("Simulation clock already running")]
    AlreadyRunning,
    // 对未运行的时钟执行了运行期操作
    #[error("Simulation clock is not running")]
    NotRunning,
    // 速度倍率必须为正整数
    #[error("Invalid speed multiplier: {0}")]
    InvalidSpeed(u32),
    // 历史数据拉取失败
    #[error(transparent)]
    Market(#[from] MarketError),
}
