use crate::common::TimeFrame;
use crate::market::entity::Candle;
use crate::market::error::MarketError;
use async_trait::async_trait;

/// # Summary
/// 历史 K 线数据源契约。回放核心对数据的来源 (REST、数据库、内存样本)
/// 完全无感知，只依赖此端口拉取升序排列的历史序列。
///
/// # Invariants
/// - 返回的 K 线必须按 `time` 升序排列。
/// - 允许返回空集，由调用方决定如何降级。
#[async_trait]
pub trait CandleSource: Send + Sync {
    /// # Summary
    /// 拉取指定标的在指定周期下的历史 K 线。
    ///
    /// # Arguments
    /// * `symbol`: 证券代码。
    /// * `timeframe`: K 线周期。
    /// * `limit`: 请求的数量上限。
    ///
    /// # Returns
    /// 成功返回升序 K 线列表，失败返回 MarketError。
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketError>;
}
