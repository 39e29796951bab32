use crate::common::TimeFrame;
use crate::market::entity::Candle;
use crate::market::error::MarketError;
use crate::market::port::CandleSource;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// # Summary
/// 基于内存的历史 K 线源，服务于集成测试与本地演示。
/// 按 symbol 预置固定的 K 线序列，`fetch_candles` 时按请求上限截取。
pub struct MemoryCandleSource {
    series: RwLock<HashMap<String, Vec<Candle>>>,
}

impl MemoryCandleSource {
    pub fn new() -> Self {
        Self {
            series: RwLock::new(HashMap::new()),
        }
    }

    /// 预置某个标的的历史序列 (覆盖旧值)
    pub async fn seed(&self, symbol: &str, candles: Vec<Candle>) {
        self.series
            .write()
            .await
            .insert(symbol.to_string(), candles);
    }
}

impl Default for MemoryCandleSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CandleSource for MemoryCandleSource {
    async fn fetch_candles(
        &self,
        symbol: &str,
        _timeframe: TimeFrame,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketError> {
        let guard = self.series.read().await;
        match guard.get(symbol) {
            Some(candles) => Ok(candles.iter().take(limit).cloned().collect()),
            None => Err(MarketError::NoData(symbol.to_string())),
        }
    }
}
