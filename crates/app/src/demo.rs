use async_trait::async_trait;
use chrono::Utc;
use fupan_core::common::TimeFrame;
use fupan_core::market::entity::Candle;
use fupan_core::market::error::MarketError;
use fupan_core::market::port::CandleSource;

/// # Summary
/// 内置演示数据源：确定性地合成一段带趋势与波动的 K 线序列，
/// 让应用在没有任何外部行情接入时也能完整跑通回放流程。
pub struct DemoCandleSource {
    base_price: f64,
}

impl DemoCandleSource {
    pub fn new(base_price: f64) -> Self {
        Self { base_price }
    }
}

#[async_trait]
impl CandleSource for DemoCandleSource {
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: TimeFrame,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketError> {
        if limit == 0 {
            return Err(MarketError::NoData(symbol.to_string()));
        }

        let span = timeframe.duration();
        let start = Utc::now() - span * (limit as i32);
        let mut candles = Vec::with_capacity(limit);
        let mut open = self.base_price;

        for i in 0..limit {
            // 慢速正弦趋势叠加快速波动，形状稳定可复现
            let phase = i as f64;
            let drift = (phase / 20.0).sin() * self.base_price * 0.01;
            let wiggle = (phase * 0.9).sin() * self.base_price * 0.005;
            let close = (open + drift + wiggle).max(0.01);
            let high = open.max(close) * 1.004;
            let low = open.min(close) * 0.996;

            candles.push(Candle {
                time: start + span * (i as i32),
                open,
                high,
                low,
                close,
                volume: 10_000.0 + (phase * 1.3).cos().abs() * 5_000.0,
            });
            open = close;
        }
        Ok(candles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn generated_candles_are_well_formed() {
        let source = DemoCandleSource::new(100.0);
        let candles = source
            .fetch_candles("DEMO", TimeFrame::Minute1, 50)
            .await
            .unwrap();

        assert_eq!(candles.len(), 50);
        for pair in candles.windows(2) {
            // 相邻 K 线收开衔接且时间递增
            assert_eq!(pair[0].close, pair[1].open);
            assert!(pair[0].time < pair[1].time);
        }
        assert!(candles.iter().all(Candle::is_valid));
    }

    #[tokio::test]
    async fn zero_limit_reports_no_data() {
        let source = DemoCandleSource::new(100.0);
        let result = source.fetch_candles("DEMO", TimeFrame::Minute1, 0).await;
        assert!(matches!(result, Err(MarketError::NoData(_))));
    }
}
