use fupan_core::market::entity::Candle;
use fupan_core::sim::entity::Tick;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

/// # Summary
/// 合成 Tick 生成器：把单根 OHLC K 线展开为一段貌似真实的盘中价格路径。
/// 随机源为自持的 `StdRng`，指定种子后整个回放序列可逐 Tick 复现。
///
/// # Invariants
/// - `tick[0] == open`，`tick[N-1] == close`。
/// - 最高价与最低价各出现在一个内部下标上，先后顺序由公平硬币决定。
/// - 全部输出价格落在 `[min(o,h,l,c), max(o,h,l,c)]` 区间内
///   (锚点间严格线性插值，无需额外钳制)。
/// - 每根 K 线恰好消耗三次随机抽取：两个下标 + 一次硬币。
pub struct TickGenerator {
    rng: StdRng,
    ticks_per_candle: usize,
}

impl TickGenerator {
    pub fn new(ticks_per_candle: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            ticks_per_candle,
        }
    }

    /// # Summary
    /// 展开一根 K 线。
    ///
    /// # Logic
    /// 1. 下标 0 锚定开盘价，N-1 锚定收盘价。
    /// 2. 在 `[1, N-3]` 均匀抽取 i1，在 `[i1+1, N-2]` 均匀抽取 i2，
    ///    保证两个极值点互异且两侧都留有插值空间。
    /// 3. 公平硬币决定最高价落在 i1 还是 i2，避免"先冲高后探底"的系统性偏差。
    /// 4. 三段锚点之间线性插值 (横盘 K 线步长为零，不产生除零)。
    /// 5. 退化输入 (N < 4 或四价违反约束) 降级为开盘到收盘的直线，不报错。
    pub fn generate(&mut self, candle: &Candle) -> Vec<Tick> {
        let n = self.ticks_per_candle;
        if n == 0 {
            return Vec::new();
        }

        if !candle.is_valid() {
            warn!(
                "Invalid candle at {} (o={} h={} l={} c={}), degrading to linear path",
                candle.time, candle.open, candle.high, candle.low, candle.close
            );
            return linear_path(candle.open, candle.close, n);
        }
        if n < 4 {
            // 内部放不下两个互异极值点
            return linear_path(candle.open, candle.close, n);
        }

        let i1 = self.rng.gen_range(1..=n - 3);
        let i2 = self.rng.gen_range(i1 + 1..=n - 2);
        let (p1, p2) = if self.rng.gen_bool(0.5) {
            (candle.high, candle.low)
        } else {
            (candle.low, candle.high)
        };

        let mut prices = vec![0.0_f64; n];
        prices[0] = candle.open;
        prices[i1] = p1;
        prices[i2] = p2;
        prices[n - 1] = candle.close;
        fill_segment(&mut prices, 0, i1);
        fill_segment(&mut prices, i1, i2);
        fill_segment(&mut prices, i2, n - 1);

        prices
            .into_iter()
            .enumerate()
            .map(|(seq, price)| Tick { price, seq })
            .collect()
    }
}

/// 开盘到收盘的直线路径，退化 K 线与过小 N 的统一降级出口
fn linear_path(open: f64, close: f64, n: usize) -> Vec<Tick> {
    if n == 1 {
        // 仅有一个采样点时取收盘价，保证 K 线结束时刻价格正确
        return vec![Tick {
            price: close,
            seq: 0,
        }];
    }
    let step = (close - open) / ((n - 1) as f64);
    (0..n)
        .map(|seq| Tick {
            price: open + step * (seq as f64),
            seq,
        })
        .collect()
}

/// 在两个已定价的锚点 (a, b) 之间线性填充开区间内的价格
fn fill_segment(prices: &mut [f64], a: usize, b: usize) {
    let span = b - a;
    if span <= 1 {
        return;
    }
    let step = (prices[b] - prices[a]) / (span as f64);
    for k in 1..span {
        prices[a + k] = prices[a] + step * (k as f64);
    }
}
