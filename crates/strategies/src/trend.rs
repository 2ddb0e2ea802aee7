use crate::RunStrategy;
use crate::error::StrategyError;
use crate::lifecycle::{LifecycleEngine, VariantSpec};
use configuration::{ExecutionParams, RegimeParams};
use core_types::{Bar, RegimeLabel, Side, Trade};
use executor::CostModel;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;

/// The trend-following variant: trades pullbacks to the fast average in the
/// direction of the prevailing trend, inside runs of strong trend conviction.
pub struct TrendFollowing {
    engine: LifecycleEngine,
    trend_threshold: Decimal,
    pullback_tolerance: Decimal,
    use_atr_quantile: bool,
    atr_quantile_low: Decimal,
    atr_quantile_high: Decimal,
}

impl TrendFollowing {
    /// Creates a new `TrendFollowing` instance from injected parameters.
    pub fn new(
        exec: ExecutionParams,
        regime: &RegimeParams,
        costs: CostModel,
        risk_amount: Decimal,
        max_consecutive_losses: u32,
    ) -> Result<Self, StrategyError> {
        if regime.trend_threshold <= dec!(0) {
            return Err(StrategyError::InvalidParameters(
                "trend_threshold must be greater than 0".to_string(),
            ));
        }
        let pullback_tolerance = exec.pullback_tolerance;
        let engine = LifecycleEngine::new(
            exec,
            costs,
            risk_amount,
            max_consecutive_losses,
            regime.block_funding_minutes,
        )?;
        Ok(Self {
            engine,
            trend_threshold: regime.trend_threshold,
            pullback_tolerance,
            use_atr_quantile: regime.use_atr_quantile,
            atr_quantile_low: regime.atr_quantile_low,
            atr_quantile_high: regime.atr_quantile_high,
        })
    }

    /// Entry signal: strong trend, direction from the fast/slow average
    /// relation, and price pulled back to within a volatility-scaled
    /// distance of the fast average. Any missing feature suppresses the
    /// signal for this bar.
    fn entry_side(&self, bar: &Bar) -> Option<Side> {
        let trend_strength = bar.trend_strength?;
        let atr = bar.atr?;
        let fast = bar.fast_avg?;
        let slow = bar.slow_avg?;

        if trend_strength < self.trend_threshold {
            return None;
        }
        if (bar.close - fast).abs() > self.pullback_tolerance * atr {
            return None;
        }
        if fast > slow {
            Some(Side::Long)
        } else if fast < slow {
            Some(Side::Short)
        } else {
            None
        }
    }
}

impl RunStrategy for TrendFollowing {
    fn regime(&self) -> RegimeLabel {
        RegimeLabel::Trend
    }

    fn run(&self, bars: &[Bar]) -> Result<Vec<Trade>, StrategyError> {
        let atr_band = if self.use_atr_quantile {
            atr_pct_band(bars, self.atr_quantile_low, self.atr_quantile_high)
        } else {
            None
        };
        let entry = |bar: &Bar| self.entry_side(bar);
        let regime_holds = |bar: &Bar| {
            bar.trend_strength
                .map(|t| t >= self.trend_threshold)
                .unwrap_or(true)
        };
        Ok(self.engine.run(
            bars,
            &VariantSpec {
                regime: RegimeLabel::Trend,
                entry_side: &entry,
                regime_holds: &regime_holds,
                atr_band,
            },
        ))
    }
}

/// Nearest-rank quantile band over the run's atr_pct sample. Too small a
/// sample yields no band (no filtering).
fn atr_pct_band(bars: &[Bar], low_q: Decimal, high_q: Decimal) -> Option<(Decimal, Decimal)> {
    let mut values: Vec<Decimal> = bars.iter().filter_map(|b| b.atr_pct).collect();
    if values.len() < 10 {
        return None;
    }
    values.sort();
    Some((quantile(&values, low_q), quantile(&values, high_q)))
}

fn quantile(sorted: &[Decimal], q: Decimal) -> Decimal {
    let last = sorted.len() - 1;
    let rank = (q * Decimal::from(last))
        .round()
        .to_usize()
        .unwrap_or(0)
        .min(last);
    sorted[rank]
}
