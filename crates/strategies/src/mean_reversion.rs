use crate::RunStrategy;
use crate::error::StrategyError;
use crate::lifecycle::{LifecycleEngine, VariantSpec};
use configuration::{ExecutionParams, RegimeParams};
use core_types::{Bar, RegimeLabel, Side, Trade};
use executor::CostModel;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// The mean-reversion variant: fades deviations from the rolling reference
/// level inside ranging (weak-trend) runs. Shares the full lifecycle machine
/// with the trend variant; only the entry signal differs.
pub struct MeanReversion {
    engine: LifecycleEngine,
    trend_threshold: Decimal,
    deviation_band_fraction: Decimal,
}

impl MeanReversion {
    /// Creates a new `MeanReversion` instance from injected parameters.
    pub fn new(
        exec: ExecutionParams,
        regime: &RegimeParams,
        costs: CostModel,
        risk_amount: Decimal,
        max_consecutive_losses: u32,
    ) -> Result<Self, StrategyError> {
        if exec.deviation_band_fraction <= dec!(0) {
            return Err(StrategyError::InvalidParameters(
                "deviation_band_fraction must be greater than 0".to_string(),
            ));
        }
        let deviation_band_fraction = exec.deviation_band_fraction;
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
            deviation_band_fraction,
        })
    }

    /// Entry signal: a ranging bar whose close has stretched beyond the
    /// volatility-scaled band around the reference level. Buys the stretch
    /// below, sells the stretch above.
    fn entry_side(&self, bar: &Bar) -> Option<Side> {
        let trend_strength = bar.trend_strength?;
        let reference = bar.fast_avg?;
        let atr_pct = bar.atr_pct?;

        // Only operate while the market is ranging.
        if trend_strength >= self.trend_threshold {
            return None;
        }
        let band = reference * self.deviation_band_fraction * atr_pct;
        if bar.close < reference - band {
            Some(Side::Long)
        } else if bar.close > reference + band {
            Some(Side::Short)
        } else {
            None
        }
    }
}

impl RunStrategy for MeanReversion {
    fn regime(&self) -> RegimeLabel {
        RegimeLabel::Range
    }

    fn run(&self, bars: &[Bar]) -> Result<Vec<Trade>, StrategyError> {
        let entry = |bar: &Bar| self.entry_side(bar);
        let regime_holds = |bar: &Bar| {
            bar.trend_strength
                .map(|t| t < self.trend_threshold)
                .unwrap_or(true)
        };
        Ok(self.engine.run(
            bars,
            &VariantSpec {
                regime: RegimeLabel::Range,
                entry_side: &entry,
                regime_holds: &regime_holds,
                atr_band: None,
            },
        ))
    }
}
