use configuration::RegimeParams;
use core_types::{Bar, RegimeLabel};
use rust_decimal::Decimal;

/// One maximal contiguous stretch of bars sharing a regime label.
#[derive(Debug, Clone, Copy)]
pub struct RegimeRun<'a> {
    pub label: RegimeLabel,
    pub bars: &'a [Bar],
}

/// Labels bars trend vs. range against a fixed trend-strength threshold and
/// cuts the series into maximal same-label runs.
#[derive(Debug, Clone)]
pub struct RegimeClassifier {
    trend_threshold: Decimal,
    min_run_len: usize,
}

impl RegimeClassifier {
    pub fn new(params: &RegimeParams) -> Self {
        Self {
            trend_threshold: params.trend_threshold,
            min_run_len: params.min_run_len,
        }
    }

    /// A bar missing its trend-strength feature cannot claim a trend; it is
    /// labelled Range.
    pub fn classify(&self, bar: &Bar) -> RegimeLabel {
        match bar.trend_strength {
            Some(t) if t >= self.trend_threshold => RegimeLabel::Trend,
            _ => RegimeLabel::Range,
        }
    }

    /// Partitions `bars` into maximal contiguous runs, discarding runs
    /// shorter than the configured minimum. Order is preserved.
    pub fn runs<'a>(&self, bars: &'a [Bar]) -> Vec<RegimeRun<'a>> {
        let mut runs = Vec::new();
        if bars.is_empty() {
            return runs;
        }

        let mut start = 0;
        let mut label = self.classify(&bars[0]);
        for i in 1..=bars.len() {
            let next = if i < bars.len() {
                Some(self.classify(&bars[i]))
            } else {
                None
            };
            if next != Some(label) {
                if i - start >= self.min_run_len {
                    runs.push(RegimeRun { label, bars: &bars[start..i] });
                } else {
                    tracing::debug!(from = start, to = i, ?label, "run below minimum length, discarded");
                }
                start = i;
                if let Some(l) = next {
                    label = l;
                }
            }
        }
        runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn bar(i: u32, trend_strength: Option<Decimal>) -> Bar {
        Bar {
            ts: Utc.with_ymd_and_hms(2025, 8, 5, i / 60, i % 60, 0).unwrap(),
            open: dec!(100),
            high: dec!(101),
            low: dec!(99),
            close: dec!(100),
            volume: dec!(1000),
            trend_strength,
            atr: Some(dec!(1)),
            atr_pct: Some(dec!(0.01)),
            fast_avg: Some(dec!(100)),
            slow_avg: Some(dec!(100)),
        }
    }

    fn classifier(min_run_len: usize) -> RegimeClassifier {
        RegimeClassifier::new(&RegimeParams {
            trend_threshold: dec!(25),
            min_run_len,
            block_funding_minutes: 0,
            use_atr_quantile: false,
            atr_quantile_low: dec!(0.2),
            atr_quantile_high: dec!(0.9),
        })
    }

    #[test]
    fn threshold_splits_trend_from_range() {
        let c = classifier(1);
        assert_eq!(c.classify(&bar(0, Some(dec!(30)))), RegimeLabel::Trend);
        assert_eq!(c.classify(&bar(0, Some(dec!(25)))), RegimeLabel::Trend);
        assert_eq!(c.classify(&bar(0, Some(dec!(24)))), RegimeLabel::Range);
        assert_eq!(c.classify(&bar(0, None)), RegimeLabel::Range);
    }

    #[test]
    fn partitions_into_maximal_contiguous_runs() {
        let c = classifier(1);
        let bars: Vec<Bar> = [30, 30, 10, 10, 10, 40]
            .iter()
            .enumerate()
            .map(|(i, t)| bar(i as u32, Some(Decimal::from(*t))))
            .collect();
        let runs = c.runs(&bars);
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].label, RegimeLabel::Trend);
        assert_eq!(runs[0].bars.len(), 2);
        assert_eq!(runs[1].label, RegimeLabel::Range);
        assert_eq!(runs[1].bars.len(), 3);
        assert_eq!(runs[2].label, RegimeLabel::Trend);
        assert_eq!(runs[2].bars.len(), 1);
    }

    #[test]
    fn short_runs_are_discarded() {
        let c = classifier(3);
        let bars: Vec<Bar> = [30, 30, 10, 10, 10, 40]
            .iter()
            .enumerate()
            .map(|(i, t)| bar(i as u32, Some(Decimal::from(*t))))
            .collect();
        let runs = c.runs(&bars);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].label, RegimeLabel::Range);
    }

    #[test]
    fn empty_series_yields_no_runs() {
        assert!(classifier(1).runs(&[]).is_empty());
    }
}
