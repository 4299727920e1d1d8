//! Volatility profile: true range, Wilder ATR and the high-volatility bar filter
//!
//! The profile decides, per bar, which extreme stands in for the bar's effective high/low
//! when an order block is placed. Abnormally wide bars (range >= 2x the volatility measure)
//! have their extremes swapped so a single spike does not stretch the block boundaries.

use serde::{Deserialize, Serialize};

use crate::{OHLCExt, Period, OHLC};

/// A bar is high-volatility when its range reaches this multiple of the volatility measure
pub const HIGH_VOLATILITY_FACTOR: f64 = 2.0;

/// Source of the volatility measure used by the high-volatility filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolatilityFilter {
  /// Wilder ATR, falling back to the cumulative mean true range during warm-up
  #[default]
  Atr,
  /// Cumulative mean true range only
  Range,
}

/// Per-bar volatility series for one candle sequence
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolatilityProfile {
  true_range: Vec<f64>,
  atr: Vec<Option<f64>>,
  cumulative_avg: Vec<f64>,
  measure: Vec<f64>,
  high_volatility: Vec<bool>,
  parsed_high: Vec<f64>,
  parsed_low: Vec<f64>,
}

impl VolatilityProfile {
  /// Compute the full profile in one pass. An empty series yields an empty profile.
  pub fn compute<T: OHLC>(bars: &[T], period: Period, filter: VolatilityFilter) -> Self {
    let true_range = true_range(bars);
    let atr = wilder_atr(&true_range, period);
    let cumulative_avg = cumulative_mean(&true_range);

    let len = bars.len();
    let mut measure = Vec::with_capacity(len);
    let mut high_volatility = Vec::with_capacity(len);
    let mut parsed_high = Vec::with_capacity(len);
    let mut parsed_low = Vec::with_capacity(len);

    for (i, bar) in bars.iter().enumerate() {
      let m = match filter {
        VolatilityFilter::Atr => atr[i].unwrap_or(cumulative_avg[i]),
        VolatilityFilter::Range => cumulative_avg[i],
      };
      let wide = bar.range() >= HIGH_VOLATILITY_FACTOR * m;

      measure.push(m);
      high_volatility.push(wide);
      parsed_high.push(if wide { bar.low() } else { bar.high() });
      parsed_low.push(if wide { bar.high() } else { bar.low() });
    }

    Self { true_range, atr, cumulative_avg, measure, high_volatility, parsed_high, parsed_low }
  }

  pub fn len(&self) -> usize {
    self.true_range.len()
  }

  pub fn is_empty(&self) -> bool {
    self.true_range.is_empty()
  }

  pub fn true_range(&self) -> &[f64] {
    &self.true_range
  }

  /// Wilder ATR; `None` until `period` bars are available
  pub fn atr(&self) -> &[Option<f64>] {
    &self.atr
  }

  pub fn cumulative_avg(&self) -> &[f64] {
    &self.cumulative_avg
  }

  pub fn measure(&self) -> &[f64] {
    &self.measure
  }

  pub fn high_volatility(&self) -> &[bool] {
    &self.high_volatility
  }

  /// Effective high per bar (the low on high-volatility bars)
  pub fn parsed_high(&self) -> &[f64] {
    &self.parsed_high
  }

  /// Effective low per bar (the high on high-volatility bars)
  pub fn parsed_low(&self) -> &[f64] {
    &self.parsed_low
  }
}

/// True range per bar. The first bar has no previous close and uses its own range.
pub fn true_range<T: OHLC>(bars: &[T]) -> Vec<f64> {
  let mut out = Vec::with_capacity(bars.len());
  for (i, bar) in bars.iter().enumerate() {
    let hl = bar.range();
    if i == 0 {
      out.push(hl);
      continue;
    }
    let prev_close = bars[i - 1].close();
    out.push(hl.max((bar.high() - prev_close).abs()).max((bar.low() - prev_close).abs()));
  }
  out
}

/// Wilder ATR over a true range series: simple mean of the first `period` values,
/// then `(prev * (period - 1) + tr) / period`.
pub fn wilder_atr(true_range: &[f64], period: Period) -> Vec<Option<f64>> {
  let p = period.get();
  let mut out = Vec::with_capacity(true_range.len());
  let mut prev: Option<f64> = None;
  let mut seed = 0.0;

  for (i, &tr) in true_range.iter().enumerate() {
    let value = match prev {
      Some(atr) => Some((atr * (p - 1) as f64 + tr) / p as f64),
      None => {
        seed += tr;
        (i + 1 == p).then(|| seed / p as f64)
      },
    };
    prev = value;
    out.push(value);
  }
  out
}

/// Running mean of `values[0..=i]` for every `i`
pub fn cumulative_mean(values: &[f64]) -> Vec<f64> {
  let mut sum = 0.0;
  values
    .iter()
    .enumerate()
    .map(|(i, v)| {
      sum += v;
      sum / (i + 1) as f64
    })
    .collect()
}

// ============================================================
// TESTS
// ============================================================
