//! Order blocks created on structure breaks
//!
//! A bullish break places a demand block on the bar with the lowest effective low between
//! the broken pivot and the breaking bar; a bearish break places a supply block on the bar
//! with the highest effective high. Effective extremes come from the [`VolatilityProfile`].

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::volatility::VolatilityProfile;
use crate::{Bias, Level, OHLC};

/// Price used to decide whether a block has been mitigated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MitigationMode {
  /// Bar close
  Close,
  /// Bar high for supply blocks, bar low for demand blocks
  #[default]
  #[serde(rename = "highlow")]
  HighLow,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderBlock {
  pub time: i64,
  pub high: f64,
  pub low: f64,
  pub bias: Bias,
  pub level: Level,
  pub mitigated: bool,
  pub mitigated_time: Option<i64>,
}

impl OrderBlock {
  /// Whether `bar` invalidates this block under `mode`
  pub fn is_breached_by<T: OHLC>(&self, bar: &T, mode: MitigationMode) -> bool {
    let (up, down) = match mode {
      MitigationMode::Close => (bar.close(), bar.close()),
      MitigationMode::HighLow => (bar.high(), bar.low()),
    };
    match self.bias {
      Bias::Bearish => up > self.high,
      Bias::Bullish => down < self.low,
    }
  }
}

/// Size-capped order block collection; the oldest blocks are evicted first
#[derive(Debug, Clone)]
pub struct OrderBlockManager {
  blocks: Vec<OrderBlock>,
  capacity: usize,
  mitigation: MitigationMode,
}

impl OrderBlockManager {
  pub fn new(capacity: usize, mitigation: MitigationMode) -> Self {
    Self { blocks: Vec::new(), capacity, mitigation }
  }

  pub fn blocks(&self) -> &[OrderBlock] {
    &self.blocks
  }

  /// Place a block for a break at `current_index` of the pivot at `pivot_index`.
  ///
  /// The search covers `[pivot_index, current_index - 1]`; ties keep the earliest bar.
  /// Returns `None` when there is no pivot index or the interval is empty.
  pub fn create<T: OHLC>(
    &mut self,
    bars: &[T],
    profile: &VolatilityProfile,
    pivot_index: Option<usize>,
    current_index: usize,
    bias: Bias,
    level: Level,
  ) -> Option<OrderBlock> {
    let start = pivot_index?;
    let end = current_index.min(profile.len()).min(bars.len());
    if start >= end {
      return None;
    }

    let idx = start
      + match bias {
        Bias::Bearish => first_max_index(&profile.parsed_high()[start..end])?,
        Bias::Bullish => first_min_index(&profile.parsed_low()[start..end])?,
      };

    let block = OrderBlock {
      time: bars[idx].time(),
      high: profile.parsed_high()[idx],
      low: profile.parsed_low()[idx],
      bias,
      level,
      mitigated: false,
      mitigated_time: None,
    };
    trace!(?bias, ?level, high = block.high, low = block.low, time = block.time, "order block");
    self.blocks.push(block);

    if self.blocks.len() > self.capacity {
      let excess = self.blocks.len() - self.capacity;
      self.blocks.drain(..excess);
      trace!(evicted = excess, "order blocks evicted");
    }

    Some(block)
  }

  /// Mitigate every live block breached by bar `index`
  pub fn check_mitigation<T: OHLC>(&mut self, bars: &[T], index: usize) {
    let Some(bar) = bars.get(index) else {
      return;
    };
    for block in self.blocks.iter_mut().filter(|b| !b.mitigated) {
      if block.is_breached_by(bar, self.mitigation) {
        block.mitigated = true;
        block.mitigated_time = Some(bar.time());
        trace!(bias = ?block.bias, time = block.time, at = bar.time(), "order block mitigated");
      }
    }
  }

  pub fn into_blocks(self) -> Vec<OrderBlock> {
    self.blocks
  }
}

/// Index of the first maximum
fn first_max_index(values: &[f64]) -> Option<usize> {
  let mut best: Option<(usize, f64)> = None;
  for (i, &v) in values.iter().enumerate() {
    match best {
      Some((_, b)) if v <= b => {},
      _ => best = Some((i, v)),
    }
  }
  best.map(|(i, _)| i)
}

/// Index of the first minimum
fn first_min_index(values: &[f64]) -> Option<usize> {
  let mut best: Option<(usize, f64)> = None;
  for (i, &v) in values.iter().enumerate() {
    match best {
      Some((_, b)) if v >= b => {},
      _ => best = Some((i, v)),
    }
  }
  best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::smc::volatility::VolatilityFilter;
  use crate::{Candle, Period};

  fn series() -> Vec<Candle> {
    vec![
      Candle::new(0, 100.0, 101.0, 99.0, 100.5),
      Candle::new(60, 100.5, 103.0, 100.0, 102.5),
      Candle::new(120, 102.5, 103.0, 98.0, 98.5),
      Candle::new(180, 98.5, 99.0, 98.0, 98.5),
      Candle::new(240, 98.5, 104.0, 98.5, 103.5),
    ]
  }

  fn profile(bars: &[Candle]) -> VolatilityProfile {
    VolatilityProfile::compute(bars, Period::new(200).unwrap(), VolatilityFilter::Atr)
  }

  #[test]
  fn test_first_extremum_wins() {
    assert_eq!(first_max_index(&[1.0, 3.0, 3.0, 2.0]), Some(1));
    assert_eq!(first_min_index(&[4.0, 2.0, 5.0, 2.0]), Some(1));
    assert_eq!(first_max_index(&[]), None);
  }

  #[test]
  fn test_bullish_block_on_lowest_low() {
    let bars = series();
    let profile = profile(&bars);
    let mut manager = OrderBlockManager::new(20, MitigationMode::HighLow);

    let block = manager.create(&bars, &profile, Some(0), 4, Bias::Bullish, Level::Internal).unwrap();

    // Bars 2 and 3 share the lowest low; the earlier one is kept
    assert_eq!(block.time, 120);
    assert_eq!(block.low, 98.0);
    assert_eq!(block.high, 103.0);
    assert!(!block.mitigated);
  }

  #[test]
  fn test_bearish_block_on_highest_high() {
    let bars = series();
    let profile = profile(&bars);
    let mut manager = OrderBlockManager::new(20, MitigationMode::HighLow);

    let block = manager.create(&bars, &profile, Some(0), 4, Bias::Bearish, Level::Swing).unwrap();
    assert_eq!(block.time, 60);
    assert_eq!(block.high, 103.0);
    assert_eq!(block.level, Level::Swing);
  }

  #[test]
  fn test_create_requires_pivot_and_interval() {
    let bars = series();
    let profile = profile(&bars);
    let mut manager = OrderBlockManager::new(20, MitigationMode::HighLow);

    assert!(manager.create(&bars, &profile, None, 4, Bias::Bullish, Level::Swing).is_none());
    assert!(manager.create(&bars, &profile, Some(4), 4, Bias::Bullish, Level::Swing).is_none());
    assert!(manager.create(&bars, &profile, Some(2), 99, Bias::Bullish, Level::Swing).is_some());
    assert_eq!(manager.blocks().len(), 1);
  }

  #[test]
  fn test_retention_keeps_newest() {
    let bars = series();
    let profile = profile(&bars);
    let mut manager = OrderBlockManager::new(2, MitigationMode::HighLow);

    for (pivot, current) in [(0, 2), (0, 3), (2, 4), (3, 5)] {
      manager.create(&bars, &profile, Some(pivot), current, Bias::Bearish, Level::Internal);
    }

    let times: Vec<i64> = manager.blocks().iter().map(|b| b.time).collect();
    assert_eq!(manager.blocks().len(), 2);
    // The last two searches land on bar 2 (high 103) and bar 4 (high 104)
    assert_eq!(times, vec![120, 240]);
  }

  #[test]
  fn test_mitigation_modes() {
    let block = OrderBlock {
      time: 0,
      high: 105.0,
      low: 100.0,
      bias: Bias::Bearish,
      level: Level::Swing,
      mitigated: false,
      mitigated_time: None,
    };
    // Wick above, close below
    let bar = Candle::new(60, 104.0, 106.0, 103.0, 104.5);
    assert!(block.is_breached_by(&bar, MitigationMode::HighLow));
    assert!(!block.is_breached_by(&bar, MitigationMode::Close));

    let demand = OrderBlock { bias: Bias::Bullish, ..block };
    let dip = Candle::new(60, 101.0, 102.0, 99.0, 100.5);
    assert!(demand.is_breached_by(&dip, MitigationMode::HighLow));
    assert!(!demand.is_breached_by(&dip, MitigationMode::Close));
  }

  #[test]
  fn test_mitigation_is_latched() {
    let bars = series();
    let profile = profile(&bars);
    let mut manager = OrderBlockManager::new(20, MitigationMode::HighLow);
    manager.create(&bars, &profile, Some(0), 2, Bias::Bearish, Level::Internal);

    // Bar 4 trades above the block high of 103
    manager.check_mitigation(&bars, 3);
    assert!(!manager.blocks()[0].mitigated);
    manager.check_mitigation(&bars, 4);
    assert_eq!(manager.blocks()[0].mitigated_time, Some(240));

    manager.check_mitigation(&bars, 0);
    assert!(manager.blocks()[0].mitigated);
    assert_eq!(manager.blocks()[0].mitigated_time, Some(240));
  }
}
