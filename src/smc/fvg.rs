//! Fair value gaps: three-bar imbalances tracked until price trades back through them

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{Bias, OHLC};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FairValueGap {
  /// Time of the middle bar
  pub time: i64,
  pub top: f64,
  pub bottom: f64,
  pub bias: Bias,
  pub filled: bool,
  pub filled_time: Option<i64>,
}

impl FairValueGap {
  fn open(time: i64, top: f64, bottom: f64, bias: Bias) -> Self {
    Self { time, top, bottom, bias, filled: false, filled_time: None }
  }

  /// Whether `bar` trades through the far edge of the gap
  pub fn is_filled_by<T: OHLC>(&self, bar: &T) -> bool {
    match self.bias {
      Bias::Bullish => bar.low() < self.bottom,
      Bias::Bearish => bar.high() > self.top,
    }
  }
}

/// Gaps formed by `first`, `middle`, `last`: bullish first, then bearish.
///
/// Depends on these three bars only.
pub fn gaps_at<T: OHLC>(first: &T, middle: &T, last: &T) -> [Option<FairValueGap>; 2] {
  let bullish = (last.low() > first.high() && middle.close() > first.high())
    .then(|| FairValueGap::open(middle.time(), last.low(), first.high(), Bias::Bullish));
  let bearish = (last.high() < first.low() && middle.close() < first.low())
    .then(|| FairValueGap::open(middle.time(), first.low(), last.high(), Bias::Bearish));
  [bullish, bearish]
}

/// Gap collection, optionally capped to the newest `capacity` entries
#[derive(Debug, Clone, Default)]
pub struct FvgDetector {
  gaps: Vec<FairValueGap>,
  capacity: Option<usize>,
}

impl FvgDetector {
  pub fn new(capacity: Option<usize>) -> Self {
    Self { gaps: Vec::new(), capacity }
  }

  pub fn gaps(&self) -> &[FairValueGap] {
    &self.gaps
  }

  /// Record gaps completed by bar `index` (needs `index >= 2`)
  pub fn detect<T: OHLC>(&mut self, bars: &[T], index: usize) {
    if index < 2 || index >= bars.len() {
      return;
    }
    for gap in gaps_at(&bars[index - 2], &bars[index - 1], &bars[index]).into_iter().flatten() {
      trace!(bias = ?gap.bias, top = gap.top, bottom = gap.bottom, time = gap.time, "fair value gap");
      self.gaps.push(gap);
    }

    if let Some(cap) = self.capacity {
      if self.gaps.len() > cap {
        let excess = self.gaps.len() - cap;
        self.gaps.drain(..excess);
      }
    }
  }

  /// Mark every open gap that bar `index` trades through
  pub fn check_fill<T: OHLC>(&mut self, bars: &[T], index: usize) {
    let Some(bar) = bars.get(index) else {
      return;
    };
    for gap in self.gaps.iter_mut().filter(|g| !g.filled) {
      if gap.is_filled_by(bar) {
        gap.filled = true;
        gap.filled_time = Some(bar.time());
        trace!(bias = ?gap.bias, time = gap.time, at = bar.time(), "fair value gap filled");
      }
    }
  }

  pub fn into_gaps(self) -> Vec<FairValueGap> {
    self.gaps
  }
}
