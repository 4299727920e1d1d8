//! Structure breaks (BOS / CHoCH)
//!
//! A close beyond an armed pivot breaks structure at that pivot's level. The break is a
//! change of character when it runs against the level's current trend and a break of
//! structure otherwise. Bullish and bearish checks are independent and may both fire on
//! the same bar.

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::pivot::{Pivot, PivotPair};
use crate::{Bias, Level, Trend, OHLC};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureKind {
  /// Break of structure: continuation of the prevailing trend
  #[serde(rename = "BOS")]
  Bos,
  /// Change of character: reversal of the prevailing trend
  #[serde(rename = "CHoCH")]
  Choch,
}

/// A confirmed structure break
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureEvent {
  /// Time of the breaking bar
  pub time: i64,
  /// Level of the broken pivot
  pub price: f64,
  #[serde(rename = "type")]
  pub kind: StructureKind,
  pub direction: Bias,
  pub level: Level,
  /// Time of the broken pivot
  pub start_time: i64,
}

/// What the orchestrator needs to place an order block after a break
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructureBreak {
  pub bias: Bias,
  pub level: Level,
  pub pivot_index: Option<usize>,
}

/// Trend state per level plus the append-only event log
#[derive(Debug, Clone, Default)]
pub struct StructureBreakDetector {
  internal_trend: Trend,
  swing_trend: Trend,
  events: Vec<StructureEvent>,
}

impl StructureBreakDetector {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn trend(&self, level: Level) -> Trend {
    match level {
      Level::Internal => self.internal_trend,
      Level::Swing => self.swing_trend,
    }
  }

  pub fn events(&self) -> &[StructureEvent] {
    &self.events
  }

  /// Test the close of bar `index` against both armed pivots of `level`.
  ///
  /// Broken pivots are latched (`crossed = true`). The bullish break, when any, comes first
  /// in the returned list.
  pub fn process<T: OHLC>(
    &mut self,
    bars: &[T],
    index: usize,
    level: Level,
    pivots: &mut PivotPair,
  ) -> Vec<StructureBreak> {
    let Some(bar) = bars.get(index) else {
      return Vec::new();
    };
    let close = bar.close();
    let mut breaks = Vec::new();

    if let Some(price) = pivots.high.armed_level() {
      if close > price {
        breaks.push(self.register(bar, &mut pivots.high, price, Bias::Bullish, level));
      }
    }

    if let Some(price) = pivots.low.armed_level() {
      if close < price {
        breaks.push(self.register(bar, &mut pivots.low, price, Bias::Bearish, level));
      }
    }

    breaks
  }

  fn register<T: OHLC>(
    &mut self,
    bar: &T,
    pivot: &mut Pivot,
    price: f64,
    bias: Bias,
    level: Level,
  ) -> StructureBreak {
    let kind = if self.trend(level) == Trend::from(bias.opposite()) {
      StructureKind::Choch
    } else {
      StructureKind::Bos
    };

    let event = StructureEvent {
      time: bar.time(),
      price,
      kind,
      direction: bias,
      level,
      start_time: pivot.time.unwrap_or(bar.time()),
    };
    trace!(?kind, ?bias, ?level, price, time = event.time, "structure break");
    self.events.push(event);

    pivot.crossed = true;
    match level {
      Level::Internal => self.internal_trend = bias.into(),
      Level::Swing => self.swing_trend = bias.into(),
    }

    StructureBreak { bias, level, pivot_index: pivot.index }
  }

  /// Consume the detector: `(events, internal trend, swing trend)`
  pub fn into_parts(self) -> (Vec<StructureEvent>, Trend, Trend) {
    (self.events, self.internal_trend, self.swing_trend)
  }
}
