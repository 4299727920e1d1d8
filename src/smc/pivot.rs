//! Pivot tracking per structural scale
//!
//! Every scale (swing, internal, equal-high/low) owns a [`LegTracker`] and a pair of pivot
//! records. A leg flip confirms a pivot `size` bars back: a flip to bullish confirms a low,
//! a flip to bearish confirms a high. The swing scale additionally labels its pivots
//! (HH/HL/LH/LL) and re-anchors the trailing extremes; the equal scale compares each new
//! pivot with the previous one of the same side to find equal highs and lows.

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::leg::{Leg, LegTracker};
use crate::{Factor, Level, Period, OHLC};

// ============================================================
// SCALES
// ============================================================

/// Structural scale a pivot belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PivotScale {
  Swing,
  Internal,
  Equal,
}

impl PivotScale {
  #[inline]
  fn slot(self) -> usize {
    match self {
      PivotScale::Swing => 0,
      PivotScale::Internal => 1,
      PivotScale::Equal => 2,
    }
  }
}

impl From<Level> for PivotScale {
  fn from(level: Level) -> Self {
    match level {
      Level::Swing => PivotScale::Swing,
      Level::Internal => PivotScale::Internal,
    }
  }
}

// ============================================================
// PIVOT RECORDS
// ============================================================

/// Rolling record of the latest confirmed pivot of one kind.
///
/// `crossed` is the break latch: a pivot is armed while `crossed == false` and goes dormant
/// once a close breaks through it, until the next confirmation re-arms it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Pivot {
  pub current_level: Option<f64>,
  pub last_level: Option<f64>,
  pub crossed: bool,
  pub time: Option<i64>,
  pub index: Option<usize>,
}

impl Pivot {
  /// Record a newly confirmed pivot, shifting the current level into `last_level`
  pub fn confirm(&mut self, level: f64, time: i64, index: usize) {
    self.last_level = self.current_level;
    self.current_level = Some(level);
    self.crossed = false;
    self.time = Some(time);
    self.index = Some(index);
  }

  /// Level that can still be broken, if any
  #[inline]
  pub fn armed_level(&self) -> Option<f64> {
    if self.crossed {
      None
    } else {
      self.current_level
    }
  }
}

/// High and low pivot records of one scale
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PivotPair {
  pub high: Pivot,
  pub low: Pivot,
}

/// Running extremes since the last swing pivot of each polarity
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailingExtremes {
  pub top: Option<f64>,
  pub bottom: Option<f64>,
  pub top_time: Option<i64>,
  pub bottom_time: Option<i64>,
  pub bar_time: Option<i64>,
  pub bar_index: Option<usize>,
}

impl TrailingExtremes {
  /// Extend the running extremes with `bar`. Sides not yet anchored by a swing pivot stay empty.
  pub fn update<T: OHLC>(&mut self, bar: &T) {
    if let Some(top) = self.top {
      if bar.high() > top {
        self.top = Some(bar.high());
        self.top_time = Some(bar.time());
      }
    }
    if let Some(bottom) = self.bottom {
      if bar.low() < bottom {
        self.bottom = Some(bar.low());
        self.bottom_time = Some(bar.time());
      }
    }
  }

  pub fn anchor_top(&mut self, level: f64, time: i64, index: usize) {
    self.top = Some(level);
    self.top_time = Some(time);
    self.bar_time = Some(time);
    self.bar_index = Some(index);
  }

  pub fn anchor_bottom(&mut self, level: f64, time: i64, index: usize) {
    self.bottom = Some(level);
    self.bottom_time = Some(time);
    self.bar_time = Some(time);
    self.bar_index = Some(index);
  }
}

// ============================================================
// OUTPUT RECORDS
// ============================================================

/// Swing pivot label relative to the previous pivot of the same side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwingLabel {
  #[serde(rename = "HH")]
  HigherHigh,
  #[serde(rename = "HL")]
  HigherLow,
  #[serde(rename = "LH")]
  LowerHigh,
  #[serde(rename = "LL")]
  LowerLow,
}

/// Which extreme a swing point marks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwingSide {
  High,
  Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwingPoint {
  pub time: i64,
  pub price: f64,
  #[serde(rename = "type")]
  pub label: SwingLabel,
  #[serde(rename = "swing")]
  pub side: SwingSide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EqualKind {
  #[serde(rename = "EQH")]
  EqualHigh,
  #[serde(rename = "EQL")]
  EqualLow,
}

/// Two consecutive equal-scale pivots within the ATR threshold of each other
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqualHighLow {
  /// Time of the earlier pivot
  pub time1: i64,
  /// Time of the newly confirmed pivot
  pub time2: i64,
  /// Level of the newly confirmed pivot
  pub price: f64,
  #[serde(rename = "type")]
  pub kind: EqualKind,
}

/// Strict comparison: a distance exactly at the threshold is not equal
#[inline]
pub fn is_equal_level(previous: f64, current: f64, threshold: f64, atr: f64) -> bool {
  (previous - current).abs() < threshold * atr
}

// ============================================================
// TRACKER
// ============================================================

#[derive(Debug, Clone, Copy)]
struct ScaleState {
  leg: LegTracker,
  pivots: PivotPair,
}

impl ScaleState {
  fn new(size: Period) -> Self {
    Self { leg: LegTracker::new(size), pivots: PivotPair::default() }
  }
}

/// Pivot state for all three scales plus the swing-scale outputs
#[derive(Debug, Clone)]
pub struct PivotTracker {
  scales: [ScaleState; 3],
  equal_threshold: f64,
  trailing: TrailingExtremes,
  swing_points: Vec<SwingPoint>,
  equal_highs_lows: Vec<EqualHighLow>,
}

impl PivotTracker {
  pub fn new(swing: Period, internal: Period, equal: Period, equal_threshold: Factor) -> Self {
    Self {
      scales: [ScaleState::new(swing), ScaleState::new(internal), ScaleState::new(equal)],
      equal_threshold: equal_threshold.get(),
      trailing: TrailingExtremes::default(),
      swing_points: Vec::new(),
      equal_highs_lows: Vec::new(),
    }
  }

  pub fn pivots(&self, scale: PivotScale) -> &PivotPair {
    &self.scales[scale.slot()].pivots
  }

  pub fn pivots_mut(&mut self, scale: PivotScale) -> &mut PivotPair {
    &mut self.scales[scale.slot()].pivots
  }

  pub fn trailing(&self) -> &TrailingExtremes {
    &self.trailing
  }

  pub fn swing_points(&self) -> &[SwingPoint] {
    &self.swing_points
  }

  pub fn equal_highs_lows(&self) -> &[EqualHighLow] {
    &self.equal_highs_lows
  }

  /// Fold bar `index` into the trailing extremes
  pub fn update_trailing<T: OHLC>(&mut self, bars: &[T], index: usize) {
    if let Some(bar) = bars.get(index) {
      self.trailing.update(bar);
    }
  }

  /// Advance one scale to bar `index`, confirming a pivot when its leg flips.
  ///
  /// `atr` is indexed by bar; a missing value counts as zero, which disables equal
  /// high/low detection until the ATR has warmed up.
  pub fn process<T: OHLC>(
    &mut self,
    bars: &[T],
    index: usize,
    scale: PivotScale,
    atr: &[Option<f64>],
  ) {
    let state = &mut self.scales[scale.slot()];
    let Some(leg) = state.leg.update(bars, index) else {
      return;
    };
    let pivot_index = index - state.leg.size();
    let bar = &bars[pivot_index];
    let atr = atr.get(pivot_index).copied().flatten().unwrap_or(0.0);

    match leg {
      Leg::Bullish => self.confirm(scale, SwingSide::Low, bar.low(), bar.time(), pivot_index, atr),
      Leg::Bearish => self.confirm(scale, SwingSide::High, bar.high(), bar.time(), pivot_index, atr),
    }
  }

  fn confirm(
    &mut self,
    scale: PivotScale,
    side: SwingSide,
    level: f64,
    time: i64,
    index: usize,
    atr: f64,
  ) {
    let pivot = match side {
      SwingSide::High => &mut self.scales[scale.slot()].pivots.high,
      SwingSide::Low => &mut self.scales[scale.slot()].pivots.low,
    };
    let previous = *pivot;
    pivot.confirm(level, time, index);
    trace!(?scale, ?side, level, time, index, "pivot confirmed");

    match scale {
      PivotScale::Equal => {
        if let (Some(prev_level), Some(prev_time)) = (previous.current_level, previous.time) {
          if is_equal_level(prev_level, level, self.equal_threshold, atr) {
            let kind = match side {
              SwingSide::High => EqualKind::EqualHigh,
              SwingSide::Low => EqualKind::EqualLow,
            };
            self.equal_highs_lows.push(EqualHighLow { time1: prev_time, time2: time, price: level, kind });
          }
        }
      },
      PivotScale::Swing => {
        let label = match (side, previous.current_level) {
          (SwingSide::High, Some(prev)) if level <= prev => SwingLabel::LowerHigh,
          (SwingSide::High, _) => SwingLabel::HigherHigh,
          (SwingSide::Low, Some(prev)) if level >= prev => SwingLabel::HigherLow,
          (SwingSide::Low, _) => SwingLabel::LowerLow,
        };
        self.swing_points.push(SwingPoint { time, price: level, label, side });

        match side {
          SwingSide::High => self.trailing.anchor_top(level, time, index),
          SwingSide::Low => self.trailing.anchor_bottom(level, time, index),
        }
      },
      PivotScale::Internal => {},
    }
  }

  /// Consume the tracker, yielding its output collections and the final trailing extremes
  pub fn into_parts(self) -> (Vec<SwingPoint>, Vec<EqualHighLow>, TrailingExtremes) {
    (self.swing_points, self.equal_highs_lows, self.trailing)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::Candle;

  fn bar(high: f64, low: f64) -> Candle {
    Candle::new(0, (high + low) / 2.0, high, low, (high + low) / 2.0)
  }

  fn tracker(size: usize, threshold: f64) -> PivotTracker {
    let p = Period::new(size).unwrap();
    PivotTracker::new(p, p, p, Factor::new(threshold).unwrap())
  }

  /// Zig-zag of four bars per cycle: trough, midpoint, peak, midpoint
  fn zigzag(lows: &[f64], highs: &[f64]) -> Vec<Candle> {
    let mut bars = Vec::new();
    for (&lo, &hi) in lows.iter().zip(highs) {
      let mid = (lo + hi) / 2.0;
      bars.push(bar(lo + 1.0, lo));
      bars.push(bar(mid + 0.5, mid - 0.5));
      bars.push(bar(hi, hi - 1.0));
      bars.push(bar(mid + 0.5, mid - 0.5));
    }
    for (i, b) in bars.iter_mut().enumerate() {
      b.time = i as i64 * 60;
    }
    bars
  }

  fn run(tracker: &mut PivotTracker, bars: &[Candle], scale: PivotScale, atr: &[Option<f64>]) {
    for i in 0..bars.len() {
      tracker.process(bars, i, scale, atr);
    }
  }

  #[test]
  fn test_pivot_confirm_shifts_levels() {
    let mut pivot = Pivot::default();
    pivot.confirm(10.0, 60, 1);
    assert_eq!(pivot.current_level, Some(10.0));
    assert_eq!(pivot.last_level, None);

    pivot.crossed = true;
    assert_eq!(pivot.armed_level(), None);

    pivot.confirm(12.0, 120, 2);
    assert_eq!(pivot.current_level, Some(12.0));
    assert_eq!(pivot.last_level, Some(10.0));
    assert!(!pivot.crossed);
    assert_eq!(pivot.armed_level(), Some(12.0));
    assert_eq!(pivot.index, Some(2));
  }

  #[test]
  fn test_equal_level_boundary_is_strict() {
    assert!(is_equal_level(100.0, 100.5, 0.5, 2.0));
    assert!(!is_equal_level(100.0, 101.0, 0.5, 2.0));
    assert!(!is_equal_level(100.0, 100.0, 0.5, 0.0));
  }

  #[test]
  fn test_swing_labels() {
    // Lows 100, 102 (higher low); highs 110, 108 (lower high)
    let bars = zigzag(&[100.0, 102.0, 101.0], &[110.0, 108.0, 109.0]);
    let mut t = tracker(2, 0.1);
    run(&mut t, &bars, PivotScale::Swing, &[]);

    let labels: Vec<SwingLabel> = t.swing_points().iter().map(|p| p.label).collect();
    assert_eq!(
      labels,
      vec![
        SwingLabel::LowerLow,
        SwingLabel::HigherHigh,
        SwingLabel::HigherLow,
        SwingLabel::LowerHigh,
        SwingLabel::LowerLow,
      ]
    );
    assert_eq!(t.swing_points()[0].price, 100.0);
    assert_eq!(t.swing_points()[1].price, 110.0);
    assert_eq!(t.swing_points()[1].side, SwingSide::High);
  }

  #[test]
  fn test_swing_pivots_anchor_trailing_extremes() {
    let bars = zigzag(&[100.0, 102.0], &[110.0, 108.0]);
    let mut t = tracker(2, 0.1);
    run(&mut t, &bars, PivotScale::Swing, &[]);

    // Pivots: low 100 @0, high 110 @2, low 102 @4; the second high is not yet confirmed
    let trailing = t.trailing();
    assert_eq!(trailing.top, Some(110.0));
    assert_eq!(trailing.top_time, Some(120));
    assert_eq!(trailing.bottom, Some(102.0));
    assert_eq!(trailing.bottom_time, Some(240));
    assert_eq!(trailing.bar_time, Some(240));
    assert_eq!(trailing.bar_index, Some(4));
  }

  #[test]
  fn test_internal_scale_emits_nothing() {
    let bars = zigzag(&[100.0, 102.0], &[110.0, 108.0]);
    let mut t = tracker(2, 0.1);
    run(&mut t, &bars, PivotScale::Internal, &[]);

    assert!(t.swing_points().is_empty());
    assert_eq!(t.pivots(PivotScale::Internal).low.current_level, Some(102.0));
    assert_eq!(t.pivots(PivotScale::Internal).low.last_level, Some(100.0));
    assert_eq!(t.trailing(), &TrailingExtremes::default());
  }

  #[test]
  fn test_equal_lows_within_threshold() {
    // Lows 100.0 and 100.25 with ATR 2.0 and threshold 0.5 => distance 0.25 < 1.0
    let bars = zigzag(&[100.0, 100.25, 100.0], &[110.0, 110.0, 110.0]);
    let atr = vec![Some(2.0); bars.len()];
    let mut t = tracker(2, 0.5);
    run(&mut t, &bars, PivotScale::Equal, &atr);

    let eq = t.equal_highs_lows();
    assert!(eq.iter().any(|e| e.kind == EqualKind::EqualLow && e.price == 100.25 && e.time1 == 0));
    assert!(eq.iter().any(|e| e.kind == EqualKind::EqualHigh && e.price == 110.0));
  }

  #[test]
  fn test_equal_lows_at_threshold_are_not_emitted() {
    // Distance 1.0 == 0.5 * 2.0
    let bars = zigzag(&[100.0, 101.0], &[120.0, 110.0]);
    let atr = vec![Some(2.0); bars.len()];
    let mut t = tracker(2, 0.5);
    run(&mut t, &bars, PivotScale::Equal, &atr);

    assert!(t.equal_highs_lows().is_empty());
  }

  #[test]
  fn test_equal_threshold_uses_atr_at_pivot_bar() {
    // Second low sits on bar 4 and is confirmed on bar 6
    let bars = zigzag(&[100.0, 100.25], &[110.0, 120.0]);
    let mut atr = vec![Some(0.1); bars.len()];
    atr[4] = Some(2.0);
    let mut t = tracker(2, 0.5);
    run(&mut t, &bars, PivotScale::Equal, &atr);

    assert_eq!(
      t.equal_highs_lows(),
      &[EqualHighLow { time1: 0, time2: 240, price: 100.25, kind: EqualKind::EqualLow }]
    );

    // Wide ATR on the confirming bar alone is not enough
    let mut atr = vec![Some(0.1); bars.len()];
    atr[6] = Some(2.0);
    let mut t = tracker(2, 0.5);
    run(&mut t, &bars, PivotScale::Equal, &atr);

    assert!(t.equal_highs_lows().is_empty());
  }

  #[test]
  fn test_equal_detection_disabled_without_atr() {
    let bars = zigzag(&[100.0, 100.0], &[110.0, 110.0]);
    let atr = vec![None; bars.len()];
    let mut t = tracker(2, 0.5);
    run(&mut t, &bars, PivotScale::Equal, &atr);

    assert!(t.equal_highs_lows().is_empty());
  }
}
