//! Leg classification over a trailing window
//!
//! A leg flips bearish when the bar `size` back was the highest high of the window since,
//! and bullish when it was the lowest low. Each structural scale keeps its own leg.

use serde::{Deserialize, Serialize};

use crate::{Period, OHLC};

/// Prevailing local direction at one scale
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Leg {
  /// Every scale starts here; the first confirmed flip is therefore always bullish (a low).
  #[default]
  Bearish,
  Bullish,
}

/// Classify the leg at `index` for a window of `size` bars.
///
/// Returns `prev` during warm-up (`index < size`) or when neither extreme test holds.
/// The bearish test runs first.
pub fn leg_at<T: OHLC>(bars: &[T], index: usize, size: usize, prev: Leg) -> Leg {
  if index < size || index >= bars.len() {
    return prev;
  }

  let anchor = &bars[index - size];
  let recent = &bars[index - size + 1..=index];

  let highest = recent.iter().map(OHLC::high).fold(f64::NEG_INFINITY, f64::max);
  let lowest = recent.iter().map(OHLC::low).fold(f64::INFINITY, f64::min);

  if anchor.high() > highest {
    Leg::Bearish
  } else if anchor.low() < lowest {
    Leg::Bullish
  } else {
    prev
  }
}

/// Leg state for a single window size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegTracker {
  size: usize,
  leg: Leg,
}

impl LegTracker {
  pub fn new(size: Period) -> Self {
    Self { size: size.get(), leg: Leg::default() }
  }

  #[inline]
  pub fn size(&self) -> usize {
    self.size
  }

  #[inline]
  pub fn leg(&self) -> Leg {
    self.leg
  }

  /// Advance to `index`. Returns the new leg when it flipped on this bar.
  pub fn update<T: OHLC>(&mut self, bars: &[T], index: usize) -> Option<Leg> {
    let next = leg_at(bars, index, self.size, self.leg);
    if next == self.leg {
      return None;
    }
    self.leg = next;
    Some(next)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::Candle;

  fn bar(i: i64, high: f64, low: f64) -> Candle {
    Candle::new(i * 60, (high + low) / 2.0, high, low, (high + low) / 2.0)
  }

  #[test]
  fn test_warmup_keeps_previous_leg() {
    let bars = vec![bar(0, 10.0, 9.0), bar(1, 11.0, 10.0)];
    assert_eq!(leg_at(&bars, 1, 2, Leg::Bullish), Leg::Bullish);
    assert_eq!(leg_at(&bars, 1, 2, Leg::Bearish), Leg::Bearish);
  }

  #[test]
  fn test_rollover_is_bearish() {
    let bars = vec![bar(0, 12.0, 9.0), bar(1, 11.0, 9.5), bar(2, 10.5, 9.2)];
    assert_eq!(leg_at(&bars, 2, 2, Leg::Bullish), Leg::Bearish);
  }

  #[test]
  fn test_trough_is_bullish() {
    let bars = vec![bar(0, 10.0, 8.0), bar(1, 11.0, 9.0), bar(2, 10.5, 8.5)];
    assert_eq!(leg_at(&bars, 2, 2, Leg::Bearish), Leg::Bullish);
  }

  #[test]
  fn test_equal_extremes_do_not_flip() {
    let bars = vec![bar(0, 10.0, 8.0), bar(1, 10.0, 8.0), bar(2, 10.0, 8.0)];
    assert_eq!(leg_at(&bars, 2, 2, Leg::Bullish), Leg::Bullish);
    assert_eq!(leg_at(&bars, 2, 2, Leg::Bearish), Leg::Bearish);
  }

  #[test]
  fn test_tracker_reports_flips_only() {
    let bars: Vec<Candle> = (0..6).map(|i| bar(i, 100.0 + i as f64, 99.0 + i as f64)).collect();
    let mut tracker = LegTracker::new(Period::new(2).unwrap());

    assert_eq!(tracker.update(&bars, 0), None);
    assert_eq!(tracker.update(&bars, 1), None);
    assert_eq!(tracker.update(&bars, 2), Some(Leg::Bullish));
    assert_eq!(tracker.update(&bars, 3), None);
    assert_eq!(tracker.leg(), Leg::Bullish);
  }
}
