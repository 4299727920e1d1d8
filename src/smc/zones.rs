//! Premium/discount zones and strong/weak extremes, derived once after the pass

use serde::{Deserialize, Serialize};

use super::pivot::TrailingExtremes;
use crate::Trend;

/// Share of the trailing range covered by the premium and discount bands
pub const ZONE_BAND: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PremiumDiscountZone {
  pub start_time: i64,
  pub end_time: i64,
  pub premium_top: f64,
  pub premium_bottom: f64,
  pub equilibrium: f64,
  pub discount_top: f64,
  pub discount_bottom: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
  Strong,
  Weak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtremeKind {
  High,
  Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrongWeakLevel {
  pub time: i64,
  pub price: f64,
  pub strength: Strength,
  #[serde(rename = "type")]
  pub kind: ExtremeKind,
}

/// At most one level per [`ExtremeKind`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrongWeakLevels {
  levels: Vec<StrongWeakLevel>,
}

impl StrongWeakLevels {
  /// Insert `level`, evicting any existing entry of the same kind
  pub fn replace(&mut self, level: StrongWeakLevel) {
    self.levels.retain(|l| l.kind != level.kind);
    self.levels.push(level);
  }

  pub fn get(&self, kind: ExtremeKind) -> Option<&StrongWeakLevel> {
    self.levels.iter().find(|l| l.kind == kind)
  }

  pub fn as_slice(&self) -> &[StrongWeakLevel] {
    &self.levels
  }

  pub fn len(&self) -> usize {
    self.levels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.levels.is_empty()
  }
}

/// Premium/discount split of the trailing range; `None` unless both extremes are anchored
pub fn premium_discount(trailing: &TrailingExtremes, end_time: i64) -> Option<PremiumDiscountZone> {
  let (top, bottom) = (trailing.top?, trailing.bottom?);
  let range = top - bottom;

  Some(PremiumDiscountZone {
    start_time: trailing.bar_time.unwrap_or(end_time),
    end_time,
    premium_top: top,
    premium_bottom: top - ZONE_BAND * range,
    equilibrium: (top + bottom) / 2.0,
    discount_top: bottom + ZONE_BAND * range,
    discount_bottom: bottom,
  })
}

/// Refresh the strong/weak labels from the trailing extremes and the final swing trend.
///
/// A high is strong in a bearish swing trend, a low in a bullish one. Sides without an
/// anchored extreme are left untouched.
pub fn update_strong_weak(levels: &mut StrongWeakLevels, trailing: &TrailingExtremes, swing_trend: Trend) {
  if let (Some(price), Some(time)) = (trailing.top, trailing.top_time) {
    let strength = if swing_trend == Trend::Bearish { Strength::Strong } else { Strength::Weak };
    levels.replace(StrongWeakLevel { time, price, strength, kind: ExtremeKind::High });
  }
  if let (Some(price), Some(time)) = (trailing.bottom, trailing.bottom_time) {
    let strength = if swing_trend == Trend::Bullish { Strength::Strong } else { Strength::Weak };
    levels.replace(StrongWeakLevel { time, price, strength, kind: ExtremeKind::Low });
  }
}
