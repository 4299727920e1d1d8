//! Smart Money Concepts components and the single forward pass that drives them
//!
//! # Per-bar order
//!
//! For every bar `i`, in this order:
//!
//! 1. trailing extremes absorb bar `i` (premium/discount enabled)
//! 2. swing, internal and (when enabled) equal-scale pivots advance
//! 3. internal, then swing structure breaks are tested; each break may place an order block
//! 4. order blocks are checked for mitigation, including blocks placed on this bar
//! 5. fair value gaps are detected, then checked for fill
//!
//! Zones are summarized once after the last bar.

pub mod fvg;
pub mod leg;
pub mod order_blocks;
pub mod pivot;
pub mod structure;
pub mod volatility;
pub mod zones;

pub use fvg::*;
pub use leg::*;
pub use order_blocks::*;
pub use pivot::*;
pub use structure::*;
pub use volatility::*;
pub use zones::*;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{config::SmcConfig, Factor, Level, Period, Result, Trend, OHLC};

/// Everything one pass produces; the contract handed to rendering
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmcSnapshot {
  pub structures: Vec<StructureEvent>,
  pub swing_points: Vec<SwingPoint>,
  pub order_blocks: Vec<OrderBlock>,
  pub fair_value_gaps: Vec<FairValueGap>,
  pub equal_highs_lows: Vec<EqualHighLow>,
  pub premium_discount: Option<PremiumDiscountZone>,
  pub strong_weak: StrongWeakLevels,
  pub swing_trend: Trend,
  pub internal_trend: Trend,
}

impl SmcSnapshot {
  pub fn trend(&self, level: Level) -> Trend {
    match level {
      Level::Swing => self.swing_trend,
      Level::Internal => self.internal_trend,
    }
  }
}

/// Run the full pass over `bars`. `config` is assumed validated.
pub(crate) fn run<T: OHLC>(bars: &[T], config: &SmcConfig) -> Result<SmcSnapshot> {
  let profile =
    VolatilityProfile::compute(bars, Period::new(config.atr_period)?, config.order_block_filter);
  let mut pivots = PivotTracker::new(
    Period::new(config.swing_length)?,
    Period::new(config.internal_length)?,
    Period::new(config.equal_hl_length)?,
    Factor::new(config.equal_hl_threshold)?,
  );
  let mut structure = StructureBreakDetector::new();
  let mut blocks =
    OrderBlockManager::new(config.order_block_capacity(), config.order_block_mitigation);
  let mut gaps = FvgDetector::new(config.max_fair_value_gaps);

  debug!(bars = bars.len(), "smc pass started");

  for i in 0..bars.len() {
    if config.show_premium_discount {
      pivots.update_trailing(bars, i);
    }

    pivots.process(bars, i, PivotScale::Swing, profile.atr());
    pivots.process(bars, i, PivotScale::Internal, profile.atr());
    if config.show_equal_hl {
      pivots.process(bars, i, PivotScale::Equal, profile.atr());
    }

    for level in [Level::Internal, Level::Swing] {
      if !config.structure_enabled(level) {
        continue;
      }
      let breaks = structure.process(bars, i, level, pivots.pivots_mut(level.into()));
      if config.show_order_blocks {
        for b in breaks {
          blocks.create(bars, &profile, b.pivot_index, i, b.bias, b.level);
        }
      }
    }

    if config.show_order_blocks {
      blocks.check_mitigation(bars, i);
    }

    if config.show_fvg {
      gaps.detect(bars, i);
      gaps.check_fill(bars, i);
    }
  }

  let (swing_points, equal_highs_lows, trailing) = pivots.into_parts();
  let (structures, internal_trend, swing_trend) = structure.into_parts();

  let mut strong_weak = StrongWeakLevels::default();
  let mut zone = None;
  if config.show_premium_discount {
    if let Some(last) = bars.last() {
      zone = premium_discount(&trailing, last.time());
      update_strong_weak(&mut strong_weak, &trailing, swing_trend);
    }
  }

  let snapshot = SmcSnapshot {
    structures,
    swing_points,
    order_blocks: blocks.into_blocks(),
    fair_value_gaps: gaps.into_gaps(),
    equal_highs_lows,
    premium_discount: zone,
    strong_weak,
    swing_trend,
    internal_trend,
  };

  debug!(
    structures = snapshot.structures.len(),
    swing_points = snapshot.swing_points.len(),
    order_blocks = snapshot.order_blocks.len(),
    fair_value_gaps = snapshot.fair_value_gaps.len(),
    equal_highs_lows = snapshot.equal_highs_lows.len(),
    swing_trend = ?swing_trend,
    internal_trend = ?internal_trend,
    "smc pass finished"
  );

  Ok(snapshot)
}
