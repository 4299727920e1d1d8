//! Query filters over the result collections of a [`crate::SmcEngine`].
//!
//! Every field is optional; an unset field matches everything.

use crate::smc::{
  EqualHighLow, EqualKind, FairValueGap, OrderBlock, StructureEvent, StructureKind, SwingLabel,
  SwingPoint, SwingSide,
};
use crate::{Bias, Level};

#[inline]
fn accepts<T: PartialEq>(wanted: Option<T>, actual: T) -> bool {
  wanted.map_or(true, |w| w == actual)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StructureFilter {
  pub level: Option<Level>,
  pub direction: Option<Bias>,
  pub kind: Option<StructureKind>,
}

impl StructureFilter {
  pub fn level(mut self, level: Level) -> Self {
    self.level = Some(level);
    self
  }

  pub fn direction(mut self, direction: Bias) -> Self {
    self.direction = Some(direction);
    self
  }

  pub fn kind(mut self, kind: StructureKind) -> Self {
    self.kind = Some(kind);
    self
  }

  pub fn matches(&self, event: &StructureEvent) -> bool {
    accepts(self.level, event.level)
      && accepts(self.direction, event.direction)
      && accepts(self.kind, event.kind)
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwingPointFilter {
  pub label: Option<SwingLabel>,
  pub side: Option<SwingSide>,
}

impl SwingPointFilter {
  pub fn label(mut self, label: SwingLabel) -> Self {
    self.label = Some(label);
    self
  }

  pub fn side(mut self, side: SwingSide) -> Self {
    self.side = Some(side);
    self
  }

  pub fn matches(&self, point: &SwingPoint) -> bool {
    accepts(self.label, point.label) && accepts(self.side, point.side)
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderBlockFilter {
  pub level: Option<Level>,
  pub bias: Option<Bias>,
  pub mitigated: Option<bool>,
}

impl OrderBlockFilter {
  pub fn level(mut self, level: Level) -> Self {
    self.level = Some(level);
    self
  }

  pub fn bias(mut self, bias: Bias) -> Self {
    self.bias = Some(bias);
    self
  }

  pub fn mitigated(mut self, mitigated: bool) -> Self {
    self.mitigated = Some(mitigated);
    self
  }

  /// Only blocks still live
  pub fn active() -> Self {
    Self::default().mitigated(false)
  }

  pub fn matches(&self, block: &OrderBlock) -> bool {
    accepts(self.level, block.level)
      && accepts(self.bias, block.bias)
      && accepts(self.mitigated, block.mitigated)
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FairValueGapFilter {
  pub bias: Option<Bias>,
  pub filled: Option<bool>,
}

impl FairValueGapFilter {
  pub fn bias(mut self, bias: Bias) -> Self {
    self.bias = Some(bias);
    self
  }

  pub fn filled(mut self, filled: bool) -> Self {
    self.filled = Some(filled);
    self
  }

  /// Only gaps not yet traded through
  pub fn open() -> Self {
    Self::default().filled(false)
  }

  pub fn matches(&self, gap: &FairValueGap) -> bool {
    accepts(self.bias, gap.bias) && accepts(self.filled, gap.filled)
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EqualHighLowFilter {
  pub kind: Option<EqualKind>,
}

impl EqualHighLowFilter {
  pub fn kind(mut self, kind: EqualKind) -> Self {
    self.kind = Some(kind);
    self
  }

  pub fn matches(&self, eq: &EqualHighLow) -> bool {
    accepts(self.kind, eq.kind)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn event(level: Level, direction: Bias, kind: StructureKind) -> StructureEvent {
    StructureEvent { time: 0, price: 1.0, kind, direction, level, start_time: 0 }
  }

  #[test]
  fn test_default_matches_all() {
    let filter = StructureFilter::default();
    assert!(filter.matches(&event(Level::Swing, Bias::Bullish, StructureKind::Bos)));
    assert!(filter.matches(&event(Level::Internal, Bias::Bearish, StructureKind::Choch)));
  }

  #[test]
  fn test_fields_combine() {
    let filter = StructureFilter::default().level(Level::Swing).kind(StructureKind::Choch);
    assert!(filter.matches(&event(Level::Swing, Bias::Bearish, StructureKind::Choch)));
    assert!(!filter.matches(&event(Level::Internal, Bias::Bearish, StructureKind::Choch)));
    assert!(!filter.matches(&event(Level::Swing, Bias::Bearish, StructureKind::Bos)));
  }

  #[test]
  fn test_active_order_blocks() {
    let block = OrderBlock {
      time: 0,
      high: 2.0,
      low: 1.0,
      bias: Bias::Bullish,
      level: Level::Internal,
      mitigated: false,
      mitigated_time: None,
    };
    assert!(OrderBlockFilter::active().matches(&block));
    assert!(!OrderBlockFilter::active().matches(&OrderBlock { mitigated: true, ..block }));
    assert!(!OrderBlockFilter::default().bias(Bias::Bearish).matches(&block));
  }
}
