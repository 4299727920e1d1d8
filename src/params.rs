//! Parameter metadata for [`SmcConfig`]
//!
//! Exposes the numeric tunables of the engine so they can be documented, overridden from a
//! flat name/value map, or swept over a grid.
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use yasmc::prelude::*;
//!
//! for param in SmcConfig::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//!
//! let params = HashMap::from([("swing_length", 20.0), ("equal_hl_threshold", 0.2)]);
//! let config = SmcConfig::with_params(&params).unwrap();
//! assert_eq!(config.swing_length, 20);
//! ```

use std::collections::HashMap;

use crate::config::SmcConfig;
use crate::{Factor, Period, Result, SmcError};

// ============================================================
// PARAMETER TYPES
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Finite non-negative real
  Factor,
  /// Positive integer: a window length or a count
  Period,
}

/// Metadata for a single tunable
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Field name on [`SmcConfig`]
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Sweep range: (min, max, step)
  pub range: (f64, f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn factor(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Factor, default, range, description }
  }

  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  /// All values of the sweep range, inclusive of `max`
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    let mut values = Vec::new();
    let mut n = 0u32;
    loop {
      let v = min + step * f64::from(n);
      if v > max + f64::EPSILON {
        break;
      }
      values.push(v);
      n += 1;
    }
    values
  }

  /// Check `value` against the parameter type. The sweep range is advisory and not enforced.
  pub fn validate(&self, value: f64) -> Result<()> {
    match self.param_type {
      ParamType::Factor => Factor::new(value).map(|_| ()),
      ParamType::Period => {
        if !value.is_finite() || value < 1.0 || value.fract() != 0.0 {
          return Err(SmcError::OutOfRange { field: self.name, value, min: 1.0, max: f64::INFINITY });
        }
        Ok(())
      },
    }
  }
}

const SMC_PARAMS: &[ParamMeta] = &[
  ParamMeta::period("swing_length", 50.0, (10.0, 100.0, 10.0), "Pivot window of the swing scale"),
  ParamMeta::period("internal_length", 5.0, (2.0, 20.0, 1.0), "Pivot window of the internal scale"),
  ParamMeta::period("equal_hl_length", 3.0, (1.0, 10.0, 1.0), "Pivot window for equal highs/lows"),
  ParamMeta::factor(
    "equal_hl_threshold",
    0.1,
    (0.0, 0.5, 0.05),
    "Fraction of ATR within which two pivots are equal",
  ),
  ParamMeta::period("atr_period", 200.0, (20.0, 400.0, 20.0), "Wilder ATR period"),
  ParamMeta::period("max_order_blocks", 5.0, (1.0, 20.0, 1.0), "Order blocks to display"),
];

// ============================================================
// PARAMETERIZED TRAIT
// ============================================================

/// Types whose numeric tunables can be listed and overridden by name
pub trait Parameterized: Sized {
  fn param_meta() -> &'static [ParamMeta];

  /// Build from a name/value map. Missing names keep their defaults; unknown names are rejected.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;
}

impl Parameterized for SmcConfig {
  fn param_meta() -> &'static [ParamMeta] {
    SMC_PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    for (&name, &value) in params {
      meta_of(name)?.validate(value)?;
    }
    apply(&SmcConfig::default(), params)
  }
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

pub fn get_factor(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Factor> {
  let value = params.get(key).copied().unwrap_or(default);
  Factor::new(value)
}

pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  Period::new(value as usize)
}

/// Cartesian product of the sweep ranges of `names`, applied on top of `base`.
///
/// Meant to feed [`crate::analyze_parallel`]-style sweeps.
pub fn config_grid(base: &SmcConfig, names: &[&str]) -> Result<Vec<SmcConfig>> {
  let mut combos: Vec<HashMap<&str, f64>> = vec![HashMap::new()];
  for &name in names {
    let meta = meta_of(name)?;
    let grid = meta.generate_grid();
    combos = combos
      .into_iter()
      .flat_map(|combo| {
        grid.iter().map(move |&v| {
          let mut next = combo.clone();
          next.insert(meta.name, v);
          next
        })
      })
      .collect();
  }

  combos.into_iter().map(|combo| apply(base, &combo)).collect()
}

fn meta_of(name: &str) -> Result<&'static ParamMeta> {
  SMC_PARAMS
    .iter()
    .find(|m| m.name == name)
    .ok_or_else(|| SmcError::InvalidConfig(format!("unknown parameter: {name}")))
}

fn apply(base: &SmcConfig, params: &HashMap<&str, f64>) -> Result<SmcConfig> {
  let config = SmcConfig {
    swing_length: get_period(params, "swing_length", base.swing_length)?.get(),
    internal_length: get_period(params, "internal_length", base.internal_length)?.get(),
    equal_hl_length: get_period(params, "equal_hl_length", base.equal_hl_length)?.get(),
    equal_hl_threshold: get_factor(params, "equal_hl_threshold", base.equal_hl_threshold)?.get(),
    atr_period: get_period(params, "atr_period", base.atr_period)?.get(),
    max_order_blocks: get_period(params, "max_order_blocks", base.max_order_blocks)?.get(),
    ..base.clone()
  };
  config.validate()?;
  Ok(config)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_meta_defaults_match_config() {
    let config = SmcConfig::default();
    let default_of = |name: &str| SmcConfig::param_meta().iter().find(|m| m.name == name).unwrap().default;

    assert_eq!(default_of("swing_length"), config.swing_length as f64);
    assert_eq!(default_of("internal_length"), config.internal_length as f64);
    assert_eq!(default_of("equal_hl_length"), config.equal_hl_length as f64);
    assert_eq!(default_of("equal_hl_threshold"), config.equal_hl_threshold);
    assert_eq!(default_of("atr_period"), config.atr_period as f64);
    assert_eq!(default_of("max_order_blocks"), config.max_order_blocks as f64);
  }

  #[test]
  fn test_generate_grid() {
    let meta = ParamMeta::factor("test", 0.5, (0.3, 0.7, 0.2), "Test");

    let grid = meta.generate_grid();
    assert_eq!(grid.len(), 3);
    assert!((grid[0] - 0.3).abs() < 1e-12);
    assert!((grid[1] - 0.5).abs() < 1e-12);
    assert!((grid[2] - 0.7).abs() < 1e-12);
  }

  #[test]
  fn test_validate_by_type() {
    let period = ParamMeta::period("len", 5.0, (2.0, 20.0, 1.0), "Test");
    assert!(period.validate(3.0).is_ok());
    // Outside the sweep range but still a valid period
    assert!(period.validate(400.0).is_ok());
    assert!(period.validate(0.0).is_err());
    assert!(period.validate(2.5).is_err());

    let factor = ParamMeta::factor("thr", 0.1, (0.0, 0.5, 0.05), "Test");
    assert!(factor.validate(1.5).is_ok());
    assert!(factor.validate(-0.05).is_err());
    assert!(factor.validate(f64::NAN).is_err());
  }

  #[test]
  fn test_with_params_overrides() {
    let params = HashMap::from([("swing_length", 20.0), ("equal_hl_threshold", 0.25)]);
    let config = SmcConfig::with_params(&params).unwrap();

    assert_eq!(config.swing_length, 20);
    assert_eq!(config.equal_hl_threshold, 0.25);
    assert_eq!(config.internal_length, 5);
  }

  #[test]
  fn test_with_params_rejects_unknown_and_invalid() {
    let unknown = HashMap::from([("swing", 20.0)]);
    assert!(matches!(SmcConfig::with_params(&unknown), Err(SmcError::InvalidConfig(_))));

    let zero = HashMap::from([("internal_length", 0.0)]);
    assert!(SmcConfig::with_params(&zero).is_err());
  }

  #[test]
  fn test_config_grid_is_cartesian() {
    let base = SmcConfig { show_fvg: false, ..SmcConfig::default() };
    let grid = config_grid(&base, &["internal_length", "equal_hl_length"]).unwrap();

    assert_eq!(grid.len(), 19 * 10);
    assert!(grid.iter().all(|c| !c.show_fvg && c.swing_length == 50));
    assert_eq!((grid[0].internal_length, grid[0].equal_hl_length), (2, 1));
    assert_eq!((grid[11].internal_length, grid[11].equal_hl_length), (3, 2));
  }

  #[test]
  fn test_get_period_helper() {
    let params = HashMap::from([("key1", 20.0)]);
    assert_eq!(get_period(&params, "key1", 14).unwrap().get(), 20);
    assert_eq!(get_period(&params, "key2", 14).unwrap().get(), 14);
  }
}
