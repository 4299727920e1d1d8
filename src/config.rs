//! Engine configuration

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::smc::{MitigationMode, VolatilityFilter};
use crate::{Factor, Level, Result, SmcError};

/// Tunables for one [`crate::SmcEngine`]. Field names serialize in camelCase; missing
/// fields take their defaults. Deserialization runs [`SmcConfig::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, remote = "Self")]
pub struct SmcConfig {
    /// Pivot window of the swing scale
    pub swing_length: usize,
    /// Pivot window of the internal scale
    pub internal_length: usize,
    pub show_internal_structure: bool,
    pub show_swing_structure: bool,
    pub show_order_blocks: bool,
    /// Order blocks a renderer is expected to show
    pub max_order_blocks: usize,
    /// Order blocks retained = `max_order_blocks * order_block_retention_factor`
    pub order_block_retention_factor: usize,
    #[serde(rename = "showFVG")]
    pub show_fvg: bool,
    /// Newest gaps retained; `None` keeps all
    pub max_fair_value_gaps: Option<usize>,
    #[serde(rename = "showEqualHL")]
    pub show_equal_hl: bool,
    #[serde(rename = "equalHLLength")]
    pub equal_hl_length: usize,
    /// Fraction of ATR within which two pivots count as equal
    #[serde(rename = "equalHLThreshold")]
    pub equal_hl_threshold: f64,
    pub show_premium_discount: bool,
    pub order_block_filter: VolatilityFilter,
    pub order_block_mitigation: MitigationMode,
    pub atr_period: usize,
    /// Reject malformed candles before the pass
    pub validate_data: bool,
}

impl Default for SmcConfig {
    fn default() -> Self {
        Self {
            swing_length: 50,
            internal_length: 5,
            show_internal_structure: true,
            show_swing_structure: true,
            show_order_blocks: true,
            max_order_blocks: 5,
            order_block_retention_factor: 4,
            show_fvg: true,
            max_fair_value_gaps: None,
            show_equal_hl: true,
            equal_hl_length: 3,
            equal_hl_threshold: 0.1,
            show_premium_discount: true,
            order_block_filter: VolatilityFilter::Atr,
            order_block_mitigation: MitigationMode::HighLow,
            atr_period: 200,
            validate_data: false,
        }
    }
}

impl SmcConfig {
    /// Check every field, naming the first one that is out of range
    pub fn validate(&self) -> Result<()> {
        require_positive("swing_length", self.swing_length)?;
        require_positive("internal_length", self.internal_length)?;
        require_positive("equal_hl_length", self.equal_hl_length)?;
        require_positive("atr_period", self.atr_period)?;
        require_positive("max_order_blocks", self.max_order_blocks)?;
        require_positive("order_block_retention_factor", self.order_block_retention_factor)?;
        if let Some(cap) = self.max_fair_value_gaps {
            require_positive("max_fair_value_gaps", cap)?;
        }

        Factor::new(self.equal_hl_threshold).map_err(|e| match e {
            SmcError::OutOfRange { value, min, max, .. } => SmcError::OutOfRange {
                field: "equal_hl_threshold",
                value,
                min,
                max,
            },
            _ => SmcError::InvalidConfig("equal_hl_threshold must be finite".to_string()),
        })?;

        Ok(())
    }

    /// Number of order blocks kept in memory
    #[inline]
    pub fn order_block_capacity(&self) -> usize {
        self.max_order_blocks
            .saturating_mul(self.order_block_retention_factor)
    }

    #[inline]
    pub fn structure_enabled(&self, level: Level) -> bool {
        match level {
            Level::Internal => self.show_internal_structure,
            Level::Swing => self.show_swing_structure,
        }
    }
}

impl Serialize for SmcConfig {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        SmcConfig::serialize(self, s)
    }
}

impl<'de> Deserialize<'de> for SmcConfig {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let config = SmcConfig::deserialize(d)?;
        config.validate().map_err(serde::de::Error::custom)?;
        Ok(config)
    }
}

fn require_positive(field: &'static str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(SmcError::InvalidConfig(format!("{field} must be > 0")));
    }
    Ok(())
}
