//! # YASMC - Yet Another Smart Money Concepts engine
//!
//! Single-pass market structure analysis for candlestick data: swing and internal pivots,
//! BOS/CHoCH structure breaks, order blocks, fair value gaps, equal highs/lows and
//! premium/discount zones.
//!
//! ## Quick Start
//!
//! ```rust
//! use yasmc::prelude::*;
//!
//! let bars: Vec<Candle> = (0..300)
//!     .map(|i| {
//!         let c = 100.0 + (i as f64 * 0.3).sin() * 5.0;
//!         Candle::new(i * 60, c, c + 1.0, c - 1.0, c + 0.2)
//!     })
//!     .collect();
//!
//! let mut engine = EngineBuilder::new()
//!     .swing_length(20)
//!     .internal_length(5)
//!     .build()
//!     .unwrap();
//!
//! engine.calculate(&bars).unwrap();
//!
//! let chochs = engine.structures(&StructureFilter::default().kind(StructureKind::Choch));
//! let live = engine.order_blocks(&OrderBlockFilter::active());
//! println!("{} CHoCH, {} live order blocks, swing trend {:?}",
//!     chochs.len(), live.len(), engine.trend(Level::Swing));
//! ```

pub mod config;
pub mod filter;
pub mod params;
pub mod smc;

pub use config::SmcConfig;
pub use smc::SmcSnapshot;

pub mod prelude {
    pub use crate::{
        // Parallel
        analyze,
        analyze_parallel,
        // Config
        config::SmcConfig,
        // Filters
        filter::{
            EqualHighLowFilter, FairValueGapFilter, OrderBlockFilter, StructureFilter,
            SwingPointFilter,
        },
        // Parameters
        params::{config_grid, get_factor, get_period, ParamMeta, ParamType, Parameterized},
        // Records
        smc::{
            EqualHighLow, EqualKind, ExtremeKind, FairValueGap, MitigationMode, OrderBlock,
            PremiumDiscountZone, SmcSnapshot, Strength, StrongWeakLevel, StructureEvent,
            StructureKind, SwingLabel, SwingPoint, SwingSide, VolatilityFilter,
        },
        AnalysisError,
        AnalysisResult,
        // Types
        Bias,
        Candle,
        // Engine
        EngineBuilder,
        EngineState,
        Factor,
        Level,
        OHLCExt,
        Period,
        Result,
        SmcEngine,
        // Errors
        SmcError,
        Trend,
        // Core traits
        OHLC,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, SmcError>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SmcError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid candle at index {index}: {reason}")]
    InvalidCandle { index: usize, reason: &'static str },

    #[error("Non-increasing time at index {index}: {current} after {previous}")]
    NonIncreasingTime {
        index: usize,
        previous: i64,
        current: i64,
    },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Finite non-negative multiplier
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Factor(f64);

impl Factor {
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(SmcError::InvalidValue("Factor cannot be NaN or infinite"));
        }
        if value < 0.0 {
            return Err(SmcError::OutOfRange {
                field: "Factor",
                value,
                min: 0.0,
                max: f64::INFINITY,
            });
        }
        Ok(Self(value))
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Factor {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Factor {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Factor::new(value).map_err(serde::de::Error::custom)
    }
}

/// Window length or count (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(SmcError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLC TRAITS
// ============================================================

/// Timestamped candle. Times are opaque integers that must increase along a series.
pub trait OHLC {
    fn time(&self) -> i64;
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
}

impl<T: OHLC + ?Sized> OHLC for &T {
    fn time(&self) -> i64 {
        (**self).time()
    }

    fn open(&self) -> f64 {
        (**self).open()
    }

    fn high(&self) -> f64 {
        (**self).high()
    }

    fn low(&self) -> f64 {
        (**self).low()
    }

    fn close(&self) -> f64 {
        (**self).close()
    }
}

pub trait OHLCExt: OHLC {
    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    /// Check price consistency of a single candle
    fn validate(&self) -> Result<()> {
        let prices = [self.open(), self.high(), self.low(), self.close()];
        if prices.iter().any(|p| p.is_nan()) {
            return Err(SmcError::InvalidCandle { index: 0, reason: "NaN price" });
        }
        if prices.iter().any(|p| p.is_infinite()) {
            return Err(SmcError::InvalidCandle { index: 0, reason: "infinite price" });
        }
        if self.high() < self.low() {
            return Err(SmcError::InvalidCandle { index: 0, reason: "high < low" });
        }
        if self.open() > self.high() || self.open() < self.low() {
            return Err(SmcError::InvalidCandle { index: 0, reason: "open outside high/low" });
        }
        if self.close() > self.high() || self.close() < self.low() {
            return Err(SmcError::InvalidCandle { index: 0, reason: "close outside high/low" });
        }
        Ok(())
    }
}

impl<T: OHLC + ?Sized> OHLCExt for T {}

/// Plain candle record
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
        }
    }
}

impl OHLC for Candle {
    fn time(&self) -> i64 {
        self.time
    }

    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }
}

// ============================================================
// DIRECTIONS
// ============================================================

/// Direction of a break, block or gap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bias {
    Bullish,
    Bearish,
}

impl Bias {
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Bias::Bullish => Bias::Bearish,
            Bias::Bearish => Bias::Bullish,
        }
    }
}

/// Structural level: short-horizon internal structure or long-horizon swing structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Internal,
    Swing,
}

/// Trend of one level, set by the last structure break at that level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    #[default]
    Neutral,
    Bullish,
    Bearish,
}

impl From<Bias> for Trend {
    fn from(bias: Bias) -> Self {
        match bias {
            Bias::Bullish => Trend::Bullish,
            Bias::Bearish => Trend::Bearish,
        }
    }
}

// ============================================================
// ENGINE
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    /// No results: freshly built, reset, or the last calculation failed
    Ready,
    /// Results of the last successful calculation are available
    Computed,
}

/// Smart Money Concepts engine.
///
/// Each [`calculate`](Self::calculate) replaces all previous results; the query methods read
/// the results of the last successful run.
#[derive(Debug, Clone)]
pub struct SmcEngine {
    config: SmcConfig,
    state: EngineState,
    snapshot: SmcSnapshot,
}

impl SmcEngine {
    pub fn new(config: SmcConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: EngineState::Ready,
            snapshot: SmcSnapshot::default(),
        })
    }

    pub fn with_defaults() -> Self {
        Self {
            config: SmcConfig::default(),
            state: EngineState::Ready,
            snapshot: SmcSnapshot::default(),
        }
    }

    pub fn config(&self) -> &SmcConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Drop all results and return to [`EngineState::Ready`]
    pub fn reset(&mut self) {
        self.snapshot = SmcSnapshot::default();
        self.state = EngineState::Ready;
    }

    /// Run the full pass over `bars`, replacing previous results.
    ///
    /// On error the engine is left reset.
    pub fn calculate<T: OHLC>(&mut self, bars: &[T]) -> Result<&SmcSnapshot> {
        self.reset();
        if self.config.validate_data {
            validate_bars(bars)?;
        }

        self.snapshot = smc::run(bars, &self.config)?;
        self.state = EngineState::Computed;
        Ok(&self.snapshot)
    }

    // ===========================================
    // Queries
    // ===========================================

    pub fn snapshot(&self) -> &SmcSnapshot {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> SmcSnapshot {
        self.snapshot
    }

    pub fn structures(&self, filter: &filter::StructureFilter) -> Vec<&smc::StructureEvent> {
        self.snapshot
            .structures
            .iter()
            .filter(|e| filter.matches(e))
            .collect()
    }

    pub fn swing_points(&self, filter: &filter::SwingPointFilter) -> Vec<&smc::SwingPoint> {
        self.snapshot
            .swing_points
            .iter()
            .filter(|p| filter.matches(p))
            .collect()
    }

    pub fn order_blocks(&self, filter: &filter::OrderBlockFilter) -> Vec<&smc::OrderBlock> {
        self.snapshot
            .order_blocks
            .iter()
            .filter(|b| filter.matches(b))
            .collect()
    }

    pub fn fair_value_gaps(&self, filter: &filter::FairValueGapFilter) -> Vec<&smc::FairValueGap> {
        self.snapshot
            .fair_value_gaps
            .iter()
            .filter(|g| filter.matches(g))
            .collect()
    }

    pub fn equal_highs_lows(&self, filter: &filter::EqualHighLowFilter) -> Vec<&smc::EqualHighLow> {
        self.snapshot
            .equal_highs_lows
            .iter()
            .filter(|e| filter.matches(e))
            .collect()
    }

    pub fn trend(&self, level: Level) -> Trend {
        self.snapshot.trend(level)
    }

    pub fn premium_discount(&self) -> Option<&smc::PremiumDiscountZone> {
        self.snapshot.premium_discount.as_ref()
    }

    pub fn strong_weak_levels(&self) -> &[smc::StrongWeakLevel] {
        self.snapshot.strong_weak.as_slice()
    }
}

impl Default for SmcEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn validate_bars<T: OHLC>(bars: &[T]) -> Result<()> {
    for (i, bar) in bars.iter().enumerate() {
        bar.validate().map_err(|e| match e {
            SmcError::InvalidCandle { reason, .. } => SmcError::InvalidCandle { index: i, reason },
            other => other,
        })?;
    }
    for (i, pair) in bars.windows(2).enumerate() {
        if pair[1].time() <= pair[0].time() {
            return Err(SmcError::NonIncreasingTime {
                index: i + 1,
                previous: pair[0].time(),
                current: pair[1].time(),
            });
        }
    }
    Ok(())
}

// ============================================================
// BUILDER
// ============================================================

/// Fluent construction of an [`SmcEngine`]; the configuration is validated by [`build`](Self::build)
#[derive(Debug, Clone, Default)]
pub struct EngineBuilder {
    config: SmcConfig,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: SmcConfig) -> Self {
        Self { config }
    }

    pub fn swing_length(mut self, length: usize) -> Self {
        self.config.swing_length = length;
        self
    }

    pub fn internal_length(mut self, length: usize) -> Self {
        self.config.internal_length = length;
        self
    }

    pub fn equal_hl_length(mut self, length: usize) -> Self {
        self.config.equal_hl_length = length;
        self
    }

    pub fn equal_hl_threshold(mut self, threshold: f64) -> Self {
        self.config.equal_hl_threshold = threshold;
        self
    }

    pub fn atr_period(mut self, period: usize) -> Self {
        self.config.atr_period = period;
        self
    }

    pub fn max_order_blocks(mut self, count: usize) -> Self {
        self.config.max_order_blocks = count;
        self
    }

    pub fn order_block_retention_factor(mut self, factor: usize) -> Self {
        self.config.order_block_retention_factor = factor;
        self
    }

    pub fn max_fair_value_gaps(mut self, cap: Option<usize>) -> Self {
        self.config.max_fair_value_gaps = cap;
        self
    }

    pub fn order_block_filter(mut self, filter: smc::VolatilityFilter) -> Self {
        self.config.order_block_filter = filter;
        self
    }

    pub fn order_block_mitigation(mut self, mode: smc::MitigationMode) -> Self {
        self.config.order_block_mitigation = mode;
        self
    }

    pub fn internal_structure(mut self, enable: bool) -> Self {
        self.config.show_internal_structure = enable;
        self
    }

    pub fn swing_structure(mut self, enable: bool) -> Self {
        self.config.show_swing_structure = enable;
        self
    }

    pub fn order_blocks(mut self, enable: bool) -> Self {
        self.config.show_order_blocks = enable;
        self
    }

    pub fn fair_value_gaps(mut self, enable: bool) -> Self {
        self.config.show_fvg = enable;
        self
    }

    pub fn equal_highs_lows(mut self, enable: bool) -> Self {
        self.config.show_equal_hl = enable;
        self
    }

    pub fn premium_discount(mut self, enable: bool) -> Self {
        self.config.show_premium_discount = enable;
        self
    }

    /// Enable/disable candle validation before each pass
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.config.validate_data = enable;
        self
    }

    pub fn build(self) -> Result<SmcEngine> {
        SmcEngine::new(self.config)
    }
}

// ============================================================
// PARALLEL ANALYSIS
// ============================================================

use rayon::prelude::*;

#[derive(Debug)]
pub struct AnalysisResult {
    pub symbol: String,
    pub snapshot: SmcSnapshot,
}

#[derive(Debug)]
pub struct AnalysisError {
    pub symbol: String,
    pub error: SmcError,
}

/// One-shot analysis of a single series with a fresh engine
pub fn analyze<T: OHLC>(config: &SmcConfig, bars: &[T]) -> Result<SmcSnapshot> {
    let mut engine = SmcEngine::new(config.clone())?;
    engine.calculate(bars)?;
    Ok(engine.into_snapshot())
}

/// Analyze many instruments in parallel, one engine per instrument
pub fn analyze_parallel<'a, T, I>(
    config: &SmcConfig,
    instruments: I,
) -> (Vec<AnalysisResult>, Vec<AnalysisError>)
where
    T: OHLC + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            analyze(config, bars)
                .map(|snapshot| AnalysisResult {
                    symbol: symbol.to_string(),
                    snapshot,
                })
                .map_err(|error| AnalysisError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================
