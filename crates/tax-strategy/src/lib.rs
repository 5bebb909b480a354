//! Tax Strategy
//!
//! Risk- and time-adjusted optimization of Roth conversion and
//! capital-gains realization amounts over the progressive bracket tables in
//! `tax-tables`. The engine is pure and synchronous: every entry point is a
//! deterministic mapping from validated inputs to outputs, safe to run in
//! parallel across distinct inputs.

pub mod cache;
pub mod capital_gains;
pub mod config;
pub mod optimizer;
pub mod roth;
pub mod types;

pub use cache::{NoopCache, ResultCache, TtlCache};
pub use capital_gains::{CapitalGainsCalculator, RealizationThresholds};
pub use config::OptimizationConfig;
pub use optimizer::TaxStrategyOptimizer;
pub use roth::{
    RothConversionCalculator, RothConversionOutcome, ASSUMED_GROWTH_RATE, MAX_CONVERSION,
    MIN_CONVERSION,
};
pub use types::{
    CalculationParameters, CombinedOptimizationResult, OptimizationResult, ScenarioSample,
    TaxCalculationResult,
};

pub use tax_tables::{CapitalGainsType, FilingStatus, StateRegistry, TaxError};
