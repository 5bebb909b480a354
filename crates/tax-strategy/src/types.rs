//! Shared result types
//!
//! Calculation results are immutable snapshots of their inputs; nothing in
//! the engine mutates a result after construction.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tax_tables::{FilingStatus, TaxBracket};

/// Inputs assembled by the orchestration layer for one optimization call.
///
/// `roth_ira_balance` is carried through for downstream display; the
/// optimization itself only reads the traditional balance and gains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationParameters {
    pub traditional_ira_balance: Decimal,
    pub roth_ira_balance: Decimal,
    pub capital_gains: Decimal,
    /// Two-letter state code, matched case-insensitively
    pub tax_state: String,
    pub filing_status: FilingStatus,
}

/// Marginal tax impact of an incremental amount on top of a base income
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxCalculationResult {
    /// Federal tax delta, rounded to cents
    pub federal_tax_impact: Decimal,
    /// State tax delta, rounded to cents
    pub state_tax_impact: Decimal,
    /// Total impact divided by the incremental amount (0 when the amount is 0)
    pub effective_tax_rate: Decimal,
    /// Rate of the federal bracket containing the post-increment income
    pub marginal_tax_rate: Decimal,
    /// Post-increment taxable income
    pub taxable_income: Decimal,
    /// Federal brackets touched at the post-increment income
    pub applicable_brackets: Vec<TaxBracket>,
}

impl TaxCalculationResult {
    pub fn total_impact(&self) -> Decimal {
        self.federal_tax_impact + self.state_tax_impact
    }

    /// All-zero impact snapshot, used when a strategy leg is not applicable.
    pub fn zero(taxable_income: Decimal) -> Self {
        Self {
            federal_tax_impact: Decimal::ZERO,
            state_tax_impact: Decimal::ZERO,
            effective_tax_rate: Decimal::ZERO,
            marginal_tax_rate: Decimal::ZERO,
            taxable_income,
            applicable_brackets: Vec::new(),
        }
    }
}

/// One evaluated (amount, savings) sample from an optimization search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSample {
    pub amount: Decimal,
    pub savings: Decimal,
}

/// Outcome of optimizing a single strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub recommended_amount: Decimal,
    pub tax_impact: TaxCalculationResult,
    /// Present value of the strategy's savings at the recommended amount
    pub npv_savings: Decimal,
    /// Effective-rate gap versus acting on the full available amount,
    /// multiplied by the recommended amount
    pub potential_savings: Decimal,
    /// Candidates evaluated during the search, in evaluation order
    pub alternative_scenarios: Vec<ScenarioSample>,
}

impl OptimizationResult {
    /// Result for a strategy with nothing to optimize (zero balance/gains).
    pub fn not_applicable(base_income: Decimal) -> Self {
        Self {
            recommended_amount: Decimal::ZERO,
            tax_impact: TaxCalculationResult::zero(base_income),
            npv_savings: Decimal::ZERO,
            potential_savings: Decimal::ZERO,
            alternative_scenarios: Vec::new(),
        }
    }
}

/// Combined outcome across both strategies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedOptimizationResult {
    pub roth_conversion: OptimizationResult,
    pub capital_gains: OptimizationResult,
    /// Sum of both strategies' `npv_savings`
    pub combined_savings: Decimal,
    /// `combined_savings` scaled by the risk factor `(6 - risk_tolerance)/5`
    pub risk_adjusted_score: Decimal,
}
