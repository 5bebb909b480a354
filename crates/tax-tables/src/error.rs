use thiserror::Error;

use crate::brackets::FilingStatus;

/// Error kinds surfaced by the tax engine.
///
/// Validation errors (`InvalidAmount`, `InvalidConfig`, `UnknownJurisdiction`,
/// `UnknownFilingStatus`) are returned to the immediate caller and must not be
/// retried by the engine. `BracketTableMissing` and `BracketCoverageGap` are
/// internal configuration defects and should be treated as fatal by the host.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaxError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid optimization config: {0}")]
    InvalidConfig(String),

    #[error("Unknown jurisdiction: {0}")]
    UnknownJurisdiction(String),

    #[error("Unknown filing status: {0}")]
    UnknownFilingStatus(String),

    #[error("No bracket table published for {filing_status} in tax year {tax_year}")]
    BracketTableMissing {
        filing_status: FilingStatus,
        tax_year: u16,
    },

    #[error("Bracket coverage gap: {0}")]
    BracketCoverageGap(String),

    #[error("Optimization search could not evaluate any candidate")]
    SearchExhausted,
}
