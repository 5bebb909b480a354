//! Tax Tables
//!
//! Progressive bracket model, 2024 federal tables, and state tax profiles.
//! All monetary values are `rust_decimal::Decimal` end-to-end.

pub mod brackets;
pub mod error;
pub mod federal;
pub mod state;

pub use brackets::{BracketTable, BracketTaxOutcome, FilingStatus, TaxBracket};
pub use error::TaxError;
pub use federal::{compute_federal_tax, federal_table, CURRENT_TAX_YEAR};
pub use state::{
    CapitalGainsRules, CapitalGainsType, GainsTreatment, StateRegistry, StateTaxProfile,
};
