//! State Tax Adapter
//!
//! Wraps the bracket calculator with state-specific metadata: no-income-tax
//! states, flat and bracketed schedules, special deductions applied against
//! the computed tax, and per-state capital-gains treatment.
//!
//! State schedules are stored for a single filer; married-joint filers get
//! doubled thresholds (the common state pattern) and heads of household use
//! the single schedule.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::brackets::{BracketTable, FilingStatus, TaxBracket};
use crate::error::TaxError;

/// Holding-period class of a realized gain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapitalGainsType {
    ShortTerm,
    LongTerm,
}

/// How a state taxes one class of capital gains
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GainsTreatment {
    /// Gains are taxed as ordinary income through the state's brackets
    Ordinary,
    /// Gains are taxed at a flat rate regardless of other income
    FlatRate(Decimal),
    /// Gains are not taxed by the state
    Exempt,
}

/// Per-state capital-gains rules, one treatment per gains class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapitalGainsRules {
    pub short_term: GainsTreatment,
    pub long_term: GainsTreatment,
}

impl CapitalGainsRules {
    pub fn ordinary() -> Self {
        Self {
            short_term: GainsTreatment::Ordinary,
            long_term: GainsTreatment::Ordinary,
        }
    }

    pub fn exempt() -> Self {
        Self {
            short_term: GainsTreatment::Exempt,
            long_term: GainsTreatment::Exempt,
        }
    }

    pub fn treatment(&self, gains_type: CapitalGainsType) -> GainsTreatment {
        match gains_type {
            CapitalGainsType::ShortTerm => self.short_term,
            CapitalGainsType::LongTerm => self.long_term,
        }
    }
}

/// Tax profile for one state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTaxProfile {
    /// Two-letter uppercase state code
    pub state_code: String,
    pub state_name: String,
    pub has_income_tax: bool,
    /// Single-filer schedule; empty when the state has no income tax
    pub brackets: Vec<TaxBracket>,
    /// Named credits subtracted from the computed tax, floored at 0
    pub special_deductions: BTreeMap<String, Decimal>,
    pub capital_gains_rules: CapitalGainsRules,
}

impl StateTaxProfile {
    pub fn no_income_tax(state_code: &str, state_name: &str) -> Self {
        Self {
            state_code: state_code.to_string(),
            state_name: state_name.to_string(),
            has_income_tax: false,
            brackets: Vec::new(),
            special_deductions: BTreeMap::new(),
            capital_gains_rules: CapitalGainsRules::exempt(),
        }
    }

    pub fn flat(state_code: &str, state_name: &str, rate: Decimal) -> Self {
        Self {
            state_code: state_code.to_string(),
            state_name: state_name.to_string(),
            has_income_tax: true,
            brackets: vec![TaxBracket {
                rate,
                min_income: Decimal::ZERO,
                max_income: None,
                filing_status: FilingStatus::Single,
                tax_year: crate::federal::CURRENT_TAX_YEAR,
            }],
            special_deductions: BTreeMap::new(),
            capital_gains_rules: CapitalGainsRules::ordinary(),
        }
    }

    pub fn bracketed(
        state_code: &str,
        state_name: &str,
        spans: &[(Decimal, Decimal, Option<Decimal>)],
    ) -> Self {
        let brackets = spans
            .iter()
            .map(|&(rate, min_income, max_income)| TaxBracket {
                rate,
                min_income,
                max_income,
                filing_status: FilingStatus::Single,
                tax_year: crate::federal::CURRENT_TAX_YEAR,
            })
            .collect();
        Self {
            state_code: state_code.to_string(),
            state_name: state_name.to_string(),
            has_income_tax: true,
            brackets,
            special_deductions: BTreeMap::new(),
            capital_gains_rules: CapitalGainsRules::ordinary(),
        }
    }

    pub fn with_deduction(mut self, name: &str, amount: Decimal) -> Self {
        self.special_deductions.insert(name.to_string(), amount);
        self
    }

    pub fn with_gains_rules(mut self, rules: CapitalGainsRules) -> Self {
        self.capital_gains_rules = rules;
        self
    }

    /// Materialize the schedule for a filing status.
    ///
    /// Married-joint thresholds are doubled; other statuses use the stored
    /// single-filer schedule.
    pub fn table_for(&self, filing_status: FilingStatus) -> Result<BracketTable, TaxError> {
        let factor = match filing_status {
            FilingStatus::MarriedJoint => dec!(2),
            _ => Decimal::ONE,
        };
        let brackets = self
            .brackets
            .iter()
            .map(|bracket| TaxBracket {
                rate: bracket.rate,
                min_income: bracket.min_income * factor,
                max_income: bracket.max_income.map(|max| max * factor),
                filing_status,
                tax_year: bracket.tax_year,
            })
            .collect();
        BracketTable::new(brackets)
    }

    fn total_deductions(&self) -> Decimal {
        self.special_deductions.values().copied().sum()
    }
}

/// Registry of state tax profiles, looked up by uppercase two-letter code.
///
/// Unknown codes are an error, never a silent no-tax default.
#[derive(Debug, Clone)]
pub struct StateRegistry {
    profiles: HashMap<String, StateTaxProfile>,
}

impl Default for StateRegistry {
    fn default() -> Self {
        Self::with_builtin_profiles()
    }
}

impl StateRegistry {
    pub fn new() -> Self {
        Self {
            profiles: HashMap::new(),
        }
    }

    /// Registry preloaded with a representative set of 2024 state profiles.
    pub fn with_builtin_profiles() -> Self {
        let mut registry = Self::new();

        for (code, name) in [
            ("TX", "Texas"),
            ("FL", "Florida"),
            ("NV", "Nevada"),
            ("TN", "Tennessee"),
            ("SD", "South Dakota"),
            ("WY", "Wyoming"),
            ("AK", "Alaska"),
        ] {
            registry.register(StateTaxProfile::no_income_tax(code, name));
        }

        // No wage income tax, but a flat excise on long-term gains
        registry.register(
            StateTaxProfile::no_income_tax("WA", "Washington").with_gains_rules(
                CapitalGainsRules {
                    short_term: GainsTreatment::Exempt,
                    long_term: GainsTreatment::FlatRate(dec!(0.07)),
                },
            ),
        );

        for (code, name, rate) in [
            ("CO", "Colorado", dec!(0.0440)),
            ("IL", "Illinois", dec!(0.0495)),
            ("PA", "Pennsylvania", dec!(0.0307)),
            ("MA", "Massachusetts", dec!(0.0500)),
            ("AZ", "Arizona", dec!(0.0250)),
            ("NC", "North Carolina", dec!(0.0450)),
            ("MI", "Michigan", dec!(0.0425)),
        ] {
            registry.register(StateTaxProfile::flat(code, name, rate));
        }

        registry.register(
            StateTaxProfile::bracketed(
                "CA",
                "California",
                &[
                    (dec!(0.01), dec!(0), Some(dec!(10_412))),
                    (dec!(0.02), dec!(10_412), Some(dec!(24_684))),
                    (dec!(0.04), dec!(24_684), Some(dec!(38_959))),
                    (dec!(0.06), dec!(38_959), Some(dec!(54_081))),
                    (dec!(0.08), dec!(54_081), Some(dec!(68_350))),
                    (dec!(0.093), dec!(68_350), Some(dec!(349_137))),
                    (dec!(0.103), dec!(349_137), Some(dec!(418_961))),
                    (dec!(0.113), dec!(418_961), Some(dec!(698_271))),
                    (dec!(0.123), dec!(698_271), None),
                ],
            )
            .with_deduction("personal_exemption_credit", dec!(149)),
        );

        registry.register(StateTaxProfile::bracketed(
            "NY",
            "New York",
            &[
                (dec!(0.04), dec!(0), Some(dec!(8_500))),
                (dec!(0.045), dec!(8_500), Some(dec!(11_700))),
                (dec!(0.0525), dec!(11_700), Some(dec!(13_900))),
                (dec!(0.055), dec!(13_900), Some(dec!(80_650))),
                (dec!(0.06), dec!(80_650), Some(dec!(215_400))),
                (dec!(0.0685), dec!(215_400), Some(dec!(1_077_550))),
                (dec!(0.0965), dec!(1_077_550), None),
            ],
        ));

        registry.register(StateTaxProfile::bracketed(
            "OR",
            "Oregon",
            &[
                (dec!(0.0475), dec!(0), Some(dec!(4_300))),
                (dec!(0.0675), dec!(4_300), Some(dec!(10_750))),
                (dec!(0.0875), dec!(10_750), Some(dec!(125_000))),
                (dec!(0.099), dec!(125_000), None),
            ],
        ));

        registry.register(StateTaxProfile::bracketed(
            "MN",
            "Minnesota",
            &[
                (dec!(0.0535), dec!(0), Some(dec!(31_690))),
                (dec!(0.068), dec!(31_690), Some(dec!(104_090))),
                (dec!(0.0785), dec!(104_090), Some(dec!(193_240))),
                (dec!(0.0985), dec!(193_240), None),
            ],
        ));

        registry.register(StateTaxProfile::bracketed(
            "NJ",
            "New Jersey",
            &[
                (dec!(0.014), dec!(0), Some(dec!(20_000))),
                (dec!(0.0175), dec!(20_000), Some(dec!(35_000))),
                (dec!(0.035), dec!(35_000), Some(dec!(40_000))),
                (dec!(0.05525), dec!(40_000), Some(dec!(75_000))),
                (dec!(0.0637), dec!(75_000), Some(dec!(500_000))),
                (dec!(0.0897), dec!(500_000), Some(dec!(1_000_000))),
                (dec!(0.1075), dec!(1_000_000), None),
            ],
        ));

        registry
    }

    pub fn register(&mut self, profile: StateTaxProfile) {
        self.profiles
            .insert(profile.state_code.to_ascii_uppercase(), profile);
    }

    pub fn profile(&self, state_code: &str) -> Result<&StateTaxProfile, TaxError> {
        let code = state_code.trim().to_ascii_uppercase();
        self.profiles
            .get(&code)
            .ok_or(TaxError::UnknownJurisdiction(code))
    }

    /// State tax owed on `income`: bracket tax minus special deductions,
    /// floored at 0. No-income-tax states short-circuit to 0.
    pub fn compute_state_tax(
        &self,
        income: Decimal,
        state_code: &str,
        filing_status: FilingStatus,
    ) -> Result<Decimal, TaxError> {
        let profile = self.profile(state_code)?;
        if !profile.has_income_tax {
            return Ok(Decimal::ZERO);
        }
        let outcome = profile.table_for(filing_status)?.compute(income)?;
        let tax = (outcome.tax - profile.total_deductions()).max(Decimal::ZERO);
        Ok(tax.round_dp(2))
    }

    /// Marginal rate of the state bracket containing `income` (0 for
    /// no-income-tax states).
    pub fn marginal_rate(
        &self,
        income: Decimal,
        state_code: &str,
        filing_status: FilingStatus,
    ) -> Result<Decimal, TaxError> {
        let profile = self.profile(state_code)?;
        if !profile.has_income_tax {
            return Ok(Decimal::ZERO);
        }
        Ok(profile.table_for(filing_status)?.compute(income)?.marginal_rate)
    }

    /// Post-deduction effective rate, `tax / income` (0 when income is 0).
    pub fn effective_rate(
        &self,
        income: Decimal,
        state_code: &str,
        filing_status: FilingStatus,
    ) -> Result<Decimal, TaxError> {
        let tax = self.compute_state_tax(income, state_code, filing_status)?;
        if income.is_zero() {
            return Ok(Decimal::ZERO);
        }
        Ok((tax / income).round_dp(4))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_income_tax_state_is_zero() {
        let registry = StateRegistry::default();
        let tax = registry
            .compute_state_tax(dec!(50000), "TX", FilingStatus::Single)
            .unwrap();
        assert_eq!(tax, Decimal::ZERO);
    }

    #[test]
    fn test_unknown_state_is_an_error() {
        let registry = StateRegistry::default();
        let err = registry
            .compute_state_tax(dec!(50000), "ZZ", FilingStatus::Single)
            .unwrap_err();
        assert_eq!(err, TaxError::UnknownJurisdiction("ZZ".to_string()));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = StateRegistry::default();
        assert!(registry.profile("ca").is_ok());
        assert!(registry.profile(" ny ").is_ok());
    }

    #[test]
    fn test_flat_state() {
        let registry = StateRegistry::default();
        let tax = registry
            .compute_state_tax(dec!(100000), "IL", FilingStatus::Single)
            .unwrap();
        assert_eq!(tax, dec!(4950.00));
        assert_eq!(
            registry
                .marginal_rate(dec!(100000), "IL", FilingStatus::Single)
                .unwrap(),
            dec!(0.0495)
        );
    }

    #[test]
    fn test_deductions_reduce_tax() {
        let registry = StateRegistry::default();
        let profile = registry.profile("CA").unwrap();
        let gross = profile
            .table_for(FilingStatus::Single)
            .unwrap()
            .compute(dec!(60000))
            .unwrap()
            .tax;
        let net = registry
            .compute_state_tax(dec!(60000), "CA", FilingStatus::Single)
            .unwrap();
        assert_eq!(net, gross - dec!(149));
    }

    #[test]
    fn test_deductions_floor_at_zero() {
        let mut registry = StateRegistry::new();
        registry.register(
            StateTaxProfile::flat("XX", "Testland", dec!(0.01))
                .with_deduction("big_credit", dec!(10_000)),
        );
        let tax = registry
            .compute_state_tax(dec!(1000), "XX", FilingStatus::Single)
            .unwrap();
        assert_eq!(tax, Decimal::ZERO);
    }

    #[test]
    fn test_married_joint_doubles_thresholds() {
        let registry = StateRegistry::default();
        let single = registry
            .compute_state_tax(dec!(100000), "CA", FilingStatus::Single)
            .unwrap();
        let joint = registry
            .compute_state_tax(dec!(100000), "CA", FilingStatus::MarriedJoint)
            .unwrap();
        assert!(joint < single);
    }

    #[test]
    fn test_profile_serialization_round_trip() {
        let registry = StateRegistry::default();
        let profile = registry.profile("CA").unwrap();
        let json = serde_json::to_string(profile).unwrap();
        let back: StateTaxProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(*profile, back);
    }

    #[test]
    fn test_washington_gains_treatment() {
        let registry = StateRegistry::default();
        let profile = registry.profile("WA").unwrap();
        assert_eq!(
            profile.capital_gains_rules.treatment(CapitalGainsType::LongTerm),
            GainsTreatment::FlatRate(dec!(0.07))
        );
        assert_eq!(
            profile.capital_gains_rules.treatment(CapitalGainsType::ShortTerm),
            GainsTreatment::Exempt
        );
    }
}
