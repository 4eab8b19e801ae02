//! Loan repayment schedule and debt-ratio analysis.
//!
//! The loan is a constant-installment mortgage, optionally preceded by an
//! interest-only deferral ("différé partiel"). Borrower insurance is charged
//! as a constant monthly premium on the initial capital.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use jeanbrun_core::calculations::{FinancingAnalyzer, FinancingInput};
//!
//! let analyzer = FinancingAnalyzer::new(dec!(0.35));
//! let result = analyzer
//!     .analyze(&FinancingInput {
//!         loan_amount: dec!(120000),
//!         annual_rate: dec!(0),
//!         duration_years: 20,
//!         differe_months: 0,
//!         insurance_rate: dec!(0),
//!     })
//!     .unwrap();
//!
//! assert_eq!(result.mensualite, dec!(500.00));
//! assert_eq!(result.nombre_mois, 240);
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::TaxYearConfig;
use crate::calculations::common::{
    compound, max, ratio_or_zero, round_half_up, round_up_to_cent,
};
use crate::error::{ValidationError, ensure_amount, ensure_rate};

/// Longest loan accepted, in years.
pub const MAX_LOAN_YEARS: u32 = 30;

/// Longest interest-only deferral accepted, in months.
pub const MAX_DEFERRAL_MONTHS: u32 = 36;

const MONTHS_PER_YEAR: u32 = 12;

/// Loan terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancingInput {
    pub loan_amount: Decimal,
    pub annual_rate: Decimal,
    /// Amortizing period, deferral excluded.
    pub duration_years: u32,
    #[serde(default)]
    pub differe_months: u32,
    #[serde(default)]
    pub insurance_rate: Decimal,
}

/// One monthly installment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanPeriodRow {
    /// 1-based month index, deferral included.
    pub month: u32,
    /// Interest plus principal, insurance excluded.
    pub payment: Decimal,
    pub interest: Decimal,
    pub principal: Decimal,
    pub insurance: Decimal,
    pub remaining_balance: Decimal,
}

/// Installments of one loan year, summed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanYearRow {
    pub year: u32,
    pub payment: Decimal,
    pub interest: Decimal,
    pub principal: Decimal,
    pub insurance: Decimal,
    /// Balance after the year's last installment.
    pub remaining_balance: Decimal,
}

/// Full loan analysis.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancingResult {
    /// Amortizing installment, insurance excluded.
    pub mensualite: Decimal,
    /// Interest-only installment during the deferral, zero without deferral.
    pub mensualite_differe: Decimal,
    pub assurance_mensuelle: Decimal,
    pub cout_total_interets: Decimal,
    pub cout_total_assurance: Decimal,
    pub nombre_mois: u32,
    pub tableau_amortissement: Vec<LoanPeriodRow>,
    pub annual: Vec<LoanYearRow>,
}

impl FinancingResult {
    /// Installment plus insurance.
    pub fn mensualite_totale(&self) -> Decimal {
        self.mensualite + self.assurance_mensuelle
    }

    /// Interest paid during loan year `year` (1-based), zero past the end.
    pub fn interets_par_annee(
        &self,
        year: u32,
    ) -> Decimal {
        self.year_row(year).map_or(Decimal::ZERO, |row| row.interest)
    }

    /// Installments plus insurance paid during loan year `year`.
    pub fn annuite(
        &self,
        year: u32,
    ) -> Decimal {
        self.year_row(year)
            .map_or(Decimal::ZERO, |row| row.payment + row.insurance)
    }

    fn year_row(
        &self,
        year: u32,
    ) -> Option<&LoanYearRow> {
        self.annual.iter().find(|row| row.year == year)
    }
}

/// Monthly debt load against the 35% ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtRatioAnalysis {
    /// New installment with insurance plus existing repayments.
    pub charges_mensuelles: Decimal,
    pub revenus_mensuels: Decimal,
    /// Zero when there is no income.
    pub taux_endettement: Decimal,
    pub taux_max: Decimal,
    pub within_limit: bool,
    /// Monthly income left after repayments, floored at zero.
    pub reste_a_vivre: Decimal,
}

/// Builds repayment schedules and checks affordability.
#[derive(Debug, Clone)]
pub struct FinancingAnalyzer {
    max_debt_ratio: Decimal,
}

impl FinancingAnalyzer {
    pub fn new(max_debt_ratio: Decimal) -> Self {
        Self { max_debt_ratio }
    }

    pub fn from_tax_year_config(config: &TaxYearConfig) -> Self {
        Self::new(config.max_debt_ratio)
    }

    /// Builds the monthly schedule and its yearly summary.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if:
    /// - the loan amount is negative
    /// - a rate is outside `[0, 1]`
    /// - the duration exceeds 30 years or the deferral 36 months
    /// - a positive amount is borrowed over zero years
    pub fn analyze(
        &self,
        input: &FinancingInput,
    ) -> Result<FinancingResult, ValidationError> {
        self.validate(input)?;

        if input.loan_amount.is_zero() {
            debug!("no loan, empty schedule");
            return Ok(FinancingResult::default());
        }

        let principal = input.loan_amount;
        let monthly_rate = input.annual_rate / Decimal::from(MONTHS_PER_YEAR);
        let amortizing_months = input.duration_years * MONTHS_PER_YEAR;

        let mensualite = Self::installment(principal, monthly_rate, amortizing_months);
        let mensualite_differe = if input.differe_months > 0 {
            round_half_up(principal * monthly_rate)
        } else {
            Decimal::ZERO
        };
        let assurance_mensuelle =
            round_half_up(principal * input.insurance_rate / Decimal::from(MONTHS_PER_YEAR));

        let tableau_amortissement = Self::monthly_rows(
            principal,
            monthly_rate,
            mensualite,
            assurance_mensuelle,
            input.differe_months,
            amortizing_months,
        );
        let annual = Self::yearly_rows(&tableau_amortissement);

        let nombre_mois = tableau_amortissement.len() as u32;
        let cout_total_interets: Decimal = tableau_amortissement.iter().map(|r| r.interest).sum();
        let cout_total_assurance = assurance_mensuelle * Decimal::from(nombre_mois);

        debug!(
            principal = %principal,
            mensualite = %mensualite,
            months = nombre_mois,
            interest = %cout_total_interets,
            "loan schedule built"
        );

        Ok(FinancingResult {
            mensualite,
            mensualite_differe,
            assurance_mensuelle,
            cout_total_interets,
            cout_total_assurance,
            nombre_mois,
            tableau_amortissement,
            annual,
        })
    }

    /// Compares the household's monthly repayments with its income.
    pub fn debt_ratio(
        &self,
        new_monthly_payment: Decimal,
        existing_monthly_debt: Decimal,
        monthly_income: Decimal,
    ) -> DebtRatioAnalysis {
        let charges_mensuelles = new_monthly_payment + existing_monthly_debt;
        let exact_ratio = ratio_or_zero(charges_mensuelles, monthly_income);
        let taux_endettement = exact_ratio.round_dp(4);
        let within_limit = if monthly_income.is_zero() {
            charges_mensuelles.is_zero()
        } else {
            exact_ratio <= self.max_debt_ratio
        };
        let reste_a_vivre = max(monthly_income - charges_mensuelles, Decimal::ZERO);

        if !within_limit {
            warn!(
                taux_endettement = %taux_endettement,
                taux_max = %self.max_debt_ratio,
                "debt ratio above ceiling"
            );
        }

        DebtRatioAnalysis {
            charges_mensuelles,
            revenus_mensuels: monthly_income,
            taux_endettement,
            taux_max: self.max_debt_ratio,
            within_limit,
            reste_a_vivre,
        }
    }

    fn validate(
        &self,
        input: &FinancingInput,
    ) -> Result<(), ValidationError> {
        ensure_amount("loan_amount", input.loan_amount)?;
        ensure_rate("annual_rate", input.annual_rate)?;
        ensure_rate("insurance_rate", input.insurance_rate)?;
        if input.duration_years > MAX_LOAN_YEARS {
            return Err(ValidationError::DurationTooLong {
                field: "duration_years",
                value: input.duration_years,
                max: MAX_LOAN_YEARS,
            });
        }
        if input.differe_months > MAX_DEFERRAL_MONTHS {
            return Err(ValidationError::DeferralTooLong {
                value: input.differe_months,
                max: MAX_DEFERRAL_MONTHS,
            });
        }
        if input.loan_amount > Decimal::ZERO && input.duration_years == 0 {
            return Err(ValidationError::ZeroLoanDuration);
        }
        Ok(())
    }

    /// `P·r / (1 − (1 + r)^−n)`, or `P / n` at zero rate, rounded up to the cent.
    fn installment(
        principal: Decimal,
        monthly_rate: Decimal,
        months: u32,
    ) -> Decimal {
        if monthly_rate.is_zero() {
            return round_up_to_cent(principal / Decimal::from(months));
        }
        let discount = Decimal::ONE / compound(monthly_rate, months);
        round_up_to_cent(principal * monthly_rate / (Decimal::ONE - discount))
    }

    /// Deferral months first, then amortizing months. The last installment
    /// settles whatever balance remains.
    fn monthly_rows(
        principal: Decimal,
        monthly_rate: Decimal,
        mensualite: Decimal,
        insurance: Decimal,
        differe_months: u32,
        amortizing_months: u32,
    ) -> Vec<LoanPeriodRow> {
        let mut rows = Vec::with_capacity((differe_months + amortizing_months) as usize);
        let mut balance = principal;

        for month in 1..=differe_months {
            let interest = round_half_up(balance * monthly_rate);
            rows.push(LoanPeriodRow {
                month,
                payment: interest,
                interest,
                principal: Decimal::ZERO,
                insurance,
                remaining_balance: balance,
            });
        }

        for index in 1..=amortizing_months {
            if balance.is_zero() {
                break;
            }
            let interest = round_half_up(balance * monthly_rate);
            let principal_part = if index == amortizing_months {
                balance
            } else {
                (mensualite - interest).min(balance)
            };
            balance -= principal_part;
            rows.push(LoanPeriodRow {
                month: differe_months + index,
                payment: interest + principal_part,
                interest,
                principal: principal_part,
                insurance,
                remaining_balance: balance,
            });
        }

        rows
    }

    fn yearly_rows(monthly: &[LoanPeriodRow]) -> Vec<LoanYearRow> {
        monthly
            .chunks(MONTHS_PER_YEAR as usize)
            .enumerate()
            .map(|(i, chunk)| LoanYearRow {
                year: i as u32 + 1,
                payment: chunk.iter().map(|r| r.payment).sum(),
                interest: chunk.iter().map(|r| r.interest).sum(),
                principal: chunk.iter().map(|r| r.principal).sum(),
                insurance: chunk.iter().map(|r| r.insurance).sum(),
                remaining_balance: chunk
                    .last()
                    .map_or(Decimal::ZERO, |r| r.remaining_balance),
            })
            .collect()
    }
}
