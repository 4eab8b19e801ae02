//! LMNP (furnished rental) regime comparison.
//!
//! Runs the holding period year by year under Micro-BIC and under the réel
//! regime and keeps the one with the lower total tax. Under réel, the building
//! components, the renovation works and the furniture are depreciated; the
//! depreciation may not turn the result into a deficit, so the unused part is
//! carried forward to later years.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::calculations::MAX_HOLDING_YEARS;
use crate::calculations::amortization::{AmortizationSchedule, straight_line};
use crate::calculations::common::{max, ratio_or_zero, round_half_up};
use crate::calculations::income_tax::{IncomeTaxCalculator, validate_parts};
use crate::calculations::micro_bic::MicroBicCalculator;
use crate::error::{SimulationError, ValidationError, ensure_amount};
use crate::{LmnpRegime, RentalCategory, TaxYearRules};

/// Inputs of the LMNP comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LmnpInput {
    pub purchase_price: Decimal,
    pub travaux_amount: Decimal,
    pub furniture_amount: Decimal,
    pub rental_category: RentalCategory,
    /// Regime currently declared, reported back for information only.
    pub regime: Option<LmnpRegime>,
    pub annual_rent: Decimal,
    pub annual_charges: Decimal,
    /// Loan interest per holding year; missing years count as zero.
    pub interets_annuels: Vec<Decimal>,
    pub duree_detention: u32,
    /// Household income before the rental income.
    pub taxable_income: Decimal,
    pub parts: Decimal,
}

/// One holding year under one regime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LmnpYearRow {
    pub year: u32,
    pub recettes: Decimal,
    pub charges: Decimal,
    pub interets: Decimal,
    /// Depreciation of the year plus what was carried in. Zero under Micro-BIC.
    pub amortissement_disponible: Decimal,
    pub amortissement_deduit: Decimal,
    pub amortissement_reporte: Decimal,
    pub resultat_imposable: Decimal,
    pub impot_revenu: Decimal,
    pub prelevements_sociaux: Decimal,
}

impl LmnpYearRow {
    pub fn impot_total(&self) -> Decimal {
        self.impot_revenu + self.prelevements_sociaux
    }

    /// Rent minus charges, interest and tax.
    pub fn revenu_net(&self) -> Decimal {
        self.recettes - self.charges - self.interets - self.impot_total()
    }
}

/// Outcome of one regime over the holding period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LmnpRegimeResult {
    pub regime: LmnpRegime,
    pub total_resultat_imposable: Decimal,
    pub total_impot: Decimal,
    pub net_gain: Decimal,
    /// Net gain per year over the cost of the operation.
    pub rendement_net: Decimal,
    pub rows: Vec<LmnpYearRow>,
}

/// Micro-BIC is either computed or excluded by its revenue ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum MicroBicOutcome {
    Eligible(LmnpRegimeResult),
    Ineligible { reason: String },
}

impl MicroBicOutcome {
    pub fn result(&self) -> Option<&LmnpRegimeResult> {
        match self {
            Self::Eligible(result) => Some(result),
            Self::Ineligible { .. } => None,
        }
    }
}

/// Both regimes and the selected one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LmnpResult {
    pub micro_bic: MicroBicOutcome,
    pub reel: LmnpRegimeResult,
    pub regime_optimal: LmnpRegime,
    pub regime_declare: Option<LmnpRegime>,
    /// Micro-BIC tax minus réel tax; absent when Micro-BIC is excluded.
    pub tax_delta: Option<Decimal>,
}

impl LmnpResult {
    /// Result of the optimal regime.
    pub fn selected(&self) -> &LmnpRegimeResult {
        match (self.regime_optimal, self.micro_bic.result()) {
            (LmnpRegime::MicroBic, Some(micro)) => micro,
            _ => &self.reel,
        }
    }

    pub fn net_gain(&self) -> Decimal {
        self.selected().net_gain
    }
}

/// Compares Micro-BIC and réel using one year's rule tables.
#[derive(Debug, Clone)]
pub struct LmnpComparator<'a> {
    rules: &'a TaxYearRules,
}

impl<'a> LmnpComparator<'a> {
    pub fn new(rules: &'a TaxYearRules) -> Self {
        Self { rules }
    }

    /// Evaluates both regimes and selects the cheaper one.
    ///
    /// Equal totals select Micro-BIC. A Micro-BIC ceiling breach is reported
    /// in the result and selects réel.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] for negative amounts, a holding period
    /// outside `1..=30` years, invalid parts or invalid rule tables.
    pub fn compare(
        &self,
        input: &LmnpInput,
    ) -> Result<LmnpResult, ValidationError> {
        self.validate(input)?;

        let micro_bic = match self.micro_bic(input) {
            Ok(result) => MicroBicOutcome::Eligible(result),
            Err(SimulationError::Eligibility(reason)) => {
                info!(%reason, "micro-bic excluded");
                MicroBicOutcome::Ineligible {
                    reason: reason.to_string(),
                }
            }
            Err(SimulationError::Validation(err)) => return Err(err),
        };
        let reel = self.reel(input)?;

        let (regime_optimal, tax_delta) = match micro_bic.result() {
            Some(micro) => {
                let delta = micro.total_impot - reel.total_impot;
                let regime = if delta <= Decimal::ZERO {
                    LmnpRegime::MicroBic
                } else {
                    LmnpRegime::Reel
                };
                (regime, Some(delta))
            }
            None => (LmnpRegime::Reel, None),
        };

        debug!(
            regime = %regime_optimal,
            reel_tax = %reel.total_impot,
            tax_delta = ?tax_delta,
            "lmnp regimes compared"
        );

        Ok(LmnpResult {
            micro_bic,
            reel,
            regime_optimal,
            regime_declare: input.regime,
            tax_delta,
        })
    }

    fn validate(
        &self,
        input: &LmnpInput,
    ) -> Result<(), ValidationError> {
        ensure_amount("purchase_price", input.purchase_price)?;
        ensure_amount("travaux_amount", input.travaux_amount)?;
        ensure_amount("furniture_amount", input.furniture_amount)?;
        ensure_amount("annual_rent", input.annual_rent)?;
        ensure_amount("annual_charges", input.annual_charges)?;
        ensure_amount("taxable_income", input.taxable_income)?;
        for interest in &input.interets_annuels {
            ensure_amount("interets_annuels", *interest)?;
        }
        if input.duree_detention == 0 {
            return Err(ValidationError::ZeroHoldingDuration);
        }
        if input.duree_detention > MAX_HOLDING_YEARS {
            return Err(ValidationError::DurationTooLong {
                field: "duree_detention",
                value: input.duree_detention,
                max: MAX_HOLDING_YEARS,
            });
        }
        validate_parts(input.parts)
    }

    fn micro_bic(
        &self,
        input: &LmnpInput,
    ) -> Result<LmnpRegimeResult, SimulationError> {
        let micro = MicroBicCalculator::new(&self.rules.micro_bic)
            .calculate(input.annual_rent, input.rental_category)?;

        let mut rows = Vec::with_capacity(input.duree_detention as usize);
        for year in 1..=input.duree_detention {
            let interets = interest_for_year(input, year);
            let (impot_revenu, prelevements_sociaux) =
                self.taxes_on(input, micro.taxable_income)?;
            rows.push(LmnpYearRow {
                year,
                recettes: input.annual_rent,
                charges: input.annual_charges,
                interets,
                amortissement_disponible: Decimal::ZERO,
                amortissement_deduit: Decimal::ZERO,
                amortissement_reporte: Decimal::ZERO,
                resultat_imposable: micro.taxable_income,
                impot_revenu,
                prelevements_sociaux,
            });
        }
        Ok(self.summarize(LmnpRegime::MicroBic, input, rows))
    }

    fn reel(
        &self,
        input: &LmnpInput,
    ) -> Result<LmnpRegimeResult, ValidationError> {
        let config = &self.rules.config;
        let duree = input.duree_detention;

        let building = AmortizationSchedule::new(&self.rules.components)
            .schedule(input.purchase_price, duree)?;
        let travaux = straight_line(input.travaux_amount, config.travaux_depreciation_rate, duree);
        let mobilier =
            straight_line(input.furniture_amount, config.mobilier_depreciation_rate, duree);

        let mut rows = Vec::with_capacity(duree as usize);
        let mut amortissement_reporte = Decimal::ZERO;
        let mut deficit_reporte = Decimal::ZERO;

        for (i, building_row) in building.iter().enumerate() {
            let year = i as u32 + 1;
            let interets = interest_for_year(input, year);
            let amortissement_disponible = building_row.total_depreciation
                + travaux[i]
                + mobilier[i]
                + amortissement_reporte;

            let resultat_avant_amortissement =
                input.annual_rent - input.annual_charges - interets - deficit_reporte;

            let (amortissement_deduit, resultat_imposable) =
                if resultat_avant_amortissement < Decimal::ZERO {
                    deficit_reporte = -resultat_avant_amortissement;
                    (Decimal::ZERO, Decimal::ZERO)
                } else {
                    deficit_reporte = Decimal::ZERO;
                    let deduit = amortissement_disponible.min(resultat_avant_amortissement);
                    (deduit, resultat_avant_amortissement - deduit)
                };
            amortissement_reporte = amortissement_disponible - amortissement_deduit;

            let (impot_revenu, prelevements_sociaux) = self.taxes_on(input, resultat_imposable)?;
            rows.push(LmnpYearRow {
                year,
                recettes: input.annual_rent,
                charges: input.annual_charges,
                interets,
                amortissement_disponible,
                amortissement_deduit,
                amortissement_reporte,
                resultat_imposable,
                impot_revenu,
                prelevements_sociaux,
            });
        }

        Ok(self.summarize(LmnpRegime::Reel, input, rows))
    }

    /// Income tax attributable to `taxable`, and social contributions on it.
    fn taxes_on(
        &self,
        input: &LmnpInput,
        taxable: Decimal,
    ) -> Result<(Decimal, Decimal), ValidationError> {
        let impot_revenu = IncomeTaxCalculator::new(&self.rules.brackets).additional_tax(
            input.taxable_income,
            taxable,
            input.parts,
        )?;
        let prelevements_sociaux =
            round_half_up(max(taxable, Decimal::ZERO) * self.rules.config.social_contributions_rate);
        Ok((impot_revenu, prelevements_sociaux))
    }

    fn summarize(
        &self,
        regime: LmnpRegime,
        input: &LmnpInput,
        rows: Vec<LmnpYearRow>,
    ) -> LmnpRegimeResult {
        let total_resultat_imposable = rows.iter().map(|r| r.resultat_imposable).sum();
        let total_impot = rows.iter().map(LmnpYearRow::impot_total).sum();
        let net_gain: Decimal = rows.iter().map(LmnpYearRow::revenu_net).sum();
        let cost = input.purchase_price + input.travaux_amount + input.furniture_amount;
        let rendement_net =
            ratio_or_zero(net_gain / Decimal::from(input.duree_detention), cost).round_dp(4);

        LmnpRegimeResult {
            regime,
            total_resultat_imposable,
            total_impot,
            net_gain,
            rendement_net,
            rows,
        }
    }
}

fn interest_for_year(
    input: &LmnpInput,
    year: u32,
) -> Decimal {
    input
        .interets_annuels
        .get(year as usize - 1)
        .copied()
        .unwrap_or(Decimal::ZERO)
}
