//! Jeanbrun tax reduction for renovated rental housing.
//!
//! # Eligibility
//!
//! - Renovation works must reach 30% of the operation cost
//!   (`travaux / (price + travaux)`), boundary included.
//! - The zone must carry a rate tier; zone C never does.
//! - The holding period must reach the shortest tier duration.
//!
//! # Reduction
//!
//! The rate of the longest tier not exceeding the holding period applies to
//! the operation cost, capped at the investment ceiling. The reduction is
//! spread evenly over the holding years; each year's slice is limited by the
//! household income tax of that year and by the tax-niche ceiling.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use jeanbrun_core::calculations::{JeanbrunCalculator, JeanbrunInput};
//! use jeanbrun_core::{NiveauLoyer, TaxYearRules, ZoneFiscale};
//!
//! let rules = TaxYearRules::builtin(2026).unwrap();
//! let input = JeanbrunInput {
//!     purchase_price: dec!(200000),
//!     travaux_amount: dec!(86000),
//!     zone_fiscale: ZoneFiscale::A,
//!     duree_detention: 9,
//!     niveau_loyer: NiveauLoyer::Intermediaire,
//!     revalorisation_rate: dec!(0.01),
//!     monthly_rent: dec!(800),
//!     surface_m2: dec!(60),
//!     annual_charges: dec!(1800),
//!     interets_annuels: vec![],
//!     annuites: vec![],
//!     taxable_income: dec!(60000),
//!     parts: dec!(2.5),
//! };
//!
//! let result = JeanbrunCalculator::new(rules).calculate(&input).unwrap();
//!
//! assert!(result.eligible);
//! assert_eq!(result.taux_reduction, dec!(0.18));
//! assert_eq!(result.economie_impot, dec!(51480.00));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::calculations::MAX_HOLDING_YEARS;
use crate::calculations::common::{compound, max, ratio_or_zero, round_half_up};
use crate::calculations::income_tax::{IncomeTaxCalculator, validate_parts};
use crate::error::{
    EligibilityError, SimulationError, ValidationError, ensure_amount, ensure_rate,
};
use crate::{JeanbrunRateTier, NiveauLoyer, TaxYearRules, ZoneFiscale};

const MONTHS_PER_YEAR: u32 = 12;

/// Inputs of the Jeanbrun calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JeanbrunInput {
    pub purchase_price: Decimal,
    pub travaux_amount: Decimal,
    pub zone_fiscale: ZoneFiscale,
    pub duree_detention: u32,
    pub niveau_loyer: NiveauLoyer,
    pub revalorisation_rate: Decimal,
    pub monthly_rent: Decimal,
    /// Zero disables the rent ceiling.
    pub surface_m2: Decimal,
    pub annual_charges: Decimal,
    /// Loan interest per holding year; missing years count as zero.
    pub interets_annuels: Vec<Decimal>,
    /// Loan installments plus insurance per holding year.
    pub annuites: Vec<Decimal>,
    /// Household income before the rental income.
    pub taxable_income: Decimal,
    pub parts: Decimal,
}

/// One holding year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JeanbrunYearRow {
    pub year: u32,
    pub loyers: Decimal,
    pub charges: Decimal,
    pub interets: Decimal,
    pub annuite: Decimal,
    /// Rent minus charges and interest, floored at zero.
    pub revenu_foncier: Decimal,
    pub impot_revenu: Decimal,
    pub prelevements_sociaux: Decimal,
    /// Household income tax for the year, rental income included.
    pub impot_foyer: Decimal,
    pub reduction_theorique: Decimal,
    pub reduction_imputee: Decimal,
    /// Rent minus charges, loan payments and tax, plus the reduction used.
    pub cash_flow: Decimal,
    pub valeur_bien: Decimal,
}

/// Outcome of the Jeanbrun calculation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JeanbrunResult {
    pub eligible: bool,
    /// Why the operation is not eligible.
    pub reason: Option<String>,
    pub taux_reduction: Decimal,
    pub base_eligible: Decimal,
    /// Total reduction granted over the holding period.
    pub economie_impot: Decimal,
    /// Part of the reduction the household can actually use.
    pub economie_impot_effective: Decimal,
    pub loyer_mensuel_retenu: Decimal,
    pub plafond_loyer_mensuel: Option<Decimal>,
    pub rendement_brut: Decimal,
    /// Annualized net return, may be negative.
    pub rendement_net: Decimal,
    pub effort_epargne_mensuel: Decimal,
    pub valeur_revente: Decimal,
    pub plus_value_latente: Decimal,
    /// Net rental income after tax plus the effective reduction.
    pub net_gain: Decimal,
    pub rows: Vec<JeanbrunYearRow>,
}

impl JeanbrunResult {
    /// An empty result carrying the reason the operation was rejected.
    pub fn ineligible(reason: &EligibilityError) -> Self {
        Self {
            eligible: false,
            reason: Some(reason.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct JeanbrunCalculator<'a> {
    rules: &'a TaxYearRules,
}

impl<'a> JeanbrunCalculator<'a> {
    pub fn new(rules: &'a TaxYearRules) -> Self {
        Self { rules }
    }

    /// Computes the reduction and the year-by-year projection.
    ///
    /// # Errors
    ///
    /// - [`SimulationError::Validation`] for malformed input
    /// - [`SimulationError::Eligibility`] when the renovation threshold, the
    ///   zone or the holding period rules exclude the operation
    pub fn calculate(
        &self,
        input: &JeanbrunInput,
    ) -> Result<JeanbrunResult, SimulationError> {
        self.validate(input)?;
        self.check_travaux(input)?;
        let taux_reduction = self.reduction_rate(input)?;

        let config = &self.rules.config;
        let cout_operation = input.purchase_price + input.travaux_amount;
        let base_eligible = cout_operation.min(config.investment_ceiling);
        let economie_impot = round_half_up(taux_reduction * base_eligible);

        let plafond_loyer_mensuel = self.monthly_rent_ceiling(input);
        let loyer_mensuel_retenu = match plafond_loyer_mensuel {
            Some(plafond) if input.monthly_rent > plafond => {
                warn!(
                    loyer = %input.monthly_rent,
                    plafond = %plafond,
                    "rent capped to ceiling"
                );
                plafond
            }
            _ => input.monthly_rent,
        };

        let rows = self.project(input, loyer_mensuel_retenu, economie_impot, cout_operation)?;

        let economie_impot_effective: Decimal = rows.iter().map(|r| r.reduction_imputee).sum();
        let revenus_nets: Decimal = rows
            .iter()
            .map(|r| r.loyers - r.charges - r.interets - r.impot_revenu - r.prelevements_sociaux)
            .sum();
        let effort_total: Decimal = rows.iter().map(|r| -r.cash_flow).sum();

        let duree = Decimal::from(input.duree_detention);
        let valeur_revente = rows.last().map_or(cout_operation, |r| r.valeur_bien);
        let plus_value_latente = max(valeur_revente - cout_operation, Decimal::ZERO);
        let loyer_annuel = loyer_mensuel_retenu * Decimal::from(MONTHS_PER_YEAR);

        let rendement_brut = ratio_or_zero(loyer_annuel, cout_operation).round_dp(4);
        let rendement_net = ratio_or_zero(
            (revenus_nets + economie_impot_effective + plus_value_latente) / duree,
            cout_operation,
        )
        .round_dp(4);
        let effort_epargne_mensuel = round_half_up(max(
            effort_total / (duree * Decimal::from(MONTHS_PER_YEAR)),
            Decimal::ZERO,
        ));

        debug!(
            taux = %taux_reduction,
            economie_impot = %economie_impot,
            effective = %economie_impot_effective,
            rendement_net = %rendement_net,
            "jeanbrun reduction computed"
        );

        Ok(JeanbrunResult {
            eligible: true,
            reason: None,
            taux_reduction,
            base_eligible,
            economie_impot,
            economie_impot_effective,
            loyer_mensuel_retenu,
            plafond_loyer_mensuel,
            rendement_brut,
            rendement_net,
            effort_epargne_mensuel,
            valeur_revente,
            plus_value_latente,
            net_gain: revenus_nets + economie_impot_effective,
            rows,
        })
    }

    fn validate(
        &self,
        input: &JeanbrunInput,
    ) -> Result<(), ValidationError> {
        ensure_amount("purchase_price", input.purchase_price)?;
        ensure_amount("travaux_amount", input.travaux_amount)?;
        ensure_amount("monthly_rent", input.monthly_rent)?;
        ensure_amount("surface_m2", input.surface_m2)?;
        ensure_amount("annual_charges", input.annual_charges)?;
        ensure_amount("taxable_income", input.taxable_income)?;
        ensure_rate("revalorisation_rate", input.revalorisation_rate)?;
        for amount in input.interets_annuels.iter().chain(&input.annuites) {
            ensure_amount("loan_schedule", *amount)?;
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

    /// Works must be at least the threshold share of price plus works.
    fn check_travaux(
        &self,
        input: &JeanbrunInput,
    ) -> Result<(), EligibilityError> {
        let cout_operation = input.purchase_price + input.travaux_amount;
        let required = cout_operation * self.rules.config.travaux_min_share;
        if input.travaux_amount < required {
            return Err(EligibilityError::TravauxBelowThreshold {
                travaux: input.travaux_amount,
                required: round_half_up(required),
            });
        }
        Ok(())
    }

    /// Rate of the longest tier whose duration does not exceed the holding period.
    fn reduction_rate(
        &self,
        input: &JeanbrunInput,
    ) -> Result<Decimal, EligibilityError> {
        let zone = input.zone_fiscale;
        let niveau = input.niveau_loyer;

        let in_zone: Vec<&JeanbrunRateTier> = self
            .rules
            .jeanbrun_tiers
            .iter()
            .filter(|t| t.zone == zone)
            .collect();
        if in_zone.is_empty() {
            return Err(EligibilityError::ZoneNotEligible(zone));
        }

        let candidates: Vec<&JeanbrunRateTier> = in_zone
            .into_iter()
            .filter(|t| t.niveau_loyer == niveau)
            .collect();
        let minimum = candidates
            .iter()
            .map(|t| t.duree_detention)
            .min()
            .ok_or(EligibilityError::NoRateTier { zone, niveau })?;

        candidates
            .iter()
            .filter(|t| t.duree_detention <= input.duree_detention)
            .max_by_key(|t| t.duree_detention)
            .map(|t| t.reduction_rate)
            .ok_or(EligibilityError::HoldingTooShort {
                years: input.duree_detention,
                minimum,
            })
    }

    /// Monthly rent ceiling for the zone and rent level, if the property has a surface.
    fn monthly_rent_ceiling(
        &self,
        input: &JeanbrunInput,
    ) -> Option<Decimal> {
        if input.surface_m2.is_zero() {
            return None;
        }
        self.rules
            .rent_ceiling(input.zone_fiscale, input.niveau_loyer)
            .map(|c| round_half_up(c.plafond_m2 * input.surface_m2))
    }

    fn project(
        &self,
        input: &JeanbrunInput,
        loyer_mensuel: Decimal,
        economie_impot: Decimal,
        cout_operation: Decimal,
    ) -> Result<Vec<JeanbrunYearRow>, ValidationError> {
        let config = &self.rules.config;
        let income_tax = IncomeTaxCalculator::new(&self.rules.brackets);
        let duree = input.duree_detention;
        let loyers = loyer_mensuel * Decimal::from(MONTHS_PER_YEAR);
        let tranche = round_half_up(economie_impot / Decimal::from(duree));

        let mut rows = Vec::with_capacity(duree as usize);
        let mut reduction_distribuee = Decimal::ZERO;

        for year in 1..=duree {
            let index = year as usize - 1;
            let interets = input.interets_annuels.get(index).copied().unwrap_or(Decimal::ZERO);
            let annuite = input.annuites.get(index).copied().unwrap_or(Decimal::ZERO);

            let revenu_foncier = max(loyers - input.annual_charges - interets, Decimal::ZERO);
            let impot_revenu =
                income_tax.additional_tax(input.taxable_income, revenu_foncier, input.parts)?;
            let prelevements_sociaux =
                round_half_up(revenu_foncier * config.social_contributions_rate);
            let impot_foyer = income_tax
                .calculate(input.taxable_income + revenu_foncier, input.parts)?
                .total_tax;

            // Last slice absorbs rounding so the slices add up to the total.
            let reduction_theorique = if year == duree {
                economie_impot - reduction_distribuee
            } else {
                tranche
            };
            reduction_distribuee += reduction_theorique;
            let reduction_imputee = reduction_theorique
                .min(impot_foyer)
                .min(config.tax_niche_ceiling);

            let cash_flow = loyers
                - input.annual_charges
                - annuite
                - impot_revenu
                - prelevements_sociaux
                + reduction_imputee;
            let valeur_bien =
                round_half_up(cout_operation * compound(input.revalorisation_rate, year));

            rows.push(JeanbrunYearRow {
                year,
                loyers,
                charges: input.annual_charges,
                interets,
                annuite,
                revenu_foncier,
                impot_revenu,
                prelevements_sociaux,
                impot_foyer,
                reduction_theorique,
                reduction_imputee,
                cash_flow,
                valeur_bien,
            });
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn rules() -> &'static TaxYearRules {
        TaxYearRules::builtin(2026).unwrap()
    }

    fn input() -> JeanbrunInput {
        JeanbrunInput {
            purchase_price: dec!(200000),
            travaux_amount: dec!(86000),
            zone_fiscale: ZoneFiscale::A,
            duree_detention: 9,
            niveau_loyer: NiveauLoyer::Intermediaire,
            revalorisation_rate: dec!(0.01),
            monthly_rent: dec!(800),
            surface_m2: dec!(60),
            annual_charges: dec!(1800),
            interets_annuels: vec![],
            annuites: vec![],
            taxable_income: dec!(60000),
            parts: dec!(2.5),
        }
    }

    // =========================================================================
    // eligibility tests
    // =========================================================================

    #[test]
    fn calculate_reference_scenario_is_eligible() {
        let result = JeanbrunCalculator::new(rules()).calculate(&input()).unwrap();

        assert!(result.eligible);
        assert_eq!(result.reason, None);
        assert!(result.economie_impot > Decimal::ZERO);
        assert_eq!(result.rows.len(), 9);
    }

    #[test]
    fn calculate_travaux_exactly_at_threshold_is_eligible() {
        let mut jeanbrun = input();
        jeanbrun.purchase_price = dec!(70000);
        jeanbrun.travaux_amount = dec!(30000);

        let result = JeanbrunCalculator::new(rules()).calculate(&jeanbrun);

        assert!(result.is_ok());
    }

    #[test]
    fn calculate_travaux_just_below_threshold_is_ineligible() {
        let mut jeanbrun = input();
        jeanbrun.purchase_price = dec!(70001);
        jeanbrun.travaux_amount = dec!(29999);

        let result = JeanbrunCalculator::new(rules()).calculate(&jeanbrun);

        assert_eq!(
            result,
            Err(SimulationError::Eligibility(
                EligibilityError::TravauxBelowThreshold {
                    travaux: dec!(29999),
                    required: dec!(30000.00),
                }
            ))
        );
    }

    #[test]
    fn calculate_zone_c_is_ineligible() {
        let mut jeanbrun = input();
        jeanbrun.zone_fiscale = ZoneFiscale::C;

        let result = JeanbrunCalculator::new(rules()).calculate(&jeanbrun);

        assert_eq!(
            result,
            Err(SimulationError::Eligibility(EligibilityError::ZoneNotEligible(
                ZoneFiscale::C
            )))
        );
    }

    #[test]
    fn calculate_short_holding_is_ineligible() {
        let mut jeanbrun = input();
        jeanbrun.duree_detention = 5;

        let result = JeanbrunCalculator::new(rules()).calculate(&jeanbrun);

        assert_eq!(
            result,
            Err(SimulationError::Eligibility(EligibilityError::HoldingTooShort {
                years: 5,
                minimum: 6
            }))
        );
    }

    #[test]
    fn ineligible_result_carries_reason() {
        let result = JeanbrunResult::ineligible(&EligibilityError::ZoneNotEligible(ZoneFiscale::C));

        assert!(!result.eligible);
        assert_eq!(result.reason.as_deref(), Some("zone C is not eligible"));
        assert_eq!(result.economie_impot, dec!(0));
    }

    // =========================================================================
    // reduction tests
    // =========================================================================

    #[test]
    fn calculate_uses_longest_tier_not_exceeding_holding() {
        let mut jeanbrun = input();
        jeanbrun.duree_detention = 11;

        let result = JeanbrunCalculator::new(rules()).calculate(&jeanbrun).unwrap();

        // 9-year tier applies between 9 and 11 years.
        assert_eq!(result.taux_reduction, dec!(0.18));
    }

    #[test]
    fn calculate_social_rent_raises_rate() {
        let mut jeanbrun = input();
        jeanbrun.niveau_loyer = NiveauLoyer::Social;
        jeanbrun.duree_detention = 12;

        let result = JeanbrunCalculator::new(rules()).calculate(&jeanbrun).unwrap();

        assert_eq!(result.taux_reduction, dec!(0.23));
    }

    #[test]
    fn calculate_base_is_capped_at_investment_ceiling() {
        let mut jeanbrun = input();
        jeanbrun.purchase_price = dec!(300000);
        jeanbrun.travaux_amount = dec!(150000);

        let result = JeanbrunCalculator::new(rules()).calculate(&jeanbrun).unwrap();

        assert_eq!(result.base_eligible, dec!(300000));
        assert_eq!(result.economie_impot, dec!(54000.00));
    }

    #[test]
    fn calculate_slices_add_up_to_reduction() {
        let result = JeanbrunCalculator::new(rules()).calculate(&input()).unwrap();

        let total: Decimal = result.rows.iter().map(|r| r.reduction_theorique).sum();
        assert_eq!(total, result.economie_impot);
    }

    #[test]
    fn calculate_reduction_limited_by_household_tax() {
        let mut jeanbrun = input();
        jeanbrun.taxable_income = dec!(0);

        let result = JeanbrunCalculator::new(rules()).calculate(&jeanbrun).unwrap();

        // Only the rental income is taxed, so most of the reduction is lost.
        assert!(result.economie_impot_effective < result.economie_impot);
        for row in &result.rows {
            assert!(row.reduction_imputee <= row.impot_foyer);
        }
    }

    #[test]
    fn calculate_reduction_limited_by_niche_ceiling() {
        let mut jeanbrun = input();
        jeanbrun.duree_detention = 6;
        jeanbrun.taxable_income = dec!(400000);
        jeanbrun.parts = dec!(1);

        let result = JeanbrunCalculator::new(rules()).calculate(&jeanbrun).unwrap();

        // 12% of 286000 over 6 years is 5720 per year, under the ceiling.
        assert_eq!(result.rows[0].reduction_imputee, dec!(5720.00));

        let mut high = jeanbrun.clone();
        high.niveau_loyer = NiveauLoyer::TresSocial;
        high.purchase_price = dec!(210000);
        high.travaux_amount = dec!(90000);
        high.duree_detention = 6;
        let rules = {
            let mut rules = rules().clone();
            rules.config.tax_niche_ceiling = dec!(5000);
            rules
        };
        let result = JeanbrunCalculator::new(&rules).calculate(&high).unwrap();

        for row in &result.rows {
            assert!(row.reduction_imputee <= dec!(5000));
        }
        assert_eq!(result.economie_impot_effective, dec!(30000));
    }

    // =========================================================================
    // rent and return tests
    // =========================================================================

    #[test]
    fn calculate_caps_rent_to_ceiling() {
        let mut jeanbrun = input();
        jeanbrun.monthly_rent = dec!(1200);

        let result = JeanbrunCalculator::new(rules()).calculate(&jeanbrun).unwrap();

        // 14.03 €/m² × 60 m²
        assert_eq!(result.plafond_loyer_mensuel, Some(dec!(841.80)));
        assert_eq!(result.loyer_mensuel_retenu, dec!(841.80));
    }

    #[test]
    fn calculate_without_surface_keeps_rent() {
        let mut jeanbrun = input();
        jeanbrun.surface_m2 = dec!(0);
        jeanbrun.monthly_rent = dec!(1200);

        let result = JeanbrunCalculator::new(rules()).calculate(&jeanbrun).unwrap();

        assert_eq!(result.plafond_loyer_mensuel, None);
        assert_eq!(result.loyer_mensuel_retenu, dec!(1200));
    }

    #[test]
    fn calculate_revalues_property() {
        let result = JeanbrunCalculator::new(rules()).calculate(&input()).unwrap();

        assert_eq!(result.rows[0].valeur_bien, dec!(288860.00));
        assert!(result.valeur_revente > dec!(286000));
        assert_eq!(result.plus_value_latente, result.valeur_revente - dec!(286000));
    }

    #[test]
    fn calculate_gross_yield() {
        let result = JeanbrunCalculator::new(rules()).calculate(&input()).unwrap();

        // 9600 / 286000
        assert_eq!(result.rendement_brut, dec!(0.0336));
    }

    #[test]
    fn calculate_effort_reflects_loan_payments() {
        let mut jeanbrun = input();
        jeanbrun.annuites = vec![dec!(18000); 9];
        jeanbrun.interets_annuels = vec![dec!(8000); 9];

        let result = JeanbrunCalculator::new(rules()).calculate(&jeanbrun).unwrap();

        assert!(result.effort_epargne_mensuel > Decimal::ZERO);
        assert!(result.rows.iter().all(|r| r.revenu_foncier == dec!(0)));
    }

    #[test]
    fn calculate_is_idempotent() {
        let calculator = JeanbrunCalculator::new(rules());

        assert_eq!(calculator.calculate(&input()), calculator.calculate(&input()));
    }

    // =========================================================================
    // validation tests
    // =========================================================================

    #[test]
    fn calculate_rejects_zero_parts() {
        let mut jeanbrun = input();
        jeanbrun.parts = dec!(0);

        assert_eq!(
            JeanbrunCalculator::new(rules()).calculate(&jeanbrun),
            Err(SimulationError::Validation(ValidationError::NonPositiveParts(
                dec!(0)
            )))
        );
    }

    #[test]
    fn calculate_rejects_excessive_revaluation() {
        let mut jeanbrun = input();
        jeanbrun.revalorisation_rate = dec!(1.5);

        assert!(matches!(
            JeanbrunCalculator::new(rules()).calculate(&jeanbrun),
            Err(SimulationError::Validation(ValidationError::RateOutOfRange { .. }))
        ));
    }
}
