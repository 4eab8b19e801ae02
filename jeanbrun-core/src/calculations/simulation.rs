//! Full simulation: household baseline, loan, Jeanbrun and LMNP side by side.
//!
//! [`orchestrer_simulation`] is the single entry point front ends call with a
//! validated wizard input. It is pure: the same input, rules and options
//! always produce the same [`SimulationResult`].

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::calculations::financing::{
    DebtRatioAnalysis, FinancingAnalyzer, FinancingInput, FinancingResult, LoanYearRow,
};
use crate::calculations::income_tax::{IncomeTaxCalculator, IncomeTaxResult};
use crate::calculations::jeanbrun::{JeanbrunCalculator, JeanbrunInput, JeanbrunResult};
use crate::calculations::lmnp::{LmnpComparator, LmnpInput, LmnpResult};
use crate::error::SimulationError;
use crate::{LegalStructure, SimulationInput, TaxYearRules, ValidationError};

/// Which schemes to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationOptions {
    #[serde(alias = "jeanbrun_enabled")]
    pub jeanbrun_enabled: bool,
    #[serde(alias = "lmnp_enabled")]
    pub lmnp_enabled: bool,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            jeanbrun_enabled: true,
            lmnp_enabled: true,
        }
    }
}

/// Scheme with the higher net gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dispositif {
    Jeanbrun,
    Lmnp,
}

impl fmt::Display for Dispositif {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(match self {
            Self::Jeanbrun => "jeanbrun",
            Self::Lmnp => "lmnp",
        })
    }
}

/// Jeanbrun against LMNP.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparatif {
    /// Absent when the scheme is disabled or the operation is not eligible.
    pub jeanbrun_net_gain: Option<Decimal>,
    pub lmnp_net_gain: Option<Decimal>,
    /// Jeanbrun net gain minus LMNP net gain, when both exist.
    pub delta: Option<Decimal>,
    pub meilleur_dispositif: Option<Dispositif>,
}

/// Aggregated simulation output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub tax_year: i32,
    pub structure: LegalStructure,
    /// Household tax before the investment.
    pub impot_foyer: IncomeTaxResult,
    /// Average rate of the household before the investment.
    pub taux_imposition: Decimal,
    pub taux_marginal: Decimal,
    /// Jeanbrun reduction the household can use; zero if not eligible.
    pub economie_impot: Decimal,
    /// Net return of the better scheme.
    pub rendement_net: Decimal,
    /// Yearly loan summary.
    pub tableau_amortissement: Vec<LoanYearRow>,
    pub financing: FinancingResult,
    pub endettement: DebtRatioAnalysis,
    pub jeanbrun: Option<JeanbrunResult>,
    pub lmnp: Option<LmnpResult>,
    pub comparatif: Comparatif,
}

/// Runs every enabled calculator and merges their results.
///
/// # Errors
///
/// Returns [`ValidationError`] if the input or the rule tables are invalid.
/// Jeanbrun eligibility failures do not abort: they are reported in
/// [`JeanbrunResult::reason`].
pub fn orchestrer_simulation(
    input: &SimulationInput,
    rules: &TaxYearRules,
    options: SimulationOptions,
) -> Result<SimulationResult, ValidationError> {
    input.validate()?;
    rules.validate()?;

    if input.legal.structure.is_corporate() {
        info!(structure = %input.legal.structure.as_str(), "corporate structure simulated as household");
    }

    let parts = input.profile.parts();
    let taxable_income = input.profile.taxable_income;
    let impot_foyer = IncomeTaxCalculator::new(&rules.brackets).calculate(taxable_income, parts)?;

    let analyzer = FinancingAnalyzer::from_tax_year_config(&rules.config);
    let financing = analyzer.analyze(&FinancingInput {
        loan_amount: input.loan_amount(),
        annual_rate: input.financing.annual_rate,
        duration_years: input.financing.duration_years,
        differe_months: input.financing.differe_months,
        insurance_rate: input.financing.insurance_rate,
    })?;
    let endettement = analyzer.debt_ratio(
        financing.mensualite_totale(),
        input.profile.existing_monthly_debt,
        input.profile.monthly_income,
    );

    let duree = input.holding.duree_detention;
    let interets_annuels: Vec<Decimal> =
        (1..=duree).map(|y| financing.interets_par_annee(y)).collect();

    let jeanbrun = if options.jeanbrun_enabled {
        Some(run_jeanbrun(input, rules, &financing, &interets_annuels, parts)?)
    } else {
        None
    };

    let lmnp = if options.lmnp_enabled {
        let lmnp_input = LmnpInput {
            purchase_price: input.property.purchase_price,
            travaux_amount: input.property.travaux_amount,
            furniture_amount: input.property.furniture_amount,
            rental_category: input.rental.rental_category,
            regime: input.rental.lmnp_regime,
            annual_rent: input.rental.monthly_rent * Decimal::from(12),
            annual_charges: input.rental.annual_charges,
            interets_annuels,
            duree_detention: duree,
            taxable_income,
            parts,
        };
        Some(LmnpComparator::new(rules).compare(&lmnp_input)?)
    } else {
        None
    };

    let comparatif = compare(jeanbrun.as_ref(), lmnp.as_ref());
    let economie_impot = jeanbrun
        .as_ref()
        .map_or(Decimal::ZERO, |j| j.economie_impot_effective);
    let rendement_net = match comparatif.meilleur_dispositif {
        Some(Dispositif::Jeanbrun) => jeanbrun.as_ref().map(|j| j.rendement_net),
        Some(Dispositif::Lmnp) => lmnp.as_ref().map(|l| l.selected().rendement_net),
        None => None,
    }
    .unwrap_or(Decimal::ZERO);

    debug!(
        tax_year = rules.tax_year(),
        meilleur = ?comparatif.meilleur_dispositif,
        delta = ?comparatif.delta,
        "simulation complete"
    );

    Ok(SimulationResult {
        tax_year: rules.tax_year(),
        structure: input.legal.structure,
        taux_imposition: impot_foyer.average_rate,
        taux_marginal: impot_foyer.marginal_rate,
        impot_foyer,
        economie_impot,
        rendement_net,
        tableau_amortissement: financing.annual.clone(),
        financing,
        endettement,
        jeanbrun,
        lmnp,
        comparatif,
    })
}

/// Jeanbrun calculation with eligibility failures folded into the result.
fn run_jeanbrun(
    input: &SimulationInput,
    rules: &TaxYearRules,
    financing: &FinancingResult,
    interets_annuels: &[Decimal],
    parts: Decimal,
) -> Result<JeanbrunResult, ValidationError> {
    let duree = input.holding.duree_detention;
    let jeanbrun_input = JeanbrunInput {
        purchase_price: input.property.purchase_price,
        travaux_amount: input.property.travaux_amount,
        zone_fiscale: input.property.zone_fiscale,
        duree_detention: duree,
        niveau_loyer: input.rental.niveau_loyer,
        revalorisation_rate: input.holding.revalorisation_rate,
        monthly_rent: input.rental.monthly_rent,
        surface_m2: input.property.surface_m2,
        annual_charges: input.rental.annual_charges,
        interets_annuels: interets_annuels.to_vec(),
        annuites: (1..=duree).map(|y| financing.annuite(y)).collect(),
        taxable_income: input.profile.taxable_income,
        parts,
    };

    match JeanbrunCalculator::new(rules).calculate(&jeanbrun_input) {
        Ok(result) => Ok(result),
        Err(SimulationError::Eligibility(reason)) => {
            info!(%reason, "jeanbrun not eligible");
            Ok(JeanbrunResult::ineligible(&reason))
        }
        Err(SimulationError::Validation(err)) => Err(err),
    }
}

fn compare(
    jeanbrun: Option<&JeanbrunResult>,
    lmnp: Option<&LmnpResult>,
) -> Comparatif {
    let jeanbrun_net_gain = jeanbrun.filter(|j| j.eligible).map(|j| j.net_gain);
    let lmnp_net_gain = lmnp.map(LmnpResult::net_gain);

    let (delta, meilleur_dispositif) = match (jeanbrun_net_gain, lmnp_net_gain) {
        (Some(j), Some(l)) => {
            let delta = j - l;
            let best = if delta > Decimal::ZERO {
                Dispositif::Jeanbrun
            } else {
                Dispositif::Lmnp
            };
            (Some(delta), Some(best))
        }
        (Some(_), None) => (None, Some(Dispositif::Jeanbrun)),
        (None, Some(_)) => (None, Some(Dispositif::Lmnp)),
        (None, None) => (None, None),
    };

    Comparatif {
        jeanbrun_net_gain,
        lmnp_net_gain,
        delta,
        meilleur_dispositif,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::fixtures::sample_input;
    use crate::{LmnpRegime, ZoneFiscale};

    fn rules() -> &'static TaxYearRules {
        TaxYearRules::builtin(2026).unwrap()
    }

    fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    #[test]
    fn orchestrer_simulation_reference_scenario() {
        let _guard = init_test_tracing();

        let result =
            orchestrer_simulation(&sample_input(), rules(), SimulationOptions::default()).unwrap();

        assert_eq!(result.tax_year, 2026);
        assert_eq!(result.impot_foyer.total_tax, dec!(3410.00));
        assert_eq!(result.taux_marginal, dec!(0.11));
        assert_eq!(result.tableau_amortissement.len(), 20);
        assert_eq!(result.financing.nombre_mois, 240);

        let jeanbrun = result.jeanbrun.as_ref().unwrap();
        assert!(jeanbrun.eligible);
        assert_eq!(jeanbrun.economie_impot, dec!(51480.00));
        assert_eq!(result.economie_impot, jeanbrun.economie_impot_effective);
        assert!(result.lmnp.is_some());
    }

    #[test]
    fn orchestrer_simulation_comparatif_is_jeanbrun_minus_lmnp() {
        let result =
            orchestrer_simulation(&sample_input(), rules(), SimulationOptions::default()).unwrap();

        let comparatif = &result.comparatif;
        let jeanbrun = comparatif.jeanbrun_net_gain.unwrap();
        let lmnp = comparatif.lmnp_net_gain.unwrap();
        assert_eq!(comparatif.delta, Some(jeanbrun - lmnp));
        let expected = if jeanbrun - lmnp > Decimal::ZERO {
            Dispositif::Jeanbrun
        } else {
            Dispositif::Lmnp
        };
        assert_eq!(comparatif.meilleur_dispositif, Some(expected));
    }

    #[test]
    fn orchestrer_simulation_captures_ineligibility() {
        let mut input = sample_input();
        input.property.travaux_amount = dec!(10000);

        let result =
            orchestrer_simulation(&input, rules(), SimulationOptions::default()).unwrap();

        let jeanbrun = result.jeanbrun.as_ref().unwrap();
        assert!(!jeanbrun.eligible);
        assert!(jeanbrun.reason.as_deref().unwrap().contains("renovation"));
        assert_eq!(result.economie_impot, dec!(0));
        assert_eq!(result.comparatif.delta, None);
        assert_eq!(result.comparatif.jeanbrun_net_gain, None);
        assert_eq!(result.comparatif.meilleur_dispositif, Some(Dispositif::Lmnp));
        assert!(result.lmnp.is_some());
    }

    #[test]
    fn orchestrer_simulation_zone_c_still_compares_lmnp() {
        let mut input = sample_input();
        input.property.zone_fiscale = ZoneFiscale::C;

        let result =
            orchestrer_simulation(&input, rules(), SimulationOptions::default()).unwrap();

        assert!(!result.jeanbrun.unwrap().eligible);
        assert_eq!(result.comparatif.meilleur_dispositif, Some(Dispositif::Lmnp));
    }

    #[test]
    fn orchestrer_simulation_validation_error_aborts() {
        let mut input = sample_input();
        input.rental.monthly_rent = dec!(-1);

        let result = orchestrer_simulation(&input, rules(), SimulationOptions::default());

        assert!(matches!(
            result,
            Err(ValidationError::NegativeAmount {
                field: "monthly_rent",
                ..
            })
        ));
    }

    #[test]
    fn orchestrer_simulation_rejects_unrepresentable_total_cost() {
        let mut input = sample_input();
        input.property.travaux_amount = Decimal::MAX;

        let result = orchestrer_simulation(&input, rules(), SimulationOptions::default());

        assert!(matches!(
            result,
            Err(ValidationError::AmountTooLarge {
                field: "travaux_amount",
                ..
            })
        ));
    }

    #[test]
    fn orchestrer_simulation_respects_options() {
        let options = SimulationOptions {
            jeanbrun_enabled: false,
            lmnp_enabled: true,
        };

        let result = orchestrer_simulation(&sample_input(), rules(), options).unwrap();

        assert!(result.jeanbrun.is_none());
        assert_eq!(result.economie_impot, dec!(0));
        assert_eq!(result.comparatif.delta, None);
        assert_eq!(result.comparatif.meilleur_dispositif, Some(Dispositif::Lmnp));
    }

    #[test]
    fn orchestrer_simulation_lmnp_only_disabled() {
        let options = SimulationOptions {
            jeanbrun_enabled: true,
            lmnp_enabled: false,
        };

        let result = orchestrer_simulation(&sample_input(), rules(), options).unwrap();

        assert!(result.lmnp.is_none());
        assert_eq!(result.comparatif.meilleur_dispositif, Some(Dispositif::Jeanbrun));
    }

    #[test]
    fn orchestrer_simulation_structure_is_pass_through() {
        let mut input = sample_input();
        let baseline = orchestrer_simulation(&input, rules(), SimulationOptions::default()).unwrap();
        input.legal.structure = LegalStructure::SciIs;

        let result = orchestrer_simulation(&input, rules(), SimulationOptions::default()).unwrap();

        assert_eq!(result.structure, LegalStructure::SciIs);
        assert_eq!(result.comparatif, baseline.comparatif);
        assert_eq!(result.jeanbrun, baseline.jeanbrun);
    }

    #[test]
    fn orchestrer_simulation_passes_loan_interest_to_lmnp() {
        let result =
            orchestrer_simulation(&sample_input(), rules(), SimulationOptions::default()).unwrap();

        let lmnp = result.lmnp.unwrap();
        assert_eq!(lmnp.reel.rows[0].interets, result.financing.interets_par_annee(1));
        assert_eq!(lmnp.regime_optimal, LmnpRegime::Reel);
    }

    #[test]
    fn orchestrer_simulation_is_idempotent() {
        let input = sample_input();

        let a = orchestrer_simulation(&input, rules(), SimulationOptions::default());
        let b = orchestrer_simulation(&input, rules(), SimulationOptions::default());

        assert_eq!(a, b);
    }

    #[test]
    fn simulation_options_default_enables_both() {
        let options = SimulationOptions::default();

        assert!(options.jeanbrun_enabled);
        assert!(options.lmnp_enabled);
    }
}
