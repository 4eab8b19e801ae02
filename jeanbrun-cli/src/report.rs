//! Plain-text rendering of results for the terminal.

use std::fmt::Write;

use jeanbrun_core::calculations::{
    JeanbrunResult, LmnpResult, MicroBicOutcome, SimulationResult,
};
use jeanbrun_core::{SimulationRecord, TaxYearRules};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::app::BatchLine;

/// Euros with two decimals, e.g. `51480.00 €`.
pub fn eur(amount: Decimal) -> String {
    format!(
        "{:.2} €",
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

/// A fraction as a percentage, e.g. `0.172` → `17.20 %`.
pub fn pct(rate: Decimal) -> String {
    let percent = (rate * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{percent:.2} %")
}

fn push_jeanbrun(out: &mut String, jeanbrun: &JeanbrunResult) {
    let _ = writeln!(out, "\nJeanbrun");
    if !jeanbrun.eligible {
        let reason = jeanbrun.reason.as_deref().unwrap_or("not eligible");
        let _ = writeln!(out, "  not eligible: {reason}");
        return;
    }
    let _ = writeln!(out, "  reduction rate        {}", pct(jeanbrun.taux_reduction));
    let _ = writeln!(out, "  eligible base         {}", eur(jeanbrun.base_eligible));
    let _ = writeln!(out, "  reduction granted     {}", eur(jeanbrun.economie_impot));
    let _ = writeln!(out, "  reduction used        {}", eur(jeanbrun.economie_impot_effective));
    match jeanbrun.plafond_loyer_mensuel {
        Some(cap) => {
            let _ = writeln!(
                out,
                "  monthly rent          {} (cap {})",
                eur(jeanbrun.loyer_mensuel_retenu),
                eur(cap)
            );
        }
        None => {
            let _ = writeln!(out, "  monthly rent          {}", eur(jeanbrun.loyer_mensuel_retenu));
        }
    }
    let _ = writeln!(out, "  gross yield           {}", pct(jeanbrun.rendement_brut));
    let _ = writeln!(out, "  net yield             {}", pct(jeanbrun.rendement_net));
    let _ = writeln!(out, "  monthly effort        {}", eur(jeanbrun.effort_epargne_mensuel));
    let _ = writeln!(out, "  resale value          {}", eur(jeanbrun.valeur_revente));
    let _ = writeln!(out, "  net gain              {}", eur(jeanbrun.net_gain));
}

fn push_lmnp(out: &mut String, lmnp: &LmnpResult) {
    let _ = writeln!(out, "\nLMNP");
    match &lmnp.micro_bic {
        MicroBicOutcome::Eligible(micro) => {
            let _ = writeln!(
                out,
                "  micro-bic   tax {:>14}   net gain {:>14}",
                eur(micro.total_impot),
                eur(micro.net_gain)
            );
        }
        MicroBicOutcome::Ineligible { reason } => {
            let _ = writeln!(out, "  micro-bic   excluded: {reason}");
        }
    }
    let _ = writeln!(
        out,
        "  reel        tax {:>14}   net gain {:>14}",
        eur(lmnp.reel.total_impot),
        eur(lmnp.reel.net_gain)
    );
    let _ = writeln!(out, "  best regime           {}", lmnp.regime_optimal);
    if let Some(declared) = lmnp.regime_declare {
        if declared != lmnp.regime_optimal {
            let _ = writeln!(out, "  declared regime       {declared} (not optimal)");
        }
    }
}

/// Summary of one simulation.
pub fn render_simulation(result: &SimulationResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Simulation {} ({})", result.tax_year, result.structure.as_str());
    let _ = writeln!(
        out,
        "  household tax         {} ({} average, {} marginal)",
        eur(result.impot_foyer.total_tax),
        pct(result.taux_imposition),
        pct(result.taux_marginal)
    );

    let financing = &result.financing;
    if financing.nombre_mois > 0 {
        let _ = writeln!(
            out,
            "  loan installment      {} + {} insurance over {} months",
            eur(financing.mensualite),
            eur(financing.assurance_mensuelle),
            financing.nombre_mois
        );
        let _ = writeln!(out, "  total interest        {}", eur(financing.cout_total_interets));
    }
    let endettement = &result.endettement;
    let _ = writeln!(
        out,
        "  debt ratio            {} (max {}){}",
        pct(endettement.taux_endettement),
        pct(endettement.taux_max),
        if endettement.within_limit { "" } else { "  OVER LIMIT" }
    );

    if let Some(jeanbrun) = &result.jeanbrun {
        push_jeanbrun(&mut out, jeanbrun);
    }
    if let Some(lmnp) = &result.lmnp {
        push_lmnp(&mut out, lmnp);
    }

    let comparatif = &result.comparatif;
    if let (Some(delta), Some(best)) = (comparatif.delta, comparatif.meilleur_dispositif) {
        let _ = writeln!(out, "\nBest scheme: {best} (delta {})", eur(delta));
    }
    out
}

/// Every table of one tax year.
pub fn render_rules(rules: &TaxYearRules) -> String {
    let mut out = String::new();
    let config = &rules.config;
    let _ = writeln!(out, "Rules for {}", config.tax_year);
    let _ = writeln!(out, "  renovation threshold  {}", pct(config.travaux_min_share));
    let _ = writeln!(out, "  investment ceiling    {}", eur(config.investment_ceiling));
    let _ = writeln!(out, "  tax niche ceiling     {}", eur(config.tax_niche_ceiling));
    let _ = writeln!(out, "  social contributions  {}", pct(config.social_contributions_rate));
    let _ = writeln!(out, "  max debt ratio        {}", pct(config.max_debt_ratio));

    let _ = writeln!(out, "\nIncome tax brackets (per part)");
    for bracket in &rules.brackets {
        let upper = bracket.max_income.map_or_else(|| "and above".to_string(), eur);
        let _ = writeln!(
            out,
            "  {:>14} - {:<14} {}",
            eur(bracket.min_income),
            upper,
            pct(bracket.tax_rate)
        );
    }

    let _ = writeln!(out, "\nMicro-BIC");
    for allowance in &rules.micro_bic {
        let _ = writeln!(
            out,
            "  {:<22} allowance {}  ceiling {}",
            allowance.category.as_str(),
            pct(allowance.allowance_rate),
            eur(allowance.revenue_ceiling)
        );
    }

    let _ = writeln!(out, "\nProperty components");
    for component in &rules.components {
        let _ = writeln!(
            out,
            "  {:<22} share {}  rate {}",
            component.name,
            pct(component.allocation_share),
            pct(component.depreciation_rate)
        );
    }

    let _ = writeln!(out, "\nJeanbrun rates");
    for tier in &rules.jeanbrun_tiers {
        let _ = writeln!(
            out,
            "  {:<6} {:>2} years  {:<14} {}",
            tier.zone.as_str(),
            tier.duree_detention,
            tier.niveau_loyer.as_str(),
            pct(tier.reduction_rate)
        );
    }

    let _ = writeln!(out, "\nRent ceilings (per m²)");
    for ceiling in &rules.rent_ceilings {
        let _ = writeln!(
            out,
            "  {:<6} {:<14} {}",
            ceiling.zone.as_str(),
            ceiling.niveau_loyer.as_str(),
            eur(ceiling.plafond_m2)
        );
    }
    out
}

pub fn render_history(records: &[SimulationRecord]) -> String {
    if records.is_empty() {
        return "No saved simulations.\n".to_string();
    }
    let mut out = String::new();
    for record in records {
        let delta = record.comparatif_delta.map_or_else(|| "-".to_string(), eur);
        let _ = writeln!(
            out,
            "#{:<4} {}  {}  {:<20} saving {:>14}  delta {:>14}",
            record.id,
            record.created_at.format("%Y-%m-%d %H:%M"),
            record.tax_year,
            record.label.as_deref().unwrap_or("-"),
            eur(record.economie_impot),
            delta
        );
    }
    out
}

pub fn render_batch(lines: &[BatchLine]) -> String {
    let mut out = String::new();
    for line in lines {
        match &line.outcome {
            Ok(result) => {
                let best = result
                    .comparatif
                    .meilleur_dispositif
                    .map_or_else(|| "-".to_string(), |d| d.to_string());
                let _ = writeln!(
                    out,
                    "{:<24} saving {:>14}  net yield {:>9}  best {}",
                    line.label,
                    eur(result.economie_impot),
                    pct(result.rendement_net),
                    best
                );
            }
            Err(err) => {
                let _ = writeln!(out, "{:<24} rejected: {err}", line.label);
            }
        }
    }
    out
}
