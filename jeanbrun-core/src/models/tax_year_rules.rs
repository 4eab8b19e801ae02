//! Versioned rule tables.
//!
//! A [`TaxYearRules`] bundles every table the calculators read for one tax
//! year. Tables are plain data: a new year is added by building (or loading)
//! a new value, never by touching calculation code. The built-in years are
//! constructed once per process and shared by reference.

use std::sync::LazyLock;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    JeanbrunRateTier, MicroBicAllowance, NiveauLoyer, PropertyComponent, RentCeiling,
    RentalCategory, TaxBracket, TaxYearConfig, ZoneFiscale,
};
use crate::calculations::amortization::validate_components;
use crate::calculations::income_tax::validate_brackets;
use crate::error::{ValidationError, ensure_amount, ensure_rate};

/// Every rule table needed by a simulation for one tax year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxYearRules {
    pub config: TaxYearConfig,
    pub brackets: Vec<TaxBracket>,
    pub micro_bic: Vec<MicroBicAllowance>,
    pub components: Vec<PropertyComponent>,
    pub jeanbrun_tiers: Vec<JeanbrunRateTier>,
    pub rent_ceilings: Vec<RentCeiling>,
}

static BUILTIN: LazyLock<Vec<TaxYearRules>> =
    LazyLock::new(|| vec![builtin_rules(2025), builtin_rules(2026)]);

impl TaxYearRules {
    pub fn tax_year(&self) -> i32 {
        self.config.tax_year
    }

    /// Built-in tables for `year`, if that year ships with the crate.
    pub fn builtin(year: i32) -> Option<&'static TaxYearRules> {
        BUILTIN.iter().find(|rules| rules.tax_year() == year)
    }

    /// Years with built-in tables, oldest first.
    pub fn builtin_years() -> Vec<i32> {
        BUILTIN.iter().map(TaxYearRules::tax_year).collect()
    }

    /// Most recent built-in tables.
    pub fn latest_builtin() -> &'static TaxYearRules {
        BUILTIN
            .iter()
            .max_by_key(|rules| rules.tax_year())
            .unwrap_or(&BUILTIN[0])
    }

    pub fn micro_bic_allowance(
        &self,
        category: RentalCategory,
    ) -> Option<&MicroBicAllowance> {
        self.micro_bic.iter().find(|a| a.category == category)
    }

    pub fn rent_ceiling(
        &self,
        zone: ZoneFiscale,
        niveau: NiveauLoyer,
    ) -> Option<&RentCeiling> {
        self.rent_ceilings
            .iter()
            .find(|c| c.zone == zone && c.niveau_loyer == niveau)
    }

    /// Checks the internal consistency of every table.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found in brackets, components,
    /// allowance rates or scalar configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_brackets(&self.brackets)?;
        validate_components(&self.components)?;

        for allowance in &self.micro_bic {
            ensure_rate("allowance_rate", allowance.allowance_rate)?;
            ensure_amount("revenue_ceiling", allowance.revenue_ceiling)?;
        }
        for tier in &self.jeanbrun_tiers {
            ensure_rate("reduction_rate", tier.reduction_rate)?;
        }
        for ceiling in &self.rent_ceilings {
            ensure_amount("plafond_m2", ceiling.plafond_m2)?;
        }

        let config = &self.config;
        ensure_rate("travaux_min_share", config.travaux_min_share)?;
        ensure_amount("investment_ceiling", config.investment_ceiling)?;
        ensure_amount("tax_niche_ceiling", config.tax_niche_ceiling)?;
        ensure_rate("social_contributions_rate", config.social_contributions_rate)?;
        ensure_rate("max_debt_ratio", config.max_debt_ratio)?;
        ensure_rate("travaux_depreciation_rate", config.travaux_depreciation_rate)?;
        ensure_rate("mobilier_depreciation_rate", config.mobilier_depreciation_rate)?;
        Ok(())
    }
}

fn builtin_rules(tax_year: i32) -> TaxYearRules {
    TaxYearRules {
        config: TaxYearConfig {
            tax_year,
            travaux_min_share: Decimal::new(30, 2),
            investment_ceiling: Decimal::from(300_000),
            tax_niche_ceiling: Decimal::from(10_000),
            social_contributions_rate: Decimal::new(172, 3),
            max_debt_ratio: Decimal::new(35, 2),
            travaux_depreciation_rate: Decimal::new(10, 2),
            mobilier_depreciation_rate: Decimal::new(20, 2),
        },
        brackets: builtin_brackets(tax_year),
        micro_bic: vec![
            allowance(tax_year, RentalCategory::LongueDuree, 50, 77_700),
            allowance(tax_year, RentalCategory::TourismeNonClasse, 30, 15_000),
            allowance(tax_year, RentalCategory::ChambresHotes, 71, 77_700),
        ],
        components: vec![
            PropertyComponent::new("terrain", Decimal::new(15, 2), Decimal::ZERO),
            PropertyComponent::new("gros-oeuvre", Decimal::new(50, 2), Decimal::new(2, 2)),
            PropertyComponent::new("facades-toiture", Decimal::new(15, 2), Decimal::new(4, 2)),
            PropertyComponent::new("agencements", Decimal::new(20, 2), Decimal::new(10, 2)),
        ],
        jeanbrun_tiers: builtin_tiers(tax_year),
        rent_ceilings: builtin_rent_ceilings(tax_year),
    }
}

// Income-tax schedule applied to the previous year's income.
fn builtin_brackets(tax_year: i32) -> Vec<TaxBracket> {
    let bounds: [i64; 4] = if tax_year >= 2026 {
        [11_600, 29_579, 84_577, 181_917]
    } else {
        [11_497, 29_315, 83_823, 180_294]
    };
    let rates = [0, 11, 30, 41, 45];

    let mut brackets = Vec::with_capacity(rates.len());
    let mut lower = Decimal::ZERO;
    for (i, rate) in rates.iter().enumerate() {
        let upper = bounds.get(i).map(|b| Decimal::from(*b));
        brackets.push(TaxBracket {
            tax_year,
            min_income: lower,
            max_income: upper,
            tax_rate: Decimal::new(*rate, 2),
        });
        if let Some(upper) = upper {
            lower = upper;
        }
    }
    brackets
}

fn allowance(
    tax_year: i32,
    category: RentalCategory,
    rate_percent: i64,
    ceiling: i64,
) -> MicroBicAllowance {
    MicroBicAllowance {
        tax_year,
        category,
        allowance_rate: Decimal::new(rate_percent, 2),
        revenue_ceiling: Decimal::from(ceiling),
    }
}

// Zone C is outside the scheme; B2 gets two points less than the tight zones.
fn builtin_tiers(tax_year: i32) -> Vec<JeanbrunRateTier> {
    let durations: [(u32, i64); 3] = [(6, 12), (9, 18), (12, 21)];
    let mut tiers = Vec::new();

    for zone in [ZoneFiscale::ABis, ZoneFiscale::A, ZoneFiscale::B1, ZoneFiscale::B2] {
        let zone_adjustment = if zone == ZoneFiscale::B2 { -2 } else { 0 };
        for niveau in NiveauLoyer::ALL {
            let niveau_bonus = match niveau {
                NiveauLoyer::Intermediaire => 0,
                NiveauLoyer::Social => 2,
                NiveauLoyer::TresSocial => 4,
            };
            for (duree, base_percent) in durations {
                tiers.push(JeanbrunRateTier {
                    tax_year,
                    zone,
                    duree_detention: duree,
                    niveau_loyer: niveau,
                    reduction_rate: Decimal::new(base_percent + niveau_bonus + zone_adjustment, 2),
                });
            }
        }
    }
    tiers
}

fn builtin_rent_ceilings(tax_year: i32) -> Vec<RentCeiling> {
    // (zone, intermediaire, social, tres-social) in cents per m²
    let table: [(ZoneFiscale, [i64; 3]); 4] = [
        (ZoneFiscale::ABis, [1889, 1511, 1133]),
        (ZoneFiscale::A, [1403, 1122, 842]),
        (ZoneFiscale::B1, [1131, 905, 679]),
        (ZoneFiscale::B2, [983, 786, 590]),
    ];

    table
        .iter()
        .flat_map(|(zone, cents)| {
            NiveauLoyer::ALL
                .into_iter()
                .zip(cents.iter().copied())
                .map(move |(niveau, c)| RentCeiling {
                    tax_year,
                    zone: *zone,
                    niveau_loyer: niveau,
                    plafond_m2: Decimal::new(c, 2),
                })
        })
        .collect()
}
