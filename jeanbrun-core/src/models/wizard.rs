//! The six wizard steps, as typed records.
//!
//! Front ends deserialize a [`SimulationInput`] from their form state and call
//! [`SimulationInput::validate`] before handing it to the orchestrator. Every
//! amount is in euros, every rate a fraction.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{FamilySituation, LegalStructure, LmnpRegime, NiveauLoyer, RentalCategory, ZoneFiscale};
use crate::calculations::MAX_HOLDING_YEARS;
use crate::calculations::financing::{MAX_DEFERRAL_MONTHS, MAX_LOAN_YEARS};
use crate::error::{ValidationError, ensure_amount, ensure_rate};

/// Step 1: the household.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStep {
    /// Net taxable income of the household, excluding the investment.
    pub taxable_income: Decimal,
    #[serde(default)]
    pub situation: FamilySituation,
    #[serde(default)]
    pub children: u32,
    /// Explicit number of parts; derived from situation and children if absent.
    #[serde(default)]
    pub parts: Option<Decimal>,
    /// Net monthly income used for the debt ratio.
    #[serde(default)]
    pub monthly_income: Decimal,
    /// Monthly repayments of loans already running.
    #[serde(default)]
    pub existing_monthly_debt: Decimal,
}

impl ProfileStep {
    /// Household parts ("quotient familial").
    ///
    /// One part per adult, half a part for each of the first two children and
    /// a full part from the third.
    pub fn parts(&self) -> Decimal {
        if let Some(parts) = self.parts {
            return parts;
        }
        let adults = match self.situation {
            FamilySituation::Celibataire => Decimal::ONE,
            FamilySituation::Couple => Decimal::TWO,
        };
        let first_two = Decimal::from(self.children.min(2)) * Decimal::new(5, 1);
        let others = Decimal::from(self.children.saturating_sub(2));
        adults + first_two + others
    }
}

/// Step 2: the property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyStep {
    pub purchase_price: Decimal,
    #[serde(default)]
    pub travaux_amount: Decimal,
    /// Furniture bought for a furnished (LMNP) let.
    #[serde(default)]
    pub furniture_amount: Decimal,
    pub zone_fiscale: ZoneFiscale,
    /// Living area in m², used for the rent ceiling. Zero disables the cap.
    #[serde(default)]
    pub surface_m2: Decimal,
}

impl PropertyStep {
    /// Total cost of the operation.
    pub fn total_cost(&self) -> Decimal {
        self.purchase_price + self.travaux_amount + self.furniture_amount
    }
}

/// Step 3: the loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancingStep {
    #[serde(default)]
    pub down_payment: Decimal,
    pub annual_rate: Decimal,
    pub duration_years: u32,
    #[serde(default)]
    pub differe_months: u32,
    /// Borrower insurance, annual rate on the initial capital.
    #[serde(default)]
    pub insurance_rate: Decimal,
}

/// Step 4: how the property is let.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalStrategyStep {
    pub monthly_rent: Decimal,
    /// Deductible yearly charges: property tax, co-ownership, insurance, management.
    #[serde(default)]
    pub annual_charges: Decimal,
    #[serde(default)]
    pub rental_category: RentalCategory,
    /// Regime the investor currently declares, if any.
    #[serde(default)]
    pub lmnp_regime: Option<LmnpRegime>,
    #[serde(default)]
    pub niveau_loyer: NiveauLoyer,
}

/// Step 5: holding period and exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingStep {
    pub duree_detention: u32,
    #[serde(default)]
    pub revalorisation_rate: Decimal,
}

/// Step 6: legal structure.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegalStructureStep {
    #[serde(default)]
    pub structure: LegalStructure,
}

/// The consolidated wizard input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationInput {
    pub profile: ProfileStep,
    pub property: PropertyStep,
    pub financing: FinancingStep,
    pub rental: RentalStrategyStep,
    pub holding: HoldingStep,
    #[serde(default)]
    pub legal: LegalStructureStep,
}

impl SimulationInput {
    /// Amount borrowed: total cost minus the down payment, never negative.
    pub fn loan_amount(&self) -> Decimal {
        (self.property.total_cost() - self.financing.down_payment).max(Decimal::ZERO)
    }

    /// Shape and range checks on every step.
    ///
    /// Domain rules (renovation threshold, Micro-BIC ceilings) are left to the
    /// calculators.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] encountered.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let profile = &self.profile;
        ensure_amount("taxable_income", profile.taxable_income)?;
        ensure_amount("monthly_income", profile.monthly_income)?;
        ensure_amount("existing_monthly_debt", profile.existing_monthly_debt)?;
        crate::calculations::income_tax::validate_parts(profile.parts())?;

        let property = &self.property;
        ensure_amount("purchase_price", property.purchase_price)?;
        ensure_amount("travaux_amount", property.travaux_amount)?;
        ensure_amount("furniture_amount", property.furniture_amount)?;
        ensure_amount("surface_m2", property.surface_m2)?;

        let financing = &self.financing;
        ensure_amount("down_payment", financing.down_payment)?;
        ensure_rate("annual_rate", financing.annual_rate)?;
        ensure_rate("insurance_rate", financing.insurance_rate)?;
        if financing.duration_years > MAX_LOAN_YEARS {
            return Err(ValidationError::DurationTooLong {
                field: "duration_years",
                value: financing.duration_years,
                max: MAX_LOAN_YEARS,
            });
        }
        if financing.differe_months > MAX_DEFERRAL_MONTHS {
            return Err(ValidationError::DeferralTooLong {
                value: financing.differe_months,
                max: MAX_DEFERRAL_MONTHS,
            });
        }
        if self.loan_amount() > Decimal::ZERO && financing.duration_years == 0 {
            return Err(ValidationError::ZeroLoanDuration);
        }

        let rental = &self.rental;
        ensure_amount("monthly_rent", rental.monthly_rent)?;
        ensure_amount("annual_charges", rental.annual_charges)?;

        let holding = &self.holding;
        if holding.duree_detention == 0 {
            return Err(ValidationError::ZeroHoldingDuration);
        }
        if holding.duree_detention > MAX_HOLDING_YEARS {
            return Err(ValidationError::DurationTooLong {
                field: "duree_detention",
                value: holding.duree_detention,
                max: MAX_HOLDING_YEARS,
            });
        }
        ensure_rate("revalorisation_rate", holding.revalorisation_rate)?;

        Ok(())
    }
}
