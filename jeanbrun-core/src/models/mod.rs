mod codes;
mod jeanbrun_rate;
mod micro_bic_allowance;
mod property_component;
mod simulation_record;
mod tax_bracket;
mod tax_year_config;
mod tax_year_rules;
mod wizard;

pub use codes::{
    FamilySituation, LegalStructure, LmnpRegime, NiveauLoyer, RentalCategory, ZoneFiscale,
};
pub use jeanbrun_rate::{JeanbrunRateTier, RentCeiling};
pub use micro_bic_allowance::MicroBicAllowance;
pub use property_component::PropertyComponent;
pub use simulation_record::{NewSimulationRecord, SimulationRecord};
pub use tax_bracket::TaxBracket;
pub use tax_year_config::TaxYearConfig;
pub use tax_year_rules::TaxYearRules;
pub use wizard::{
    FinancingStep, HoldingStep, LegalStructureStep, ProfileStep, PropertyStep,
    RentalStrategyStep, SimulationInput,
};

#[cfg(test)]
pub(crate) use wizard::fixtures;
