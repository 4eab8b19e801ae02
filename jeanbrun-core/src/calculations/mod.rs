//! Tax and financing calculators.
//!
//! Each calculator is a small struct borrowing the rule tables it needs,
//! with a single public entry point. [`orchestrer_simulation`] chains them.

pub mod amortization;
pub mod common;
pub mod financing;
pub mod income_tax;
pub mod jeanbrun;
pub mod lmnp;
pub mod micro_bic;
pub mod simulation;

/// Longest holding period and depreciation schedule, in years.
pub const MAX_HOLDING_YEARS: u32 = 30;

pub use amortization::{AmortizationRow, AmortizationSchedule, ComponentDepreciation};
pub use financing::{
    DebtRatioAnalysis, FinancingAnalyzer, FinancingInput, FinancingResult, LoanPeriodRow,
    LoanYearRow,
};
pub use income_tax::{IncomeTaxCalculator, IncomeTaxResult};
pub use jeanbrun::{JeanbrunCalculator, JeanbrunInput, JeanbrunResult, JeanbrunYearRow};
pub use lmnp::{
    LmnpComparator, LmnpInput, LmnpRegimeResult, LmnpResult, LmnpYearRow, MicroBicOutcome,
};
pub use micro_bic::{MicroBicCalculator, MicroBicResult};
pub use simulation::{
    Comparatif, Dispositif, SimulationOptions, SimulationResult, orchestrer_simulation,
};
