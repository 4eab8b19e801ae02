pub mod calculations;
pub mod db;
pub mod error;
pub mod models;

pub use db::repository::{RepositoryError, RuleRepository};
pub use error::{EligibilityError, SimulationError, ValidationError};
pub use models::*;
