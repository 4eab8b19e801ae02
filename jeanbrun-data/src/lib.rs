//! CSV loaders for yearly rule tables.
//!
//! Each loader parses a CSV into plain records, then writes them through any
//! [`jeanbrun_core::RuleRepository`]. Loading replaces a whole tax year at a
//! time, so running the same file twice leaves the database unchanged.

mod fields;
mod loader;
mod rate_loader;

pub use loader::{TaxBracketLoader, TaxBracketLoaderError, TaxBracketRecord};
pub use rate_loader::{JeanbrunRateLoader, JeanbrunRateLoaderError, JeanbrunRateRecord};
