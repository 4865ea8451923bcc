//! Reporting data model
//!
//! Everything here is computed on demand and lives only for one report
//! request or one dispatch cycle. Monetary values are `Decimal` in major
//! currency units and serialize as JSON numbers.

pub mod comparison;
pub mod ranking;
pub mod report;
pub mod sales_record;
pub mod window;

// Re-exports
pub use comparison::*;
pub use ranking::*;
pub use report::*;
pub use sales_record::*;
pub use window::*;
