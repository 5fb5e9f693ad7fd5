#![forbid(unsafe_code)]

//! Values, records and plan summaries exchanged with the driver.

/// Ordered key/value rows.
pub mod record;

/// Dynamically typed driver values.
pub mod value;

/// Statement statistics and operator trees.
pub mod plan;

pub use plan::{Op, OpIter, Stats, StmtType};
pub use record::Record;
pub use value::{Params, Value};
