//! Dataset-level views over the sequence store.
//!
//! Everything here is derived: statistics and validation results are
//! recomputed from the store on every call and never cached, since
//! sequences may be added or removed outside this process.

mod stats;
mod training;
mod validator;

pub use stats::DatasetStats;
pub use training::{TrainingSet, DEFAULT_VALIDATION_SPLIT};
pub use validator::{DatasetValidator, ValidationConfig, ValidationError, ValidationSummary};
