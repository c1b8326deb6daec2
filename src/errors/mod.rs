pub mod types;
pub mod classification;

pub use types::GuardError;
pub use classification::{ErrorClassification, Recovery};
