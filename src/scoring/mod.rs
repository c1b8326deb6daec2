pub mod fallback;
pub mod lookalike;

pub use fallback::{assess as fallback_assess, evaluate, score, FallbackReport, FALLBACK_CONFIDENCE};
