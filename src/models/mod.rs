pub mod assessment;
pub mod signal;

pub use assessment::*;
pub use signal::*;
