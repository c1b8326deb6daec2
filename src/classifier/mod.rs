pub mod provider;
pub mod remote;
pub mod types;

pub use provider::{classify_within, ThreatClassifier};
pub use remote::RemoteClassifier;
pub use types::{AnalysisContext, HealthStatus};
