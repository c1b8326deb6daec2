pub mod background;
pub mod engine;
pub mod messages;
pub mod response;
pub mod tab_state;

pub use background::{spawn_background, BackgroundContext, BackgroundHandle, NavigationReport};
pub use engine::{AssessmentEngine, Lookup};
pub use messages::{BackgroundMessage, PageCommand, WarningView};
pub use response::{PageRouter, ResponseController, ResponseOutcome};
pub use tab_state::{ActionTaken, TabPhase, TabState};
