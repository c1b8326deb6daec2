pub mod event_log;

pub use event_log::{record_event, AssessmentEvent, EventSink, JsonlEventLog, NullEventLog};
