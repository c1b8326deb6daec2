pub mod dom;
pub mod page;
pub mod scanner;

pub use dom::{FormElement, InputField, PageEvent, PageSnapshot};
pub use page::{run_page_agent, PageAgent, PageView, SubmitDecision};
