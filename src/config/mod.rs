pub mod parser;
pub mod schema;
pub mod types;
pub mod security;

pub use types::*;
pub use parser::{is_bare_hostname, parse_config, parse_config_str};
