pub mod connection;
pub mod counters;
pub mod history;
pub mod schema;
pub mod whitelist;

pub use connection::Database;
pub use counters::BLOCKED_COUNT;
pub use history::HistoryRecord;
