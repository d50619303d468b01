pub mod signals;
pub mod store;

pub use signals::SignalEngine;
pub use store::{ConfidencePoint, ResultStore, SignalCounts, SqliteResultStore};
