mod strategy;
mod history;

pub use strategy::{ContextStrategy, ContextWindow};
pub use history::HistoryContextStrategy;
