pub mod analytics;
pub mod chart;
pub mod dividend;
pub mod holding;
pub mod portfolio;
pub mod quote;
pub mod recommendation;
pub mod settings;
pub mod snapshot;
pub mod transaction;
