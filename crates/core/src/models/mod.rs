pub mod analytics;
pub mod cryptocurrency;
pub mod holding;
pub mod portfolio;
pub mod trade;
pub mod transaction;
pub mod wallet;
