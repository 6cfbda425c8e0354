pub mod agents;
pub mod config;
pub mod contact;
pub mod error;
pub mod listings;
pub mod record_store;
pub mod settings;
pub mod site;
pub mod telemetry;
