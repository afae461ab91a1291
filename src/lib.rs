pub mod cli;
pub mod config;
pub mod connectors;
pub mod gateway;
pub mod ledger;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod readers;
pub mod scheduler;
pub mod schema;

// Convenient re-exports for tests and external callers
pub use config::*;
pub use connectors::*;
pub use gateway::*;
pub use ledger::*;
pub use models::*;
pub use orchestrator::*;
pub use pipeline::*;
pub use readers::*;
pub use scheduler::*;
pub use schema::*;
