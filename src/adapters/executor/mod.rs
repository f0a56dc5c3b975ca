//! Goal executor adapters.

pub mod command;
pub mod mock;

pub use command::CommandExecutor;
pub use mock::{MockExecutor, MockOutcome};
