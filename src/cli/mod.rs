//! CLI command implementations

pub mod accounts;
pub mod error;
pub mod export;

pub use accounts::{AccountsCommand, DomainsCommand, PingCommand, StorageCommand};
pub use error::CliError;
pub use export::{Cli, Commands, ExportArgs, OutputFormat};
