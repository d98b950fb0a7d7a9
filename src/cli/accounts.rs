//! Lookup commands: ping, accounts, domains, storage

use crate::HostingId;
use clap::Args;
use serde_json::json;

use super::export::{Cli, OutputFormat};
use super::CliError;

/// Ping subcommand
#[derive(Debug, Args)]
pub struct PingCommand {}

impl PingCommand {
    /// Probe the API once (retries included)
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let api = cli.build_api()?;
        api.ping().await?;

        match cli.output_format {
            OutputFormat::Json => println!("{}", json!({ "success": true })),
            OutputFormat::Human => println!("API reachable"),
        }
        Ok(())
    }
}

/// Accounts subcommand
#[derive(Debug, Args)]
pub struct AccountsCommand {}

impl AccountsCommand {
    /// List hosting accounts
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let api = cli.build_api()?;
        let accounts = api.list_hostings().await?;

        match cli.output_format {
            OutputFormat::Json => println!("{}", json!({ "accounts": accounts })),
            OutputFormat::Human => {
                if accounts.is_empty() {
                    println!("No hosting accounts found");
                }
                for account in &accounts {
                    println!("{}\t{}", account.id, account.username);
                }
            }
        }
        Ok(())
    }
}

/// Domains subcommand
#[derive(Debug, Args)]
pub struct DomainsCommand {
    /// Hosting account to list
    #[arg(long)]
    pub hosting_id: HostingId,
}

impl DomainsCommand {
    /// List domains of one account
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let api = cli.build_api()?;
        let domains = api.list_domains(&self.hosting_id).await?;

        match cli.output_format {
            OutputFormat::Json => println!(
                "{}",
                json!({ "hosting_id": self.hosting_id, "domains": domains })
            ),
            OutputFormat::Human => {
                for domain in &domains {
                    println!("{domain}");
                }
            }
        }
        Ok(())
    }
}

/// Storage subcommand
#[derive(Debug, Args)]
pub struct StorageCommand {
    /// Hosting account to look up
    #[arg(long)]
    pub hosting_id: HostingId,

    /// Print the secret key instead of redacting it
    #[arg(long, default_value_t = false)]
    pub show_secret: bool,
}

impl StorageCommand {
    /// Show storage credentials of one account
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let api = cli.build_api()?;
        let creds = api.storage_credentials(&self.hosting_id).await?;

        let secret = if self.show_secret {
            creds.secret_key.as_str()
        } else {
            "<redacted>"
        };

        match cli.output_format {
            OutputFormat::Json => println!(
                "{}",
                json!({
                    "hosting_id": self.hosting_id,
                    "bucket": creds.bucket,
                    "access_key": creds.access_key,
                    "secret_key": secret,
                })
            ),
            OutputFormat::Human => {
                println!("Bucket: {}", creds.bucket);
                println!("Access key: {}", creds.access_key);
                println!("Secret key: {secret}");
            }
        }
        Ok(())
    }
}
