//! SolVibe CLI - sign in to SolVibe with a wallet.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use commands::{Context, LoginArgs};
use solvibe_core::{Paths, ProfileUpdate};

/// SolVibe CLI - wallet sign-in and profile management.
#[derive(Parser)]
#[command(name = "solvibe")]
#[command(about = "SolVibe CLI for wallet authentication")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text", global = true)]
    format: output::OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Backend base URL, overriding config and SOLVIBE_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect the wallet and sign in, registering if needed
    Login {
        /// Username to register with if the wallet is new
        #[arg(long)]
        username: Option<String>,
        /// Display name to register with if the wallet is new
        #[arg(long)]
        name: Option<String>,
        /// Bio to register with if the wallet is new
        #[arg(long)]
        bio: Option<String>,
    },

    /// Logout, clear the session and disconnect the wallet
    Logout,

    /// Check authentication status
    Status,

    /// Show or edit the signed-in profile
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Manage the local wallet
    Wallet {
        #[command(subcommand)]
        command: WalletCommands,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Show the profile
    Show {
        /// Fetch the profile from the backend instead of the stored session
        #[arg(long)]
        remote: bool,
    },
    /// Edit the stored profile
    Update {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        name: Option<String>,
        /// Pass an empty string to clear the bio
        #[arg(long)]
        bio: Option<String>,
    },
}

#[derive(Subcommand)]
enum WalletCommands {
    /// Show the wallet address
    Address,
    /// Generate a new wallet key
    New {
        /// Replace an existing key
        #[arg(long)]
        force: bool,
    },
    /// Disconnect the wallet, ending the session
    Disconnect,
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context::open(cli.api_url.as_deref()).await?;
    let format = &cli.format;

    match cli.command {
        Commands::Login {
            username,
            name,
            bio,
        } => commands::login(&ctx, LoginArgs { username, name, bio }, format).await,
        Commands::Logout => commands::logout(&ctx, format).await,
        Commands::Status => commands::status(&ctx, format).await,
        Commands::Profile { command } => match command {
            ProfileCommands::Show { remote } => commands::profile_show(&ctx, remote, format).await,
            ProfileCommands::Update {
                username,
                name,
                bio,
            } => {
                let update = ProfileUpdate {
                    username,
                    name,
                    bio,
                };
                commands::profile_update(&ctx, update, format).await
            }
        },
        Commands::Wallet { command } => match command {
            WalletCommands::Address => commands::wallet_address(&ctx, format).await,
            WalletCommands::New { force } => commands::wallet_new(&ctx, force, format).await,
            WalletCommands::Disconnect => commands::wallet_disconnect(&ctx, format).await,
        },
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Mirror to stderr only when asked for something more verbose than the default
    let also_stderr = matches!(
        solvibe_core::parse_level(&cli.log_level),
        tracing::Level::DEBUG | tracing::Level::TRACE
    );
    let log_path = Paths::new().ok().map(|paths| paths.log_file());
    solvibe_core::init_logging_for_service("solvibe-cli", &cli.log_level, log_path, also_stderr);

    let format = cli.format;
    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e), &format);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_login_flags_parse() {
        let cli = Cli::try_parse_from([
            "solvibe", "login", "--username", "alice", "--name", "Alice", "-f", "json",
        ])
        .unwrap();
        assert_eq!(cli.format, output::OutputFormat::Json);
        match cli.command {
            Commands::Login { username, name, bio } => {
                assert_eq!(username.as_deref(), Some("alice"));
                assert_eq!(name.as_deref(), Some("Alice"));
                assert!(bio.is_none());
            }
            _ => panic!("expected login"),
        }
    }

    #[test]
    fn test_profile_update_allows_clearing_bio() {
        let cli = Cli::try_parse_from(["solvibe", "profile", "update", "--bio", ""]).unwrap();
        match cli.command {
            Commands::Profile {
                command: ProfileCommands::Update { bio, .. },
            } => assert_eq!(bio.as_deref(), Some("")),
            _ => panic!("expected profile update"),
        }
    }
}
