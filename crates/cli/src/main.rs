//! Blood Donor Finder CLI - directory management tools.
//!
//! # Usage
//!
//! ```bash
//! # Insert donors from a YAML file (requires an admin account)
//! DONOR_FINDER_PASSWORD=... donor-cli seed donors.yaml --email admin@example.org
//!
//! # Print the directory, optionally filtered
//! donor-cli donors list --email staff@example.org --group B+ --search mum
//!
//! # Show the role the registry assigns to an account
//! donor-cli role staff@example.org
//! ```
//!
//! Every command signs in as a real account, so the same role checks and
//! backend security rules apply as in the web application. Backend selection
//! follows the web configuration (`DONOR_FINDER_BACKEND`, `FIREBASE_*`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

mod commands;

/// Default environment variable holding the account password.
const DEFAULT_PASSWORD_ENV: &str = "DONOR_FINDER_PASSWORD";

#[derive(Parser)]
#[command(name = "donor-cli")]
#[command(author, version, about = "Blood Donor Finder CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Account used to sign in.
#[derive(Args)]
struct Account {
    /// Account email address
    #[arg(short, long)]
    email: String,

    /// Environment variable holding the account password
    #[arg(long, default_value = DEFAULT_PASSWORD_ENV)]
    password_env: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert donors from a YAML fixture (admin or super admin)
    Seed {
        /// YAML file with a `donors` list
        file: PathBuf,

        #[command(flatten)]
        account: Account,
    },
    /// Browse the donor directory
    Donors {
        #[command(subcommand)]
        action: DonorsAction,
    },
    /// Print the role resolved for an account
    Role {
        /// Account email address
        email: String,

        /// Environment variable holding the account password
        #[arg(long, default_value = DEFAULT_PASSWORD_ENV)]
        password_env: String,
    },
}

#[derive(Subcommand)]
enum DonorsAction {
    /// List donors
    List {
        #[command(flatten)]
        account: Account,

        /// Blood group (`A+`, `O-`, ...) or `All`
        #[arg(short, long)]
        group: Option<String>,

        /// Case-insensitive match on name or city
        #[arg(short, long)]
        search: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "donor_cli=info,donor_finder_web=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Seed { file, account } => {
            commands::seed::donors(&file, &account.email, &account.password_env).await?;
        }
        Commands::Donors { action } => match action {
            DonorsAction::List {
                account,
                group,
                search,
            } => {
                commands::donors::list(
                    &account.email,
                    &account.password_env,
                    group.as_deref(),
                    search.as_deref(),
                )
                .await?;
            }
        },
        Commands::Role {
            email,
            password_env,
        } => commands::role::show(&email, &password_env).await?,
    }
    Ok(())
}
