//! Saleor checkout CLI - sign in to a store and run authenticated GraphQL.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (password from --password or SALEOR_PASSWORD)
//! checkout-cli sign-in -e customer@example.com
//!
//! # Show the session and the signed-in customer
//! checkout-cli status
//!
//! # Run a GraphQL document with the session's credentials
//! checkout-cli query orders.graphql
//! echo 'query { me { email } }' | checkout-cli query -
//!
//! # Detach the customer from a checkout, then sign out
//! checkout-cli detach --checkout Q2hlY2tvdXQ6MQ==
//!
//! # Sign out locally
//! checkout-cli sign-out
//! ```
//!
//! # Environment Variables
//!
//! - `SALEOR_API_URL` - Saleor GraphQL endpoint (required)
//! - `CHECKOUT_CLI_STORAGE_PATH` - Session file (default: `.saleor-auth.json`)
//! - `SALEOR_PASSWORD` - Password for `sign-in` / `reset-password`
//!
//! See `saleor_checkout_auth::config` for the remaining client settings.
//! Only the refresh token and auth state are written to the session file;
//! commands refresh the access token from it before sending credentials.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use secrecy::SecretString;

mod commands;

#[derive(Parser)]
#[command(name = "checkout-cli")]
#[command(author, version, about = "Saleor checkout auth CLI")]
struct Cli {
    /// File holding the refresh token and auth state
    #[arg(
        long,
        global = true,
        env = "CHECKOUT_CLI_STORAGE_PATH",
        default_value = ".saleor-auth.json"
    )]
    storage: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    SignIn {
        /// Customer email address
        #[arg(short, long)]
        email: String,

        /// Customer password
        #[arg(long, env = "SALEOR_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Set a new password from a reset token and sign in
    ResetPassword {
        /// Customer email address
        #[arg(short, long)]
        email: String,

        /// Token from the password reset email
        #[arg(short, long)]
        token: String,

        /// New password
        #[arg(long, env = "SALEOR_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    SignOut,
    /// Show the session state and the signed-in customer
    Status,
    /// Detach the customer from a checkout and sign out
    Detach {
        /// Checkout ID
        #[arg(short, long)]
        checkout: String,
    },
    /// Run a GraphQL document with the session's credentials
    Query {
        /// File containing the document, or `-` for stdin
        document: String,

        /// Operation variables as a JSON object
        #[arg(long)]
        variables: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "saleor_checkout_auth=info,checkout_cli=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let client = commands::open_client(&cli.storage)?;

    match cli.command {
        Commands::SignIn { email, password } => {
            commands::session::sign_in(&client, email, SecretString::from(password)).await?;
        }
        Commands::ResetPassword {
            email,
            token,
            password,
        } => {
            commands::session::reset_password(&client, email, token, SecretString::from(password))
                .await?;
        }
        Commands::SignOut => commands::session::sign_out(&client),
        Commands::Status => commands::session::status(&client).await?,
        Commands::Detach { checkout } => commands::session::detach(&client, checkout).await?,
        Commands::Query {
            document,
            variables,
        } => commands::query::run(&client, &document, variables.as_deref()).await?,
    }

    client.cleanup();
    Ok(())
}
