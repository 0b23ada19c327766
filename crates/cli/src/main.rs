//! Shopfront CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations (documents and sessions)
//! shopfront-cli migrate
//!
//! # Seed users, carts and addresses from YAML
//! shopfront-cli seed users -f seed/users.yaml
//!
//! # Show a user's remote cart
//! shopfront-cli cart show --uid user-123
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed users` - Seed profiles, carts and addresses
//! - `cart show` - Print a user's remote cart

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "shopfront-cli")]
#[command(author, version, about = "Shopfront CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Inspect remote carts
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Seed user profiles, carts and addresses from a YAML file
    Users {
        /// Path to the YAML file
        #[arg(short, long)]
        file: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the lines of a user's remote cart
    Show {
        /// User id as issued by the identity provider
        #[arg(short, long)]
        uid: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Users { file } => commands::seed::users(&file).await?,
        },
        Commands::Cart { action } => match action {
            CartAction::Show { uid } => commands::cart::show(&uid).await?,
        },
    }
    Ok(())
}
