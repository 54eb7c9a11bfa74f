//! ANNA PARIS CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! ap-cli migrate
//!
//! # Seed an empty database with accounts, categories and sample products
//! ap-cli seed --admin-password '...' --customer-password '...'
//!
//! # Create or promote an admin account
//! ap-cli admin promote -e ops@annaparis.com -p '...' -n "Ops"
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Seed sample data (skipped when products exist)
//! - `admin promote` - Upsert a user with the admin role

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ap-cli")]
#[command(author, version, about = "ANNA PARIS CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed an empty database with sample data
    Seed {
        /// Admin account email
        #[arg(long, default_value = "admin@annaparis.com")]
        admin_email: String,

        /// Admin account password
        #[arg(long, env = "SEED_ADMIN_PASSWORD")]
        admin_password: String,

        /// Demo customer email
        #[arg(long, default_value = "customer@example.com")]
        customer_email: String,

        /// Demo customer password
        #[arg(long, env = "SEED_CUSTOMER_PASSWORD")]
        customer_password: String,
    },
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a user with the admin role, or promote an existing one
    Promote {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// New password for the account
        #[arg(short, long)]
        password: String,

        /// Display name
        #[arg(short, long, default_value = "Admin User")]
        name: String,
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
        Commands::Seed {
            admin_email,
            admin_password,
            customer_email,
            customer_password,
        } => {
            commands::seed::run(&commands::seed::SeedAccounts {
                admin_email: &admin_email,
                admin_password: &admin_password,
                customer_email: &customer_email,
                customer_password: &customer_password,
            })
            .await?;
        }
        Commands::Admin { action } => match action {
            AdminAction::Promote {
                email,
                password,
                name,
            } => {
                commands::admin::promote(&email, &password, &name).await?;
            }
        },
    }
    Ok(())
}
