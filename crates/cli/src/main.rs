//! Boutique CLI - Database setup and a command-line shopper.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! boutique migrate
//!
//! # Load the demo catalog
//! boutique seed --file crates/cli/seed/products.yaml
//!
//! # Let an account manage the catalog
//! boutique admin grant -e owner@example.com
//!
//! # Shop as a guest, then sign in (the guest cart is merged into the account)
//! boutique cart add mug-01 --name "Ceramic Mug" --price 12.50 --quantity 2
//! boutique login -e shopper@example.com
//! boutique cart show
//! boutique checkout
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed` - Upsert catalog products from YAML
//! - `admin grant|revoke` - Change an account's role
//! - `register`, `login`, `logout`, `whoami` - Password accounts
//! - `google start|complete|cancel` - Google sign-in from a terminal
//! - `cart ...`, `checkout`, `orders` - Drive a cart session

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use boutique_core::Price;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "boutique")]
#[command(author, version, about = "Boutique CLI tools")]
struct Cli {
    #[command(flatten)]
    client: ClientArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Where the shopper commands find the API and keep their state.
#[derive(Args)]
struct ClientArgs {
    /// Storefront API base URL
    #[arg(
        long,
        env = "BOUTIQUE_API_URL",
        default_value = "http://localhost:3001/api",
        global = true
    )]
    api_url: String,

    /// Local cart state document
    #[arg(
        long,
        env = "BOUTIQUE_STATE_FILE",
        default_value = ".boutique/state.json",
        global = true
    )]
    state_file: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long, env = "BOUTIQUE_TIMEOUT_SECS", default_value_t = 10, global = true)]
    timeout_secs: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Upsert catalog products from a YAML file
    Seed {
        /// Path to the products file
        #[arg(short, long, default_value = "crates/cli/seed/products.yaml")]
        file: PathBuf,
    },
    /// Manage account roles
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Create an account and sign in to it
    Register {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "BOUTIQUE_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
    },
    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long, env = "BOUTIQUE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out, keeping nothing locally
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Sign in with Google
    Google {
        #[command(subcommand)]
        action: GoogleAction,
    },
    /// Inspect or change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order for everything in the account cart
    Checkout,
    /// List past orders
    Orders,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Allow an account to manage the catalog
    Grant {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
    /// Make an account a regular shopper again
    Revoke {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum GoogleAction {
    /// Stage the guest cart and print the consent URL
    Start {
        /// Path the server redirects to after sign-in
        #[arg(long, default_value = "/")]
        redirect: String,
    },
    /// Finish sign-in with the token from the redirect URL
    Complete {
        #[arg(long, env = "BOUTIQUE_TOKEN", hide_env_values = true)]
        token: String,
    },
    /// Abandon sign-in and return staged lines to the guest cart
    Cancel,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the current cart
    Show,
    /// Add a product (sums with an existing line)
    Add {
        product_id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: Price,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
        #[arg(long)]
        image: Option<String>,
    },
    /// Set a line's quantity (0 removes it)
    Set { product_id: String, quantity: u32 },
    /// Remove a line
    Remove { product_id: String },
    /// Remove every line
    Clear,
    /// Re-run the account cart merge
    Sync,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("boutique_cli=info,boutique_client=warn")),
        )
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
    use commands::shop::Shop;

    let client = cli.client;
    let shop = || Shop::open(&client.api_url, &client.state_file, client.timeout_secs);

    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Seed { file } => commands::seed::products(&file).await?,
        Commands::Admin { action } => match action {
            AdminAction::Grant { email } => commands::admin::grant(&email).await?,
            AdminAction::Revoke { email } => commands::admin::revoke(&email).await?,
        },
        Commands::Register {
            email,
            password,
            first_name,
            last_name,
        } => {
            shop()
                .await?
                .register(email, password, first_name, last_name)
                .await?;
        }
        Commands::Login { email, password } => shop().await?.login(&email, &password).await?,
        Commands::Logout => shop().await?.logout().await?,
        Commands::Whoami => shop().await?.whoami().await?,
        Commands::Google { action } => match action {
            GoogleAction::Start { redirect } => shop().await?.google_start(&redirect).await?,
            GoogleAction::Complete { token } => shop().await?.google_complete(token).await?,
            GoogleAction::Cancel => shop().await?.google_cancel().await?,
        },
        Commands::Cart { action } => {
            let shop = shop().await?;
            match action {
                CartAction::Show => shop.show().await?,
                CartAction::Add {
                    product_id,
                    name,
                    price,
                    quantity,
                    image,
                } => {
                    shop.add(&product_id, &name, price, quantity, image)
                        .await?;
                }
                CartAction::Set {
                    product_id,
                    quantity,
                } => shop.set_quantity(&product_id, quantity).await?,
                CartAction::Remove { product_id } => shop.remove(&product_id).await?,
                CartAction::Clear => shop.clear().await?,
                CartAction::Sync => shop.sync().await?,
            }
        }
        Commands::Checkout => shop().await?.checkout().await?,
        Commands::Orders => shop().await?.orders().await?,
    }
    Ok(())
}
