use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use storefront_api::{
    config,
    db::{self, DbPool},
    entities::commerce::{product, ProductCategory},
    money,
    services::users::{UserService, UserView},
};

#[derive(Parser, Debug)]
#[command(name = "storefront-cli", about = "Operator commands for the storefront API")]
struct Cli {
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Grant admin rights to an existing account
    MakeAdmin {
        /// Email address of the account
        email: String,
    },
    /// List every account
    ListUsers,
    /// Insert demo products; SKUs that already exist are skipped
    Seed,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config().context("failed to load configuration")?;
    config::init_tracing(&cfg.log_level, cfg.log_json);

    let db = Arc::new(
        db::establish_connection_from_app_config(&cfg)
            .await
            .context("failed to connect to the database")?,
    );

    match cli.command {
        Commands::Migrate => {
            db::run_migrations(&db).await.context("migrations failed")?;
            println!("Migrations applied");
        }
        Commands::MakeAdmin { email } => {
            let account = UserService::new(db.clone())
                .make_admin(&email)
                .await
                .with_context(|| format!("failed to grant admin to {}", email))?;
            if cli.json {
                print_json(&UserView::from(account))?;
            } else {
                println!("{} ({}) is now an admin", account.email, account.id);
            }
        }
        Commands::ListUsers => {
            let users = UserService::new(db.clone())
                .list_users()
                .await
                .context("failed to list users")?;
            if cli.json {
                print_json(&users)?;
            } else {
                for user in users {
                    println!(
                        "{}  {:<30} {:<24} balance={:.2}{}{}",
                        user.id,
                        user.email,
                        user.name,
                        user.wallet_balance,
                        if user.is_admin { " admin" } else { "" },
                        if user.is_active { "" } else { " inactive" },
                    );
                }
            }
        }
        Commands::Seed => {
            let created = seed_products(&db).await?;
            println!("Seeded {} product(s)", created);
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn seed_products(db: &DbPool) -> Result<usize> {
    let products_data: [(&str, &str, ProductCategory, Decimal, i32, &str); 6] = [
        ("handbag_1", "Classic Leather Tote", ProductCategory::Handbag, dec!(129.00), 12, "Full-grain leather tote with an inner zip pocket."),
        ("handbag_2", "Quilted Crossbody", ProductCategory::Handbag, dec!(89.50), 20, "Compact crossbody with an adjustable chain strap."),
        ("handbag_3", "Canvas Weekender", ProductCategory::Handbag, dec!(64.99), 8, "Roomy canvas bag for short trips."),
        ("watch_4", "Heritage Automatic", ProductCategory::Watch, dec!(349.00), 5, "Self-winding movement in a 40mm steel case."),
        ("watch_5", "Minimalist Quartz", ProductCategory::Watch, dec!(79.00), 25, "Slim quartz watch with a mesh band."),
        ("watch_6", "Dive Chronograph", ProductCategory::Watch, dec!(219.99), 0, "200m water resistance and a unidirectional bezel."),
    ];

    let mut created = 0;
    let now = Utc::now();

    for (sku, name, category, price, stock_level, description) in products_data {
        let exists = product::Entity::find()
            .filter(product::Column::Sku.eq(sku))
            .one(db)
            .await?
            .is_some();
        if exists {
            info!(sku, "Skipping existing product");
            continue;
        }

        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            sku: Set(sku.to_string()),
            description: Set(Some(description.to_string())),
            price_cents: Set(money::to_cents(price)?),
            stock_level: Set(stock_level),
            category: Set(category),
            image_url: Set(None),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        }
        .insert(db)
        .await
        .with_context(|| format!("failed to insert {}", sku))?;
        created += 1;
    }

    Ok(created)
}
