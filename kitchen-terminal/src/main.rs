use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use kitchen_terminal::cli::ItemSpec;
use kitchen_terminal::db::repository::{SeedItem, UpsertCatalog};
use kitchen_terminal::receipt::kitchen_qr_payload;
use kitchen_terminal::{
    Config, DeviceId, ResilientStore, SqliteConnector, TerminalSession, TextReceiptRenderer,
    init_logger_with_file,
};
use shared::models::{CatalogItem, LineKind};
use shared::util::{format_money, from_storage};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "kitchen-terminal")]
#[command(about = "Kitchen order entry terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List orderable products and extras
    Catalog,

    /// Build a cart and place it as one order
    Order {
        /// SKU[+EXTRA[*QTY]...][@QTY], repeatable
        #[arg(short, long = "item", required = true)]
        items: Vec<ItemSpec>,
    },

    /// Show a placed order
    Show { order_id: i64 },

    /// Insert or update catalog items from a JSON file
    Seed { file: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = Config::from_env().context("Invalid configuration")?;
    init_logger_with_file(&config.log_level, config.log_dir.as_deref());

    let device = DeviceId::load(&config.device_config_path)
        .with_context(|| format!("Cannot read device identity from {}", config.device_config_path))?;

    let connector = SqliteConnector::from_url(&config.database_url)
        .with_context(|| format!("Invalid DATABASE_URL {}", config.database_url))?
        .with_migrations(config.run_migrations);
    let store = ResilientStore::connect(connector, config.retry)
        .await
        .context("Cannot connect to kitchen store")?;

    tracing::info!(device = %device, environment = %config.environment, "Kitchen terminal starting");

    let renderer = Arc::new(TextReceiptRenderer::new(std::io::stdout(), config.receipt_width));
    let mut session =
        TerminalSession::new(device, store, config.order_defaults.clone()).with_renderer(renderer);

    let result = run(&mut session, cli.command).await;
    session.shutdown().await;
    result
}

async fn run(session: &mut TerminalSession, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Catalog => {
            let catalog = session.load_catalog().await?;
            println!("Products:");
            for item in catalog.products() {
                println!("  {:<10} {:<30} {:>8}", item.sku, item.display_name, format_money(item.unit_price));
            }
            println!("Extras:");
            for item in catalog.extras() {
                println!("  {:<10} {:<30} {:>8}", item.sku, item.display_name, format_money(item.unit_price));
            }
        }
        Command::Order { items } => {
            session.load_catalog().await?;
            for spec in &items {
                let parent = session
                    .add_parent(&spec.sku, spec.quantity)
                    .with_context(|| format!("Cannot add {}", spec.sku))?;
                session
                    .add_extras(parent, &spec.extras)
                    .with_context(|| format!("Cannot add extras to {}", spec.sku))?;
            }

            let outcome = session.checkout().await.context("Checkout failed")?;
            if let Some(receipt) = outcome.receipt {
                receipt.await.context("Receipt task panicked")?;
            }
            println!("Order {} placed ({}), total {}", outcome.order_id, outcome.uid, format_money(outcome.total));
            println!("Kitchen QR: {:?}", kitchen_qr_payload(&outcome.snapshot));
        }
        Command::Show { order_id } => {
            let Some(order) = session.fetch_order(order_id).await? else {
                bail!("Order {order_id} not found");
            };
            let total = from_storage(order.header.order_total).unwrap_or_default();
            println!(
                "Order {} [{}] {} placed {}",
                order.header.order_id,
                order.header.status.as_str(),
                order.header.uid,
                order.header.placed_time.as_deref().unwrap_or("-")
            );
            for line in order.lines.iter().filter(|l| l.kind == LineKind::Parent) {
                println!("  {} x {}", line.qty, line.sku);
                for extra in order.extras_of(line.order_line_id) {
                    println!("     + {} x {}", extra.qty, extra.sku);
                }
            }
            println!("  {} lines, total {}", order.header.line_count, format_money(total));
        }
        Command::Seed { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Cannot read {}", file.display()))?;
            let seeds: Vec<SeedItem> = serde_json::from_str(&raw)
                .with_context(|| format!("Invalid seed file {}", file.display()))?;
            let items: Vec<CatalogItem> = seeds.into_iter().map(CatalogItem::from).collect();
            let count = session.store_mut().run(&mut UpsertCatalog::new(items)).await?;
            println!("{count} catalog items written");
        }
    }
    Ok(())
}
