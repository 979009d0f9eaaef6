use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info};

use listing_map::config::Config;
use listing_map::infra::build_widget_context;
use listing_map::infra::email_client::{BuyInquiryData, EmailClient, SellInquiryData};
use listing_map::infra::memory_map::InMemoryMapProvider;
use listing_map::{logging, metrics, ListingLocation, MapWidget, WidgetView};

#[derive(Parser)]
#[command(name = "listing_map")]
#[command(about = "Resolve listing locations and send listing inquiries")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a listing location and show where its map would point
    Resolve(ResolveArgs),
    /// Send a seller inquiry to the backend
    SellInquiry(SellArgs),
    /// Send a buyer inquiry to the backend
    BuyInquiry(BuyArgs),
}

#[derive(Args)]
struct ResolveArgs {
    #[arg(long, allow_negative_numbers = true)]
    lat: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    lng: Option<f64>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    state: Option<String>,
    #[arg(long)]
    zip: Option<String>,
    /// Container id the map is attached to
    #[arg(long, default_value = "listing-map")]
    container: String,
}

#[derive(Args)]
struct SellArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    address: String,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    state: Option<String>,
    #[arg(long)]
    zip: Option<String>,
    #[arg(long)]
    property_type: Option<String>,
    #[arg(long)]
    timeline: Option<String>,
    #[arg(long)]
    message: Option<String>,
}

#[derive(Args)]
struct BuyArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    property_id: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    preferred_contact: Option<String>,
    #[arg(long)]
    message: Option<String>,
}

async fn run_resolve(config: &Config, args: ResolveArgs) -> anyhow::Result<()> {
    let provider = Arc::new(InMemoryMapProvider::new());
    let context = build_widget_context(config, provider.clone()).context("Failed to set up map widget")?;

    let props = ListingLocation {
        latitude: args.lat,
        longitude: args.lng,
        address: args.address,
        city: args.city,
        state: args.state,
        zip: args.zip,
    };

    let widget = MapWidget::mount(&context, &args.container, &props).await;
    match widget.view() {
        WidgetView::Map(resolved) => {
            println!("📍 {} ({})", resolved.coordinate, resolved.precision.as_str());
            if let Some(label) = &resolved.label {
                println!("   Label: {}", label);
            }
        }
        WidgetView::NoLocationData => println!("No location data for this listing"),
        WidgetView::LocationUnavailable(failure) => println!("Location unavailable: {}", failure),
        other => println!("Widget state: {:?}", other),
    }

    if let Some(view) = widget.surface_state().map.and_then(|map| provider.map(map)) {
        println!("   Map '{}' centered at {} zoom {}", view.container, view.center, view.zoom);
    }

    widget.unmount();
    Ok(())
}

async fn run_sell(config: &Config, args: SellArgs) -> anyhow::Result<()> {
    let client = EmailClient::new(reqwest::Client::new(), &config.api.base_url);
    let data = SellInquiryData {
        name: args.name,
        email: args.email,
        phone: args.phone,
        property_address: args.address,
        city: args.city,
        state: args.state,
        zip: args.zip,
        property_type: args.property_type,
        timeline: args.timeline,
        message: args.message,
    };
    let response = client.send_sell_inquiry(&data).await?;
    println!("✅ {}", response.message);
    Ok(())
}

async fn run_buy(config: &Config, args: BuyArgs) -> anyhow::Result<()> {
    let client = EmailClient::new(reqwest::Client::new(), &config.api.base_url);
    let data = BuyInquiryData {
        name: args.name,
        email: args.email,
        phone: args.phone,
        property_id: args.property_id,
        property_address: args.address,
        preferred_contact: args.preferred_contact,
        message: args.message,
    };
    let response = client.send_buy_inquiry(&data).await?;
    println!("✅ {}", response.message);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let _log_guard = logging::init_logging();
    metrics::init_metrics();

    let cli = Cli::parse();
    let config = Config::load().context("Failed to load configuration")?;
    info!("Configuration loaded");

    let result = match cli.command {
        Commands::Resolve(args) => run_resolve(&config, args).await,
        Commands::SellInquiry(args) => run_sell(&config, args).await,
        Commands::BuyInquiry(args) => run_buy(&config, args).await,
    };

    if let Err(e) = &result {
        error!("Command failed: {:#}", e);
    }
    result
}
