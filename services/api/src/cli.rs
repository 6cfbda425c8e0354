use crate::infra::{build_resolver, build_services, http_client};
use crate::server;
use clap::{Args, Parser, Subcommand};
use realty_hub::config::AppConfig;
use realty_hub::error::AppError;
use realty_hub::listings::{ListingFilter, ListingTab};
use realty_hub::settings::{
    QueryParams, ResolveContext, SettingKey, SettingsServiceError, SettingsSnapshot,
};

#[derive(Parser, Debug)]
#[command(
    name = "Realty Hub",
    about = "Serve and administer a white-label real-estate site",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect or change site settings in the local store
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
    /// Print the aggregated listings for the configured site
    Listings(ListingArgs),
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Print every resolved setting, secrets masked
    Show(ScopeArgs),
    /// Write one setting; an empty value clears it
    Set(SetArgs),
    /// Absorb the settings carried by a deployment URL's query string
    Ingest(IngestArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug, Default)]
struct ScopeArgs {
    /// Tenant whose remote record should be consulted
    #[arg(long)]
    tenant: Option<String>,
}

#[derive(Args, Debug)]
struct SetArgs {
    /// Setting name, canonical (`mls_api_key`) or URL form (`mlsApiKey`)
    key: String,
    value: String,
    /// Also write the value to this tenant's remote record
    #[arg(long)]
    tenant: Option<String>,
}

#[derive(Args, Debug)]
struct IngestArgs {
    /// Full deployment URL, e.g. https://site.example/?tenantId=acme&appName=Acme
    url: String,
}

#[derive(Args, Debug, Default)]
struct ListingArgs {
    #[arg(long)]
    tenant: Option<String>,
    /// Agent selector; `all` lists every agent's properties
    #[arg(long)]
    agent: Option<String>,
    /// Free-text match against address, city and zip
    #[arg(long)]
    search: Option<String>,
    /// `all`, `sale` or `rent`
    #[arg(long, default_value = "all")]
    tab: String,
    #[arg(long)]
    min_price: Option<f64>,
    #[arg(long)]
    max_price: Option<f64>,
    #[arg(long)]
    min_bedrooms: Option<u32>,
    #[arg(long)]
    min_bathrooms: Option<f32>,
    #[arg(long)]
    property_type: Option<String>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Settings { command } => run_settings(command).await,
        Command::Listings(args) => run_listings(args).await,
    }
}

fn scope(tenant: Option<String>) -> ResolveContext {
    ResolveContext {
        tenant,
        ..ResolveContext::default()
    }
}

fn print_snapshot(snapshot: &SettingsSnapshot) {
    for (key, value) in snapshot.redacted().iter() {
        println!("{:<22} {}", key.name(), value);
    }
}

async fn run_settings(command: SettingsCommand) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let resolver = build_resolver(&config, &http_client()?)?;

    match command {
        SettingsCommand::Show(args) => {
            let snapshot = resolver.snapshot(&scope(args.tenant)).await;
            if !SettingKey::all().into_iter().any(|key| snapshot.is_set(key)) {
                println!("No settings resolved (local file {})", config.storage.settings_path.display());
            }
            print_snapshot(&snapshot);
        }
        SettingsCommand::Set(args) => {
            let key: SettingKey = args.key.parse()?;
            let outcome = resolver.set(key, &args.value, args.tenant.as_deref()).await;
            println!("{} -> {}", key.name(), outcome.label());
            if let Some(warning) = outcome.warning() {
                println!("warning: {warning}");
            }
        }
        SettingsCommand::Ingest(args) => {
            let params = QueryParams::from_url(&args.url).map_err(SettingsServiceError::from)?;
            let report = resolver.ingest(&params).await;
            if report.absorbed.is_empty() {
                println!("No recognised settings in URL");
            }
            for key in &report.absorbed {
                println!("absorbed {}", key.name());
            }
            println!("write: {}", report.outcome.label());
            if let Some(warning) = report.outcome.warning() {
                println!("warning: {warning}");
            }
        }
    }

    Ok(())
}

async fn run_listings(args: ListingArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let services = build_services(&config)?;

    let filter = ListingFilter {
        search: args.search,
        tab: args.tab.parse::<ListingTab>().unwrap_or_default(),
        min_price: args.min_price,
        max_price: args.max_price,
        min_bedrooms: args.min_bedrooms,
        min_bathrooms: args.min_bathrooms,
        property_type: args.property_type,
    };

    let page = services
        .listings
        .search(&scope(args.tenant), args.agent, &filter)
        .await;

    for notice in &page.notices {
        println!("[{}] {}", notice.provider, notice.message);
    }
    println!("{} of {} listings match", page.listings.len(), page.total);
    for listing in &page.listings {
        println!(
            "- {} | {} | ${:.0} | {} bd / {} ba | {} ({})",
            listing.id,
            listing.location_line(),
            listing.price,
            listing.bedrooms,
            listing.bathrooms,
            listing.property_type,
            listing.provenance.label()
        );
    }

    Ok(())
}
