use std::process::ExitCode;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use plazi_harvester::catalog::{Catalog, CatalogContext};
use plazi_harvester::client::PlaziHttpClient;
use plazi_harvester::config::ConfigLoader;
use plazi_harvester::domain::{HarvestJob, SourceRecord};
use plazi_harvester::error::HarvestError;
use plazi_harvester::output::JsonOutput;
use plazi_harvester::pipeline::Harvester;
use plazi_harvester::store::FileStore;

#[derive(Parser)]
#[command(name = "plazi-harvest")]
#[command(about = "Harvest Plazi treatments into a dataset catalog")]
#[command(version, author)]
struct Cli {
    /// Directory holding sources, records, work items and errors.
    #[arg(long, global = true, env = "PLAZI_HARVEST_STORE")]
    store: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(subcommand, about = "Manage harvest sources")]
    Source(SourceCommand),
    #[command(about = "Run gather, fetch and import for a source")]
    Harvest(HarvestArgs),
    #[command(about = "List harvested records")]
    Records,
    #[command(about = "List recorded gather and import errors")]
    Errors,
}

#[derive(Subcommand)]
enum SourceCommand {
    #[command(about = "Register a harvest source")]
    Add(AddSourceArgs),
    #[command(about = "List registered sources")]
    List,
}

#[derive(Args)]
struct AddSourceArgs {
    #[arg(long)]
    id: String,

    #[arg(long)]
    url: String,

    #[arg(long)]
    owner_org: Option<String>,

    /// Source config as JSON, e.g. '{"groups":["Plazi"]}'.
    #[arg(long)]
    config: Option<String>,
}

#[derive(Args)]
struct HarvestArgs {
    #[arg(long)]
    source: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<HarvestError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &HarvestError) -> u8 {
    match error {
        HarvestError::SourceNotFound(_) => 2,
        HarvestError::FeedHttp(_)
        | HarvestError::FeedStatus { .. }
        | HarvestError::ArchiveHttp(_)
        | HarvestError::ArchiveStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let root = match cli.store {
        Some(root) => root,
        None => FileStore::default_root()?,
    };
    let store = FileStore::new(root);

    match cli.command {
        Commands::Source(SourceCommand::Add(args)) => add_source(&store, args),
        Commands::Source(SourceCommand::List) => {
            JsonOutput::print_sources(&store.list_sources()?).into_diagnostic()
        }
        Commands::Harvest(args) => run_harvest(store, args),
        Commands::Records => JsonOutput::print_records(&store.list_records()?).into_diagnostic(),
        Commands::Errors => JsonOutput::print_errors(&store.list_errors()?).into_diagnostic(),
    }
}

fn add_source(store: &FileStore, args: AddSourceArgs) -> miette::Result<()> {
    // reject configs the stages would fail on
    ConfigLoader::resolve(args.config.as_deref())?;
    let source = SourceRecord {
        id: args.id,
        url: args.url,
        config: args.config,
        owner_org: args.owner_org,
    };
    store.register_source(&source)?;
    JsonOutput::print_sources(&[source]).into_diagnostic()
}

fn run_harvest(store: FileStore, args: HarvestArgs) -> miette::Result<()> {
    let ctx = CatalogContext {
        user: ConfigLoader::resolve(None)?.user,
    };
    let source = store.show_source(&ctx, &args.source)?;
    let job = HarvestJob::new(source.harvest_source());

    let store = Arc::new(store);
    let client = PlaziHttpClient::new()?;
    let harvester = Harvester::new(client, Arc::clone(&store), store);
    let report = harvester.run_job(&job);
    JsonOutput::print_report(&report).into_diagnostic()
}
