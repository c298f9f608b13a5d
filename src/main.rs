use transport_data::observability::{EventLog, FanoutObserver, Observer, TracingObserver};
use transport_data::storage::Backend;
use transport_data::{
    encode_table_csv, Backends, Category, DatasetService, GenerationPolicy, RetrievalRequest,
    StoreConfig,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "transport-data")]
#[command(about = "Retrieve, generate and persist transport datasets")]
#[command(version)]
struct Args {
    /// Local data directory (overrides TRANSPORT_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Object store bucket (overrides TRANSPORT_BUCKET)
    #[arg(short, long, global = true)]
    bucket: Option<String>,

    /// Credentials profile name (overrides TRANSPORT_PROFILE)
    #[arg(short = 'u', long, global = true)]
    profile: Option<String>,

    /// Append structured events to this file as JSON lines
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Enable verbosity
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a dataset as CSV (or its JSON projection)
    Get {
        /// Transportation types: flights, bus, train
        #[arg(required = true)]
        types: Vec<String>,

        /// Read from the object store
        #[arg(long)]
        remote: bool,

        /// With --remote, fall back to the local data directory
        #[arg(long, requires = "remote")]
        local_fallback: bool,

        /// Print the stored JSON projection instead of the CSV
        #[arg(long)]
        json: bool,
    },
    /// Generate synthetic rows and persist them
    Generate {
        /// Transportation types: flights, bus, train
        #[arg(required = true)]
        types: Vec<String>,

        /// How many rows of data to generate
        #[arg(short = 'g', long)]
        rows: usize,

        /// Write to the local data directory (default when no other target is given)
        #[arg(long)]
        local: bool,

        /// Write to the object store
        #[arg(long)]
        object: bool,

        /// Write to the key-value store
        #[arg(long)]
        kv: bool,

        /// Also write the JSON projection
        #[arg(long)]
        json: bool,

        /// Overwrite existing files
        #[arg(short, long)]
        overwrite: bool,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Retrieve a dataset, generating it first if it does not exist
    Ensure {
        /// Transportation types: flights, bus, train
        #[arg(required = true)]
        types: Vec<String>,

        /// Read from (and generate into) the object store
        #[arg(long)]
        remote: bool,

        /// With --remote, fall back to the local data directory
        #[arg(long, requires = "remote")]
        local_fallback: bool,

        /// Rows to generate when missing (defaults to TRANSPORT_DEFAULT_ROWS)
        #[arg(short = 'g', long)]
        rows: Option<usize>,
    },
    /// Print the number of entries in the stored JSON projection
    JsonLength {
        /// Transportation types: flights, bus, train
        #[arg(required = true)]
        types: Vec<String>,

        /// Read from the object store
        #[arg(long)]
        remote: bool,

        /// With --remote, fall back to the local data directory
        #[arg(long, requires = "remote")]
        local_fallback: bool,
    },
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match run(args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<bool> {
    let mut config = StoreConfig::from_env().context("Failed to load configuration")?;
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if let Some(bucket) = args.bucket {
        config.bucket = bucket;
    }
    if let Some(profile) = args.profile {
        config.profile = profile;
    }

    let observer: Arc<dyn Observer> = match args.log_file {
        Some(path) => Arc::new(
            FanoutObserver::default()
                .with(Arc::new(TracingObserver))
                .with(Arc::new(EventLog::new(Some(path), 1000))),
        ),
        None => Arc::new(TracingObserver),
    };

    match args.command {
        Commands::Get { types, remote, local_fallback, json } => {
            let categories = parse_types(&types)?;
            let service = build_service(&config, observer)?;
            let request = request(remote, local_fallback);
            Ok(for_each_type(&categories, |category| {
                if json {
                    let artifact = format!("{}.json", category);
                    let projection = service.engine().retrieve_json(category, request)?.into_result(&artifact)?;
                    println!("{}", projection.to_json_string()?);
                } else {
                    let artifact = format!("{}.csv", category);
                    let table = service.engine().retrieve(category, request)?.into_result(&artifact)?;
                    print!("{}", encode_table_csv(&table)?);
                }
                Ok(())
            }))
        }
        Commands::Generate { types, rows, local, object, kv, json, overwrite, seed } => {
            let categories = parse_types(&types)?;
            let mut targets = Vec::new();
            if local || (!object && !kv) {
                targets.push(Backend::Local);
            }
            if object {
                targets.push(Backend::Object);
            }
            if kv {
                targets.push(Backend::KeyValue);
            }
            let policy = GenerationPolicy::new(rows, targets)
                .with_json(json)
                .with_overwrite(overwrite)
                .with_seed(seed);

            let service = build_service(&config, observer)?;
            Ok(for_each_type(&categories, |category| {
                service
                    .generate_and_persist(category, &policy)?
                    .into_result()
                    .with_context(|| format!("Failed to generate the {}.csv file", category))?;
                info!("Successfully generated the {}.csv file", category);
                Ok(())
            }))
        }
        Commands::Ensure { types, remote, local_fallback, rows } => {
            let categories = parse_types(&types)?;
            let service = build_service(&config, observer)?;
            let target = if remote { Backend::Object } else { Backend::Local };
            let policy = GenerationPolicy::new(rows.unwrap_or(config.default_row_count), [target]);
            let request = request(remote, local_fallback);
            Ok(for_each_type(&categories, |category| {
                let table = service
                    .ensure(category, request, &policy)?
                    .into_result(&format!("{}.csv", category))?;
                info!("{}.csv ready with {} rows", category, table.len());
                Ok(())
            }))
        }
        Commands::JsonLength { types, remote, local_fallback } => {
            let categories = parse_types(&types)?;
            let service = build_service(&config, observer)?;
            let request = request(remote, local_fallback);
            Ok(for_each_type(&categories, |category| {
                println!("{}", service.json_length(category, request)?);
                Ok(())
            }))
        }
    }
}

/// Runs `action` for every type, continuing past failures. False if any failed.
fn for_each_type<F>(categories: &[Category], mut action: F) -> bool
where
    F: FnMut(Category) -> Result<()>,
{
    let mut ok = true;
    for &category in categories {
        if let Err(e) = action(category) {
            error!("Error in {}: {:#}", category, e);
            ok = false;
        }
    }
    ok
}

/// Every type is validated before any backend is touched.
fn parse_types(types: &[String]) -> Result<Vec<Category>> {
    types
        .iter()
        .map(|t| t.parse::<Category>().with_context(|| format!("Error in {}", t)))
        .collect()
}

fn request(remote: bool, local_fallback: bool) -> RetrievalRequest {
    match (remote, local_fallback) {
        (true, true) => RetrievalRequest::remote().with_local_fallback(),
        (true, false) => RetrievalRequest::remote(),
        (false, _) => RetrievalRequest::local(),
    }
}

fn build_service(config: &StoreConfig, observer: Arc<dyn Observer>) -> Result<DatasetService> {
    let backends = Backends::from_config(config).context("Failed to set up storage backends")?;
    Ok(DatasetService::new(backends, config.clone(), observer))
}
