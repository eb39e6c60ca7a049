use anyhow::Context;
use clap::Parser;
use log::{error, info, LevelFilter};
use logerr::alerts::sink_from_config;
use logerr::collectors::HttpLogFetcher;
use logerr::config::Config;
use logerr::directory::{Cluster, StaticDirectory};
use logerr::error::ConfigError;
use logerr::records::ErrorRecord;
use logerr::report::ReportEngine;
use logerr::store::ErrorStore;
use std::io::Write;
use std::path::PathBuf;

/// Command-line arguments for the log error collector
#[derive(Parser, Debug)]
#[command(
    name = "logerr",
    about = "Collect new error logs from a storage cluster and alert on them",
    long_about = "Polls every server of a cluster for its most recent error and warning \
                  log entries, records the ones not seen before and sends an alert for each. \
                  Intended to be run periodically by an external scheduler."
)]
struct Cli {
    /// Create the error store schema and exit
    #[arg(short, long, conflicts_with = "query")]
    init: bool,

    /// Print every stored error and exit
    #[arg(short, long)]
    query: bool,

    /// Print stored errors as JSON (with --query)
    #[arg(long, requires = "query")]
    json: bool,

    /// Cluster whose servers are polled
    #[arg(short = 'c', long, value_enum)]
    cluster: Cluster,

    /// Path to configuration file
    #[arg(long, value_name = "FILE", help = "Configuration file path (TOML format)")]
    config: Option<PathBuf>,

    /// Override the configured error store path
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable debug logging output")]
    verbose: bool,
}

impl Cli {
    /// Build the effective configuration from the config file and flags
    ///
    /// Without `--config` the built-in defaults are used. A config file that
    /// was named explicitly but cannot be read is an error.
    fn load_config(&self) -> Result<Config, ConfigError> {
        let mut config = match self.config {
            Some(ref path) => {
                if path.is_dir() {
                    return Err(ConfigError::ReadError(format!(
                        "Configuration path is not a file: {}",
                        path.display()
                    )));
                }
                Config::from_file(path)?
            }
            None => Config::default(),
        };

        if let Some(ref db) = self.db {
            config.storage_path = db.clone();
        }

        config.validate()?;
        Ok(config)
    }

    fn log_level(&self, config: &Config) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else {
            config.log_level_filter().unwrap_or(LevelFilter::Info)
        }
    }
}

fn init_logging(level: LevelFilter) {
    // RUST_LOG still wins over the configured level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.to_string()))
        .init();
}

/// Write stored records as text lines or a JSON array
fn print_records<W: Write>(out: &mut W, records: &[ErrorRecord], json: bool) -> anyhow::Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, records)?;
        writeln!(out)?;
    } else {
        for record in records {
            writeln!(out, "{}", record)?;
        }
    }
    Ok(())
}

async fn run(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let store = ErrorStore::open(&config.storage_path).with_context(|| {
        format!(
            "Failed to open error store {}",
            config.storage_path.display()
        )
    })?;

    if cli.init {
        store
            .initialize()
            .context("Failed to initialize error store")?;
        info!(
            "Initialized error store at {}",
            config.storage_path.display()
        );
        return Ok(());
    }

    if cli.query {
        let records = store.all().context("Failed to query error store")?;
        let stdout = std::io::stdout();
        print_records(&mut stdout.lock(), &records, cli.json)?;
        return Ok(());
    }

    let sink = sink_from_config(&config.alerts);
    let fetcher = HttpLogFetcher::new(&config.endpoint_path, config.request_timeout())
        .context("Failed to create HTTP client")?;
    let directory = StaticDirectory::new(config.clusters.clone());
    let engine = ReportEngine::new(&store, &fetcher, sink.as_ref());

    engine
        .run_cluster(&directory, cli.cluster.as_str())
        .await
        .with_context(|| format!("Collection pass for cluster {} failed", cli.cluster))?;

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            init_logging(cli.log_level(&Config::default()));
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    init_logging(cli.log_level(&config));

    if let Err(e) = run(&cli, &config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
