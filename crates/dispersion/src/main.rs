//! `red` - reference dispersion from the command line

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use refdisp_common::observability::init_tracing;
use refdisp_common::resolver::create_resolver;
use refdisp_common::{AppConfig, LinkCounting, NullLog, StaticResolver, TracingLog, WorkResolver, VERSION};
use refdisp_dispersion::input::{read_doi_lines, read_dois, DEFAULT_COLUMN};
use refdisp_dispersion::output::{write_results, OutputFormat};
use refdisp_dispersion::build_runner;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Reference dispersion (RED) of scholarly works.
#[derive(Parser)]
#[command(name = "red", version, about = "Reference dispersion (RED) of scholarly works")]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CommonArgs {
    /// Config file (defaults to config/ layering and RED__ env vars)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Count each co-citation pair once and clamp density to 1
    #[arg(long, global = true)]
    dedup_links: bool,

    /// Log every reference that fails to resolve
    #[arg(long, global = true)]
    report_failures: bool,

    /// Resolve from a JSON fixture instead of OpenAlex
    #[arg(long, global = true)]
    offline: Option<PathBuf>,

    /// Suppress progress messages
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute RED for the given DOIs
    Compute {
        /// One or more DOIs
        #[arg(required = true)]
        dois: Vec<String>,
        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: Format,
    },
    /// Compute RED for every DOI in a file
    Batch {
        /// CSV file with a header row, or a plain list with --lines
        #[arg(short, long)]
        input: PathBuf,
        /// Name of the DOI column
        #[arg(short, long, default_value = DEFAULT_COLUMN)]
        column: String,
        /// Input has one DOI per line and no header
        #[arg(long)]
        lines: bool,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: Format,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Csv,
    Json,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Csv => OutputFormat::Csv,
            Format::Json => OutputFormat::Json,
        }
    }
}

fn load_config(args: &CommonArgs) -> anyhow::Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path).with_context(|| format!("loading config {}", path))?,
        None => AppConfig::load().context("loading configuration")?,
    };
    if args.dedup_links {
        config.metric.link_counting = LinkCounting::Deduplicated;
    }
    if args.report_failures {
        config.metric.report_reference_failures = true;
    }
    Ok(config)
}

fn build_resolver(args: &CommonArgs, config: &AppConfig) -> anyhow::Result<Arc<dyn WorkResolver>> {
    match &args.offline {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading fixture {}", path.display()))?;
            info!(fixture = %path.display(), "Using offline fixture resolver");
            Ok(Arc::new(StaticResolver::from_json(&json)?))
        }
        None => Ok(Arc::new(create_resolver(&config.openalex)?)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(&cli.common)?;

    init_tracing(&config.observability);
    info!("Starting RefDisp calculator v{}", VERSION);

    let resolver = build_resolver(&cli.common, &config)?;
    let (_, runner) = build_runner(&config, resolver)?;

    let tracing_log = TracingLog;
    let null_log = NullLog;
    let log: &dyn refdisp_common::LogSink = if cli.common.quiet { &null_log } else { &tracing_log };

    match cli.command {
        Commands::Compute { dois, format } => {
            let report = runner.run(&dois, log).await;
            let stdout = io::stdout();
            write_results(stdout.lock(), &report.results, format.into())?;
        }
        Commands::Batch {
            input,
            column,
            lines,
            output,
            format,
        } => {
            let file = File::open(&input).with_context(|| format!("opening {}", input.display()))?;
            let dois = if lines {
                read_doi_lines(BufReader::new(file))?
            } else {
                read_dois(file, &column)?
            };

            if dois.is_empty() {
                anyhow::bail!("no DOIs found in {}", input.display());
            }
            info!(count = dois.len(), "DOIs loaded");

            let report = runner.run(&dois, log).await;

            let writer: Box<dyn Write> = match &output {
                Some(path) => Box::new(BufWriter::new(
                    File::create(path).with_context(|| format!("creating {}", path.display()))?,
                )),
                None => Box::new(io::stdout().lock()),
            };
            write_results(writer, &report.results, format.into())?;

            info!(
                run_id = %report.run_id,
                computed = report.computed(),
                unavailable = report.unavailable(),
                "Batch complete"
            );
        }
    }

    Ok(())
}
