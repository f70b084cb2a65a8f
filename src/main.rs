use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use counterparty_max::aggregation::FormatType;
use counterparty_max::config::{Config, ConfigLoader};
use counterparty_max::context::{ExecutionContext, InvalidRecordPolicy};
use counterparty_max::error::Error;
use counterparty_max::pipeline;
use counterparty_max::source::CsvRecordSource;
use std::path::PathBuf;
use tracing::{debug, error, info, trace};

/// Find the counterparties each user sent the most money to
#[derive(Parser)]
#[command(name = "counterparty-max", version)]
#[command(about = "Per-user top counterparty by total transferred amount", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file (default: ./counterparty-max.toml when present)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate transactions and print the top counterparties (default command)
    Run(RunArgs),
    /// Print the schema resolved for the input
    Schema(InputArgs),
}

#[derive(Args, Debug, Default)]
struct InputArgs {
    /// Transaction file to read (default: data/Transaction.csv)
    input: Option<PathBuf>,

    /// Treat the first line as data; columns are named _c0, _c1, ...
    #[arg(long)]
    no_header: bool,

    /// Field delimiter
    #[arg(long)]
    delimiter: Option<char>,
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Output format (table, json, json-pretty, csv, markdown)
    #[arg(short = 'f', long)]
    format: Option<FormatType>,

    /// Maximum rows shown by the table format
    #[arg(short = 'n', long)]
    max_rows: Option<usize>,

    /// Show full cell contents in the table format
    #[arg(long)]
    no_truncate: bool,

    /// Number of partitions for the pair summation
    #[arg(short = 'p', long)]
    partitions: Option<usize>,

    /// Worker threads (default: one per core)
    #[arg(long)]
    threads: Option<usize>,

    /// What to do with records that cannot be read (abort, skip)
    #[arg(long)]
    on_invalid: Option<InvalidRecordPolicy>,
}

impl InputArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(input) = &self.input {
            config.input.path = input.clone();
        }
        if self.no_header {
            config.input.has_header = false;
        }
        if let Some(delimiter) = self.delimiter {
            config.input.delimiter = delimiter;
        }
    }
}

impl RunArgs {
    fn apply(&self, config: &mut Config) {
        self.input.apply(config);
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if let Some(max_rows) = self.max_rows {
            config.output.max_rows = max_rows;
        }
        if self.no_truncate {
            config.output.truncate = false;
        }
        if let Some(partitions) = self.partitions {
            config.execution.shuffle_partitions = partitions;
        }
        if let Some(threads) = self.threads {
            config.execution.worker_threads = Some(threads);
        }
        if let Some(policy) = self.on_invalid {
            config.execution.on_invalid_record = policy;
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {e:#}");
        let code = e.downcast_ref::<Error>().map_or(1, Error::exit_code);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let working_dir = std::env::current_dir().context("Failed to resolve working directory")?;
    let mut config = ConfigLoader::new(working_dir)
        .load(cli.config.as_deref())
        .await?;

    let command = cli.command.unwrap_or(Commands::Run(cli.run));
    match &command {
        Commands::Run(args) => args.apply(&mut config),
        Commands::Schema(args) => args.apply(&mut config),
    }

    init_tracing(cli.verbose, config.log_level.as_deref());
    debug!("counterparty-max started with verbosity level: {}", cli.verbose);
    trace!("Resolved configuration: {:?}", config);

    config.validate()?;

    match command {
        Commands::Run(_) => run_job(&config).await,
        Commands::Schema(_) => print_schema(&config).await,
    }
}

fn init_tracing(verbose: u8, configured: Option<&str>) {
    let log_level = match verbose {
        0 => configured.unwrap_or("info"),
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .with_thread_ids(verbose >= 3)
        .with_line_number(verbose >= 3)
        .init();
}

async fn run_job(config: &Config) -> anyhow::Result<()> {
    let ctx = ExecutionContext::new(config.execution_settings())?;
    info!(
        app_name = ctx.app_name(),
        shuffle_partitions = ctx.shuffle_partitions(),
        "Starting aggregation"
    );

    let source = CsvRecordSource::new(&config.input.path, config.csv_options()?);
    let report = pipeline::run(&ctx, &source, &config.formatter()).await?;

    print_output(&report.output);
    Ok(())
}

async fn print_schema(config: &Config) -> anyhow::Result<()> {
    let source = CsvRecordSource::new(&config.input.path, config.csv_options()?);
    let parsed = source.read().await?;
    print_output(&parsed.schema.to_string());
    Ok(())
}

fn print_output(output: &str) {
    if output.ends_with('\n') {
        print!("{output}");
    } else {
        println!("{output}");
    }
}
