//! sqlport: schema dump converter
//!
//! # Usage
//!
//! ```bash
//! # Convert a MySQL dump to PostgreSQL (writes dump_postgres.sql)
//! sqlport --file dump.sql --to postgres
//!
//! # Compare two dumps
//! sqlport diff old.sql new.sql --format json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use sqlport::config::Config;
use sqlport::convert::{convert_file, output_path_for, ConvertOptions};
use sqlport::dialect::Dialect;
use sqlport::diff::{diff_schemas, ChangeKind};
use sqlport::parser::{self, UnrecognizedPolicy};
use sqlport::schema::Schema;

#[derive(Parser)]
#[command(name = "sqlport")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Convert SQL schema dumps between database dialects", long_about = None)]
#[command(after_help = "EXAMPLES:
    sqlport --file dump.sql --to postgres      # Convert, writing dump_postgres.sql
    sqlport --file dump.sql --to oracle --stdout
    sqlport diff old.sql new.sql               # Compare two dumps
    sqlport detect dump.sql                    # Guess the source dialect")]
struct Cli {
    /// Input schema dump
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Target dialect (mysql, postgres, sqlite, oracle, sqlserver)
    #[arg(short, long)]
    to: Option<Dialect>,

    /// Source dialect (detected from the dump when omitted)
    #[arg(long)]
    from: Option<Dialect>,

    /// Output path (default: <input>_<dialect>.<ext>)
    #[arg(short, long, conflicts_with = "stdout")]
    output: Option<PathBuf>,

    /// Print the converted script instead of writing a file
    #[arg(long)]
    stdout: bool,

    /// Parse statements with the worker pool
    #[arg(long)]
    parallel: bool,

    /// Worker count for --parallel
    #[arg(long, env = "SQLPORT_WORKERS")]
    workers: Option<usize>,

    /// Configuration file (default: ./sqlport.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// What to do with statements that cannot be modeled
    #[arg(long)]
    unrecognized: Option<UnrecognizedPolicy>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Diff two schema dumps
    Diff {
        /// Source dump
        source: PathBuf,
        /// Target dump
        target: PathBuf,
        /// Source dialect of both dumps (detected per file when omitted)
        #[arg(long)]
        from: Option<Dialect>,
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Detect the dialect of a dump
    Detect {
        file: PathBuf,
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("sqlport=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sqlport=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match &cli.command {
        Some(Commands::Diff {
            source,
            target,
            from,
            format,
        }) => diff_cmd(source, target, *from, *format, &config),
        Some(Commands::Detect { file, format }) => detect_cmd(file, *format),
        None => {
            let (Some(file), Some(to)) = (&cli.file, cli.to) else {
                anyhow::bail!("--file and --to are required (see --help)");
            };
            convert_cmd(&cli, file, to, &config).await
        }
    }
}

async fn convert_cmd(cli: &Cli, file: &Path, to: Dialect, config: &Config) -> Result<()> {
    let mut opts = ConvertOptions::from(config);
    opts.from = cli.from;
    opts.parallel |= cli.parallel;
    if let Some(workers) = cli.workers {
        anyhow::ensure!(workers > 0, "--workers must be at least 1");
        opts.workers = workers;
    }
    if let Some(policy) = cli.unrecognized {
        opts.policy = policy;
    }

    let conversion = convert_file(file, to, &opts)
        .await
        .with_context(|| format!("Failed to convert '{}'", file.display()))?;

    if cli.stdout {
        print!("{}", conversion.sql);
        return Ok(());
    }

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| output_path_for(file, to));
    fs::write(&output, &conversion.sql)
        .with_context(|| format!("Failed to write '{}'", output.display()))?;

    println!(
        "{} {} ({}) → {} ({}): {} tables",
        "✓".green(),
        file.display().to_string().yellow(),
        conversion.source,
        output.display().to_string().yellow(),
        conversion.target,
        conversion.schema.tables.len()
    );
    Ok(())
}

fn load_schema(path: &Path, from: Option<Dialect>, policy: UnrecognizedPolicy) -> Result<Schema> {
    let sql = fs::read_to_string(path).with_context(|| format!("Failed to read '{}'", path.display()))?;
    let dialect = match from {
        Some(dialect) => dialect,
        None => Dialect::detect(&sql).with_context(|| format!("'{}'", path.display()))?,
    };
    parser::parse_document(dialect, &sql, policy)
        .with_context(|| format!("Failed to parse '{}'", path.display()))
}

fn diff_cmd(
    source: &Path,
    target: &Path,
    from: Option<Dialect>,
    format: OutputFormat,
    config: &Config,
) -> Result<()> {
    let old = load_schema(source, from, config.unrecognized)?;
    let new = load_schema(target, from, config.unrecognized)?;
    let diffs = diff_schemas(&old, &new);

    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&diffs)?);
        return Ok(());
    }

    println!(
        "{} {} → {}",
        "Diffing:".cyan(),
        source.display().to_string().yellow(),
        target.display().to_string().yellow()
    );
    if diffs.is_empty() {
        println!("{}", "No changes detected.".green());
        return Ok(());
    }
    println!("{} {} difference(s):", "Found:".green(), diffs.len());
    println!();
    for d in &diffs {
        let marker = match d.change {
            ChangeKind::Add => "+".green(),
            ChangeKind::Modify => "~".yellow(),
            ChangeKind::Remove => "-".red(),
        };
        println!("  {} {}", marker, d.description);
    }
    Ok(())
}

fn detect_cmd(file: &Path, format: OutputFormat) -> Result<()> {
    let sql = fs::read_to_string(file).with_context(|| format!("Failed to read '{}'", file.display()))?;
    let dialect = Dialect::detect(&sql)?;
    match format {
        OutputFormat::Text => println!("{}", dialect),
        OutputFormat::Json => println!(
            "{}",
            serde_json::json!({ "file": file.display().to_string(), "dialect": dialect.name() })
        ),
    }
    Ok(())
}
