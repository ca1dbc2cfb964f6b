use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use deptree::error::GraphError;
use deptree::graph::build_graph;
use deptree::parser;
use deptree::registry::Registry;
use deptree::render::{render, OutputFormat, RenderOptions};
use deptree::validate::validate;

#[derive(Parser)]
#[command(name = "deptree")]
#[command(version)]
#[command(about = "Dependency tree of installed packages, with conflict and cycle warnings", long_about = None)]
struct Cli {
    /// Inventory JSON file ("-" reads stdin)
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Show who requires each package instead of what it requires
    #[arg(short, long)]
    reverse: bool,

    /// Comma-separated packages to show (wildcards allowed)
    #[arg(short, long, value_delimiter = ',')]
    packages: Vec<String>,

    /// Comma-separated packages to hide (wildcards allowed)
    #[arg(short, long, value_delimiter = ',')]
    exclude: Vec<String>,

    /// Render every package as a root
    #[arg(short, long)]
    all: bool,

    /// Maximum depth of the rendered tree
    #[arg(short, long)]
    depth: Option<usize>,

    /// Output format: text, json, json-tree
    #[arg(short, long, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// What to do with validation warnings
    #[arg(short, long, value_enum, default_value_t = WarnMode::Suppress)]
    warn: WarnMode,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum WarnMode {
    /// Print nothing
    Silence,
    /// Print warnings, exit 0
    Suppress,
    /// Print warnings, exit 1 if there are any
    Fail,
}

impl WarnMode {
    fn prints(self) -> bool {
        self != WarnMode::Silence
    }

    fn fails(self, warned: bool) -> bool {
        warned && self == WarnMode::Fail
    }

    fn exit_code(self, warned: bool) -> ExitCode {
        if self.fails(warned) {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    }
}

fn init_logging(verbose: u8) {
    let level_filter = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .without_time()
        .try_init();
}

fn load_registry(input: &str) -> Result<(Registry, Vec<String>)> {
    let entries = if input == "-" {
        parser::parse_reader(io::stdin().lock()).context("Failed to read inventory from stdin")?
    } else {
        let path = PathBuf::from(input);
        parser::parse_file(&path)
            .with_context(|| format!("Failed to read inventory from {}", path.display()))?
    };
    tracing::info!("Loaded {} inventory entries", entries.len());
    Ok(Registry::build_first_wins(entries))
}

fn non_blank(names: &[String]) -> Vec<&str> {
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .collect()
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let (registry, duplicates) = load_registry(&cli.input)?;
    let mut warned = false;

    if !duplicates.is_empty() {
        warned = true;
        if cli.warn.prints() {
            eprintln!("{}", GraphError::DuplicateInstall { names: duplicates });
        }
    }

    let graph = build_graph(&registry);

    let report = validate(&graph);
    if !report.is_clean() {
        warned = true;
        if cli.warn.prints() {
            eprint!("{}", report);
        }
    }

    let graph = if cli.reverse { graph.reverse() } else { graph };

    let include = non_blank(&cli.packages);
    let exclude = non_blank(&cli.exclude);
    let graph = if include.is_empty() && exclude.is_empty() {
        graph
    } else {
        let include = (!include.is_empty()).then_some(include.as_slice());
        let exclude = (!exclude.is_empty()).then_some(exclude.as_slice());
        match graph.filter(include, exclude) {
            Ok(filtered) => filtered,
            Err(e @ GraphError::UnknownPackage { .. }) => {
                if cli.warn.prints() {
                    eprintln!("{}", e);
                }
                return Ok(cli.warn.exit_code(true));
            }
            Err(e) => return Err(e.into()),
        }
    };

    let options = RenderOptions {
        all: cli.all,
        max_depth: cli.depth,
    };
    let stdout = io::stdout();
    let mut out = stdout.lock();
    render(cli.output, &graph, &options, &mut out).context("Failed to write output")?;
    out.flush().context("Failed to write output")?;

    Ok(cli.warn.exit_code(warned))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
