//! Metro Campus CLI: command-line interface for the dataset loader
//!
//! Loads the dataset into the in-process graph and document stores, prints
//! the load report and verification, and runs the route and statistics
//! queries.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use metrocampus::config::{LoaderConfig, TargetKind};
use metrocampus::dataset::RecordSet;
use metrocampus::loader::{load_and_verify, DocumentTarget, GraphTarget, LoadOutcome};
use metrocampus::queries::graph::Route;
use metrocampus::queries::{self, StoreStats};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "metrocampus", version, about = "Metro Campus dataset loader")]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true, env = "METROCAMPUS_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding lines.json, stations.json, campuses.json
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum TargetArg {
    Graph,
    Document,
    Both,
}

impl From<TargetArg> for TargetKind {
    fn from(arg: TargetArg) -> Self {
        match arg {
            TargetArg::Graph => TargetKind::Graph,
            TargetArg::Document => TargetKind::Document,
            TargetArg::Both => TargetKind::Both,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Drop and reload the dataset, then verify counts
    Load {
        #[arg(long)]
        target: Option<TargetArg>,

        /// Skip the read-back verification
        #[arg(long)]
        no_verify: bool,

        /// Refuse to load a dataset with consistency issues
        #[arg(long)]
        strict: bool,
    },
    /// Find a route between two stations (name or slug)
    Route {
        from: String,
        to: String,

        /// Minimise travel minutes instead of stops
        #[arg(long, conflicts_with = "all")]
        fastest: bool,

        /// List every fewest-stops route
        #[arg(long)]
        all: bool,
    },
    /// Load and print per-store statistics
    Stats {
        #[arg(long)]
        target: Option<TargetArg>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = LoaderConfig::resolve(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    match cli.command {
        Commands::Load {
            target,
            no_verify,
            strict,
        } => {
            if let Some(target) = target {
                config.target = target.into();
            }
            if no_verify {
                config.verify = false;
            }
            run_load(&config, strict, cli.format)
        }
        Commands::Route { from, to, fastest, all } => run_route(&config, &from, &to, fastest, all, cli.format),
        Commands::Stats { target } => {
            if let Some(target) = target {
                config.target = target.into();
            }
            run_stats(&config, cli.format)
        }
    }
}

fn read_records(config: &LoaderConfig, strict: bool) -> anyhow::Result<RecordSet> {
    let records = config
        .read_records()
        .with_context(|| format!("failed to read dataset from {}", config.data_dir.display()))?;
    if strict {
        records.ensure_consistent()?;
        return Ok(records);
    }
    let issues = records.validate();
    if !issues.is_empty() {
        info!("Dataset has {} consistency issue(s); line stop order wins", issues.len());
    }
    Ok(records)
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

fn run_load(config: &LoaderConfig, strict: bool, format: OutputFormat) -> anyhow::Result<ExitCode> {
    let records = read_records(config, strict)?;
    let mut outcomes: Vec<LoadOutcome> = Vec::new();

    if config.target.includes_document() {
        let mut target = DocumentTarget::new();
        outcomes.push(
            load_and_verify(&mut target, &records, &config.topology, config.verify)
                .context("document load aborted")?,
        );
    }
    if config.target.includes_graph() {
        let mut target = GraphTarget::new();
        outcomes.push(
            load_and_verify(&mut target, &records, &config.topology, config.verify).context("graph load aborted")?,
        );
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcomes)?),
        OutputFormat::Table => print_outcomes(&outcomes),
    }

    Ok(exit_code(&outcomes))
}

fn all_succeeded(outcomes: &[LoadOutcome]) -> bool {
    outcomes.iter().all(LoadOutcome::is_success)
}

fn exit_code(outcomes: &[LoadOutcome]) -> ExitCode {
    if all_succeeded(outcomes) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_outcomes(outcomes: &[LoadOutcome]) {
    let mut counts = new_table(vec!["Store", "Type", "Loaded"]);
    for outcome in outcomes {
        let report = &outcome.report;
        for (kind, n) in &report.inserted {
            counts.add_row(vec![report.store.clone(), kind.to_string(), n.to_string()]);
        }
        for (kind, n) in &report.relationships {
            counts.add_row(vec![report.store.clone(), kind.to_string(), n.to_string()]);
        }
    }
    println!("{}", counts);

    let verified: Vec<_> = outcomes.iter().filter_map(|o| o.verification.as_ref()).collect();
    if !verified.is_empty() {
        let mut table = new_table(vec!["Store", "Count", "Expected", "Actual", "OK"]);
        for result in verified {
            for check in &result.checks {
                table.add_row(vec![
                    result.store.clone(),
                    check.key.to_string(),
                    check.expected.to_string(),
                    check.actual.map_or_else(|| "-".to_string(), |a| a.to_string()),
                    if check.matches() { "yes" } else { "NO" }.to_string(),
                ]);
            }
        }
        println!("{}", table);
    }
    print_failures(outcomes);
}

fn print_failures(outcomes: &[LoadOutcome]) {
    let failures: Vec<_> = outcomes
        .iter()
        .flat_map(|o| o.report.failures.iter().map(move |f| (&o.report.store, f)))
        .collect();
    if failures.is_empty() {
        println!("Load succeeded with no failures");
        return;
    }

    let mut table = new_table(vec!["Store", "Phase", "Type", "Key", "Error"]);
    for (store, failure) in &failures {
        table.add_row(vec![
            store.to_string(),
            failure.phase.to_string(),
            failure.subject.to_string(),
            failure.key.clone(),
            failure.reason.clone(),
        ]);
    }
    println!("{}", table);
    println!("{} failure(s)", failures.len());
}

fn run_route(
    config: &LoaderConfig,
    from: &str,
    to: &str,
    fastest: bool,
    all: bool,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    let records = read_records(config, false)?;
    let mut target = GraphTarget::new();
    let outcome = load_and_verify(&mut target, &records, &config.topology, false).context("graph load aborted")?;
    if !outcome.report.is_clean() {
        bail!("graph load had {} failure(s); run `metrocampus load` for details", outcome.report.failures.len());
    }
    let store = target.store();

    let routes: Vec<Route> = if all {
        queries::graph::all_shortest_routes(store, from, to)?
    } else if fastest {
        queries::graph::fastest_route(store, from, to)?.into_iter().collect()
    } else {
        queries::graph::shortest_route(store, from, to)?.into_iter().collect()
    };

    if routes.is_empty() {
        eprintln!("No route from {} to {}", from, to);
        return Ok(ExitCode::FAILURE);
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&routes)?),
        OutputFormat::Table => {
            for route in &routes {
                let mut table = new_table(vec!["#", "Station", "Line"]);
                for (i, station) in route.stations.iter().enumerate() {
                    let line = if i == 0 {
                        String::new()
                    } else {
                        route.lines.get(i - 1).map(|l| format!("L{}", l)).unwrap_or_default()
                    };
                    table.add_row(vec![i.to_string(), station.clone(), line]);
                }
                println!("{}", table);
                println!(
                    "{} stop(s), {} line change(s), {} min",
                    route.hops, route.line_changes, route.total_minutes
                );
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_stats(config: &LoaderConfig, format: OutputFormat) -> anyhow::Result<ExitCode> {
    let records = read_records(config, false)?;
    let mut stats: Vec<StoreStats> = Vec::new();
    let mut outcomes: Vec<LoadOutcome> = Vec::new();

    if config.target.includes_document() {
        let mut target = DocumentTarget::new();
        outcomes.push(
            load_and_verify(&mut target, &records, &config.topology, false).context("document load aborted")?,
        );
        stats.push(queries::document::stats(target.store())?);
    }
    if config.target.includes_graph() {
        let mut target = GraphTarget::new();
        outcomes.push(load_and_verify(&mut target, &records, &config.topology, false).context("graph load aborted")?);
        stats.push(queries::graph::stats(target.store()));
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Table => {
            let mut table = new_table(vec!["Store", "Kind", "Name", "Count"]);
            for s in &stats {
                for (name, n) in &s.entities {
                    table.add_row(vec![s.store.clone(), "entity".into(), name.clone(), n.to_string()]);
                }
                for (name, n) in &s.relations {
                    table.add_row(vec![s.store.clone(), "relation".into(), name.clone(), n.to_string()]);
                }
            }
            println!("{}", table);
        }
    }

    if !all_succeeded(&outcomes) {
        let failed = outcomes.iter().map(|o| o.report.failures.len()).sum::<usize>();
        warn!("Statistics describe a partial load: {} record(s) failed", failed);
        if matches!(format, OutputFormat::Table) {
            print_failures(&outcomes);
        }
    }
    Ok(exit_code(&outcomes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrocampus::dataset::{Campus, Line, Proximity, ProximityRole, Station};
    use metrocampus::topology::TopologyConfig;

    fn records(nearby: &str) -> RecordSet {
        let mut campus = Campus::new("Campus X", "UPM");
        campus.nearby_stations.push(Proximity::new(nearby, 5, ProximityRole::Primary));
        RecordSet::new(
            vec![Line::new(1, "L1", &["x", "y"])],
            vec![Station::new("x", "X", &[1]), Station::new("y", "Y", &[1])],
            vec![campus],
        )
    }

    fn outcomes(records: &RecordSet) -> Vec<LoadOutcome> {
        let topology = TopologyConfig::default();
        let mut document = DocumentTarget::new();
        let mut graph = GraphTarget::new();
        vec![
            load_and_verify(&mut document, records, &topology, false).unwrap(),
            load_and_verify(&mut graph, records, &topology, false).unwrap(),
        ]
    }

    #[test]
    fn test_clean_load_succeeds() {
        assert!(all_succeeded(&outcomes(&records("y"))));
    }

    #[test]
    fn test_failed_record_fails_the_run() {
        let outcomes = outcomes(&records("nowhere"));
        assert!(!all_succeeded(&outcomes));
        assert!(outcomes.iter().all(|o| !o.report.failures.is_empty()));
        assert!(!all_succeeded(&outcomes[1..]));
    }

    #[test]
    fn test_cli_parses_stats_command() {
        let cli = Cli::try_parse_from(["metrocampus", "--format", "json", "stats"]).unwrap();
        assert!(matches!(cli.format, OutputFormat::Json));
        assert!(matches!(cli.command, Commands::Stats { .. }));
    }
}
