use bn_inference::domain::{domain_of_networks, fixpoint_facts, partial_network_restriction};
use bn_inference::identification::{best_mse, identify, validate};
use bn_inference::modelchecking::ModelChecker;
use bn_inference::network_list::LogicalNetworkList;
use bn_inference::solver::{ClingoRunner, Family, Identifier, IdentifyOptions};
use bn_inference::{facts_to_lp, Dataset, Hypergraph, InfluenceGraph, UpdateMode};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::Path;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "bn-inference")]
#[command(about = "Boolean network identification from perturbation time series")]
struct Cli {
    /// Keep intermediate solver/checker artifacts for inspection.
    #[arg(long, global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Identify all the best Boolean networks for a dataset.
    Identify(IdentifyArgs),
    /// Compute the best achievable MSE.
    Mse(MseArgs),
    /// Compute the true-positive rate of a previously identified network set.
    Validate(ValidateArgs),
    /// Export a PKN (.sif) as logic-program facts.
    Pkn2lp {
        /// Prior knowledge network (sif format).
        pkn: String,
        /// Output file (.lp format).
        output: String,
        /// Maximum clause length (0 means unbounded).
        #[arg(long, default_value_t = 0)]
        max_clause_len: usize,
    },
    /// Export a MIDAS dataset as logic-program facts.
    Midas2lp {
        /// Prior knowledge network (sif format).
        pkn: String,
        /// Dataset (MIDAS csv format).
        dataset: String,
        /// Output file (.lp format).
        output: String,
        /// Discretization factor.
        #[arg(long, default_value_t = 100)]
        factor: u32,
    },
}

#[derive(Args)]
struct SearchArgs {
    /// Prior knowledge network (sif format).
    pkn: String,
    /// Dataset (MIDAS csv format), or EMPTY for none.
    dataset: String,
    /// Result family: all, subset or mincard.
    #[arg(long, default_value = "subset")]
    family: String,
    /// Accept solutions with weight up to the minimum plus this tolerance.
    #[arg(long, default_value_t = 0)]
    weight_tolerance: i64,
    /// Accept solutions with cardinality up to the minimum plus this
    /// tolerance (mincard family).
    #[arg(long, default_value_t = 0)]
    mincard_tolerance: i64,
    /// Force the maximum weight of a solution.
    #[arg(long)]
    force_weight: Option<i64>,
    /// Force the maximum size of a solution.
    #[arg(long)]
    force_size: Option<i64>,
    /// Enumerate over traces instead of network structures.
    #[arg(long)]
    enum_traces: bool,
    /// Also consider networks whose nodes have no stimulus ancestor.
    #[arg(long)]
    no_fully_controllable: bool,
    /// Update mode of the Boolean network: asynchronous or general.
    #[arg(long, default_value = "general")]
    semantics: String,
    /// Discretization factor.
    #[arg(long, default_value_t = 100)]
    factor: u32,
    /// Maximum clause length (0 means unbounded).
    #[arg(long, default_value_t = 0)]
    max_clause_len: usize,
    /// Networks to use as enumeration domain (.csv).
    #[arg(long)]
    networks: Option<String>,
    /// Use only networks from this row of the domain (starting at 0).
    #[arg(long, default_value_t = 0)]
    range_from: usize,
    /// Number of domain networks to use (0 means all).
    #[arg(long, default_value_t = 0)]
    range_length: usize,
    /// Partial specification of the Boolean network (.bn).
    #[arg(long)]
    partial_bn: Option<String>,
    /// Fixpoint constraints (.csv).
    #[arg(long)]
    fixpoints: Option<String>,
    /// Solver executable.
    #[arg(long, default_value = "clingo")]
    clingo: String,
    /// Forwarded as the solver's --parallel-mode.
    #[arg(long)]
    clingo_parallel_mode: Option<String>,
}

#[derive(Args)]
struct IdentifyArgs {
    #[command(flatten)]
    search: SearchArgs,
    /// Keep only true positives (exact identification).
    #[arg(long)]
    true_positives: bool,
    /// Limit the number of solutions (0 means all).
    #[arg(long, default_value_t = 0)]
    limit: usize,
    /// Output file (csv format).
    #[arg(long, default_value = "networks.csv")]
    output: String,
}

#[derive(Args)]
struct MseArgs {
    #[command(flatten)]
    search: SearchArgs,
    /// Look for a true positive realizing the computed MSE.
    #[arg(long)]
    check_exact: bool,
}

#[derive(Args)]
struct ValidateArgs {
    /// Prior knowledge network (sif format).
    pkn: String,
    /// Dataset (MIDAS csv format).
    dataset: String,
    /// Network set (csv format).
    networks: String,
    /// Update mode of the Boolean network: asynchronous or general.
    #[arg(long, default_value = "general")]
    semantics: String,
    /// Discretization factor.
    #[arg(long, default_value_t = 100)]
    factor: u32,
    /// Validate only networks from this row (starting at 0).
    #[arg(long, default_value_t = 0)]
    range_from: usize,
    /// Number of networks to validate (0 means all).
    #[arg(long, default_value_t = 0)]
    range_length: usize,
    /// Write the confirmed true positives to this file (csv format).
    #[arg(long)]
    output: Option<String>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {}", error);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Identify(args) => run_identify(args, cli.debug),
        Command::Mse(args) => run_mse(args, cli.debug),
        Command::Validate(args) => run_validate(args, cli.debug),
        Command::Pkn2lp {
            pkn,
            output,
            max_clause_len,
        } => {
            let hypergraph = read_pkn(&pkn, max_clause_len)?;
            write_file(&output, &facts_to_lp(&hypergraph.facts()))
        }
        Command::Midas2lp {
            pkn,
            dataset,
            output,
            factor,
        } => {
            let hypergraph = read_pkn(&pkn, 0)?;
            let dataset = read_dataset(&dataset, factor, hypergraph.graph())?;
            write_file(&output, &facts_to_lp(&dataset.facts()))
        }
    }
}

fn run_identify(args: IdentifyArgs, debug: bool) -> Result<(), String> {
    let (hypergraph, dataset, mode) = read_instance(&args.search)?;
    let options = search_options(&args.search, &dataset, args.limit, args.true_positives)?;
    let identifier = build_identifier(&args.search, &hypergraph, &dataset, options)?;
    let checker = checker(debug);

    let outcome = identify(
        &identifier,
        &hypergraph,
        &dataset,
        mode,
        args.true_positives,
        &checker,
    )?;
    println!(
        "{} solution(s) for the over-approximation",
        outcome.stats.found
    );
    if args.true_positives && outcome.stats.found > 0 {
        println!(
            "{}/{} true positives [rate: {:.2}%]",
            outcome.stats.true_positives,
            outcome.stats.found,
            (100.0 * outcome.stats.true_positives as f64) / outcome.stats.found as f64
        );
    }
    if !outcome.networks.is_empty() {
        write_file(&args.output, &outcome.networks.to_csv())?;
    }
    Ok(())
}

fn run_mse(args: MseArgs, debug: bool) -> Result<(), String> {
    let (hypergraph, dataset, mode) = read_instance(&args.search)?;
    let options = search_options(&args.search, &dataset, 0, true)?;
    let identifier = build_identifier(&args.search, &hypergraph, &dataset, options)?;
    let checker = checker(debug);

    let outcome = best_mse(
        &identifier,
        &hypergraph,
        &dataset,
        mode,
        args.check_exact,
        &checker,
    )?;
    match outcome.discrete {
        Some(discrete) => println!("MSE_discrete = {}", discrete),
        None => println!("MSE_discrete undefined (no matched observations)"),
    }
    match (outcome.discrete, outcome.sample) {
        (Some(discrete), Some(sample)) if discrete == sample => {
            println!("MSE_sample >= MSE_discrete");
        }
        (_, Some(sample)) => println!("MSE_sample >= {}", sample),
        (_, None) => println!("MSE_sample undefined (no matched observations)"),
    }
    if args.check_exact {
        match outcome.exact {
            Some(true) => println!("MSE_sample is exact"),
            _ => println!("MSE_sample may be under-estimated (no True Positive found)"),
        }
    }
    Ok(())
}

fn run_validate(args: ValidateArgs, debug: bool) -> Result<(), String> {
    let hypergraph = read_pkn(&args.pkn, 0)?;
    let dataset = read_dataset(&args.dataset, args.factor, hypergraph.graph())?;
    let mode = UpdateMode::try_from_name(&args.semantics)?;
    let csv = read_file(&args.networks)?;
    let networks = LogicalNetworkList::from_csv(&csv)?.slice(args.range_from, args.range_length);
    let checker = checker(debug);

    let outcome = validate(&networks, &dataset, mode, &checker)?;
    if outcome.total > 0 {
        println!(
            "{}/{} true positives [rate: {:.2}%]",
            outcome.true_positives,
            outcome.total,
            (100.0 * outcome.true_positives as f64) / outcome.total as f64
        );
    } else {
        println!("0/0 true positives");
    }
    if let Some(output) = &args.output {
        if !outcome.exact_indices.is_empty() {
            write_file(output, &networks.select(&outcome.exact_indices).to_csv())?;
        }
    }
    Ok(())
}

fn read_instance(args: &SearchArgs) -> Result<(Hypergraph, Dataset, UpdateMode), String> {
    let hypergraph = read_pkn(&args.pkn, args.max_clause_len)?;
    let dataset = if args.dataset == "EMPTY" {
        Dataset::with_factor("EMPTY", args.factor)
    } else {
        read_dataset(&args.dataset, args.factor, hypergraph.graph())?
    };
    let mode = UpdateMode::try_from_name(&args.semantics)?;
    Ok((hypergraph, dataset, mode))
}

fn search_options(
    args: &SearchArgs,
    dataset: &Dataset,
    limit: usize,
    sample_weighted: bool,
) -> Result<IdentifyOptions, String> {
    let mut fully_controllable = !args.no_fully_controllable;
    if dataset.stimuli().is_empty() {
        log::debug!("# PKN has no stimuli: disabling fully_controllable");
        fully_controllable = false;
    }
    Ok(IdentifyOptions {
        family: Family::try_from_name(&args.family)?,
        weight_tolerance: args.weight_tolerance,
        mincard_tolerance: args.mincard_tolerance,
        force_weight: args.force_weight,
        force_size: args.force_size,
        enum_traces: args.enum_traces,
        fully_controllable,
        sample_weighted,
        limit,
        parallel: args.clingo_parallel_mode.clone(),
    })
}

fn build_identifier<'a>(
    args: &SearchArgs,
    hypergraph: &'a Hypergraph,
    dataset: &'a Dataset,
    options: IdentifyOptions,
) -> Result<Identifier<'a>, String> {
    let mut identifier = Identifier::new(hypergraph, Some(dataset), options);
    identifier.set_runner(ClingoRunner {
        command: args.clingo.clone(),
    });
    if let Some(path) = &args.networks {
        let csv = read_file(path)?;
        let networks =
            LogicalNetworkList::from_csv(&csv)?.slice(args.range_from, args.range_length);
        identifier.set_domain(domain_of_networks(&networks, hypergraph)?);
    }
    if let Some(path) = &args.partial_bn {
        let specification = read_file(path)?;
        identifier.set_restriction(partial_network_restriction(hypergraph, &specification)?);
    }
    if let Some(path) = &args.fixpoints {
        let csv = read_file(path)?;
        identifier.set_fixpoints(fixpoint_facts(&csv)?);
    }
    Ok(identifier)
}

fn checker(debug: bool) -> ModelChecker {
    ModelChecker {
        keep_artifacts: debug,
        ..ModelChecker::default()
    }
}

fn read_pkn(path: &str, max_clause_len: usize) -> Result<Hypergraph, String> {
    let sif = read_file(path)?;
    let graph = InfluenceGraph::try_from_sif(&sif)?;
    Ok(Hypergraph::build(graph, max_clause_len))
}

fn read_dataset(path: &str, factor: u32, graph: &InfluenceGraph) -> Result<Dataset, String> {
    let csv = read_file(path)?;
    let name = Path::new(path)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("dataset");
    Dataset::try_from_midas(&csv, name, factor, graph)
}

fn read_file(path: &str) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("Cannot read `{}`: {}", path, e))
}

fn write_file(path: &str, content: &str) -> Result<(), String> {
    fs::write(path, content).map_err(|e| format!("Cannot write `{}`: {}", path, e))
}
